#[allow(unused_imports)]
use super::*;

pub(crate) struct ParsedField {
    ident: Ident,
    /// Property name, after `rename`.
    name: String,
    shape: TypeShape,
    is_id: bool,
    skip: bool,
}

impl ParsedField {
    pub(crate) fn from_field(field: &Field) -> Result<Self> {
        let ident = field
            .ident
            .clone()
            .ok_or_else(|| Error::new(field.span(), "Entity requires named fields"))?;
        let mut name = ident.to_string();
        // raw identifiers keep their prefix in `to_string`
        if let Some(stripped) = name.strip_prefix("r#") {
            name = stripped.to_string();
        }

        let mut is_id = false;
        let mut skip = false;
        for attr in &field.attrs {
            if attr.path().is_ident("repoquery") {
                Self::parse_field_attr(attr, &mut name, &mut is_id, &mut skip)?;
            }
        }
        if is_id && skip {
            return Err(Error::new(
                ident.span(),
                "a field cannot be both #[repoquery(id)] and #[repoquery(skip)]",
            ));
        }

        Ok(Self {
            shape: TypeShape::of(&field.ty),
            ident,
            name,
            is_id,
            skip,
        })
    }

    fn parse_field_attr(attr: &Attribute, name: &mut String, is_id: &mut bool, skip: &mut bool) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                *is_id = true;
            } else if meta.path.is_ident("skip") {
                *skip = true;
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(Error::new(value.span(), "renamed property must not be empty"));
                }
                *name = value.value();
            } else {
                return Err(meta.error("unknown repoquery field attribute, expected `id`, `skip` or `rename`"));
            }
            Ok(())
        })
    }

    pub(crate) fn is_id(&self) -> bool {
        self.is_id
    }

    pub(crate) fn is_skipped(&self) -> bool {
        self.skip
    }

    pub(crate) fn span(&self) -> proc_macro2::Span {
        self.ident.span()
    }

    pub(crate) fn to_descriptor_tokens(&self) -> TokenStream2 {
        let name = &self.name;
        let declared = self.shape.to_tokens();
        let explicit_id = self.is_id;
        quote! {
            ::repoquery::types::MemberDescriptor {
                name: ::std::string::String::from(#name),
                declared: #declared,
                explicit_id: #explicit_id,
            }
        }
    }
}
