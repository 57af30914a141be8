#[allow(unused_imports)]
use super::*;

pub(crate) struct ParsedEntity {
    ident: Ident,
    /// Name the entity is registered under.
    type_name: String,
    fields: Vec<ParsedField>,
}

impl ParsedEntity {
    pub(crate) fn from_input(input: &DeriveInput) -> Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(Error::new(
                input.generics.span(),
                "Entity cannot be derived for generic structs; register a concrete type instead",
            ));
        }

        let mut type_name = input.ident.to_string();
        for attr in &input.attrs {
            if attr.path().is_ident("repoquery") {
                Self::parse_container_attr(attr, &mut type_name)?;
            }
        }

        let fields = match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => named
                    .named
                    .iter()
                    .map(ParsedField::from_field)
                    .collect::<Result<Vec<_>>>()?,
                _ => return Err(Error::new(input.span(), "Entity requires a struct with named fields")),
            },
            _ => return Err(Error::new(input.span(), "Entity can only be derived for structs")),
        };

        let ids: Vec<&ParsedField> = fields.iter().filter(|field| field.is_id()).collect();
        if let [_, second, ..] = ids.as_slice() {
            return Err(Error::new(
                second.span(),
                format!("`{type_name}` marks more than one field with #[repoquery(id)]"),
            ));
        }

        Ok(Self {
            ident: input.ident.clone(),
            type_name,
            fields,
        })
    }

    fn parse_container_attr(attr: &Attribute, type_name: &mut String) -> Result<()> {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                if value.value().is_empty() {
                    return Err(Error::new(value.span(), "entity name must not be empty"));
                }
                *type_name = value.value();
                Ok(())
            } else {
                Err(meta.error("unknown repoquery container attribute, expected `name`"))
            }
        })
    }

    pub(crate) fn emit(&self) -> TokenStream2 {
        let ident = &self.ident;
        let type_name = &self.type_name;
        let members = self
            .fields
            .iter()
            .filter(|field| !field.is_skipped())
            .map(ParsedField::to_descriptor_tokens);

        quote! {
            impl ::repoquery::inspector::Described for #ident {
                const TYPE_NAME: &'static str = #type_name;

                fn type_descriptor() -> ::repoquery::types::TypeDescriptor {
                    ::repoquery::types::TypeDescriptor {
                        name: ::std::string::String::from(#type_name),
                        members: ::std::vec![#(#members),*],
                    }
                }
            }

            ::repoquery::inventory::submit! {
                ::repoquery::inspector::EntityRegistration {
                    type_name: #type_name,
                    module_path: ::std::module_path!(),
                    descriptor_fn: <#ident as ::repoquery::inspector::Described>::type_descriptor,
                }
            }
        }
    }
}
