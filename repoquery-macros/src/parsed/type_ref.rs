#[allow(unused_imports)]
use super::*;

const TRANSPARENT: &[&str] = &["Option", "Box", "Arc", "Rc"];
const COLLECTIONS: &[&str] = &["Vec", "VecDeque", "LinkedList", "HashSet", "BTreeSet", "BinaryHeap", "IndexSet"];
const MAPS: &[&str] = &["HashMap", "BTreeMap", "IndexMap"];

/// Compile-time mirror of `repoquery::types::TypeRef`.
pub(crate) enum TypeShape {
    Named(String),
    Collection(Box<TypeShape>),
    Map(Box<TypeShape>, Box<TypeShape>),
}

impl TypeShape {
    pub(crate) fn of(ty: &Type) -> Self {
        match ty {
            Type::Reference(reference) => Self::of(&reference.elem),
            Type::Paren(paren) => Self::of(&paren.elem),
            Type::Group(group) => Self::of(&group.elem),
            Type::Slice(slice) => TypeShape::Collection(Box::new(Self::of(&slice.elem))),
            Type::Array(array) => TypeShape::Collection(Box::new(Self::of(&array.elem))),
            Type::Path(path) => {
                let Some(segment) = path.path.segments.last() else {
                    return TypeShape::Named(quote!(#ty).to_string());
                };
                let name = segment.ident.to_string();
                let args = type_arguments(&segment.arguments);
                match (name.as_str(), args.as_slice()) {
                    (wrapper, [inner, ..]) if TRANSPARENT.contains(&wrapper) => Self::of(inner),
                    (collection, [element, ..]) if COLLECTIONS.contains(&collection) => {
                        TypeShape::Collection(Box::new(Self::of(element)))
                    }
                    (map, [key, value, ..]) if MAPS.contains(&map) => {
                        TypeShape::Map(Box::new(Self::of(key)), Box::new(Self::of(value)))
                    }
                    _ => TypeShape::Named(name),
                }
            }
            other => TypeShape::Named(quote!(#other).to_string().replace(' ', "")),
        }
    }

    pub(crate) fn to_tokens(&self) -> TokenStream2 {
        match self {
            TypeShape::Named(name) => quote! { ::repoquery::types::TypeRef::named(#name) },
            TypeShape::Collection(element) => {
                let element = element.to_tokens();
                quote! { ::repoquery::types::TypeRef::collection_of(#element) }
            }
            TypeShape::Map(key, value) => {
                let key = key.to_tokens();
                let value = value.to_tokens();
                quote! { ::repoquery::types::TypeRef::map_of(#key, #value) }
            }
        }
    }
}

fn type_arguments(arguments: &PathArguments) -> Vec<&Type> {
    match arguments {
        PathArguments::AngleBracketed(args) => args
            .args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(inner) => Some(inner),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
