//! Turns struct declarations into type descriptors using syn.
//!
//! The scanner honors the same `#[repoquery(...)]` attributes as the derive, so a
//! project describes the same graph whether it is inspected at build time or
//! from its sources.

use anyhow::{Context, Result};
use repoquery::{MemberDescriptor, TypeDescriptor, TypeRef};
use std::path::Path;
use syn::{Attribute, Fields, GenericArgument, Item, ItemStruct, LitStr, Meta, PathArguments, Type};

const TRANSPARENT: &[&str] = &["Option", "Box", "Arc", "Rc"];
const COLLECTIONS: &[&str] = &["Vec", "VecDeque", "LinkedList", "HashSet", "BTreeSet", "BinaryHeap", "IndexSet"];
const MAPS: &[&str] = &["HashMap", "BTreeMap", "IndexMap"];

/// A struct found in a source file.
#[derive(Debug, Clone)]
pub struct ScannedType {
    pub descriptor: TypeDescriptor,
    /// Whether the struct carries `#[derive(Entity)]`.
    pub derives_entity: bool,
    pub relative_path: String,
    pub line: usize,
}

/// Parse a Rust file and describe every non-generic struct with named fields,
/// including structs in inline modules.
pub fn parse_source_file(path: &Path, relative_path: &str) -> Result<Vec<ScannedType>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    parse_source(&content, relative_path).with_context(|| format!("Failed to parse Rust file: {}", path.display()))
}

pub fn parse_source(content: &str, relative_path: &str) -> Result<Vec<ScannedType>> {
    let syntax = syn::parse_file(content)?;
    let lines: Vec<&str> = content.lines().collect();

    let mut scanned = Vec::new();
    collect_structs(&syntax.items, &lines, relative_path, &mut scanned)?;
    Ok(scanned)
}

fn collect_structs(items: &[Item], lines: &[&str], relative_path: &str, out: &mut Vec<ScannedType>) -> Result<()> {
    for item in items {
        match item {
            Item::Struct(item_struct) => {
                if !item_struct.generics.params.is_empty() {
                    log::debug!("skipping generic struct {}", item_struct.ident);
                    continue;
                }
                if !matches!(item_struct.fields, Fields::Named(_)) {
                    continue;
                }
                let descriptor = describe_struct(item_struct)
                    .with_context(|| format!("Invalid repoquery attribute on {}", item_struct.ident))?;
                out.push(ScannedType {
                    descriptor,
                    derives_entity: has_entity_derive(&item_struct.attrs),
                    relative_path: relative_path.to_string(),
                    line: find_struct_line(lines, &item_struct.ident.to_string()).unwrap_or(1),
                });
            }
            Item::Mod(module) => {
                if let Some((_, nested)) = &module.content {
                    collect_structs(nested, lines, relative_path, out)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Find the line number where a struct is defined
fn find_struct_line(lines: &[&str], struct_name: &str) -> Option<usize> {
    let pattern = format!("struct {struct_name}");
    lines
        .iter()
        .position(|line| {
            line.find(&pattern).is_some_and(|at| {
                !line[at + pattern.len()..]
                    .starts_with(|c: char| c.is_alphanumeric() || c == '_')
            })
        })
        .map(|index| index + 1)
}

/// Check if attributes include derive(Entity) or derive(repoquery::Entity)
fn has_entity_derive(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        if !attr.path().is_ident("derive") {
            return false;
        }
        let Meta::List(list) = &attr.meta else {
            return false;
        };
        list.tokens
            .to_string()
            .split(',')
            .any(|derive| derive.rsplit("::").next().is_some_and(|name| name.trim() == "Entity"))
    })
}

fn describe_struct(item: &ItemStruct) -> syn::Result<TypeDescriptor> {
    let mut type_name = item.ident.to_string();
    for attr in item.attrs.iter().filter(|attr| attr.path().is_ident("repoquery")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                type_name = value.value();
                Ok(())
            } else {
                Err(meta.error("unknown repoquery container attribute"))
            }
        })?;
    }

    let mut descriptor = TypeDescriptor::new(type_name);
    if let Fields::Named(fields) = &item.fields {
        for field in &fields.named {
            let Some(ident) = &field.ident else { continue };
            let mut name = ident.to_string();
            if let Some(stripped) = name.strip_prefix("r#") {
                name = stripped.to_string();
            }
            let mut explicit_id = false;
            let mut skip = false;
            for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("repoquery")) {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("id") {
                        explicit_id = true;
                    } else if meta.path.is_ident("skip") {
                        skip = true;
                    } else if meta.path.is_ident("rename") {
                        let value: LitStr = meta.value()?.parse()?;
                        name = value.value();
                    } else {
                        return Err(meta.error("unknown repoquery field attribute"));
                    }
                    Ok(())
                })?;
            }
            if skip {
                continue;
            }
            descriptor.push(MemberDescriptor {
                name,
                declared: type_ref(&field.ty),
                explicit_id,
            });
        }
    }
    Ok(descriptor)
}

/// Map a syn type to the shape the registry understands.
pub fn type_ref(ty: &Type) -> TypeRef {
    match ty {
        Type::Reference(reference) => type_ref(&reference.elem),
        Type::Paren(paren) => type_ref(&paren.elem),
        Type::Group(group) => type_ref(&group.elem),
        Type::Slice(slice) => TypeRef::collection_of(type_ref(&slice.elem)),
        Type::Array(array) => TypeRef::collection_of(type_ref(&array.elem)),
        Type::Path(path) => {
            let Some(segment) = path.path.segments.last() else {
                return TypeRef::named("unknown");
            };
            let name = segment.ident.to_string();
            let args = type_arguments(&segment.arguments);
            match (name.as_str(), args.as_slice()) {
                (wrapper, [inner, ..]) if TRANSPARENT.contains(&wrapper) => type_ref(inner),
                (collection, [element, ..]) if COLLECTIONS.contains(&collection) => {
                    TypeRef::collection_of(type_ref(element))
                }
                (map, [key, value, ..]) if MAPS.contains(&map) => TypeRef::map_of(type_ref(key), type_ref(value)),
                _ => TypeRef::Named(name),
            }
        }
        _ => TypeRef::named("unknown"),
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

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
use repoquery::Entity;

#[derive(Debug, Entity)]
#[repoquery(name = "Person")]
pub struct PersonRecord {
    #[repoquery(id)]
    key: u64,
    #[repoquery(rename = "lastname")]
    last_name: String,
    addresses: Vec<Address>,
    nickname: Option<Box<String>>,
    tags: HashMap<String, Vec<Tag>>,
    #[repoquery(skip)]
    cache: Cache,
}

pub struct Address {
    city: String,
}

pub struct Wrapper<T> {
    inner: T,
}

pub struct Unit;

mod nested {
    #[derive(repoquery::Entity, Clone)]
    pub struct Tag {
        label: String,
    }
}
"#;

    fn scan() -> Vec<ScannedType> {
        parse_source(SOURCE, "src/model.rs").unwrap()
    }

    #[test]
    fn test_structs_are_described() {
        let scanned = scan();
        let names: Vec<_> = scanned.iter().map(|s| s.descriptor.name.as_str()).collect();
        assert_eq!(names, ["Person", "Address", "Tag"]);

        let person = &scanned[0];
        assert!(person.derives_entity);
        assert!(!scanned[1].derives_entity);
        assert!(scanned[2].derives_entity);
        assert_eq!(person.line, 6);
        assert_eq!(person.relative_path, "src/model.rs");
    }

    #[test]
    fn test_field_attributes_are_honored() {
        let person = &scan()[0].descriptor;
        let members: Vec<_> = person.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(members, ["key", "lastname", "addresses", "nickname", "tags"]);
        assert!(person.members[0].explicit_id);
        assert!(!person.members[1].explicit_id);
    }

    #[test]
    fn test_type_shapes() {
        let person = &scan()[0].descriptor;
        assert_eq!(
            person.members[2].declared,
            TypeRef::collection_of(TypeRef::named("Address"))
        );
        assert_eq!(person.members[3].declared, TypeRef::named("String"));
        assert_eq!(
            person.members[4].declared,
            TypeRef::map_of(
                TypeRef::named("String"),
                TypeRef::collection_of(TypeRef::named("Tag"))
            )
        );

        let slice: Type = syn::parse_str("&'static [u8]").unwrap();
        assert_eq!(type_ref(&slice), TypeRef::collection_of(TypeRef::named("u8")));
    }

    #[test]
    fn test_unknown_attribute_is_an_error() {
        let source = "struct Bad { #[repoquery(indexed)] field: String }";
        assert!(parse_source(source, "src/bad.rs").is_err());
    }

    #[test]
    fn test_struct_line_matches_whole_name() {
        let lines = ["struct PersonRecord {", "struct Person {"];
        assert_eq!(find_struct_line(&lines, "Person"), Some(2));
    }
}
