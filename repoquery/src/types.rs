use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a member as reported by a member inspector.
///
/// Wrappers without structural meaning (`Option`, `Box`, `Arc`, `Rc`) are expected
/// to be unwrapped by the inspector, so a `TypeRef` only distinguishes plain,
/// collection-like and map-like types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Named(String),
    Collection(Box<TypeRef>),
    Map { key: Box<TypeRef>, value: Box<TypeRef> },
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn collection_of(element: TypeRef) -> Self {
        TypeRef::Collection(Box::new(element))
    }

    pub fn map_of(key: TypeRef, value: TypeRef) -> Self {
        TypeRef::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    #[inline]
    pub fn is_collection(&self) -> bool {
        matches!(self, TypeRef::Collection(_))
    }

    #[inline]
    pub fn is_map(&self) -> bool {
        matches!(self, TypeRef::Map { .. })
    }

    pub fn element(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Collection(element) => Some(element),
            _ => None,
        }
    }

    pub fn map_value(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Map { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Name of the type a property path continues into: the element type of a
    /// collection, the value type of a map, the type itself otherwise. Nested
    /// containers are unwrapped down to the innermost named type.
    pub fn actual_name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::Collection(element) => element.actual_name(),
            TypeRef::Map { value, .. } => value.actual_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::Collection(element) => write!(f, "Vec<{element}>"),
            TypeRef::Map { key, value } => write!(f, "Map<{key}, {value}>"),
        }
    }
}

/// Raw description of one type: its accessible members in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    pub members: Vec<MemberDescriptor>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Append a plain member.
    pub fn member(mut self, name: impl Into<String>, declared: TypeRef) -> Self {
        self.members.push(MemberDescriptor::new(name, declared));
        self
    }

    /// Append a member explicitly marked as the identifier.
    pub fn id(mut self, name: impl Into<String>, declared: TypeRef) -> Self {
        self.members.push(MemberDescriptor::identifier(name, declared));
        self
    }

    pub fn push(&mut self, member: MemberDescriptor) {
        self.members.push(member);
    }
}

/// One accessible member of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDescriptor {
    pub name: String,
    pub declared: TypeRef,
    #[serde(default)]
    pub explicit_id: bool,
}

impl MemberDescriptor {
    pub fn new(name: impl Into<String>, declared: TypeRef) -> Self {
        Self {
            name: name.into(),
            declared,
            explicit_id: false,
        }
    }

    pub fn identifier(name: impl Into<String>, declared: TypeRef) -> Self {
        Self {
            name: name.into(),
            declared,
            explicit_id: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actual_name_unwraps_containers() {
        let nested = TypeRef::map_of(
            TypeRef::named("String"),
            TypeRef::collection_of(TypeRef::named("Address")),
        );
        assert_eq!(nested.actual_name(), "Address");
        assert!(nested.is_map());
        assert!(!nested.is_collection());
        assert_eq!(nested.to_string(), "Map<String, Vec<Address>>");
    }

    #[test]
    fn descriptor_builder_keeps_declaration_order() {
        let descriptor = TypeDescriptor::new("Person")
            .id("key", TypeRef::named("u64"))
            .member("name", TypeRef::named("String"));
        let names: Vec<_> = descriptor.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["key", "name"]);
        assert!(descriptor.members[0].explicit_id);
        assert!(!descriptor.members[1].explicit_id);
    }
}
