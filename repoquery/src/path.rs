//! Property path resolution.
//!
//! A path such as `AddressCity`, `Address_City` or `address.city` is resolved
//! against a root type into a chain of [`PersistentProperty`] values. Explicit
//! separators split the source first. Inside each separator chunk the resolver
//! takes the whole chunk when it names a property, and otherwise cuts it at
//! capitalization boundaries from right to left, so the longest matching head is
//! tried first and shorter heads only when the longer ones lead nowhere.

use std::fmt;

use serde::Serialize;

use crate::config::DEFAULT_SEPARATOR;
use crate::errors::PathReferenceError;
use crate::mapping::{EntityRegistry, PersistentEntity, PersistentProperty};

/// Resolved chain of properties rooted at a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyPath {
    head: PersistentProperty,
    /// Part of the source consumed by this node.
    segment: String,
    /// Type `head` was resolved against.
    root_type: String,
    tail: Option<Box<PropertyPath>>,
}

impl PropertyPath {
    /// Resolve `source` against `root_type` using the default separator.
    pub fn resolve(source: &str, root_type: &str, registry: &EntityRegistry) -> Result<Self, PathReferenceError> {
        PathResolver::new(registry).resolve(source, root_type)
    }

    pub fn head(&self) -> &PersistentProperty {
        &self.head
    }

    pub fn tail(&self) -> Option<&PropertyPath> {
        self.tail.as_deref()
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn root_type(&self) -> &str {
        &self.root_type
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter { next: Some(self) }
    }

    /// Property at the end of the chain.
    pub fn leaf(&self) -> &PersistentProperty {
        let mut node = self;
        while let Some(tail) = node.tail() {
            node = tail;
        }
        &node.head
    }

    pub fn leaf_type(&self) -> &str {
        self.leaf().actual_type()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Paths always hold at least one node.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// True when any node of the chain is collection-like.
    pub fn is_collection(&self) -> bool {
        self.iter().any(|node| node.head.is_collection())
    }

    /// Property names joined by dots, e.g. `address.city`.
    pub fn to_dot_path(&self) -> String {
        self.iter().map(|node| node.head.name()).collect::<Vec<_>>().join(".")
    }

    /// Method-name spelling of the path: capitalized property names joined by
    /// `separator`, e.g. `Address_City`. Resolves back to an equal path.
    pub fn canonical(&self, separator: char) -> String {
        self.iter()
            .map(|node| pascal_case(node.head.name()))
            .collect::<Vec<_>>()
            .join(&separator.to_string())
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dot_path())
    }
}

/// Iterator over the nodes of a [`PropertyPath`], head first.
pub struct Iter<'a> {
    next: Option<&'a PropertyPath>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a PropertyPath;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.tail();
        Some(node)
    }
}

impl<'a> IntoIterator for &'a PropertyPath {
    type Item = &'a PropertyPath;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

struct Node {
    property: PersistentProperty,
    segment: String,
    root_type: String,
}

/// Resolves path strings against the entities of a registry.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    registry: &'a EntityRegistry,
    separator: char,
}

impl<'a> PathResolver<'a> {
    pub fn new(registry: &'a EntityRegistry) -> Self {
        Self {
            registry,
            separator: DEFAULT_SEPARATOR,
        }
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn resolve(&self, source: &str, root_type: &str) -> Result<PropertyPath, PathReferenceError> {
        if source.is_empty() {
            return Err(PathReferenceError::new(source, source, root_type));
        }

        let nodes = match self.resolve_chunks(source, root_type) {
            Ok(nodes) => nodes,
            // a separator may also be part of a property name, e.g. `first_name`
            Err(err) if source.contains(self.separator) => {
                self.resolve_chunk(source, source, root_type).map_err(|_| err)?
            }
            Err(err) => return Err(err),
        };
        link(nodes).ok_or_else(|| PathReferenceError::new(source, source, root_type))
    }

    fn resolve_chunks(&self, source: &str, root_type: &str) -> Result<Vec<Node>, PathReferenceError> {
        let mut nodes: Vec<Node> = Vec::new();
        let mut current = root_type.to_string();
        for chunk in source.split(|c| c == self.separator || c == '.') {
            if chunk.is_empty() {
                return Err(PathReferenceError::new(source, chunk, current));
            }
            let resolved = self.resolve_chunk(source, chunk, &current)?;
            if let Some(last) = resolved.last() {
                current = last.property.actual_type().to_string();
            }
            nodes.extend(resolved);
        }
        Ok(nodes)
    }

    fn resolve_chunk(&self, source: &str, remainder: &str, type_name: &str) -> Result<Vec<Node>, PathReferenceError> {
        let unresolved = || PathReferenceError::new(source, remainder, type_name);
        if self.registry.is_terminal(type_name) {
            return Err(unresolved());
        }
        let entity = self
            .registry
            .entity_for(type_name)
            .map_err(|cause| unresolved().with_cause(cause))?;

        if let Some(property) = lookup(&entity, remainder) {
            return Ok(vec![Node {
                property: property.clone(),
                segment: remainder.to_string(),
                root_type: type_name.to_string(),
            }]);
        }

        let mut nested_error = None;
        for boundary in boundaries(remainder).rev() {
            let (head, rest) = remainder.split_at(boundary);
            let Some(property) = lookup(&entity, head) else {
                continue;
            };
            match self.resolve_chunk(source, rest, property.actual_type()) {
                Ok(tail) => {
                    let mut nodes = Vec::with_capacity(tail.len() + 1);
                    nodes.push(Node {
                        property: property.clone(),
                        segment: head.to_string(),
                        root_type: type_name.to_string(),
                    });
                    nodes.extend(tail);
                    return Ok(nodes);
                }
                Err(err) => {
                    nested_error.get_or_insert(err);
                }
            }
        }
        Err(nested_error.unwrap_or_else(unresolved))
    }
}

fn link(nodes: Vec<Node>) -> Option<PropertyPath> {
    nodes.into_iter().rev().fold(None, |tail, node| {
        Some(PropertyPath {
            head: node.property,
            segment: node.segment,
            root_type: node.root_type,
            tail: tail.map(Box::new),
        })
    })
}

/// Byte offsets of capitalization boundaries, excluding the start.
fn boundaries(segment: &str) -> impl DoubleEndedIterator<Item = usize> + '_ {
    segment
        .char_indices()
        .filter(|&(index, c)| index > 0 && c.is_uppercase())
        .map(|(index, _)| index)
}

/// Find the property a method-name segment refers to: uncapitalized, verbatim
/// or as snake_case.
fn lookup<'e>(entity: &'e PersistentEntity, segment: &str) -> Option<&'e PersistentProperty> {
    entity
        .property(&uncapitalize(segment))
        .or_else(|| entity.property(segment))
        .or_else(|| entity.property(&snake_case(segment)))
}

fn uncapitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn snake_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 4);
    for (index, c) in segment.chars().enumerate() {
        if c.is_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Capitalize each `_`-separated piece. An underscore before a piece that does not
/// start with a letter is kept, since no lookup spelling could restore it.
fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for piece in name.split('_').filter(|piece| !piece.is_empty()) {
        let mut chars = piece.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        if !first.is_alphabetic() && !out.is_empty() {
            out.push('_');
        }
        out.extend(first.to_uppercase());
        out.extend(chars);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspector::StaticInspector;
    use crate::types::{TypeDescriptor, TypeRef};
    use std::sync::Arc;

    fn registry() -> EntityRegistry {
        let inspector = StaticInspector::new()
            .with_type(
                TypeDescriptor::new("Person")
                    .member("id", TypeRef::named("u64"))
                    .member("first_name", TypeRef::named("String"))
                    .member("address", TypeRef::named("Address"))
                    .member("addressBook", TypeRef::named("Book"))
                    .member("previous", TypeRef::collection_of(TypeRef::named("Address"))),
            )
            .with_type(
                TypeDescriptor::new("Address")
                    .member("city", TypeRef::named("String"))
                    .member("bookTitle", TypeRef::named("String")),
            )
            .with_type(TypeDescriptor::new("Book").member("isbn", TypeRef::named("String")))
            .with_type(
                TypeDescriptor::new("Shipment")
                    .member("address", TypeRef::named("Address"))
                    .member("address_city", TypeRef::named("String"))
                    .member("address_1", TypeRef::named("String")),
            );
        EntityRegistry::with_defaults(Arc::new(inspector))
    }

    #[test]
    fn separator_and_camel_case_agree() {
        let registry = registry();
        let explicit = PropertyPath::resolve("Address_City", "Person", &registry).unwrap();
        let greedy = PropertyPath::resolve("AddressCity", "Person", &registry).unwrap();
        let dotted = PropertyPath::resolve("address.city", "Person", &registry).unwrap();

        assert_eq!(explicit.to_dot_path(), "address.city");
        assert_eq!(greedy.to_dot_path(), "address.city");
        assert_eq!(dotted.to_dot_path(), "address.city");
        assert_eq!(explicit.len(), 2);
        assert_eq!(explicit.head(), greedy.head());
        assert_eq!(explicit.leaf(), greedy.leaf());
        assert_eq!(greedy.segment(), "Address");
        assert_eq!(greedy.tail().unwrap().root_type(), "Address");
    }

    #[test]
    fn resolution_is_idempotent() {
        let registry = registry();
        let first = PropertyPath::resolve("AddressCity", "Person", &registry).unwrap();
        let second = PropertyPath::resolve("AddressCity", "Person", &registry).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn snake_case_properties_match_camel_segments() {
        let registry = registry();
        let path = PropertyPath::resolve("FirstName", "Person", &registry).unwrap();
        assert_eq!(path.to_dot_path(), "first_name");
        assert_eq!(path.canonical('_'), "FirstName");

        let path = PropertyPath::resolve("first_name", "Person", &registry).unwrap();
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn numbered_properties_keep_their_underscore() {
        let registry = registry();
        let path = PropertyPath::resolve("Address_1", "Shipment", &registry).unwrap();
        assert_eq!(path.to_dot_path(), "address_1");

        let canonical = path.canonical('_');
        assert_eq!(canonical, "Address_1");
        let reparsed = PropertyPath::resolve(&canonical, "Shipment", &registry).unwrap();
        assert_eq!(reparsed.to_dot_path(), "address_1");
    }

    #[test]
    fn whole_property_wins_over_nested_split() {
        let registry = registry();
        let path = PropertyPath::resolve("AddressCity", "Shipment", &registry).unwrap();
        assert_eq!(path.to_dot_path(), "address_city");

        let nested = PropertyPath::resolve("Address_City", "Shipment", &registry).unwrap();
        assert_eq!(nested.to_dot_path(), "address.city");
    }

    #[test]
    fn backtracks_to_shorter_head() {
        let registry = registry();
        // `addressBook` has no `title`, `address.bookTitle` does
        let path = PropertyPath::resolve("AddressBookTitle", "Person", &registry).unwrap();
        assert_eq!(path.to_dot_path(), "address.bookTitle");

        let path = PropertyPath::resolve("AddressBookIsbn", "Person", &registry).unwrap();
        assert_eq!(path.to_dot_path(), "addressBook.isbn");
    }

    #[test]
    fn collections_continue_into_element_type() {
        let registry = registry();
        let path = PropertyPath::resolve("PreviousCity", "Person", &registry).unwrap();
        assert!(path.is_collection());
        assert_eq!(path.leaf_type(), "String");
        assert_eq!(path.canonical('_'), "Previous_City");
        assert_eq!(path.to_string(), "previous.city");
    }

    #[test]
    fn unresolvable_paths_report_remainder() {
        let registry = registry();

        let err = PropertyPath::resolve("AddressZip", "Person", &registry).unwrap_err();
        assert_eq!(err.source_path, "AddressZip");
        assert_eq!(err.unresolved, "Zip");
        assert_eq!(err.type_name, "Address");

        let err = PropertyPath::resolve("Nickname", "Person", &registry).unwrap_err();
        assert_eq!(err.unresolved, "Nickname");
        assert_eq!(err.type_name, "Person");

        let err = PropertyPath::resolve("Address__City", "Person", &registry).unwrap_err();
        assert_eq!(err.unresolved, "");

        assert!(PropertyPath::resolve("", "Person", &registry).is_err());
    }

    #[test]
    fn terminal_leaf_has_no_further_segments() {
        let registry = registry();
        let err = PropertyPath::resolve("Address_City_Name", "Person", &registry).unwrap_err();
        assert_eq!(err.type_name, "String");
        assert_eq!(err.unresolved, "Name");
    }

    #[test]
    fn metadata_failures_become_causes() {
        let registry = registry();
        let err = PropertyPath::resolve("Name", "Ghost", &registry).unwrap_err();
        assert!(err.cause.is_some());
    }

    #[test]
    fn custom_separator() {
        let registry = registry();
        let resolver = PathResolver::new(&registry).with_separator('$');
        let path = resolver.resolve("Address$City", "Person").unwrap();
        assert_eq!(path.to_dot_path(), "address.city");
        assert_eq!(path.canonical(resolver.separator()), "Address$City");
    }

    #[test]
    fn boundaries_and_casing_helpers() {
        assert_eq!(boundaries("AddressBookTitle").collect::<Vec<_>>(), [7, 11]);
        assert_eq!(uncapitalize("FirstName"), "firstName");
        assert_eq!(snake_case("AddressLine1"), "address_line1");
        assert_eq!(pascal_case("address_line1"), "AddressLine1");
        assert_eq!(pascal_case("addressBook"), "AddressBook");
        assert_eq!(pascal_case("address_1"), "Address_1");
        assert_eq!(pascal_case("line_2_b"), "Line_2B");
        assert_eq!(uncapitalize("Address_1"), "address_1");
    }
}
