use std::collections::HashMap;

use serde::Serialize;

use super::PersistentProperty;
use crate::errors::MetadataError;
use crate::types::TypeDescriptor;

/// Property name used as identifier when no member is explicitly marked.
pub const CONVENTIONAL_ID: &str = "id";

/// Immutable metadata of one domain type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistentEntity {
    type_name: String,
    properties: Vec<PersistentProperty>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    identifier: Option<usize>,
}

impl PersistentEntity {
    /// Build the entity for `descriptor`, classifying every member with `is_terminal`.
    pub(crate) fn from_descriptor(
        descriptor: TypeDescriptor,
        is_terminal: impl Fn(&str) -> bool,
    ) -> Result<Self, MetadataError> {
        let type_name = descriptor.name;
        if descriptor.members.is_empty() {
            return Err(MetadataError::NoProperties { type_name });
        }

        let mut properties = Vec::with_capacity(descriptor.members.len());
        let mut index = HashMap::with_capacity(descriptor.members.len());
        let mut explicit = Vec::new();

        for member in descriptor.members {
            if index.contains_key(&member.name) {
                return Err(MetadataError::DuplicateProperty {
                    type_name,
                    property: member.name,
                });
            }
            if member.explicit_id {
                explicit.push(member.name.clone());
            }
            let association = !is_terminal(member.declared.actual_name());
            index.insert(member.name.clone(), properties.len());
            properties.push(PersistentProperty::new(
                type_name.clone(),
                member.name,
                member.declared,
                association,
                member.explicit_id,
            ));
        }

        let identifier = match explicit.as_slice() {
            [] => index.get(CONVENTIONAL_ID).copied(),
            [single] => index.get(single).copied(),
            _ => {
                return Err(MetadataError::AmbiguousIdentifier {
                    type_name,
                    candidates: explicit,
                });
            }
        };
        if let Some(position) = identifier {
            properties[position].set_identifier();
        }

        Ok(Self {
            type_name,
            properties,
            index,
            identifier,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn property(&self, name: &str) -> Option<&PersistentProperty> {
        self.index.get(name).map(|&position| &self.properties[position])
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[PersistentProperty] {
        &self.properties
    }

    pub fn identifier(&self) -> Option<&PersistentProperty> {
        self.identifier.map(|position| &self.properties[position])
    }

    pub fn has_identifier(&self) -> bool {
        self.identifier.is_some()
    }

    pub fn associations(&self) -> impl Iterator<Item = &PersistentProperty> {
        self.properties.iter().filter(|property| property.is_association())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRef;

    fn terminal(name: &str) -> bool {
        matches!(name, "String" | "u64" | "i32")
    }

    #[test]
    fn explicit_identifier_wins_over_convention() {
        let descriptor = TypeDescriptor::new("Account")
            .member("id", TypeRef::named("u64"))
            .id("number", TypeRef::named("String"));
        let entity = PersistentEntity::from_descriptor(descriptor, terminal).unwrap();

        assert_eq!(entity.identifier().map(|p| p.name()), Some("number"));
        assert!(!entity.property("id").unwrap().is_identifier());
    }

    #[test]
    fn conventional_identifier_is_used_as_fallback() {
        let descriptor = TypeDescriptor::new("Person")
            .member("id", TypeRef::named("u64"))
            .member("name", TypeRef::named("String"));
        let entity = PersistentEntity::from_descriptor(descriptor, terminal).unwrap();

        let id = entity.identifier().unwrap();
        assert_eq!(id.name(), "id");
        assert!(id.is_identifier());
    }

    #[test]
    fn value_objects_have_no_identifier() {
        let descriptor = TypeDescriptor::new("Address").member("city", TypeRef::named("String"));
        let entity = PersistentEntity::from_descriptor(descriptor, terminal).unwrap();
        assert!(!entity.has_identifier());
    }

    #[test]
    fn two_explicit_identifiers_are_ambiguous() {
        let descriptor = TypeDescriptor::new("Broken")
            .id("a", TypeRef::named("u64"))
            .id("b", TypeRef::named("u64"));
        let err = PersistentEntity::from_descriptor(descriptor, terminal).unwrap_err();
        assert_eq!(
            err,
            MetadataError::AmbiguousIdentifier {
                type_name: "Broken".into(),
                candidates: vec!["a".into(), "b".into()],
            }
        );
    }

    #[test]
    fn duplicate_and_missing_members_are_rejected() {
        let duplicate = TypeDescriptor::new("Dup")
            .member("x", TypeRef::named("i32"))
            .member("x", TypeRef::named("i32"));
        assert!(matches!(
            PersistentEntity::from_descriptor(duplicate, terminal),
            Err(MetadataError::DuplicateProperty { .. })
        ));

        let empty = TypeDescriptor::new("Empty");
        assert!(matches!(
            PersistentEntity::from_descriptor(empty, terminal),
            Err(MetadataError::NoProperties { .. })
        ));
    }

    #[test]
    fn associations_follow_element_and_value_types() {
        let descriptor = TypeDescriptor::new("Person")
            .member("name", TypeRef::named("String"))
            .member("tags", TypeRef::collection_of(TypeRef::named("String")))
            .member("addresses", TypeRef::collection_of(TypeRef::named("Address")))
            .member("contacts", TypeRef::map_of(TypeRef::named("String"), TypeRef::named("Person")));
        let entity = PersistentEntity::from_descriptor(descriptor, terminal).unwrap();

        let names: Vec<_> = entity.associations().map(|p| p.name()).collect();
        assert_eq!(names, ["addresses", "contacts"]);

        let addresses = entity.property("addresses").unwrap();
        assert!(addresses.is_collection());
        assert_eq!(addresses.actual_type(), "Address");
        assert_eq!(addresses.owner(), "Person");

        let contacts = entity.property("contacts").unwrap();
        assert!(contacts.is_map());
        assert_eq!(contacts.map_value_type(), Some(&TypeRef::named("Person")));

        let order: Vec<_> = entity.properties().iter().map(|p| p.name()).collect();
        assert_eq!(order, ["name", "tags", "addresses", "contacts"]);
    }
}
