use serde::Serialize;

use crate::types::TypeRef;

/// Metadata of one property of a [`PersistentEntity`](super::PersistentEntity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistentProperty {
    name: String,
    /// Type name of the owning entity. Only used to look the owner up again.
    owner: String,
    declared_type: TypeRef,
    association: bool,
    identifier: bool,
}

impl PersistentProperty {
    pub(crate) fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        declared_type: TypeRef,
        association: bool,
        identifier: bool,
    ) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            declared_type,
            association,
            identifier,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn declared_type(&self) -> &TypeRef {
        &self.declared_type
    }

    #[inline]
    pub fn is_collection(&self) -> bool {
        self.declared_type.is_collection()
    }

    #[inline]
    pub fn is_map(&self) -> bool {
        self.declared_type.is_map()
    }

    /// True when the actual type is itself an entity rather than a terminal value.
    #[inline]
    pub fn is_association(&self) -> bool {
        self.association
    }

    #[inline]
    pub fn is_identifier(&self) -> bool {
        self.identifier
    }

    pub fn element_type(&self) -> Option<&TypeRef> {
        self.declared_type.element()
    }

    pub fn map_value_type(&self) -> Option<&TypeRef> {
        self.declared_type.map_value()
    }

    /// Type a property path continues into after this property.
    pub fn actual_type(&self) -> &str {
        self.declared_type.actual_name()
    }

    pub(crate) fn set_identifier(&mut self) {
        self.identifier = true;
    }
}
