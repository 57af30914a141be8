//! Sources of raw type information.
//!
//! The registry never inspects types itself; it asks a [`MemberInspector`] for the
//! members of a type by name. Two implementations ship with the crate:
//! [`StaticInspector`] for explicit registration and [`DerivedInspector`] for types
//! annotated with `#[derive(Entity)]`.

mod registration;

use std::collections::{HashMap, HashSet};

use crate::types::TypeDescriptor;

pub use registration::{DerivedInspector, Described, EntityRegistration, get_entity_by_name, is_entity_registered, registered_entities};

/// Lists the accessible members of a type.
pub trait MemberInspector: Send + Sync {
    /// Describe the members of `type_name`, or `None` if the type is unknown.
    fn describe(&self, type_name: &str) -> Option<TypeDescriptor>;

    /// Whether the type is a leaf value that is never decomposed further.
    fn is_terminal(&self, _type_name: &str) -> bool {
        false
    }
}

/// Inspector backed by manually registered descriptors.
#[derive(Debug, Default, Clone)]
pub struct StaticInspector {
    types: HashMap<String, TypeDescriptor>,
    terminal: HashSet<String>,
}

impl StaticInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, descriptor: TypeDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    pub fn with_terminal(mut self, type_name: impl Into<String>) -> Self {
        self.mark_terminal(type_name);
        self
    }

    /// Register a descriptor, returning the one it replaced.
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Option<TypeDescriptor> {
        self.types.insert(descriptor.name.clone(), descriptor)
    }

    pub fn mark_terminal(&mut self, type_name: impl Into<String>) {
        self.terminal.insert(type_name.into());
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl MemberInspector for StaticInspector {
    fn describe(&self, type_name: &str) -> Option<TypeDescriptor> {
        self.types.get(type_name).cloned()
    }

    fn is_terminal(&self, type_name: &str) -> bool {
        self.terminal.contains(type_name)
    }
}

impl FromIterator<TypeDescriptor> for StaticInspector {
    fn from_iter<I: IntoIterator<Item = TypeDescriptor>>(iter: I) -> Self {
        let mut inspector = StaticInspector::new();
        for descriptor in iter {
            inspector.register(descriptor);
        }
        inspector
    }
}
