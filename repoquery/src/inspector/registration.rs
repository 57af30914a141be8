//! Entity auto-registration via inventory crate.
//!
//! `#[derive(Entity)]` implements [`Described`] and submits an [`EntityRegistration`]
//! to the inventory, so every derived type linked into the binary can be described
//! by [`DerivedInspector`] without explicit registration.

use super::MemberInspector;
use crate::types::TypeDescriptor;

/// Implemented by `#[derive(Entity)]`.
pub trait Described {
    /// Name under which the type is registered (struct name unless overridden).
    const TYPE_NAME: &'static str;

    fn type_descriptor() -> TypeDescriptor;
}

/// Registration submitted to the inventory by the derive macro.
pub struct EntityRegistration {
    /// Registered type name (e.g., "Person")
    pub type_name: &'static str,
    /// Module the struct was declared in
    pub module_path: &'static str,
    /// Function producing the member descriptor
    pub descriptor_fn: fn() -> TypeDescriptor,
}

inventory::collect!(EntityRegistration);

/// Get all registered entities.
pub fn registered_entities() -> impl Iterator<Item = &'static EntityRegistration> {
    inventory::iter::<EntityRegistration>()
}

/// Get a registered entity by type name.
pub fn get_entity_by_name(type_name: &str) -> Option<&'static EntityRegistration> {
    registered_entities().find(|e| e.type_name == type_name)
}

/// Check if an entity type is registered.
pub fn is_entity_registered<T: Described>() -> bool {
    get_entity_by_name(T::TYPE_NAME).is_some()
}

/// Inspector reading descriptors submitted by `#[derive(Entity)]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DerivedInspector;

impl MemberInspector for DerivedInspector {
    fn describe(&self, type_name: &str) -> Option<TypeDescriptor> {
        get_entity_by_name(type_name).map(|registration| (registration.descriptor_fn)())
    }
}
