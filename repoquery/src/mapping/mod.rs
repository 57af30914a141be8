//! Entity metadata model and the registry that builds it.

mod entity;
mod property;
mod registry;

pub use entity::{CONVENTIONAL_ID, PersistentEntity};
pub use property::PersistentProperty;
pub use registry::EntityRegistry;
