//! repoquery core library.
//!
//! Derives structured predicate trees from repository query method names such as
//! `findByAgeGreaterThanAndNameOrderByNameDesc`, resolving every property
//! reference against a lazily built, cycle-safe registry of entity metadata.

extern crate self as repoquery;

pub mod config;
pub mod errors;
pub mod inspector;
pub mod mapping;
pub mod path;
pub mod query;
pub mod types;

use std::sync::Arc;

pub use config::{ParserConfig, TerminalTypes};
pub use errors::*;
pub use inspector::{DerivedInspector, Described, MemberInspector, StaticInspector};
pub use mapping::{EntityRegistry, PersistentEntity, PersistentProperty};
pub use path::{PathResolver, PropertyPath};
pub use query::{
    AndGroup, Direction, IgnoreCase, Intent, Keyword, KeywordVocabulary, Order, Part, PredicateTree,
    QueryMethodParser,
};
pub use repoquery_macros::Entity;
pub use types::{MemberDescriptor, TypeDescriptor, TypeRef};

// Re-export inventory for auto-registration in the entity derive macro
pub use inventory;

/// Parser over every type registered with `#[derive(Entity)]`.
pub fn derived_parser(config: &ParserConfig) -> Result<QueryMethodParser, Error> {
    let registry = EntityRegistry::from_config(Arc::new(DerivedInspector), config);
    Ok(QueryMethodParser::with_config(Arc::new(registry), config)?)
}

/// Parse `method` against the derived entity `T` with the default configuration.
///
/// Builds a fresh registry on every call; hosts parsing many methods should keep a
/// [`QueryMethodParser`] around instead.
pub fn parse_method<T: Described>(method: &str) -> Result<PredicateTree, Error> {
    let parser = derived_parser(&ParserConfig::default())?;
    parser.registry().entity_for(T::TYPE_NAME)?;
    Ok(parser.parse(method, T::TYPE_NAME)?)
}
