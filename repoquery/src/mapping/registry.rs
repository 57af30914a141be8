//! Lazily built, cached graph of entity metadata.
//!
//! The registry is the only shared mutable state of the crate. Every type is built
//! at most once: the thread that first inserts the pending slot for a type builds
//! it, every other thread asking for the same type waits until the slot becomes
//! ready or disappears. While building, the registry walks the associations of the
//! new entity and registers every target it has not seen yet. Targets that are
//! already pending (a self-reference, a cycle, or a type another thread is
//! building) are skipped, so the walk itself never blocks.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use log::{debug, trace};

use super::PersistentEntity;
use crate::config::{ParserConfig, TerminalTypes};
use crate::errors::MetadataError;
use crate::inspector::MemberInspector;

enum Slot {
    /// Under construction by the given thread.
    Pending(ThreadId),
    Ready(Arc<PersistentEntity>),
}

pub struct EntityRegistry {
    inspector: Arc<dyn MemberInspector>,
    terminal: TerminalTypes,
    slots: Mutex<HashMap<String, Slot>>,
    settled: Condvar,
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("terminal", &self.terminal.len())
            .field("entities", &self.len())
            .finish_non_exhaustive()
    }
}

impl EntityRegistry {
    pub fn new(inspector: Arc<dyn MemberInspector>, terminal: TerminalTypes) -> Self {
        Self {
            inspector,
            terminal,
            slots: Mutex::new(HashMap::new()),
            settled: Condvar::new(),
        }
    }

    /// Registry treating the default primitive and library types as terminal.
    pub fn with_defaults(inspector: Arc<dyn MemberInspector>) -> Self {
        Self::new(inspector, TerminalTypes::defaults())
    }

    pub fn from_config(inspector: Arc<dyn MemberInspector>, config: &ParserConfig) -> Self {
        Self::new(inspector, config.terminal())
    }

    /// Whether `type_name` is a leaf value that never gets metadata.
    pub fn is_terminal(&self, type_name: &str) -> bool {
        self.terminal.contains(type_name) || self.inspector.is_terminal(type_name)
    }

    /// Metadata of `type_name`, building it and everything reachable from it on
    /// first request.
    pub fn entity_for(&self, type_name: &str) -> Result<Arc<PersistentEntity>, MetadataError> {
        if self.is_terminal(type_name) {
            return Err(MetadataError::TerminalType {
                type_name: type_name.to_string(),
            });
        }

        let current = thread::current().id();
        let mut slots = self.lock();
        loop {
            match slots.get(type_name) {
                Some(Slot::Ready(entity)) => return Ok(Arc::clone(entity)),
                Some(Slot::Pending(owner)) if *owner == current => {
                    return Err(MetadataError::Cycle {
                        type_name: type_name.to_string(),
                    });
                }
                Some(Slot::Pending(_)) => {
                    trace!("waiting for `{type_name}` built on another thread");
                    slots = self.settled.wait(slots).unwrap_or_else(PoisonError::into_inner);
                }
                None => {
                    slots.insert(type_name.to_string(), Slot::Pending(current));
                    break;
                }
            }
        }
        drop(slots);

        self.construct(type_name)
    }

    /// Eagerly build the metadata of several root types, stopping at the first failure.
    pub fn initialize<I, S>(&self, roots: I) -> Result<(), MetadataError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for root in roots {
            self.entity_for(root.as_ref())?;
        }
        Ok(())
    }

    /// True once `type_name` is fully built.
    pub fn contains(&self, type_name: &str) -> bool {
        matches!(self.lock().get(type_name), Some(Slot::Ready(_)))
    }

    /// Number of fully built entities.
    pub fn len(&self) -> usize {
        self.lock().values().filter(|slot| matches!(slot, Slot::Ready(_))).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the built entities, sorted by type name.
    pub fn entities(&self) -> Vec<Arc<PersistentEntity>> {
        let mut entities: Vec<_> = self
            .lock()
            .values()
            .filter_map(|slot| match slot {
                Slot::Ready(entity) => Some(Arc::clone(entity)),
                Slot::Pending(_) => None,
            })
            .collect();
        entities.sort_by(|a, b| a.type_name().cmp(b.type_name()));
        entities
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build a type whose pending slot is owned by the calling thread.
    fn construct(&self, type_name: &str) -> Result<Arc<PersistentEntity>, MetadataError> {
        let pending = PendingSlot {
            registry: self,
            type_name,
            published: false,
        };
        let entity = Arc::new(self.build(type_name)?);
        Ok(pending.publish(entity))
    }

    fn build(&self, type_name: &str) -> Result<PersistentEntity, MetadataError> {
        debug!("building metadata for `{type_name}`");
        let descriptor = self
            .inspector
            .describe(type_name)
            .ok_or_else(|| MetadataError::Undescribable {
                type_name: type_name.to_string(),
            })?;
        if descriptor.name != type_name {
            return Err(MetadataError::TypeMismatch {
                requested: type_name.to_string(),
                described: descriptor.name,
            });
        }

        let entity = PersistentEntity::from_descriptor(descriptor, |name| self.is_terminal(name))?;
        for association in entity.associations() {
            self.register_reachable(association.actual_type())
                .map_err(|source| MetadataError::Association {
                    type_name: type_name.to_string(),
                    property: association.name().to_string(),
                    source: Box::new(source),
                })?;
        }
        Ok(entity)
    }

    /// Register an association target unless it is already known or in progress.
    fn register_reachable(&self, type_name: &str) -> Result<(), MetadataError> {
        {
            let mut slots = self.lock();
            if slots.contains_key(type_name) {
                trace!("`{type_name}` already known, keeping reference");
                return Ok(());
            }
            slots.insert(type_name.to_string(), Slot::Pending(thread::current().id()));
        }
        self.construct(type_name).map(drop)
    }
}

/// Pending slot owned by the building thread. Dropping it without publishing
/// removes the slot, so a failed or panicking construction never strands waiters.
struct PendingSlot<'a> {
    registry: &'a EntityRegistry,
    type_name: &'a str,
    published: bool,
}

impl PendingSlot<'_> {
    fn publish(mut self, entity: Arc<PersistentEntity>) -> Arc<PersistentEntity> {
        self.registry
            .lock()
            .insert(self.type_name.to_string(), Slot::Ready(Arc::clone(&entity)));
        self.published = true;
        debug!("published metadata for `{}`", self.type_name);
        entity
    }
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        if !self.published {
            self.registry.lock().remove(self.type_name);
            debug!("construction of `{}` failed", self.type_name);
        }
        self.registry.settled.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspector::StaticInspector;
    use crate::types::{TypeDescriptor, TypeRef};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry(inspector: StaticInspector) -> EntityRegistry {
        EntityRegistry::with_defaults(Arc::new(inspector))
    }

    #[test]
    fn self_reference_registers_once() {
        let registry = registry(StaticInspector::new().with_type(
            TypeDescriptor::new("Node")
                .member("value", TypeRef::named("i32"))
                .member("next", TypeRef::named("Node")),
        ));

        let node = registry.entity_for("Node").unwrap();
        let next = node.property("next").unwrap();
        assert!(next.is_association());
        assert_eq!(next.actual_type(), "Node");
        assert!(!node.property("value").unwrap().is_association());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn indirect_cycle_builds_both_sides() {
        let registry = registry(
            StaticInspector::new()
                .with_type(
                    TypeDescriptor::new("Customer")
                        .member("id", TypeRef::named("u64"))
                        .member("orders", TypeRef::collection_of(TypeRef::named("Order"))),
                )
                .with_type(
                    TypeDescriptor::new("Order")
                        .member("id", TypeRef::named("u64"))
                        .member("customer", TypeRef::named("Customer")),
                ),
        );

        let customer = registry.entity_for("Customer").unwrap();
        assert!(registry.contains("Order"));
        let order = registry.entity_for("Order").unwrap();
        assert_eq!(order.property("customer").unwrap().actual_type(), customer.type_name());

        let names: Vec<_> = registry.entities().iter().map(|e| e.type_name().to_string()).collect();
        assert_eq!(names, ["Customer", "Order"]);
    }

    #[test]
    fn repeated_requests_share_the_entity() {
        let registry = registry(
            StaticInspector::new().with_type(TypeDescriptor::new("Tag").member("label", TypeRef::named("String"))),
        );
        let first = registry.entity_for("Tag").unwrap();
        let second = registry.entity_for("Tag").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn failures_do_not_poison_other_entries() {
        let registry = registry(
            StaticInspector::new()
                .with_type(TypeDescriptor::new("Address").member("city", TypeRef::named("String")))
                .with_type(
                    TypeDescriptor::new("Person")
                        .member("address", TypeRef::named("Address"))
                        .member("pet", TypeRef::named("Pet")),
                ),
        );

        registry.entity_for("Address").unwrap();
        let err = registry.entity_for("Person").unwrap_err();
        match &err {
            MetadataError::Association { type_name, property, .. } => {
                assert_eq!(type_name, "Person");
                assert_eq!(property, "pet");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.root_cause(),
            &MetadataError::Undescribable {
                type_name: "Pet".into()
            }
        );

        assert!(registry.contains("Address"));
        assert!(!registry.contains("Person"));
        assert!(!registry.contains("Pet"));
        // the failed type is retried, not cached as broken
        assert!(registry.entity_for("Person").is_err());
    }

    #[test]
    fn terminal_and_mismatched_types_are_rejected() {
        struct Liar;
        impl MemberInspector for Liar {
            fn describe(&self, _type_name: &str) -> Option<TypeDescriptor> {
                Some(TypeDescriptor::new("Other").member("x", TypeRef::named("i32")))
            }
        }

        let registry = EntityRegistry::with_defaults(Arc::new(Liar));
        assert!(matches!(
            registry.entity_for("String"),
            Err(MetadataError::TerminalType { .. })
        ));
        assert_eq!(
            registry.entity_for("Thing").unwrap_err(),
            MetadataError::TypeMismatch {
                requested: "Thing".into(),
                described: "Other".into(),
            }
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn configured_terminal_types_are_not_associations() {
        let inspector = StaticInspector::new()
            .with_type(TypeDescriptor::new("Invoice").member("total", TypeRef::named("Money")))
            .with_terminal("Currency");
        let registry = EntityRegistry::new(Arc::new(inspector), TerminalTypes::defaults().with("Money"));

        let invoice = registry.entity_for("Invoice").unwrap();
        assert!(!invoice.property("total").unwrap().is_association());
        assert!(registry.is_terminal("Currency"));
    }

    #[test]
    fn inspector_is_asked_once_per_type() {
        struct Counting {
            inner: StaticInspector,
            calls: AtomicUsize,
        }
        impl MemberInspector for Counting {
            fn describe(&self, type_name: &str) -> Option<TypeDescriptor> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.inner.describe(type_name)
            }
        }

        let inspector = Arc::new(Counting {
            inner: StaticInspector::new().with_type(
                TypeDescriptor::new("Node").member("children", TypeRef::collection_of(TypeRef::named("Node"))),
            ),
            calls: AtomicUsize::new(0),
        });
        let registry = EntityRegistry::with_defaults(inspector.clone());
        registry.initialize(["Node", "Node"]).unwrap();
        assert_eq!(inspector.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reentrant_request_on_the_building_thread_is_a_cycle() {
        use std::sync::{Mutex, OnceLock, Weak};

        struct Reentrant {
            registry: OnceLock<Weak<EntityRegistry>>,
            nested: Mutex<Option<MetadataError>>,
        }
        impl MemberInspector for Reentrant {
            fn describe(&self, type_name: &str) -> Option<TypeDescriptor> {
                if let Some(registry) = self.registry.get().and_then(Weak::upgrade) {
                    *self.nested.lock().unwrap() = registry.entity_for(type_name).err();
                }
                Some(TypeDescriptor::new(type_name).member("id", TypeRef::named("u64")))
            }
        }

        let inspector = Arc::new(Reentrant {
            registry: OnceLock::new(),
            nested: Mutex::new(None),
        });
        let registry = Arc::new(EntityRegistry::with_defaults(inspector.clone()));
        inspector.registry.set(Arc::downgrade(&registry)).unwrap();

        let account = registry.entity_for("Account").unwrap();
        assert_eq!(account.type_name(), "Account");
        assert_eq!(
            inspector.nested.lock().unwrap().take(),
            Some(MetadataError::Cycle {
                type_name: "Account".into(),
            })
        );
        assert!(registry.contains("Account"));
    }
}
