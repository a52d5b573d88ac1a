//! The unit-of-work collaborator a proxy loads its target through.

mod in_memory;

pub use in_memory::InMemorySession;

use crate::core::Identifier;
use crate::reflect::EntityRef;

/// Owning session of a proxy.
///
/// `immediate_load` is the only call that does real work; the proxy invokes it
/// at most once per instance, synchronously, and never retries.
pub trait SessionImplementor: Send + Sync {
    /// Loads the row for `identifier`. `Ok(None)` means the row does not exist.
    fn immediate_load(
        &self,
        entity_name: &str,
        identifier: &Identifier,
    ) -> anyhow::Result<Option<EntityRef>>;

    fn is_open(&self) -> bool {
        true
    }

    fn is_connected(&self) -> bool {
        true
    }

    /// Instance already present in the persistence context, if any.
    fn get_loaded(&self, _entity_name: &str, _identifier: &Identifier) -> Option<EntityRef> {
        None
    }
}
