use super::SessionImplementor;
use crate::core::Identifier;
use crate::reflect::EntityRef;
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

type RowKey = (String, Identifier);

/// Map-backed session: a table of stored rows plus the persistence context
/// of rows this session has already handed out.
pub struct InMemorySession {
    rows: RwLock<HashMap<RowKey, EntityRef>>,
    context: RwLock<HashMap<RowKey, EntityRef>>,
    open: AtomicBool,
    connected: AtomicBool,
    loads: AtomicUsize,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            context: RwLock::new(HashMap::new()),
            open: AtomicBool::new(true),
            connected: AtomicBool::new(true),
            loads: AtomicUsize::new(0),
        }
    }

    /// Stores a row and returns the instance the session will hand out.
    pub fn insert<E: Any + Send + Sync>(
        &self,
        entity_name: &str,
        identifier: impl Into<Identifier>,
        entity: E,
    ) -> Arc<E> {
        let entity = Arc::new(entity);
        self.insert_ref(entity_name, identifier, entity.clone());
        entity
    }

    pub fn insert_ref(&self, entity_name: &str, identifier: impl Into<Identifier>, entity: EntityRef) {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((entity_name.to_string(), identifier.into()), entity);
    }

    /// Places an instance straight into the persistence context.
    pub fn attach(&self, entity_name: &str, identifier: impl Into<Identifier>, entity: EntityRef) {
        self.context
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((entity_name.to_string(), identifier.into()), entity);
    }

    /// Number of `immediate_load` calls served so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }
}

impl Default for InMemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionImplementor for InMemorySession {
    fn immediate_load(
        &self,
        entity_name: &str,
        identifier: &Identifier,
    ) -> anyhow::Result<Option<EntityRef>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let key = (entity_name.to_string(), identifier.clone());
        let row = self
            .rows
            .read()
            .map_err(|e| anyhow::anyhow!("session rows poisoned: {}", e))?
            .get(&key)
            .cloned();
        debug!(entity = entity_name, id = %identifier, found = row.is_some(), "Immediate load");
        if let Some(entity) = &row {
            self.context
                .write()
                .map_err(|e| anyhow::anyhow!("persistence context poisoned: {}", e))?
                .insert(key, entity.clone());
        }
        Ok(row)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn get_loaded(&self, entity_name: &str, identifier: &Identifier) -> Option<EntityRef> {
        self.context
            .read()
            .ok()?
            .get(&(entity_name.to_string(), identifier.clone()))
            .cloned()
    }
}
