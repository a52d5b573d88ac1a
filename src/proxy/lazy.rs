use crate::core::{Identifier, ProxyError, Result, SessionUnavailable};
use crate::reflect::EntityRef;
use crate::session::SessionImplementor;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use tracing::{debug, warn};

/// Per-proxy lazy state: identity of the row and, once fetched, the real entity.
pub struct LazyInitializer {
    entity_name: String,
    identifier: Identifier,
    session: RwLock<Option<Arc<dyn SessionImplementor>>>,
    target: OnceLock<EntityRef>,
    loading: AtomicBool,
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl LazyInitializer {
    pub fn new(
        entity_name: &str,
        identifier: Identifier,
        session: Option<Arc<dyn SessionImplementor>>,
    ) -> Self {
        Self {
            entity_name: entity_name.to_string(),
            identifier,
            session: RwLock::new(session),
            target: OnceLock::new(),
            loading: AtomicBool::new(false),
        }
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn is_uninitialized(&self) -> bool {
        self.target.get().is_none()
    }

    pub fn session(&self) -> Result<Option<Arc<dyn SessionImplementor>>> {
        Ok(self.session.read()?.clone())
    }

    pub fn set_session(&self, session: Arc<dyn SessionImplementor>) -> Result<()> {
        *self.session.write()? = Some(session);
        Ok(())
    }

    /// Detaches the proxy from its session.
    pub fn unset_session(&self) -> Result<()> {
        *self.session.write()? = None;
        Ok(())
    }

    pub fn initialize(&self) -> Result<()> {
        self.implementation().map(|_| ())
    }

    /// The real entity, fetched through the session on first use.
    pub fn implementation(&self) -> Result<EntityRef> {
        if let Some(target) = self.target.get() {
            return Ok(target.clone());
        }

        let session = self.session()?;
        let session = match session {
            None => return Err(self.unavailable(SessionUnavailable::NoSession)),
            Some(s) if !s.is_open() => return Err(self.unavailable(SessionUnavailable::Closed)),
            Some(s) if !s.is_connected() => {
                return Err(self.unavailable(SessionUnavailable::Disconnected));
            }
            Some(s) => s,
        };

        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ProxyError::ReentrantInitialization {
                entity_name: self.entity_name.clone(),
                identifier: self.identifier.to_string(),
            });
        }
        let _guard = LoadingGuard(&self.loading);

        let loaded = session
            .immediate_load(&self.entity_name, &self.identifier)
            .map_err(ProxyError::Session)?
            .ok_or_else(|| ProxyError::EntityNotFound {
                entity_name: self.entity_name.clone(),
                identifier: self.identifier.to_string(),
            })?;

        debug!(entity = %self.entity_name, id = %self.identifier, "Proxy initialized");
        Ok(self.target.get_or_init(|| loaded).clone())
    }

    /// Adopts an already loaded instance. Returns `false` if a delegate was set before.
    pub fn set_implementation(&self, target: EntityRef) -> bool {
        self.target.set(target).is_ok()
    }

    pub fn implementation_if_loaded(&self) -> Option<EntityRef> {
        self.target.get().cloned()
    }

    fn unavailable(&self, reason: SessionUnavailable) -> ProxyError {
        warn!(
            entity = %self.entity_name,
            id = %self.identifier,
            %reason,
            "Could not initialize proxy"
        );
        ProxyError::NoSession {
            entity_name: self.entity_name.clone(),
            identifier: self.identifier.to_string(),
            reason,
        }
    }
}

impl fmt::Debug for LazyInitializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyInitializer")
            .field("entity_name", &self.entity_name)
            .field("identifier", &self.identifier)
            .field("initialized", &!self.is_uninitialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySession;

    #[derive(Debug, PartialEq)]
    struct Invoice {
        total: i64,
    }

    fn session_with_invoice() -> Arc<InMemorySession> {
        let session = Arc::new(InMemorySession::new());
        session.insert("Invoice", 7, Invoice { total: 120 });
        session
    }

    #[test]
    fn test_fetches_once() {
        let session = session_with_invoice();
        let lazy = LazyInitializer::new("Invoice", Identifier::from(7), Some(session.clone()));
        assert!(lazy.is_uninitialized());

        let first = lazy.implementation().unwrap();
        let second = lazy.implementation().unwrap();
        assert!(crate::reflect::same_instance(&first, &second));
        assert_eq!(session.load_count(), 1);
        assert_eq!(first.downcast_ref::<Invoice>().unwrap().total, 120);
        assert!(!lazy.is_uninitialized());
    }

    #[test]
    fn test_session_state_is_checked_before_loading() {
        let session = session_with_invoice();
        let lazy = LazyInitializer::new("Invoice", Identifier::from(7), None);
        assert!(matches!(
            lazy.implementation(),
            Err(ProxyError::NoSession {
                reason: SessionUnavailable::NoSession,
                ..
            })
        ));

        lazy.set_session(session.clone()).unwrap();
        session.disconnect();
        assert!(matches!(
            lazy.implementation(),
            Err(ProxyError::NoSession {
                reason: SessionUnavailable::Disconnected,
                ..
            })
        ));

        session.close();
        assert!(matches!(
            lazy.implementation(),
            Err(ProxyError::NoSession {
                reason: SessionUnavailable::Closed,
                ..
            })
        ));
        assert_eq!(session.load_count(), 0);
        assert!(lazy.is_uninitialized());
    }

    #[test]
    fn test_missing_row_leaves_state_retryable() {
        let session = Arc::new(InMemorySession::new());
        let lazy = LazyInitializer::new("Invoice", Identifier::from(9), Some(session.clone()));
        assert!(matches!(
            lazy.implementation(),
            Err(ProxyError::EntityNotFound { .. })
        ));
        assert!(lazy.is_uninitialized());

        session.insert("Invoice", 9, Invoice { total: 1 });
        assert!(lazy.initialize().is_ok());
        assert!(!lazy.is_uninitialized());
    }

    #[test]
    fn test_set_implementation_first_write_wins() {
        let lazy = LazyInitializer::new("Invoice", Identifier::from(1), None);
        let a: EntityRef = Arc::new(Invoice { total: 1 });
        let b: EntityRef = Arc::new(Invoice { total: 2 });
        assert!(lazy.set_implementation(a.clone()));
        assert!(!lazy.set_implementation(b));
        let current = lazy.implementation_if_loaded().unwrap();
        assert!(crate::reflect::same_instance(&current, &a));
    }
}
