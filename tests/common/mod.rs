#![allow(dead_code)]

use entity_proxy::{
    EntityClass, EntityProxy, EntityRef, Identifier, IdentifierAccessor, InMemorySession,
    ProxyFactory, SessionImplementor, Value, Visibility,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

pub const USER: &str = "User";

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user {0} is locked")]
    Locked(i64),
}

#[derive(Default)]
pub struct User {
    pub id: RwLock<i64>,
    pub name: RwLock<String>,
    pub active: AtomicBool,
}

impl User {
    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id: RwLock::new(id),
            name: RwLock::new(name.to_string()),
            active: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> String {
        self.name.read().unwrap().clone()
    }
}

/// Persistent class for [`User`]. Each call builds a distinct class, so tests
/// never share generated classes through the process-wide cache.
pub fn user_class() -> Arc<EntityClass> {
    EntityClass::builder::<User>(USER)
        .getter("getId", |u| Value::from(*u.id.read().unwrap()))
        .setter("setId", |u, v| {
            *u.id.write().unwrap() = v.as_i64().ok_or_else(|| anyhow::anyhow!("id must be an integer"))?;
            Ok(())
        })
        .getter("getName", |u| Value::from(u.name()))
        .setter("setName", |u, v| {
            *u.name.write().unwrap() = v.to_string();
            Ok(())
        })
        .getter("isActive", |u| Value::from(u.active.load(Ordering::SeqCst)))
        .method("selfReturningMethod", 0, |u, _| Ok(Value::entity(u)))
        .method("rename", 1, |u, args| {
            *u.name.write().unwrap() = args[0].to_string();
            Ok(Value::entity(u))
        })
        .method("greet", 1, |u, args| {
            Ok(Value::from(format!("{}, {}", args[0], u.name())))
        })
        .method("lock", 0, |u, _| Err(UserError::Locked(*u.id.read().unwrap()).into()))
        .method_as("secret", 0, Visibility::Protected, |u, _| {
            Ok(Value::from(format!("secret of {}", u.name())))
        })
        .method("super$1$getName", 0, |u, _| Ok(Value::from(u.name())))
        .method("touch", 0, |u, _| Ok(Value::from(u.name())))
        .build()
}

pub fn user_factory() -> ProxyFactory {
    user_factory_for(user_class())
}

pub fn user_factory_for(class: Arc<EntityClass>) -> ProxyFactory {
    ProxyFactory::builder(class)
        .identifier_accessor(IdentifierAccessor::new("getId", Some("setId")))
        .build()
        .unwrap()
}

/// Session holding one user row.
pub fn session_with_user(id: i64, name: &str) -> Arc<InMemorySession> {
    let session = Arc::new(InMemorySession::new());
    session.insert(USER, id, User::new(id, name));
    session
}

/// Session whose every load fails.
pub struct FailingSession;

impl SessionImplementor for FailingSession {
    fn immediate_load(
        &self,
        _entity_name: &str,
        _identifier: &Identifier,
    ) -> anyhow::Result<Option<EntityRef>> {
        Err(anyhow::anyhow!("connection reset"))
    }
}

/// Session that calls back into the proxy it is loading.
#[derive(Default)]
pub struct ReentrantSession {
    pub proxy: OnceLock<EntityProxy>,
    pub observed: Mutex<Vec<String>>,
}

impl SessionImplementor for ReentrantSession {
    fn immediate_load(
        &self,
        _entity_name: &str,
        identifier: &Identifier,
    ) -> anyhow::Result<Option<EntityRef>> {
        if let Some(proxy) = self.proxy.get() {
            let mut observed = self.observed.lock().unwrap();
            observed.push(format!("{:?}", proxy.invoke("getId", vec![])));
            observed.push(format!("{:?}", proxy.is_initialized()));
            observed.push(match proxy.invoke("getName", vec![]) {
                Ok(value) => format!("Ok({})", value),
                Err(err) => err.to_string(),
            });
        }
        let id = match identifier {
            Identifier::Integer(id) => *id,
            _ => 0,
        };
        Ok(Some(Arc::new(User::new(id, "loaded")) as EntityRef))
    }
}

/// Session handing out an instance of the wrong type.
pub struct MismatchedSession;

impl SessionImplementor for MismatchedSession {
    fn immediate_load(
        &self,
        _entity_name: &str,
        _identifier: &Identifier,
    ) -> anyhow::Result<Option<EntityRef>> {
        Ok(Some(Arc::new(String::from("not a user")) as EntityRef))
    }
}

pub fn flag() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}
