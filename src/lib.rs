// ============================================================================
// Entity Proxy Library
// ============================================================================

//! Transparent lazy-loading proxies for ORM entities.
//!
//! A proxy stands in for a persistent entity that has not been loaded yet.
//! Identifier access, equality, hashing and serialization are answered
//! without touching the database; the first business method call loads the
//! row through the owning session exactly once and forwards every later call
//! to the loaded instance.
//!
//! ```ignore
//! use entity_proxy::{EntityClass, IdentifierAccessor, InMemorySession, ProxyFactory, Value};
//!
//! let class = EntityClass::builder::<User>("User")
//!     .getter("getId", |u| Value::from(u.id))
//!     .getter("getName", |u| Value::from(u.name()))
//!     .build();
//! let factory = ProxyFactory::builder(class)
//!     .identifier_accessor(IdentifierAccessor::new("getId", Some("setId")))
//!     .build()?;
//!
//! let proxy = factory.create_proxy(42, Some(session))?;
//! assert_eq!(proxy.invoke("getId", vec![])?, Value::Integer(42)); // no fetch
//! assert_eq!(proxy.invoke("getName", vec![])?, Value::from("X")); // one fetch
//! ```

pub mod config;
pub mod core;
pub mod proxy;
pub mod reflect;
pub mod session;
mod macros;

#[doc(hidden)]
pub use paste;

// Re-export main types for convenience
pub use config::ProxyConfig;
pub use crate::core::{FromValue, Identifier, ObjectRef, ProxyError, Result, SessionUnavailable, Value};
pub use proxy::{
    CallInterceptor, CompositeIdType, DispatchRouter, EntityProxy, IdentifierAccessor,
    Interception, LazyInitializer, ProxyClass, ProxyClassEnhancer, ProxyFactory,
    ProxyReconstructor, ProxyRegistry, SerializableProxy,
};
pub use reflect::{CapabilityInterface, EntityClass, EntityRef, Visibility};
pub use session::{InMemorySession, SessionImplementor};
