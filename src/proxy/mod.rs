//! Lazy entity proxies.
//!
//! A [`ProxyFactory`] generates (or reuses) a [`ProxyClass`] for a persistent
//! class and hands out [`EntityProxy`] handles that stand in for a row until
//! one of its business methods is called. Every call goes through the
//! [`DispatchRouter`], which answers bookkeeping calls from the lazy state and
//! forwards the rest to the real entity, loaded through the session on first
//! use.

mod builder;
mod cache;
mod class;
mod dynamic;
mod filter;
mod handle;
mod interceptor;
mod lazy;
mod router;
mod surrogate;

pub use builder::{
    CompositeIdType, IdentifierAccessor, NoopEnhancer, ProxyClassEnhancer, ProxyDescriptor,
    ProxyFactory, ProxyFactoryBuilder,
};
pub use class::{ProxyClass, ProxyMethod};
pub use dynamic::DynamicObjectHandler;
pub use filter::{MethodFilter, RUNTIME_INTERNAL_METHODS};
pub use handle::EntityProxy;
pub use interceptor::{Call, CallInterceptor, Interception, InterceptorChain};
pub use lazy::LazyInitializer;
pub use router::DispatchRouter;
pub use surrogate::{ProxyRegistry, ProxyReconstructor, SerializableProxy};

/// Number of generated classes currently held by the process-wide cache.
pub fn cached_class_count() -> crate::core::Result<usize> {
    cache::len()
}
