//! Runtime class model used in place of language-level reflection.
//!
//! An [`EntityClass`] lists the methods of a persistent type together with
//! type-erased invokers, so a generated proxy class can intercept and forward
//! calls by name. [`CapabilityInterface`]s contribute abstract methods that
//! only the proxy machinery answers.

pub mod class;
pub mod interface;

pub use class::{
    ConstructorHook, EntityClass, EntityClassBuilder, EntityRef, InvocationError,
    InvocationTargetError, MethodDescriptor, MethodOwner, Visibility, same_instance,
};
pub(crate) use class::bean_accessor;
pub use interface::{CapabilityInterface, DYNAMIC_OBJECT, ENTITY_PROXY, LAZY_PROXY, methods};
