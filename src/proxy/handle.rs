use crate::core::{FromValue, Identifier, ObjectRef, ProxyError, Result, Value};
use crate::proxy::class::{ProxyClass, ProxyMethod};
use crate::proxy::router::DispatchRouter;
use crate::proxy::surrogate::SerializableProxy;
use crate::reflect::{EntityRef, InvocationError, methods};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

pub(crate) struct ProxyInner {
    class: Arc<ProxyClass>,
    /// The proxy's own superclass part; never loaded from the session.
    shell: EntityRef,
    router: Arc<DispatchRouter>,
}

/// Handle to a lazy entity proxy.
///
/// Cloning yields the same proxy: equality and hashing follow identity.
#[derive(Clone)]
pub struct EntityProxy {
    inner: Arc<ProxyInner>,
}

impl EntityProxy {
    pub(crate) fn new(class: Arc<ProxyClass>, shell: EntityRef, router: Arc<DispatchRouter>) -> Self {
        Self {
            inner: Arc::new(ProxyInner {
                class,
                shell,
                router,
            }),
        }
    }

    /// Calls `name` with `args` through the generated class.
    pub fn invoke(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        let method = self
            .inner
            .class
            .find(name, args.len())
            .ok_or_else(|| ProxyError::NoSuchMethod {
                class_name: self.inner.class.name().to_string(),
                method: name.to_string(),
                arity: args.len(),
            })?;
        if !method.is_intercepted() {
            return self.proceed(method, &args);
        }
        self.inner.router.invoke(self, method, &args)
    }

    /// Typed variant of [`invoke`](Self::invoke).
    pub fn call<T: FromValue>(&self, name: &str, args: Vec<Value>) -> Result<T> {
        T::from_value(self.invoke(name, args)?)
    }

    /// Runs the superclass behaviour on the proxy's own instance.
    pub(crate) fn proceed(&self, method: &ProxyMethod, args: &[Value]) -> Result<Value> {
        method
            .method()
            .invoke(&self.inner.shell, args, true)
            .map_err(InvocationError::into_cause)
    }

    pub fn proxy_class(&self) -> &Arc<ProxyClass> {
        &self.inner.class
    }

    pub fn entity_name(&self) -> &str {
        self.inner.router.entity_name()
    }

    pub fn identifier(&self) -> &Identifier {
        self.inner.router.identifier()
    }

    pub fn is_initialized(&self) -> bool {
        !self.inner.router.is_uninitialized()
    }

    /// Address-based hash, stable for the proxy's lifetime.
    pub fn identity_hash(&self) -> u64 {
        Arc::as_ptr(&self.inner) as usize as u64
    }

    pub fn lazy_initializer(&self) -> &Arc<DispatchRouter> {
        &self.inner.router
    }

    pub fn get_property(&self, name: &str) -> Result<Value> {
        self.invoke(methods::GET_PROPERTY, vec![Value::from(name)])
    }

    pub fn set_property(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.invoke(methods::SET_PROPERTY, vec![Value::from(name), value.into()])
            .map(|_| ())
    }

    pub fn invoke_method(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        self.invoke(methods::INVOKE_METHOD, vec![Value::from(name), Value::List(args)])
    }

    /// Loads the entity. While the proxy is constructing this runs the
    /// superclass `initialize` instead, so nothing is fetched.
    pub fn initialize(&self) -> Result<()> {
        if !self.inner.router.is_constructed() {
            return self.invoke(methods::INITIALIZE, vec![]).map(|_| ());
        }
        self.inner.router.initialize()
    }

    pub fn target(&self) -> Result<EntityRef> {
        if !self.inner.router.is_constructed() {
            return match self.invoke(methods::GET_TARGET, vec![])? {
                Value::Object(ObjectRef::Entity(target)) => Ok(target),
                other => Err(ProxyError::ClassCast(format!(
                    "getTarget of [{}#{}] returned {} while constructing",
                    self.entity_name(),
                    self.identifier(),
                    other.type_name()
                ))),
            };
        }
        self.inner.router.implementation()
    }

    pub fn target_as<E: Any + Send + Sync>(&self) -> Result<Arc<E>> {
        self.target()?.downcast::<E>().map_err(|_| {
            ProxyError::ClassCast(format!(
                "target of [{}#{}] is not a {}",
                self.entity_name(),
                self.identifier(),
                std::any::type_name::<E>()
            ))
        })
    }

    /// Serialization surrogate. Never fetches; the reconstructed proxy starts uninitialized.
    pub fn write_replace(&self) -> SerializableProxy {
        self.inner.router.serializable_proxy()
    }

    /// Like [`write_replace`](Self::write_replace), but with
    /// `preserve_initialized` a loaded proxy is reconstructed loaded.
    pub fn snapshot(&self, preserve_initialized: bool) -> SerializableProxy {
        let router = &self.inner.router;
        let reenter_uninitialized = !(preserve_initialized && self.is_initialized());
        SerializableProxy::snapshot(router.descriptor(), router.lazy_state(), reenter_uninitialized)
    }

    pub(crate) fn downgrade(&self) -> Weak<ProxyInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn inner_ptr(&self) -> *const ProxyInner {
        Arc::as_ptr(&self.inner)
    }
}

impl PartialEq for EntityProxy {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for EntityProxy {}

impl std::hash::Hash for EntityProxy {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identity_hash().hash(state);
    }
}

impl fmt::Debug for EntityProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityProxy")
            .field("class", &self.inner.class.name())
            .field("entity_name", &self.entity_name())
            .field("identifier", self.identifier())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
