use crate::core::{Identifier, ObjectRef, ProxyError, Result, Value};
use crate::proxy::builder::ProxyDescriptor;
use crate::proxy::class::ProxyMethod;
use crate::proxy::handle::EntityProxy;
use crate::proxy::interceptor::{Call, Interception, InterceptorChain};
use crate::proxy::lazy::LazyInitializer;
use crate::proxy::surrogate::SerializableProxy;
use crate::reflect::{EntityRef, InvocationError, MethodOwner, methods};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Outcome of classifying a constructed-proxy call.
enum Dispatch {
    Return(Value),
    InvokeImplementation,
}

/// Per-proxy method handler.
///
/// Also the object handed out by `getLazyInitializer`: it exposes the lazy
/// state without triggering a fetch.
pub struct DispatchRouter {
    descriptor: Arc<ProxyDescriptor>,
    lazy: Arc<LazyInitializer>,
    constructed: AtomicBool,
    interceptors: OnceLock<InterceptorChain>,
}

impl DispatchRouter {
    pub(crate) fn new(descriptor: Arc<ProxyDescriptor>, lazy: Arc<LazyInitializer>) -> Self {
        Self {
            descriptor,
            lazy,
            constructed: AtomicBool::new(false),
            interceptors: OnceLock::new(),
        }
    }

    pub(crate) fn install_interceptors(&self, chain: InterceptorChain) {
        let _ = self.interceptors.set(chain);
    }

    pub(crate) fn mark_constructed(&self) {
        self.constructed.store(true, Ordering::Release);
    }

    pub fn is_constructed(&self) -> bool {
        self.constructed.load(Ordering::Acquire)
    }

    pub fn descriptor(&self) -> &Arc<ProxyDescriptor> {
        &self.descriptor
    }

    pub fn lazy_state(&self) -> &Arc<LazyInitializer> {
        &self.lazy
    }

    pub fn entity_name(&self) -> &str {
        self.lazy.entity_name()
    }

    pub fn identifier(&self) -> &Identifier {
        self.lazy.identifier()
    }

    pub fn is_uninitialized(&self) -> bool {
        self.lazy.is_uninitialized()
    }

    /// Fails with `Constructing` until the proxy is fully constructed.
    pub fn initialize(&self) -> Result<()> {
        self.ensure_constructed()?;
        self.lazy.initialize()
    }

    pub fn implementation(&self) -> Result<EntityRef> {
        self.ensure_constructed()?;
        self.lazy.implementation()
    }

    fn ensure_constructed(&self) -> Result<()> {
        if self.is_constructed() {
            return Ok(());
        }
        Err(ProxyError::Constructing {
            entity_name: self.entity_name().to_string(),
            identifier: self.identifier().to_string(),
        })
    }

    pub fn interceptor_names(&self) -> Vec<&str> {
        self.interceptors
            .get()
            .map(InterceptorChain::names)
            .unwrap_or_default()
    }

    pub(crate) fn invoke(
        self: &Arc<Self>,
        proxy: &EntityProxy,
        method: &ProxyMethod,
        args: &[Value],
    ) -> Result<Value> {
        if method.method().matches(methods::GET_LAZY_INITIALIZER, 0) {
            return Ok(Value::Object(ObjectRef::Initializer(self.clone())));
        }

        if let Some(chain) = self.interceptors.get() {
            let call = Call::new(proxy, method.method(), args);
            if let Interception::Handled(value) = chain.intercept(&call)? {
                return Ok(value);
            }
        }

        if !self.is_constructed() {
            return proxy.proceed(method, args);
        }

        match self.classify(proxy, method, args)? {
            Dispatch::Return(value) => Ok(value),
            Dispatch::InvokeImplementation => self.invoke_implementation(proxy, method, args),
        }
    }

    fn classify(&self, proxy: &EntityProxy, method: &ProxyMethod, args: &[Value]) -> Result<Dispatch> {
        let descriptor = method.method();
        let accessor = self.descriptor.identifier_accessor();
        let overrides_equals = self.descriptor.overrides_equals();

        if descriptor.matches(methods::WRITE_REPLACE, 0) {
            return self.replacement().map(Dispatch::Return);
        }
        if !overrides_equals && descriptor.matches(methods::HASH_CODE, 0) {
            return Ok(Dispatch::Return(Value::Integer(proxy.identity_hash() as i64)));
        }
        if self.lazy.is_uninitialized() && accessor.is_getter(descriptor) {
            return Ok(Dispatch::Return(self.identifier().to_value()));
        }
        if !overrides_equals && descriptor.matches(methods::EQUALS, 1) {
            let same = args[0].as_proxy().is_some_and(|other| other == proxy);
            return Ok(Dispatch::Return(Value::Boolean(same)));
        }
        if accessor.is_setter(descriptor) {
            self.lazy.initialize()?;
            return Ok(Dispatch::InvokeImplementation);
        }
        if let Some(component) = self
            .descriptor
            .composite_id_type()
            .and_then(|id_type| id_type.component_for(descriptor))
        {
            if let Some(part) = self.identifier().component(component) {
                return Ok(Dispatch::Return(part.to_value()));
            }
        }
        Ok(Dispatch::InvokeImplementation)
    }

    fn invoke_implementation(
        &self,
        proxy: &EntityProxy,
        method: &ProxyMethod,
        args: &[Value],
    ) -> Result<Value> {
        let target = self.lazy.implementation()?;
        let descriptor = method.method();

        let result = if descriptor.is_public() {
            if matches!(descriptor.owner(), MethodOwner::Entity(_))
                && !self.descriptor.persistent_class().is_instance(&target)
            {
                return Err(ProxyError::ClassCast(format!(
                    "entity loaded for [{}#{}] is not a {}",
                    self.entity_name(),
                    self.identifier(),
                    self.descriptor.persistent_class().name()
                )));
            }
            descriptor.invoke(&target, args, false)
        } else {
            descriptor.invoke(&target, args, method.is_accessible())
        };

        let value = result.map_err(InvocationError::into_cause)?;
        Ok(substitute_identity(value, &target, proxy))
    }

    /// Value written in place of the proxy when it is serialized.
    fn replacement(&self) -> Result<Value> {
        if self.lazy.is_uninitialized() {
            if let Some(session) = self.lazy.session()? {
                if session.is_open() {
                    if let Some(loaded) = session.get_loaded(self.entity_name(), self.identifier())
                    {
                        self.lazy.set_implementation(loaded);
                    }
                }
            }
        }

        match self.lazy.implementation_if_loaded() {
            Some(target) => Ok(Value::Object(ObjectRef::Entity(target))),
            None => Ok(Value::Json(self.serializable_proxy().to_json_value()?)),
        }
    }

    pub fn serializable_proxy(&self) -> SerializableProxy {
        SerializableProxy::snapshot(&self.descriptor, &self.lazy, true)
    }
}

/// Replaces a result that is the delegate itself with the proxy.
pub(crate) fn substitute_identity(value: Value, target: &EntityRef, proxy: &EntityProxy) -> Value {
    if value.is_instance(target) {
        Value::from(proxy.clone())
    } else {
        value
    }
}

impl fmt::Debug for DispatchRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchRouter")
            .field("entity_name", &self.entity_name())
            .field("identifier", self.identifier())
            .field("constructed", &self.is_constructed())
            .field("initialized", &!self.is_uninitialized())
            .finish()
    }
}
