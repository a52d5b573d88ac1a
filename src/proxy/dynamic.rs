use crate::core::{ObjectRef, ProxyError, Result, Value};
use crate::proxy::builder::ProxyDescriptor;
use crate::proxy::handle::{EntityProxy, ProxyInner};
use crate::proxy::interceptor::{Call, CallInterceptor, Interception};
use crate::proxy::lazy::LazyInitializer;
use crate::proxy::router::substitute_identity;
use crate::reflect::{EntityRef, InvocationError, bean_accessor, methods};
use std::sync::{Arc, OnceLock, Weak};

/// Answers the dynamic object protocol (name-based property access and
/// method invocation) plus the `EntityProxy` state queries.
pub struct DynamicObjectHandler {
    descriptor: Arc<ProxyDescriptor>,
    lazy: Arc<LazyInitializer>,
    id_property: Option<String>,
    original_self: Weak<ProxyInner>,
    target: OnceLock<EntityRef>,
}

impl DynamicObjectHandler {
    pub(crate) fn new(
        descriptor: Arc<ProxyDescriptor>,
        lazy: Arc<LazyInitializer>,
        proxy: &EntityProxy,
    ) -> Self {
        let id_property = descriptor.identifier_accessor().property_name();
        Self {
            descriptor,
            lazy,
            id_property,
            original_self: proxy.downgrade(),
            target: OnceLock::new(),
        }
    }

    fn proxy_class_name(&self) -> Value {
        Value::from(self.descriptor.proxy_class().name())
    }

    fn is_proxy_initiated(&self) -> bool {
        self.target.get().is_some() || !self.lazy.is_uninitialized()
    }

    fn proxy_key(&self) -> Value {
        self.lazy.identifier().to_value()
    }

    fn resolve_delegate(&self) -> Result<EntityRef> {
        if let Some(target) = self.target.get() {
            return Ok(target.clone());
        }
        let target = self.lazy.implementation()?;
        Ok(self.target.get_or_init(|| target).clone())
    }

    fn is_id_property(&self, name: &str) -> bool {
        self.id_property.as_deref() == Some(name)
    }

    /// Invokes `name/args` on the delegate, swapping the delegate for the proxy in the result.
    fn call_delegate(&self, proxy: &EntityProxy, name: &str, args: &[Value]) -> Result<Value> {
        let class = self.descriptor.persistent_class();
        let method = class
            .find_method(name, args.len())
            .ok_or_else(|| ProxyError::NoSuchMethod {
                class_name: class.name().to_string(),
                method: name.to_string(),
                arity: args.len(),
            })?;
        let target = self.resolve_delegate()?;
        let value = method
            .invoke(&target, args, true)
            .map_err(InvocationError::into_cause)?;
        Ok(substitute_identity(value, &target, proxy))
    }

    fn get_property(&self, proxy: &EntityProxy, name: &str) -> Result<Value> {
        if name == methods::META_CLASS_PROPERTY {
            return Ok(self.proxy_class_name());
        }
        if self.is_id_property(name) && !self.is_proxy_initiated() {
            return Ok(self.proxy_key());
        }
        let class = self.descriptor.persistent_class();
        let getter = bean_accessor("get", name);
        if class.find_method(&getter, 0).is_some() {
            return self.call_delegate(proxy, &getter, &[]);
        }
        let flag = bean_accessor("is", name);
        if class.find_method(&flag, 0).is_some() {
            return self.call_delegate(proxy, &flag, &[]);
        }
        Err(ProxyError::NoSuchMethod {
            class_name: class.name().to_string(),
            method: getter,
            arity: 0,
        })
    }

    fn invoke_method(&self, proxy: &EntityProxy, name: &str, args: &Value) -> Result<Value> {
        let args = match args {
            Value::List(items) => items.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        };
        let id_getter = self.descriptor.identifier_accessor().getter();
        if args.is_empty() && id_getter == Some(name) && !self.is_proxy_initiated() {
            return Ok(self.proxy_key());
        }
        self.call_delegate(proxy, name, &args)
    }
}

fn property_name(value: &Value) -> Result<&str> {
    value.as_str().ok_or_else(|| {
        ProxyError::IllegalArgument(format!(
            "property name must be TEXT, got {}",
            value.type_name()
        ))
    })
}

impl CallInterceptor for DynamicObjectHandler {
    fn name(&self) -> &str {
        "dynamic-object"
    }

    fn intercept(&self, call: &Call<'_>) -> Result<Interception> {
        if !std::ptr::eq(call.proxy.inner_ptr(), self.original_self.as_ptr()) {
            return Err(ProxyError::IdentityViolation(format!(
                "self instance has changed for [{}#{}]",
                self.lazy.entity_name(),
                self.lazy.identifier()
            )));
        }

        let proxy = call.proxy;
        let args = call.args;
        let value = if call.is(methods::GET_PROPERTY, 1) {
            self.get_property(proxy, property_name(&args[0])?)?
        } else if call.is(methods::SET_PROPERTY, 2) {
            let setter = bean_accessor("set", property_name(&args[0])?);
            self.call_delegate(proxy, &setter, &args[1..])?;
            Value::Null
        } else if call.is(methods::INVOKE_METHOD, 2) {
            self.invoke_method(proxy, property_name(&args[0])?, &args[1])?
        } else if call.is(methods::GET_META_CLASS, 0) {
            self.proxy_class_name()
        } else if call.is(methods::GET_PROXY_KEY, 0) {
            self.proxy_key()
        } else if call.is(methods::IS_INITIALIZED, 0) {
            Value::Boolean(self.is_proxy_initiated())
        } else if call.is(methods::GET_TARGET, 0) {
            Value::Object(ObjectRef::Entity(self.resolve_delegate()?))
        } else if call.is(methods::INITIALIZE, 0) {
            self.resolve_delegate()?;
            Value::Null
        } else {
            return Ok(Interception::NotHandled);
        };
        Ok(Interception::Handled(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::ProxyFactory;
    use crate::reflect::EntityClass;

    #[derive(Default)]
    struct Probe;

    #[test]
    fn test_handler_rejects_foreign_proxy() {
        let class = EntityClass::builder::<Probe>("Probe").build();
        let factory = ProxyFactory::builder(class).build().unwrap();
        let bound = factory.create_proxy(1, None).unwrap();
        let stranger = factory.create_proxy(1, None).unwrap();

        let handler = DynamicObjectHandler::new(
            factory.descriptor().clone(),
            bound.lazy_initializer().lazy_state().clone(),
            &bound,
        );
        let method = bound.proxy_class().find(methods::GET_PROXY_KEY, 0).unwrap().method().clone();

        let own = handler.intercept(&Call::new(&bound, &method, &[])).unwrap();
        assert_eq!(own, Interception::Handled(Value::Integer(1)));
        assert!(matches!(
            handler.intercept(&Call::new(&stranger, &method, &[])),
            Err(ProxyError::IdentityViolation(_))
        ));
    }

    #[test]
    fn test_unrelated_methods_are_not_handled() {
        let class = EntityClass::builder::<Probe>("Probe").build();
        let factory = ProxyFactory::builder(class).build().unwrap();
        let proxy = factory.create_proxy(2, None).unwrap();
        let handler = DynamicObjectHandler::new(
            factory.descriptor().clone(),
            proxy.lazy_initializer().lazy_state().clone(),
            &proxy,
        );
        let method = proxy.proxy_class().find(methods::TO_STRING, 0).unwrap().method().clone();
        assert_eq!(
            handler.intercept(&Call::new(&proxy, &method, &[])).unwrap(),
            Interception::NotHandled
        );
    }
}
