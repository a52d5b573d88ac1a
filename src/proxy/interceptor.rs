use crate::core::{Result, Value};
use crate::proxy::handle::EntityProxy;
use crate::reflect::MethodDescriptor;
use std::sync::Arc;

/// A single routed call on a proxy.
pub struct Call<'a> {
    pub proxy: &'a EntityProxy,
    pub method: &'a MethodDescriptor,
    pub args: &'a [Value],
}

impl<'a> Call<'a> {
    pub fn new(proxy: &'a EntityProxy, method: &'a MethodDescriptor, args: &'a [Value]) -> Self {
        Self {
            proxy,
            method,
            args,
        }
    }

    pub fn is(&self, name: &str, arity: usize) -> bool {
        self.method.matches(name, arity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Interception {
    Handled(Value),
    NotHandled,
}

/// Handler consulted before the router's own classification.
pub trait CallInterceptor: Send + Sync {
    fn name(&self) -> &str;

    fn intercept(&self, call: &Call<'_>) -> Result<Interception>;
}

/// Ordered interceptors; the first one that handles a call wins.
#[derive(Default, Clone)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn CallInterceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, interceptor: Arc<dyn CallInterceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn with(mut self, interceptor: Arc<dyn CallInterceptor>) -> Self {
        self.register(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    pub fn intercept(&self, call: &Call<'_>) -> Result<Interception> {
        for interceptor in &self.interceptors {
            if let Interception::Handled(value) = interceptor.intercept(call)? {
                return Ok(Interception::Handled(value));
            }
        }
        Ok(Interception::NotHandled)
    }
}
