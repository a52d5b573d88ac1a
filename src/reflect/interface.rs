use crate::reflect::{MethodDescriptor, MethodOwner};

/// Well-known method names the proxy machinery reacts to.
pub mod methods {
    pub const GET_LAZY_INITIALIZER: &str = "getLazyInitializer";
    pub const WRITE_REPLACE: &str = "writeReplace";

    pub const GET_PROPERTY: &str = "getProperty";
    pub const SET_PROPERTY: &str = "setProperty";
    pub const INVOKE_METHOD: &str = "invokeMethod";
    pub const GET_META_CLASS: &str = "getMetaClass";

    pub const GET_TARGET: &str = "getTarget";
    pub const INITIALIZE: &str = "initialize";
    pub const IS_INITIALIZED: &str = "isInitialized";
    pub const GET_PROXY_KEY: &str = "getProxyKey";

    pub const EQUALS: &str = "equals";
    pub const HASH_CODE: &str = "hashCode";
    pub const TO_STRING: &str = "toString";
    pub const FINALIZE: &str = "finalize";

    /// Pseudo-property answered by the dynamic object protocol.
    pub const META_CLASS_PROPERTY: &str = "metaClass";
}

pub const LAZY_PROXY: &str = "LazyProxy";
pub const DYNAMIC_OBJECT: &str = "DynamicObject";
pub const ENTITY_PROXY: &str = "EntityProxy";

/// An abstract set of methods a generated proxy class implements on top of
/// its persistent class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapabilityInterface {
    name: String,
    methods: Vec<(String, usize)>,
}

impl CapabilityInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, name: impl Into<String>, arity: usize) -> Self {
        self.methods.push((name.into(), arity));
        self
    }

    /// Lazy-state access and serialization replacement.
    pub fn lazy_proxy() -> Self {
        Self::new(LAZY_PROXY)
            .method(methods::GET_LAZY_INITIALIZER, 0)
            .method(methods::WRITE_REPLACE, 0)
    }

    /// Name-based property access and method invocation.
    pub fn dynamic_object() -> Self {
        Self::new(DYNAMIC_OBJECT)
            .method(methods::GET_PROPERTY, 1)
            .method(methods::SET_PROPERTY, 2)
            .method(methods::INVOKE_METHOD, 2)
            .method(methods::GET_META_CLASS, 0)
    }

    /// Marker interface exposing proxy state.
    pub fn entity_proxy() -> Self {
        Self::new(ENTITY_PROXY)
            .method(methods::GET_TARGET, 0)
            .method(methods::INITIALIZE, 0)
            .method(methods::IS_INITIALIZED, 0)
            .method(methods::GET_PROXY_KEY, 0)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signatures(&self) -> impl Iterator<Item = (&str, usize)> {
        self.methods.iter().map(|(name, arity)| (name.as_str(), *arity))
    }

    pub fn to_methods(&self) -> Vec<MethodDescriptor> {
        self.signatures()
            .map(|(name, arity)| {
                MethodDescriptor::abstract_method(
                    name,
                    arity,
                    MethodOwner::Interface(self.name.clone()),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_interfaces_are_abstract() {
        let iface = CapabilityInterface::dynamic_object();
        let declared = iface.to_methods();
        assert_eq!(declared.len(), 4);
        assert!(declared.iter().all(MethodDescriptor::is_abstract));
        assert!(declared.iter().any(|m| m.matches(methods::SET_PROPERTY, 2)));
        assert_eq!(
            declared[0].owner(),
            &MethodOwner::Interface(DYNAMIC_OBJECT.to_string())
        );
    }
}
