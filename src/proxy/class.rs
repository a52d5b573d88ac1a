use crate::core::{ProxyError, Result};
use crate::proxy::filter::MethodFilter;
use crate::reflect::{CapabilityInterface, EntityClass, MethodDescriptor};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static PROXY_CLASS_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One entry of a generated class's dispatch table.
#[derive(Debug, Clone)]
pub struct ProxyMethod {
    method: Arc<MethodDescriptor>,
    intercepted: bool,
    accessible: bool,
}

impl ProxyMethod {
    pub fn method(&self) -> &Arc<MethodDescriptor> {
        &self.method
    }

    pub fn name(&self) -> &str {
        self.method.name()
    }

    pub fn arity(&self) -> usize {
        self.method.arity()
    }

    /// `false` when the filter excluded the method: calls run on the superclass directly.
    pub fn is_intercepted(&self) -> bool {
        self.intercepted
    }

    /// Forwarding entry retained for a non-public method.
    pub fn is_accessible(&self) -> bool {
        self.accessible
    }
}

#[derive(Serialize)]
struct MethodSummary<'a> {
    name: &'a str,
    arity: usize,
    visibility: crate::reflect::Visibility,
    owner: &'a crate::reflect::MethodOwner,
    intercepted: bool,
    accessible: bool,
}

#[derive(Serialize)]
struct ClassSummary<'a> {
    name: &'a str,
    superclass: &'a str,
    interfaces: Vec<&'a str>,
    markers: &'a BTreeMap<String, String>,
    methods: Vec<MethodSummary<'a>>,
}

/// A generated proxy class: the persistent class plus the capability
/// interfaces, with every method routed or passed through.
#[derive(Debug)]
pub struct ProxyClass {
    name: String,
    superclass: Arc<EntityClass>,
    interfaces: Vec<CapabilityInterface>,
    methods: Vec<ProxyMethod>,
    markers: BTreeMap<String, String>,
}

impl ProxyClass {
    /// Lays out the dispatch table for `superclass` + `interfaces`.
    ///
    /// Entity methods shadow interface methods of the same name and arity.
    pub(crate) fn generate(
        superclass: Arc<EntityClass>,
        interfaces: Vec<CapabilityInterface>,
        filter: &MethodFilter,
    ) -> Result<Self> {
        if superclass.is_final() {
            return Err(ProxyError::IllegalArgument(format!(
                "cannot subclass final class {}",
                superclass.name()
            )));
        }

        let mut methods: Vec<ProxyMethod> = superclass
            .methods()
            .iter()
            .map(|method| ProxyMethod {
                intercepted: filter.is_handled(method),
                accessible: !method.is_public(),
                method: method.clone(),
            })
            .collect();

        for iface in &interfaces {
            for method in iface.to_methods() {
                if methods
                    .iter()
                    .any(|m| m.method.matches(method.name(), method.arity()))
                {
                    continue;
                }
                methods.push(ProxyMethod {
                    intercepted: true,
                    accessible: false,
                    method: Arc::new(method),
                });
            }
        }

        let serial = PROXY_CLASS_COUNTER.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            name: format!("{}_$$_proxy{}", superclass.name(), serial),
            superclass,
            interfaces,
            methods,
            markers: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn superclass(&self) -> &Arc<EntityClass> {
        &self.superclass
    }

    pub fn interfaces(&self) -> &[CapabilityInterface] {
        &self.interfaces
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i.name() == interface)
    }

    pub fn methods(&self) -> &[ProxyMethod] {
        &self.methods
    }

    pub fn find(&self, name: &str, arity: usize) -> Option<&ProxyMethod> {
        self.methods.iter().find(|m| m.method.matches(name, arity))
    }

    /// Extra metadata attached by a class enhancer.
    pub fn add_marker(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.markers.insert(key.into(), value.into());
    }

    pub fn marker(&self, key: &str) -> Option<&str> {
        self.markers.get(key).map(String::as_str)
    }

    /// JSON description written to the class dump directory.
    pub fn describe(&self) -> serde_json::Value {
        let summary = ClassSummary {
            name: &self.name,
            superclass: self.superclass.name(),
            interfaces: self.interfaces.iter().map(CapabilityInterface::name).collect(),
            markers: &self.markers,
            methods: self
                .methods
                .iter()
                .map(|m| MethodSummary {
                    name: m.method.name(),
                    arity: m.method.arity(),
                    visibility: m.method.visibility(),
                    owner: m.method.owner(),
                    intercepted: m.intercepted,
                    accessible: m.accessible,
                })
                .collect(),
        };
        serde_json::to_value(summary).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::reflect::{Visibility, methods};

    #[derive(Default)]
    struct Ledger;

    fn ledger_class() -> Arc<EntityClass> {
        EntityClass::builder::<Ledger>("Ledger")
            .getter("getBalance", |_| Value::Integer(0))
            .method_as("recompute", 0, Visibility::Protected, |_, _| Ok(Value::Null))
            .method("super$1$getBalance", 0, |_, _| Ok(Value::Integer(-1)))
            .method(methods::GET_TARGET, 0, |_, _| Ok(Value::from("own target")))
            .build()
    }

    #[test]
    fn test_generate_lays_out_dispatch_table() {
        let class = ProxyClass::generate(
            ledger_class(),
            vec![CapabilityInterface::entity_proxy()],
            &MethodFilter::new(),
        )
        .unwrap();

        assert!(class.name().starts_with("Ledger_$$_proxy"));
        assert!(class.implements(crate::reflect::ENTITY_PROXY));
        assert!(class.find("getBalance", 0).unwrap().is_intercepted());
        assert!(!class.find("super$1$getBalance", 0).unwrap().is_intercepted());
        assert!(class.find("recompute", 0).unwrap().is_accessible());
        assert!(!class.find("getBalance", 0).unwrap().is_accessible());
        assert!(class.find(methods::IS_INITIALIZED, 0).unwrap().method().is_abstract());
        // entity method shadows the interface method
        assert!(!class.find(methods::GET_TARGET, 0).unwrap().method().is_abstract());
    }

    #[test]
    fn test_final_class_cannot_be_proxied() {
        let class = EntityClass::builder::<Ledger>("Sealed").final_class().build();
        let err = ProxyClass::generate(class, Vec::new(), &MethodFilter::new()).unwrap_err();
        assert!(matches!(err, ProxyError::IllegalArgument(_)));
    }

    #[test]
    fn test_describe_lists_markers_and_methods() {
        let mut class =
            ProxyClass::generate(ledger_class(), Vec::new(), &MethodFilter::new()).unwrap();
        class.add_marker("enhanced", "yes");
        let json = class.describe();
        assert_eq!(json["superclass"], "Ledger");
        assert_eq!(json["markers"]["enhanced"], "yes");
        assert!(json["methods"].as_array().unwrap().len() >= 4);
        assert_eq!(class.marker("enhanced"), Some("yes"));
    }
}
