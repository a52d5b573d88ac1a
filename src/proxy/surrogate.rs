use crate::core::{Identifier, ProxyError, Result};
use crate::proxy::builder::{CompositeIdType, IdentifierAccessor, ProxyDescriptor, ProxyFactory};
use crate::proxy::handle::EntityProxy;
use crate::proxy::lazy::LazyInitializer;
use crate::reflect::CapabilityInterface;
use crate::session::SessionImplementor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Value written in place of a proxy when it is serialized.
///
/// Holds only plain data, so it can travel without the session or the
/// delegate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableProxy {
    entity_name: String,
    persistent_class: String,
    interfaces: Vec<String>,
    identifier: Identifier,
    reenter_uninitialized: bool,
    identifier_accessor: IdentifierAccessor,
    composite_id_type: Option<CompositeIdType>,
}

impl SerializableProxy {
    pub(crate) fn snapshot(
        descriptor: &ProxyDescriptor,
        lazy: &LazyInitializer,
        reenter_uninitialized: bool,
    ) -> Self {
        Self {
            entity_name: descriptor.entity_name().to_string(),
            persistent_class: descriptor.persistent_class().name().to_string(),
            interfaces: descriptor
                .interfaces()
                .iter()
                .map(CapabilityInterface::name)
                .map(str::to_string)
                .collect(),
            identifier: lazy.identifier().clone(),
            reenter_uninitialized,
            identifier_accessor: descriptor.identifier_accessor().clone(),
            composite_id_type: descriptor.composite_id_type().cloned(),
        }
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn persistent_class(&self) -> &str {
        &self.persistent_class
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn reenter_uninitialized(&self) -> bool {
        self.reenter_uninitialized
    }

    pub fn identifier_accessor(&self) -> &IdentifierAccessor {
        &self.identifier_accessor
    }

    pub fn composite_id_type(&self) -> Option<&CompositeIdType> {
        self.composite_id_type.as_ref()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// MessagePack encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| ProxyError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| ProxyError::Serialization(e.to_string()))
    }
}

/// Turns a surrogate back into a live proxy.
pub trait ProxyReconstructor: Send + Sync {
    fn reconstruct(
        &self,
        surrogate: &SerializableProxy,
        session: Option<Arc<dyn SessionImplementor>>,
    ) -> Result<EntityProxy>;
}

/// Proxy factories by entity name.
#[derive(Default)]
pub struct ProxyRegistry {
    factories: RwLock<HashMap<String, ProxyFactory>>,
}

impl ProxyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, factory: ProxyFactory) -> Result<()> {
        self.factories
            .write()?
            .insert(factory.entity_name().to_string(), factory);
        Ok(())
    }

    pub fn factory(&self, entity_name: &str) -> Result<Option<ProxyFactory>> {
        Ok(self.factories.read()?.get(entity_name).cloned())
    }
}

impl ProxyReconstructor for ProxyRegistry {
    fn reconstruct(
        &self,
        surrogate: &SerializableProxy,
        session: Option<Arc<dyn SessionImplementor>>,
    ) -> Result<EntityProxy> {
        let factory = self.factory(surrogate.entity_name())?.ok_or_else(|| {
            ProxyError::IllegalArgument(format!(
                "no proxy factory registered for entity {}",
                surrogate.entity_name()
            ))
        })?;
        let class_name = factory.descriptor().persistent_class().name();
        if class_name != surrogate.persistent_class() {
            return Err(ProxyError::ClassCast(format!(
                "surrogate for {} cannot be read as {}",
                surrogate.persistent_class(),
                class_name
            )));
        }

        let proxy = factory.create_proxy(surrogate.identifier().clone(), session)?;
        if !surrogate.reenter_uninitialized() {
            proxy.initialize()?;
        }
        Ok(proxy)
    }
}
