use crate::config::ProxyConfig;
use crate::core::{Identifier, ProxyError, Result};
use crate::proxy::cache::{self, ClassKey};
use crate::proxy::class::ProxyClass;
use crate::proxy::dynamic::DynamicObjectHandler;
use crate::proxy::filter::MethodFilter;
use crate::proxy::handle::EntityProxy;
use crate::proxy::interceptor::{CallInterceptor, InterceptorChain};
use crate::proxy::lazy::LazyInitializer;
use crate::proxy::router::DispatchRouter;
use crate::reflect::{CapabilityInterface, EntityClass, MethodDescriptor, bean_accessor};
use crate::session::SessionImplementor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Post-generation pass over a freshly generated proxy class.
pub trait ProxyClassEnhancer: Send + Sync {
    fn enhance(&self, class: &mut ProxyClass) -> anyhow::Result<()>;
}

/// Enhancer that leaves the class untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEnhancer;

impl ProxyClassEnhancer for NoopEnhancer {
    fn enhance(&self, _class: &mut ProxyClass) -> anyhow::Result<()> {
        Ok(())
    }
}

lazy_static::lazy_static! {
    /// Shared default so builders without an enhancer share cached classes.
    static ref NOOP_ENHANCER: Arc<dyn ProxyClassEnhancer> = Arc::new(NoopEnhancer);
}

/// Names of the identifier accessor and mutator methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierAccessor {
    getter: Option<String>,
    setter: Option<String>,
}

impl IdentifierAccessor {
    pub fn new(getter: &str, setter: Option<&str>) -> Self {
        Self {
            getter: Some(getter.to_string()),
            setter: setter.map(str::to_string),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn getter(&self) -> Option<&str> {
        self.getter.as_deref()
    }

    pub fn setter(&self) -> Option<&str> {
        self.setter.as_deref()
    }

    pub fn is_getter(&self, method: &MethodDescriptor) -> bool {
        method.arity() == 0 && self.getter() == Some(method.name())
    }

    pub fn is_setter(&self, method: &MethodDescriptor) -> bool {
        method.arity() == 1 && self.setter() == Some(method.name())
    }

    /// Bean property behind the getter: `getId` -> `id`.
    pub fn property_name(&self) -> Option<String> {
        let getter = self.getter()?;
        let rest = getter
            .strip_prefix("get")
            .or_else(|| getter.strip_prefix("is"))
            .filter(|rest| !rest.is_empty())?;
        let mut chars = rest.chars();
        chars
            .next()
            .map(|first| format!("{}{}", first.to_lowercase(), chars.as_str()))
    }
}

/// Embedded identifier type: component getters are answered from the
/// identifier itself, without loading the entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeIdType {
    type_name: String,
    properties: Vec<String>,
}

impl CompositeIdType {
    pub fn new<I, S>(type_name: &str, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_name: type_name.to_string(),
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// Component property read by `method`, if it is one of this type's getters.
    pub fn component_for(&self, method: &MethodDescriptor) -> Option<&str> {
        if method.arity() != 0 {
            return None;
        }
        self.properties
            .iter()
            .find(|p| bean_accessor("get", p) == method.name())
            .map(String::as_str)
    }
}

/// Everything shared by the proxies of one entity type.
pub struct ProxyDescriptor {
    entity_name: String,
    persistent_class: Arc<EntityClass>,
    interfaces: Vec<CapabilityInterface>,
    identifier_accessor: IdentifierAccessor,
    composite_id_type: Option<CompositeIdType>,
    overrides_equals: bool,
    proxy_class: Arc<ProxyClass>,
    interceptors: Vec<Arc<dyn CallInterceptor>>,
}

impl ProxyDescriptor {
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn persistent_class(&self) -> &Arc<EntityClass> {
        &self.persistent_class
    }

    /// Caller-supplied interfaces, without the built-in ones.
    pub fn interfaces(&self) -> &[CapabilityInterface] {
        &self.interfaces
    }

    pub fn identifier_accessor(&self) -> &IdentifierAccessor {
        &self.identifier_accessor
    }

    pub fn composite_id_type(&self) -> Option<&CompositeIdType> {
        self.composite_id_type.as_ref()
    }

    pub fn overrides_equals(&self) -> bool {
        self.overrides_equals
    }

    pub fn proxy_class(&self) -> &Arc<ProxyClass> {
        &self.proxy_class
    }
}

impl fmt::Debug for ProxyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyDescriptor")
            .field("entity_name", &self.entity_name)
            .field("persistent_class", &self.persistent_class.name())
            .field("proxy_class", &self.proxy_class.name())
            .field("overrides_equals", &self.overrides_equals)
            .field("interceptors", &self.interceptors.len())
            .finish()
    }
}

/// Creates lazy proxies for one entity type.
#[derive(Debug, Clone)]
pub struct ProxyFactory {
    descriptor: Arc<ProxyDescriptor>,
}

impl ProxyFactory {
    pub fn builder(persistent_class: Arc<EntityClass>) -> ProxyFactoryBuilder {
        ProxyFactoryBuilder::new(persistent_class)
    }

    pub fn descriptor(&self) -> &Arc<ProxyDescriptor> {
        &self.descriptor
    }

    pub fn entity_name(&self) -> &str {
        self.descriptor.entity_name()
    }

    pub fn proxy_class(&self) -> &Arc<ProxyClass> {
        self.descriptor.proxy_class()
    }

    /// Creates an uninitialized proxy for `identifier`.
    ///
    /// The persistent class's constructor hook runs while the proxy is still
    /// constructing; the dynamic object handler is bound afterwards and the
    /// router then switches to normal dispatch.
    pub fn create_proxy(
        &self,
        identifier: impl Into<Identifier>,
        session: Option<Arc<dyn SessionImplementor>>,
    ) -> Result<EntityProxy> {
        let descriptor = &self.descriptor;
        let lazy = Arc::new(LazyInitializer::new(
            descriptor.entity_name(),
            identifier.into(),
            session,
        ));
        let router = Arc::new(DispatchRouter::new(descriptor.clone(), lazy.clone()));
        let class = descriptor.proxy_class().clone();
        let shell = class.superclass().instantiate();
        let proxy = EntityProxy::new(class, shell, router.clone());

        if let Some(hook) = descriptor.persistent_class().constructor_hook() {
            hook(&proxy)?;
        }

        let mut chain = InterceptorChain::new();
        chain.register(Arc::new(DynamicObjectHandler::new(
            descriptor.clone(),
            lazy.clone(),
            &proxy,
        )));
        for interceptor in &descriptor.interceptors {
            chain.register(interceptor.clone());
        }
        router.install_interceptors(chain);
        router.mark_constructed();

        debug!(
            entity = descriptor.entity_name(),
            id = %lazy.identifier(),
            class = descriptor.proxy_class().name(),
            "Proxy created"
        );
        Ok(proxy)
    }
}

/// Builder for [`ProxyFactory`].
pub struct ProxyFactoryBuilder {
    persistent_class: Arc<EntityClass>,
    entity_name: Option<String>,
    interfaces: Vec<CapabilityInterface>,
    identifier_accessor: IdentifierAccessor,
    composite_id_type: Option<CompositeIdType>,
    overrides_equals: Option<bool>,
    enhancer: Arc<dyn ProxyClassEnhancer>,
    interceptors: Vec<Arc<dyn CallInterceptor>>,
    config: ProxyConfig,
}

impl ProxyFactoryBuilder {
    fn new(persistent_class: Arc<EntityClass>) -> Self {
        Self {
            persistent_class,
            entity_name: None,
            interfaces: vec![CapabilityInterface::lazy_proxy()],
            identifier_accessor: IdentifierAccessor::none(),
            composite_id_type: None,
            overrides_equals: None,
            enhancer: NOOP_ENHANCER.clone(),
            interceptors: Vec::new(),
            config: ProxyConfig::from_env(),
        }
    }

    /// Defaults to the persistent class name.
    pub fn entity_name(mut self, name: &str) -> Self {
        self.entity_name = Some(name.to_string());
        self
    }

    /// Adds a capability interface.
    pub fn interface(mut self, interface: CapabilityInterface) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn identifier_accessor(mut self, accessor: IdentifierAccessor) -> Self {
        self.identifier_accessor = accessor;
        self
    }

    pub fn composite_id_type(mut self, id_type: CompositeIdType) -> Self {
        self.composite_id_type = Some(id_type);
        self
    }

    /// Defaults to whether the persistent class declares `equals/1`.
    pub fn overrides_equals(mut self, overrides: bool) -> Self {
        self.overrides_equals = Some(overrides);
        self
    }

    /// Classes are cached per enhancer instance: pass the same `Arc` to share them.
    pub fn enhancer(mut self, enhancer: Arc<dyn ProxyClassEnhancer>) -> Self {
        self.enhancer = enhancer;
        self
    }

    /// Appends an interceptor after the dynamic object handler.
    pub fn interceptor(mut self, interceptor: Arc<dyn CallInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Defaults to [`ProxyConfig::from_env`].
    pub fn config(mut self, config: ProxyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ProxyFactory> {
        let class_name = self.persistent_class.name().to_string();
        let proxy_class = self.proxy_class().map_err(|source| {
            error!(class = %class_name, error = %source, "Proxy enhancement failed");
            ProxyError::Build {
                class_name: class_name.clone(),
                source,
            }
        })?;

        let overrides_equals = self
            .overrides_equals
            .unwrap_or_else(|| self.persistent_class.overrides_equals());
        let descriptor = ProxyDescriptor {
            entity_name: self.entity_name.unwrap_or(class_name),
            persistent_class: self.persistent_class,
            interfaces: dedup_interfaces(self.interfaces),
            identifier_accessor: self.identifier_accessor,
            composite_id_type: self.composite_id_type,
            overrides_equals,
            proxy_class,
            interceptors: self.interceptors,
        };
        Ok(ProxyFactory {
            descriptor: Arc::new(descriptor),
        })
    }

    /// Generated class for this shape, from the cache when possible.
    fn proxy_class(&self) -> anyhow::Result<Arc<ProxyClass>> {
        self.config.validate().map_err(anyhow::Error::msg)?;
        let filter = MethodFilter::from_config(&self.config)?;

        let mut all_interfaces = self.interfaces.clone();
        all_interfaces.push(CapabilityInterface::dynamic_object());
        all_interfaces.push(CapabilityInterface::entity_proxy());
        let all_interfaces = dedup_interfaces(all_interfaces);
        let names: Vec<String> = all_interfaces.iter().map(|i| i.name().to_string()).collect();
        let key = ClassKey::new(
            &self.persistent_class,
            &self.enhancer,
            &names,
            filter.fingerprint(),
        );

        if self.config.use_cache {
            if let Some(class) = cache::lookup(&key)? {
                debug!(class = class.name(), "Proxy class cache hit");
                return Ok(class);
            }
        }

        let mut class =
            ProxyClass::generate(self.persistent_class.clone(), all_interfaces, &filter)?;
        self.enhancer.enhance(&mut class)?;
        if let Some(dir) = &self.config.write_directory {
            write_class_file(dir, &class)?;
        }
        info!(
            class = class.name(),
            superclass = self.persistent_class.name(),
            interfaces = ?names,
            "Generated proxy class"
        );

        let class = Arc::new(class);
        if self.config.use_cache {
            cache::store(
                key,
                class.clone(),
                self.enhancer.clone(),
                self.config.class_cache_capacity,
            )?;
        }
        Ok(class)
    }
}

/// One entry per interface name, ordered by name.
fn dedup_interfaces(mut interfaces: Vec<CapabilityInterface>) -> Vec<CapabilityInterface> {
    interfaces.sort_by(|a, b| a.name().cmp(b.name()));
    interfaces.dedup_by(|a, b| a.name() == b.name());
    interfaces
}

fn write_class_file(dir: &Path, class: &ProxyClass) -> anyhow::Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", class.name()));
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, serde_json::to_vec_pretty(&class.describe())?)?;
    fs::rename(&temp_path, &path)?;
    debug!(path = %path.display(), "Wrote proxy class");
    Ok(())
}
