use crate::core::Result;
use crate::proxy::builder::ProxyClassEnhancer;
use crate::proxy::class::ProxyClass;
use crate::reflect::EntityClass;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const DEFAULT_CAPACITY: usize = 256;

lazy_static::lazy_static! {
    static ref PROXY_CLASS_CACHE: Arc<Mutex<LruCache<ClassKey, CachedClass>>> =
        Arc::new(Mutex::new(LruCache::new(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap())));
}

/// Generated class plus the enhancer that produced it.
///
/// Holding the enhancer keeps its address out of reuse while the entry lives.
struct CachedClass {
    class: Arc<ProxyClass>,
    _enhancer: Arc<dyn ProxyClassEnhancer>,
}

/// Shape of a generated class.
///
/// The persistent class and the enhancer are keyed by identity: two distinct
/// `EntityClass` values never share a proxy class, even under the same name,
/// and every enhancer sees the classes it is asked to enhance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassKey {
    class_addr: usize,
    class_name: String,
    enhancer_addr: usize,
    interfaces: Vec<String>,
    filter: String,
}

impl ClassKey {
    pub fn new(
        class: &Arc<EntityClass>,
        enhancer: &Arc<dyn ProxyClassEnhancer>,
        interfaces: &[String],
        filter: String,
    ) -> Self {
        Self {
            class_addr: Arc::as_ptr(class) as usize,
            class_name: class.name().to_string(),
            enhancer_addr: Arc::as_ptr(enhancer) as *const () as usize,
            interfaces: interfaces.to_vec(),
            filter,
        }
    }
}

pub fn lookup(key: &ClassKey) -> Result<Option<Arc<ProxyClass>>> {
    let mut cache = PROXY_CLASS_CACHE.lock()?;
    Ok(cache.get(key).map(|entry| entry.class.clone()))
}

/// Stores a generated class, growing the cache to `capacity` if needed.
pub fn store(
    key: ClassKey,
    class: Arc<ProxyClass>,
    enhancer: Arc<dyn ProxyClassEnhancer>,
    capacity: usize,
) -> Result<()> {
    let mut cache = PROXY_CLASS_CACHE.lock()?;
    if let Some(capacity) = NonZeroUsize::new(capacity) {
        if capacity > cache.cap() {
            cache.resize(capacity);
        }
    }
    cache.put(
        key,
        CachedClass {
            class,
            _enhancer: enhancer,
        },
    );
    Ok(())
}

pub fn len() -> Result<usize> {
    Ok(PROXY_CLASS_CACHE.lock()?.len())
}
