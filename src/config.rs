use regex::Regex;
use std::path::PathBuf;

/// Environment variable naming a directory generated proxy classes are dumped to.
pub const WRITE_DIRECTORY_ENV: &str = "ENTITY_PROXY_WRITE_DIRECTORY";

/// Proxy generation configuration
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Capacity of the process-wide generated-class cache
    pub class_cache_capacity: usize,

    /// Reuse generated classes for identical (class, interfaces) shapes
    pub use_cache: bool,

    /// Where freshly generated classes are written, for debugging
    pub write_directory: Option<PathBuf>,

    /// Method names that are never intercepted
    pub excluded_methods: Vec<String>,

    /// Regex patterns; matching method names are never intercepted
    pub excluded_patterns: Vec<String>,
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self {
            class_cache_capacity: 256,
            use_cache: true,
            write_directory: None,
            excluded_methods: Vec::new(),
            excluded_patterns: Vec::new(),
        }
    }

    /// Defaults, with the write directory taken from `ENTITY_PROXY_WRITE_DIRECTORY`.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.write_directory = std::env::var_os(WRITE_DIRECTORY_ENV)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        config
    }

    /// Set the class cache capacity
    pub fn class_cache_capacity(mut self, capacity: usize) -> Self {
        self.class_cache_capacity = capacity;
        self
    }

    /// Enable or disable the class cache
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Set the class dump directory
    pub fn write_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.write_directory = Some(dir.into());
        self
    }

    /// Exclude a method name from interception
    pub fn exclude_method(mut self, name: &str) -> Self {
        self.excluded_methods.push(name.to_string());
        self
    }

    /// Exclude every method name matching `pattern`
    pub fn exclude_pattern(mut self, pattern: &str) -> Self {
        self.excluded_patterns.push(pattern.to_string());
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.class_cache_capacity == 0 {
            return Err("class_cache_capacity must be > 0".to_string());
        }

        for pattern in &self.excluded_patterns {
            Regex::new(pattern)
                .map_err(|e| format!("Invalid excluded pattern '{}': {}", pattern, e))?;
        }

        Ok(())
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::new()
    }
}
