use crate::config::ProxyConfig;
use crate::reflect::{MethodDescriptor, methods::FINALIZE};
use regex::Regex;
use std::collections::BTreeSet;

lazy_static::lazy_static! {
    /// Compiler-generated accessors that forward to a superclass implementation.
    static ref SUPER_FORWARDING: Regex = Regex::new(r"super\$").unwrap();
}

/// Runtime-internal methods that must reach the superclass untouched.
pub const RUNTIME_INTERNAL_METHODS: &[&str] = &["$getStaticMetaClass"];

/// Decides which methods of a generated proxy class go through the handler.
#[derive(Debug, Clone)]
pub struct MethodFilter {
    excluded: BTreeSet<String>,
    patterns: Vec<Regex>,
}

impl MethodFilter {
    pub fn new() -> Self {
        Self {
            excluded: BTreeSet::new(),
            patterns: Vec::new(),
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, regex::Error> {
        let patterns = config
            .excluded_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            excluded: config.excluded_methods.iter().cloned().collect(),
            patterns,
        })
    }

    pub fn is_handled(&self, method: &MethodDescriptor) -> bool {
        let name = method.name();
        !SUPER_FORWARDING.is_match(name)
            && !RUNTIME_INTERNAL_METHODS.contains(&name)
            && !(method.arity() == 0 && name == FINALIZE)
            && !self.excluded.contains(name)
            && !self.patterns.iter().any(|p| p.is_match(name))
    }

    /// Stable description, part of the generated-class cache key.
    pub fn fingerprint(&self) -> String {
        let mut parts: Vec<&str> = self.excluded.iter().map(String::as_str).collect();
        parts.extend(self.patterns.iter().map(Regex::as_str));
        parts.join("|")
    }
}

impl Default for MethodFilter {
    fn default() -> Self {
        Self::new()
    }
}
