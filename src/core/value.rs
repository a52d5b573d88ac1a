use crate::core::{Identifier, ProxyError, Result};
use crate::proxy::{DispatchRouter, EntityProxy};
use crate::reflect::{EntityRef, same_instance};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Dynamic value flowing through every interception point.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Json(serde_json::Value),
    List(Vec<Value>),
    Object(ObjectRef),
}

/// Reference-typed values. Equality is identity.
#[derive(Clone)]
pub enum ObjectRef {
    /// A real (materialised) entity instance.
    Entity(EntityRef),
    /// A lazy proxy standing in for an entity.
    Proxy(EntityProxy),
    /// Lazy-state accessor handed out by `getLazyInitializer`.
    Initializer(Arc<DispatchRouter>),
}

impl ObjectRef {
    pub fn same_as(&self, other: &ObjectRef) -> bool {
        match (self, other) {
            (Self::Entity(a), Self::Entity(b)) => same_instance(a, b),
            (Self::Proxy(a), Self::Proxy(b)) => a == b,
            (Self::Initializer(a), Self::Initializer(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn address(&self) -> usize {
        match self {
            Self::Entity(e) => Arc::as_ptr(e) as *const () as usize,
            Self::Proxy(p) => p.identity_hash() as usize,
            Self::Initializer(r) => Arc::as_ptr(r) as usize,
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(_) => write!(f, "Entity@{:#x}", self.address()),
            Self::Proxy(p) => write!(f, "Proxy({}#{})", p.entity_name(), p.identifier()),
            Self::Initializer(_) => write!(f, "LazyInitializer@{:#x}", self.address()),
        }
    }
}

impl Value {
    /// Wraps a real entity instance, keeping its identity.
    pub fn entity<E: Any + Send + Sync>(entity: &Arc<E>) -> Self {
        let erased: EntityRef = entity.clone();
        Self::Object(ObjectRef::Entity(erased))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Float(_) => "FLOAT",
            Self::Text(_) => "TEXT",
            Self::Boolean(_) => "BOOLEAN",
            Self::Json(_) => "JSON",
            Self::List(_) => "LIST",
            Self::Object(_) => "OBJECT",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&EntityProxy> {
        match self {
            Self::Object(ObjectRef::Proxy(p)) => Some(p),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityRef> {
        match self {
            Self::Object(ObjectRef::Entity(e)) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` when this value is exactly the given entity instance.
    pub fn is_instance(&self, target: &EntityRef) -> bool {
        self.as_entity().is_some_and(|e| same_instance(e, target))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                (a - b).abs() < f64::EPSILON
            }
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.same_as(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(fl) => write!(f, "{}", fl),
            Self::Text(s) => write!(f, "{}", s),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Json(j) => write!(f, "{}", j),
            Self::List(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Object(obj) => write!(f, "{:?}", obj),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Self::Json(j)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<&Identifier> for Value {
    fn from(id: &Identifier) -> Self {
        id.to_value()
    }
}

impl From<EntityProxy> for Value {
    fn from(proxy: EntityProxy) -> Self {
        Self::Object(ObjectRef::Proxy(proxy))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

/// Conversion out of a dynamic [`Value`], used by generated proxy wrappers.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch(expected: &str, value: &Value) -> ProxyError {
    ProxyError::TypeMismatch(format!("expected {}, got {}", expected, value.type_name()))
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for () {
    fn from_value(_value: Value) -> Result<Self> {
        Ok(())
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        value.as_i64().ok_or_else(|| mismatch("INTEGER", &value))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            other => Err(mismatch("FLOAT", &other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch("BOOLEAN", &value))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("TEXT", &other)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Json(j) => Ok(j),
            other => Err(mismatch("JSON", &other)),
        }
    }
}

impl FromValue for EntityProxy {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(ObjectRef::Proxy(p)) => Ok(p),
            other => Err(mismatch("proxy", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("LIST", &other)),
        }
    }
}
