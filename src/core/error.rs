use thiserror::Error;

/// Why a proxy could not reach its owning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionUnavailable {
    /// The proxy was never attached, or it was detached.
    NoSession,
    /// The owning session was closed.
    Closed,
    /// The owning session is disconnected.
    Disconnected,
}

impl std::fmt::Display for SessionUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoSession => write!(f, "no Session"),
            Self::Closed => write!(f, "the owning Session was closed"),
            Self::Disconnected => write!(f, "the owning Session is disconnected"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Proxy enhancement failed: {class_name}")]
    Build {
        class_name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Could not initialize proxy [{entity_name}#{identifier}] - {reason}")]
    NoSession {
        entity_name: String,
        identifier: String,
        reason: SessionUnavailable,
    },

    #[error("Identity violation: {0}")]
    IdentityViolation(String),

    #[error("No entity found for [{entity_name}#{identifier}]")]
    EntityNotFound {
        entity_name: String,
        identifier: String,
    },

    #[error("Proxy [{entity_name}#{identifier}] re-entered initialization while loading")]
    ReentrantInitialization {
        entity_name: String,
        identifier: String,
    },

    #[error("Proxy [{entity_name}#{identifier}] is still being constructed")]
    Constructing {
        entity_name: String,
        identifier: String,
    },

    #[error("No such method: {class_name}.{method}/{arity}")]
    NoSuchMethod {
        class_name: String,
        method: String,
        arity: usize,
    },

    #[error("Class cast failed: {0}")]
    ClassCast(String),

    #[error("Illegal access to non-public method '{0}'")]
    IllegalAccess(String),

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Method '{0}' has no implementation")]
    AbstractMethod(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Failure raised by the real entity method, surfaced as-is.
    #[error(transparent)]
    Target(anyhow::Error),

    /// Failure raised by the session while loading.
    #[error(transparent)]
    Session(anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, ProxyError>;

impl<T> From<std::sync::PoisonError<T>> for ProxyError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
