pub mod error;
pub mod identifier;
pub mod value;

pub use error::{ProxyError, Result, SessionUnavailable};
pub use identifier::Identifier;
pub use value::{FromValue, ObjectRef, Value};
