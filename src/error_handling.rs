pub mod types;

pub use types::{ConfigError, DispatchError, SessionError};
