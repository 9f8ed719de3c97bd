pub mod config;
pub mod device_type;
pub mod types;

pub use config::HeartbeatConfig;
pub use device_type::DeviceType;
pub use types::{DedupPolicy, OpaqueId, PausePolicy};
