pub mod beacon;
pub use beacon::*;

pub mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

pub mod configuration;
pub use configuration::*;

pub mod error_handling;

pub mod host;
pub use host::{PlayerHost, SimulatedPlayer};

pub mod session_management;
pub use session_management::*;

#[cfg(test)]
mod test_support;
