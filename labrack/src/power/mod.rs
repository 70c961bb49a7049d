//! Device power control
//!
//! A device is powered through the PoE switch port its first network
//! interface is cabled to. [`PowerDriver`] walks that chain and records every
//! successful transition in the device power history.
//!
//! # Example
//!
//! ```rust,ignore
//! use labrack::power::{PowerDriver, SimulatedProvider};
//!
//! let driver = PowerDriver::new(interfaces, ports, history, Arc::new(SimulatedProvider::new()));
//! let entry = driver.power_on(device_id).await?;
//! assert_eq!(entry.state, PowerState::On);
//! ```

mod capability;
mod driver;
mod error;
mod routes;
mod state;

pub use capability::{
    CapabilityError, CapabilityProvider, PoeCapability, SimulatedPoe, SimulatedProvider,
    StaticCapabilityProvider,
};
pub use driver::{PowerDriver, PowerPath, DEFAULT_POE_CLASS};
pub use error::{PowerError, PowerHop};
pub use routes::{power_router, DevicePath, DevicePowerResponse};
pub use state::PowerState;
