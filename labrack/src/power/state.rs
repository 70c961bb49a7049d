//! Device power states

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::repository::FilterValue;

/// Power state of a device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
    /// The control path could not be resolved or queried
    #[default]
    Unknown,
}

impl PowerState {
    /// Interpret a port power status reported by a switch
    ///
    /// ```rust
    /// use labrack::power::PowerState;
    ///
    /// assert_eq!(PowerState::from_port_status("enable"), PowerState::On);
    /// assert_eq!(PowerState::from_port_status("disable"), PowerState::Off);
    /// assert_eq!(PowerState::from_port_status("searching"), PowerState::Off);
    /// ```
    pub fn from_port_status(status: &str) -> Self {
        if status == "enable" {
            Self::On
        } else {
            Self::Off
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<PowerState> for FilterValue {
    fn from(state: PowerState) -> Self {
        FilterValue::String(state.as_str().to_string())
    }
}
