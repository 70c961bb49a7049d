//! Power control failures, tagged with the hop of the control path that failed

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use super::capability::CapabilityError;
use super::state::PowerState;
use crate::repository::RepositoryError;

/// Step of the power control chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerHop {
    Interface,
    Port,
    Capability,
    Device,
    History,
}

impl fmt::Display for PowerHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interface => write!(f, "interface"),
            Self::Port => write!(f, "port"),
            Self::Capability => write!(f, "capability"),
            Self::Device => write!(f, "device"),
            Self::History => write!(f, "history"),
        }
    }
}

/// Power control failure, naming the hop that failed
#[derive(Debug, Error)]
pub enum PowerError {
    #[error("device {device_id} has no network interface")]
    NoInterface { device_id: Uuid },

    #[error("network interface lookup for device {device_id} failed")]
    Interface {
        device_id: Uuid,
        #[source]
        source: RepositoryError,
    },

    #[error("interface {interface_id} of device {device_id} is not connected to a switch port")]
    NotConnected { device_id: Uuid, interface_id: Uuid },

    #[error("switch port {port_id} on switch {switch_id} could not be resolved")]
    Port {
        switch_id: Uuid,
        port_id: Uuid,
        #[source]
        source: RepositoryError,
    },

    #[error("no management capability for switch {switch_id}")]
    Capability {
        switch_id: Uuid,
        #[source]
        source: CapabilityError,
    },

    #[error("switch {switch_id} failed the power command on port '{port}'")]
    Device {
        switch_id: Uuid,
        port: String,
        #[source]
        source: CapabilityError,
    },

    #[error("device {device_id} switched {state} but the history entry was not written")]
    History {
        device_id: Uuid,
        state: PowerState,
        #[source]
        source: RepositoryError,
    },
}

impl PowerError {
    pub fn hop(&self) -> PowerHop {
        match self {
            Self::NoInterface { .. } | Self::Interface { .. } | Self::NotConnected { .. } => {
                PowerHop::Interface
            }
            Self::Port { .. } => PowerHop::Port,
            Self::Capability { .. } => PowerHop::Capability,
            Self::Device { .. } => PowerHop::Device,
            Self::History { .. } => PowerHop::History,
        }
    }

    /// A referenced interface, port or switch does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NoInterface { .. } => true,
            Self::Port { source, .. } | Self::Interface { source, .. } => source.is_not_found(),
            Self::Capability { source, .. } => matches!(source, CapabilityError::Unsupported(_)),
            _ => false,
        }
    }
}
