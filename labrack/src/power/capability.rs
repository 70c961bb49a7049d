//! Switch management capabilities
//!
//! The vendor protocols that actually talk to a switch live outside this
//! crate. They plug in through [`CapabilityProvider`], which hands out a
//! [`PoeCapability`] for the switch owning a port.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::lab::PoeType;

/// Failure reported by a switch or its provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// No management driver is registered for the switch
    #[error("no management capability registered for switch {0}")]
    Unsupported(Uuid),

    /// The switch rejected or failed the command
    #[error("switch command failed: {0}")]
    Command(String),
}

/// PoE control of one switch
#[async_trait]
pub trait PoeCapability: Send + Sync {
    /// Raw power status of `port`; `"enable"` means the port supplies power
    async fn port_power_status(&self, port: &str) -> Result<String, CapabilityError>;

    async fn enable_port_power(&self, port: &str, class: PoeType) -> Result<(), CapabilityError>;

    async fn disable_port_power(&self, port: &str) -> Result<(), CapabilityError>;
}

/// Looks up the management capability of a switch
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    async fn poe_capability(&self, switch_id: Uuid) -> Result<Arc<dyn PoeCapability>, CapabilityError>;
}

/// Provider backed by a fixed table of per-switch capabilities
#[derive(Default, Clone)]
pub struct StaticCapabilityProvider {
    switches: Arc<RwLock<HashMap<Uuid, Arc<dyn PoeCapability>>>>,
}

impl StaticCapabilityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, switch_id: Uuid, capability: Arc<dyn PoeCapability>) {
        self.switches.write().await.insert(switch_id, capability);
    }

    pub async fn unregister(&self, switch_id: Uuid) {
        self.switches.write().await.remove(&switch_id);
    }
}

#[async_trait]
impl CapabilityProvider for StaticCapabilityProvider {
    async fn poe_capability(&self, switch_id: Uuid) -> Result<Arc<dyn PoeCapability>, CapabilityError> {
        self.switches
            .read()
            .await
            .get(&switch_id)
            .cloned()
            .ok_or(CapabilityError::Unsupported(switch_id))
    }
}

impl std::fmt::Debug for StaticCapabilityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCapabilityProvider").finish_non_exhaustive()
    }
}

/// In-memory switch that keeps port power in a table
///
/// Ports start disabled. Useful for development servers and tests.
#[derive(Debug, Default)]
pub struct SimulatedPoe {
    ports: RwLock<HashMap<String, PoeType>>,
}

impl SimulatedPoe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Class the port is powered with, if enabled
    pub async fn powered_class(&self, port: &str) -> Option<PoeType> {
        self.ports.read().await.get(port).copied()
    }
}

#[async_trait]
impl PoeCapability for SimulatedPoe {
    async fn port_power_status(&self, port: &str) -> Result<String, CapabilityError> {
        let status = if self.ports.read().await.contains_key(port) {
            "enable"
        } else {
            "disable"
        };
        Ok(status.to_string())
    }

    async fn enable_port_power(&self, port: &str, class: PoeType) -> Result<(), CapabilityError> {
        debug!(port, %class, "simulated port power on");
        self.ports.write().await.insert(port.to_string(), class);
        Ok(())
    }

    async fn disable_port_power(&self, port: &str) -> Result<(), CapabilityError> {
        debug!(port, "simulated port power off");
        self.ports.write().await.remove(port);
        Ok(())
    }
}

/// Provider that hands every switch a [`SimulatedPoe`], created on first use
#[derive(Debug, Default, Clone)]
pub struct SimulatedProvider {
    switches: Arc<RwLock<HashMap<Uuid, Arc<SimulatedPoe>>>>,
}

impl SimulatedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// The simulated switch behind `switch_id`
    pub async fn switch(&self, switch_id: Uuid) -> Arc<SimulatedPoe> {
        let mut switches = self.switches.write().await;
        Arc::clone(switches.entry(switch_id).or_default())
    }
}

#[async_trait]
impl CapabilityProvider for SimulatedProvider {
    async fn poe_capability(&self, switch_id: Uuid) -> Result<Arc<dyn PoeCapability>, CapabilityError> {
        let capability: Arc<dyn PoeCapability> = self.switch(switch_id).await;
        Ok(capability)
    }
}
