//! Device power control through the switch port a device is cabled to
//!
//! Resolution follows three stored hops and one provider call:
//!
//! 1. the device's first network interface, by creation time
//! 2. the switch port that interface is connected to, scoped to its switch
//! 3. the PoE capability of that switch, from the [`CapabilityProvider`]
//!
//! Power commands append exactly one [`DevicePowerState`] row on success.
//! When the command succeeded but the row could not be written the call
//! fails with [`PowerError::History`]; the port is left in its new state.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::capability::{CapabilityProvider, PoeCapability};
use super::error::PowerError;
use super::state::PowerState;
use crate::lab::{
    DeviceNetworkInterface, DevicePowerState, EthernetSwitchPort, PoeType, PowerStateResponse,
};
use crate::repository::{
    GenericRepository, OrderDirection, QueryDescriptor, Record, RepositoryResult,
};

/// PoE class requested when a port declares none
pub const DEFAULT_POE_CLASS: PoeType = PoeType::PoePlus;

/// The resolved control path of one device
pub struct PowerPath {
    pub interface_id: Uuid,
    pub switch_id: Uuid,
    pub port: Record<EthernetSwitchPort>,
    capability: Arc<dyn PoeCapability>,
}

impl PowerPath {
    /// Class to request when powering the port on
    pub fn poe_class(&self) -> PoeType {
        match self.port.data.poe_type {
            PoeType::None => DEFAULT_POE_CLASS,
            declared => declared,
        }
    }
}

impl fmt::Debug for PowerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerPath")
            .field("interface_id", &self.interface_id)
            .field("switch_id", &self.switch_id)
            .field("port", &self.port.data.name)
            .finish_non_exhaustive()
    }
}

/// Reads and switches device power
#[derive(Clone)]
pub struct PowerDriver {
    interfaces: GenericRepository<DeviceNetworkInterface>,
    ports: GenericRepository<EthernetSwitchPort>,
    history: GenericRepository<DevicePowerState>,
    provider: Arc<dyn CapabilityProvider>,
}

impl PowerDriver {
    pub fn new(
        interfaces: GenericRepository<DeviceNetworkInterface>,
        ports: GenericRepository<EthernetSwitchPort>,
        history: GenericRepository<DevicePowerState>,
        provider: Arc<dyn CapabilityProvider>,
    ) -> Self {
        Self {
            interfaces,
            ports,
            history,
            provider,
        }
    }

    /// Resolve the switch port and capability controlling `device_id`
    #[instrument(skip(self))]
    pub async fn resolve(&self, device_id: Uuid) -> Result<PowerPath, PowerError> {
        let first = QueryDescriptor::new("", "created_at", OrderDirection::Ascending, 1, 1);
        let scope = self
            .interfaces
            .new_query_builder()
            .eq(DeviceNetworkInterface::DEVICE_ID, device_id);
        let (mut interfaces, _) = self
            .interfaces
            .get_list(&first, Some(scope))
            .await
            .map_err(|source| PowerError::Interface { device_id, source })?;
        let interface = interfaces
            .pop()
            .ok_or(PowerError::NoInterface { device_id })?;

        let (switch_id, port_id) =
            interface
                .data
                .connection()
                .ok_or(PowerError::NotConnected {
                    device_id,
                    interface_id: interface.id,
                })?;

        let scope = self
            .ports
            .new_query_builder()
            .eq(EthernetSwitchPort::SWITCH_ID, switch_id);
        let port = self
            .ports
            .get_by_id(port_id, Some(scope))
            .await
            .map_err(|source| PowerError::Port {
                switch_id,
                port_id,
                source,
            })?;

        let capability = self
            .provider
            .poe_capability(port.data.switch_id)
            .await
            .map_err(|source| PowerError::Capability { switch_id, source })?;

        Ok(PowerPath {
            interface_id: interface.id,
            switch_id,
            port,
            capability,
        })
    }

    /// Current power state as reported by the switch
    pub async fn get_power_state(&self, device_id: Uuid) -> Result<PowerState, PowerError> {
        let path = self.resolve(device_id).await?;
        let status = path
            .capability
            .port_power_status(&path.port.data.name)
            .await
            .map_err(|source| PowerError::Device {
                switch_id: path.switch_id,
                port: path.port.data.name.clone(),
                source,
            })?;
        Ok(PowerState::from_port_status(&status))
    }

    /// Like [`get_power_state`](Self::get_power_state), reporting failures as
    /// [`PowerState::Unknown`]
    pub async fn power_state_or_unknown(&self, device_id: Uuid) -> PowerState {
        match self.get_power_state(device_id).await {
            Ok(state) => state,
            Err(e) => {
                warn!(%device_id, hop = %e.hop(), error = %e, "power state unavailable");
                PowerState::Unknown
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn power_on(&self, device_id: Uuid) -> Result<PowerStateResponse, PowerError> {
        let path = self.resolve(device_id).await?;
        let class = path.poe_class();
        path.capability
            .enable_port_power(&path.port.data.name, class)
            .await
            .map_err(|source| PowerError::Device {
                switch_id: path.switch_id,
                port: path.port.data.name.clone(),
                source,
            })?;
        info!(%device_id, port = %path.port.data.name, %class, "port power enabled");
        self.record(device_id, PowerState::On).await
    }

    #[instrument(skip(self))]
    pub async fn power_off(&self, device_id: Uuid) -> Result<PowerStateResponse, PowerError> {
        let path = self.resolve(device_id).await?;
        path.capability
            .disable_port_power(&path.port.data.name)
            .await
            .map_err(|source| PowerError::Device {
                switch_id: path.switch_id,
                port: path.port.data.name.clone(),
                source,
            })?;
        info!(%device_id, port = %path.port.data.name, "port power disabled");
        self.record(device_id, PowerState::Off).await
    }

    /// Power history of a device, newest first unless another order is asked for
    pub async fn history(
        &self,
        device_id: Uuid,
        query: &QueryDescriptor,
    ) -> RepositoryResult<(Vec<PowerStateResponse>, u64)> {
        let mut query = query.clone();
        if query.order_by.is_empty() {
            query.order_by = "created_at".to_string();
            query.direction = OrderDirection::Descending;
        }
        let scope = self
            .history
            .new_query_builder()
            .eq(DevicePowerState::DEVICE_ID, device_id);
        let (records, total) = self.history.get_list(&query, Some(scope)).await?;
        Ok((records.into_iter().map(PowerStateResponse::from).collect(), total))
    }

    async fn record(
        &self,
        device_id: Uuid,
        state: PowerState,
    ) -> Result<PowerStateResponse, PowerError> {
        match self.append(DevicePowerState { device_id, state }).await {
            Ok(record) => Ok(record.into()),
            Err(source) => {
                error!(
                    %device_id,
                    %state,
                    error = %source,
                    "device switched but power history was not written"
                );
                Err(PowerError::History {
                    device_id,
                    state,
                    source,
                })
            }
        }
    }

    async fn append(&self, entry: DevicePowerState) -> RepositoryResult<Record<DevicePowerState>> {
        let id = self.history.insert(entry).await?;
        self.history.get_by_id(id, None).await
    }
}

impl fmt::Debug for PowerDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PowerDriver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lab::{EthernetSwitch, Location};
    use crate::power::{CapabilityError, PowerHop, SimulatedProvider, StaticCapabilityProvider};
    use crate::repository::{MemoryStore, RepositoryError, Store};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Lab {
        switches: GenericRepository<EthernetSwitch>,
        ports: GenericRepository<EthernetSwitchPort>,
        interfaces: GenericRepository<DeviceNetworkInterface>,
        history: GenericRepository<DevicePowerState>,
    }

    impl Lab {
        fn new() -> Self {
            Self {
                switches: GenericRepository::in_memory().unwrap(),
                ports: GenericRepository::in_memory().unwrap(),
                interfaces: GenericRepository::in_memory().unwrap(),
                history: GenericRepository::in_memory().unwrap(),
            }
        }

        fn driver(&self, provider: Arc<dyn CapabilityProvider>) -> PowerDriver {
            PowerDriver::new(
                self.interfaces.clone(),
                self.ports.clone(),
                self.history.clone(),
                provider,
            )
        }

        /// A switch with one port and a device cabled to it
        async fn wired(&self, poe_type: PoeType) -> (Uuid, Uuid) {
            let switch_id = self
                .switches
                .insert(EthernetSwitch {
                    name: format!("sw-{}", Uuid::new_v4()),
                    management_address: "10.0.0.2".to_string(),
                    model: "simulated".to_string(),
                    description: String::new(),
                    location: Location::default(),
                })
                .await
                .unwrap();
            let port_id = self
                .ports
                .insert(EthernetSwitchPort {
                    switch_id,
                    name: "eth0".to_string(),
                    description: String::new(),
                    poe_type,
                })
                .await
                .unwrap();
            let device_id = Uuid::new_v4();
            self.cable(device_id, "eth0", Some(switch_id), Some(port_id))
                .await;
            (device_id, switch_id)
        }

        async fn cable(
            &self,
            device_id: Uuid,
            name: &str,
            switch_id: Option<Uuid>,
            switch_port_id: Option<Uuid>,
        ) {
            self.interfaces
                .insert(DeviceNetworkInterface {
                    device_id,
                    name: name.to_string(),
                    mac_address: unique_mac(),
                    switch_id,
                    switch_port_id,
                })
                .await
                .unwrap();
        }

        async fn history_len(&self, device_id: Uuid) -> u64 {
            let scope = self
                .history
                .new_query_builder()
                .eq(DevicePowerState::DEVICE_ID, device_id);
            self.history
                .get_list(&QueryDescriptor::default(), Some(scope))
                .await
                .unwrap()
                .1
        }
    }

    fn unique_mac() -> String {
        let b = Uuid::new_v4().into_bytes();
        format!("02:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", b[0], b[1], b[2], b[3], b[4])
    }

    /// Capability whose every command fails
    struct BrokenPoe;

    #[async_trait]
    impl PoeCapability for BrokenPoe {
        async fn port_power_status(&self, _port: &str) -> Result<String, CapabilityError> {
            Err(CapabilityError::Command("unreachable".to_string()))
        }

        async fn enable_port_power(&self, _port: &str, _class: PoeType) -> Result<(), CapabilityError> {
            Err(CapabilityError::Command("unreachable".to_string()))
        }

        async fn disable_port_power(&self, _port: &str) -> Result<(), CapabilityError> {
            Err(CapabilityError::Command("unreachable".to_string()))
        }
    }

    /// Store that refuses every write
    struct ReadOnlyStore(MemoryStore<DevicePowerState>);

    #[async_trait]
    impl Store<DevicePowerState> for ReadOnlyStore {
        async fn select(
            &self,
            query: crate::repository::SelectQuery,
        ) -> RepositoryResult<(Vec<Record<DevicePowerState>>, u64)> {
            self.0.select(query).await
        }

        async fn find(
            &self,
            id: Uuid,
            filter: Option<&crate::repository::Expr>,
            include_deleted: bool,
        ) -> RepositoryResult<Option<Record<DevicePowerState>>> {
            self.0.find(id, filter, include_deleted).await
        }

        async fn insert(&self, _record: Record<DevicePowerState>) -> RepositoryResult<()> {
            Err(RepositoryError::connection_failed(
                crate::repository::RepositoryOperation::Insert,
                "read-only replica",
            ))
        }

        async fn update(&self, _record: Record<DevicePowerState>) -> RepositoryResult<bool> {
            Ok(false)
        }

        async fn soft_delete(
            &self,
            _id: Uuid,
            _at: chrono::DateTime<chrono::Utc>,
        ) -> RepositoryResult<Option<crate::repository::DeleteOutcome>> {
            Ok(None)
        }
    }

    /// Capability recording the class of every enable call
    #[derive(Default)]
    struct RecordingPoe {
        enabled: Mutex<Vec<PoeType>>,
    }

    #[async_trait]
    impl PoeCapability for RecordingPoe {
        async fn port_power_status(&self, _port: &str) -> Result<String, CapabilityError> {
            Ok("enable".to_string())
        }

        async fn enable_port_power(&self, _port: &str, class: PoeType) -> Result<(), CapabilityError> {
            if let Ok(mut enabled) = self.enabled.lock() {
                enabled.push(class);
            }
            Ok(())
        }

        async fn disable_port_power(&self, _port: &str) -> Result<(), CapabilityError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_power_on_records_one_history_row() {
        let lab = Lab::new();
        let (device_id, switch_id) = lab.wired(PoeType::PoePlus).await;
        let provider = SimulatedProvider::new();
        let driver = lab.driver(Arc::new(provider.clone()));

        assert_eq!(driver.get_power_state(device_id).await.unwrap(), PowerState::Off);
        let entry = driver.power_on(device_id).await.unwrap();
        assert_eq!(entry.state, PowerState::On);
        assert_eq!(entry.device_id, device_id);
        assert_eq!(lab.history_len(device_id).await, 1);
        assert_eq!(driver.get_power_state(device_id).await.unwrap(), PowerState::On);
        assert_eq!(
            provider.switch(switch_id).await.powered_class("eth0").await,
            Some(PoeType::PoePlus)
        );
    }

    #[tokio::test]
    async fn test_power_off_then_history_is_newest_first() {
        let lab = Lab::new();
        let (device_id, _) = lab.wired(PoeType::Poe).await;
        let driver = lab.driver(Arc::new(SimulatedProvider::new()));

        driver.power_on(device_id).await.unwrap();
        driver.power_off(device_id).await.unwrap();

        let (entries, total) = driver
            .history(device_id, &QueryDescriptor::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        let states: Vec<PowerState> = entries.iter().map(|e| e.state).collect();
        assert_eq!(states, vec![PowerState::Off, PowerState::On]);
    }

    #[tokio::test]
    async fn test_port_without_poe_class_is_powered_as_poe_plus() {
        let lab = Lab::new();
        let (device_id, switch_id) = lab.wired(PoeType::None).await;
        let poe = Arc::new(RecordingPoe::default());
        let provider = StaticCapabilityProvider::new();
        provider.register(switch_id, poe.clone()).await;

        lab.driver(Arc::new(provider)).power_on(device_id).await.unwrap();
        assert_eq!(*poe.enabled.lock().unwrap(), vec![PoeType::PoePlus]);
    }

    #[tokio::test]
    async fn test_missing_interface() {
        let lab = Lab::new();
        let driver = lab.driver(Arc::new(SimulatedProvider::new()));
        let device_id = Uuid::new_v4();

        let error = driver.power_on(device_id).await.unwrap_err();
        assert!(matches!(error, PowerError::NoInterface { .. }));
        assert_eq!(driver.power_state_or_unknown(device_id).await, PowerState::Unknown);
        assert_eq!(lab.history_len(device_id).await, 0);
    }

    #[tokio::test]
    async fn test_unconnected_interface() {
        let lab = Lab::new();
        let device_id = Uuid::new_v4();
        lab.cable(device_id, "eth0", None, None).await;
        let error = lab
            .driver(Arc::new(SimulatedProvider::new()))
            .get_power_state(device_id)
            .await
            .unwrap_err();
        assert!(matches!(error, PowerError::NotConnected { .. }));
    }

    #[tokio::test]
    async fn test_dangling_port_fails_at_port_hop_without_history() {
        let lab = Lab::new();
        let device_id = Uuid::new_v4();
        lab.cable(device_id, "eth0", Some(Uuid::new_v4()), Some(Uuid::new_v4()))
            .await;
        let error = lab
            .driver(Arc::new(SimulatedProvider::new()))
            .power_on(device_id)
            .await
            .unwrap_err();
        assert_eq!(error.hop(), PowerHop::Port);
        assert!(error.is_not_found());
        assert_eq!(lab.history_len(device_id).await, 0);
    }

    #[tokio::test]
    async fn test_port_on_other_switch_is_not_resolved() {
        let lab = Lab::new();
        let (_, switch_id) = lab.wired(PoeType::Poe).await;
        let (_, other_switch) = lab.wired(PoeType::Poe).await;
        let (records, _) = lab
            .ports
            .get_list(
                &QueryDescriptor::default(),
                Some(
                    lab.ports
                        .new_query_builder()
                        .eq(EthernetSwitchPort::SWITCH_ID, switch_id),
                ),
            )
            .await
            .unwrap();
        let device_id = Uuid::new_v4();
        lab.cable(device_id, "eth9", Some(other_switch), Some(records[0].id))
            .await;

        let error = lab
            .driver(Arc::new(SimulatedProvider::new()))
            .get_power_state(device_id)
            .await
            .unwrap_err();
        assert_eq!(error.hop(), PowerHop::Port);
    }

    #[tokio::test]
    async fn test_first_interface_by_creation_wins() {
        let lab = Lab::new();
        let (device_id, _) = lab.wired(PoeType::Poe).await;
        lab.cable(device_id, "eth1", None, None).await;
        let driver = lab.driver(Arc::new(SimulatedProvider::new()));
        assert!(driver.resolve(device_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_switch_capability() {
        let lab = Lab::new();
        let (device_id, _) = lab.wired(PoeType::Poe).await;
        let error = lab
            .driver(Arc::new(StaticCapabilityProvider::new()))
            .get_power_state(device_id)
            .await
            .unwrap_err();
        assert_eq!(error.hop(), PowerHop::Capability);
    }

    #[tokio::test]
    async fn test_device_failure_writes_no_history() {
        let lab = Lab::new();
        let (device_id, switch_id) = lab.wired(PoeType::Poe).await;
        let provider = StaticCapabilityProvider::new();
        provider.register(switch_id, Arc::new(BrokenPoe)).await;
        let driver = lab.driver(Arc::new(provider));

        let error = driver.power_off(device_id).await.unwrap_err();
        assert_eq!(error.hop(), PowerHop::Device);
        assert_eq!(lab.history_len(device_id).await, 0);
        assert_eq!(driver.power_state_or_unknown(device_id).await, PowerState::Unknown);
    }

    #[tokio::test]
    async fn test_history_failure_fails_the_command() {
        let lab = Lab::new();
        let (device_id, switch_id) = lab.wired(PoeType::Poe).await;
        let provider = SimulatedProvider::new();
        let history = GenericRepository::<DevicePowerState>::new(Arc::new(ReadOnlyStore(
            MemoryStore::new(),
        )))
        .unwrap();
        let driver = PowerDriver::new(
            lab.interfaces.clone(),
            lab.ports.clone(),
            history,
            Arc::new(provider.clone()),
        );

        let error = driver.power_on(device_id).await.unwrap_err();
        assert!(matches!(
            error,
            PowerError::History {
                state: PowerState::On,
                ..
            }
        ));
        // The port stays powered
        assert_eq!(
            provider.switch(switch_id).await.powered_class("eth0").await,
            Some(PoeType::Poe)
        );
    }
}
