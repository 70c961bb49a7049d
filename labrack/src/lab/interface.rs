//! Device network interfaces and their switch wiring

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::{
    Column, Entity, FieldRef, GenericRepository, Record, SchemaError, UniqueKey,
};
use crate::service::{GenericService, Mapper, Validate, ValidationErrors};

/// A network interface of a lab device
///
/// `switch_id` and `switch_port_id` record where the interface is cabled.
/// They are not checked against the switch inventory when written; the
/// power driver reports a dangling reference when it tries to follow one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceNetworkInterface {
    pub device_id: Uuid,
    pub name: String,
    /// Lowercase, colon separated
    pub mac_address: String,
    pub switch_id: Option<Uuid>,
    pub switch_port_id: Option<Uuid>,
}

impl DeviceNetworkInterface {
    pub const DEVICE_ID: FieldRef<Self, Uuid> = FieldRef::new("device_id");
    pub const MAC_ADDRESS: FieldRef<Self, String> = FieldRef::new("mac_address");
    pub const SWITCH_PORT_ID: FieldRef<Self, Option<Uuid>> = FieldRef::new("switch_port_id");

    /// The switch and port this interface is cabled to, when both are known
    pub fn connection(&self) -> Option<(Uuid, Uuid)> {
        self.switch_id.zip(self.switch_port_id)
    }
}

impl Entity for DeviceNetworkInterface {
    const KIND: &'static str = "device_network_interface";

    fn columns() -> Vec<Column> {
        vec![
            Column::uuid("device_id"),
            Column::string("name"),
            Column::string("mac_address"),
            Column::uuid("switch_id"),
            Column::uuid("switch_port_id"),
        ]
    }

    fn unique_keys() -> &'static [UniqueKey] {
        &[&["mac_address"], &["device_id", "name"]]
    }
}

/// Normalize a MAC address written with `:` or `-` separators
///
/// ```rust
/// use labrack::lab::normalize_mac;
///
/// assert_eq!(normalize_mac("AA-BB-CC-00-11-22").as_deref(), Some("aa:bb:cc:00:11:22"));
/// assert_eq!(normalize_mac("aa:bb:cc:00:11"), None);
/// ```
pub fn normalize_mac(raw: &str) -> Option<String> {
    let octets: Vec<&str> = raw.trim().split([':', '-']).collect();
    let valid = octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
    valid.then(|| octets.join(":").to_ascii_lowercase())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInterface {
    pub device_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub switch_id: Option<Uuid>,
    #[serde(default)]
    pub switch_port_id: Option<Uuid>,
}

/// Re-cabling an interface is an update; the device cannot change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInterface {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub switch_id: Option<Uuid>,
    #[serde(default)]
    pub switch_port_id: Option<Uuid>,
}

fn check_wiring(
    errors: &mut ValidationErrors,
    name: &str,
    mac_address: &str,
    switch_id: Option<Uuid>,
    switch_port_id: Option<Uuid>,
) {
    errors.check(!name.trim().is_empty(), "name", "must not be empty");
    errors.check(
        normalize_mac(mac_address).is_some(),
        "macAddress",
        "must be six hex octets separated by ':' or '-'",
    );
    errors.check(
        switch_port_id.is_none() || switch_id.is_some(),
        "switchId",
        "is required when switchPortId is set",
    );
}

impl Validate for CreateInterface {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!self.device_id.is_nil(), "deviceId", "is required");
        check_wiring(
            &mut errors,
            &self.name,
            &self.mac_address,
            self.switch_id,
            self.switch_port_id,
        );
        errors.into_result()
    }
}

impl Validate for UpdateInterface {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_wiring(
            &mut errors,
            &self.name,
            &self.mac_address,
            self.switch_id,
            self.switch_port_id,
        );
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceResponse {
    pub id: Uuid,
    pub device_id: Uuid,
    pub name: String,
    pub mac_address: String,
    pub switch_id: Option<Uuid>,
    pub switch_port_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InterfaceMapper;

impl InterfaceMapper {
    fn mac(raw: &str) -> Result<String, ValidationErrors> {
        normalize_mac(raw).ok_or_else(|| ValidationErrors::single("macAddress", "is not a MAC address"))
    }
}

impl Mapper for InterfaceMapper {
    type Entity = DeviceNetworkInterface;
    type Create = CreateInterface;
    type Update = UpdateInterface;
    type Response = InterfaceResponse;

    fn to_entity(&self, dto: CreateInterface) -> Result<DeviceNetworkInterface, ValidationErrors> {
        Ok(DeviceNetworkInterface {
            device_id: dto.device_id,
            name: dto.name.trim().to_string(),
            mac_address: Self::mac(&dto.mac_address)?,
            switch_id: dto.switch_id,
            switch_port_id: dto.switch_port_id,
        })
    }

    fn apply_update(
        &self,
        entity: DeviceNetworkInterface,
        dto: UpdateInterface,
    ) -> Result<DeviceNetworkInterface, ValidationErrors> {
        Ok(DeviceNetworkInterface {
            device_id: entity.device_id,
            name: dto.name.trim().to_string(),
            mac_address: Self::mac(&dto.mac_address)?,
            switch_id: dto.switch_id,
            switch_port_id: dto.switch_port_id,
        })
    }

    fn to_response(&self, record: Record<DeviceNetworkInterface>) -> InterfaceResponse {
        InterfaceResponse {
            id: record.id,
            device_id: record.data.device_id,
            name: record.data.name,
            mac_address: record.data.mac_address,
            switch_id: record.data.switch_id,
            switch_port_id: record.data.switch_port_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

pub type InterfaceService = GenericService<InterfaceMapper>;

impl GenericService<InterfaceMapper> {
    pub fn in_memory() -> Result<Self, SchemaError> {
        Ok(Self::new(GenericRepository::in_memory()?, InterfaceMapper))
    }
}
