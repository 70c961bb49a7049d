//! Switch ports
//!
//! A port belongs to exactly one switch for its whole life. Port names are
//! unique per switch.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::switch::EthernetSwitch;
use crate::repository::{
    Column, Entity, FieldRef, FilterValue, GenericRepository, Record, SchemaError, UniqueKey,
};
use crate::service::{
    GenericService, Mapper, Owned, OwnedService, ServiceResult, Validate, ValidationErrors,
};

/// Power-over-Ethernet class a port supplies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoeType {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "passive24")]
    Passive24,
    #[serde(rename = "poe")]
    Poe,
    #[serde(rename = "poe+")]
    PoePlus,
}

impl PoeType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Passive24 => "passive24",
            Self::Poe => "poe",
            Self::PoePlus => "poe+",
        }
    }

    pub const fn supplies_power(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for PoeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "passive24" => Ok(Self::Passive24),
            "poe" => Ok(Self::Poe),
            "poe+" => Ok(Self::PoePlus),
            other => Err(format!("unknown PoE type '{}'", other)),
        }
    }
}

impl From<PoeType> for FilterValue {
    fn from(poe: PoeType) -> Self {
        FilterValue::String(poe.as_str().to_string())
    }
}

/// A port on an Ethernet switch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthernetSwitchPort {
    /// Owning switch; immutable after creation
    pub switch_id: Uuid,
    /// Port name as the switch reports it, such as `eth0` or `Gi1/0/12`
    pub name: String,
    pub description: String,
    pub poe_type: PoeType,
}

impl EthernetSwitchPort {
    pub const SWITCH_ID: FieldRef<Self, Uuid> = FieldRef::new("switch_id");
    pub const NAME: FieldRef<Self, String> = FieldRef::new("name");
    pub const POE_TYPE: FieldRef<Self, PoeType> = FieldRef::new("poe_type");
}

impl Entity for EthernetSwitchPort {
    const KIND: &'static str = "ethernet_switch_port";

    fn columns() -> Vec<Column> {
        vec![
            Column::uuid("switch_id"),
            Column::string("name"),
            Column::string("description"),
            Column::enumeration("poe_type"),
        ]
    }

    fn unique_keys() -> &'static [UniqueKey] {
        &[&["switch_id", "name"]]
    }
}

impl Owned for EthernetSwitchPort {
    type Owner = EthernetSwitch;

    const OWNER: FieldRef<Self, Uuid> = Self::SWITCH_ID;
    const OWNER_FIELD: &'static str = "switchId";

    fn owner_id(&self) -> Uuid {
        self.switch_id
    }
}

/// Body of `POST /ports`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePort {
    pub switch_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub poe_type: PoeType,
}

/// Body of `PUT /ports/{id}`
///
/// The switch cannot change; a `switchId` naming another switch is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePort {
    #[serde(default)]
    pub switch_id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub poe_type: PoeType,
}

fn check_name(errors: &mut ValidationErrors, name: &str) {
    errors.check(!name.trim().is_empty(), "name", "must not be empty");
    errors.check(
        !name.chars().any(char::is_whitespace),
        "name",
        "must not contain whitespace",
    );
}

impl Validate for CreatePort {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!self.switch_id.is_nil(), "switchId", "is required");
        check_name(&mut errors, &self.name);
        errors.into_result()
    }
}

impl Validate for UpdatePort {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_name(&mut errors, &self.name);
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortResponse {
    pub id: Uuid,
    pub switch_id: Uuid,
    pub name: String,
    pub description: String,
    pub poe_type: PoeType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PortMapper;

impl Mapper for PortMapper {
    type Entity = EthernetSwitchPort;
    type Create = CreatePort;
    type Update = UpdatePort;
    type Response = PortResponse;

    fn to_entity(&self, dto: CreatePort) -> Result<EthernetSwitchPort, ValidationErrors> {
        Ok(EthernetSwitchPort {
            switch_id: dto.switch_id,
            name: dto.name,
            description: dto.description,
            poe_type: dto.poe_type,
        })
    }

    fn apply_update(
        &self,
        entity: EthernetSwitchPort,
        dto: UpdatePort,
    ) -> Result<EthernetSwitchPort, ValidationErrors> {
        Ok(EthernetSwitchPort {
            switch_id: dto.switch_id.unwrap_or(entity.switch_id),
            name: dto.name,
            description: dto.description,
            poe_type: dto.poe_type,
        })
    }

    fn to_response(&self, record: Record<EthernetSwitchPort>) -> PortResponse {
        PortResponse {
            id: record.id,
            switch_id: record.data.switch_id,
            name: record.data.name,
            description: record.data.description,
            poe_type: record.data.poe_type,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

pub type PortService = OwnedService<PortMapper>;

impl OwnedService<PortMapper> {
    pub fn from_repositories(
        ports: GenericRepository<EthernetSwitchPort>,
        switches: GenericRepository<EthernetSwitch>,
    ) -> Self {
        Self::new(GenericService::new(ports, PortMapper), switches)
    }

    pub fn in_memory(switches: GenericRepository<EthernetSwitch>) -> Result<Self, SchemaError> {
        Ok(Self::from_repositories(GenericRepository::in_memory()?, switches))
    }

    /// Fetch a port only if it belongs to `switch_id`
    #[instrument(skip(self))]
    pub async fn get_port_by_id(&self, switch_id: Uuid, port_id: Uuid) -> ServiceResult<PortResponse> {
        self.get_scoped(switch_id, port_id).await
    }
}
