//! VLANs defined on a switch

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::switch::EthernetSwitch;
use crate::repository::{
    Column, Entity, FieldRef, GenericRepository, Record, SchemaError, UniqueKey,
};
use crate::service::{GenericService, Mapper, Owned, OwnedService, Validate, ValidationErrors};

/// Lowest assignable 802.1Q tag
pub const MIN_VLAN_TAG: u16 = 1;

/// Highest assignable 802.1Q tag
pub const MAX_VLAN_TAG: u16 = 4094;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vlan {
    pub switch_id: Uuid,
    pub tag: u16,
    pub name: String,
}

impl Vlan {
    pub const SWITCH_ID: FieldRef<Self, Uuid> = FieldRef::new("switch_id");
    pub const TAG: FieldRef<Self, u16> = FieldRef::new("tag");
}

impl Entity for Vlan {
    const KIND: &'static str = "vlan";

    fn columns() -> Vec<Column> {
        vec![
            Column::uuid("switch_id"),
            Column::integer("tag"),
            Column::string("name"),
        ]
    }

    fn unique_keys() -> &'static [UniqueKey] {
        &[&["switch_id", "tag"]]
    }
}

impl Owned for Vlan {
    type Owner = EthernetSwitch;

    const OWNER: FieldRef<Self, Uuid> = Self::SWITCH_ID;
    const OWNER_FIELD: &'static str = "switchId";

    fn owner_id(&self) -> Uuid {
        self.switch_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVlan {
    pub switch_id: Uuid,
    pub tag: u16,
    #[serde(default)]
    pub name: String,
}

/// Tag and name can change; the switch cannot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVlan {
    pub tag: u16,
    #[serde(default)]
    pub name: String,
}

fn check_tag(errors: &mut ValidationErrors, tag: u16) {
    errors.check(
        (MIN_VLAN_TAG..=MAX_VLAN_TAG).contains(&tag),
        "tag",
        format!("must be between {} and {}", MIN_VLAN_TAG, MAX_VLAN_TAG),
    );
}

impl Validate for CreateVlan {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!self.switch_id.is_nil(), "switchId", "is required");
        check_tag(&mut errors, self.tag);
        errors.into_result()
    }
}

impl Validate for UpdateVlan {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_tag(&mut errors, self.tag);
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VlanResponse {
    pub id: Uuid,
    pub switch_id: Uuid,
    pub tag: u16,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VlanMapper;

impl Mapper for VlanMapper {
    type Entity = Vlan;
    type Create = CreateVlan;
    type Update = UpdateVlan;
    type Response = VlanResponse;

    fn to_entity(&self, dto: CreateVlan) -> Result<Vlan, ValidationErrors> {
        let name = if dto.name.trim().is_empty() {
            format!("vlan{}", dto.tag)
        } else {
            dto.name.trim().to_string()
        };
        Ok(Vlan {
            switch_id: dto.switch_id,
            tag: dto.tag,
            name,
        })
    }

    fn apply_update(&self, entity: Vlan, dto: UpdateVlan) -> Result<Vlan, ValidationErrors> {
        self.to_entity(CreateVlan {
            switch_id: entity.switch_id,
            tag: dto.tag,
            name: dto.name,
        })
    }

    fn to_response(&self, record: Record<Vlan>) -> VlanResponse {
        VlanResponse {
            id: record.id,
            switch_id: record.data.switch_id,
            tag: record.data.tag,
            name: record.data.name,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

pub type VlanService = OwnedService<VlanMapper>;

impl OwnedService<VlanMapper> {
    pub fn from_repositories(
        vlans: GenericRepository<Vlan>,
        switches: GenericRepository<EthernetSwitch>,
    ) -> Self {
        Self::new(GenericService::new(vlans, VlanMapper), switches)
    }

    pub fn in_memory(switches: GenericRepository<EthernetSwitch>) -> Result<Self, SchemaError> {
        Ok(Self::from_repositories(GenericRepository::in_memory()?, switches))
    }
}
