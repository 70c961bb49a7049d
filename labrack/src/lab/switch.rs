//! Ethernet switches

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::{
    Column, Entity, FieldRef, GenericRepository, Record, SchemaError, UniqueKey,
};
use crate::service::{GenericService, Mapper, Validate, ValidationErrors};

/// Physical placement of a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub rack: String,
    #[serde(default)]
    pub room: String,
}

impl Location {
    fn columns() -> Vec<Column> {
        vec![Column::string("rack"), Column::string("room")]
    }
}

/// A managed Ethernet switch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthernetSwitch {
    /// Unique switch name
    pub name: String,
    /// Address the management interface is reachable on
    pub management_address: String,
    /// Vendor model, selects the management driver
    pub model: String,
    pub description: String,
    pub location: Location,
}

impl EthernetSwitch {
    pub const NAME: FieldRef<Self, String> = FieldRef::new("name");
    pub const MODEL: FieldRef<Self, String> = FieldRef::new("model");
}

impl Entity for EthernetSwitch {
    const KIND: &'static str = "ethernet_switch";

    fn columns() -> Vec<Column> {
        let mut columns = vec![
            Column::string("name"),
            Column::string("management_address"),
            Column::string("model"),
            Column::string("description"),
        ];
        columns.extend(Column::nested("location", Location::columns()));
        columns
    }

    fn unique_keys() -> &'static [UniqueKey] {
        &[&["name"]]
    }
}

/// Body of `POST /switches`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSwitch {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub management_address: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Location,
}

/// Body of `PUT /switches/{id}`; replaces every field
pub type UpdateSwitch = CreateSwitch;

impl Validate for CreateSwitch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!self.name.trim().is_empty(), "name", "must not be empty");
        errors.check(
            !self.management_address.trim().is_empty(),
            "managementAddress",
            "must not be empty",
        );
        errors.check(!self.model.trim().is_empty(), "model", "must not be empty");
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchResponse {
    pub id: Uuid,
    pub name: String,
    pub management_address: String,
    pub model: String,
    pub description: String,
    pub location: Location,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchMapper;

impl Mapper for SwitchMapper {
    type Entity = EthernetSwitch;
    type Create = CreateSwitch;
    type Update = UpdateSwitch;
    type Response = SwitchResponse;

    fn to_entity(&self, dto: CreateSwitch) -> Result<EthernetSwitch, ValidationErrors> {
        Ok(EthernetSwitch {
            name: dto.name.trim().to_string(),
            management_address: dto.management_address.trim().to_string(),
            model: dto.model.trim().to_string(),
            description: dto.description,
            location: dto.location,
        })
    }

    fn apply_update(
        &self,
        _entity: EthernetSwitch,
        dto: UpdateSwitch,
    ) -> Result<EthernetSwitch, ValidationErrors> {
        self.to_entity(dto)
    }

    fn to_response(&self, record: Record<EthernetSwitch>) -> SwitchResponse {
        SwitchResponse {
            id: record.id,
            name: record.data.name,
            management_address: record.data.management_address,
            model: record.data.model,
            description: record.data.description,
            location: record.data.location,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

pub type SwitchService = GenericService<SwitchMapper>;

impl GenericService<SwitchMapper> {
    pub fn in_memory() -> Result<Self, SchemaError> {
        Ok(Self::new(GenericRepository::in_memory()?, SwitchMapper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{OrderDirection, QueryDescriptor};
    use crate::service::{EntityService, ServiceErrorKind};

    fn dto(name: &str, rack: &str) -> CreateSwitch {
        CreateSwitch {
            name: name.to_string(),
            management_address: "192.0.2.10".to_string(),
            model: "cisco-ios".to_string(),
            description: "top of rack".to_string(),
            location: Location {
                rack: rack.to_string(),
                room: "lab-1".to_string(),
            },
        }
    }

    #[test]
    fn test_schema_flattens_location() {
        let schema = crate::repository::Schema::of::<EthernetSwitch>().unwrap();
        assert!(schema.column("location.rack").is_some());
        assert!(schema.searchable().iter().any(|c| c.path() == "location.room"));
    }

    #[tokio::test]
    async fn test_round_trip_keeps_user_fields() {
        let service = SwitchService::in_memory().unwrap();
        let created = service.create(dto(" sw1 ", "A01")).await.unwrap();
        let fetched = service.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched.name, "sw1");
        assert_eq!(fetched.location.rack, "A01");
        assert_eq!(fetched.description, "top of rack");
    }

    #[tokio::test]
    async fn test_names_are_unique() {
        let service = SwitchService::in_memory().unwrap();
        service.create(dto("sw1", "A01")).await.unwrap();
        let error = service.create(dto("sw1", "A02")).await.unwrap_err();
        assert_eq!(error.kind(), ServiceErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_name_is_reusable_after_delete() {
        let service = SwitchService::in_memory().unwrap();
        let created = service.create(dto("sw1", "A01")).await.unwrap();
        service.delete(created.id).await.unwrap();
        assert!(service.create(dto("sw1", "A01")).await.is_ok());
    }

    #[tokio::test]
    async fn test_search_reaches_nested_location() {
        let service = SwitchService::in_memory().unwrap();
        service.create(dto("sw1", "A01")).await.unwrap();
        service.create(dto("sw2", "B07")).await.unwrap();

        let query = QueryDescriptor::new("b0", "location.rack", OrderDirection::Ascending, 1, 10);
        let (items, total) = service.get_list(query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].name, "sw2");

        let query = QueryDescriptor::new("nothing-here", "", OrderDirection::Ascending, 1, 10);
        let (items, total) = service.get_list(query).await.unwrap();
        assert!(items.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn test_blank_fields_are_rejected() {
        let service = SwitchService::in_memory().unwrap();
        let error = service.create(CreateSwitch::default()).await.unwrap_err();
        let fields = error.field_errors().unwrap();
        assert!(fields.get("name").is_some());
        assert!(fields.get("managementAddress").is_some());
        assert!(fields.get("model").is_some());
    }
}
