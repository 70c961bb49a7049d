//! Generic service
//!
//! Validates DTOs, maps them through the resource's [`Mapper`] and delegates
//! persistence to a [`GenericRepository`].

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, instrument};
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use super::mapper::Mapper;
use super::traits::EntityService;
use super::validation::{Validate, ValidationErrors};
use crate::repository::{
    DeleteOutcome, Entity, GenericRepository, QueryBuilder, QueryDescriptor, RepositoryError,
};

/// CRUD over DTOs for the resource described by `M`
pub struct GenericService<M: Mapper> {
    repository: GenericRepository<M::Entity>,
    mapper: Arc<M>,
}

impl<M: Mapper> GenericService<M> {
    pub fn new(repository: GenericRepository<M::Entity>, mapper: M) -> Self {
        Self {
            repository,
            mapper: Arc::new(mapper),
        }
    }

    pub fn repository(&self) -> &GenericRepository<M::Entity> {
        &self.repository
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    /// List responses, narrowed by an optional query builder
    #[instrument(skip(self, query, builder), fields(entity = M::Entity::KIND))]
    pub async fn get_list_scoped(
        &self,
        query: &QueryDescriptor,
        builder: Option<QueryBuilder<M::Entity>>,
    ) -> ServiceResult<(Vec<M::Response>, u64)> {
        let (records, total) = self
            .repository
            .get_list(query, builder)
            .await
            .map_err(|e| self.classify(e))?;
        let items = records
            .into_iter()
            .map(|record| self.mapper.to_response(record))
            .collect();
        Ok((items, total))
    }

    /// Fetch one response, narrowed by an optional query builder
    #[instrument(skip(self, builder), fields(entity = M::Entity::KIND))]
    pub async fn get_by_id_scoped(
        &self,
        id: Uuid,
        builder: Option<QueryBuilder<M::Entity>>,
    ) -> ServiceResult<M::Response> {
        let record = self
            .repository
            .get_by_id(id, builder)
            .await
            .map_err(|e| self.classify(e))?;
        Ok(self.mapper.to_response(record))
    }

    /// Persist an already mapped entity and return its response
    pub(crate) async fn insert_entity(&self, entity: M::Entity) -> ServiceResult<M::Response> {
        let id = self
            .repository
            .insert(entity)
            .await
            .map_err(|e| self.classify(e))?;
        info!(entity = M::Entity::KIND, %id, "created");
        self.get_by_id_scoped(id, None).await
    }

    /// Apply an update, letting `check` veto the change before it is stored
    #[instrument(skip(self, dto, check), fields(entity = M::Entity::KIND))]
    pub(crate) async fn update_checked<F>(
        &self,
        id: Uuid,
        dto: M::Update,
        check: F,
    ) -> ServiceResult<M::Response>
    where
        F: FnOnce(&M::Entity, &M::Entity) -> Result<(), ValidationErrors> + Send,
    {
        dto.validate()?;
        let mut record = self
            .repository
            .get_by_id(id, None)
            .await
            .map_err(|e| self.classify(e))?;

        let updated = self.mapper.apply_update(record.data.clone(), dto)?;
        check(&record.data, &updated)?;
        record.data = updated;

        self.repository
            .update(&record)
            .await
            .map_err(|e| self.classify(e))?;
        info!(entity = M::Entity::KIND, %id, "updated");
        self.get_by_id_scoped(id, None).await
    }

    fn classify(&self, error: RepositoryError) -> ServiceError {
        let error = ServiceError::from(error);
        if let ServiceError::Internal { source } = &error {
            error!(
                entity = M::Entity::KIND,
                operation = %source.operation,
                entity_id = ?source.entity_id,
                "repository failure: {}", source
            );
        }
        error
    }
}

impl<M: Mapper> EntityService for GenericService<M> {
    type Create = M::Create;
    type Update = M::Update;
    type Response = M::Response;

    fn kind(&self) -> &'static str {
        M::Entity::KIND
    }

    async fn get_list(&self, query: QueryDescriptor) -> ServiceResult<(Vec<M::Response>, u64)> {
        self.get_list_scoped(&query, None).await
    }

    async fn get_by_id(&self, id: Uuid) -> ServiceResult<M::Response> {
        self.get_by_id_scoped(id, None).await
    }

    async fn create(&self, dto: M::Create) -> ServiceResult<M::Response> {
        dto.validate()?;
        let entity = self.mapper.to_entity(dto)?;
        self.insert_entity(entity).await
    }

    async fn update(&self, id: Uuid, dto: M::Update) -> ServiceResult<M::Response> {
        self.update_checked(id, dto, |_, _| Ok(())).await
    }

    async fn delete(&self, id: Uuid) -> ServiceResult<DeleteOutcome> {
        let outcome = self
            .repository
            .delete(id)
            .await
            .map_err(|e| self.classify(e))?;
        info!(entity = M::Entity::KIND, %id, ?outcome, "deleted");
        Ok(outcome)
    }
}

impl<M: Mapper> Clone for GenericService<M> {
    fn clone(&self) -> Self {
        Self {
            repository: self.repository.clone(),
            mapper: Arc::clone(&self.mapper),
        }
    }
}

impl<M: Mapper> fmt::Debug for GenericService<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericService")
            .field("entity", &M::Entity::KIND)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{Column, MemoryStore, OrderDirection, Record};
    use crate::service::ServiceErrorKind;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Rack {
        name: String,
        units: u16,
    }

    impl Entity for Rack {
        const KIND: &'static str = "rack";

        fn columns() -> Vec<Column> {
            vec![Column::string("name"), Column::integer("units")]
        }

        fn unique_keys() -> &'static [crate::repository::UniqueKey] {
            &[&["name"]]
        }
    }

    #[derive(Debug, Deserialize)]
    struct CreateRack {
        name: String,
        units: Option<u16>,
    }

    #[derive(Debug, Deserialize)]
    struct UpdateRack {
        units: u16,
    }

    #[derive(Debug, Serialize)]
    struct RackResponse {
        id: Uuid,
        name: String,
        units: u16,
        created_at: DateTime<Utc>,
    }

    impl Validate for CreateRack {
        fn validate(&self) -> Result<(), ValidationErrors> {
            let mut errors = ValidationErrors::new();
            errors.check(!self.name.trim().is_empty(), "name", "must not be empty");
            errors.into_result()
        }
    }

    impl Validate for UpdateRack {
        fn validate(&self) -> Result<(), ValidationErrors> {
            let mut errors = ValidationErrors::new();
            errors.check(self.units > 0, "units", "must be positive");
            errors.into_result()
        }
    }

    struct RackMapper;

    impl Mapper for RackMapper {
        type Entity = Rack;
        type Create = CreateRack;
        type Update = UpdateRack;
        type Response = RackResponse;

        fn to_entity(&self, dto: CreateRack) -> Result<Rack, ValidationErrors> {
            let units = dto
                .units
                .ok_or_else(|| ValidationErrors::single("units", "is required"))?;
            Ok(Rack {
                name: dto.name,
                units,
            })
        }

        fn apply_update(&self, entity: Rack, dto: UpdateRack) -> Result<Rack, ValidationErrors> {
            Ok(Rack {
                units: dto.units,
                ..entity
            })
        }

        fn to_response(&self, record: Record<Rack>) -> RackResponse {
            RackResponse {
                id: record.id,
                name: record.data.name,
                units: record.data.units,
                created_at: record.created_at,
            }
        }
    }

    fn service() -> GenericService<RackMapper> {
        let repository = GenericRepository::new(Arc::new(MemoryStore::<Rack>::new())).unwrap();
        GenericService::new(repository, RackMapper)
    }

    fn create(name: &str, units: Option<u16>) -> CreateRack {
        CreateRack {
            name: name.to_string(),
            units,
        }
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips_user_fields() {
        let service = service();
        let created = service.create(create("r1", Some(42))).await.unwrap();
        assert!(!created.id.is_nil());

        let fetched = service.get_by_id(created.id).await.unwrap();
        assert_eq!(fetched.name, "r1");
        assert_eq!(fetched.units, 42);
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_validation_errors_are_field_keyed() {
        let service = service();
        let error = service.create(create("  ", Some(1))).await.unwrap_err();
        assert_eq!(error.kind(), ServiceErrorKind::Validation);
        assert_eq!(error.field_errors().unwrap().get("name"), Some("must not be empty"));

        let error = service.create(create("r1", None)).await.unwrap_err();
        assert_eq!(error.field_errors().unwrap().get("units"), Some("is required"));
    }

    #[tokio::test]
    async fn test_duplicate_is_conflict() {
        let service = service();
        service.create(create("r1", Some(1))).await.unwrap();
        let error = service.create(create("r1", Some(2))).await.unwrap_err();
        assert_eq!(error.kind(), ServiceErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_update_applies_dto() {
        let service = service();
        let created = service.create(create("r1", Some(1))).await.unwrap();
        let updated = service.update(created.id, UpdateRack { units: 48 }).await.unwrap();
        assert_eq!(updated.units, 48);
        assert_eq!(updated.name, "r1");

        let error = service.update(created.id, UpdateRack { units: 0 }).await.unwrap_err();
        assert_eq!(error.kind(), ServiceErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_and_get_after_delete_are_not_found() {
        let service = service();
        let created = service.create(create("r1", Some(1))).await.unwrap();
        assert_eq!(service.delete(created.id).await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(service.delete(created.id).await.unwrap(), DeleteOutcome::AlreadyDeleted);

        let error = service.get_by_id(created.id).await.unwrap_err();
        assert_eq!(error.kind(), ServiceErrorKind::NotFound);
        let error = service.update(created.id, UpdateRack { units: 2 }).await.unwrap_err();
        assert_eq!(error.kind(), ServiceErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unknown_order_field_is_validation_error() {
        let service = service();
        let query = QueryDescriptor::new("", "colour", OrderDirection::Ascending, 1, 10);
        let error = service.get_list(query).await.unwrap_err();
        assert_eq!(error.kind(), ServiceErrorKind::Validation);
        assert!(error.field_errors().unwrap().get("orderBy").is_some());
    }

    #[tokio::test]
    async fn test_list_maps_responses() {
        let service = service();
        for name in ["r1", "r2", "r3"] {
            service.create(create(name, Some(1))).await.unwrap();
        }
        let query = QueryDescriptor::new("", "name", OrderDirection::Descending, 1, 2);
        let (items, total) = service.get_list(query).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(
            items.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
            vec!["r3", "r2"]
        );
    }
}
