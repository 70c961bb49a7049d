//! Handler trait definitions for REST CRUD patterns
//!
//! [`CollectionHandler`] uses RPITIT (Return Position Impl Trait In Traits)
//! for async methods without `async_trait`. [`GenericController`] implements
//! it for any [`EntityService`], so a resource only needs a service to be
//! served over HTTP.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::error::{ApiError, ApiOperation};
use super::query::ListQuery;
use super::response::ListResponse;
use crate::repository::DeleteOutcome;
use crate::service::EntityService;

/// Standard REST CRUD handler trait
pub trait CollectionHandler: Send + Sync + 'static {
    /// Body of a create request
    type Create: DeserializeOwned + Send + 'static;
    /// Body of an update request
    type Update: DeserializeOwned + Send + 'static;
    /// Representation returned for one item
    type Response: Serialize + Send + Sync + 'static;

    /// List one page of items matching the query
    fn list(
        &self,
        query: ListQuery,
    ) -> impl Future<Output = Result<ListResponse<Self::Response>, ApiError>> + Send;

    /// Get a single item by its identifier
    ///
    /// # Errors
    ///
    /// Returns `ApiError` with `NotFound` kind if the item doesn't exist.
    fn get(&self, id: Uuid) -> impl Future<Output = Result<Self::Response, ApiError>> + Send;

    /// Create a new item
    ///
    /// # Errors
    ///
    /// Returns `ApiError` with:
    /// - `ValidationFailed` if the input data is invalid
    /// - `Conflict` if a uniqueness key is already taken
    /// - `NotFound` if a referenced owner doesn't exist
    fn create(
        &self,
        dto: Self::Create,
    ) -> impl Future<Output = Result<Self::Response, ApiError>> + Send;

    /// Update an existing item
    fn update(
        &self,
        id: Uuid,
        dto: Self::Update,
    ) -> impl Future<Output = Result<Self::Response, ApiError>> + Send;

    /// Soft delete an item; deleting twice is not an error
    fn delete(&self, id: Uuid) -> impl Future<Output = Result<DeleteOutcome, ApiError>> + Send;
}

/// [`CollectionHandler`] over an [`EntityService`]
///
/// Holds only a shared reference to the service.
pub struct GenericController<S> {
    service: Arc<S>,
}

impl<S: EntityService> GenericController<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }
}

impl<S: EntityService> CollectionHandler for GenericController<S> {
    type Create = S::Create;
    type Update = S::Update;
    type Response = S::Response;

    #[instrument(skip(self), fields(entity = self.service.kind()))]
    async fn list(&self, query: ListQuery) -> Result<ListResponse<S::Response>, ApiError> {
        let descriptor = query.descriptor();
        let (items, total) = self
            .service
            .get_list(descriptor.clone())
            .await
            .map_err(|e| ApiError::from_service(ApiOperation::List, e))?;
        debug!(count = items.len(), total, "listed");
        Ok(ListResponse::new(items, total, &descriptor))
    }

    async fn get(&self, id: Uuid) -> Result<S::Response, ApiError> {
        self.service
            .get_by_id(id)
            .await
            .map_err(|e| ApiError::from_service(ApiOperation::Get, e))
    }

    async fn create(&self, dto: S::Create) -> Result<S::Response, ApiError> {
        self.service
            .create(dto)
            .await
            .map_err(|e| ApiError::from_service(ApiOperation::Create, e))
    }

    async fn update(&self, id: Uuid, dto: S::Update) -> Result<S::Response, ApiError> {
        self.service
            .update(id, dto)
            .await
            .map_err(|e| ApiError::from_service(ApiOperation::Update, e))
    }

    async fn delete(&self, id: Uuid) -> Result<DeleteOutcome, ApiError> {
        self.service
            .delete(id)
            .await
            .map_err(|e| ApiError::from_service(ApiOperation::Delete, e))
    }
}

impl<S> Clone for GenericController<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<S: EntityService> fmt::Debug for GenericController<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericController")
            .field("entity", &self.service.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::ApiErrorKind;
    use crate::lab::{CreateSwitch, Location, SwitchService, UpdateSwitch};
    use crate::repository::OrderDirection;

    fn controller() -> GenericController<SwitchService> {
        GenericController::new(Arc::new(SwitchService::in_memory().unwrap()))
    }

    fn create_dto(name: &str) -> CreateSwitch {
        CreateSwitch {
            name: name.to_string(),
            management_address: "10.0.0.2".to_string(),
            model: "cisco-ios".to_string(),
            description: String::new(),
            location: Location::default(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let controller = controller();
        let created = controller.create(create_dto("core-1")).await.unwrap();
        let fetched = controller.get(created.id).await.unwrap();
        assert_eq!(fetched.name, "core-1");
    }

    #[tokio::test]
    async fn test_list_pages_and_totals() {
        let controller = controller();
        for n in 0..12 {
            controller
                .create(create_dto(&format!("edge-{:02}", n)))
                .await
                .unwrap();
        }
        let page = controller
            .list(
                ListQuery::new()
                    .with_order("name", OrderDirection::Descending)
                    .with_page(2, 5),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 12);
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 5);
        let names: Vec<&str> = page.items.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["edge-06", "edge-05", "edge-04", "edge-03", "edge-02"]);
    }

    #[tokio::test]
    async fn test_unknown_order_field_is_validation_error() {
        let error = controller()
            .list(ListQuery::new().with_order("colour", OrderDirection::Ascending))
            .await
            .unwrap_err();
        assert_eq!(error.kind, ApiErrorKind::ValidationFailed);
        assert_eq!(error.operation, ApiOperation::List);
        assert!(error.fields.as_ref().and_then(|f| f.get("orderBy")).is_some());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let error = controller()
            .update(
                Uuid::new_v4(),
                UpdateSwitch {
                    name: "ghost".to_string(),
                    management_address: "10.0.0.9".to_string(),
                    model: "cisco-ios".to_string(),
                    description: String::new(),
                    location: Location::default(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(error.kind, ApiErrorKind::NotFound);
        assert_eq!(error.operation, ApiOperation::Update);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let controller = controller();
        let created = controller.create(create_dto("core-2")).await.unwrap();
        assert_eq!(controller.delete(created.id).await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(
            controller.delete(created.id).await.unwrap(),
            DeleteOutcome::AlreadyDeleted
        );
        let error = controller.get(created.id).await.unwrap_err();
        assert_eq!(error.kind, ApiErrorKind::NotFound);
    }
}
