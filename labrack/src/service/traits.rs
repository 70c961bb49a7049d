//! Service contract shared by generic and resource-specific services

use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::error::ServiceResult;
use crate::repository::{DeleteOutcome, QueryDescriptor};

/// DTO-level CRUD operations for one resource
///
/// Implemented by [`GenericService`](super::GenericService) for plain
/// resources and by [`OwnedService`](super::OwnedService) for resources that
/// belong to a parent. Controllers depend on this trait only.
pub trait EntityService: Send + Sync + 'static {
    type Create: DeserializeOwned + Send + 'static;
    type Update: DeserializeOwned + Send + 'static;
    type Response: Serialize + Send + Sync + 'static;

    /// Kind name of the underlying entity
    fn kind(&self) -> &'static str;

    /// One page of responses plus the total match count
    fn get_list(
        &self,
        query: QueryDescriptor,
    ) -> impl Future<Output = ServiceResult<(Vec<Self::Response>, u64)>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ServiceResult<Self::Response>> + Send;

    fn create(
        &self,
        dto: Self::Create,
    ) -> impl Future<Output = ServiceResult<Self::Response>> + Send;

    fn update(
        &self,
        id: Uuid,
        dto: Self::Update,
    ) -> impl Future<Output = ServiceResult<Self::Response>> + Send;

    fn delete(&self, id: Uuid) -> impl Future<Output = ServiceResult<DeleteOutcome>> + Send;
}
