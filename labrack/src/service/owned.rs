//! Services for resources owned by a parent entity
//!
//! A switch port belongs to a switch, a VLAN is defined on a switch. The
//! owner must exist when the child is created, the owner reference never
//! changes afterwards, and lookups can be scoped to one owner.

use std::fmt;

use tracing::{instrument, warn};
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use super::generic::GenericService;
use super::mapper::Mapper;
use super::traits::EntityService;
use super::validation::{Validate, ValidationErrors};
use crate::repository::{
    DeleteOutcome, Entity, FieldRef, GenericRepository, QueryDescriptor,
};

/// An entity that references its owner by id
pub trait Owned: Entity {
    /// The owning entity
    type Owner: Entity;

    /// Column holding the owner id
    const OWNER: FieldRef<Self, Uuid>;

    /// Wire name of the owner field, used in validation errors
    const OWNER_FIELD: &'static str;

    fn owner_id(&self) -> Uuid;
}

/// [`GenericService`] plus owner existence, immutability and scoping
pub struct OwnedService<M>
where
    M: Mapper,
    M::Entity: Owned,
{
    inner: GenericService<M>,
    owners: GenericRepository<<M::Entity as Owned>::Owner>,
}

impl<M> OwnedService<M>
where
    M: Mapper,
    M::Entity: Owned,
{
    pub fn new(
        inner: GenericService<M>,
        owners: GenericRepository<<M::Entity as Owned>::Owner>,
    ) -> Self {
        Self { inner, owners }
    }

    pub fn inner(&self) -> &GenericService<M> {
        &self.inner
    }

    /// Fetch a child only if it belongs to `owner_id`
    #[instrument(skip(self), fields(entity = M::Entity::KIND))]
    pub async fn get_scoped(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<M::Response> {
        let scope = self
            .inner
            .repository()
            .new_query_builder()
            .eq(<M::Entity as Owned>::OWNER, owner_id);
        self.inner.get_by_id_scoped(id, Some(scope)).await
    }

    /// List the children of one owner
    pub async fn list_for_owner(
        &self,
        owner_id: Uuid,
        query: &QueryDescriptor,
    ) -> ServiceResult<(Vec<M::Response>, u64)> {
        self.ensure_owner(owner_id).await?;
        let scope = self
            .inner
            .repository()
            .new_query_builder()
            .eq(<M::Entity as Owned>::OWNER, owner_id);
        self.inner.get_list_scoped(query, Some(scope)).await
    }

    async fn ensure_owner(&self, owner_id: Uuid) -> ServiceResult<()> {
        let owner_kind = <<M::Entity as Owned>::Owner as Entity>::KIND;
        match self.owners.get_by_id(owner_id, None).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                warn!(owner = owner_kind, %owner_id, "owner does not exist");
                Err(ServiceError::not_found(owner_kind, owner_id))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<M> EntityService for OwnedService<M>
where
    M: Mapper,
    M::Entity: Owned,
{
    type Create = M::Create;
    type Update = M::Update;
    type Response = M::Response;

    fn kind(&self) -> &'static str {
        M::Entity::KIND
    }

    async fn get_list(&self, query: QueryDescriptor) -> ServiceResult<(Vec<M::Response>, u64)> {
        self.inner.get_list(query).await
    }

    async fn get_by_id(&self, id: Uuid) -> ServiceResult<M::Response> {
        self.inner.get_by_id(id).await
    }

    async fn create(&self, dto: M::Create) -> ServiceResult<M::Response> {
        dto.validate()?;
        let entity = self.inner.mapper().to_entity(dto)?;
        self.ensure_owner(entity.owner_id()).await?;
        self.inner.insert_entity(entity).await
    }

    async fn update(&self, id: Uuid, dto: M::Update) -> ServiceResult<M::Response> {
        self.inner
            .update_checked(id, dto, |before, after| {
                if before.owner_id() == after.owner_id() {
                    Ok(())
                } else {
                    Err(ValidationErrors::single(
                        <M::Entity as Owned>::OWNER_FIELD,
                        "cannot be changed",
                    ))
                }
            })
            .await
    }

    async fn delete(&self, id: Uuid) -> ServiceResult<DeleteOutcome> {
        self.inner.delete(id).await
    }
}

impl<M> fmt::Debug for OwnedService<M>
where
    M: Mapper,
    M::Entity: Owned,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedService")
            .field("entity", &M::Entity::KIND)
            .field("owner", &<<M::Entity as Owned>::Owner as Entity>::KIND)
            .finish()
    }
}
