//! DTO mapping contract

use serde::{de::DeserializeOwned, Serialize};

use super::validation::{Validate, ValidationErrors};
use crate::repository::{Entity, Record};

/// Translation between one resource's DTOs and its entity
///
/// Declared once per resource and handed to its service at construction.
/// Mapping that would lose required data reports [`ValidationErrors`]
/// instead of dropping fields.
pub trait Mapper: Send + Sync + 'static {
    type Entity: Entity;
    type Create: Validate + DeserializeOwned + Send + 'static;
    type Update: Validate + DeserializeOwned + Send + 'static;
    type Response: Serialize + Send + Sync + 'static;

    /// Build a new entity from a create DTO
    fn to_entity(&self, dto: Self::Create) -> Result<Self::Entity, ValidationErrors>;

    /// Apply an update DTO onto the stored entity
    fn apply_update(
        &self,
        entity: Self::Entity,
        dto: Self::Update,
    ) -> Result<Self::Entity, ValidationErrors>;

    /// Response DTO for a stored record
    fn to_response(&self, record: Record<Self::Entity>) -> Self::Response;
}
