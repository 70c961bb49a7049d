//! DTO-level services over the generic repository
//!
//! # Features
//!
//! - **Mapping**: [`Mapper`] declares create, update and response translation once per resource
//! - **Validation**: [`Validate`] and field-keyed [`ValidationErrors`]
//! - **Classification**: [`ServiceError`] is always one of NotFound, Validation, Conflict or Internal
//! - **Services**: [`GenericService`] and, for child resources, [`OwnedService`]

mod error;
mod generic;
mod mapper;
mod owned;
mod traits;
mod validation;

pub use error::{ServiceError, ServiceErrorKind, ServiceResult};
pub use generic::GenericService;
pub use mapper::Mapper;
pub use owned::{Owned, OwnedService};
pub use traits::EntityService;
pub use validation::{Validate, ValidationErrors};
