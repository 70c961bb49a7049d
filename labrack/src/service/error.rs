//! Service error classification
//!
//! Every failure leaving a service is one of four classes. Callers choose a
//! response shape from [`ServiceError::kind`] alone; internal errors keep the
//! repository error as their source for logging but render an opaque message.

use std::fmt;

use thiserror::Error;

use super::validation::ValidationErrors;
use crate::repository::{RepositoryError, RepositoryErrorKind};

/// Machine-inspectable error class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    NotFound,
    Validation,
    Conflict,
    Internal,
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Validation => write!(f, "validation"),
            Self::Conflict => write!(f, "conflict"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Classified service failure
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The entity, or an entity it references, does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    /// Input failed validation; one message per field
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// A uniqueness key is already taken
    #[error("{entity} already exists: {key}")]
    Conflict { entity: String, key: String },

    /// Storage or unexpected failure; details stay in `source`
    #[error("internal error")]
    Internal {
        #[source]
        source: RepositoryError,
    },
}

impl ServiceError {
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ServiceErrorKind {
        match self {
            Self::NotFound { .. } => ServiceErrorKind::NotFound,
            Self::Validation(_) => ServiceErrorKind::Validation,
            Self::Conflict { .. } => ServiceErrorKind::Conflict,
            Self::Internal { .. } => ServiceErrorKind::Internal,
        }
    }

    /// Field errors of a validation failure
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(error: RepositoryError) -> Self {
        let entity = error.entity_type.clone().unwrap_or_default();
        match error.kind {
            RepositoryErrorKind::NotFound => Self::NotFound {
                entity,
                id: error.entity_id.unwrap_or_default(),
            },
            RepositoryErrorKind::AlreadyExists => Self::Conflict {
                entity,
                key: error.entity_id.unwrap_or_default(),
            },
            RepositoryErrorKind::InvalidQuery => Self::Validation(ValidationErrors::single(
                error.parameter.unwrap_or_else(|| "query".to_string()),
                error.message,
            )),
            RepositoryErrorKind::ConnectionFailed
            | RepositoryErrorKind::DatabaseError
            | RepositoryErrorKind::SerializationError => Self::Internal { source: error },
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
