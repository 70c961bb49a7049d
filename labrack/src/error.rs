//! Crate-level error type for startup and wiring
//!
//! Request-time failures have their own types ([`RepositoryError`],
//! [`ServiceError`](crate::service::ServiceError),
//! [`ApiError`](crate::handlers::ApiError)); this one covers loading
//! configuration, connecting to the database and building stores.

use thiserror::Error;

use crate::repository::{RepositoryError, SchemaError};

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Configuration loaded but is unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// An entity declares an inconsistent schema
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(Box<sqlx::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Database(Box::new(err))
    }
}
