//! Repository error types
//!
//! Structured errors for repository operations. Every error carries the
//! operation that failed and, where known, the entity kind and identifier,
//! so callers can log a precise context chain without ever seeing
//! storage-engine specific detail.
//!
//! # Example
//!
//! ```rust
//! use labrack::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("ethernet_switch", "5d0c2d1e");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert!(error.entity_id.is_some());
//! ```

use std::fmt;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Listing entities with search, filter, ordering and paging
    GetList,
    /// Fetching a single entity by identifier
    GetById,
    /// Inserting a new entity
    Insert,
    /// Updating an existing entity
    Update,
    /// Soft deleting an entity
    Delete,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetList => write!(f, "get_list"),
            Self::GetById => write!(f, "get_by_id"),
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Entity was not found (or was soft-deleted)
    NotFound,
    /// A uniqueness key is already taken by a live entity
    AlreadyExists,
    /// The query asked for something the schema cannot answer (unknown order field, ...)
    InvalidQuery,
    /// Failed to reach the store
    ConnectionFailed,
    /// Underlying store error
    DatabaseError,
    /// Entity document could not be encoded or decoded
    SerializationError,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::InvalidQuery => write!(f, "invalid_query"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::SerializationError => write!(f, "serialization_error"),
        }
    }
}

/// Structured repository error with operation context
///
/// # Example
///
/// ```rust
/// use labrack::repository::{RepositoryError, RepositoryOperation};
///
/// let error = RepositoryError::database_error(RepositoryOperation::Insert, "pool closed")
///     .with_entity("vlan", "0192f0c4");
/// assert_eq!(
///     error.to_string(),
///     "Repository database_error error during insert: pool closed [vlan: 0192f0c4]"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The kind of entity involved (e.g. "ethernet_switch")
    pub entity_type: Option<String>,
    /// The identifier (or uniqueness key) of the entity involved
    pub entity_id: Option<String>,
    /// The query parameter responsible for an `InvalidQuery` error
    pub parameter: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
            parameter: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::GetById,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create an "already exists" error naming the violated uniqueness key
    pub fn already_exists(entity_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Insert,
            RepositoryErrorKind::AlreadyExists,
            "Entity already exists",
        )
        .with_entity(entity_type, key)
    }

    /// Create an invalid query error tied to the offending query parameter
    pub fn invalid_query(
        operation: RepositoryOperation,
        parameter: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new(operation, RepositoryErrorKind::InvalidQuery, message);
        error.parameter = Some(parameter.into());
        error
    }

    /// Create a connection failed error
    pub fn connection_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ConnectionFailed, message)
    }

    /// Create a database error
    pub fn database_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::DatabaseError, message)
    }

    /// Create a serialization error
    pub fn serialization_error(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::SerializationError, message)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Add the entity kind only, keeping any identifier already recorded
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// True for `NotFound` errors
    pub fn is_not_found(&self) -> bool {
        self.kind == RepositoryErrorKind::NotFound
    }

    /// True for uniqueness violations
    pub fn is_conflict(&self) -> bool {
        self.kind == RepositoryErrorKind::AlreadyExists
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, RepositoryErrorKind::ConnectionFailed)
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        match (&self.entity_type, &self.entity_id) {
            (Some(entity_type), Some(entity_id)) => write!(f, " [{}: {}]", entity_type, entity_id)?,
            (Some(entity_type), None) => write!(f, " [{}]", entity_type)?,
            _ => {}
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

#[cfg(feature = "database")]
impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        // Operation is filled in by the caller via `with_operation`.
        let operation = RepositoryOperation::GetList;
        match &error {
            sqlx::Error::RowNotFound => Self::new(
                operation,
                RepositoryErrorKind::NotFound,
                "Entity not found",
            ),
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::new(
                operation,
                RepositoryErrorKind::AlreadyExists,
                "Entity already exists",
            ),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::connection_failed(operation, "Store unavailable")
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::serialization_error(operation, "Failed to decode stored entity")
            }
            _ => {
                tracing::debug!(error = %error, "unclassified store error");
                Self::database_error(operation, "Store query failed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_operation_display() {
        assert_eq!(format!("{}", RepositoryOperation::GetList), "get_list");
        assert_eq!(format!("{}", RepositoryOperation::GetById), "get_by_id");
        assert_eq!(format!("{}", RepositoryOperation::Insert), "insert");
        assert_eq!(format!("{}", RepositoryOperation::Update), "update");
        assert_eq!(format!("{}", RepositoryOperation::Delete), "delete");
    }

    #[test]
    fn test_not_found_convenience() {
        let error = RepositoryError::not_found("ethernet_switch", "123");
        assert_eq!(error.operation, RepositoryOperation::GetById);
        assert_eq!(error.kind, RepositoryErrorKind::NotFound);
        assert_eq!(error.entity_type.as_deref(), Some("ethernet_switch"));
        assert_eq!(error.entity_id.as_deref(), Some("123"));
        assert!(error.is_not_found());
        assert!(!error.is_conflict());
    }

    #[test]
    fn test_already_exists_is_conflict() {
        let error = RepositoryError::already_exists("vlan", "tag=10");
        assert_eq!(error.operation, RepositoryOperation::Insert);
        assert!(error.is_conflict());
        assert!(!error.is_retriable());
    }

    #[test]
    fn test_invalid_query_records_parameter() {
        let error = RepositoryError::invalid_query(
            RepositoryOperation::GetList,
            "orderBy",
            "unknown field 'colour'",
        );
        assert_eq!(error.kind, RepositoryErrorKind::InvalidQuery);
        assert_eq!(error.parameter.as_deref(), Some("orderBy"));
    }

    #[test]
    fn test_with_operation_and_entity() {
        let error = RepositoryError::database_error(RepositoryOperation::GetList, "boom")
            .with_operation(RepositoryOperation::Update)
            .with_entity("switch_port", "abc");
        assert_eq!(error.operation, RepositoryOperation::Update);
        assert_eq!(error.entity_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_display_with_entity_type_only() {
        let error = RepositoryError::connection_failed(RepositoryOperation::Insert, "refused")
            .with_entity_type("vlan");
        assert!(error.is_retriable());
        assert_eq!(
            error.to_string(),
            "Repository connection_failed error during insert: refused [vlan]"
        );
    }

    #[test]
    fn test_display_without_entity() {
        let error = RepositoryError::serialization_error(RepositoryOperation::GetById, "bad json");
        let display = error.to_string();
        assert!(display.contains("serialization_error"));
        assert!(display.contains("get_by_id"));
        assert!(!display.contains('['));
    }
}
