//! Entity records
//!
//! Every persisted resource is a payload type implementing [`Entity`],
//! wrapped in a [`Record`] that carries identity and lifecycle timestamps.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use super::schema::Column;

/// A uniqueness key: the set of columns whose combined values must be unique
/// among live (not soft-deleted) records.
pub type UniqueKey = &'static [&'static str];

/// A persisted resource payload
///
/// The declared columns are checked against the serialized `Default` value
/// when a repository is built, so every field needs a column.
///
/// # Example
///
/// ```rust
/// use labrack::repository::{Column, Entity};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Rack {
///     name: String,
///     units: u16,
/// }
///
/// impl Entity for Rack {
///     const KIND: &'static str = "rack";
///
///     fn columns() -> Vec<Column> {
///         vec![Column::string("name"), Column::integer("units")]
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static {
    /// Stable kind name, used in errors, logs and as the table name
    const KIND: &'static str;

    /// Columns of the payload, nested structures flattened to dotted paths
    fn columns() -> Vec<Column>;

    /// Uniqueness keys enforced on insert and update
    fn unique_keys() -> &'static [UniqueKey] {
        &[]
    }
}

/// An entity payload together with its identity and lifecycle timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<E> {
    /// Server-assigned identifier
    pub id: Uuid,
    /// When the record was inserted
    pub created_at: DateTime<Utc>,
    /// When the record was last updated
    pub updated_at: DateTime<Utc>,
    /// Soft-delete stamp, `None` while the record is live
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Resource payload
    pub data: E,
}

impl<E> Record<E> {
    /// Create a fresh, live record stamped with `now`
    pub fn new(data: E, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            data,
        }
    }

    /// Whether the record has been soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Map the payload, keeping identity and timestamps
    pub fn map<U, F>(self, f: F) -> Record<U>
    where
        F: FnOnce(E) -> U,
    {
        Record {
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            data: f(self.data),
        }
    }
}

/// Result of a soft delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The record was live and is now stamped as deleted
    Deleted,
    /// The record was already deleted; nothing changed
    AlreadyDeleted,
}
