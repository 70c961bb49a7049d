//! Persistence seam
//!
//! A [`Store`] executes already-resolved queries. Column names handed to a
//! store always come from the entity [`Schema`](super::Schema), never from
//! request input, so implementations may trust them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::entity::{DeleteOutcome, Entity, Record};
use super::filter::Expr;
use super::query::{OrderDirection, Pagination};
use super::schema::Column;
use super::RepositoryResult;

/// Case-insensitive substring search over a fixed column set
#[derive(Debug, Clone)]
pub struct Search {
    pub term: String,
    pub columns: Vec<Column>,
}

/// Resolved ordering
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: Column,
    pub direction: OrderDirection,
}

/// A fully resolved list query
#[derive(Debug, Clone)]
pub struct SelectQuery {
    pub filter: Option<Expr>,
    pub search: Option<Search>,
    pub order: OrderBy,
    pub pagination: Pagination,
    pub include_deleted: bool,
}

/// Storage backend for records of one entity type
#[async_trait]
pub trait Store<E: Entity>: Send + Sync {
    /// Matching records for the requested page, plus the total match count
    /// before pagination
    async fn select(&self, query: SelectQuery) -> RepositoryResult<(Vec<Record<E>>, u64)>;

    /// Record with the given id that also satisfies `filter`
    async fn find(
        &self,
        id: Uuid,
        filter: Option<&Expr>,
        include_deleted: bool,
    ) -> RepositoryResult<Option<Record<E>>>;

    /// Persist a new record, enforcing the entity's uniqueness keys
    async fn insert(&self, record: Record<E>) -> RepositoryResult<()>;

    /// Replace a live record's payload and `updated_at`; `false` when no live
    /// record has that id
    async fn update(&self, record: Record<E>) -> RepositoryResult<bool>;

    /// Stamp `deleted_at`; `None` when the id was never stored
    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>)
        -> RepositoryResult<Option<DeleteOutcome>>;
}
