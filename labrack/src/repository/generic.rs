//! Generic repository
//!
//! [`GenericRepository<E>`] is the one CRUD and query implementation shared by
//! every resource. It resolves request input against the entity [`Schema`]
//! (search columns, order field) before anything reaches the [`Store`], so a
//! store only ever sees schema-known column paths.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use labrack::lab::{EthernetSwitch, Location};
//! use labrack::repository::{GenericRepository, MemoryStore, QueryDescriptor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let repository = GenericRepository::new(Arc::new(MemoryStore::<EthernetSwitch>::new())).unwrap();
//! let id = repository
//!     .insert(EthernetSwitch {
//!         name: "sw1".to_string(),
//!         management_address: "10.0.0.2".to_string(),
//!         model: "generic".to_string(),
//!         description: String::new(),
//!         location: Location::default(),
//!     })
//!     .await
//!     .unwrap();
//!
//! let (items, total) = repository.get_list(&QueryDescriptor::default(), None).await.unwrap();
//! assert_eq!(total, 1);
//! assert_eq!(items[0].id, id);
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::entity::{DeleteOutcome, Entity, Record};
use super::error::{RepositoryError, RepositoryOperation};
use super::filter::{Expr, QueryBuilder};
use super::query::QueryDescriptor;
use super::schema::{Schema, SchemaError};
use super::store::{OrderBy, Search, SelectQuery, Store};
use super::RepositoryResult;

/// Query parameter name reported when an order field is rejected
pub const ORDER_BY_PARAMETER: &str = "orderBy";

/// Parameter name reported when a builder filter names an unknown field
pub const FILTER_PARAMETER: &str = "filter";

/// CRUD and list operations over records of entity `E`
pub struct GenericRepository<E: Entity> {
    store: Arc<dyn Store<E>>,
    schema: Arc<Schema>,
}

impl<E: Entity> GenericRepository<E> {
    /// Build a repository over `store`, resolving the entity schema once
    pub fn new(store: Arc<dyn Store<E>>) -> Result<Self, SchemaError> {
        Ok(Self {
            store,
            schema: Arc::new(Schema::of::<E>()?),
        })
    }

    /// A repository over a fresh [`MemoryStore`](super::MemoryStore)
    pub fn in_memory() -> Result<Self, SchemaError> {
        Self::new(Arc::new(super::MemoryStore::<E>::new()))
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// A fresh, empty query builder for this entity
    pub fn new_query_builder(&self) -> QueryBuilder<E> {
        QueryBuilder::new()
    }

    /// List records matching `query` and the optional builder
    ///
    /// Returns the requested page and the number of matching records before
    /// pagination.
    #[instrument(skip(self, query, builder), fields(entity = E::KIND, page = query.page, page_size = query.page_size))]
    pub async fn get_list(
        &self,
        query: &QueryDescriptor,
        builder: Option<QueryBuilder<E>>,
    ) -> RepositoryResult<(Vec<Record<E>>, u64)> {
        let query = query.clone().normalized();
        let operation = RepositoryOperation::GetList;

        let column = self.schema.resolve_order(&query.order_by).map_err(|e| {
            RepositoryError::invalid_query(operation, ORDER_BY_PARAMETER, e.to_string())
                .with_entity_type(E::KIND)
        })?;

        let search = query.search_term().map(|term| Search {
            term: term.to_string(),
            columns: self.schema.searchable().to_vec(),
        });

        let (filter, include_deleted) = match builder {
            Some(builder) => (builder.filter().cloned(), builder.includes_deleted()),
            None => (None, false),
        };
        self.check_filter(operation, filter.as_ref())?;

        let select = SelectQuery {
            filter,
            search,
            order: OrderBy {
                column: column.clone(),
                direction: query.direction,
            },
            pagination: query.pagination(),
            include_deleted,
        };

        let (items, total) = self
            .store
            .select(select)
            .await
            .map_err(|e| e.with_operation(operation).with_entity_type(E::KIND))?;
        debug!(returned = items.len(), total, "listed records");
        Ok((items, total))
    }

    /// Fetch one live record, optionally narrowed by the builder
    #[instrument(skip(self, builder), fields(entity = E::KIND))]
    pub async fn get_by_id(
        &self,
        id: Uuid,
        builder: Option<QueryBuilder<E>>,
    ) -> RepositoryResult<Record<E>> {
        let (filter, include_deleted) = match &builder {
            Some(builder) => (builder.filter(), builder.includes_deleted()),
            None => (None, false),
        };
        self.check_filter(RepositoryOperation::GetById, filter)?;

        self.store
            .find(id, filter, include_deleted)
            .await
            .map_err(|e| e.with_operation(RepositoryOperation::GetById).with_entity(E::KIND, id.to_string()))?
            .ok_or_else(|| RepositoryError::not_found(E::KIND, id.to_string()))
    }

    /// Reject filters naming a field the schema does not know
    fn check_filter(&self, operation: RepositoryOperation, filter: Option<&Expr>) -> RepositoryResult<()> {
        let unknown = filter
            .into_iter()
            .flat_map(Expr::paths)
            .find(|path| self.schema.column(path).is_none());
        match unknown {
            Some(path) => Err(RepositoryError::invalid_query(
                operation,
                FILTER_PARAMETER,
                format!("unknown field '{}'", path),
            )
            .with_entity_type(E::KIND)),
            None => Ok(()),
        }
    }

    /// Insert a new entity, returning its assigned id
    #[instrument(skip(self, entity), fields(entity = E::KIND))]
    pub async fn insert(&self, entity: E) -> RepositoryResult<Uuid> {
        let record = Record::new(entity, Utc::now());
        let id = record.id;
        self.store.insert(record).await.map_err(|e| {
            e.with_operation(RepositoryOperation::Insert)
                .with_entity_type(E::KIND)
        })?;
        debug!(%id, "inserted record");
        Ok(id)
    }

    /// Replace the payload of a live record and refresh `updated_at`
    #[instrument(skip(self, record), fields(entity = E::KIND, id = %record.id))]
    pub async fn update(&self, record: &Record<E>) -> RepositoryResult<()> {
        let mut updated = record.clone();
        updated.updated_at = Utc::now();

        let applied = self.store.update(updated).await.map_err(|e| {
            e.with_operation(RepositoryOperation::Update)
                .with_entity_type(E::KIND)
        })?;
        if !applied {
            return Err(RepositoryError::not_found(E::KIND, record.id.to_string())
                .with_operation(RepositoryOperation::Update));
        }
        Ok(())
    }

    /// Soft delete a record; deleting twice reports [`DeleteOutcome::AlreadyDeleted`]
    #[instrument(skip(self), fields(entity = E::KIND))]
    pub async fn delete(&self, id: Uuid) -> RepositoryResult<DeleteOutcome> {
        let outcome = self
            .store
            .soft_delete(id, Utc::now())
            .await
            .map_err(|e| {
                e.with_operation(RepositoryOperation::Delete)
                    .with_entity(E::KIND, id.to_string())
            })?
            .ok_or_else(|| {
                RepositoryError::not_found(E::KIND, id.to_string())
                    .with_operation(RepositoryOperation::Delete)
            })?;
        debug!(?outcome, "soft deleted record");
        Ok(outcome)
    }
}

impl<E: Entity> Clone for GenericRepository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            schema: Arc::clone(&self.schema),
        }
    }
}

impl<E: Entity> fmt::Debug for GenericRepository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericRepository")
            .field("entity", &E::KIND)
            .finish_non_exhaustive()
    }
}
