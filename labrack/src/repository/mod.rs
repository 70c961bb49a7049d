//! Generic repository over soft-deletable entity records
//!
//! This module provides the one CRUD and query implementation every lab
//! resource is served through.
//!
//! # Features
//!
//! - **Generic CRUD**: [`GenericRepository`] for list, get, insert, update and soft delete
//! - **Schema introspection**: [`Schema`] decides searchable and orderable columns once per entity
//! - **Typed filters**: [`QueryBuilder`] and [`FieldRef`] build a closed [`Expr`] tree
//! - **Paging**: [`QueryDescriptor`] normalizes search, order and page parameters
//! - **Stores**: [`MemoryStore`] and, with the `database` feature, `PgStore`
//!
//! # Example
//!
//! ```rust,ignore
//! use labrack::lab::EthernetSwitchPort;
//! use labrack::repository::{GenericRepository, PgStore, QueryDescriptor};
//!
//! let store = PgStore::<EthernetSwitchPort>::new(pool);
//! store.ensure_schema().await?;
//! let ports = GenericRepository::new(Arc::new(store))?;
//!
//! let on_switch = ports
//!     .new_query_builder()
//!     .eq(EthernetSwitchPort::SWITCH_ID, switch_id);
//! let (items, total) = ports.get_list(&QueryDescriptor::default(), Some(on_switch)).await?;
//! ```

mod entity;
mod error;
mod filter;
mod generic;
mod memory;
#[cfg(feature = "database")]
mod postgres;
mod query;
mod schema;
mod store;

pub use entity::{DeleteOutcome, Entity, Record, UniqueKey};
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use filter::{Expr, FieldRef, Filter, FilterValue, QueryBuilder};
pub use generic::{GenericRepository, FILTER_PARAMETER, ORDER_BY_PARAMETER};
pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use postgres::PgStore;
pub use query::{
    OrderDirection, Pagination, QueryDescriptor, DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use schema::{
    Column, ColumnKind, OrderFieldError, Schema, SchemaError, DEFAULT_ORDER_COLUMN, META_COLUMNS,
};
pub use store::{OrderBy, Search, SelectQuery, Store};

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;
