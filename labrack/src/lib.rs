//! # labrack
//!
//! Inventory and power control for lab infrastructure: Ethernet switches,
//! their ports and VLANs, device network interfaces, and devices powered
//! over PoE.
//!
//! ## Features
//!
//! - **Generic entity access**: one repository, service and controller for every resource
//! - **Soft deletion**: deleted records stay stored and disappear from reads
//! - **Request binding**: declarative query/path/header binding into typed structs
//! - **Power control**: device → interface → switch port → PoE capability, with history
//! - **Stores**: in-memory, or PostgreSQL with the `database` feature
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use labrack::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let services = LabServices::in_memory(Arc::new(SimulatedProvider::new()))?;
//!     let app = router(services);
//!
//!     let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.service.port)).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod binder;
pub mod config;
#[cfg(feature = "database")]
pub mod database;
pub mod error;
pub mod handlers;
pub mod lab;
pub mod observability;
pub mod power;
pub mod repository;
pub mod service;

pub mod prelude {
    pub use crate::config::{Config, DatabaseConfig, ServiceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::observability::init_tracing;

    #[cfg(feature = "database")]
    pub use crate::database::create_pool;

    pub use crate::binder::{Bindable, Bound, FieldBinding};
    pub use crate::handlers::{
        collection_router, ApiError, ApiErrorKind, CollectionHandler, GenericController,
        ListQuery, ListResponse,
    };
    pub use crate::lab::{router, LabServices};
    pub use crate::power::{
        CapabilityProvider, PoeCapability, PowerDriver, PowerError, PowerState,
        SimulatedProvider, StaticCapabilityProvider,
    };
    pub use crate::repository::{
        GenericRepository, MemoryStore, OrderDirection, QueryDescriptor, RepositoryError,
    };
    pub use crate::service::{EntityService, ServiceError};

    #[cfg(feature = "database")]
    pub use crate::repository::PgStore;
}
