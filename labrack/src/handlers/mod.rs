//! Handler abstractions for REST CRUD patterns
//!
//! This module provides handler-level abstractions for the standard REST
//! collection pattern (list, get, create, update, delete). It builds on the
//! service layer and adds HTTP-aware error handling, response types and an
//! axum router.
//!
//! # Features
//!
//! - **CRUD Handlers**: [`CollectionHandler`] trait, implemented for any service by [`GenericController`]
//! - **Pagination**: [`ListQuery`] and [`ListResponse`] for paginated list endpoints
//! - **Error Handling**: [`ApiError`] with HTTP status code mapping
//! - **Routing**: [`collection_router`] mounts a handler at `/` and `/{id}`
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use axum::Router;
//! use labrack::handlers::{collection_router, GenericController};
//! use labrack::lab::SwitchService;
//!
//! let switches = Arc::new(SwitchService::in_memory().unwrap());
//! let app: Router = Router::new().nest(
//!     "/api/v1/switches",
//!     collection_router(Arc::new(GenericController::new(switches))),
//! );
//! ```

mod error;
mod query;
mod response;
mod router;
mod traits;

pub use error::{ApiError, ApiErrorKind, ApiOperation};
pub use query::ListQuery;
pub use response::ListResponse;
pub use router::{collection_router, IdPath};
pub use traits::{CollectionHandler, GenericController};
