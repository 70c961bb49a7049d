//! Declarative request binding
//!
//! Structures declare, once, which request value feeds each field: the
//! source (query string, path parameter or header), the key, whether the
//! field is required, and a typed setter. The value kind is taken from the
//! setter's type, so only the scalar kinds in [`ScalarKind`] can be bound.
//!
//! # Features
//!
//! - **Plans**: [`BindingPlan`] validates a declaration once and is cached per type
//! - **Defaults**: missing values keep whatever [`Default`] put in the field
//! - **Nesting**: [`nested`] lifts a child structure's bindings onto its parent
//! - **Axum**: [`Bound`] runs the plan as an extractor, rejecting with [`ApiError`](crate::handlers::ApiError)

mod extract;
mod kind;
mod plan;
mod request;

pub use extract::Bound;
pub use kind::{BindScalar, ParseScalarError, ScalarKind, ScalarValue};
pub use plan::{nested, BindError, Bindable, BindingPlan, FieldBinding};
pub use request::{RawRequest, RequestParts, Source};
