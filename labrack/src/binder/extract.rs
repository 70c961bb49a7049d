//! Axum extractor for bindable structures

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Query, RawPathParams},
    http::request::Parts,
};

use super::plan::Bindable;
use super::request::{RawRequest, Source};
use crate::handlers::ApiError;

/// Extracts `T` by running its binding plan over the request parts
///
/// Only sources the plan references are read, so a structure bound purely
/// from the query string works on routes without path parameters.
///
/// ```rust,ignore
/// async fn list_ports(Bound(query): Bound<ListQuery>) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Bound<T>(pub T);

impl<S, T> FromRequestParts<S> for Bound<T>
where
    S: Send + Sync,
    T: Bindable,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let plan = T::plan()?;
        let mut request = RawRequest::new();

        if plan.references(Source::Query) {
            let Query(query) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            request.set_query(query);
        }

        if plan.references(Source::Path) {
            let params = RawPathParams::from_request_parts(parts, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            for (key, value) in &params {
                request.insert_path(key, value);
            }
        }

        if plan.references(Source::Header) {
            for (name, value) in &parts.headers {
                if let Ok(value) = value.to_str() {
                    request.insert_header(name.as_str(), value);
                }
            }
        }

        let mut target = T::default();
        plan.bind(&mut target, &request)?;
        Ok(Bound(target))
    }
}
