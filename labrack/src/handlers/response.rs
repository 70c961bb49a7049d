//! Response types for REST handlers
//!
//! Single items are returned as their response DTO directly; lists are
//! wrapped in [`ListResponse`].
//!
//! # Example
//!
//! ```rust
//! use labrack::handlers::ListResponse;
//! use labrack::repository::QueryDescriptor;
//!
//! let query = QueryDescriptor::default();
//! let response = ListResponse::new(vec!["sw1", "sw2"], 12, &query);
//!
//! let json = serde_json::to_value(&response).unwrap();
//! assert_eq!(json["total"], 12);
//! assert_eq!(json["pageSize"], 10);
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::repository::QueryDescriptor;

/// One page of a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Number of matching items across all pages
    pub total: u64,
    /// 1-indexed page number actually served
    pub page: u64,
    /// Page size actually applied
    pub page_size: u64,
}

impl<T> ListResponse<T> {
    pub fn new(items: Vec<T>, total: u64, query: &QueryDescriptor) -> Self {
        Self {
            items,
            total,
            page: query.page,
            page_size: query.page_size,
        }
    }

    /// Number of pages needed for `total` items
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size)
    }

    pub fn map<U, F>(self, f: F) -> ListResponse<U>
    where
        F: FnMut(T) -> U,
    {
        ListResponse {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

impl<T: Serialize> IntoResponse for ListResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_response_echoes_normalized_paging() {
        let query = QueryDescriptor::new("", "", Default::default(), 0, 500);
        let response = ListResponse::new(vec![1, 2, 3], 250, &query);
        assert_eq!(response.page, 1);
        assert_eq!(response.page_size, 100);
        assert_eq!(response.total_pages(), 3);
    }

    #[test]
    fn test_serializes_camel_case() {
        let response = ListResponse::new(Vec::<u8>::new(), 0, &QueryDescriptor::default());
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"items":[],"total":0,"page":1,"pageSize":10}"#);
    }

    #[test]
    fn test_map_keeps_paging() {
        let response = ListResponse::new(vec![1, 2], 7, &QueryDescriptor::default());
        let mapped = response.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.total, 7);
    }
}
