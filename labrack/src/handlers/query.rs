//! Query parameters for list endpoints
//!
//! [`ListQuery`] is bound from the query string through the binder, so
//! unparsable paging values fall back to their defaults instead of failing
//! the request.
//!
//! # Example
//!
//! ```rust
//! use labrack::binder::{Bindable, RawRequest};
//! use labrack::handlers::ListQuery;
//! use labrack::repository::OrderDirection;
//!
//! let request = RawRequest::new()
//!     .with_query("search", "core")
//!     .with_query("orderBy", "name")
//!     .with_query("orderDirection", "DESC")
//!     .with_query("page", "0")
//!     .with_query("pageSize", "abc");
//!
//! let descriptor = ListQuery::bind(&request).unwrap().descriptor();
//! assert_eq!(descriptor.search, "core");
//! assert_eq!(descriptor.direction, OrderDirection::Descending);
//! assert_eq!(descriptor.page, 1);
//! assert_eq!(descriptor.page_size, 10);
//! ```

use crate::binder::{Bindable, FieldBinding};
use crate::repository::{OrderDirection, QueryDescriptor, DEFAULT_PAGE, DEFAULT_PAGE_SIZE};

/// Raw list parameters as received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Free-text search term
    pub search: String,
    /// Field to order by
    pub order_by: String,
    /// `asc` or `desc`
    pub order_direction: String,
    /// 1-indexed page number; values below 1 are corrected
    pub page: i64,
    /// Items per page; values below 1 are corrected
    pub page_size: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            order_by: String::new(),
            order_direction: String::new(),
            page: DEFAULT_PAGE as i64,
            page_size: DEFAULT_PAGE_SIZE as i64,
        }
    }
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    #[must_use]
    pub fn with_order(mut self, order_by: impl Into<String>, direction: OrderDirection) -> Self {
        self.order_by = order_by.into();
        self.order_direction = direction.to_string();
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: i64, page_size: i64) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Normalized descriptor for the repository
    pub fn descriptor(&self) -> QueryDescriptor {
        QueryDescriptor::new(
            self.search.as_str(),
            self.order_by.as_str(),
            OrderDirection::parse(&self.order_direction),
            self.page,
            self.page_size,
        )
    }
}

impl Bindable for ListQuery {
    fn bindings() -> Vec<FieldBinding<Self>> {
        vec![
            FieldBinding::query("search", "search", |q: &mut Self, v| q.search = v),
            FieldBinding::query("order_by", "orderBy", |q: &mut Self, v| q.order_by = v),
            FieldBinding::query("order_direction", "orderDirection", |q: &mut Self, v| {
                q.order_direction = v
            }),
            FieldBinding::query("page", "page", |q: &mut Self, v| q.page = v),
            FieldBinding::query("page_size", "pageSize", |q: &mut Self, v| q.page_size = v),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::RawRequest;

    #[test]
    fn test_list_query_default() {
        let descriptor = ListQuery::default().descriptor();
        assert_eq!(descriptor.page, 1);
        assert_eq!(descriptor.page_size, 10);
        assert_eq!(descriptor.direction, OrderDirection::Ascending);
        assert!(descriptor.search_term().is_none());
    }

    #[test]
    fn test_page_below_one_is_corrected() {
        let descriptor = ListQuery::new().with_page(-3, 0).descriptor();
        assert_eq!(descriptor.page, 1);
        assert_eq!(descriptor.page_size, 10);
    }

    #[test]
    fn test_page_size_is_capped() {
        let descriptor = ListQuery::new().with_page(2, 5000).descriptor();
        assert_eq!(descriptor.page, 2);
        assert_eq!(descriptor.page_size, 100);
    }

    #[test]
    fn test_binds_every_parameter() {
        let request = RawRequest::new()
            .with_query("search", "edge")
            .with_query("orderBy", "location.rack")
            .with_query("orderDirection", "desc")
            .with_query("page", "3")
            .with_query("pageSize", "25");
        let query = ListQuery::bind(&request).unwrap();
        assert_eq!(
            query,
            ListQuery::new()
                .with_search("edge")
                .with_order("location.rack", OrderDirection::Descending)
                .with_page(3, 25)
        );
    }

    #[test]
    fn test_unknown_direction_is_ascending() {
        let query = ListQuery::bind(&RawRequest::new().with_query("orderDirection", "sideways"))
            .unwrap();
        assert_eq!(query.descriptor().direction, OrderDirection::Ascending);
    }
}
