//! Query descriptor, ordering and pagination
//!
//! A [`QueryDescriptor`] is the normalized form of a list request. Page and
//! page size below 1 fall back to the defaults, page size is capped at
//! [`MAX_PAGE_SIZE`], and direction defaults to ascending.
//!
//! # Example
//!
//! ```rust
//! use labrack::repository::{OrderDirection, QueryDescriptor};
//!
//! let query = QueryDescriptor::new("sw", "name", OrderDirection::parse("DESC"), 0, -3);
//! assert_eq!(query.page, 1);
//! assert_eq!(query.page_size, 10);
//! assert_eq!(query.direction, OrderDirection::Descending);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Page used when a request names none or an invalid one
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when a request names none or an invalid one
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Largest page a single list call returns
pub const MAX_PAGE_SIZE: u64 = 100;

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9, oldest first)
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    /// Sort in descending order (Z-A, 9-0, newest first)
    #[serde(rename = "desc")]
    Descending,
}

impl OrderDirection {
    /// Parse a request value; anything but `desc` (any case) is ascending
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            Self::Descending
        } else {
            Self::Ascending
        }
    }

    /// SQL keyword for this direction
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// Offset/limit window over a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of results to skip
    pub offset: u64,
    /// Maximum number of results to return
    pub limit: u64,
}

impl Pagination {
    pub const fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// Window for a 1-indexed page number
    ///
    /// ```rust
    /// use labrack::repository::Pagination;
    ///
    /// let page3 = Pagination::page(3, 20);
    /// assert_eq!(page3.offset, 40);
    /// assert_eq!(page3.limit, 20);
    /// ```
    pub const fn page(page_number: u64, page_size: u64) -> Self {
        Self {
            offset: page_number.saturating_sub(1).saturating_mul(page_size),
            limit: page_size,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::page(DEFAULT_PAGE, DEFAULT_PAGE_SIZE)
    }
}

/// Normalized search, order and pagination parameters of a list request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    /// Free-text search term; empty means no search
    pub search: String,
    /// Requested order field; empty means the default order column
    pub order_by: String,
    /// Order direction
    pub direction: OrderDirection,
    /// 1-indexed page number
    pub page: u64,
    /// Items per page
    pub page_size: u64,
}

impl QueryDescriptor {
    /// Build a descriptor from raw, possibly out-of-range request values
    pub fn new(
        search: impl Into<String>,
        order_by: impl Into<String>,
        direction: OrderDirection,
        page: i64,
        page_size: i64,
    ) -> Self {
        Self {
            search: search.into(),
            order_by: order_by.into(),
            direction,
            page: positive_or(page, DEFAULT_PAGE),
            page_size: positive_or(page_size, DEFAULT_PAGE_SIZE),
        }
        .normalized()
    }

    /// Re-apply the defaults and caps; used on descriptors built field by field
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.page < 1 {
            self.page = DEFAULT_PAGE;
        }
        if self.page_size < 1 {
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        self.page_size = self.page_size.min(MAX_PAGE_SIZE);
        self.search = self.search.trim().to_string();
        self.order_by = self.order_by.trim().to_string();
        self
    }

    /// Offset/limit window for this descriptor
    pub fn pagination(&self) -> Pagination {
        Pagination::page(self.page, self.page_size)
    }

    /// Search term, if any
    pub fn search_term(&self) -> Option<&str> {
        if self.search.is_empty() {
            None
        } else {
            Some(&self.search)
        }
    }
}

impl Default for QueryDescriptor {
    fn default() -> Self {
        Self {
            search: String::new(),
            order_by: String::new(),
            direction: OrderDirection::Ascending,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn positive_or(value: i64, default: u64) -> u64 {
    u64::try_from(value).ok().filter(|v| *v >= 1).unwrap_or(default)
}
