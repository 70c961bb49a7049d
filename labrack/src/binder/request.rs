//! Raw request value sources

use std::collections::HashMap;
use std::fmt;

/// Where a bound value is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    Query,
    Path,
    Header,
}

impl Source {
    /// All sources, in the order binding visits them
    pub const ALL: [Source; 3] = [Source::Query, Source::Path, Source::Header];
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Path => write!(f, "path"),
            Self::Header => write!(f, "header"),
        }
    }
}

/// Lookup of raw string values by source and key
pub trait RequestParts {
    /// Raw value for `key`; header keys are matched case-insensitively
    fn value(&self, source: Source, key: &str) -> Option<&str>;
}

/// Request values collected into maps
///
/// # Example
///
/// ```rust
/// use labrack::binder::{RawRequest, RequestParts, Source};
///
/// let request = RawRequest::new()
///     .with_query("page", "2")
///     .with_header("X-Lab-Site", "berlin");
///
/// assert_eq!(request.value(Source::Query, "page"), Some("2"));
/// assert_eq!(request.value(Source::Header, "x-lab-site"), Some("berlin"));
/// assert_eq!(request.value(Source::Path, "id"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    query: HashMap<String, String>,
    path: HashMap<String, String>,
    headers: HashMap<String, String>,
}

impl RawRequest {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_path(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Replace the query values
    pub fn set_query(&mut self, query: HashMap<String, String>) {
        self.query = query;
    }

    /// Add one path parameter
    pub fn insert_path(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.path.insert(key.into(), value.into());
    }

    /// Add one header value
    pub fn insert_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers
            .insert(key.into().to_ascii_lowercase(), value.into());
    }
}

impl RequestParts for RawRequest {
    fn value(&self, source: Source, key: &str) -> Option<&str> {
        let value = match source {
            Source::Query => self.query.get(key),
            Source::Path => self.path.get(key),
            Source::Header => self.headers.get(&key.to_ascii_lowercase()),
        };
        value.map(String::as_str)
    }
}
