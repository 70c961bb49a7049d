//! Filter expressions and the query builder
//!
//! Filters are a small closed expression tree (equality, inequality and
//! conjunction) over typed field references. A [`FieldRef<E, V>`] can only be
//! compared against values of its own type `V`, so a filter on a port's
//! `switch_id` cannot be handed a string by mistake.
//!
//! # Example
//!
//! ```rust
//! use labrack::repository::{FieldRef, QueryBuilder};
//! use labrack::lab::EthernetSwitchPort;
//! use uuid::Uuid;
//!
//! let switch_id = Uuid::new_v4();
//! let builder = QueryBuilder::<EthernetSwitchPort>::new()
//!     .eq(EthernetSwitchPort::SWITCH_ID, switch_id)
//!     .ne(EthernetSwitchPort::NAME, "mgmt0");
//!
//! assert_eq!(
//!     builder.filter().unwrap().to_string(),
//!     format!("(switch_id = '{}' AND name != 'mgmt0')", switch_id)
//! );
//! ```

use std::fmt;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Reference to a column of entity `E` holding values of type `V`
pub struct FieldRef<E, V> {
    path: &'static str,
    _marker: PhantomData<fn() -> (E, V)>,
}

impl<E, V> FieldRef<E, V> {
    /// Declare a field reference; `path` must name a column of `E`
    pub const fn new(path: &'static str) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub const fn path(&self) -> &'static str {
        self.path
    }
}

impl<E> FieldRef<E, Uuid> {
    /// The record identifier, available on every entity
    pub const fn id() -> Self {
        Self::new("id")
    }
}

impl<E> FieldRef<E, DateTime<Utc>> {
    pub const fn created_at() -> Self {
        Self::new("created_at")
    }

    pub const fn updated_at() -> Self {
        Self::new("updated_at")
    }
}

impl<E, V> Clone for FieldRef<E, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, V> Copy for FieldRef<E, V> {}

impl<E, V> fmt::Debug for FieldRef<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldRef").field(&self.path).finish()
    }
}

/// A value that can be compared against a column
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Null,
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "'{}'", s),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Uuid(u) => write!(f, "'{}'", u),
            Self::Timestamp(t) => write!(f, "'{}'", t.to_rfc3339()),
            Self::Null => write!(f, "NULL"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u16> for FilterValue {
    fn from(n: u16) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for FilterValue {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Uuid> for FilterValue {
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Timestamp(t)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Untyped filter expression consumed by stores
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `path = value`
    Eq(&'static str, FilterValue),
    /// `path != value`
    Ne(&'static str, FilterValue),
    /// All sub-expressions hold
    And(Vec<Expr>),
}

impl Expr {
    /// Conjoin two expressions, flattening nested conjunctions
    pub fn and(self, other: Expr) -> Expr {
        match (self, other) {
            (Expr::And(mut left), Expr::And(right)) => {
                left.extend(right);
                Expr::And(left)
            }
            (Expr::And(mut left), other) => {
                left.push(other);
                Expr::And(left)
            }
            (this, Expr::And(mut right)) => {
                right.insert(0, this);
                Expr::And(right)
            }
            (this, other) => Expr::And(vec![this, other]),
        }
    }

    /// Column paths referenced anywhere in the expression
    pub fn paths(&self) -> Vec<&'static str> {
        match self {
            Expr::Eq(path, _) | Expr::Ne(path, _) => vec![*path],
            Expr::And(exprs) => exprs.iter().flat_map(Expr::paths).collect(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Eq(path, value) => write!(f, "{} = {}", path, value),
            Expr::Ne(path, value) => write!(f, "{} != {}", path, value),
            Expr::And(exprs) => {
                write!(f, "(")?;
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        write!(f, " AND ")?;
                    }
                    write!(f, "{}", expr)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Typed filter over entity `E`
pub struct Filter<E> {
    expr: Expr,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Filter<E> {
    fn from_expr(expr: Expr) -> Self {
        Self {
            expr,
            _marker: PhantomData,
        }
    }

    /// `field = value`
    pub fn eq<V>(field: FieldRef<E, V>, value: impl Into<V>) -> Self
    where
        V: Into<FilterValue>,
    {
        let value: V = value.into();
        Self::from_expr(Expr::Eq(field.path(), value.into()))
    }

    /// `field != value`
    pub fn ne<V>(field: FieldRef<E, V>, value: impl Into<V>) -> Self
    where
        V: Into<FilterValue>,
    {
        let value: V = value.into();
        Self::from_expr(Expr::Ne(field.path(), value.into()))
    }

    /// Both this filter and `other` must hold
    #[must_use]
    pub fn and(self, other: Filter<E>) -> Self {
        Self::from_expr(self.expr.and(other.expr))
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl<E> Clone for Filter<E> {
    fn clone(&self) -> Self {
        Self::from_expr(self.expr.clone())
    }
}

impl<E> fmt::Debug for Filter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Filter").field(&self.expr).finish()
    }
}

/// Composable narrowing of a repository lookup
///
/// Chained conditions are conjoined. Soft-deleted records stay excluded
/// unless [`QueryBuilder::with_deleted`] is called.
pub struct QueryBuilder<E> {
    filter: Option<Expr>,
    include_deleted: bool,
    _marker: PhantomData<fn() -> E>,
}

impl<E> QueryBuilder<E> {
    pub fn new() -> Self {
        Self {
            filter: None,
            include_deleted: false,
            _marker: PhantomData,
        }
    }

    /// Require `field = value`
    #[must_use]
    pub fn eq<V>(self, field: FieldRef<E, V>, value: impl Into<V>) -> Self
    where
        V: Into<FilterValue>,
    {
        self.and(Filter::eq(field, value))
    }

    /// Require `field != value`
    #[must_use]
    pub fn ne<V>(self, field: FieldRef<E, V>, value: impl Into<V>) -> Self
    where
        V: Into<FilterValue>,
    {
        self.and(Filter::ne(field, value))
    }

    /// Require a prebuilt filter
    #[must_use]
    pub fn and(mut self, filter: Filter<E>) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter.expr),
            None => filter.expr,
        });
        self
    }

    /// Include soft-deleted records
    #[must_use]
    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    pub fn filter(&self) -> Option<&Expr> {
        self.filter.as_ref()
    }

    pub fn includes_deleted(&self) -> bool {
        self.include_deleted
    }

    pub fn is_empty(&self) -> bool {
        self.filter.is_none() && !self.include_deleted
    }
}

impl<E> Default for QueryBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for QueryBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            include_deleted: self.include_deleted,
            _marker: PhantomData,
        }
    }
}

impl<E> fmt::Debug for QueryBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("filter", &self.filter)
            .field("include_deleted", &self.include_deleted)
            .finish()
    }
}
