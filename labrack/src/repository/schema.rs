//! Column schema introspection
//!
//! A [`Schema`] is resolved once per entity type when its repository is built.
//! It answers which columns exist, which are searchable (string-typed only,
//! through nested structures, never through collections) and which column a
//! requested order field refers to.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;
use thiserror::Error;

use super::entity::Entity;

/// Columns every record carries, outside the entity payload
pub const META_COLUMNS: [&str; 4] = ["id", "created_at", "updated_at", "deleted_at"];

/// Column used when a list request names no order field
pub const DEFAULT_ORDER_COLUMN: &str = "created_at";

/// Kind of value stored in a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Free text; the only searchable kind
    String,
    /// Signed or unsigned integer of any width
    Integer,
    /// Floating point number
    Float,
    /// Boolean flag
    Boolean,
    /// UUID, stored as hyphenated text
    Uuid,
    /// RFC 3339 timestamp
    Timestamp,
    /// Closed set of string variants
    Enum,
    /// Array or map; neither searched nor ordered
    Collection,
}

impl ColumnKind {
    /// Whether a column of this kind can be used to order results
    pub const fn is_orderable(&self) -> bool {
        !matches!(self, Self::Collection)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Uuid => "uuid",
            Self::Timestamp => "timestamp",
            Self::Enum => "enum",
            Self::Collection => "collection",
        };
        f.write_str(name)
    }
}

/// A single column of an entity, addressed by a dotted path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    path: String,
    kind: ColumnKind,
}

impl Column {
    /// Create a column of the given kind
    pub fn new(path: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn string(path: impl Into<String>) -> Self {
        Self::new(path, ColumnKind::String)
    }

    pub fn integer(path: impl Into<String>) -> Self {
        Self::new(path, ColumnKind::Integer)
    }

    pub fn float(path: impl Into<String>) -> Self {
        Self::new(path, ColumnKind::Float)
    }

    pub fn boolean(path: impl Into<String>) -> Self {
        Self::new(path, ColumnKind::Boolean)
    }

    pub fn uuid(path: impl Into<String>) -> Self {
        Self::new(path, ColumnKind::Uuid)
    }

    pub fn timestamp(path: impl Into<String>) -> Self {
        Self::new(path, ColumnKind::Timestamp)
    }

    pub fn enumeration(path: impl Into<String>) -> Self {
        Self::new(path, ColumnKind::Enum)
    }

    pub fn collection(path: impl Into<String>) -> Self {
        Self::new(path, ColumnKind::Collection)
    }

    /// Flatten the columns of a nested structure under `prefix`
    ///
    /// ```rust
    /// use labrack::repository::Column;
    ///
    /// let nested = Column::nested("location", vec![Column::string("rack")]);
    /// assert_eq!(nested[0].path(), "location.rack");
    /// ```
    pub fn nested(prefix: &str, columns: Vec<Column>) -> Vec<Column> {
        columns
            .into_iter()
            .map(|column| Column::new(format!("{}.{}", prefix, column.path), column.kind))
            .collect()
    }

    /// Full dotted path of the column
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last segment of the path
    pub fn leaf(&self) -> &str {
        self.path.rsplit('.').next().unwrap_or(&self.path)
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// Path segments, outermost first
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }

    /// Whether the column lives on the record rather than in the payload
    pub fn is_meta(&self) -> bool {
        META_COLUMNS.contains(&self.path.as_str())
    }
}

/// Errors detected while resolving an entity schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{entity}: column '{path}' is declared twice")]
    DuplicateColumn { entity: &'static str, path: String },

    #[error("{entity}: column '{path}' shadows a record column")]
    ReservedColumn { entity: &'static str, path: String },

    #[error("{entity}: uniqueness key references unknown column '{path}'")]
    UnknownUniqueColumn { entity: &'static str, path: String },

    #[error("{entity}: field '{path}' has no column")]
    UndeclaredField { entity: &'static str, path: String },

    #[error("{entity}: column '{path}' is not a field")]
    MissingField { entity: &'static str, path: String },

    #[error("{entity}: column '{path}' is declared {declared} but holds {found}")]
    KindMismatch {
        entity: &'static str,
        path: String,
        declared: ColumnKind,
        found: &'static str,
    },

    #[error("{entity}: payload does not serialize to an object: {reason}")]
    NotAnObject { entity: &'static str, reason: String },
}

/// Why an order field could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderFieldError {
    #[error("unknown field '{0}'")]
    Unknown(String),

    #[error("field '{field}' is ambiguous, use one of: {candidates}")]
    Ambiguous { field: String, candidates: String },

    #[error("field '{0}' cannot be used for ordering")]
    NotOrderable(String),
}

/// Resolved column set of one entity type
#[derive(Debug, Clone)]
pub struct Schema {
    kind: &'static str,
    columns: Vec<Column>,
    searchable: Vec<Column>,
}

impl Schema {
    /// Resolve the schema of `E`, validating its declaration
    pub fn of<E: Entity>() -> Result<Self, SchemaError> {
        let mut columns = vec![
            Column::uuid("id"),
            Column::timestamp("created_at"),
            Column::timestamp("updated_at"),
            Column::timestamp("deleted_at"),
        ];

        let mut seen = HashSet::new();
        for column in E::columns() {
            if column.is_meta() {
                return Err(SchemaError::ReservedColumn {
                    entity: E::KIND,
                    path: column.path,
                });
            }
            if !seen.insert(column.path.clone()) {
                return Err(SchemaError::DuplicateColumn {
                    entity: E::KIND,
                    path: column.path,
                });
            }
            columns.push(column);
        }

        check_against_payload::<E>(&columns)?;

        for key in E::unique_keys() {
            for path in key.iter() {
                if !columns.iter().any(|c| c.path == *path) {
                    return Err(SchemaError::UnknownUniqueColumn {
                        entity: E::KIND,
                        path: (*path).to_string(),
                    });
                }
            }
        }

        let searchable = columns
            .iter()
            .filter(|c| c.kind == ColumnKind::String)
            .cloned()
            .collect();

        Ok(Self {
            kind: E::KIND,
            columns,
            searchable,
        })
    }

    /// Entity kind the schema belongs to
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// All columns, record columns first
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Columns included in free-text search
    pub fn searchable(&self) -> &[Column] {
        &self.searchable
    }

    /// Look up a column by exact path
    pub fn column(&self, path: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.path == path)
    }

    /// Resolve a requested order field to a column
    ///
    /// An empty request orders by [`DEFAULT_ORDER_COLUMN`]. Camel-case names
    /// (`createdAt`) are accepted. A bare leaf name (`rack`) resolves when
    /// exactly one column ends with it.
    pub fn resolve_order(&self, requested: &str) -> Result<&Column, OrderFieldError> {
        let requested = requested.trim();
        let wanted = if requested.is_empty() {
            DEFAULT_ORDER_COLUMN.to_string()
        } else {
            to_snake_case(requested)
        };

        let column = match self.column(&wanted) {
            Some(column) => column,
            None => {
                let candidates: Vec<&Column> =
                    self.columns.iter().filter(|c| c.leaf() == wanted).collect();
                match candidates.as_slice() {
                    [] => return Err(OrderFieldError::Unknown(requested.to_string())),
                    [only] => *only,
                    many => {
                        return Err(OrderFieldError::Ambiguous {
                            field: requested.to_string(),
                            candidates: many
                                .iter()
                                .map(|c| c.path())
                                .collect::<Vec<_>>()
                                .join(", "),
                        })
                    }
                }
            }
        };

        if !column.kind.is_orderable() {
            return Err(OrderFieldError::NotOrderable(requested.to_string()));
        }
        Ok(column)
    }
}

/// Compare the declared columns with the fields of a serialized default payload
///
/// A `null` field (an unset `Option`) stands for any columns declared below it.
fn check_against_payload<E: Entity>(columns: &[Column]) -> Result<(), SchemaError> {
    let not_an_object = |reason: String| SchemaError::NotAnObject {
        entity: E::KIND,
        reason,
    };
    let sample = serde_json::to_value(E::default()).map_err(|e| not_an_object(e.to_string()))?;
    let Value::Object(fields) = &sample else {
        return Err(not_an_object(format!("got {}", json_type(&sample))));
    };

    let declared: Vec<&Column> = columns.iter().filter(|c| !c.is_meta()).collect();
    let mut leaves = Vec::new();
    for (name, value) in fields {
        flatten(name.clone(), value, &declared, &mut leaves);
    }

    for (path, value) in &leaves {
        let column = declared.iter().find(|c| c.path == *path);
        match (column, value) {
            (Some(column), value) if !accepts(column.kind, value) => {
                return Err(SchemaError::KindMismatch {
                    entity: E::KIND,
                    path: path.clone(),
                    declared: column.kind,
                    found: json_type(value),
                });
            }
            (Some(_), _) => {}
            (None, Value::Null) if declared.iter().any(|c| is_below(&c.path, path)) => {}
            (None, _) => {
                return Err(SchemaError::UndeclaredField {
                    entity: E::KIND,
                    path: path.clone(),
                })
            }
        }
    }

    for column in &declared {
        let present = leaves.iter().any(|(path, value)| {
            *path == column.path || (value.is_null() && is_below(&column.path, path))
        });
        if !present {
            return Err(SchemaError::MissingField {
                entity: E::KIND,
                path: column.path.clone(),
            });
        }
    }
    Ok(())
}

fn flatten<'v>(
    path: String,
    value: &'v Value,
    declared: &[&Column],
    out: &mut Vec<(String, &'v Value)>,
) {
    let is_collection = declared
        .iter()
        .any(|c| c.path == path && c.kind == ColumnKind::Collection);
    match value {
        Value::Object(fields) if !fields.is_empty() && !is_collection => {
            for (name, value) in fields {
                flatten(format!("{}.{}", path, name), value, declared, out);
            }
        }
        _ => out.push((path, value)),
    }
}

fn is_below(path: &str, ancestor: &str) -> bool {
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('.'))
}

fn accepts(kind: ColumnKind, value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(_) => matches!(
            kind,
            ColumnKind::String | ColumnKind::Uuid | ColumnKind::Timestamp | ColumnKind::Enum
        ),
        Value::Number(n) => match kind {
            ColumnKind::Integer => n.is_i64() || n.is_u64(),
            ColumnKind::Float => true,
            _ => false,
        },
        Value::Bool(_) => kind == ColumnKind::Boolean,
        Value::Array(_) | Value::Object(_) => kind == ColumnKind::Collection,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('.') && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
