//! In-memory store
//!
//! Records live in a [`BTreeMap`] keyed by their time-ordered id behind a
//! tokio [`RwLock`]. Queries are evaluated against each record's JSON
//! document, with the record columns (`id`, `created_at`, ...) placed next to
//! the payload fields so column paths resolve the same way they do in the
//! PostgreSQL store.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::entity::{DeleteOutcome, Entity, Record};
use super::error::{RepositoryError, RepositoryOperation};
use super::filter::{Expr, FilterValue};
use super::query::OrderDirection;
use super::schema::ColumnKind;
use super::store::{SelectQuery, Store};
use super::RepositoryResult;

/// Process-local store, used by tests and by the server when no database is
/// configured
#[derive(Debug)]
pub struct MemoryStore<E> {
    records: RwLock<BTreeMap<Uuid, Record<E>>>,
}

impl<E> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<E> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> MemoryStore<E> {
    /// Number of stored records, soft-deleted ones included
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn check_unique(
        records: &BTreeMap<Uuid, Record<E>>,
        candidate: &Record<E>,
        operation: RepositoryOperation,
    ) -> RepositoryResult<()> {
        let keys = E::unique_keys();
        if keys.is_empty() {
            return Ok(());
        }
        let candidate_doc = document(candidate, operation)?;

        for key in keys {
            let wanted: Vec<&Value> = key.iter().map(|path| lookup(&candidate_doc, path)).collect();
            // NULL never collides, matching SQL unique index semantics
            if wanted.iter().any(|v| v.is_null()) {
                continue;
            }
            for other in records.values() {
                if other.id == candidate.id || other.is_deleted() {
                    continue;
                }
                let other_doc = document(other, operation)?;
                let taken = key
                    .iter()
                    .zip(&wanted)
                    .all(|(path, value)| lookup(&other_doc, path) == *value);
                if taken {
                    return Err(RepositoryError::already_exists(E::KIND, describe_key(key, &wanted))
                        .with_operation(operation));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> Store<E> for MemoryStore<E> {
    async fn select(&self, query: SelectQuery) -> RepositoryResult<(Vec<Record<E>>, u64)> {
        let operation = RepositoryOperation::GetList;
        let records = self.records.read().await;

        let mut matched = Vec::new();
        for record in records.values() {
            if record.is_deleted() && !query.include_deleted {
                continue;
            }
            let doc = document(record, operation)?;
            if let Some(filter) = &query.filter {
                if !evaluate(&doc, filter) {
                    continue;
                }
            }
            if let Some(search) = &query.search {
                let term = search.term.to_lowercase();
                let hit = search.columns.iter().any(|column| {
                    lookup(&doc, column.path())
                        .as_str()
                        .is_some_and(|s| s.to_lowercase().contains(&term))
                });
                if !hit {
                    continue;
                }
            }
            matched.push((doc, record));
        }

        let path = query.order.column.path();
        let kind = query.order.column.kind();
        matched.sort_by(|(a_doc, a), (b_doc, b)| {
            let ordering = compare(lookup(a_doc, path), lookup(b_doc, path), kind)
                .then_with(|| a.id.cmp(&b.id));
            match query.order.direction {
                OrderDirection::Ascending => ordering,
                OrderDirection::Descending => ordering.reverse(),
            }
        });

        let total = matched.len() as u64;
        let offset = usize::try_from(query.pagination.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.pagination.limit).unwrap_or(usize::MAX);
        let page = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, record)| record.clone())
            .collect();

        Ok((page, total))
    }

    async fn find(
        &self,
        id: Uuid,
        filter: Option<&Expr>,
        include_deleted: bool,
    ) -> RepositoryResult<Option<Record<E>>> {
        let records = self.records.read().await;
        let Some(record) = records.get(&id) else {
            return Ok(None);
        };
        if record.is_deleted() && !include_deleted {
            return Ok(None);
        }
        if let Some(filter) = filter {
            let doc = document(record, RepositoryOperation::GetById)?;
            if !evaluate(&doc, filter) {
                return Ok(None);
            }
        }
        Ok(Some(record.clone()))
    }

    async fn insert(&self, record: Record<E>) -> RepositoryResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.id) {
            return Err(
                RepositoryError::already_exists(E::KIND, record.id.to_string())
                    .with_operation(RepositoryOperation::Insert),
            );
        }
        Self::check_unique(&records, &record, RepositoryOperation::Insert)?;
        records.insert(record.id, record);
        Ok(())
    }

    async fn update(&self, record: Record<E>) -> RepositoryResult<bool> {
        let mut records = self.records.write().await;
        let live = records.get(&record.id).is_some_and(|r| !r.is_deleted());
        if !live {
            return Ok(false);
        }
        Self::check_unique(&records, &record, RepositoryOperation::Update)?;
        if let Some(existing) = records.get_mut(&record.id) {
            existing.data = record.data;
            existing.updated_at = record.updated_at;
        }
        Ok(true)
    }

    async fn soft_delete(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Option<DeleteOutcome>> {
        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(&id) else {
            return Ok(None);
        };
        if record.is_deleted() {
            return Ok(Some(DeleteOutcome::AlreadyDeleted));
        }
        record.deleted_at = Some(at);
        Ok(Some(DeleteOutcome::Deleted))
    }
}

/// JSON document of a record: payload fields plus the record columns
fn document<E: Entity>(record: &Record<E>, operation: RepositoryOperation) -> RepositoryResult<Value> {
    let mut doc = match serde_json::to_value(&record.data) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => {
            return Err(RepositoryError::serialization_error(operation, e.to_string())
                .with_entity(E::KIND, record.id.to_string()))
        }
    };
    doc.insert("id".to_string(), Value::String(record.id.to_string()));
    doc.insert("created_at".to_string(), Value::String(record.created_at.to_rfc3339()));
    doc.insert("updated_at".to_string(), Value::String(record.updated_at.to_rfc3339()));
    doc.insert(
        "deleted_at".to_string(),
        record
            .deleted_at
            .map_or(Value::Null, |t| Value::String(t.to_rfc3339())),
    );
    Ok(Value::Object(doc))
}

static NULL: Value = Value::Null;

/// Value at a dotted path; missing segments resolve to null
fn lookup<'a>(doc: &'a Value, path: &str) -> &'a Value {
    path.split('.')
        .try_fold(doc, |value, segment| value.get(segment))
        .unwrap_or(&NULL)
}

fn evaluate(doc: &Value, expr: &Expr) -> bool {
    match expr {
        Expr::Eq(path, value) => value_equals(lookup(doc, path), value),
        Expr::Ne(path, value) => !value_equals(lookup(doc, path), value),
        Expr::And(exprs) => exprs.iter().all(|e| evaluate(doc, e)),
    }
}

fn value_equals(actual: &Value, expected: &FilterValue) -> bool {
    match expected {
        FilterValue::Null => actual.is_null(),
        FilterValue::String(s) => actual.as_str() == Some(s.as_str()),
        FilterValue::Integer(n) => actual.as_i64() == Some(*n),
        FilterValue::Float(n) => actual.as_f64() == Some(*n),
        FilterValue::Boolean(b) => actual.as_bool() == Some(*b),
        FilterValue::Uuid(u) => actual
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .is_some_and(|v| v == *u),
        FilterValue::Timestamp(t) => parse_timestamp(actual).is_some_and(|v| v == *t),
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Ascending comparison of two column values; nulls sort last
fn compare(a: &Value, b: &Value, kind: ColumnKind) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    match kind {
        ColumnKind::Integer | ColumnKind::Float => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = a.as_f64().unwrap_or(f64::NAN);
                let y = b.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        },
        ColumnKind::Boolean => a.as_bool().cmp(&b.as_bool()),
        ColumnKind::Timestamp => parse_timestamp(a).cmp(&parse_timestamp(b)),
        ColumnKind::String | ColumnKind::Uuid | ColumnKind::Enum => a.as_str().cmp(&b.as_str()),
        ColumnKind::Collection => Ordering::Equal,
    }
}

fn describe_key(key: &[&str], values: &[&Value]) -> String {
    key.iter()
        .zip(values)
        .map(|(path, value)| match value {
            Value::String(s) => format!("{}={}", path, s),
            other => format!("{}={}", path, other),
        })
        .collect::<Vec<_>>()
        .join(",")
}
