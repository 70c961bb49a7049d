//! PostgreSQL store
//!
//! One table per entity kind, named after [`Entity::KIND`]:
//!
//! ```sql
//! id uuid PRIMARY KEY, created_at timestamptz, updated_at timestamptz,
//! deleted_at timestamptz NULL, data jsonb
//! ```
//!
//! Payload columns are addressed inside `data` with `#>>` and cast by the
//! kind of value they are compared against. Every request-supplied value is
//! bound, never interpolated; only schema column paths reach the SQL text.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::entity::{DeleteOutcome, Entity, Record};
use super::error::{RepositoryError, RepositoryOperation};
use super::filter::{Expr, FilterValue};
use super::schema::{Column, ColumnKind, META_COLUMNS};
use super::store::{SelectQuery, Store};
use super::RepositoryResult;

const RECORD_COLUMNS: &str = "id, created_at, updated_at, deleted_at, data";

/// sqlx-backed store for records of entity `E`
#[derive(Debug)]
pub struct PgStore<E> {
    pool: PgPool,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Clone for PgStore<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E: Entity> PgStore<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    /// Create the entity table and its partial unique indexes if missing
    pub async fn ensure_schema(&self) -> RepositoryResult<()> {
        for statement in schema_statements::<E>() {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_error::<E>(e, RepositoryOperation::Insert))?;
        }
        info!(table = E::KIND, "entity table ready");
        Ok(())
    }
}

#[async_trait]
impl<E: Entity> Store<E> for PgStore<E> {
    async fn select(&self, query: SelectQuery) -> RepositoryResult<(Vec<Record<E>>, u64)> {
        let operation = RepositoryOperation::GetList;

        let mut count = count_sql::<E>(&query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_error::<E>(e, operation))?;

        let mut select = select_sql::<E>(&query);
        debug!(sql = select.sql(), "select");
        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_error::<E>(e, operation))?;

        let items = rows
            .iter()
            .map(|row| decode::<E>(row, operation))
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok((items, u64::try_from(total).unwrap_or_default()))
    }

    async fn find(
        &self,
        id: Uuid,
        filter: Option<&Expr>,
        include_deleted: bool,
    ) -> RepositoryResult<Option<Record<E>>> {
        let operation = RepositoryOperation::GetById;
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM {} WHERE id = ",
            RECORD_COLUMNS,
            table::<E>()
        ));
        builder.push_bind(id);
        if !include_deleted {
            builder.push(" AND deleted_at IS NULL");
        }
        if let Some(filter) = filter {
            builder.push(" AND ");
            push_expr(&mut builder, filter);
        }

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_error::<E>(e, operation))?;
        row.as_ref().map(|row| decode::<E>(row, operation)).transpose()
    }

    async fn insert(&self, record: Record<E>) -> RepositoryResult<()> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5)",
            table::<E>(),
            RECORD_COLUMNS
        );
        sqlx::query(&sql)
            .bind(record.id)
            .bind(record.created_at)
            .bind(record.updated_at)
            .bind(record.deleted_at)
            .bind(Json(&record.data))
            .execute(&self.pool)
            .await
            .map_err(|e| map_error::<E>(e, RepositoryOperation::Insert))?;
        Ok(())
    }

    async fn update(&self, record: Record<E>) -> RepositoryResult<bool> {
        let sql = format!(
            "UPDATE {} SET data = $1, updated_at = $2 WHERE id = $3 AND deleted_at IS NULL",
            table::<E>()
        );
        let result = sqlx::query(&sql)
            .bind(Json(&record.data))
            .bind(record.updated_at)
            .bind(record.id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_error::<E>(e, RepositoryOperation::Update))?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> RepositoryResult<Option<DeleteOutcome>> {
        let operation = RepositoryOperation::Delete;
        let sql = format!(
            "UPDATE {} SET deleted_at = $1 WHERE id = $2 AND deleted_at IS NULL",
            table::<E>()
        );
        let result = sqlx::query(&sql)
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_error::<E>(e, operation))?;
        if result.rows_affected() > 0 {
            return Ok(Some(DeleteOutcome::Deleted));
        }

        let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)", table::<E>());
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_error::<E>(e, operation))?;
        Ok(exists.then_some(DeleteOutcome::AlreadyDeleted))
    }
}

fn map_error<E: Entity>(error: sqlx::Error, operation: RepositoryOperation) -> RepositoryError {
    RepositoryError::from(error)
        .with_operation(operation)
        .with_entity_type(E::KIND)
}

fn decode<E: Entity>(row: &PgRow, operation: RepositoryOperation) -> RepositoryResult<Record<E>> {
    let decode_error = |e: sqlx::Error| {
        RepositoryError::serialization_error(operation, e.to_string()).with_entity_type(E::KIND)
    };
    let Json(data) = row.try_get::<Json<E>, _>("data").map_err(decode_error)?;
    Ok(Record {
        id: row.try_get("id").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        updated_at: row.try_get("updated_at").map_err(decode_error)?,
        deleted_at: row.try_get("deleted_at").map_err(decode_error)?,
        data,
    })
}

fn table<E: Entity>() -> String {
    format!("\"{}\"", E::KIND.replace('"', ""))
}

/// SQL expression for a column path, cast to `kind`
fn column_sql(path: &str, kind: ColumnKind) -> String {
    if META_COLUMNS.contains(&path) {
        return path.to_string();
    }
    let segments = path
        .split('.')
        .map(|s| s.replace(['\'', ',', '{', '}', '"'], ""))
        .collect::<Vec<_>>()
        .join(",");
    let text = format!("(data #>> '{{{}}}')", segments);
    match kind {
        ColumnKind::String | ColumnKind::Enum | ColumnKind::Collection => text,
        ColumnKind::Integer => format!("{}::bigint", text),
        ColumnKind::Float => format!("{}::double precision", text),
        ColumnKind::Boolean => format!("{}::boolean", text),
        ColumnKind::Uuid => format!("{}::uuid", text),
        ColumnKind::Timestamp => format!("{}::timestamptz", text),
    }
}

fn value_kind(value: &FilterValue) -> ColumnKind {
    match value {
        FilterValue::String(_) | FilterValue::Null => ColumnKind::String,
        FilterValue::Integer(_) => ColumnKind::Integer,
        FilterValue::Float(_) => ColumnKind::Float,
        FilterValue::Boolean(_) => ColumnKind::Boolean,
        FilterValue::Uuid(_) => ColumnKind::Uuid,
        FilterValue::Timestamp(_) => ColumnKind::Timestamp,
    }
}

fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: &FilterValue) {
    match value {
        FilterValue::String(s) => builder.push_bind(s.clone()),
        FilterValue::Integer(n) => builder.push_bind(*n),
        FilterValue::Float(n) => builder.push_bind(*n),
        FilterValue::Boolean(b) => builder.push_bind(*b),
        FilterValue::Uuid(u) => builder.push_bind(*u),
        FilterValue::Timestamp(t) => builder.push_bind(*t),
        FilterValue::Null => builder.push("NULL"),
    };
}

fn push_expr(builder: &mut QueryBuilder<'_, Postgres>, expr: &Expr) {
    match expr {
        Expr::Eq(path, FilterValue::Null) => {
            builder.push(column_sql(path, ColumnKind::String));
            builder.push(" IS NULL");
        }
        Expr::Ne(path, FilterValue::Null) => {
            builder.push(column_sql(path, ColumnKind::String));
            builder.push(" IS NOT NULL");
        }
        Expr::Eq(path, value) => {
            builder.push(column_sql(path, value_kind(value)));
            builder.push(" = ");
            push_value(builder, value);
        }
        Expr::Ne(path, value) => {
            builder.push(column_sql(path, value_kind(value)));
            builder.push(" IS DISTINCT FROM ");
            push_value(builder, value);
        }
        Expr::And(exprs) => {
            builder.push("(");
            for (i, expr) in exprs.iter().enumerate() {
                if i > 0 {
                    builder.push(" AND ");
                }
                push_expr(builder, expr);
            }
            builder.push(")");
        }
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn push_where(builder: &mut QueryBuilder<'_, Postgres>, query: &SelectQuery) {
    builder.push(" WHERE ");
    if query.include_deleted {
        builder.push("TRUE");
    } else {
        builder.push("deleted_at IS NULL");
    }

    if let Some(filter) = &query.filter {
        builder.push(" AND ");
        push_expr(builder, filter);
    }

    if let Some(search) = &query.search {
        if search.columns.is_empty() {
            builder.push(" AND FALSE");
        } else {
            let pattern = escape_like(&search.term);
            builder.push(" AND (");
            for (i, column) in search.columns.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder.push(column_sql(column.path(), ColumnKind::String));
                builder.push(" ILIKE ");
                builder.push_bind(pattern.clone());
            }
            builder.push(")");
        }
    }
}

fn count_sql<E: Entity>(query: &SelectQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", table::<E>()));
    push_where(&mut builder, query);
    builder
}

fn select_sql<E: Entity>(query: &SelectQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM {}", RECORD_COLUMNS, table::<E>()));
    push_where(&mut builder, query);

    let direction = query.order.direction.as_sql();
    let column: &Column = &query.order.column;
    builder.push(format!(
        " ORDER BY {} {}, id {}",
        column_sql(column.path(), column.kind()),
        direction,
        direction
    ));
    builder.push(" LIMIT ");
    builder.push_bind(i64::try_from(query.pagination.limit).unwrap_or(i64::MAX));
    builder.push(" OFFSET ");
    builder.push_bind(i64::try_from(query.pagination.offset).unwrap_or(i64::MAX));
    builder
}

/// DDL for the entity table and one partial unique index per uniqueness key
fn schema_statements<E: Entity>() -> Vec<String> {
    let table = table::<E>();
    let mut statements = vec![format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         id uuid PRIMARY KEY, \
         created_at timestamptz NOT NULL, \
         updated_at timestamptz NOT NULL, \
         deleted_at timestamptz NULL, \
         data jsonb NOT NULL)",
        table
    )];

    for key in E::unique_keys() {
        let name = format!(
            "{}_{}_key",
            E::KIND,
            key.iter()
                .map(|path| path.replace('.', "_"))
                .collect::<Vec<_>>()
                .join("_")
        );
        let columns = key
            .iter()
            .map(|path| column_sql(path, ColumnKind::String))
            .collect::<Vec<_>>()
            .join(", ");
        statements.push(format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS \"{}\" ON {} ({}) WHERE deleted_at IS NULL",
            name, table, columns
        ));
    }
    statements
}
