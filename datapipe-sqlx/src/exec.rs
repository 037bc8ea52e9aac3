//! Statement execution shared by the data source and the paginator.
//!
//! Every helper takes any `sqlx` executor, so the same code runs against the
//! pool, a pooled connection or an open transaction.

use crate::backend::Backend;
use crate::error::SqlxErrorExt;
use datapipe::{DataError, QueryBuilder, SqlValue};
use sqlx::{ColumnIndex, Database, Decode, Executor, FromRow, IntoArguments, Type};

pub(crate) async fn fetch_all<'c, T, DB, E>(executor: E, query: &QueryBuilder) -> Result<Vec<T>, DataError>
where
    DB: Backend,
    E: Executor<'c, Database = DB>,
    T: for<'r> FromRow<'r, DB::Row> + Send + Unpin,
    for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
{
    let (sql, values) = query.build_select()?;
    tracing::debug!(sql = %sql, binds = values.len(), "fetch rows");
    let args = DB::arguments(values).map_err(DataError::Database)?;
    sqlx::query_as_with::<DB, T, _>(&sql, args)
        .fetch_all(executor)
        .await
        .map_err(|e| e.into_data_error())
}

pub(crate) async fn fetch_optional<'c, T, DB, E>(executor: E, query: &QueryBuilder) -> Result<Option<T>, DataError>
where
    DB: Backend,
    E: Executor<'c, Database = DB>,
    T: for<'r> FromRow<'r, DB::Row> + Send + Unpin,
    for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
{
    let (sql, values) = query.build_select()?;
    tracing::debug!(sql = %sql, binds = values.len(), "fetch row");
    let args = DB::arguments(values).map_err(DataError::Database)?;
    sqlx::query_as_with::<DB, T, _>(&sql, args)
        .fetch_optional(executor)
        .await
        .map_err(|e| e.into_data_error())
}

/// Count the rows `query` selects, counting `field` (`*` for plain row count).
pub(crate) async fn count<'c, DB, E>(executor: E, query: &QueryBuilder, field: &str) -> Result<i64, DataError>
where
    DB: Backend,
    E: Executor<'c, Database = DB>,
    for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
    i64: Type<DB> + for<'r> Decode<'r, DB>,
    usize: ColumnIndex<DB::Row>,
{
    let (sql, values) = query.build_count(field)?;
    tracing::debug!(sql = %sql, binds = values.len(), "count rows");
    let args = DB::arguments(values).map_err(DataError::Database)?;
    sqlx::query_scalar_with::<DB, i64, _>(&sql, args)
        .fetch_one(executor)
        .await
        .map_err(|e| e.into_data_error())
}

/// Run a statement that yields exactly one row, such as `INSERT ... RETURNING`.
pub(crate) async fn fetch_one_sql<'c, T, DB, E>(executor: E, sql: &str, values: Vec<SqlValue>) -> Result<T, DataError>
where
    DB: Backend,
    E: Executor<'c, Database = DB>,
    T: for<'r> FromRow<'r, DB::Row> + Send + Unpin,
    for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
{
    tracing::debug!(sql = %sql, binds = values.len(), "fetch returned row");
    let args = DB::arguments(values).map_err(DataError::Database)?;
    sqlx::query_as_with::<DB, T, _>(sql, args)
        .fetch_one(executor)
        .await
        .map_err(|e| e.into_data_error())
}

/// Run a write statement and return the driver's result.
pub(crate) async fn execute<'c, DB, E>(
    executor: E,
    sql: &str,
    values: Vec<SqlValue>,
) -> Result<<DB as Database>::QueryResult, DataError>
where
    DB: Backend,
    E: Executor<'c, Database = DB>,
    for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
{
    tracing::debug!(sql = %sql, binds = values.len(), "execute");
    let args = DB::arguments(values).map_err(DataError::Database)?;
    sqlx::query_with::<DB, _>(sql, args)
        .execute(executor)
        .await
        .map_err(|e| e.into_data_error())
}
