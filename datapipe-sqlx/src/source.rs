use crate::backend::Backend;
use crate::error::SqlxErrorExt;
use crate::exec;
use crate::pagination::paginate;
use datapipe::{
    DataError, DataSource, DataSourceConfig, Entity, Params, QueryBuilder, Record, SimpleDataList,
    SqlValue,
};
use sqlx::{ColumnIndex, Database, Decode, Executor, FromRow, IntoArguments, Pool, Type};
use std::marker::PhantomData;

/// A [`DataSource`] over an `sqlx::Pool<DB>`, bound to one table.
///
/// The binding (table, key column, projection, config) is fixed once the
/// source is built. Every call starts a fresh [`QueryBuilder`] session, so a
/// source can be cloned and shared freely across tasks.
///
/// # Example
///
/// ```ignore
/// let users = SqlxDataSource::<User, i64, Sqlite>::for_entity(pool.clone());
/// let page = users.get_list(&Params::new().with_page(2, 5)).await?;
///
/// let raw = SqlxDataSource::<JsonRow, i64, Sqlite>::for_table(pool, "user")
///     .with_key_column("uid");
/// ```
pub struct SqlxDataSource<T, K, DB: Database> {
    pool: Pool<DB>,
    table: String,
    key_column: String,
    columns: &'static [&'static str],
    config: DataSourceConfig,
    _marker: PhantomData<fn() -> (T, K)>,
}

impl<T: Entity, DB: Database> SqlxDataSource<T, T::Key, DB> {
    /// Bind to the table, key column and columns declared by `T`.
    pub fn for_entity(pool: Pool<DB>) -> Self {
        Self {
            pool,
            table: T::table_name().to_string(),
            key_column: T::key_column().to_string(),
            columns: T::columns(),
            config: DataSourceConfig::default(),
            _marker: PhantomData,
        }
    }
}

impl<T, K, DB: Database> SqlxDataSource<T, K, DB> {
    /// Bind to a named table keyed by `id`, selecting every column.
    pub fn for_table(pool: Pool<DB>, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
            key_column: "id".to_string(),
            columns: &[],
            config: DataSourceConfig::default(),
            _marker: PhantomData,
        }
    }

    pub fn with_key_column(mut self, column: &str) -> Self {
        self.key_column = column.to_string();
        self
    }

    pub fn with_config(mut self, config: DataSourceConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &Pool<DB> {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }
}

impl<T, K, DB: Backend> SqlxDataSource<T, K, DB> {
    /// Open a fresh query session for the bound table.
    pub fn query(&self) -> QueryBuilder {
        QueryBuilder::new(&self.table)
            .dialect(DB::DIALECT)
            .identifier_policy(self.config.identifier_policy)
            .select(self.columns)
    }

    fn key_query(&self, key: &K) -> QueryBuilder
    where
        K: Into<SqlValue> + Clone,
    {
        self.query().where_eq(&self.key_column, key.clone())
    }

    fn not_found(&self, key: &K) -> DataError
    where
        K: Into<SqlValue> + Clone,
    {
        self.missing(&key.clone().into())
    }

    fn missing(&self, key: &SqlValue) -> DataError {
        DataError::NotFound(format!("{} with {} = {key}", self.table, self.key_column))
    }
}

impl<T, K, DB: Database> Clone for SqlxDataSource<T, K, DB> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            table: self.table.clone(),
            key_column: self.key_column.clone(),
            columns: self.columns,
            config: self.config.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T, K, DB> DataSource<T, K> for SqlxDataSource<T, K, DB>
where
    DB: Backend,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
    T: for<'r> FromRow<'r, DB::Row> + Record + Send + Unpin + 'static,
    K: Into<SqlValue> + Clone + Send + Sync,
    i64: Type<DB> + for<'r> Decode<'r, DB>,
    usize: ColumnIndex<DB::Row>,
{
    async fn get_list(&self, params: &Params) -> Result<SimpleDataList<T>, DataError> {
        let query = params.apply_scopes(self.query());

        let Some(request) = params.page() else {
            let items = exec::fetch_all::<T, DB, _>(&self.pool, &query).await?;
            return Ok(SimpleDataList::new(items));
        };

        let default_size = self.config.default_page_size;
        let (items, meta) = if self.config.consistent_pagination {
            let mut tx = self.pool.begin().await.map_err(|e| e.into_data_error())?;
            let page =
                paginate::<T, DB>(&mut *tx, &query, request, default_size, params.count_field())
                    .await?;
            tx.commit().await.map_err(|e| e.into_data_error())?;
            page
        } else {
            let mut conn = self.pool.acquire().await.map_err(|e| e.into_data_error())?;
            paginate::<T, DB>(&mut *conn, &query, request, default_size, params.count_field())
                .await?
        };
        Ok(SimpleDataList::paged(items, meta))
    }

    async fn get_item(&self, key: &K) -> Result<T, DataError> {
        let query = self.key_query(key).limit(1);
        exec::fetch_optional::<T, DB, _>(&self.pool, &query)
            .await?
            .ok_or_else(|| self.not_found(key))
    }

    async fn store(&self, item: &T) -> Result<T, DataError> {
        // A zero key is left out so the store can assign one.
        let mut key = None;
        let values: Vec<(String, SqlValue)> = item
            .values()
            .into_iter()
            .filter_map(|(col, val)| {
                if &*col == self.key_column.as_str() {
                    if val.is_zero() {
                        return None;
                    }
                    key = Some(val.clone());
                }
                Some((col.into_owned(), val))
            })
            .collect();

        if DB::RETURNING {
            let (sql, values) = self.query().build_insert_returning(values)?;
            return exec::fetch_one_sql::<T, DB, _>(&self.pool, &sql, values).await;
        }

        let (sql, values) = self.query().build_insert(values)?;
        let result = exec::execute::<DB, _>(&self.pool, &sql, values).await?;
        // No RETURNING: read the row back by its given or assigned key.
        let key = key
            .or_else(|| DB::last_insert_id(&result).map(SqlValue::Int))
            .unwrap_or(SqlValue::Null);
        let query = self.query().where_eq(&self.key_column, key.clone()).limit(1);
        exec::fetch_optional::<T, DB, _>(&self.pool, &query)
            .await?
            .ok_or_else(|| self.missing(&key))
    }

    async fn update(&self, key: &K, item: &T) -> Result<(), DataError> {
        let sets: Vec<(String, SqlValue)> = item
            .values()
            .into_iter()
            .filter(|(col, val)| &**col != self.key_column.as_str() && !val.is_zero())
            .map(|(col, val)| (col.into_owned(), val))
            .collect();

        if sets.is_empty() {
            tracing::debug!(table = %self.table, "update has no non-zero fields, skipping");
            if self.config.strict_update {
                let found = exec::count::<DB, _>(&self.pool, &self.key_query(key), "*").await?;
                if found == 0 {
                    return Err(self.not_found(key));
                }
            }
            return Ok(());
        }

        let (sql, values) = self.key_query(key).build_update(sets)?;
        let result = exec::execute::<DB, _>(&self.pool, &sql, values).await?;
        if DB::rows_affected(&result) == 0 && self.config.strict_update {
            return Err(self.not_found(key));
        }
        Ok(())
    }

    async fn delete(&self, key: &K) -> Result<(), DataError> {
        let (sql, values) = self.key_query(key).build_delete()?;
        exec::execute::<DB, _>(&self.pool, &sql, values).await?;
        Ok(())
    }
}
