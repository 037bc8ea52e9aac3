use crate::backend::Backend;
use crate::exec;
use datapipe::{DataError, PageMeta, PageRequest, QueryBuilder};
use sqlx::{ColumnIndex, Database, Decode, Executor, FromRow, IntoArguments, Type};

/// Fetch one page of `query` together with the total number of matching rows.
///
/// The request is normalized first (`page < 1` becomes 1, `per_page < 1`
/// becomes `default_page_size`). The total comes from counting `count_field`
/// over `query` wrapped as a subquery, so scopes narrow the total exactly as
/// they narrow the page. A failed count aborts before the page is fetched.
///
/// Both statements run on `conn`. Unless `conn` is inside a transaction the
/// total may be stale under concurrent writes.
pub async fn paginate<T, DB>(
    conn: &mut DB::Connection,
    query: &QueryBuilder,
    request: PageRequest,
    default_page_size: i64,
    count_field: &str,
) -> Result<(Vec<T>, PageMeta), DataError>
where
    DB: Backend,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    for<'q> <DB as Database>::Arguments<'q>: IntoArguments<'q, DB>,
    T: for<'r> FromRow<'r, DB::Row> + Send + Unpin,
    i64: Type<DB> + for<'r> Decode<'r, DB>,
    usize: ColumnIndex<DB::Row>,
{
    let request = request.normalized(default_page_size);
    let total = exec::count::<DB, _>(&mut *conn, query, count_field).await?;

    let page_query = query
        .clone()
        .limit(request.per_page as u64)
        .offset(request.offset());
    let items = exec::fetch_all::<T, DB, _>(&mut *conn, &page_query).await?;

    let meta = PageMeta::new(request.page, request.per_page, total);
    tracing::debug!(page = meta.page, per_page = meta.per_page, total = meta.total, "page fetched");
    Ok((items, meta))
}
