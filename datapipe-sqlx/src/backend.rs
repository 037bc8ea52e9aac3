use datapipe::{Dialect, SqlValue};
use sqlx::error::BoxDynError;
use sqlx::{Arguments, Database};

/// A database driver the data source can talk to.
///
/// Supplies the SQL dialect, turns [`SqlValue`]s into driver arguments, and
/// reads write results, none of which `sqlx::Database` exposes generically.
pub trait Backend: Database {
    const DIALECT: Dialect;

    /// Whether `INSERT ... RETURNING` hands back the stored row.
    const RETURNING: bool;

    fn arguments<'q>(values: Vec<SqlValue>) -> Result<<Self as Database>::Arguments<'q>, BoxDynError>;

    fn rows_affected(result: &<Self as Database>::QueryResult) -> u64;

    /// Key assigned by the last auto-increment insert, where the driver reports one.
    fn last_insert_id(result: &<Self as Database>::QueryResult) -> Option<i64>;
}

#[allow(unused_macros)]
macro_rules! impl_backend {
    ($db:ty, $dialect:expr, returning = $returning:expr, |$result:ident| $last_id:expr) => {
        impl Backend for $db {
            const DIALECT: Dialect = $dialect;
            const RETURNING: bool = $returning;

            fn arguments<'q>(
                values: Vec<SqlValue>,
            ) -> Result<<Self as Database>::Arguments<'q>, BoxDynError> {
                let mut args: <Self as Database>::Arguments<'q> = Default::default();
                for value in values {
                    match value {
                        SqlValue::Null => args.add(None::<String>)?,
                        SqlValue::Bool(v) => args.add(v)?,
                        SqlValue::Int(v) => args.add(v)?,
                        SqlValue::Float(v) => args.add(v)?,
                        SqlValue::Text(v) => args.add(v)?,
                        SqlValue::Bytes(v) => args.add(v)?,
                    }
                }
                Ok(args)
            }

            fn rows_affected(result: &<Self as Database>::QueryResult) -> u64 {
                result.rows_affected()
            }

            fn last_insert_id($result: &<Self as Database>::QueryResult) -> Option<i64> {
                $last_id
            }
        }
    };
}

#[cfg(feature = "sqlite")]
impl_backend!(sqlx::Sqlite, Dialect::Sqlite, returning = true, |result| {
    Some(result.last_insert_rowid())
});

#[cfg(feature = "postgres")]
impl_backend!(sqlx::Postgres, Dialect::Postgres, returning = true, |_result| None);

#[cfg(feature = "mysql")]
impl_backend!(sqlx::MySql, Dialect::MySql, returning = false, |result| {
    i64::try_from(result.last_insert_id()).ok().filter(|id| *id > 0)
});
