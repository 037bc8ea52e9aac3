use crate::query::QueryError;

/// Errors that can occur in the data layer.
#[derive(Debug)]
pub enum DataError {
    /// A single-row lookup (or a strict update) matched no row.
    NotFound(String),
    /// Any failure reported by the relational store, kept intact.
    Database(Box<dyn std::error::Error + Send + Sync>),
    /// The statement could not be built.
    Query(QueryError),
}

impl DataError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by backend crates (e.g. `datapipe-sqlx`) to wrap driver-specific errors.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound(_))
    }

    /// Borrow the driver error behind a `Database` variant.
    pub fn database_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            DataError::Database(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::NotFound(msg) => write!(f, "Not found: {msg}"),
            DataError::Database(err) => write!(f, "Database error: {err}"),
            DataError::Query(err) => write!(f, "Query error: {err}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(err.as_ref()),
            DataError::Query(err) => Some(err),
            DataError::NotFound(_) => None,
        }
    }
}

impl From<QueryError> for DataError {
    fn from(err: QueryError) -> Self {
        DataError::Query(err)
    }
}
