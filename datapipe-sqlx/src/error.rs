use datapipe::DataError;

/// Extension trait for converting `sqlx::Error` into `DataError`.
///
/// Due to Rust's orphan rules, we can't implement `From<sqlx::Error> for DataError`
/// in this crate. Use `.into_data_error()` instead. The original `sqlx::Error`
/// stays reachable through `DataError::database_error::<sqlx::Error>()`.
pub trait SqlxErrorExt {
    fn into_data_error(self) -> DataError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_data_error(self) -> DataError {
        match &self {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".into()),
            _ => DataError::database(self),
        }
    }
}

/// Convenience alias for data-layer results using `DataError`.
pub type SqlxResult<T> = Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(sqlx::Error::RowNotFound.into_data_error().is_not_found());
    }

    #[test]
    fn test_other_errors_kept_intact() {
        let err = sqlx::Error::PoolTimedOut.into_data_error();
        assert!(matches!(
            err.database_error::<sqlx::Error>(),
            Some(sqlx::Error::PoolTimedOut)
        ));
    }
}
