use crate::value::SqlValue;
use std::borrow::Cow;

/// Something that can be written to a table as a set of column values.
///
/// The pairs are ordered; inserts and updates emit columns in this order.
pub trait Record: Send + Sync {
    fn values(&self) -> Vec<(Cow<'_, str>, SqlValue)>;
}

/// Trait representing a database entity with a table name, key column, and column list.
///
/// Implementing it binds a type to its table so a data source can be built
/// with no further configuration.
///
/// # Example
///
/// ```ignore
/// impl Record for User {
///     fn values(&self) -> Vec<(Cow<'_, str>, SqlValue)> {
///         vec![
///             ("id".into(), self.id.into()),
///             ("nickname".into(), (&self.nickname).into()),
///         ]
///     }
/// }
///
/// impl Entity for User {
///     type Key = i64;
///     fn table_name() -> &'static str { "users" }
///     fn columns() -> &'static [&'static str] { &["id", "nickname"] }
///     fn key(&self) -> i64 { self.id }
/// }
/// ```
pub trait Entity: Record + 'static {
    type Key: Into<SqlValue> + Clone + Send + Sync + 'static;

    fn table_name() -> &'static str;

    fn key_column() -> &'static str {
        "id"
    }

    fn columns() -> &'static [&'static str];

    fn key(&self) -> Self::Key;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::marker::PhantomPinned;

    struct Pinned {
        name: String,
        _pin: PhantomPinned,
    }

    impl Record for Pinned {
        fn values(&self) -> Vec<(Cow<'_, str>, SqlValue)> {
            vec![("name".into(), (&self.name).into())]
        }
    }

    #[test]
    fn test_record_need_not_be_unpin() {
        let row = Pinned {
            name: "a".into(),
            _pin: PhantomPinned,
        };
        assert_eq!(row.values(), vec![(Cow::Borrowed("name"), SqlValue::Text("a".into()))]);
    }
}
