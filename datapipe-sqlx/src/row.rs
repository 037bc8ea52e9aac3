use datapipe::{Record, SqlValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// An untyped row: column name to JSON value.
///
/// Use it with [`SqlxDataSource::for_table`](crate::SqlxDataSource::for_table)
/// when a table has no Rust type of its own. Rows decode on every enabled
/// backend; values outside integers, floats, bool, bytes and text only decode
/// on SQLite, where they arrive as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonRow(pub Map<String, Value>);

impl JsonRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.0.insert(column.to_string(), value.into());
        self
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl Record for JsonRow {
    fn values(&self) -> Vec<(Cow<'_, str>, SqlValue)> {
        self.0
            .iter()
            .map(|(k, v)| (Cow::Borrowed(k.as_str()), SqlValue::from(v.clone())))
            .collect()
    }
}

/// Implements `FromRow` for [`JsonRow`] on one driver's row type. `$decode`
/// maps the runtime type name `$kind` of a non-NULL value at `$idx` to JSON.
#[allow(unused_macros)]
macro_rules! impl_json_from_row {
    ($row_ty:ty, |$row:ident, $idx:ident, $kind:ident| $decode:expr) => {
        impl<'r> sqlx::FromRow<'r, $row_ty> for JsonRow {
            fn from_row($row: &'r $row_ty) -> Result<Self, sqlx::Error> {
                use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};

                let mut map = Map::new();
                for column in $row.columns() {
                    let $idx = column.ordinal();
                    let raw = $row.try_get_raw($idx)?;
                    let value = if raw.is_null() {
                        Value::Null
                    } else {
                        let $kind = raw.type_info().name().to_string();
                        $decode
                    };
                    map.insert(column.name().to_string(), value);
                }
                Ok(JsonRow(map))
            }
        }
    };
}

// SQLite reports the storage class of each value.
#[cfg(feature = "sqlite")]
impl_json_from_row!(sqlx::sqlite::SqliteRow, |row, idx, kind| match kind.as_str() {
    "INTEGER" | "BOOLEAN" => Value::from(row.try_get::<i64, _>(idx)?),
    "REAL" | "NUMERIC" => Value::from(row.try_get::<f64, _>(idx)?),
    "BLOB" => Value::from(row.try_get::<Vec<u8>, _>(idx)?),
    _ => Value::from(row.try_get::<String, _>(idx)?),
});

// Column types outside integers, floats, bool, bytes and text fail to decode.
#[cfg(feature = "postgres")]
impl_json_from_row!(sqlx::postgres::PgRow, |row, idx, kind| match kind.as_str() {
    "INT2" => Value::from(row.try_get::<i16, _>(idx)?),
    "INT4" => Value::from(row.try_get::<i32, _>(idx)?),
    "INT8" => Value::from(row.try_get::<i64, _>(idx)?),
    "FLOAT4" => Value::from(row.try_get::<f32, _>(idx)?),
    "FLOAT8" => Value::from(row.try_get::<f64, _>(idx)?),
    "BOOL" => Value::from(row.try_get::<bool, _>(idx)?),
    "BYTEA" => Value::from(row.try_get::<Vec<u8>, _>(idx)?),
    _ => Value::from(row.try_get::<String, _>(idx)?),
});

#[cfg(feature = "mysql")]
impl_json_from_row!(sqlx::mysql::MySqlRow, |row, idx, kind| match kind.as_str() {
    "BOOLEAN" => Value::from(row.try_get::<bool, _>(idx)?),
    "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
        Value::from(row.try_get::<i64, _>(idx)?)
    }
    k if k.ends_with(" UNSIGNED") => Value::from(row.try_get::<u64, _>(idx)?),
    "FLOAT" => Value::from(row.try_get::<f32, _>(idx)?),
    "DOUBLE" => Value::from(row.try_get::<f64, _>(idx)?),
    "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
        Value::from(row.try_get::<Vec<u8>, _>(idx)?)
    }
    _ => Value::from(row.try_get::<String, _>(idx)?),
});

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_values() {
        let row = JsonRow::new().with("nickname", "bob").with("sex", 1);
        let values = row.values();
        assert!(values.contains(&(Cow::Borrowed("nickname"), SqlValue::Text("bob".into()))));
        assert!(values.contains(&(Cow::Borrowed("sex"), SqlValue::Int(1))));
    }

    #[test]
    fn test_serializes_as_object() {
        let row = JsonRow::new().with("id", 3);
        assert_eq!(serde_json::to_value(&row).unwrap(), json!({"id": 3}));
    }
}
