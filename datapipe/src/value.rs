use serde::{Deserialize, Serialize};

/// A value that can be bound to a statement placeholder.
///
/// Keys, filter operands and record fields all travel as `SqlValue` so the
/// query layer stays independent of any particular database driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Whether this is the zero value of its type.
    ///
    /// Partial updates skip zero-valued fields, and inserts omit a zero key so
    /// the store can assign one.
    pub fn is_zero(&self) -> bool {
        match self {
            SqlValue::Null => true,
            SqlValue::Bool(b) => !b,
            SqlValue::Int(i) => *i == 0,
            SqlValue::Float(f) => *f == 0.0,
            SqlValue::Text(s) => s.is_empty(),
            SqlValue::Bytes(b) => b.is_empty(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl std::fmt::Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{b}"),
            SqlValue::Int(i) => write!(f, "{i}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Text(s) => write!(f, "'{s}'"),
            SqlValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for SqlValue {
                fn from(v: $t) -> Self {
                    SqlValue::Int(v as i64)
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        SqlValue::Float(v as f64)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(v: &String) -> Self {
        SqlValue::Text(v.clone())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// JSON scalars map onto their SQL counterpart; arrays and objects are stored
/// as their JSON text.
impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => SqlValue::Null,
            serde_json::Value::Bool(b) => SqlValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Int(i),
                None => SqlValue::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => SqlValue::Text(s),
            other => SqlValue::Text(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        assert!(SqlValue::Null.is_zero());
        assert!(SqlValue::from(0i64).is_zero());
        assert!(SqlValue::from("").is_zero());
        assert!(SqlValue::from(false).is_zero());
        assert!(!SqlValue::from(7u32).is_zero());
        assert!(!SqlValue::from("x").is_zero());
    }

    #[test]
    fn test_from_option() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("a")), SqlValue::Text("a".into()));
    }

    #[test]
    fn test_from_json() {
        assert_eq!(SqlValue::from(serde_json::json!(3)), SqlValue::Int(3));
        assert_eq!(SqlValue::from(serde_json::json!(1.5)), SqlValue::Float(1.5));
        assert_eq!(
            SqlValue::from(serde_json::json!({"a": 1})),
            SqlValue::Text("{\"a\":1}".into())
        );
    }
}
