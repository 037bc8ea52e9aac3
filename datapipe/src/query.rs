use crate::value::SqlValue;
use serde::{Deserialize, Serialize};

/// SQL flavour a statement is rendered for.
///
/// # Example
///
/// ```ignore
/// let q = QueryBuilder::new("users")
///     .where_eq("email", "a@b.com")
///     .where_like("nickname", "%alice%")
///     .order_by("id", true)
///     .limit(10);
/// let (sql, values) = q.build_select()?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Generic SQL using `?` placeholders (default).
    Generic,
    /// SQLite-style `?` placeholders.
    Sqlite,
    /// MySQL-style `?` placeholders with backtick quoting.
    MySql,
    /// Postgres-style `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierPolicy {
    /// Do not validate or quote identifiers. Projections may hold expressions.
    #[default]
    Raw,
    /// Validate identifiers against a conservative pattern.
    Validate,
    /// Validate and quote identifiers using the dialect quoting style.
    Quote,
}

impl std::str::FromStr for IdentifierPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(IdentifierPolicy::Raw),
            "validate" => Ok(IdentifierPolicy::Validate),
            "quote" => Ok(IdentifierPolicy::Quote),
            other => Err(format!("unknown identifier policy '{other}'")),
        }
    }
}

/// An isolated, value-typed query session bound to one table.
///
/// Every data-source call starts from a fresh builder, so scopes never see
/// state left behind by another call.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    columns: Vec<String>,
    conditions: Vec<Condition>,
    order: Vec<(String, bool)>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
    dialect: Dialect,
    identifier_policy: IdentifierPolicy,
}

#[derive(Debug, Clone)]
enum Condition {
    Compare(String, &'static str, SqlValue),
    In(String, Vec<SqlValue>),
    IsNull(String),
    IsNotNull(String),
    Raw(String, Vec<SqlValue>),
}

impl QueryBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            conditions: Vec::new(),
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
            dialect: Dialect::Generic,
            identifier_policy: IdentifierPolicy::Raw,
        }
    }

    /// Create a new builder with an explicit SQL dialect.
    pub fn new_with_dialect(table: &str, dialect: Dialect) -> Self {
        Self::new(table).dialect(dialect)
    }

    /// Set the SQL dialect (affects placeholder style and quoting).
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Configure identifier validation/quoting behavior.
    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Replace the projection. An empty projection selects `*`.
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn where_eq(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.compare(column, "=", value.into())
    }

    pub fn where_not_eq(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.compare(column, "!=", value.into())
    }

    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.compare(column, "LIKE", pattern.into())
    }

    pub fn where_gt(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.compare(column, ">", value.into())
    }

    pub fn where_gte(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.compare(column, ">=", value.into())
    }

    pub fn where_lt(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.compare(column, "<", value.into())
    }

    pub fn where_lte(self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.compare(column, "<=", value.into())
    }

    pub fn where_in<V: Into<SqlValue>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.conditions.push(Condition::In(
            column.to_string(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn where_null(mut self, column: &str) -> Self {
        self.conditions.push(Condition::IsNull(column.to_string()));
        self
    }

    pub fn where_not_null(mut self, column: &str) -> Self {
        self.conditions.push(Condition::IsNotNull(column.to_string()));
        self
    }

    /// Add a raw SQL predicate. Each `?` in `fragment` consumes one value and
    /// is rewritten to the dialect's placeholder style. The fragment is not
    /// validated; never build it from user input.
    pub fn where_raw(mut self, fragment: &str, values: Vec<SqlValue>) -> Self {
        self.conditions
            .push(Condition::Raw(fragment.to_string(), values));
        self
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_val = Some(offset);
        self
    }

    fn compare(mut self, column: &str, op: &'static str, value: SqlValue) -> Self {
        self.conditions
            .push(Condition::Compare(column.to_string(), op, value));
        self
    }

    /// Build a SELECT query returning `(sql, bind_values)`.
    pub fn build_select(&self) -> Result<(String, Vec<SqlValue>), QueryError> {
        let mut w = Writer::new(self);
        w.push_select()?;
        Ok(w.finish())
    }

    /// Build a COUNT over this query wrapped as a subquery.
    ///
    /// The inner statement is exactly what [`build_select`](Self::build_select)
    /// renders, so the count agrees with the rows a fetch would see.
    pub fn build_count(&self, field: &str) -> Result<(String, Vec<SqlValue>), QueryError> {
        let field = self.format_identifier(field, true, "column")?;
        let mut w = Writer::new(self);
        w.sql.push_str(&format!("SELECT COUNT({field}) FROM ("));
        w.push_select()?;
        w.sql.push_str(") AS paged_rows");
        Ok(w.finish())
    }

    /// Build an INSERT of the given column values.
    pub fn build_insert(&self, values: Vec<(String, SqlValue)>) -> Result<(String, Vec<SqlValue>), QueryError> {
        let table = self.format_identifier(&self.table, false, "table")?;
        let mut w = Writer::new(self);
        if values.is_empty() {
            match self.dialect {
                Dialect::MySql => w.sql.push_str(&format!("INSERT INTO {table} () VALUES ()")),
                _ => w.sql.push_str(&format!("INSERT INTO {table} DEFAULT VALUES")),
            }
            return Ok(w.finish());
        }
        let mut columns = Vec::with_capacity(values.len());
        let mut placeholders = Vec::with_capacity(values.len());
        for (col, val) in values {
            columns.push(self.format_identifier(&col, false, "column")?);
            placeholders.push(w.bind(val));
        }
        w.sql.push_str(&format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        ));
        Ok(w.finish())
    }

    /// Build an INSERT that hands back the stored row in the selected columns.
    ///
    /// Only for stores that accept `RETURNING` (SQLite 3.35+, PostgreSQL).
    pub fn build_insert_returning(
        &self,
        values: Vec<(String, SqlValue)>,
    ) -> Result<(String, Vec<SqlValue>), QueryError> {
        let (mut sql, params) = self.build_insert(values)?;
        sql.push_str(" RETURNING ");
        sql.push_str(&self.projection()?);
        Ok((sql, params))
    }

    /// Build an UPDATE setting the given columns on every row matching the filters.
    pub fn build_update(&self, sets: Vec<(String, SqlValue)>) -> Result<(String, Vec<SqlValue>), QueryError> {
        if sets.is_empty() {
            return Err(QueryError::EmptyUpdate);
        }
        let table = self.format_identifier(&self.table, false, "table")?;
        let mut w = Writer::new(self);
        let mut assignments = Vec::with_capacity(sets.len());
        for (col, val) in sets {
            let col = self.format_identifier(&col, false, "column")?;
            let placeholder = w.bind(val);
            assignments.push(format!("{col} = {placeholder}"));
        }
        w.sql
            .push_str(&format!("UPDATE {table} SET {}", assignments.join(", ")));
        w.push_where()?;
        Ok(w.finish())
    }

    /// Build a DELETE of every row matching the filters.
    pub fn build_delete(&self) -> Result<(String, Vec<SqlValue>), QueryError> {
        let table = self.format_identifier(&self.table, false, "table")?;
        let mut w = Writer::new(self);
        w.sql.push_str(&format!("DELETE FROM {table}"));
        w.push_where()?;
        Ok(w.finish())
    }

    fn projection(&self) -> Result<String, QueryError> {
        if self.columns.is_empty() {
            return Ok("*".to_string());
        }
        let mut out = Vec::with_capacity(self.columns.len());
        for col in &self.columns {
            out.push(self.format_identifier(col, true, "column")?);
        }
        Ok(out.join(", "))
    }

    fn format_identifier(
        &self,
        ident: &str,
        allow_star: bool,
        kind: &'static str,
    ) -> Result<String, QueryError> {
        if let IdentifierPolicy::Raw = self.identifier_policy {
            return Ok(ident.to_string());
        }
        if !is_valid_identifier(ident, allow_star) {
            return Err(QueryError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        match self.identifier_policy {
            IdentifierPolicy::Quote => Ok(quote_identifier(ident, self.dialect, allow_star)),
            IdentifierPolicy::Raw | IdentifierPolicy::Validate => Ok(ident.to_string()),
        }
    }
}

/// Accumulates SQL text and bind values, numbering placeholders as it goes.
struct Writer<'a> {
    query: &'a QueryBuilder,
    sql: String,
    params: Vec<SqlValue>,
}

impl<'a> Writer<'a> {
    fn new(query: &'a QueryBuilder) -> Self {
        Self {
            query,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn bind(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        self.query.dialect.placeholder(self.params.len())
    }

    fn finish(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }

    fn push_select(&mut self) -> Result<(), QueryError> {
        let q = self.query;
        let table = q.format_identifier(&q.table, false, "table")?;
        let columns = q.projection()?;
        self.sql.push_str(&format!("SELECT {columns} FROM {table}"));
        self.push_where()?;
        self.push_order()?;
        if let Some(limit) = q.limit_val {
            self.sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = q.offset_val {
            self.sql.push_str(&format!(" OFFSET {offset}"));
        }
        Ok(())
    }

    fn push_where(&mut self) -> Result<(), QueryError> {
        let q = self.query;
        if q.conditions.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(q.conditions.len());
        for cond in &q.conditions {
            let clause = match cond {
                Condition::Compare(col, op, val) => {
                    let col = q.format_identifier(col, false, "column")?;
                    let placeholder = self.bind(val.clone());
                    format!("{col} {op} {placeholder}")
                }
                Condition::In(col, vals) => {
                    let col = q.format_identifier(col, false, "column")?;
                    if vals.is_empty() {
                        // Nothing can match an empty set.
                        "1 = 0".to_string()
                    } else {
                        let placeholders: Vec<_> =
                            vals.iter().map(|v| self.bind(v.clone())).collect();
                        format!("{col} IN ({})", placeholders.join(", "))
                    }
                }
                Condition::IsNull(col) => {
                    format!("{} IS NULL", q.format_identifier(col, false, "column")?)
                }
                Condition::IsNotNull(col) => {
                    format!("{} IS NOT NULL", q.format_identifier(col, false, "column")?)
                }
                Condition::Raw(fragment, vals) => format!("({})", self.expand_raw(fragment, vals)?),
            };
            clauses.push(clause);
        }
        self.sql.push_str(" WHERE ");
        self.sql.push_str(&clauses.join(" AND "));
        Ok(())
    }

    fn expand_raw(&mut self, fragment: &str, vals: &[SqlValue]) -> Result<String, QueryError> {
        let expected = fragment.matches('?').count();
        if expected != vals.len() {
            return Err(QueryError::PlaceholderMismatch {
                expected,
                got: vals.len(),
            });
        }
        let mut out = String::with_capacity(fragment.len());
        let mut vals = vals.iter();
        for c in fragment.chars() {
            if c != '?' {
                out.push(c);
                continue;
            }
            if let Some(val) = vals.next() {
                let placeholder = self.bind(val.clone());
                out.push_str(&placeholder);
            }
        }
        Ok(out)
    }

    fn push_order(&mut self) -> Result<(), QueryError> {
        let q = self.query;
        if q.order.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(q.order.len());
        for (col, asc) in &q.order {
            let col = q.format_identifier(col, false, "column")?;
            clauses.push(format!("{col} {}", if *asc { "ASC" } else { "DESC" }));
        }
        self.sql.push_str(" ORDER BY ");
        self.sql.push_str(&clauses.join(", "));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
    /// A raw predicate's `?` count disagrees with the values supplied.
    PlaceholderMismatch { expected: usize, got: usize },
    EmptyUpdate,
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
            QueryError::PlaceholderMismatch { expected, got } => {
                write!(f, "Raw predicate expects {expected} values, got {got}")
            }
            QueryError::EmptyUpdate => write!(f, "Update has no columns to set"),
        }
    }
}

impl std::error::Error for QueryError {}

fn is_valid_identifier(ident: &str, allow_star: bool) -> bool {
    if ident.is_empty() {
        return false;
    }
    let parts: Vec<&str> = ident.split('.').collect();
    for (idx, part) in parts.iter().enumerate() {
        if allow_star && *part == "*" {
            return idx + 1 == parts.len();
        }
        if !is_valid_segment(part) {
            return false;
        }
    }
    true
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(ident: &str, dialect: Dialect, allow_star: bool) -> String {
    let quote = dialect.quote_char();
    let parts: Vec<&str> = ident.split('.').collect();
    let last_idx = parts.len().saturating_sub(1);
    parts
        .into_iter()
        .enumerate()
        .map(|(idx, part)| {
            if allow_star && part == "*" && idx == last_idx {
                part.to_string()
            } else {
                format!("{quote}{part}{quote}")
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_select() {
        let (sql, params) = QueryBuilder::new("users").build_select().unwrap();
        assert_eq!(sql, "SELECT * FROM users");
        assert!(params.is_empty());
    }

    #[test]
    fn test_where_eq() {
        let (sql, params) = QueryBuilder::new("users")
            .where_eq("email", "a@b.com")
            .build_select()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE email = ?");
        assert_eq!(params, vec![SqlValue::Text("a@b.com".into())]);
    }

    #[test]
    fn test_complex_query() {
        let (sql, params) = QueryBuilder::new("users")
            .select(&["id", "nickname"])
            .where_eq("status", "active")
            .where_like("nickname", "%alice%")
            .where_gte("age", 18)
            .order_by("id", true)
            .limit(10)
            .offset(20)
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT id, nickname FROM users WHERE status = ? AND nickname LIKE ? AND age >= ? ORDER BY id ASC LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            params,
            vec![
                SqlValue::Text("active".into()),
                SqlValue::Text("%alice%".into()),
                SqlValue::Int(18)
            ]
        );
    }

    #[test]
    fn test_count_wraps_scoped_select() {
        let (sql, params) = QueryBuilder::new("users")
            .where_eq("sex", 1)
            .order_by("id", false)
            .build_count("*")
            .unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM (SELECT * FROM users WHERE sex = ? ORDER BY id DESC) AS paged_rows"
        );
        assert_eq!(params, vec![SqlValue::Int(1)]);
    }

    #[test]
    fn test_postgres_placeholders() {
        let (sql, params) = QueryBuilder::new_with_dialect("users", Dialect::Postgres)
            .where_eq("status", "active")
            .where_in("role", ["admin", "user"])
            .where_raw("age BETWEEN ? AND ?", vec![18.into(), 65.into()])
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE status = $1 AND role IN ($2, $3) AND (age BETWEEN $4 AND $5)"
        );
        assert_eq!(params.len(), 5);
    }

    #[test]
    fn test_empty_in_matches_nothing() {
        let (sql, params) = QueryBuilder::new("users")
            .where_in("id", Vec::<i64>::new())
            .build_select()
            .unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE 1 = 0");
        assert!(params.is_empty());
    }

    #[test]
    fn test_raw_placeholder_mismatch() {
        let err = QueryBuilder::new("users")
            .where_raw("a = ? AND b = ?", vec![1.into()])
            .build_select()
            .unwrap_err();
        assert_eq!(err, QueryError::PlaceholderMismatch { expected: 2, got: 1 });
    }

    #[test]
    fn test_insert_update_delete() {
        let q = QueryBuilder::new_with_dialect("users", Dialect::Postgres);
        let (sql, params) = q
            .build_insert(vec![
                ("nickname".into(), "bob".into()),
                ("sex".into(), 1.into()),
            ])
            .unwrap();
        assert_eq!(sql, "INSERT INTO users (nickname, sex) VALUES ($1, $2)");
        assert_eq!(params.len(), 2);

        let (sql, params) = q
            .clone()
            .where_eq("id", 7)
            .build_update(vec![("nickname".into(), "bob".into())])
            .unwrap();
        assert_eq!(sql, "UPDATE users SET nickname = $1 WHERE id = $2");
        assert_eq!(params, vec![SqlValue::Text("bob".into()), SqlValue::Int(7)]);

        let (sql, _) = q.where_eq("id", 7).build_delete().unwrap();
        assert_eq!(sql, "DELETE FROM users WHERE id = $1");
    }

    #[test]
    fn test_insert_defaults() {
        let (sql, _) = QueryBuilder::new("t").build_insert(Vec::new()).unwrap();
        assert_eq!(sql, "INSERT INTO t DEFAULT VALUES");
        let (sql, _) = QueryBuilder::new_with_dialect("t", Dialect::MySql)
            .build_insert(Vec::new())
            .unwrap();
        assert_eq!(sql, "INSERT INTO t () VALUES ()");
    }

    #[test]
    fn test_insert_returning_projection() {
        let q = QueryBuilder::new_with_dialect("users", Dialect::Postgres);
        let (sql, params) = q
            .clone()
            .select(&["id", "nickname"])
            .build_insert_returning(vec![("nickname".into(), "bob".into())])
            .unwrap();
        assert_eq!(sql, "INSERT INTO users (nickname) VALUES ($1) RETURNING id, nickname");
        assert_eq!(params.len(), 1);

        let (sql, _) = q.build_insert_returning(Vec::new()).unwrap();
        assert_eq!(sql, "INSERT INTO users DEFAULT VALUES RETURNING *");
    }

    #[test]
    fn test_empty_update_rejected() {
        let err = QueryBuilder::new("users").build_update(Vec::new()).unwrap_err();
        assert_eq!(err, QueryError::EmptyUpdate);
    }

    #[test]
    fn test_quoted_identifiers() {
        let (sql, params) = QueryBuilder::new("users")
            .dialect(Dialect::Postgres)
            .identifier_policy(IdentifierPolicy::Quote)
            .select(&["users.id", "users.email"])
            .where_eq("users.email", "a@b.com")
            .order_by("users.id", true)
            .build_select()
            .unwrap();
        assert_eq!(
            sql,
            "SELECT \"users\".\"id\", \"users\".\"email\" FROM \"users\" WHERE \"users\".\"email\" = $1 ORDER BY \"users\".\"id\" ASC"
        );
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_validated_invalid_identifier() {
        let err = QueryBuilder::new("users;drop")
            .identifier_policy(IdentifierPolicy::Validate)
            .build_select()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidIdentifier { kind: "table", .. }));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Quote".parse::<IdentifierPolicy>().unwrap(), IdentifierPolicy::Quote);
        assert!("loud".parse::<IdentifierPolicy>().is_err());
    }
}
