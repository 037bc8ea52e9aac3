use crate::query::QueryBuilder;
use std::fmt;
use std::sync::Arc;

/// Page size used when a request asks for fewer than one row per page.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// A composable modifier applied to the query session before execution.
///
/// Any `Fn(QueryBuilder) -> QueryBuilder` closure is a modifier.
pub trait QueryModifier: Send + Sync {
    fn apply(&self, query: QueryBuilder) -> QueryBuilder;
}

impl<F> QueryModifier for F
where
    F: Fn(QueryBuilder) -> QueryBuilder + Send + Sync,
{
    fn apply(&self, query: QueryBuilder) -> QueryBuilder {
        self(query)
    }
}

/// A shared, type-erased query modifier.
pub type Scope = Arc<dyn QueryModifier>;

/// Caller-supplied page index (1-based) and page size.
///
/// Values are kept as given; [`normalized`](Self::normalized) coerces them at
/// consumption time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self { page, per_page }
    }

    /// Coerce `page` up to 1 and a non-positive `per_page` to `default_size`.
    pub fn normalized(self, default_size: i64) -> Self {
        let default_size = if default_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            default_size
        };
        Self {
            page: self.page.max(1),
            per_page: if self.per_page < 1 {
                default_size
            } else {
                self.per_page
            },
        }
    }

    /// Row offset of the first item on this page. Call on a normalized request.
    ///
    /// Saturates at `i64::MAX`, so a page far past the end selects nothing.
    pub fn offset(&self) -> u64 {
        let skipped = self.page.saturating_sub(1).max(0);
        self.per_page.max(0).saturating_mul(skipped) as u64
    }
}

/// Optional directives for a list query.
///
/// # Example
///
/// ```ignore
/// let params = Params::new()
///     .with_page(2, 5)
///     .with_scope(|q: QueryBuilder| q.where_eq("sex", 1))
///     .with_scope(|q: QueryBuilder| q.order_by("id", false));
/// let list = source.get_list(&params).await?;
/// ```
#[derive(Clone, Default)]
pub struct Params {
    page: Option<PageRequest>,
    scopes: Vec<Scope>,
    count_field: Option<String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a page. Replaces any earlier page request.
    pub fn with_page(mut self, page: i64, per_page: i64) -> Self {
        self.page = Some(PageRequest::new(page, per_page));
        self
    }

    /// Append modifiers, keeping declaration order.
    pub fn with_scopes<I>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = Scope>,
    {
        self.scopes.extend(scopes);
        self
    }

    pub fn with_scope(mut self, scope: impl QueryModifier + 'static) -> Self {
        self.scopes.push(Arc::new(scope));
        self
    }

    /// Column counted by pagination; `*` when unset.
    pub fn with_count_field(mut self, field: &str) -> Self {
        self.count_field = Some(field.to_string());
        self
    }

    pub fn page(&self) -> Option<PageRequest> {
        self.page
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn count_field(&self) -> &str {
        self.count_field.as_deref().unwrap_or("*")
    }

    /// Fold every scope over `query`, left to right.
    pub fn apply_scopes(&self, query: QueryBuilder) -> QueryBuilder {
        self.scopes.iter().fold(query, |q, scope| scope.apply(q))
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Params")
            .field("page", &self.page)
            .field("scopes", &self.scopes.len())
            .field("count_field", &self.count_field)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_page() {
        for page in [-3, 0, 1] {
            assert_eq!(PageRequest::new(page, 5).normalized(DEFAULT_PAGE_SIZE).page, 1);
        }
        assert_eq!(PageRequest::new(4, 5).normalized(DEFAULT_PAGE_SIZE).page, 4);
    }

    #[test]
    fn test_normalize_per_page() {
        for size in [-1, 0] {
            let req = PageRequest::new(1, size).normalized(DEFAULT_PAGE_SIZE);
            assert_eq!(req.per_page, 20);
        }
        assert_eq!(PageRequest::new(1, 0).normalized(50).per_page, 50);
        assert_eq!(PageRequest::new(1, 0).normalized(0).per_page, DEFAULT_PAGE_SIZE);
        assert_eq!(PageRequest::new(1, 7).normalized(50).per_page, 7);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(2, 5).offset(), 5);
        assert_eq!(PageRequest::new(1, 5).offset(), 0);
    }

    #[test]
    fn test_offset_saturates_on_huge_page() {
        let req = PageRequest::new(i64::MAX, 5).normalized(DEFAULT_PAGE_SIZE);
        assert_eq!(req.offset(), i64::MAX as u64);
        let req = PageRequest::new(i64::MAX / 2, 4).normalized(DEFAULT_PAGE_SIZE);
        assert_eq!(req.offset(), i64::MAX as u64);
    }

    #[test]
    fn test_with_page_overwrites() {
        let params = Params::new().with_page(1, 10).with_page(3, 4);
        assert_eq!(params.page(), Some(PageRequest::new(3, 4)));
    }

    #[test]
    fn test_scopes_apply_in_order() {
        let params = Params::new()
            .with_scope(|q: QueryBuilder| q.where_eq("a", 1))
            .with_scopes(vec![
                Arc::new(|q: QueryBuilder| q.order_by("b", true)) as Scope,
                Arc::new(|q: QueryBuilder| q.select(&["a", "b"])) as Scope,
            ]);
        assert_eq!(params.scopes().len(), 3);
        let (sql, _) = params
            .apply_scopes(QueryBuilder::new("t"))
            .build_select()
            .unwrap();
        assert_eq!(sql, "SELECT a, b FROM t WHERE a = ? ORDER BY b ASC");
    }

    #[test]
    fn test_count_field_default() {
        assert_eq!(Params::new().count_field(), "*");
        assert_eq!(Params::new().with_count_field("id").count_field(), "id");
    }
}
