use serde::Serialize;

/// Pagination metadata describing a result set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub per_page: i64,
    /// Rows matching the filters before pagination.
    pub total: i64,
}

impl PageMeta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page,
            per_page,
            total,
        }
    }

    pub fn total_pages(&self) -> i64 {
        if self.per_page <= 0 {
            0
        } else {
            self.total / self.per_page + i64::from(self.total % self.per_page > 0)
        }
    }
}

/// Anything exposing an ordered sequence of items.
pub trait DataList<T> {
    fn items(&self) -> &[T];
}

/// A list that also knows which page it is.
pub trait PagedDataList<T>: DataList<T> {
    fn page_meta(&self) -> PageMeta;
}

/// Items plus page metadata, as returned by `DataSource::get_list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleDataList<T> {
    items: Vec<T>,
    meta: PageMeta,
}

impl<T> SimpleDataList<T> {
    /// Wrap a complete result set: one page holding everything.
    pub fn new(items: Vec<T>) -> Self {
        let len = items.len() as i64;
        Self::paged(items, PageMeta::new(1, len, len))
    }

    pub fn paged(items: Vec<T>, meta: PageMeta) -> Self {
        Self { items, meta }
    }

    pub fn meta(&self) -> &PageMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> DataList<T> for SimpleDataList<T> {
    fn items(&self) -> &[T] {
        &self.items
    }
}

impl<T> PagedDataList<T> for SimpleDataList<T> {
    fn page_meta(&self) -> PageMeta {
        self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_set_meta() {
        let list = SimpleDataList::new(vec!["a", "b", "c"]);
        assert_eq!(list.page_meta(), PageMeta::new(1, 3, 3));
        assert_eq!(list.items(), &["a", "b", "c"]);
    }

    #[test]
    fn test_empty_whole_set() {
        let list: SimpleDataList<i32> = SimpleDataList::new(Vec::new());
        assert_eq!(*list.meta(), PageMeta::new(1, 0, 0));
        assert!(list.is_empty());
    }

    #[test]
    fn test_paged_keeps_meta() {
        let list = SimpleDataList::paged(vec![6, 7, 8, 9, 10], PageMeta::new(2, 5, 12));
        assert_eq!(list.page_meta().total, 12);
        assert_eq!(list.meta().total_pages(), 3);
        assert_eq!(list.into_items(), vec![6, 7, 8, 9, 10]);
    }

    #[test]
    fn test_total_pages_zero_size() {
        assert_eq!(PageMeta::new(1, 0, 0).total_pages(), 0);
    }

    #[test]
    fn test_total_pages_huge_page_size() {
        assert_eq!(PageMeta::new(1, i64::MAX, 3).total_pages(), 1);
        assert_eq!(PageMeta::new(1, 4, 0).total_pages(), 0);
    }

    #[test]
    fn test_serialize() {
        let list = SimpleDataList::paged(vec![1], PageMeta::new(1, 5, 1));
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"items": [1], "meta": {"page": 1, "per_page": 5, "total": 1}})
        );
    }
}
