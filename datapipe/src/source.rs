use crate::error::DataError;
use crate::page::SimpleDataList;
use crate::params::Params;
use std::future::Future;

/// Generic async data source for one item type and one key type.
///
/// Implementations hold no items; every call is a fresh round-trip to the
/// backing store. Uses RPITIT (return-position `impl Trait` in traits).
pub trait DataSource<T, K>: Send + Sync
where
    T: Send + 'static,
    K: Send + Sync,
{
    /// Fetch the rows selected by `params`: every matching row, or one page
    /// with its metadata when `params` carries a page request.
    fn get_list(&self, params: &Params) -> impl Future<Output = Result<SimpleDataList<T>, DataError>> + Send;

    /// Fetch the row whose key equals `key`, or `DataError::NotFound`.
    fn get_item(&self, key: &K) -> impl Future<Output = Result<T, DataError>> + Send;

    /// Insert `item` and return the row as stored, including any key the
    /// store assigned.
    fn store(&self, item: &T) -> impl Future<Output = Result<T, DataError>> + Send;

    /// Write the non-zero fields of `item` onto the row identified by `key`.
    fn update(&self, key: &K, item: &T) -> impl Future<Output = Result<(), DataError>> + Send;

    fn delete(&self, key: &K) -> impl Future<Output = Result<(), DataError>> + Send;
}
