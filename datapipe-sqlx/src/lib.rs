//! # datapipe-sqlx — SQLx backend for datapipe
//!
//! This crate provides the [SQLx](https://github.com/launchbadge/sqlx)-backed
//! implementation of [`datapipe::DataSource`]. It depends on [`datapipe`] for
//! the contracts and adds the data source, the pagination routine, untyped
//! rows, and error bridging needed to talk to a real database.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqlxDataSource`] | `DataSource` bound to one table over an `sqlx::Pool<DB>` |
//! | [`paginate`] | count-then-fetch of one page on a single connection |
//! | [`JsonRow`] | untyped row for tables without a Rust type |
//! | [`Backend`] | dialect, argument encoding and affected rows per database |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//! | [`SqlxResult<T>`] | Type alias for `Result<T, DataError>` |
//!
//! # Feature flags
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` (default) |
//! | `postgres` | PostgreSQL via `sqlx/postgres` |
//! | `mysql`    | MySQL via `sqlx/mysql` |
//!
//! # Quick start
//!
//! ```ignore
//! use datapipe::prelude::*;
//! use datapipe_sqlx::SqlxDataSource;
//! use sqlx::Sqlite;
//!
//! let users = SqlxDataSource::<User, i64, Sqlite>::for_entity(pool.clone());
//!
//! let params = Params::new()
//!     .with_page(2, 5)
//!     .with_scope(|q: QueryBuilder| q.where_eq("sex", 1).order_by("id", false));
//! let page = users.get_list(&params).await?;
//! println!("{} of {}", page.len(), page.meta().total);
//! ```
//!
//! # Consistency
//!
//! A paged list issues two statements, a count and a fetch, on one pooled
//! connection. They are not transactional unless
//! `DataSourceConfig::consistent_pagination` is set, so under concurrent
//! writes the reported total may disagree with the page contents.

pub mod backend;
pub mod error;
mod exec;
pub mod pagination;
pub mod row;
pub mod source;

pub use backend::Backend;
pub use error::{SqlxErrorExt, SqlxResult};
pub use pagination::paginate;
pub use row::JsonRow;
pub use source::SqlxDataSource;

/// Re-exports of the most commonly used types from both `datapipe` and this crate.
pub mod prelude {
    pub use crate::{JsonRow, SqlxDataSource, SqlxErrorExt};
    pub use datapipe::prelude::*;
}
