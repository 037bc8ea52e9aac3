//! # datapipe — generic data-source contracts
//!
//! Backend-agnostic types for fetching, paginating, creating, updating and
//! deleting typed records. A backend crate (e.g. `datapipe-sqlx`) implements
//! [`DataSource`] on top of a relational store.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DataSource`] | list / get / store / update / delete for one item and key type |
//! | [`Params`] | page request, ordered scopes, count field for a list query |
//! | [`SimpleDataList`] | items plus [`PageMeta`] |
//! | [`Entity`] / [`Record`] | table binding and column values of an item type |
//! | [`QueryBuilder`] | the per-call query session scopes operate on |
//! | [`DataSourceConfig`] | page size default, strict updates, consistent paging |

pub mod config;
pub mod entity;
pub mod error;
pub mod page;
pub mod params;
pub mod query;
pub mod source;
pub mod value;

pub use config::{ConfigError, DataSourceConfig};
pub use entity::{Entity, Record};
pub use error::DataError;
pub use page::{DataList, PageMeta, PagedDataList, SimpleDataList};
pub use params::{PageRequest, Params, QueryModifier, Scope, DEFAULT_PAGE_SIZE};
pub use query::{Dialect, IdentifierPolicy, QueryBuilder, QueryError};
pub use source::DataSource;
pub use value::SqlValue;

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        DataList, DataSource, Entity, PageMeta, PagedDataList, Params, QueryBuilder, Record,
        SimpleDataList, SqlValue,
    };
}
