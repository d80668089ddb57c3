pub mod executor;
pub mod mapper;
pub mod models;
pub mod record;

pub use executor::Executor;
pub use mapper::Repository;
pub use record::{Field, Patch, Record};

use thiserror::Error;

/// Errors from the mapping layer and the underlying executor.
#[derive(Debug, Error)]
pub enum MapperError {
    #[error("invalid table name: {0}")]
    InvalidTable(String),

    #[error("invalid column name: {0}")]
    InvalidColumn(String),

    #[error("duplicate column name under case-folding: {0}")]
    DuplicateColumn(String),

    #[error("refusing to build an empty {0} clause")]
    EmptyClause(&'static str),

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
