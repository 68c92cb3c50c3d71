/// CubeFrame Errors
///
/// Only configuration problems surface as errors. Lookups that miss return
/// `None` and uniqueness violations return `false`, so summaries degrade to
/// blanks instead of failing.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A pivot cube needs at least one named reducer.
    #[error("pivot expression is missing or empty")]
    MissingExpression,

    #[error("pivot requires at least one dimension")]
    MissingDimensions,

    #[error("dimension {0} has no columns")]
    EmptyDimension(usize),

    /// A column named twice: in a header, across cube dimensions or in a subtotal.
    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("column '{0}' not found")]
    UnknownColumn(String),

    #[error("subtotal requires at least one column")]
    EmptySubtotal,

    /// Row-major input whose header cell is not a column name.
    #[error("header cell {0} is not a column name")]
    InvalidHeader(usize),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("index '{0}' not found")]
    IndexNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
