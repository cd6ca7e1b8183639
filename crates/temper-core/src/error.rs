use thiserror::Error;

/// The taxonomy of failures the core pipeline can surface. Every entry point
/// returns one of these instead of panicking; only `Contract` indicates a bug
/// in the engine itself rather than bad input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemperError {
    #[error("schema error: {0}")]
    Schema(String),

    #[error("row {row_index} invalid: {message}")]
    Row { row_index: usize, message: String },

    #[error("no valid rows after parsing")]
    EmptyInput,

    #[error("internal invariant violated: {0}")]
    Contract(String),

    #[error("invalid rule configuration: {0}")]
    Rule(String),
}

pub type TemperResult<T> = Result<T, TemperError>;
