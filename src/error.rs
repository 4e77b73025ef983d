use thiserror::Error;

/// Failure to turn a data source into a [`crate::store::RecordStore`].
///
/// Load errors are fatal to startup: no partial dashboard is built from a
/// source that produced one.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read data source: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("database query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("missing required column `{0}`")]
    MissingColumn(String),

    #[error("row {row}: unparsable Date `{value}`")]
    InvalidDate { row: usize, value: String },

    #[error("row {row}: unparsable Hour `{value}` (expected 0-23)")]
    InvalidHour { row: usize, value: String },

    #[error("row {row}: invalid {column} `{value}`")]
    InvalidNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("row {row}: empty CallId")]
    MissingCallId { row: usize },

    #[error("row {row}: duplicate CallId `{call_id}`")]
    DuplicateCallId { row: usize, call_id: String },

    #[error("invalid table name `{0}`")]
    InvalidTable(String),
}
