use thiserror::Error;

/// Malformed values coming from the data store or an import file.
#[derive(Debug, Error, PartialEq)]
pub enum DataError {
    #[error("unknown {field} value: {value:?}")]
    UnknownTag { field: &'static str, value: String },

    #[error("unknown timeline filter {0:?} (expected all, daily, weekly, note, message or announcement)")]
    UnknownTimelineFilter(String),

    #[error("malformed timestamp {0:?}")]
    MalformedTimestamp(String),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

pub type DataResult<T> = Result<T, DataError>;
