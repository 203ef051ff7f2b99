use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("range must be one of: 7d, 30d, 90d, 365d")]
    InvalidRange(String),

    #[error("from must be on or before to")]
    InvertedRange,

    #[error("date '{0}' is outside 1970-01-01..=9999-12-31")]
    DateOutOfBounds(String),

    #[error("range must not span more than {0} days")]
    RangeTooLong(i64),
}
