use crate::models::YearMonth;
use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Pre-flight and engine-level failures. Per-partition problems are not
/// errors; they surface as [`crate::models::SkippedPartition`] entries.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid date '{0}': expected YYYY-MM")]
    BadDateFormat(String),

    #[error("start month {start} is after end month {end}")]
    InvertedRange { start: YearMonth, end: YearMonth },

    #[error("entity pattern is empty; refusing to match every row")]
    EmptyPattern,

    #[error("data root '{0}' has no parent directory to hold All_Data")]
    BadDataRoot(PathBuf),

    #[error("archive scan failed: {0}")]
    ArchiveScan(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}
