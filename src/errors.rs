use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::contracts::contract::CodeFormat;
use crate::series::frequency::Frequency;
use crate::sources::SourceError;

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the continuous-contract engine.
///
/// Everything here is fatal to the build that raised it: the engine never
/// retries and never returns a partially spliced series.
#[derive(Debug, Error)]
pub enum Error {
    /// Contract code does not match the shape of the requested format.
    #[error("invalid contract code {code:?} for the {format} format")]
    InvalidFormat { code: String, format: CodeFormat },

    /// Decoded delivery month is not a member of the symbol's month set.
    #[error("delivery month {month} is not in the month set [{set}]")]
    InvalidMonth { month: u32, set: String },

    /// No contract with recorded data overlaps the requested window.
    #[error("no contracts overlap {start}..{end} for {symbol:?}")]
    EmptyRange {
        symbol: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// The data source cannot produce the requested granularity.
    #[error("{frequency} data is not available for {symbol:?}")]
    UnsupportedFrequency { symbol: String, frequency: Frequency },

    /// A rolling method produced a date outside the overlap of the two
    /// contracts' loaded data. Signals a data or configuration defect;
    /// clamping here would corrupt the continuity of the splice.
    #[error("roll date {date} falls outside the overlap of {newer} and {older}")]
    RollDateOutOfRange {
        date: DateTime<Utc>,
        newer: String,
        older: String,
    },

    /// Opaque failure from the data-source collaborator, unmodified.
    #[error("data source: {0}")]
    Source(#[from] SourceError),
}
