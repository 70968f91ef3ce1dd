pub mod barchart;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::series::frame::BarFrame;
use crate::series::frequency::Frequency;

/// Failures raised by a bar-table provider.
///
/// `NotFound` is load-bearing: walking a contract calendar back in time, the
/// first missing contract marks the edge of recorded history and ends the
/// walk instead of failing it.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No table stored for this contract code at this granularity.
    #[error("no data for contract {code:?}")]
    NotFound { code: String },

    /// The provider does not store this granularity at all.
    #[error("granularity {0} is not stored by this source")]
    Unsupported(Frequency),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// A stored table failed to parse.
    #[error("malformed table at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// Provider of per-contract bar tables.
///
/// `read` returns bars within `start..=end` for one contract code. Codes are
/// the vendor-format strings produced by
/// [`crate::contracts::contract::Contract::code`].
pub trait DataSource {
    fn read(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        code: &str,
        frequency: Frequency,
    ) -> Result<BarFrame, SourceError>;
}

/// In-memory source keyed by (code, frequency). The test double for the
/// splicing engine, and a cache shape for callers that prefetch.
#[derive(Debug, Default)]
pub struct MemorySource {
    tables: AHashMap<(String, Frequency), BarFrame>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: &str, frequency: Frequency, frame: BarFrame) {
        self.tables.insert((code.to_string(), frequency), frame);
    }
}

impl DataSource for MemorySource {
    fn read(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        code: &str,
        frequency: Frequency,
    ) -> Result<BarFrame, SourceError> {
        let Some(frame) = self.tables.get(&(code.to_string(), frequency)) else {
            // a contract recorded daily but absent at an intraday granularity
            // is published daily only, not missing
            if frequency.is_intraday()
                && self
                    .tables
                    .contains_key(&(code.to_string(), Frequency::Daily))
            {
                return Err(SourceError::Unsupported(frequency));
            }
            return Err(SourceError::NotFound {
                code: code.to_string(),
            });
        };
        let bars = frame
            .bars()
            .iter()
            .filter(|b| b.ts >= start && b.ts <= end)
            .copied()
            .collect();
        Ok(BarFrame::from_bars(
            bars,
            frame.has_volume(),
            frame.has_open_interest(),
        ))
    }
}
