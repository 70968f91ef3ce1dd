use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Bar granularity of a request or a stored table.
///
/// Daily is the native granularity: contract calendars and roll decisions are
/// always computed from daily data, whatever the caller asked for. Weekly and
/// monthly are derived from daily by resampling; the intraday granularities
/// are stored separately by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Frequency {
    #[strum(serialize = "15m")]
    Minutes15,
    #[strum(serialize = "30m")]
    Minutes30,
    #[strum(serialize = "60m")]
    Minutes60,
    #[strum(serialize = "daily")]
    Daily,
    #[strum(serialize = "weekly")]
    Weekly,
    #[strum(serialize = "monthly")]
    Monthly,
}

impl Frequency {
    pub fn is_intraday(self) -> bool {
        matches!(
            self,
            Frequency::Minutes15 | Frequency::Minutes30 | Frequency::Minutes60
        )
    }
}
