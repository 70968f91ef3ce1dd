use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rolling::Adjustment;

/// One price bar. Cells are optional because upstream tables carry holes:
/// a contract can print a settlement close with no open, or a volume column
/// the vendor never filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: DateTime<Utc>,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub open_interest: Option<Decimal>,
}

impl Bar {
    /// True when every column this frame carries has a value.
    fn complete(&self, has_volume: bool, has_open_interest: bool) -> bool {
        self.open.is_some()
            && self.high.is_some()
            && self.low.is_some()
            && self.close.is_some()
            && (!has_volume || self.volume.is_some())
            && (!has_open_interest || self.open_interest.is_some())
    }
}

/// A time-ascending table of bars for one contract or one spliced series.
///
/// The `has_volume` / `has_open_interest` flags record which columns the
/// source actually provides, so completeness checks don't penalize a vendor
/// that never ships open interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarFrame {
    bars: Vec<Bar>,
    has_volume: bool,
    has_open_interest: bool,
}

impl BarFrame {
    /// Build a frame, sorting bars into ascending timestamp order.
    pub fn from_bars(mut bars: Vec<Bar>, has_volume: bool, has_open_interest: bool) -> Self {
        bars.sort_by_key(|b| b.ts);
        Self {
            bars,
            has_volume,
            has_open_interest,
        }
    }

    pub fn empty(has_volume: bool, has_open_interest: bool) -> Self {
        Self {
            bars: Vec::new(),
            has_volume,
            has_open_interest,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn has_volume(&self) -> bool {
        self.has_volume
    }

    pub fn has_open_interest(&self) -> bool {
        self.has_open_interest
    }

    pub fn first_ts(&self) -> Option<DateTime<Utc>> {
        self.bars.first().map(|b| b.ts)
    }

    pub fn last_ts(&self) -> Option<DateTime<Utc>> {
        self.bars.last().map(|b| b.ts)
    }

    /// Bar at exactly `ts`, if one exists.
    pub fn get(&self, ts: DateTime<Utc>) -> Option<&Bar> {
        self.bars
            .binary_search_by_key(&ts, |b| b.ts)
            .ok()
            .map(|i| &self.bars[i])
    }

    /// Close at exactly `ts`.
    pub fn close_at(&self, ts: DateTime<Utc>) -> Option<Decimal> {
        self.get(ts).and_then(|b| b.close)
    }

    /// Close of the last bar at or before `ts`. Roll dates computed from a
    /// calendar can land on a non-trading day; the splice then anchors on the
    /// session that actually traded before it.
    pub fn close_on_or_before(&self, ts: DateTime<Utc>) -> Option<Decimal> {
        let idx = self.bars.partition_point(|b| b.ts <= ts);
        self.bars[..idx].iter().rev().find_map(|b| b.close)
    }

    /// Close of the last bar in `from..=to`. The bounded form of
    /// [`BarFrame::close_on_or_before`]: the lookback never escapes `from`,
    /// so a roll anchor cannot drift onto a session outside the window it
    /// was computed for.
    pub fn close_within(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Option<Decimal> {
        let idx = self.bars.partition_point(|b| b.ts <= to);
        self.bars[..idx]
            .iter()
            .rev()
            .take_while(|b| b.ts >= from)
            .find_map(|b| b.close)
    }

    /// Bars with `ts >= cutoff`, as a new frame.
    pub fn slice_from(&self, cutoff: DateTime<Utc>) -> BarFrame {
        let idx = self.bars.partition_point(|b| b.ts < cutoff);
        BarFrame {
            bars: self.bars[idx..].to_vec(),
            has_volume: self.has_volume,
            has_open_interest: self.has_open_interest,
        }
    }

    /// Bars with `ts < cutoff`, as a new frame.
    pub fn slice_before(&self, cutoff: DateTime<Utc>) -> BarFrame {
        let idx = self.bars.partition_point(|b| b.ts < cutoff);
        BarFrame {
            bars: self.bars[..idx].to_vec(),
            has_volume: self.has_volume,
            has_open_interest: self.has_open_interest,
        }
    }

    /// Apply a back-adjustment to every price cell. Volume and open interest
    /// describe activity, not price, and are never adjusted.
    pub fn adjusted(&self, adjustment: &Adjustment) -> BarFrame {
        let bars = self
            .bars
            .iter()
            .map(|b| Bar {
                ts: b.ts,
                open: b.open.map(|v| adjustment.apply(v)),
                high: b.high.map(|v| adjustment.apply(v)),
                low: b.low.map(|v| adjustment.apply(v)),
                close: b.close.map(|v| adjustment.apply(v)),
                volume: b.volume,
                open_interest: b.open_interest,
            })
            .collect();
        BarFrame {
            bars,
            has_volume: self.has_volume,
            has_open_interest: self.has_open_interest,
        }
    }

    /// Concatenate `other` onto this frame and restore ascending order.
    pub fn append(&mut self, other: BarFrame) {
        self.bars.extend(other.bars);
        self.bars.sort_by_key(|b| b.ts);
    }

    /// Count of rows missing at least one carried column.
    pub fn incomplete_rows(&self) -> usize {
        self.bars
            .iter()
            .filter(|b| !b.complete(self.has_volume, self.has_open_interest))
            .count()
    }

    /// Remove rows missing at least one carried column; returns the number
    /// removed.
    pub fn drop_incomplete(&mut self) -> usize {
        let before = self.bars.len();
        let has_volume = self.has_volume;
        let has_open_interest = self.has_open_interest;
        self.bars.retain(|b| b.complete(has_volume, has_open_interest));
        before - self.bars.len()
    }
}
