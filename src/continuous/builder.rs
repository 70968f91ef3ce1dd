use chrono::{DateTime, Utc};

use crate::continuous::presets;
use crate::contracts::calendar::{load_contract_list, LoadedContract};
use crate::contracts::contract::CodeFormat;
use crate::contracts::months::MonthSet;
use crate::errors::{Error, Result};
use crate::rolling::{pair_adjustment, Adjustment, RollingMethod};
use crate::series::frame::BarFrame;
use crate::series::frequency::Frequency;
use crate::series::resample::{daily_to_monthly, daily_to_weekly};
use crate::sources::{DataSource, SourceError};

/// Builds one unbroken price series per symbol out of individual contracts.
///
/// The splice walks the loaded contract list newest first. The lead contract
/// contributes everything at or after its roll date; each older contract
/// contributes its slice between consecutive roll dates, back-adjusted by the
/// composition of every roll above it. The oldest contract is bounded below
/// by the delivery month of the contract before it, so the series never
/// starts mid-contract.
pub struct ContinuousContract<S: DataSource> {
    source: S,
    format: CodeFormat,
    split_hour: u32,
}

impl<S: DataSource> ContinuousContract<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            format: CodeFormat::Barchart,
            split_hour: presets::DEFAULT_SPLIT_HOUR,
        }
    }

    pub fn with_format(mut self, format: CodeFormat) -> Self {
        self.format = format;
        self
    }

    /// Hour at which intraday sessions hand over on a roll day.
    pub fn with_split_hour(mut self, hour: u32) -> Self {
        debug_assert!(hour < 24);
        self.split_hour = hour;
        self
    }

    /// Read the continuous series for `symbol` over `start..=end`.
    ///
    /// `months` and `rolling` default to the per-symbol presets. Roll dates
    /// and adjustments always come from daily data; intraday output is
    /// spliced at the split hour of each roll day, and weekly or monthly
    /// output is resampled from the daily splice.
    pub fn read(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        symbol: &str,
        frequency: Frequency,
        months: Option<MonthSet>,
        rolling: Option<RollingMethod>,
    ) -> Result<BarFrame> {
        if symbol.is_empty()
            || !symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::InvalidFormat {
                code: symbol.to_string(),
                format: self.format,
            });
        }

        let months = months.unwrap_or_else(|| presets::default_months(symbol));
        let rolling = rolling.unwrap_or_else(|| presets::default_rolling(symbol));

        let mut cs = load_contract_list(
            start,
            end,
            symbol,
            &months,
            self.format,
            &self.source,
            Frequency::Daily,
        )?;

        // A window touching a single recorded contract has no roll to splice;
        // its table is already the series.
        if cs.len() == 1 {
            return Ok(cs.remove(0).into_frame());
        }

        if frequency.is_intraday() {
            return self.read_intraday(symbol, frequency, &cs, &rolling);
        }

        let frames: Vec<BarFrame> = cs.iter().map(|c| c.frame().clone()).collect();
        let mut link = splice_frames(&cs, &frames, &rolling, |roll| roll)?;

        match frequency {
            Frequency::Weekly => link = daily_to_weekly(&link),
            Frequency::Monthly => link = daily_to_monthly(&link),
            _ => {}
        }

        let incomplete = link.incomplete_rows();
        if incomplete > 0 {
            tracing::warn!(
                "dropping {incomplete} incomplete rows from {}",
                symbol.to_uppercase()
            );
            let dropped = link.drop_incomplete();
            debug_assert_eq!(dropped, incomplete);
        }

        Ok(link)
    }

    fn read_intraday(
        &self,
        symbol: &str,
        frequency: Frequency,
        cs: &[LoadedContract],
        rolling: &RollingMethod,
    ) -> Result<BarFrame> {
        let mut frames = Vec::with_capacity(cs.len());
        for contract in cs {
            let frame = self
                .source
                .read(
                    DateTime::<Utc>::MIN_UTC,
                    DateTime::<Utc>::MAX_UTC,
                    &contract.contract().code(),
                    frequency,
                )
                .map_err(|e| match e {
                    SourceError::Unsupported(frequency) => Error::UnsupportedFrequency {
                        symbol: symbol.to_string(),
                        frequency,
                    },
                    other => Error::Source(other),
                })?;
            frames.push(frame);
        }

        // Same walk as the daily splice, but the intraday frames are cut at
        // the split hour of each daily roll date.
        let split_hour = self.split_hour;
        splice_frames(cs, &frames, rolling, |roll| at_hour(roll, split_hour))
    }
}

fn at_hour(roll: DateTime<Utc>, hour: u32) -> DateTime<Utc> {
    roll.date_naive()
        .and_hms_opt(hour, 0, 0)
        .expect("split hour is below 24")
        .and_utc()
}

/// Core newest-first splice over `frames`, one frame per contract in `cs`.
///
/// Roll dates and pair adjustments come from the daily data in `cs`;
/// `cut_of` maps each daily roll date to the timestamp the output frames are
/// actually cut at (identity for daily, the split hour for intraday).
fn splice_frames(
    cs: &[LoadedContract],
    frames: &[BarFrame],
    rolling: &RollingMethod,
    cut_of: impl Fn(DateTime<Utc>) -> DateTime<Utc>,
) -> Result<BarFrame> {
    let mode = rolling.adjust_mode();
    let mut roll = rolling.rolling_date(&cs[0], &cs[1])?;
    let mut link = frames[0].slice_from(cut_of(roll));
    let mut acc = Adjustment::identity(mode);

    for i in 1..cs.len() {
        let pair = pair_adjustment(mode, &cs[i - 1], &cs[i], roll)?;
        acc = acc.compose(&pair);
        let cut = cut_of(roll);
        let part = frames[i].slice_before(cut).adjusted(&acc);
        link = link.slice_from(cut);
        link.append(part);

        roll = if i + 1 < cs.len() {
            rolling.rolling_date(&cs[i], &cs[i + 1])?
        } else {
            // Bound the oldest contract by the delivery month of the contract
            // before it, as if one more roll had happened.
            cs[i].contract().previous_contract().delivery_month_start()
        };
    }

    Ok(link.slice_from(cut_of(roll)))
}
