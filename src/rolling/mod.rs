use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::contracts::calendar::LoadedContract;
use crate::errors::{Error, Result};
use crate::series::frame::BarFrame;

/// How pre-roll history is shifted onto the newer contract's price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum AdjustMode {
    /// Multiply older prices by newer_close / older_close at the roll.
    /// Preserves percentage returns across the splice.
    Ratio,
    /// Add newer_close - older_close at the roll to older prices.
    /// Preserves point moves across the splice.
    Difference,
}

/// Cumulative back-adjustment carried while splicing newest to oldest.
///
/// Each roll contributes one pair adjustment; contracts further back receive
/// the composition of every roll between them and the lead contract, so
/// ratios multiply and differences add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Ratio(Decimal),
    Difference(Decimal),
}

impl Adjustment {
    pub fn identity(mode: AdjustMode) -> Self {
        match mode {
            AdjustMode::Ratio => Adjustment::Ratio(Decimal::ONE),
            AdjustMode::Difference => Adjustment::Difference(Decimal::ZERO),
        }
    }

    /// Fold another roll's adjustment into this cumulative one.
    pub fn compose(&self, other: &Adjustment) -> Adjustment {
        match (self, other) {
            (Adjustment::Ratio(a), Adjustment::Ratio(b)) => Adjustment::Ratio(a * b),
            (Adjustment::Difference(a), Adjustment::Difference(b)) => {
                Adjustment::Difference(a + b)
            }
            _ => unreachable!("adjust mode is fixed for the lifetime of a splice"),
        }
    }

    pub fn apply(&self, value: Decimal) -> Decimal {
        match self {
            Adjustment::Ratio(r) => value * r,
            Adjustment::Difference(d) => value + d,
        }
    }
}

/// Strategy for choosing the date a continuous series switches contracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RollingMethod {
    /// Roll on the first calendar day of the expiring contract's delivery
    /// month.
    FirstOfMonth { adjust: AdjustMode },

    /// Roll `offset` trading days before the older contract's last bar.
    /// `offset` counts from the end, so 1 is the final session.
    LastNTradingDays { offset: usize, adjust: AdjustMode },

    /// Roll on the first session where the newer contract leads the older on
    /// both volume and open interest. Falls back to `backup` when the two
    /// never cross within the loaded overlap.
    VolumeAndOpenInterest {
        backup: Box<RollingMethod>,
        adjust: AdjustMode,
    },
}

impl RollingMethod {
    pub fn adjust_mode(&self) -> AdjustMode {
        match self {
            RollingMethod::FirstOfMonth { adjust }
            | RollingMethod::LastNTradingDays { adjust, .. }
            | RollingMethod::VolumeAndOpenInterest { adjust, .. } => *adjust,
        }
    }

    /// Decide where the series hands over from `older` to `newer`.
    ///
    /// Both contracts come with their daily frames loaded; roll decisions are
    /// always made on daily data even when the spliced output is intraday.
    pub fn rolling_date(
        &self,
        newer: &LoadedContract,
        older: &LoadedContract,
    ) -> Result<DateTime<Utc>> {
        match self {
            RollingMethod::FirstOfMonth { .. } => Ok(older.contract().delivery_month_start()),
            RollingMethod::LastNTradingDays { offset, .. } => {
                let bars = older.frame().bars();
                if *offset == 0 || *offset > bars.len() {
                    return Err(Error::RollDateOutOfRange {
                        date: older.frame().last_ts().unwrap_or_default(),
                        newer: newer.contract().code(),
                        older: older.contract().code(),
                    });
                }
                Ok(bars[bars.len() - offset].ts)
            }
            RollingMethod::VolumeAndOpenInterest { backup, .. } => {
                for bar in newer.frame().bars() {
                    let Some(old) = older.frame().get(bar.ts) else {
                        continue;
                    };
                    let leads = match (bar.volume, old.volume, bar.open_interest, old.open_interest)
                    {
                        (Some(nv), Some(ov), Some(noi), Some(ooi)) => nv > ov && noi > ooi,
                        _ => false,
                    };
                    if leads {
                        return Ok(bar.ts);
                    }
                }
                backup.rolling_date(newer, older)
            }
        }
    }
}

/// Compute the single-roll adjustment that lifts `older`'s history onto
/// `newer`'s price level at `roll`.
///
/// `roll` must fall inside the overlap of the two frames; a roll outside it
/// has no pair of closes to compare and aborts the splice.
pub fn pair_adjustment(
    mode: AdjustMode,
    newer: &LoadedContract,
    older: &LoadedContract,
    roll: DateTime<Utc>,
) -> Result<Adjustment> {
    let out_of_range = || Error::RollDateOutOfRange {
        date: roll,
        newer: newer.contract().code(),
        older: older.contract().code(),
    };

    let overlap_start = newer
        .frame()
        .first_ts()
        .zip(older.frame().first_ts())
        .map(|(a, b)| a.max(b))
        .ok_or_else(out_of_range)?;
    let overlap_end = newer
        .frame()
        .last_ts()
        .zip(older.frame().last_ts())
        .map(|(a, b)| a.min(b))
        .ok_or_else(out_of_range)?;
    if roll < overlap_start || roll > overlap_end {
        return Err(out_of_range());
    }

    // anchor closes inside the overlap only, so a sparse frame cannot pair
    // the roll against a session from before the contracts traded together
    let newer_close = newer
        .frame()
        .close_within(overlap_start, roll)
        .ok_or_else(out_of_range)?;
    let older_close = older
        .frame()
        .close_within(overlap_start, roll)
        .ok_or_else(out_of_range)?;

    Ok(match mode {
        AdjustMode::Ratio => {
            if older_close.is_zero() {
                return Err(out_of_range());
            }
            Adjustment::Ratio(newer_close / older_close)
        }
        AdjustMode::Difference => Adjustment::Difference(newer_close - older_close),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::contract::{CodeFormat, Contract};
    use crate::contracts::months::MonthSet;
    use crate::series::frame::Bar;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 3, day, 0, 0, 0).unwrap()
    }

    fn loaded(code: &str, bars: Vec<Bar>) -> LoadedContract {
        let contract = Contract::parse(code, MonthSet::financial(), CodeFormat::Barchart).unwrap();
        LoadedContract::new(contract, BarFrame::from_bars(bars, true, true))
    }

    fn bar(day: u32, close: Decimal, volume: Decimal, oi: Decimal) -> Bar {
        Bar {
            ts: ts(day),
            open: Some(close),
            high: Some(close),
            low: Some(close),
            close: Some(close),
            volume: Some(volume),
            open_interest: Some(oi),
        }
    }

    #[test]
    fn adjustment_composition() {
        let a = Adjustment::Ratio(dec!(2)).compose(&Adjustment::Ratio(dec!(3)));
        assert_eq!(a.apply(dec!(10)), dec!(60));
        let d = Adjustment::Difference(dec!(2)).compose(&Adjustment::Difference(dec!(3)));
        assert_eq!(d.apply(dec!(10)), dec!(15));
        assert_eq!(
            Adjustment::identity(AdjustMode::Ratio).apply(dec!(7)),
            dec!(7)
        );
    }

    #[test]
    fn first_of_month_rolls_when_the_old_front_enters_delivery() {
        let newer = loaded("esm19", vec![bar(1, dec!(10), dec!(1), dec!(1))]);
        let older = loaded("esh19", vec![bar(1, dec!(10), dec!(1), dec!(1))]);
        let method = RollingMethod::FirstOfMonth {
            adjust: AdjustMode::Ratio,
        };
        assert_eq!(
            method.rolling_date(&newer, &older).unwrap(),
            Utc.with_ymd_and_hms(2019, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn last_n_trading_days_counts_from_the_end() {
        let newer = loaded("esm19", vec![bar(1, dec!(10), dec!(1), dec!(1))]);
        let older = loaded(
            "esh19",
            vec![
                bar(1, dec!(10), dec!(1), dec!(1)),
                bar(2, dec!(10), dec!(1), dec!(1)),
                bar(3, dec!(10), dec!(1), dec!(1)),
            ],
        );
        let method = RollingMethod::LastNTradingDays {
            offset: 2,
            adjust: AdjustMode::Ratio,
        };
        assert_eq!(method.rolling_date(&newer, &older).unwrap(), ts(2));

        let too_deep = RollingMethod::LastNTradingDays {
            offset: 4,
            adjust: AdjustMode::Ratio,
        };
        assert!(matches!(
            too_deep.rolling_date(&newer, &older),
            Err(Error::RollDateOutOfRange { .. })
        ));
    }

    #[test]
    fn voi_rolls_on_first_double_crossover() {
        let newer = loaded(
            "esm19",
            vec![
                bar(1, dec!(10), dec!(5), dec!(50)),
                bar(2, dec!(10), dec!(20), dec!(40)),
                bar(3, dec!(10), dec!(30), dec!(300)),
            ],
        );
        let older = loaded(
            "esh19",
            vec![
                bar(1, dec!(10), dec!(100), dec!(1000)),
                bar(2, dec!(10), dec!(10), dec!(500)),
                bar(3, dec!(10), dec!(5), dec!(100)),
            ],
        );
        let method = RollingMethod::VolumeAndOpenInterest {
            backup: Box::new(RollingMethod::LastNTradingDays {
                offset: 1,
                adjust: AdjustMode::Ratio,
            }),
            adjust: AdjustMode::Ratio,
        };
        // day 2: volume crosses but open interest does not; day 3: both cross
        assert_eq!(method.rolling_date(&newer, &older).unwrap(), ts(3));
    }

    #[test]
    fn voi_falls_back_when_no_crossover() {
        let newer = loaded(
            "esm19",
            vec![bar(1, dec!(10), dec!(1), dec!(1)), bar(2, dec!(10), dec!(1), dec!(1))],
        );
        let older = loaded(
            "esh19",
            vec![
                bar(1, dec!(10), dec!(100), dec!(100)),
                bar(2, dec!(10), dec!(100), dec!(100)),
            ],
        );
        let method = RollingMethod::VolumeAndOpenInterest {
            backup: Box::new(RollingMethod::LastNTradingDays {
                offset: 1,
                adjust: AdjustMode::Difference,
            }),
            adjust: AdjustMode::Difference,
        };
        assert_eq!(method.rolling_date(&newer, &older).unwrap(), ts(2));
    }

    #[test]
    fn pair_adjustment_uses_closes_at_or_before_roll() {
        let newer = loaded(
            "esm19",
            vec![bar(2, dec!(12), dec!(1), dec!(1)), bar(5, dec!(15), dec!(1), dec!(1))],
        );
        let older = loaded(
            "esh19",
            vec![bar(2, dec!(10), dec!(1), dec!(1)), bar(5, dec!(11), dec!(1), dec!(1))],
        );
        // day 3 has no bar in either frame; both fall back to the prior session
        let adj = pair_adjustment(AdjustMode::Difference, &newer, &older, ts(3)).unwrap();
        assert_eq!(adj, Adjustment::Difference(dec!(2)));

        let ratio = pair_adjustment(AdjustMode::Ratio, &newer, &older, ts(5)).unwrap();
        assert_eq!(ratio, Adjustment::Ratio(dec!(15) / dec!(11)));
    }

    #[test]
    fn pair_adjustment_rejects_zero_anchor_for_ratio() {
        let newer = loaded("esm19", vec![bar(1, dec!(12), dec!(1), dec!(1))]);
        let older = loaded("esh19", vec![bar(1, dec!(0), dec!(1), dec!(1))]);
        assert!(matches!(
            pair_adjustment(AdjustMode::Ratio, &newer, &older, ts(1)),
            Err(Error::RollDateOutOfRange { .. })
        ));
        // a zero close still differences cleanly
        let adj = pair_adjustment(AdjustMode::Difference, &newer, &older, ts(1)).unwrap();
        assert_eq!(adj, Adjustment::Difference(dec!(12)));
    }

    #[test]
    fn pair_adjustment_never_anchors_before_the_overlap() {
        let newer = loaded(
            "esm19",
            vec![bar(10, dec!(12), dec!(1), dec!(1)), bar(12, dec!(13), dec!(1), dec!(1))],
        );
        let mut stale = bar(12, dec!(11), dec!(1), dec!(1));
        stale.close = None;
        // the only older close sits well before the contracts overlap
        let older = loaded("esh19", vec![bar(1, dec!(10), dec!(1), dec!(1)), stale]);
        assert!(matches!(
            pair_adjustment(AdjustMode::Ratio, &newer, &older, ts(12)),
            Err(Error::RollDateOutOfRange { .. })
        ));
    }

    #[test]
    fn pair_adjustment_rejects_rolls_outside_overlap() {
        let newer = loaded("esm19", vec![bar(2, dec!(12), dec!(1), dec!(1))]);
        let older = loaded("esh19", vec![bar(1, dec!(10), dec!(1), dec!(1)), bar(2, dec!(11), dec!(1), dec!(1))]);
        assert!(matches!(
            pair_adjustment(AdjustMode::Ratio, &newer, &older, ts(1)),
            Err(Error::RollDateOutOfRange { .. })
        ));
        assert!(matches!(
            pair_adjustment(AdjustMode::Ratio, &newer, &older, ts(9)),
            Err(Error::RollDateOutOfRange { .. })
        ));
    }
}
