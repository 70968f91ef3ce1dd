//! Per-symbol defaults: which delivery months a root trades and how its
//! continuous series rolls. Anything unlisted is treated as a quarterly
//! financial product.

use ahash::AHashMap;
use lazy_static::lazy_static;

use crate::contracts::months::MonthSet;
use crate::rolling::{AdjustMode, RollingMethod};

/// Hour of day (exchange close) splitting intraday sessions at a roll.
pub const DEFAULT_SPLIT_HOUR: u32 = 16;

lazy_static! {
    static ref MONTH_OVERRIDES: AHashMap<&'static str, MonthSet> = {
        let mut m = AHashMap::new();
        m.insert("cl", MonthSet::all());
        m.insert("ng", MonthSet::all());
        m.insert("gc", MonthSet::even());
        // h k n u z
        m.insert("si", MonthSet::from_months(&[3, 5, 7, 9, 12]));
        m.insert("hg", MonthSet::from_months(&[3, 5, 7, 9, 12]));
        m.insert("zc", MonthSet::from_months(&[3, 5, 7, 9, 12]));
        m.insert("zw", MonthSet::from_months(&[3, 5, 7, 9, 12]));
        // f h k n q u x
        m.insert("zs", MonthSet::from_months(&[1, 3, 5, 7, 8, 9, 11]));
        m
    };
}

/// Delivery months `symbol` actually trades.
pub fn default_months(symbol: &str) -> MonthSet {
    MONTH_OVERRIDES
        .get(symbol)
        .cloned()
        .unwrap_or_else(MonthSet::financial)
}

fn voi_last_n(offset: usize, adjust: AdjustMode) -> RollingMethod {
    RollingMethod::VolumeAndOpenInterest {
        backup: Box::new(RollingMethod::LastNTradingDays { offset, adjust }),
        adjust,
    }
}

/// Default roll placement and adjustment for `symbol`.
///
/// Everything rolls on the volume and open-interest crossover; the backup
/// differs by product group because their liquidity migrates at different
/// speeds ahead of expiry. The treasury and rates complex adjusts by
/// difference to keep yield-point moves intact.
pub fn default_rolling(symbol: &str) -> RollingMethod {
    match symbol {
        "cl" | "ng" => voi_last_n(8, AdjustMode::Ratio),
        "gc" | "si" => voi_last_n(27, AdjustMode::Ratio),
        "zs" | "zc" | "zw" => voi_last_n(15, AdjustMode::Ratio),
        "zn" | "zf" | "zt" | "zb" | "ge" | "tj" | "gg" => {
            RollingMethod::VolumeAndOpenInterest {
                backup: Box::new(RollingMethod::FirstOfMonth {
                    adjust: AdjustMode::Difference,
                }),
                adjust: AdjustMode::Difference,
            }
        }
        "e6" | "j6" | "b6" | "a6" | "d6" | "s6" | "n6" | "dx" => voi_last_n(2, AdjustMode::Ratio),
        _ => voi_last_n(4, AdjustMode::Ratio),
    }
}
