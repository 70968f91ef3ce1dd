use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Single-letter delivery month code (CME convention).
pub fn month_code(month: u32) -> char {
    match month {
        1 => 'f',
        2 => 'g',
        3 => 'h',
        4 => 'j',
        5 => 'k',
        6 => 'm',
        7 => 'n',
        8 => 'q',
        9 => 'u',
        10 => 'v',
        11 => 'x',
        12 => 'z',
        _ => '?',
    }
}

pub fn month_from_code(c: char) -> Option<u32> {
    Some(match c.to_ascii_lowercase() {
        'f' => 1,
        'g' => 2,
        'h' => 3,
        'j' => 4,
        'k' => 5,
        'm' => 6,
        'n' => 7,
        'q' => 8,
        'u' => 9,
        'v' => 10,
        'x' => 11,
        'z' => 12,
        _ => return None,
    })
}

/// Ordered set of the calendar months a futures symbol actually trades.
///
/// Not every root lists every month: crude trades all twelve, gold the even
/// months, equity indices only the quarterly financial months. The set drives
/// both front-month selection and the wraparound when stepping to the
/// previous contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthSet {
    months: Vec<u32>, // ascending, 1..=12, deduped
}

impl MonthSet {
    /// All twelve delivery months (e.g. cl, ng).
    pub fn all() -> Self {
        Self {
            months: (1..=12).collect(),
        }
    }

    /// Even months only (e.g. gc).
    pub fn even() -> Self {
        Self {
            months: vec![2, 4, 6, 8, 10, 12],
        }
    }

    /// Quarterly financial months H M U Z (equity indices, rates, FX).
    pub fn financial() -> Self {
        Self {
            months: vec![3, 6, 9, 12],
        }
    }

    /// Build a set from month-letter codes, e.g. `"hknuz"`.
    pub fn from_codes(codes: &str) -> Result<Self> {
        let mut months = Vec::with_capacity(codes.len());
        for c in codes.chars() {
            let m = month_from_code(c).ok_or(Error::InvalidMonth {
                month: 0,
                set: codes.to_string(),
            })?;
            months.push(m);
        }
        months.sort_unstable();
        months.dedup();
        if months.is_empty() {
            return Err(Error::InvalidMonth {
                month: 0,
                set: codes.to_string(),
            });
        }
        Ok(Self { months })
    }

    /// Build from month numbers. Out-of-range months are a caller bug.
    pub fn from_months(months: &[u32]) -> Self {
        debug_assert!(months.iter().all(|m| (1..=12).contains(m)));
        let mut months: Vec<u32> = months.to_vec();
        months.sort_unstable();
        months.dedup();
        Self { months }
    }

    pub fn contains(&self, month: u32) -> bool {
        self.months.binary_search(&month).is_ok()
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Smallest member, the wrap target when a forward scan passes December.
    pub fn first(&self) -> u32 {
        self.months[0]
    }

    /// Largest member, the wrap target when stepping back past January.
    pub fn last(&self) -> u32 {
        *self.months.last().expect("month set is never empty")
    }

    /// Smallest member at or after `month`.
    pub fn next_at_or_after(&self, month: u32) -> Option<u32> {
        self.months.iter().copied().find(|&m| m >= month)
    }

    /// Largest member strictly before `month`.
    pub fn prev_before(&self, month: u32) -> Option<u32> {
        self.months.iter().rev().copied().find(|&m| m < month)
    }

    /// How far ahead of the reference date the front month sits.
    ///
    /// Physical contracts listing every month (cl, ng) stop trading the month
    /// before delivery, so the front month is two months out; everything else
    /// is one month out (cl @ Jan 19 -> clh, es @ Dec 5 -> esh next year).
    pub fn expiry_lead(&self) -> u32 {
        if self.months.len() == 12 {
            2
        } else {
            1
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.months.iter().copied()
    }

    /// Letter-code rendering, e.g. `"hmuz"`.
    pub fn codes(&self) -> String {
        self.months.iter().map(|&m| month_code(m)).collect()
    }
}

impl fmt::Display for MonthSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.codes())
    }
}
