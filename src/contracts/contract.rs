use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::contracts::months::{month_code, month_from_code, MonthSet};
use crate::errors::{Error, Result};

/// Contract-code syntax variant.
///
/// Barchart is the compact form: two-character root, month letter, two-digit
/// year (`esh20`). Quandl is the extended form: multi-character root, month
/// letter, four-digit year (`nk225mz2006`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum CodeFormat {
    Barchart,
    Quandl,
}

/// Two-digit years pivot at 79: 00..=79 are the 2000s, 80..=99 the 1900s.
/// Covers every contract in recorded electronic history ("99" -> 1999,
/// "20" -> 2020) without ambiguity.
const YEAR_PIVOT: i32 = 79;

fn expand_year(yy: i32) -> i32 {
    if yy <= YEAR_PIVOT {
        2000 + yy
    } else {
        1900 + yy
    }
}

/// A single futures contract's identity: root symbol, delivery year/month,
/// the month set it belongs to, and the code syntax it renders as.
///
/// Identity only — no price data. Pair with a data source via
/// [`crate::contracts::calendar::LoadedContract`] to attach bars.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Contract {
    symbol: String,
    year: i32,
    month: u32,
    months: MonthSet,
    format: CodeFormat,
}

fn valid_symbol(symbol: &str, format: CodeFormat) -> bool {
    let bytes = symbol.as_bytes();
    let shape_ok = match format {
        CodeFormat::Barchart => bytes.len() == 2,
        CodeFormat::Quandl => !bytes.is_empty(),
    };
    shape_ok
        && bytes[0].is_ascii_lowercase()
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

impl Contract {
    /// Parse a contract code, validating both the format shape and the
    /// decoded month's membership in `months`.
    pub fn parse(code: &str, months: MonthSet, format: CodeFormat) -> Result<Self> {
        let invalid = || Error::InvalidFormat {
            code: code.to_string(),
            format,
        };

        let bytes = code.as_bytes();
        let year_digits = match format {
            CodeFormat::Barchart => 2,
            CodeFormat::Quandl => 4,
        };
        // root + month letter + year digits
        if bytes.len() < 2 + year_digits {
            return Err(invalid());
        }

        let (head, year_str) = code.split_at(bytes.len() - year_digits);
        if !year_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let month_char = head.chars().last().ok_or_else(invalid)?;
        let symbol = &head[..head.len() - month_char.len_utf8()];
        let month = month_from_code(month_char).ok_or_else(invalid)?;
        if month_char.is_ascii_uppercase() || !valid_symbol(symbol, format) {
            return Err(invalid());
        }

        let year = match format {
            CodeFormat::Barchart => expand_year(year_str.parse::<i32>().map_err(|_| invalid())?),
            CodeFormat::Quandl => year_str.parse::<i32>().map_err(|_| invalid())?,
        };

        if !months.contains(month) {
            return Err(Error::InvalidMonth {
                month,
                set: months.codes(),
            });
        }

        Ok(Self {
            symbol: symbol.to_string(),
            year,
            month,
            months,
            format,
        })
    }

    /// Build from components; the inverse of [`Contract::parse`].
    pub fn build(
        symbol: &str,
        year: i32,
        month: u32,
        months: MonthSet,
        format: CodeFormat,
    ) -> Result<Self> {
        if !valid_symbol(symbol, format) {
            return Err(Error::InvalidFormat {
                code: symbol.to_string(),
                format,
            });
        }
        if !months.contains(month) {
            return Err(Error::InvalidMonth {
                month,
                set: months.codes(),
            });
        }
        Ok(Self {
            symbol: symbol.to_string(),
            year,
            month,
            months,
            format,
        })
    }

    /// Render the contract code in this contract's format.
    pub fn code(&self) -> String {
        match self.format {
            CodeFormat::Barchart => format!(
                "{}{}{:02}",
                self.symbol,
                month_code(self.month),
                self.year % 100
            ),
            CodeFormat::Quandl => {
                format!("{}{}{:04}", self.symbol, month_code(self.month), self.year)
            }
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn months(&self) -> &MonthSet {
        &self.months
    }

    pub fn format(&self) -> CodeFormat {
        self.format
    }

    /// First calendar day of the delivery month, midnight UTC.
    pub fn delivery_month_start(&self) -> DateTime<Utc> {
        chrono::NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .expect("delivery month is 1..=12")
            .and_hms_opt(0, 0, 0)
            .expect("midnight is valid")
            .and_utc()
    }

    /// The immediately preceding delivery in the same month set: the largest
    /// member below the current month, wrapping to the set's last month of
    /// the prior year.
    pub fn previous_contract(&self) -> Contract {
        let (year, month) = match self.months.prev_before(self.month) {
            Some(m) => (self.year, m),
            None => (self.year - 1, self.months.last()),
        };
        Contract {
            symbol: self.symbol.clone(),
            year,
            month,
            months: self.months.clone(),
            format: self.format,
        }
    }

    /// The front-month contract for `symbol` as of `at`.
    ///
    /// Scans the month set forward from the reference month plus the set's
    /// expiry lead, rolling into the next year when the scan passes December.
    pub fn front_month(
        symbol: &str,
        months: MonthSet,
        format: CodeFormat,
        at: DateTime<Utc>,
    ) -> Result<Contract> {
        let date = at.date_naive();
        let mut year = date.year();
        let mut target = date.month() + months.expiry_lead();
        if target > 12 {
            target -= 12;
            year += 1;
        }
        match months.next_at_or_after(target) {
            Some(m) => Contract::build(symbol, year, m, months, format),
            None => {
                let m = months.first();
                Contract::build(symbol, year + 1, m, months, format)
            }
        }
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn parse_rejects_malformed_codes() {
        let fin = MonthSet::financial();
        for code in ["esh2020", "clh2010", "es", "nk225mm1999", ""] {
            assert!(
                matches!(
                    Contract::parse(code, fin.clone(), CodeFormat::Barchart),
                    Err(Error::InvalidFormat { .. })
                ),
                "barchart should reject {code:?}"
            );
        }
        for code in ["nk225m", "nk225mm99", "esh20"] {
            assert!(
                matches!(
                    Contract::parse(code, fin.clone(), CodeFormat::Quandl),
                    Err(Error::InvalidFormat { .. })
                ),
                "quandl should reject {code:?}"
            );
        }
        // valid shape, month letter outside the set
        assert!(matches!(
            Contract::parse("esf20", fin, CodeFormat::Barchart),
            Err(Error::InvalidMonth { .. })
        ));
    }

    #[test]
    fn parse_barchart_fixtures() {
        let cases = [
            ("esh20", MonthSet::financial(), 2020, 3, "es", "esz19"),
            ("esh01", MonthSet::financial(), 2001, 3, "es", "esz00"),
            ("esh00", MonthSet::financial(), 2000, 3, "es", "esz99"),
            ("esm03", MonthSet::financial(), 2003, 6, "es", "esh03"),
            ("esu99", MonthSet::financial(), 1999, 9, "es", "esm99"),
            ("esz98", MonthSet::financial(), 1998, 12, "es", "esu98"),
            ("gcg01", MonthSet::even(), 2001, 2, "gc", "gcz00"),
            ("gcj14", MonthSet::even(), 2014, 4, "gc", "gcg14"),
            ("gcz13", MonthSet::even(), 2013, 12, "gc", "gcv13"),
            ("clf01", MonthSet::all(), 2001, 1, "cl", "clz00"),
            ("clf00", MonthSet::all(), 2000, 1, "cl", "clz99"),
            ("clg07", MonthSet::all(), 2007, 2, "cl", "clf07"),
            ("clz01", MonthSet::all(), 2001, 12, "cl", "clx01"),
        ];
        for (code, months, year, month, symbol, prev) in cases {
            let c = Contract::parse(code, months, CodeFormat::Barchart).unwrap();
            assert_eq!(c.code(), code);
            assert_eq!(c.year(), year, "{code}");
            assert_eq!(c.month(), month, "{code}");
            assert_eq!(c.symbol(), symbol, "{code}");
            assert_eq!(c.previous_contract().code(), prev, "{code}");
        }
    }

    #[test]
    fn parse_quandl_fixtures() {
        let cases = [
            ("nk225mh2000", 2000, 3, "nk225m", "nk225mz1999"),
            ("nk225mm1999", 1999, 6, "nk225m", "nk225mh1999"),
            ("nk225mz2006", 2006, 12, "nk225m", "nk225mu2006"),
        ];
        for (code, year, month, symbol, prev) in cases {
            let c = Contract::parse(code, MonthSet::financial(), CodeFormat::Quandl).unwrap();
            assert_eq!(c.code(), code);
            assert_eq!(c.year(), year);
            assert_eq!(c.month(), month);
            assert_eq!(c.symbol(), symbol);
            assert_eq!(c.previous_contract().code(), prev);
        }
    }

    #[test]
    fn previous_cycles_back_one_year_per_full_pass() {
        let c = Contract::parse("esh20", MonthSet::financial(), CodeFormat::Barchart).unwrap();
        let mut walked = c.clone();
        for _ in 0..c.months().len() {
            walked = walked.previous_contract();
        }
        assert_eq!(walked.month(), c.month());
        assert_eq!(walked.year(), c.year() - 1);
    }

    #[test]
    fn front_month_financial() {
        let cases = [
            ((2018, 1, 5), "esh18"),
            ((2008, 2, 1), "esh08"),
            ((1998, 3, 21), "esm98"),
            ((2010, 4, 11), "esm10"),
            ((2018, 6, 5), "esu18"),
            ((2001, 9, 23), "esz01"),
            ((2018, 11, 19), "esz18"),
            ((2018, 12, 5), "esh19"),
        ];
        for ((y, m, d), expect) in cases {
            let c = Contract::front_month(
                "es",
                MonthSet::financial(),
                CodeFormat::Barchart,
                utc(y, m, d),
            )
            .unwrap();
            assert_eq!(c.code(), expect, "at {y}-{m}-{d}");
        }
    }

    #[test]
    fn front_month_all_months_leads_two() {
        let cases = [
            ((1998, 1, 19), "clh98"),
            ((2000, 2, 27), "clj00"),
            ((2010, 5, 30), "cln10"),
            ((2011, 9, 17), "clx11"),
            ((1999, 10, 23), "clz99"),
            ((2008, 11, 6), "clf09"),
            ((2018, 12, 6), "clg19"),
        ];
        for ((y, m, d), expect) in cases {
            let c =
                Contract::front_month("cl", MonthSet::all(), CodeFormat::Barchart, utc(y, m, d))
                    .unwrap();
            assert_eq!(c.code(), expect, "at {y}-{m}-{d}");
        }
    }

    #[test]
    fn front_month_even_months() {
        let cases = [
            ((1998, 1, 17), "gcg98"),
            ((2018, 2, 15), "gcj18"),
            ((2000, 4, 25), "gcm00"),
            ((2005, 8, 31), "gcv05"),
            ((1999, 11, 6), "gcz99"),
            ((2018, 12, 6), "gcg19"),
        ];
        for ((y, m, d), expect) in cases {
            let c =
                Contract::front_month("gc", MonthSet::even(), CodeFormat::Barchart, utc(y, m, d))
                    .unwrap();
            assert_eq!(c.code(), expect, "at {y}-{m}-{d}");
        }
    }

    #[test]
    fn front_month_monotonic_in_date() {
        let mut prev = (0, 0);
        for month in 1..=12 {
            for day in 1..=28 {
                let c = Contract::front_month(
                    "es",
                    MonthSet::financial(),
                    CodeFormat::Barchart,
                    utc(2019, month, day),
                )
                .unwrap();
                let key = (c.year(), c.month());
                assert!(key >= prev, "front month regressed at 2019-{month}-{day}");
                prev = key;
            }
        }
    }
}
