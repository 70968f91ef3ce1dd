//! Daily-to-weekly and daily-to-monthly roll-ups.
//!
//! Buckets aggregate open as first, high as max, low as min, close as last,
//! volume as sum, open interest as last, each over the values actually
//! present. Weekly bars are labelled with the Friday closing the week,
//! monthly bars with the last calendar day of the month.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::series::frame::{Bar, BarFrame};

fn week_label(ts: DateTime<Utc>) -> NaiveDate {
    let date = ts.date_naive();
    let to_friday = (4 + 7 - date.weekday().num_days_from_monday()) % 7;
    date + Days::new(u64::from(to_friday))
}

fn month_label(ts: DateTime<Utc>) -> NaiveDate {
    let date = ts.date_naive();
    let first_of_next = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    first_of_next.expect("month arithmetic stays in range").pred_opt().expect("dates are far from MIN")
}

#[derive(Default)]
struct Bucket {
    open: Option<Decimal>,
    high: Option<Decimal>,
    low: Option<Decimal>,
    close: Option<Decimal>,
    volume: Option<Decimal>,
    open_interest: Option<Decimal>,
}

impl Bucket {
    fn fold(&mut self, bar: &Bar) {
        if self.open.is_none() {
            self.open = bar.open;
        }
        self.high = match (self.high, bar.high) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.low = match (self.low, bar.low) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.close = bar.close.or(self.close);
        self.volume = match (self.volume, bar.volume) {
            (Some(a), Some(b)) => Some(a + b),
            (a, b) => a.or(b),
        };
        self.open_interest = bar.open_interest.or(self.open_interest);
    }

    fn into_bar(self, label: NaiveDate) -> Bar {
        Bar {
            ts: label
                .and_hms_opt(0, 0, 0)
                .expect("midnight is valid")
                .and_utc(),
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            open_interest: self.open_interest,
        }
    }
}

fn resample(frame: &BarFrame, label: fn(DateTime<Utc>) -> NaiveDate) -> BarFrame {
    let mut out: Vec<Bar> = Vec::new();
    let mut current: Option<(NaiveDate, Bucket)> = None;
    for bar in frame.bars() {
        let key = label(bar.ts);
        match &mut current {
            Some((k, bucket)) if *k == key => bucket.fold(bar),
            _ => {
                if let Some((k, bucket)) = current.take() {
                    out.push(bucket.into_bar(k));
                }
                let mut bucket = Bucket::default();
                bucket.fold(bar);
                current = Some((key, bucket));
            }
        }
    }
    if let Some((k, bucket)) = current {
        out.push(bucket.into_bar(k));
    }
    BarFrame::from_bars(out, frame.has_volume(), frame.has_open_interest())
}

pub fn daily_to_weekly(frame: &BarFrame) -> BarFrame {
    resample(frame, week_label)
}

pub fn daily_to_monthly(frame: &BarFrame) -> BarFrame {
    resample(frame, month_label)
}
