//! Directory-of-CSVs source in the layout Barchart downloads land in.
//!
//! Daily tables live at `<root>/<symbol>/<code>.csv`; intraday tables at
//! `<root>/<symbol>@<freq>/<code>.csv` (e.g. `es@60m/esh20.csv`). Files are
//! taken as exported: vendor column aliases, several timestamp formats, and a
//! "Downloaded from Barchart.com" footer line.

use std::io::Read;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use crate::series::frame::{Bar, BarFrame};
use crate::series::frequency::Frequency;
use crate::sources::{DataSource, SourceError};

#[derive(Debug, Clone)]
pub struct BarchartDir {
    root: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Timestamp,
    Open,
    High,
    Low,
    Close,
    Volume,
    OpenInterest,
    Ignored,
}

fn classify_header(name: &str) -> Column {
    match name.trim().to_ascii_lowercase().as_str() {
        "time" | "date" | "date time" | "timestamp" => Column::Timestamp,
        "open" => Column::Open,
        "high" => Column::High,
        "low" => Column::Low,
        "last" | "close" => Column::Close,
        "volume" => Column::Volume,
        "open int" | "openinterest" | "open interest" => Column::OpenInterest,
        _ => Column::Ignored,
    }
}

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%m/%d/%y", "%Y-%m-%d"];
const DATETIME_FORMATS: &[&str] = &["%m/%d/%Y %H:%M", "%Y-%m-%d %H:%M:%S"];

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_price(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return None;
    }
    raw.parse().ok()
}

/// Volume and open interest columns come back blank for thin sessions;
/// blanks read as zero rather than as holes.
fn parse_activity(raw: &str) -> Option<Decimal> {
    parse_price(raw).or(Some(Decimal::ZERO))
}

/// Root symbol of a vendor contract code: strip the year digits, then the
/// month letter.
fn root_of(code: &str) -> &str {
    let head = code.trim_end_matches(|c: char| c.is_ascii_digit());
    &head[..head.len().saturating_sub(1)]
}

impl BarchartDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn table_path(&self, code: &str, frequency: Frequency) -> Result<PathBuf, SourceError> {
        let symbol = root_of(code);
        let dir = match frequency {
            Frequency::Daily => symbol.to_string(),
            Frequency::Minutes15 => format!("{symbol}@15m"),
            Frequency::Minutes30 => format!("{symbol}@30m"),
            Frequency::Minutes60 => format!("{symbol}@60m"),
            Frequency::Weekly | Frequency::Monthly => {
                return Err(SourceError::Unsupported(frequency))
            }
        };
        Ok(self.root.join(dir).join(format!("{code}.csv")))
    }
}

fn read_table<R: Read>(reader: R) -> Result<BarFrame, SourceError> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<Column> = csv
        .headers()
        .map_err(|e| SourceError::Malformed {
            line: 1,
            reason: e.to_string(),
        })?
        .iter()
        .map(classify_header)
        .collect();
    if !columns.contains(&Column::Timestamp) {
        return Err(SourceError::Malformed {
            line: 1,
            reason: "no timestamp column".to_string(),
        });
    }
    let has_volume = columns.contains(&Column::Volume);
    let has_open_interest = columns.contains(&Column::OpenInterest);

    let mut bars = Vec::new();
    for (idx, record) in csv.records().enumerate() {
        let line = idx + 2;
        let record = record.map_err(|e| SourceError::Malformed {
            line,
            reason: e.to_string(),
        })?;
        let first = record.get(0).unwrap_or_default();
        // vendor footer, not data
        if first.starts_with("Downloaded from Barchart.com") {
            continue;
        }

        let mut bar = Bar {
            ts: DateTime::<Utc>::MIN_UTC,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
            open_interest: None,
        };
        let mut seen_ts = false;
        for (cell, column) in record.iter().zip(&columns) {
            match column {
                Column::Timestamp => {
                    bar.ts = parse_timestamp(cell).ok_or_else(|| SourceError::Malformed {
                        line,
                        reason: format!("bad timestamp {cell:?}"),
                    })?;
                    seen_ts = true;
                }
                Column::Open => bar.open = parse_price(cell),
                Column::High => bar.high = parse_price(cell),
                Column::Low => bar.low = parse_price(cell),
                Column::Close => bar.close = parse_price(cell),
                Column::Volume => bar.volume = parse_activity(cell),
                Column::OpenInterest => bar.open_interest = parse_activity(cell),
                Column::Ignored => {}
            }
        }
        if !seen_ts {
            return Err(SourceError::Malformed {
                line,
                reason: "row is missing its timestamp cell".to_string(),
            });
        }
        bars.push(bar);
    }

    Ok(BarFrame::from_bars(bars, has_volume, has_open_interest))
}

impl DataSource for BarchartDir {
    fn read(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        code: &str,
        frequency: Frequency,
    ) -> Result<BarFrame, SourceError> {
        let path = self.table_path(code, frequency)?;
        // an absent frequency directory means the symbol is not published at
        // this granularity; an absent file inside one means the contract is
        let dir = path.parent().unwrap_or(&self.root);
        if frequency.is_intraday() && !dir.is_dir() {
            return Err(SourceError::Unsupported(frequency));
        }
        if !path.is_file() {
            return Err(SourceError::NotFound {
                code: code.to_string(),
            });
        }
        let file = std::fs::File::open(&path)?;
        let frame = read_table(std::io::BufReader::new(file))?;
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
