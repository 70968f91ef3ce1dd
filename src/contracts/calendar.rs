use chrono::{DateTime, Datelike, Utc};

use crate::contracts::contract::{CodeFormat, Contract};
use crate::contracts::months::MonthSet;
use crate::errors::{Error, Result};
use crate::series::frame::BarFrame;
use crate::series::frequency::Frequency;
use crate::sources::{DataSource, SourceError};

/// Delivery months at or below this (year, month) floor end the walk.
///
/// The floor is the front delivery as seen from `start` without any expiry
/// lead, so the list always reaches one contract past the window's oldest
/// delivery. That extra contract supplies the pre-roll history the splice
/// back-adjusts onto the rest.
fn walk_floor(start: DateTime<Utc>, months: &MonthSet) -> (i32, u32) {
    let date = start.date_naive();
    match months.next_at_or_after(date.month()) {
        Some(m) => (date.year(), m),
        None => (date.year() + 1, months.first()),
    }
}

/// All contracts covering `start..=end`, newest first.
///
/// Starts from the front month at `end` and steps back through the month set
/// until one contract past the floor at `start`.
pub fn contract_list(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    symbol: &str,
    months: &MonthSet,
    format: CodeFormat,
) -> Result<Vec<Contract>> {
    if end <= start {
        return Err(Error::EmptyRange {
            symbol: symbol.to_string(),
            start,
            end,
        });
    }

    let floor = walk_floor(start, months);
    let mut list = Vec::new();
    let mut contract = Contract::front_month(symbol, months.clone(), format, end)?;
    loop {
        let key = (contract.year(), contract.month());
        let next = contract.previous_contract();
        list.push(contract);
        if key < floor {
            break;
        }
        contract = next;
    }
    Ok(list)
}

/// A contract paired with its loaded bar table.
#[derive(Debug, Clone)]
pub struct LoadedContract {
    contract: Contract,
    frame: BarFrame,
}

impl LoadedContract {
    pub fn new(contract: Contract, frame: BarFrame) -> Self {
        Self { contract, frame }
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn frame(&self) -> &BarFrame {
        &self.frame
    }

    pub fn into_frame(self) -> BarFrame {
        self.frame
    }
}

/// [`contract_list`] with data attached, newest first.
///
/// Each contract's table is loaded in full; roll placement needs bars from
/// both sides of the window edges. A contract the source has never heard of
/// marks the edge of recorded history and ends the walk early. An entirely
/// dataless window is an error.
pub fn load_contract_list(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    symbol: &str,
    months: &MonthSet,
    format: CodeFormat,
    source: &dyn DataSource,
    frequency: Frequency,
) -> Result<Vec<LoadedContract>> {
    let calendar = contract_list(start, end, symbol, months, format)?;
    let mut loaded = Vec::with_capacity(calendar.len());
    for contract in calendar {
        let read = source.read(
            DateTime::<Utc>::MIN_UTC,
            DateTime::<Utc>::MAX_UTC,
            &contract.code(),
            frequency,
        );
        match read {
            Ok(frame) if frame.is_empty() => break,
            Ok(frame) => loaded.push(LoadedContract::new(contract, frame)),
            Err(SourceError::NotFound { .. }) => break,
            Err(e) => return Err(e.into()),
        }
    }
    if loaded.is_empty() {
        return Err(Error::EmptyRange {
            symbol: symbol.to_string(),
            start,
            end,
        });
    }
    Ok(loaded)
}
