//! Continuous futures contract construction.
//!
//! Individual futures contracts have a finite trading lifetime; charting and
//! analysis want one unbroken series per product. This crate decides which
//! contract is front month at any date, where the series rolls from one
//! contract to the next, and how pre-roll history is back-adjusted so the
//! splice shows no artificial jump.
//!
//! The main entry point is [`continuous::ContinuousContract`], which pulls
//! per-contract bar tables from a [`sources::DataSource`] and returns a
//! single ascending [`series::BarFrame`].

pub mod contracts;
pub mod continuous;
pub mod errors;
pub mod rolling;
pub mod series;
pub mod sources;

pub use continuous::{builder::ContinuousContract, presets};
pub use contracts::{
    calendar::{contract_list, load_contract_list, LoadedContract},
    contract::{CodeFormat, Contract},
    months::MonthSet,
};
pub use errors::{Error, Result};
pub use rolling::{AdjustMode, Adjustment, RollingMethod};
pub use series::{frame::BarFrame, frequency::Frequency};
pub use sources::{DataSource, MemorySource, SourceError};
