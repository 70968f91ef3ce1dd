pub mod calendar;
pub mod contract;
pub mod months;
