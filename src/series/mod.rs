pub mod frame;
pub mod frequency;
pub mod resample;
