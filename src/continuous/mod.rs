pub mod builder;
pub mod presets;
