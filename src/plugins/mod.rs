pub mod base;
pub mod measure;

pub use base::{MapEvent, PluginTrait};
pub use measure::{MeasureConfig, MeasurePlugin, Measurement, UnitSystem};
