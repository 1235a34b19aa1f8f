pub mod geology;
pub mod location;
pub mod source;
pub mod templates;

pub use geology::{resolve_feature_popup, FeatureCollection, FeaturePopup, FeatureSchema};
pub use location::{LocationBatch, LocationRecord, Photo, PhotoBatch};
pub use source::{Gate, HttpDataSource, LocationDataSource, StaticDataSource};
