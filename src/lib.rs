//! # geosite-map
//!
//! Location map view for a site cataloguing mines, quarries, caves and other
//! geological points of interest.
//!
//! The crate provides a headless, Leaflet-style map engine (viewport, tile and
//! overlay layers, controls, popups) and a [`LocationMapView`] on top of it that
//! loads location records from a JSON endpoint, turns them into clustered
//! markers and wires tag filters for type, state and accessibility.

pub mod core;
pub mod data;
pub mod layers;
pub mod plugins;
pub mod rendering;
pub mod runtime;
pub mod spatial;
pub mod traits;
pub mod ui;
pub mod view;

pub mod prelude;
pub use crate::core::constants;

// Re-export public API
pub use core::{
    bounds::Bounds,
    config::{MapVariant, MapViewOptions},
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::Map,
    viewport::Viewport,
};

pub use layers::{
    base::LayerTrait, cluster::MarkerCollection, group::LayerGroup, marker::Marker,
    tile::TileLayer,
};

pub use data::{
    geology::{FeatureSchema, FeaturePopup},
    location::{LocationBatch, LocationRecord, Photo},
    source::{HttpDataSource, LocationDataSource, StaticDataSource},
};

pub use plugins::{base::PluginTrait, measure::MeasurePlugin};

pub use rendering::context::{DrawCommand, RenderContext};

pub use spatial::{clustering::Clustering, index::SpatialIndex};

pub use traits::MapWidget;

pub use ui::{
    filter::{FilterBar, TagAttribute, TagFilterButton},
    popup::{Popup, PopupManager},
    toast::{Clipboard, Toast, ToastArea},
};

pub use view::{FeaturePopupOpened, FetchHandle, FetchReport, LocationMapView};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure; the request may succeed if issued again
    #[error("Network error: {0}")]
    Network(String),

    /// Payload does not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// A single record could not be turned into a marker
    #[error("Render error: {0}")]
    Render(String),

    /// The owning view was destroyed while the task was suspended
    #[error("Task cancelled: {0}")]
    Cancelled(String),

    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),

    #[error("Layer error: {0}")]
    Layer(String),

    #[error("Plugin error: {0}")]
    Plugin(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MapError {
    /// Whether issuing the same request again could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, MapError::Network(_))
    }
}

impl From<reqwest::Error> for MapError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MapError::Parse(err.to_string())
        } else {
            MapError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        MapError::Parse(err.to_string())
    }
}

/// Error type alias for convenience
pub type Error = MapError;

/// Installs `env_logger` as the `log` backend, honouring `RUST_LOG`.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[cfg(all(test, feature = "debug"))]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
        log::info!("logging initialised twice without panicking");
    }
}
