//! Fluent configuration of a location map view
//!
//! Starts from a [`MapVariant`] preset and overrides individual options before
//! building the map and the view on top of it.

use crate::{
    core::{
        config::{ControlOptions, MapVariant, MapViewOptions},
        geo::{LatLng, Point},
        map::Map,
    },
    data::source::{HttpDataSource, LocationDataSource},
    spatial::clustering::ClusteringConfig,
    ui::toast::Clipboard,
    view::LocationMapView,
    Result,
};
use std::rc::Rc;

/// Builder for [`LocationMapView`] instances
pub struct MapViewBuilder {
    container_id: String,
    options: MapViewOptions,
    source: Option<Rc<dyn LocationDataSource>>,
    clipboard: Option<Rc<dyn Clipboard>>,
}

impl MapViewBuilder {
    /// Builder for the default variant bound to `container_id`
    pub fn new(container_id: &str) -> Self {
        Self::with_variant(container_id, MapVariant::default())
    }

    pub fn with_variant(container_id: &str, variant: MapVariant) -> Self {
        Self {
            container_id: container_id.to_string(),
            options: variant.resolve(),
            source: None,
            clipboard: None,
        }
    }

    /// Replace all options at once
    pub fn with_options(mut self, options: MapViewOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the initial center and zoom level
    pub fn with_center_and_zoom(mut self, center: LatLng, zoom: f64) -> Self {
        self.options.center = center;
        self.options.zoom = zoom;
        self
    }

    /// Initial container size in pixels
    pub fn with_size(mut self, size: Point) -> Self {
        self.options.size = size;
        self
    }

    pub fn with_zoom_limits(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.options.min_zoom = min_zoom;
        self.options.max_zoom = max_zoom;
        self
    }

    /// Zoom used when focusing a single location
    pub fn with_close_zoom(mut self, zoom: f64) -> Self {
        self.options.close_zoom = zoom;
        self
    }

    pub fn with_controls(mut self, controls: ControlOptions) -> Self {
        self.options.controls = controls;
        self
    }

    pub fn with_clustering(mut self, clustering: ClusteringConfig) -> Self {
        self.options.clustering = clustering;
        self
    }

    pub fn with_feature_popups(mut self, enabled: bool) -> Self {
        self.options.feature_popups = enabled;
        self
    }

    /// Base path of the photo gallery endpoint; enables feature popups
    pub fn with_photos_endpoint(mut self, endpoint: &str) -> Self {
        self.options = self.options.with_photos_endpoint(endpoint);
        self.options.feature_popups = true;
        self
    }

    pub fn with_toast_timeout(mut self, timeout_ms: u64) -> Self {
        self.options.toast_timeout_ms = timeout_ms;
        self
    }

    pub fn with_data_source(mut self, source: Rc<dyn LocationDataSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_clipboard(mut self, clipboard: Rc<dyn Clipboard>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    pub fn options(&self) -> &MapViewOptions {
        &self.options
    }

    /// Build only the map widget
    pub fn build_map(&self) -> Result<Map> {
        Map::from_options(&self.container_id, &self.options)
    }

    /// Build the view; without a data source requests go over HTTP
    pub fn build(self) -> Result<LocationMapView> {
        let source = match self.source {
            Some(source) => source,
            None => Rc::new(HttpDataSource::new()?),
        };
        let view = LocationMapView::initialize(&self.container_id, self.options, source)?;
        Ok(match self.clipboard {
            Some(clipboard) => view.with_clipboard(clipboard),
            None => view,
        })
    }
}

/// Convenience constructors for the site's map variants
impl MapViewBuilder {
    /// Tourist map with markers and a scale bar
    pub fn basic(container_id: &str) -> Self {
        Self::with_variant(container_id, MapVariant::Basic)
    }

    /// Base-map switcher, overlays, locate and ruler
    pub fn standard(container_id: &str) -> Self {
        Self::with_variant(container_id, MapVariant::Standard)
    }

    /// Standard map with geology feature popups
    pub fn geology(container_id: &str) -> Self {
        Self::with_variant(container_id, MapVariant::Geology)
    }

    /// Geology map with photo galleries of Czech mine works
    pub fn photos(container_id: &str) -> Self {
        Self::with_variant(container_id, MapVariant::Photos)
    }
}
