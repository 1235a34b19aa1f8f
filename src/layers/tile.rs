use crate::{
    core::{
        constants::{TILE_MAX_ZOOM, TILE_MIN_ZOOM, TILE_SIZE},
        geo::{LatLng, LatLngBounds, Point, TileCoord, EARTH_RADIUS},
        viewport::Viewport,
    },
    layers::base::{LayerProperties, LayerTrait, LayerType},
    rendering::context::RenderContext,
    Result,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Where the pixels of a raster layer come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TileSourceKind {
    /// Plain `{z}/{x}/{y}` template
    Xyz { template: String },
    /// ArcGIS MapServer with pre-rendered tiles
    EsriTiled { url: String },
    /// ArcGIS MapServer rendered per viewport via `/export`
    EsriDynamic {
        url: String,
        #[serde(default)]
        layers: Option<Vec<u32>>,
    },
    /// ArcGIS ImageServer rendered per viewport via `/exportImage`
    EsriImage { url: String },
    /// Draws nothing; used for the "None" base map
    Empty,
}

impl TileSourceKind {
    /// Tiled sources are drawn as a grid, the others as one viewport-sized image
    pub fn is_tiled(&self) -> bool {
        matches!(self, TileSourceKind::Xyz { .. } | TileSourceKind::EsriTiled { .. })
    }
}

/// Configuration for a tile layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayerOptions {
    /// Attribution HTML shown in the map corner
    pub attribution: Option<String>,
    pub tile_size: u32,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Limit requests to this area
    pub bounds: Option<LatLngBounds>,
}

impl Default for TileLayerOptions {
    fn default() -> Self {
        Self {
            attribution: None,
            tile_size: TILE_SIZE,
            min_zoom: TILE_MIN_ZOOM,
            max_zoom: TILE_MAX_ZOOM,
            bounds: None,
        }
    }
}

/// Raster layer backed by an XYZ template or an ArcGIS REST service
///
/// The layer never downloads anything itself: `render` queues tile or image
/// URLs and the host fetches them.
pub struct TileLayer {
    properties: LayerProperties,
    kind: TileSourceKind,
    options: TileLayerOptions,
}

impl TileLayer {
    pub fn new(id: &str, name: &str, kind: TileSourceKind) -> Self {
        let layer_type = if kind.is_tiled() || kind == TileSourceKind::Empty {
            LayerType::Tile
        } else {
            LayerType::Image
        };
        Self {
            properties: LayerProperties::new(id.to_string(), name.to_string(), layer_type),
            kind,
            options: TileLayerOptions::default(),
        }
    }

    pub fn xyz(id: &str, name: &str, template: &str) -> Self {
        Self::new(
            id,
            name,
            TileSourceKind::Xyz {
                template: template.to_string(),
            },
        )
    }

    pub fn esri_tiled(id: &str, name: &str, url: &str) -> Self {
        Self::new(
            id,
            name,
            TileSourceKind::EsriTiled {
                url: url.trim_end_matches('/').to_string(),
            },
        )
    }

    pub fn esri_dynamic(id: &str, name: &str, url: &str, layers: Option<Vec<u32>>) -> Self {
        Self::new(
            id,
            name,
            TileSourceKind::EsriDynamic {
                url: url.trim_end_matches('/').to_string(),
                layers,
            },
        )
    }

    pub fn esri_image(id: &str, name: &str, url: &str) -> Self {
        Self::new(
            id,
            name,
            TileSourceKind::EsriImage {
                url: url.trim_end_matches('/').to_string(),
            },
        )
    }

    pub fn empty(id: &str, name: &str) -> Self {
        Self::new(id, name, TileSourceKind::Empty)
    }

    pub fn with_attribution(mut self, attribution: &str) -> Self {
        self.options.attribution = Some(attribution.to_string());
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.options.min_zoom = min_zoom;
        self.options.max_zoom = max_zoom;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.set_opacity(opacity);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.set_visible(visible);
        self
    }

    pub fn kind(&self) -> &TileSourceKind {
        &self.kind
    }

    pub fn attribution(&self) -> Option<&str> {
        self.options.attribution.as_deref()
    }

    /// URL of a single tile; `None` for sources rendered per viewport
    pub fn tile_url(&self, coord: &TileCoord) -> Option<String> {
        match &self.kind {
            TileSourceKind::Xyz { template } => Some(
                template
                    .replace("{z}", &coord.z.to_string())
                    .replace("{x}", &coord.x.to_string())
                    .replace("{y}", &coord.y.to_string()),
            ),
            TileSourceKind::EsriTiled { url } => {
                Some(format!("{}/tile/{}/{}/{}", url, coord.z, coord.y, coord.x))
            }
            _ => None,
        }
    }

    /// Export request covering the whole viewport; `None` for tiled sources
    pub fn export_url(&self, viewport: &Viewport) -> Option<String> {
        let bounds = viewport.bounds();
        let (xmin, ymin) = spherical_mercator(&bounds.south_west);
        let (xmax, ymax) = spherical_mercator(&bounds.north_east);
        let bbox = format!("{:.3},{:.3},{:.3},{:.3}", xmin, ymin, xmax, ymax);
        let size = format!("{},{}", viewport.size.x.round(), viewport.size.y.round());

        match &self.kind {
            TileSourceKind::EsriDynamic { url, layers } => {
                let mut query = format!(
                    "{}/export?bbox={}&size={}&dpi=96&format=png32&transparent=true&bboxSR=3857&imageSR=3857",
                    url, bbox, size
                );
                if let Some(layers) = layers {
                    let ids: Vec<String> = layers.iter().map(|id| id.to_string()).collect();
                    query.push_str(&format!("&layers=show:{}", ids.join(",")));
                }
                query.push_str("&f=image");
                Some(query)
            }
            TileSourceKind::EsriImage { url } => Some(format!(
                "{}/exportImage?bbox={}&size={}&format=jpgpng&bboxSR=3857&imageSR=3857&f=image",
                url, bbox, size
            )),
            _ => None,
        }
    }

    /// Tiles covering the viewport at the layer's effective zoom
    pub fn visible_tiles(&self, viewport: &Viewport) -> Vec<TileCoord> {
        let zoom = (viewport.zoom.floor() as u8).clamp(self.options.min_zoom, self.options.max_zoom);
        let bounds = viewport.bounds();
        if let Some(limit) = &self.options.bounds {
            if !limit.intersects(&bounds) {
                return Vec::new();
            }
        }

        let north_west = LatLng::new(bounds.north_east.lat, bounds.south_west.lng);
        let south_east = LatLng::new(bounds.south_west.lat, bounds.north_east.lng);
        let min = TileCoord::from_lat_lng(&north_west, zoom);
        let max = TileCoord::from_lat_lng(&south_east, zoom);

        let mut tiles = Vec::new();
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                tiles.push(TileCoord::new(x, y, zoom));
            }
        }
        tiles
    }

    fn tile_screen_bounds(coord: &TileCoord, viewport: &Viewport) -> (Point, Point) {
        let north_west = coord.to_lat_lng();
        let south_east = TileCoord::new(coord.x + 1, coord.y + 1, coord.z).to_lat_lng();
        let min = viewport.lat_lng_to_pixel(&north_west);
        let max = viewport.lat_lng_to_pixel(&south_east);
        (
            Point::new(min.x.min(max.x), min.y.min(max.y)),
            Point::new(min.x.max(max.x), min.y.max(max.y)),
        )
    }
}

fn spherical_mercator(lat_lng: &LatLng) -> (f64, f64) {
    let x = lat_lng.lng.to_radians() * EARTH_RADIUS;
    let lat = LatLng::clamp_lat(lat_lng.lat);
    let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
    (x, y)
}

impl LayerTrait for TileLayer {
    crate::impl_layer_trait!(TileLayer, properties);

    fn render(&mut self, context: &mut RenderContext, viewport: &Viewport) -> Result<()> {
        if !self.is_visible() || self.kind == TileSourceKind::Empty {
            return Ok(());
        }

        if self.kind.is_tiled() {
            let tiles = self.visible_tiles(viewport);
            log::debug!("tile layer '{}': {} tiles in view", self.id(), tiles.len());
            for coord in tiles {
                if let Some(url) = self.tile_url(&coord) {
                    let bounds = Self::tile_screen_bounds(&coord, viewport);
                    context.render_tile(url, bounds, self.opacity())?;
                }
            }
        } else if let Some(url) = self.export_url(viewport) {
            let bounds = (Point::new(0.0, 0.0), viewport.size);
            context.render_image(url, bounds, self.opacity())?;
        }
        Ok(())
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        self.options.bounds.clone()
    }

    fn options(&self) -> serde_json::Value {
        serde_json::json!({
            "source": self.kind,
            "attribution": self.options.attribution,
            "tile_size": self.options.tile_size,
            "min_zoom": self.options.min_zoom,
            "max_zoom": self.options.max_zoom,
            "opacity": self.opacity(),
        })
    }
}
