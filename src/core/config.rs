//! Configuration for the location map view
//!
//! A deployment picks one of the [`MapVariant`] presets, which resolves to a
//! plain [`MapViewOptions`] value. Options can also be loaded from JSON; every
//! field has a default so partial documents are accepted.

use crate::{
    core::{
        constants::*,
        geo::{LatLng, Point},
    },
    data::geology::FeatureSchema,
    layers::{
        base::LayerTrait,
        group::LayerGroup,
        tile::{TileLayer, TileSourceKind},
    },
    spatial::clustering::ClusteringConfig,
    MapError, Result,
};
use serde::{Deserialize, Serialize};

const TOURIST_URL: &str = "https://mapserver.mapy.cz/turist-m/{z}-{x}-{y}";
const TOURIST_ATTRIBUTION: &str = "&copy; <a href=\"https://www.mapy.cz\">Mapy.cz</a>";
const ORTOFOTO_URL: &str = "https://ags.cuzk.cz/arcgis/rest/services/ortofoto/MapServer";
const RELIEF_URL: &str = "https://ags.cuzk.cz/arcgis/rest/services/3D/dmr5g_wm/ImageServer";
const HISTORY_MSK_URL: &str =
    "https://gis.msk.cz/arcgis/rest/services/podklad/podklad_cis_otisky_wm/MapServer";
const HISTORY_JCK_URL: &str =
    "https://gis.kraj-jihocesky.gov.cz/arcgis/rest/services/podkladove/Cisarske_otisky/MapServer";
const MINES_CZ_URL: &str = "https://mapy.geology.cz/arcgis/rest/services/Dulni_Dila/dulni_dila/MapServer";
const MINES_SK_URL: &str = "https://ags.geology.sk/arcgis/rest/services/Geofond/sbd_vect/MapServer";
const UNDERMINED_URL: &str =
    "https://mapy.geology.cz/arcgis/rest/services/Popularizace/pozustatky_po_tezbe/MapServer";
const QUARRIES_URL: &str =
    "https://mapy.geology.cz/arcgis/rest/services/Popularizace/dekoracni_kameny/MapServer";
const GEOLOGY_URL: &str =
    "https://mapy.geology.cz/arcgis/rest/services/Geologie/GEOCR50_mobil/MapServer";

#[derive(Debug, Clone, PartialEq)]
pub enum MapVariant {
    /// Tourist base map, markers and scale bar
    Basic,
    /// Base-map switcher, all overlays, locate and ruler controls
    Standard,
    /// Standard plus popups for clicked geology features
    Geology,
    /// Geology plus photo galleries for Czech mine works
    Photos,
    Custom(MapViewOptions),
}

impl MapVariant {
    pub fn resolve(&self) -> MapViewOptions {
        match self {
            Self::Basic => MapViewOptions {
                base_layers: vec![TileLayerConfig::tourist()],
                overlays: Vec::new(),
                controls: ControlOptions {
                    scale: Some(ScaleOptions::default()),
                    locate: None,
                    ruler: false,
                    layers: false,
                },
                ..MapViewOptions::base()
            },
            Self::Standard => MapViewOptions::base(),
            Self::Geology => MapViewOptions {
                feature_popups: true,
                ..MapViewOptions::base()
            },
            Self::Photos => MapViewOptions {
                feature_popups: true,
                photos_endpoint: Some(GEOFOND_PHOTOS_ENDPOINT.to_string()),
                ..MapViewOptions::base()
            },
            Self::Custom(options) => options.clone(),
        }
    }
}

impl Default for MapVariant {
    fn default() -> Self {
        Self::Standard
    }
}

impl std::str::FromStr for MapVariant {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "standard" => Ok(Self::Standard),
            "geology" => Ok(Self::Geology),
            "photos" => Ok(Self::Photos),
            other => Err(MapError::Config(format!("unknown map variant '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapViewOptions {
    pub center: LatLng,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Initial container size in pixels
    pub size: Point,
    /// Zoom used by `zoom_to`
    pub close_zoom: f64,
    /// First entry is the initially visible base map
    pub base_layers: Vec<TileLayerConfig>,
    /// Registered hidden until switched on
    pub overlays: Vec<OverlayConfig>,
    pub controls: ControlOptions,
    pub clustering: ClusteringConfig,
    /// Show popups for features identified on geology overlays
    pub feature_popups: bool,
    /// Base path of the photo gallery endpoint
    pub photos_endpoint: Option<String>,
    pub toast_timeout_ms: u64,
}

impl MapViewOptions {
    /// The full site configuration
    fn base() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            min_zoom: TILE_MIN_ZOOM as f64,
            max_zoom: TILE_MAX_ZOOM as f64,
            size: Point::new(DEFAULT_CONTAINER_SIZE.0, DEFAULT_CONTAINER_SIZE.1),
            close_zoom: CLOSE_ZOOM,
            base_layers: vec![
                TileLayerConfig::tourist(),
                TileLayerConfig::new(
                    "base-aerial",
                    "Aerial",
                    TileSourceKind::EsriDynamic {
                        url: ORTOFOTO_URL.to_string(),
                        layers: None,
                    },
                ),
                TileLayerConfig::new("base-none", "None", TileSourceKind::Empty),
            ],
            overlays: vec![
                OverlayConfig::single(TileLayerConfig::new(
                    "overlay-relief",
                    "Relief",
                    TileSourceKind::EsriImage {
                        url: RELIEF_URL.to_string(),
                    },
                )
                .with_opacity(OVERLAY_OPACITY)),
                OverlayConfig::group(
                    "overlay-history",
                    "History",
                    vec![
                        TileLayerConfig::new(
                            "overlay-history-msk",
                            "History (Moravian-Silesian)",
                            TileSourceKind::EsriTiled {
                                url: HISTORY_MSK_URL.to_string(),
                            },
                        )
                        .with_opacity(OVERLAY_OPACITY),
                        TileLayerConfig::new(
                            "overlay-history-jck",
                            "History (South Bohemian)",
                            TileSourceKind::EsriDynamic {
                                url: HISTORY_JCK_URL.to_string(),
                                layers: None,
                            },
                        )
                        .with_opacity(OVERLAY_OPACITY),
                    ],
                ),
                OverlayConfig::group(
                    "overlay-mines",
                    "Mines",
                    vec![
                        TileLayerConfig::new(
                            "overlay-mines-cz",
                            "Mine works (CZ)",
                            TileSourceKind::EsriDynamic {
                                url: MINES_CZ_URL.to_string(),
                                layers: None,
                            },
                        ),
                        TileLayerConfig::new(
                            "overlay-mines-sk",
                            "Mine works (SK)",
                            TileSourceKind::EsriDynamic {
                                url: MINES_SK_URL.to_string(),
                                layers: None,
                            },
                        ),
                    ],
                ),
                OverlayConfig::single(TileLayerConfig::new(
                    "overlay-undermined",
                    "Undermined",
                    TileSourceKind::EsriDynamic {
                        url: UNDERMINED_URL.to_string(),
                        layers: Some(vec![2]),
                    },
                ))
                .with_schema(FeatureSchema::UnderminedArea),
                OverlayConfig::single(TileLayerConfig::new(
                    "overlay-quarries",
                    "Quarries",
                    TileSourceKind::EsriDynamic {
                        url: QUARRIES_URL.to_string(),
                        layers: Some(vec![0]),
                    },
                ))
                .with_schema(FeatureSchema::DecorativeStone),
                OverlayConfig::single(TileLayerConfig::new(
                    "overlay-geology",
                    "Geology",
                    TileSourceKind::EsriTiled {
                        url: GEOLOGY_URL.to_string(),
                    },
                )
                .with_opacity(OVERLAY_OPACITY)),
            ],
            controls: ControlOptions::default(),
            clustering: ClusteringConfig::default(),
            feature_popups: false,
            photos_endpoint: None,
            toast_timeout_ms: TOAST_TIMEOUT_MS,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.center.is_valid() {
            return Err(MapError::InvalidCoordinates(format!(
                "center {} is out of range",
                self.center
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(MapError::Config(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        let mut seen = crate::prelude::HashSet::default();
        let ids = self
            .base_layers
            .iter()
            .map(|b| b.id.as_str())
            .chain(self.overlays.iter().map(|o| o.id.as_str()));
        for id in ids {
            if !seen.insert(id) {
                return Err(MapError::Config(format!("layer id '{}' used twice", id)));
            }
        }
        Ok(())
    }

    pub fn with_center(mut self, center: LatLng, zoom: f64) -> Self {
        self.center = center;
        self.zoom = zoom;
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Point::new(width, height);
        self
    }

    pub fn with_photos_endpoint(mut self, endpoint: &str) -> Self {
        self.photos_endpoint = Some(endpoint.trim_end_matches('/').to_string());
        self
    }

    pub fn overlay(&self, id: &str) -> Option<&OverlayConfig> {
        self.overlays.iter().find(|o| o.id == id)
    }
}

impl Default for MapViewOptions {
    fn default() -> Self {
        MapVariant::default().resolve()
    }
}

/// One raster layer as it appears in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayerConfig {
    pub id: String,
    pub name: String,
    pub source: TileSourceKind,
    #[serde(default)]
    pub attribution: Option<String>,
    #[serde(default = "default_min_zoom")]
    pub min_zoom: u8,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_min_zoom() -> u8 {
    TILE_MIN_ZOOM
}

fn default_max_zoom() -> u8 {
    TILE_MAX_ZOOM
}

fn default_opacity() -> f32 {
    1.0
}

impl TileLayerConfig {
    pub fn new(id: &str, name: &str, source: TileSourceKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            source,
            attribution: None,
            min_zoom: TILE_MIN_ZOOM,
            max_zoom: TILE_MAX_ZOOM,
            opacity: 1.0,
        }
    }

    pub fn tourist() -> Self {
        Self {
            attribution: Some(TOURIST_ATTRIBUTION.to_string()),
            ..Self::new(
                "base-tourists",
                "Tourists",
                TileSourceKind::Xyz {
                    template: TOURIST_URL.to_string(),
                },
            )
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn build(&self) -> TileLayer {
        let mut layer = TileLayer::new(&self.id, &self.name, self.source.clone())
            .with_zoom_range(self.min_zoom, self.max_zoom)
            .with_opacity(self.opacity);
        if let Some(attribution) = &self.attribution {
            layer = layer.with_attribution(attribution);
        }
        layer
    }
}

/// Overlay entry of the layers switcher; several members form a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    pub id: String,
    pub name: String,
    pub layers: Vec<TileLayerConfig>,
    /// Popup schema for features identified on this overlay
    #[serde(default)]
    pub schema: Option<FeatureSchema>,
}

impl OverlayConfig {
    pub fn single(layer: TileLayerConfig) -> Self {
        Self {
            id: layer.id.clone(),
            name: layer.name.clone(),
            layers: vec![layer],
            schema: None,
        }
    }

    pub fn group(id: &str, name: &str, layers: Vec<TileLayerConfig>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            layers,
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: FeatureSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Build the hidden map layer for this overlay
    pub fn build(&self) -> Box<dyn LayerTrait> {
        let mut layer: Box<dyn LayerTrait> = match self.layers.as_slice() {
            [single] if single.id == self.id => Box::new(single.build()),
            members => {
                let mut group = LayerGroup::new(&self.id, &self.name);
                for member in members {
                    group.add_layer(Box::new(member.build()));
                }
                Box::new(group)
            }
        };
        layer.set_visible(false);
        layer
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlOptions {
    pub scale: Option<ScaleOptions>,
    pub locate: Option<LocateOptions>,
    /// Distance/bearing ruler
    pub ruler: bool,
    /// Base map and overlay switcher
    pub layers: bool,
}

impl Default for ControlOptions {
    fn default() -> Self {
        Self {
            scale: Some(ScaleOptions::default()),
            locate: Some(LocateOptions::default()),
            ruler: true,
            layers: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleOptions {
    /// Maximum bar width in pixels
    pub max_width: f64,
    pub metric: bool,
    pub imperial: bool,
}

impl Default for ScaleOptions {
    fn default() -> Self {
        Self {
            max_width: SCALE_MAX_WIDTH,
            metric: true,
            imperial: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocateOptions {
    /// Keep the view centred on new fixes
    pub follow: bool,
    /// Zoom of the first fix
    pub max_zoom: f64,
    pub enable_high_accuracy: bool,
    pub maximum_age_ms: u64,
    pub timeout_ms: u64,
    pub title: String,
    pub icon: String,
}

impl Default for LocateOptions {
    fn default() -> Self {
        Self {
            follow: true,
            max_zoom: LOCATE_MAX_ZOOM,
            enable_high_accuracy: true,
            maximum_age_ms: LOCATE_MAXIMUM_AGE_MS,
            timeout_ms: LOCATE_TIMEOUT_MS,
            title: "GPS".to_string(),
            icon: "bi bi-geo-alt".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_presets() {
        let basic = MapVariant::Basic.resolve();
        let standard = MapVariant::Standard.resolve();
        let photos = MapVariant::Photos.resolve();

        assert_eq!(basic.base_layers.len(), 1);
        assert!(basic.overlays.is_empty());
        assert!(basic.controls.locate.is_none());

        let names: Vec<&str> = standard.base_layers.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Tourists", "Aerial", "None"]);
        let overlays: Vec<&str> = standard.overlays.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            overlays,
            ["Relief", "History", "Mines", "Undermined", "Quarries", "Geology"]
        );
        assert!(!standard.feature_popups);

        assert!(photos.feature_popups);
        assert_eq!(photos.photos_endpoint.as_deref(), Some("/api/geofond_photos"));
        assert_eq!(photos.close_zoom, 14.0);
    }

    #[test]
    fn test_overlay_layer_options_follow_site() {
        let options = MapViewOptions::default();
        let undermined = options.overlay("overlay-undermined").unwrap();
        assert_eq!(
            undermined.layers[0].source,
            TileSourceKind::EsriDynamic {
                url: UNDERMINED_URL.to_string(),
                layers: Some(vec![2])
            }
        );
        assert_eq!(options.overlay("overlay-relief").unwrap().layers[0].opacity, 0.8);
        assert_eq!(options.overlay("overlay-history").unwrap().layers.len(), 2);
    }

    #[test]
    fn test_overlays_build_hidden() {
        let options = MapViewOptions::default();
        let mines = options.overlay("overlay-mines").unwrap().build();
        assert_eq!(mines.layer_type(), crate::layers::base::LayerType::Group);
        assert!(!mines.is_visible());

        let relief = options.overlay("overlay-relief").unwrap().build();
        assert_eq!(relief.id(), "overlay-relief");
        assert!(!relief.is_visible());
    }

    #[test]
    fn test_from_json_partial() {
        let options = MapViewOptions::from_json(
            r#"{ "zoom": 10, "photos_endpoint": "/photos", "controls": { "ruler": false } }"#,
        )
        .unwrap();
        assert_eq!(options.zoom, 10.0);
        assert_eq!(options.photos_endpoint.as_deref(), Some("/photos"));
        assert!(!options.controls.ruler);
        assert!(options.controls.scale.is_some());
        assert_eq!(options.base_layers.len(), 3);
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert!(matches!(
            MapViewOptions::from_json("{ not json"),
            Err(MapError::Parse(_))
        ));
        assert!(matches!(
            MapViewOptions::from_json(r#"{ "min_zoom": 12, "max_zoom": 4 }"#),
            Err(MapError::Config(_))
        ));
        assert!(matches!(
            MapViewOptions::from_json(r#"{ "center": { "lat": 95.0, "lng": 0.0 } }"#),
            Err(MapError::InvalidCoordinates(_))
        ));
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!("Photos".parse::<MapVariant>().unwrap(), MapVariant::Photos);
        assert!("satellite".parse::<MapVariant>().is_err());
    }

    #[test]
    fn test_custom_source_deserializes() {
        let layer: TileLayerConfig = serde_json::from_str(
            r#"{ "id": "osm", "name": "OSM",
                 "source": { "kind": "xyz", "template": "https://tile.example.org/{z}/{x}/{y}.png" } }"#,
        )
        .unwrap();
        assert_eq!(layer.max_zoom, 19);
        assert_eq!(layer.opacity, 1.0);
        assert_eq!(layer.build().tile_url(&crate::TileCoord::new(1, 2, 3)).unwrap(),
            "https://tile.example.org/3/1/2.png");
    }
}
