//! Prelude module for common geosite-map types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use geosite_map::prelude::*;`

pub use crate::core::{
    bounds::Bounds,
    builder::MapViewBuilder,
    config::{
        ControlOptions, LocateOptions, MapVariant, MapViewOptions, OverlayConfig, ScaleOptions,
        TileLayerConfig,
    },
    geo::{LatLng, LatLngBounds, Point, TileCoord},
    map::Map,
    viewport::Viewport,
};

pub use crate::layers::{
    base::{LayerProperties, LayerTrait, LayerType},
    cluster::MarkerCollection,
    group::LayerGroup,
    manager::LayerManager,
    marker::{Marker, MarkerTags, Tooltip},
    tile::{TileLayer, TileSourceKind},
};

pub use crate::data::{
    geology::{FeatureCollection, FeaturePopup, FeatureSchema},
    location::{LocationBatch, LocationRecord, Photo, PhotoBatch},
    source::{HttpDataSource, LocationDataSource, StaticDataSource},
};

pub use crate::plugins::{base::PluginTrait, measure::MeasurePlugin};

pub use crate::spatial::{
    clustering::{Cluster, Clustering, ClusteringConfig},
    index::{SpatialIndex, SpatialItem},
};

pub use crate::rendering::context::{DrawCommand, RenderContext};

pub use crate::runtime::{spawn_local, TaskHandle};

pub use crate::traits::MapWidget;

pub use crate::ui::{
    controls::{Control, ControlManager, LayersControl, LocateControl, Position, ScaleControl},
    filter::{FilterBar, TagAttribute, TagFilterButton},
    popup::{Lightbox, Popup, PopupManager},
    toast::{Clipboard, MemoryClipboard, Toast, ToastArea},
};

pub use crate::view::{FeaturePopupOpened, FetchHandle, FetchReport, LocationMapView};

pub use crate::{Error as MapError, Result};

pub use std::{
    rc::Rc,
    sync::Arc,
    time::Duration,
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;
pub use std::pin::Pin;
