pub mod base;
pub mod cluster;
pub mod group;
pub mod macros;
pub mod manager;
pub mod marker;
pub mod tile;

pub use base::{LayerProperties, LayerTrait, LayerType};
pub use cluster::MarkerCollection;
pub use group::LayerGroup;
pub use manager::LayerManager;
pub use marker::{Marker, MarkerTags, Tooltip};
pub use tile::{TileLayer, TileSourceKind};
