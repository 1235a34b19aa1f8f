// LayerTrait is the shared LayerOperations contract
pub use crate::traits::LayerOperations as LayerTrait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerType {
    Tile,
    /// Server-rendered overlay requested per viewport (Esri export)
    Image,
    Marker,
    MarkerCluster,
    Group,
    Custom,
}

impl std::fmt::Display for LayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerType::Tile => write!(f, "tile"),
            LayerType::Image => write!(f, "image"),
            LayerType::Marker => write!(f, "marker"),
            LayerType::MarkerCluster => write!(f, "marker_cluster"),
            LayerType::Group => write!(f, "group"),
            LayerType::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayerProperties {
    pub id: String,
    pub name: String,
    pub layer_type: LayerType,
    pub z_index: i32,
    pub opacity: f32,
    pub visible: bool,
    pub interactive: bool,
}

impl LayerProperties {
    pub fn new(id: String, name: String, layer_type: LayerType) -> Self {
        Self {
            id,
            name,
            layer_type,
            z_index: 0,
            opacity: 1.0,
            visible: true,
            interactive: true,
        }
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

impl Default for LayerProperties {
    fn default() -> Self {
        Self::new(
            "default".to_string(),
            "Default Layer".to_string(),
            LayerType::Custom,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_properties() {
        let props = LayerProperties::new(
            "relief".to_string(),
            "Relief".to_string(),
            LayerType::Image,
        )
        .with_opacity(0.8)
        .with_visible(false);

        assert_eq!(props.id, "relief");
        assert_eq!(props.name, "Relief");
        assert_eq!(props.layer_type, LayerType::Image);
        assert_eq!(props.z_index, 0);
        assert_eq!(props.opacity, 0.8);
        assert!(!props.visible);
    }

    #[test]
    fn test_opacity_is_clamped() {
        let props = LayerProperties::default().with_opacity(3.0);
        assert_eq!(props.opacity, 1.0);
    }

    #[test]
    fn test_layer_type_display() {
        assert_eq!(LayerType::Tile.to_string(), "tile");
        assert_eq!(LayerType::MarkerCluster.to_string(), "marker_cluster");
        assert_eq!(LayerType::Marker.to_string(), "marker");
    }
}
