use crate::{
    core::viewport::Viewport, layers::base::LayerTrait, rendering::context::RenderContext,
    MapError, Result,
};

use crate::prelude::HashMap;

/// Manages layers for the map, handling ordering and rendering
pub struct LayerManager {
    /// All layers indexed by ID
    layers: HashMap<String, Box<dyn LayerTrait>>,
    /// Ordered list of layer IDs for rendering (sorted by z-index, stable)
    render_order: Vec<String>,
}

impl LayerManager {
    pub fn new() -> Self {
        Self {
            layers: HashMap::default(),
            render_order: Vec::new(),
        }
    }

    /// Adds a layer to the manager; ids must be unique
    pub fn add_layer(&mut self, layer: Box<dyn LayerTrait>) -> Result<()> {
        let layer_id = layer.id().to_string();
        if self.layers.contains_key(&layer_id) {
            return Err(MapError::Layer(format!("layer '{}' already added", layer_id)));
        }
        let z_index = layer.z_index();

        self.layers.insert(layer_id.clone(), layer);

        // Insert in sorted order by z-index
        let insert_pos = self
            .render_order
            .iter()
            .position(|id| {
                self.layers
                    .get(id)
                    .map(|l| l.z_index() > z_index)
                    .unwrap_or(false)
            })
            .unwrap_or(self.render_order.len());

        self.render_order.insert(insert_pos, layer_id);
        Ok(())
    }

    /// Removes a layer from the manager
    pub fn remove_layer(&mut self, layer_id: &str) -> Option<Box<dyn LayerTrait>> {
        self.render_order.retain(|id| id != layer_id);
        self.layers.remove(layer_id)
    }

    /// Gets a reference to a layer by ID
    pub fn get_layer(&self, layer_id: &str) -> Option<&(dyn LayerTrait + 'static)> {
        self.layers.get(layer_id).map(|l| l.as_ref())
    }

    /// Gets a mutable reference to a layer by ID
    pub fn get_layer_mut(&mut self, layer_id: &str) -> Option<&mut (dyn LayerTrait + 'static)> {
        self.layers.get_mut(layer_id).map(|l| l.as_mut())
    }

    /// Lists layer IDs in render order
    pub fn list_layers(&self) -> Vec<String> {
        self.render_order.clone()
    }

    /// Applies a function to each layer immutably in render order.
    /// Renders all visible layers in order
    pub fn render(&mut self, context: &mut RenderContext, viewport: &Viewport) -> Result<()> {
        let viewport_bounds = viewport.bounds();

        for layer_id in &self.render_order {
            if let Some(layer) = self.layers.get_mut(layer_id) {
                // Only render visible layers that intersect with viewport
                if layer.is_visible() && layer.intersects_bounds(&viewport_bounds) {
                    layer.render(context, viewport)?;
                }
            }
        }
        Ok(())
    }

    /// Gets the number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Checks if the manager is empty
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::tile::TileLayer;

    #[test]
    fn test_render_order_follows_z_index() {
        let mut manager = LayerManager::new();
        let mut top = TileLayer::xyz("top", "Top", "https://example.org/{z}/{x}/{y}");
        top.set_z_index(10);
        let bottom = TileLayer::xyz("bottom", "Bottom", "https://example.org/{z}/{x}/{y}");

        manager.add_layer(Box::new(top)).unwrap();
        manager.add_layer(Box::new(bottom)).unwrap();

        assert_eq!(manager.list_layers(), vec!["bottom", "top"]);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut manager = LayerManager::new();
        let a = TileLayer::xyz("same", "A", "https://example.org/{z}/{x}/{y}");
        let b = TileLayer::xyz("same", "B", "https://example.org/{z}/{x}/{y}");

        manager.add_layer(Box::new(a)).unwrap();
        assert!(matches!(
            manager.add_layer(Box::new(b)),
            Err(MapError::Layer(_))
        ));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_remove_layer() {
        let mut manager = LayerManager::new();
        let layer = TileLayer::xyz("osm", "OSM", "https://example.org/{z}/{x}/{y}");
        manager.add_layer(Box::new(layer)).unwrap();

        assert!(manager.remove_layer("osm").is_some());
        assert!(manager.remove_layer("osm").is_none());
        assert!(manager.is_empty());
    }
}
