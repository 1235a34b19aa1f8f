//! Shared trait abstractions
//!
//! `LayerOperations` is the contract every map layer implements, and
//! `MapWidget` is the capability the location view needs from a map: a
//! viewport, a layer stack, controls and plugins.

use crate::{
    core::{
        geo::{LatLng, LatLngBounds},
        viewport::Viewport,
    },
    plugins::base::PluginTrait,
    rendering::context::RenderContext,
    ui::controls::Control,
    Result,
};

/// Unified layer operations trait
pub trait LayerOperations: Send + Sync {
    /// Get layer ID
    fn id(&self) -> &str;

    /// Get layer name
    fn name(&self) -> &str;

    /// Get layer type
    fn layer_type(&self) -> crate::layers::base::LayerType;

    /// Check if layer is visible
    fn is_visible(&self) -> bool;

    /// Set layer visibility
    fn set_visible(&mut self, visible: bool);

    /// Get layer opacity (0.0 to 1.0)
    fn opacity(&self) -> f32;

    /// Set layer opacity
    fn set_opacity(&mut self, opacity: f32);

    /// Get layer z-index for ordering
    fn z_index(&self) -> i32;

    /// Set layer z-index
    fn set_z_index(&mut self, z_index: i32);

    /// Queue draw commands for the current viewport
    fn render(&mut self, context: &mut RenderContext, viewport: &Viewport) -> Result<()>;

    /// Get layer bounds if applicable
    fn bounds(&self) -> Option<LatLngBounds> {
        None
    }

    /// Check if layer intersects with given bounds
    fn intersects_bounds(&self, bounds: &LatLngBounds) -> bool {
        if let Some(layer_bounds) = self.bounds() {
            layer_bounds.intersects(bounds)
        } else {
            true
        }
    }

    /// Get layer options
    fn options(&self) -> serde_json::Value;

    /// Dynamic casting support
    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

/// Capability of a pannable, zoomable tiled map
///
/// `core::map::Map` is the bundled implementation; hosts embedding a different
/// engine implement this trait and hand it to `LocationMapView`.
pub trait MapWidget {
    /// Id of the container element the map is bound to
    fn container_id(&self) -> &str;

    fn viewport(&self) -> &Viewport;

    /// Center the view on `center` at `zoom` (clamped to the zoom limits)
    fn set_view(&mut self, center: LatLng, zoom: f64) -> Result<()>;

    /// Report a new size for the container element without applying it
    fn resize_container(&mut self, width: f64, height: f64);

    /// Re-read the container size; returns `true` when the viewport changed
    fn invalidate_size(&mut self) -> bool;

    fn add_layer(&mut self, layer: Box<dyn LayerOperations>) -> Result<()>;

    fn remove_layer(&mut self, layer_id: &str) -> Result<Option<Box<dyn LayerOperations>>>;

    fn get_layer(&self, layer_id: &str) -> Option<&(dyn LayerOperations + 'static)>;

    fn get_layer_mut(&mut self, layer_id: &str) -> Option<&mut (dyn LayerOperations + 'static)>;

    fn has_layer(&self, layer_id: &str) -> bool {
        self.get_layer(layer_id).is_some()
    }

    fn add_control(&mut self, control: Box<dyn Control>) -> Result<()>;

    fn get_control(&self, control_id: &str) -> Option<&(dyn Control + 'static)>;

    fn add_plugin(&mut self, plugin: Box<dyn PluginTrait>) -> Result<()>;

    fn get_plugin_mut(&mut self, name: &str) -> Option<&mut (dyn PluginTrait + 'static)>;

    /// Produce the display list for the current view
    fn render(&mut self) -> Result<RenderContext>;
}
