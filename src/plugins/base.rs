use crate::{
    core::{geo::LatLng, viewport::Viewport},
    rendering::context::RenderContext,
    Result,
};
use serde::{Deserialize, Serialize};

/// Pointer and keyboard input forwarded to plugins, in map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MapEvent {
    Click { position: LatLng },
    DoubleClick { position: LatLng },
    MouseMove { position: LatLng },
    Escape,
}

pub trait PluginTrait: Send + Sync {
    fn name(&self) -> &str;

    fn is_active(&self) -> bool {
        true
    }

    /// Returns `true` when the plugin consumed the event
    fn handle_event(&mut self, _event: &MapEvent) -> Result<bool> {
        Ok(false)
    }

    fn update(&mut self, _delta_time: f64) -> Result<()> {
        Ok(())
    }

    fn render(&mut self, _context: &mut RenderContext, _viewport: &Viewport) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
