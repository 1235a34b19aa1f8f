use crate::{
    core::{
        config::MapViewOptions,
        geo::{LatLng, Point},
        viewport::Viewport,
    },
    layers::{base::LayerTrait, manager::LayerManager},
    plugins::{
        base::{MapEvent, PluginTrait},
        measure::MeasurePlugin,
    },
    rendering::context::RenderContext,
    traits::MapWidget,
    ui::controls::{
        Control, ControlManager, LayerEntry, LayerToggle, LayersControl, LocateAction,
        LocateControl, ScaleControl,
    },
    MapError, Result,
};

/// Headless tiled map bound to a container element
///
/// Holds the viewport, the layer stack, the corner controls and the plugins.
/// The host reports container resizes through [`MapWidget::resize_container`];
/// they take effect on the next [`MapWidget::invalidate_size`].
pub struct Map {
    container_id: String,
    viewport: Viewport,
    /// Size reported by the host but not yet applied
    pending_size: Point,
    layer_manager: LayerManager,
    controls: ControlManager,
    plugins: Vec<Box<dyn PluginTrait>>,
}

impl Map {
    pub fn new(container_id: &str, center: LatLng, zoom: f64, size: Point) -> Self {
        Self {
            container_id: container_id.to_string(),
            viewport: Viewport::new(center, zoom, size),
            pending_size: size,
            layer_manager: LayerManager::new(),
            controls: ControlManager::new(),
            plugins: Vec::new(),
        }
    }

    /// Build a map with the layers and controls described by `options`
    ///
    /// The first base layer is visible, the others and every overlay start
    /// hidden until switched on through the layers control.
    pub fn from_options(container_id: &str, options: &MapViewOptions) -> Result<Self> {
        options.validate()?;

        let mut map = Self::new(container_id, options.center, options.zoom, options.size);
        map.viewport.set_zoom_limits(options.min_zoom, options.max_zoom);

        for (i, base) in options.base_layers.iter().enumerate() {
            let mut layer = base.build();
            layer.set_visible(i == 0);
            map.layer_manager.add_layer(Box::new(layer))?;
        }
        for overlay in &options.overlays {
            map.layer_manager.add_layer(overlay.build())?;
        }

        let controls = &options.controls;
        if let Some(scale) = &controls.scale {
            map.add_control(Box::new(ScaleControl::new(scale.clone())))?;
        }
        if let Some(locate) = &controls.locate {
            map.add_control(Box::new(LocateControl::new(locate.clone())))?;
        }
        if controls.layers {
            let bases = options
                .base_layers
                .iter()
                .map(|b| LayerEntry::new(&b.name, &b.id))
                .collect();
            let overlays = options
                .overlays
                .iter()
                .map(|o| LayerEntry::new(&o.name, &o.id))
                .collect();
            map.add_control(Box::new(LayersControl::new(bases, overlays)))?;
        }
        if controls.ruler {
            map.add_plugin(Box::new(MeasurePlugin::new()))?;
        }

        map.controls.update_viewport(&map.viewport);
        log::info!(
            "map '{}' ready: {} layers, controls {:?}",
            map.container_id,
            map.layer_manager.len(),
            map.controls.ids()
        );
        Ok(map)
    }

    pub fn list_layers(&self) -> Vec<String> {
        self.layer_manager.list_layers()
    }

    pub fn controls(&self) -> &ControlManager {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut ControlManager {
        &mut self.controls
    }

    /// Switch the visible base map by its display name
    pub fn select_base_layer(&mut self, name: &str) -> Result<()> {
        let toggles = self
            .controls
            .get_as_mut::<LayersControl>("layers")
            .ok_or_else(|| MapError::Config("map has no layers control".to_string()))?
            .select_base(name)?;
        for toggle in &toggles {
            self.apply_toggle(toggle);
        }
        Ok(())
    }

    /// Switch an overlay on or off by its display name
    pub fn set_overlay(&mut self, name: &str, enabled: bool) -> Result<()> {
        let toggle = self
            .controls
            .get_as_mut::<LayersControl>("layers")
            .ok_or_else(|| MapError::Config("map has no layers control".to_string()))?
            .set_overlay(name, enabled)?;
        self.apply_toggle(&toggle);
        Ok(())
    }

    fn apply_toggle(&mut self, toggle: &LayerToggle) {
        match self.layer_manager.get_layer_mut(&toggle.layer_id) {
            Some(layer) => layer.set_visible(toggle.visible),
            None => log::warn!("layers control refers to missing layer '{}'", toggle.layer_id),
        }
    }

    /// Feed a position fix to the locate control, moving the view if it asks to
    pub fn location_found(&mut self, position: LatLng, accuracy: f64) -> Result<()> {
        let viewport = self.viewport.clone();
        let action = match self.controls.get_as_mut::<LocateControl>("locate") {
            Some(locate) => locate.on_location_found(position, accuracy, &viewport),
            None => return Ok(()),
        };
        if let LocateAction::SetView { center, zoom } = action {
            self.set_view(center, zoom)?;
        }
        Ok(())
    }

    /// Stop locating; returns the message for the user when locating was on
    pub fn location_error(&mut self, message: &str) -> Option<String> {
        self.controls
            .get_as_mut::<LocateControl>("locate")
            .map(|locate| locate.on_location_error(message))
    }

    /// Offer an input event to the plugins until one consumes it
    pub fn handle_event(&mut self, event: &MapEvent) -> Result<bool> {
        for plugin in self.plugins.iter_mut() {
            if plugin.handle_event(event)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl MapWidget for Map {
    fn container_id(&self) -> &str {
        &self.container_id
    }

    fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    fn set_view(&mut self, center: LatLng, zoom: f64) -> Result<()> {
        if !center.is_valid() || !zoom.is_finite() {
            return Err(MapError::InvalidCoordinates(format!(
                "cannot view {} at zoom {}",
                center, zoom
            )));
        }
        self.viewport.set_view(center, zoom);
        self.controls.update_viewport(&self.viewport);
        Ok(())
    }

    fn resize_container(&mut self, width: f64, height: f64) {
        self.pending_size = Point::new(width, height);
    }

    fn invalidate_size(&mut self) -> bool {
        if self.pending_size == self.viewport.size {
            return false;
        }
        log::debug!(
            "container '{}' resized to {}x{}",
            self.container_id,
            self.pending_size.x,
            self.pending_size.y
        );
        self.viewport.set_size(self.pending_size);
        self.controls.update_viewport(&self.viewport);
        true
    }

    fn add_layer(&mut self, layer: Box<dyn LayerTrait>) -> Result<()> {
        self.layer_manager.add_layer(layer)
    }

    fn remove_layer(&mut self, layer_id: &str) -> Result<Option<Box<dyn LayerTrait>>> {
        Ok(self.layer_manager.remove_layer(layer_id))
    }

    fn get_layer(&self, layer_id: &str) -> Option<&(dyn LayerTrait + 'static)> {
        self.layer_manager.get_layer(layer_id)
    }

    fn get_layer_mut(&mut self, layer_id: &str) -> Option<&mut (dyn LayerTrait + 'static)> {
        self.layer_manager.get_layer_mut(layer_id)
    }

    fn add_control(&mut self, control: Box<dyn Control>) -> Result<()> {
        self.controls.add(control)
    }

    fn get_control(&self, control_id: &str) -> Option<&(dyn Control + 'static)> {
        self.controls.get(control_id)
    }

    fn add_plugin(&mut self, plugin: Box<dyn PluginTrait>) -> Result<()> {
        if self.plugins.iter().any(|p| p.name() == plugin.name()) {
            return Err(MapError::Plugin(format!(
                "plugin '{}' already added",
                plugin.name()
            )));
        }
        self.plugins.push(plugin);
        Ok(())
    }

    fn get_plugin_mut(&mut self, name: &str) -> Option<&mut (dyn PluginTrait + 'static)> {
        self.plugins
            .iter_mut()
            .find(|p| p.name() == name)
            .map(|p| p.as_mut())
    }

    fn render(&mut self) -> Result<RenderContext> {
        let size = self.viewport.size;
        let mut context = RenderContext::new(size.x.max(0.0) as u32, size.y.max(0.0) as u32);
        self.layer_manager.render(&mut context, &self.viewport)?;
        for plugin in self.plugins.iter_mut() {
            plugin.render(&mut context, &self.viewport)?;
        }
        self.controls.render(&mut context, &self.viewport);
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::config::MapVariant, rendering::context::DrawCommand};

    fn standard_map() -> Map {
        Map::from_options("map", &MapVariant::Standard.resolve()).unwrap()
    }

    #[test]
    fn test_from_options_installs_layers_and_controls() {
        let options = MapVariant::Standard.resolve();
        let map = standard_map();

        assert_eq!(
            map.list_layers().len(),
            options.base_layers.len() + options.overlays.len()
        );
        assert!(map.get_layer("base-tourists").unwrap().is_visible());
        assert!(!map.get_layer("base-aerial").unwrap().is_visible());
        assert!(!map.get_layer("overlay-geology").unwrap().is_visible());
        assert!(map.get_control("scale").is_some());
        assert!(map.get_control("locate").is_some());
        assert!(map.get_control("layers").is_some());
    }

    #[test]
    fn test_basic_variant_has_only_scale() {
        let mut map = Map::from_options("map", &MapVariant::Basic.resolve()).unwrap();
        assert_eq!(map.controls().ids(), vec!["scale"]);
        assert!(map.get_plugin_mut("ruler").is_none());
        assert!(map.select_base_layer("Aerial").is_err());
    }

    #[test]
    fn test_switching_layers() {
        let mut map = standard_map();
        map.select_base_layer("Aerial").unwrap();
        assert!(map.get_layer("base-aerial").unwrap().is_visible());
        assert!(!map.get_layer("base-tourists").unwrap().is_visible());

        let name = MapVariant::Standard.resolve().overlays[0].name.clone();
        let id = MapVariant::Standard.resolve().overlays[0].id.clone();
        map.set_overlay(&name, true).unwrap();
        assert!(map.get_layer(&id).unwrap().is_visible());
        map.set_overlay(&name, false).unwrap();
        assert!(!map.get_layer(&id).unwrap().is_visible());
    }

    #[test]
    fn test_resize_applies_on_invalidate() {
        let mut map = Map::new("map", LatLng::new(49.8, 15.5), 8.0, Point::new(800.0, 600.0));
        map.resize_container(1024.0, 768.0);
        assert_eq!(map.viewport().size, Point::new(800.0, 600.0));
        assert!(map.invalidate_size());
        assert_eq!(map.viewport().size, Point::new(1024.0, 768.0));
        assert!(!map.invalidate_size());
    }

    #[test]
    fn test_set_view_clamps_zoom_and_rejects_nan() {
        let mut map = standard_map();
        map.set_view(LatLng::new(50.0, 14.4), 30.0).unwrap();
        assert_eq!(map.viewport().zoom, 19.0);
        assert!(map.set_view(LatLng::new(f64::NAN, 14.4), 10.0).is_err());
    }

    #[test]
    fn test_locate_first_fix_zooms_in() {
        let mut map = standard_map();
        map.controls_mut()
            .get_as_mut::<LocateControl>("locate")
            .unwrap()
            .start();
        map.location_found(LatLng::new(50.08, 14.42), 25.0).unwrap();
        assert_eq!(map.viewport().center, LatLng::new(50.08, 14.42));
        assert_eq!(map.viewport().zoom, 14.0);

        let message = map.location_error("denied").unwrap();
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_ruler_consumes_clicks_when_active() {
        let mut map = standard_map();
        let click = MapEvent::Click {
            position: LatLng::new(49.8, 15.5),
        };
        assert!(!map.handle_event(&click).unwrap());

        let ruler = map.get_plugin_mut("ruler").unwrap();
        ruler
            .as_any_mut()
            .downcast_mut::<MeasurePlugin>()
            .unwrap()
            .toggle();
        assert!(map.handle_event(&click).unwrap());
    }

    #[test]
    fn test_render_draws_visible_base_tiles() {
        let mut map = standard_map();
        let context = map.render().unwrap();
        let tiles = context.count(|c| matches!(c, DrawCommand::Tile { url, .. } if url.contains("mapy.cz")));
        assert!(tiles > 0);
        assert_eq!(context.count(|c| matches!(c, DrawCommand::Image { .. })), 0);
    }

    #[test]
    fn test_duplicate_plugin_is_rejected() {
        let mut map = standard_map();
        assert!(map.add_plugin(Box::new(MeasurePlugin::new())).is_err());
    }
}
