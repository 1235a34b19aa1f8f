use crate::{
    core::{
        config::{LocateOptions, ScaleOptions},
        geo::{LatLng, Point},
        viewport::Viewport,
    },
    data::templates::escape_html,
    rendering::context::RenderContext,
    MapError, Result,
};
use serde::{Deserialize, Serialize};

/// Map corner a control is docked in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Position {
    /// Anchor point inside a container of `size`, `margin` pixels from the corner
    pub fn anchor(&self, size: Point, margin: f64) -> Point {
        match self {
            Position::TopLeft => Point::new(margin, margin),
            Position::TopRight => Point::new(size.x - margin, margin),
            Position::BottomLeft => Point::new(margin, size.y - margin),
            Position::BottomRight => Point::new(size.x - margin, size.y - margin),
        }
    }
}

pub trait Control {
    fn id(&self) -> &str;

    fn position(&self) -> Position;

    fn is_visible(&self) -> bool {
        true
    }

    /// Called after every view change
    fn update(&mut self, _viewport: &Viewport) {}

    fn render(&self, _context: &mut RenderContext, _viewport: &Viewport) {}

    fn to_html(&self) -> String;

    fn as_any(&self) -> &dyn std::any::Any;
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

/// Largest "round" number (1, 2, 3 or 5 times a power of ten) not above `num`
pub fn round_number(num: f64) -> f64 {
    if num <= 0.0 {
        return 0.0;
    }
    let digits = (num.floor() as u64).to_string().len() as i32;
    let pow10 = 10f64.powi(digits - 1);
    let d = num / pow10;
    let d = if d >= 10.0 {
        10.0
    } else if d >= 5.0 {
        5.0
    } else if d >= 3.0 {
        3.0
    } else if d >= 2.0 {
        2.0
    } else {
        1.0
    };
    pow10 * d
}

/// One bar of the scale control
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleBar {
    pub label: String,
    /// Bar width in pixels
    pub width: f64,
}

/// Scale bar sized to a round distance
pub struct ScaleControl {
    options: ScaleOptions,
    metric: Option<ScaleBar>,
    imperial: Option<ScaleBar>,
}

impl ScaleControl {
    pub fn new(options: ScaleOptions) -> Self {
        Self {
            options,
            metric: None,
            imperial: None,
        }
    }

    pub fn metric(&self) -> Option<&ScaleBar> {
        self.metric.as_ref()
    }

    pub fn imperial(&self) -> Option<&ScaleBar> {
        self.imperial.as_ref()
    }

    fn metric_bar(&self, max_meters: f64) -> ScaleBar {
        let meters = round_number(max_meters);
        let label = if meters < 1000.0 {
            format!("{} m", meters)
        } else {
            format!("{} km", meters / 1000.0)
        };
        ScaleBar {
            label,
            width: (self.options.max_width * meters / max_meters).round(),
        }
    }

    fn imperial_bar(&self, max_meters: f64) -> ScaleBar {
        let max_feet = max_meters * 3.2808399;
        if max_feet > 5280.0 {
            let max_miles = max_feet / 5280.0;
            let miles = round_number(max_miles);
            ScaleBar {
                label: format!("{} mi", miles),
                width: (self.options.max_width * miles / max_miles).round(),
            }
        } else {
            let feet = round_number(max_feet);
            ScaleBar {
                label: format!("{} ft", feet),
                width: (self.options.max_width * feet / max_feet).round(),
            }
        }
    }
}

impl Control for ScaleControl {
    fn id(&self) -> &str {
        "scale"
    }

    fn position(&self) -> Position {
        Position::BottomLeft
    }

    fn update(&mut self, viewport: &Viewport) {
        let y = viewport.size.y / 2.0;
        let left = viewport.pixel_to_lat_lng(&Point::new(0.0, y));
        let right = viewport.pixel_to_lat_lng(&Point::new(self.options.max_width, y));
        let max_meters = left.distance_to(&right);

        self.metric = self.options.metric.then(|| self.metric_bar(max_meters));
        self.imperial = self.options.imperial.then(|| self.imperial_bar(max_meters));
    }

    fn render(&self, context: &mut RenderContext, viewport: &Viewport) {
        let anchor = self.position().anchor(viewport.size, 10.0);
        for bar in self.metric.iter().chain(self.imperial.iter()) {
            let end = Point::new(anchor.x + bar.width, anchor.y);
            context.render_line(&[anchor, end]);
            context.render_label(anchor, &bar.label);
        }
    }

    fn to_html(&self) -> String {
        let mut html = String::from("<div class=\"leaflet-control-scale\">");
        for bar in self.metric.iter().chain(self.imperial.iter()) {
            html.push_str(&format!(
                "<div class=\"leaflet-control-scale-line\" style=\"width: {}px\">{}</div>",
                bar.width, bar.label
            ));
        }
        html.push_str("</div>");
        html
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// What the map should do after a position fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocateAction {
    SetView { center: LatLng, zoom: f64 },
    None,
}

/// "Locate me" button following the device position
pub struct LocateControl {
    options: LocateOptions,
    active: bool,
    located: bool,
    position: Option<LatLng>,
    accuracy: Option<f64>,
}

impl LocateControl {
    pub fn new(options: LocateOptions) -> Self {
        Self {
            options,
            active: false,
            located: false,
            position: None,
            accuracy: None,
        }
    }

    pub fn options(&self) -> &LocateOptions {
        &self.options
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn start(&mut self) {
        self.active = true;
        self.located = false;
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.located = false;
        self.position = None;
        self.accuracy = None;
    }

    pub fn last_position(&self) -> Option<LatLng> {
        self.position
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    /// First fix zooms in; later fixes only pan while following
    pub fn on_location_found(
        &mut self,
        position: LatLng,
        accuracy: f64,
        viewport: &Viewport,
    ) -> LocateAction {
        if !self.active {
            return LocateAction::None;
        }
        self.position = Some(position);
        self.accuracy = Some(accuracy);

        if !self.located {
            self.located = true;
            LocateAction::SetView {
                center: position,
                zoom: self.options.max_zoom,
            }
        } else if self.options.follow {
            LocateAction::SetView {
                center: position,
                zoom: viewport.zoom,
            }
        } else {
            LocateAction::None
        }
    }

    /// Stops locating and returns the message to show the user
    pub fn on_location_error(&mut self, message: &str) -> String {
        log::warn!("locate failed: {}", message);
        self.stop();
        format!("Could not determine your location: {}", message)
    }
}

impl Control for LocateControl {
    fn id(&self) -> &str {
        "locate"
    }

    fn position(&self) -> Position {
        Position::TopLeft
    }

    fn render(&self, context: &mut RenderContext, viewport: &Viewport) {
        if let Some(position) = self.position {
            let pixel = viewport.lat_lng_to_pixel(&position);
            context.render_marker("locate-position", pixel, &self.options.title);
        }
    }

    fn to_html(&self) -> String {
        let state = if self.active { " active" } else { "" };
        format!(
            "<a class=\"leaflet-bar-part{}\" title=\"{}\"><span class=\"{}\"></span></a>",
            state,
            escape_html(&self.options.title),
            self.options.icon
        )
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Entry of the layers switcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    /// Label shown in the switcher
    pub name: String,
    /// Id of the map layer it toggles
    pub layer_id: String,
}

impl LayerEntry {
    pub fn new(name: &str, layer_id: &str) -> Self {
        Self {
            name: name.to_string(),
            layer_id: layer_id.to_string(),
        }
    }
}

/// Visibility change the map has to apply to a layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerToggle {
    pub layer_id: String,
    pub visible: bool,
}

/// Base-map radio buttons and overlay checkboxes
pub struct LayersControl {
    base_layers: Vec<LayerEntry>,
    overlays: Vec<LayerEntry>,
    selected_base: Option<usize>,
    enabled_overlays: Vec<bool>,
}

impl LayersControl {
    /// The first base layer starts selected; overlays start off
    pub fn new(base_layers: Vec<LayerEntry>, overlays: Vec<LayerEntry>) -> Self {
        let selected_base = if base_layers.is_empty() { None } else { Some(0) };
        let enabled_overlays = vec![false; overlays.len()];
        Self {
            base_layers,
            overlays,
            selected_base,
            enabled_overlays,
        }
    }

    pub fn base_layers(&self) -> &[LayerEntry] {
        &self.base_layers
    }

    pub fn overlays(&self) -> &[LayerEntry] {
        &self.overlays
    }

    pub fn selected_base(&self) -> Option<&LayerEntry> {
        self.selected_base.and_then(|i| self.base_layers.get(i))
    }

    pub fn is_overlay_enabled(&self, name: &str) -> bool {
        self.overlays
            .iter()
            .position(|o| o.name == name)
            .is_some_and(|i| self.enabled_overlays[i])
    }

    /// Select a base map by label; every other base map is hidden
    pub fn select_base(&mut self, name: &str) -> Result<Vec<LayerToggle>> {
        let index = self
            .base_layers
            .iter()
            .position(|b| b.name == name)
            .ok_or_else(|| MapError::Layer(format!("unknown base layer '{}'", name)))?;
        self.selected_base = Some(index);
        Ok(self
            .base_layers
            .iter()
            .enumerate()
            .map(|(i, b)| LayerToggle {
                layer_id: b.layer_id.clone(),
                visible: i == index,
            })
            .collect())
    }

    pub fn set_overlay(&mut self, name: &str, enabled: bool) -> Result<LayerToggle> {
        let index = self
            .overlays
            .iter()
            .position(|o| o.name == name)
            .ok_or_else(|| MapError::Layer(format!("unknown overlay '{}'", name)))?;
        self.enabled_overlays[index] = enabled;
        Ok(LayerToggle {
            layer_id: self.overlays[index].layer_id.clone(),
            visible: enabled,
        })
    }
}

impl Control for LayersControl {
    fn id(&self) -> &str {
        "layers"
    }

    fn position(&self) -> Position {
        Position::TopRight
    }

    fn to_html(&self) -> String {
        let mut html = String::from("<form class=\"leaflet-control-layers-list\"><div class=\"leaflet-control-layers-base\">");
        for (i, base) in self.base_layers.iter().enumerate() {
            let checked = if self.selected_base == Some(i) { " checked" } else { "" };
            html.push_str(&format!(
                "<label><input type=\"radio\" name=\"base\"{}> {}</label>",
                checked,
                escape_html(&base.name)
            ));
        }
        html.push_str("</div><div class=\"leaflet-control-layers-overlays\">");
        for (overlay, enabled) in self.overlays.iter().zip(&self.enabled_overlays) {
            let checked = if *enabled { " checked" } else { "" };
            html.push_str(&format!(
                "<label><input type=\"checkbox\"{}> {}</label>",
                checked,
                escape_html(&overlay.name)
            ));
        }
        html.push_str("</div></form>");
        html
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Control manager that handles all map controls
pub struct ControlManager {
    controls: Vec<Box<dyn Control>>,
}

impl ControlManager {
    pub fn new() -> Self {
        Self {
            controls: Vec::new(),
        }
    }

    pub fn add(&mut self, control: Box<dyn Control>) -> Result<()> {
        if self.get(control.id()).is_some() {
            return Err(MapError::Config(format!(
                "control '{}' already added",
                control.id()
            )));
        }
        self.controls.push(control);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&(dyn Control + 'static)> {
        self.controls.iter().find(|c| c.id() == id).map(|c| c.as_ref())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut (dyn Control + 'static)> {
        self.controls
            .iter_mut()
            .find(|c| c.id() == id)
            .map(|c| c.as_mut())
    }

    /// Typed access to a control
    pub fn get_as<C: Control + 'static>(&self, id: &str) -> Option<&C> {
        self.get(id).and_then(|c| c.as_any().downcast_ref::<C>())
    }

    pub fn get_as_mut<C: Control + 'static>(&mut self, id: &str) -> Option<&mut C> {
        self.get_mut(id)
            .and_then(|c| c.as_any_mut().downcast_mut::<C>())
    }

    pub fn ids(&self) -> Vec<&str> {
        self.controls.iter().map(|c| c.id()).collect()
    }

    /// Update all controls with viewport changes
    pub fn update_viewport(&mut self, viewport: &Viewport) {
        for control in &mut self.controls {
            control.update(viewport);
        }
    }

    pub fn render(&self, context: &mut RenderContext, viewport: &Viewport) {
        for control in self.controls.iter().filter(|c| c.is_visible()) {
            control.render(context, viewport);
        }
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

impl Default for ControlManager {
    fn default() -> Self {
        Self::new()
    }
}
