use crate::{
    core::{geo::LatLngBounds, viewport::Viewport},
    layers::base::{LayerProperties, LayerTrait, LayerType},
    rendering::context::RenderContext,
    Result,
};

/// Several layers toggled as one overlay
///
/// Visibility and opacity set on the group are pushed down to every member.
pub struct LayerGroup {
    properties: LayerProperties,
    layers: Vec<Box<dyn LayerTrait>>,
}

impl LayerGroup {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            properties: LayerProperties::new(id.to_string(), name.to_string(), LayerType::Group),
            layers: Vec::new(),
        }
    }

    pub fn with_layer(mut self, layer: Box<dyn LayerTrait>) -> Self {
        self.add_layer(layer);
        self
    }

    pub fn add_layer(&mut self, mut layer: Box<dyn LayerTrait>) {
        layer.set_visible(self.properties.visible);
        self.layers.push(layer);
    }

    pub fn layers(&self) -> &[Box<dyn LayerTrait>] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl LayerTrait for LayerGroup {
    fn id(&self) -> &str {
        &self.properties.id
    }

    fn name(&self) -> &str {
        &self.properties.name
    }

    fn layer_type(&self) -> LayerType {
        LayerType::Group
    }

    fn is_visible(&self) -> bool {
        self.properties.visible
    }

    fn set_visible(&mut self, visible: bool) {
        self.properties.visible = visible;
        for layer in &mut self.layers {
            layer.set_visible(visible);
        }
    }

    fn opacity(&self) -> f32 {
        self.properties.opacity
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.properties.opacity = opacity.clamp(0.0, 1.0);
        for layer in &mut self.layers {
            layer.set_opacity(opacity);
        }
    }

    fn z_index(&self) -> i32 {
        self.properties.z_index
    }

    fn set_z_index(&mut self, z_index: i32) {
        self.properties.z_index = z_index;
    }

    fn render(&mut self, context: &mut RenderContext, viewport: &Viewport) -> Result<()> {
        if !self.is_visible() {
            return Ok(());
        }
        for layer in &mut self.layers {
            layer.render(context, viewport)?;
        }
        Ok(())
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        let mut merged: Option<LatLngBounds> = None;
        for bounds in self.layers.iter().map(|l| l.bounds()) {
            // One unbounded member makes the whole group unbounded
            let bounds = bounds?;
            match merged {
                Some(ref mut m) => {
                    m.extend(&bounds.south_west);
                    m.extend(&bounds.north_east);
                }
                None => merged = Some(bounds),
            }
        }
        merged
    }

    fn options(&self) -> serde_json::Value {
        let members: Vec<serde_json::Value> = self.layers.iter().map(|l| l.options()).collect();
        serde_json::json!({
            "layers": members,
            "opacity": self.opacity(),
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::geo::{LatLng, Point},
        layers::tile::TileLayer,
        rendering::context::DrawCommand,
    };

    fn history() -> LayerGroup {
        LayerGroup::new("history", "History")
            .with_layer(Box::new(TileLayer::esri_tiled(
                "history-msk",
                "MSK",
                "https://example.org/a/MapServer",
            )))
            .with_layer(Box::new(TileLayer::esri_dynamic(
                "history-jck",
                "JCK",
                "https://example.org/b/MapServer",
                None,
            )))
    }

    #[test]
    fn test_visibility_propagates_to_members() {
        let mut group = history();
        group.set_visible(false);
        assert!(group.layers().iter().all(|l| !l.is_visible()));

        group.set_visible(true);
        assert!(group.layers().iter().all(|l| l.is_visible()));
    }

    #[test]
    fn test_members_render_together() {
        let mut group = history();
        group.set_opacity(0.8);
        let viewport = Viewport::new(LatLng::new(49.8, 15.5), 8.0, Point::new(800.0, 600.0));
        let mut ctx = RenderContext::new(800, 600);

        group.render(&mut ctx, &viewport).unwrap();

        assert!(ctx.count(|c| matches!(c, DrawCommand::Tile { opacity, .. } if *opacity == 0.8)) > 0);
        assert_eq!(ctx.count(|c| matches!(c, DrawCommand::Image { .. })), 1);
    }
}
