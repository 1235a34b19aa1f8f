use crate::{
    core::{
        geo::{LatLng, LatLngBounds, Point},
        viewport::Viewport,
    },
    layers::base::{LayerProperties, LayerTrait, LayerType},
    rendering::context::RenderContext,
    ui::filter::TagAttribute,
    Result,
};
use serde::{Deserialize, Serialize};

/// Text attached to a marker on hover, or always shown when permanent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tooltip {
    pub content: String,
    pub permanent: bool,
}

impl Tooltip {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            permanent: false,
        }
    }

    pub fn permanent(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            permanent: true,
        }
    }
}

/// Category tags a filter button matches against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerTags {
    #[serde(rename = "type")]
    pub kind: String,
    pub state: String,
    pub accessibility: String,
}

impl MarkerTags {
    pub fn new(
        kind: impl Into<String>,
        state: impl Into<String>,
        accessibility: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            state: state.into(),
            accessibility: accessibility.into(),
        }
    }

    pub fn get(&self, attribute: TagAttribute) -> &str {
        match attribute {
            TagAttribute::Type => &self.kind,
            TagAttribute::State => &self.state,
            TagAttribute::Accessibility => &self.accessibility,
        }
    }
}

/// A point on the map with optional popup, tooltip and filter tags
#[derive(Debug, Clone)]
pub struct Marker {
    properties: LayerProperties,
    position: LatLng,
    popup: Option<String>,
    tooltip: Option<Tooltip>,
    tags: Option<MarkerTags>,
}

impl Marker {
    pub fn new(id: impl Into<String>, position: LatLng, title: impl Into<String>) -> Self {
        let properties = LayerProperties::new(id.into(), title.into(), LayerType::Marker);
        Self {
            properties,
            position,
            popup: None,
            tooltip: None,
            tags: None,
        }
    }

    pub fn with_popup(mut self, html: impl Into<String>) -> Self {
        self.popup = Some(html.into());
        self
    }

    pub fn with_tooltip(mut self, tooltip: Tooltip) -> Self {
        self.tooltip = Some(tooltip);
        self
    }

    pub fn with_tags(mut self, tags: MarkerTags) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn set_position(&mut self, position: LatLng) {
        self.position = position;
    }

    pub fn title(&self) -> &str {
        &self.properties.name
    }

    pub fn popup(&self) -> Option<&str> {
        self.popup.as_deref()
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    pub fn tags(&self) -> Option<&MarkerTags> {
        self.tags.as_ref()
    }

    /// Screen position of the marker anchor
    pub fn screen_position(&self, viewport: &Viewport) -> Point {
        viewport.lat_lng_to_pixel(&self.position)
    }
}

impl LayerTrait for Marker {
    crate::impl_layer_trait!(Marker, properties);

    fn render(&mut self, context: &mut RenderContext, viewport: &Viewport) -> Result<()> {
        if !self.is_visible() {
            return Ok(());
        }
        let position = self.screen_position(viewport);
        context.render_marker(self.id(), position, self.title());
        if let Some(tooltip) = self.tooltip.as_ref().filter(|t| t.permanent) {
            context.render_tooltip(position, &tooltip.content);
        }
        Ok(())
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        Some(LatLngBounds::new(self.position, self.position))
    }

    fn options(&self) -> serde_json::Value {
        serde_json::json!({
            "position": {
                "lat": self.position.lat,
                "lng": self.position.lng
            },
            "title": self.title(),
            "popup": self.popup,
            "tooltip": self.tooltip,
            "tags": self.tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::context::DrawCommand;

    #[test]
    fn test_tags_by_attribute() {
        let tags = MarkerTags::new("cave", "open", "easy");
        assert_eq!(tags.get(TagAttribute::Type), "cave");
        assert_eq!(tags.get(TagAttribute::State), "open");
        assert_eq!(tags.get(TagAttribute::Accessibility), "easy");
    }

    #[test]
    fn test_permanent_tooltip_is_rendered() {
        let center = LatLng::new(49.8, 15.5);
        let viewport = Viewport::new(center, 10.0, Point::new(400.0, 300.0));
        let mut marker = Marker::new("m1", center, "Here").with_tooltip(Tooltip::permanent("Here"));
        let mut ctx = RenderContext::new(400, 300);

        marker.render(&mut ctx, &viewport).unwrap();

        let queue = ctx.get_drawing_queue();
        assert_eq!(queue.len(), 2);
        assert!(matches!(&queue[1], DrawCommand::Tooltip { text, .. } if text == "Here"));
    }

    #[test]
    fn test_hover_tooltip_is_not_rendered() {
        let center = LatLng::new(49.8, 15.5);
        let viewport = Viewport::new(center, 10.0, Point::new(400.0, 300.0));
        let mut marker = Marker::new("m1", center, "Here").with_tooltip(Tooltip::new("Here"));
        let mut ctx = RenderContext::new(400, 300);

        marker.render(&mut ctx, &viewport).unwrap();
        assert_eq!(ctx.get_drawing_queue().len(), 1);
    }

    #[test]
    fn test_options_serialize_tags_as_type() {
        let marker = Marker::new("m1", LatLng::new(1.0, 2.0), "A")
            .with_tags(MarkerTags::new("mine", "closed", "hard"));
        let options = marker.options();
        assert_eq!(options["tags"]["type"], "mine");
        assert_eq!(options["title"], "A");
    }
}
