use crate::{core::geo::Point, MapError, Result};

/// Rendering context collecting a display list for one frame
///
/// The host (DOM, canvas, GPU) consumes the queue; nothing here touches pixels.
pub struct RenderContext {
    pub width: u32,
    pub height: u32,
    /// Drawing primitives queue in paint order
    pub drawing_queue: Vec<DrawCommand>,
    /// Viewport clipping bounds (min, max) in screen coordinates
    pub clip_bounds: Option<(Point, Point)>,
}

/// Commands that can be issued to the render context
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Raster tile fetched from `url`
    Tile {
        url: String,
        bounds: (Point, Point), // min, max screen coordinates
        opacity: f32,
    },
    /// Server-rendered image covering the whole viewport (Esri export)
    Image {
        url: String,
        bounds: (Point, Point),
        opacity: f32,
    },
    Marker {
        id: String,
        position: Point,
        title: String,
    },
    /// Several markers collapsed into one bubble
    Cluster {
        position: Point,
        count: usize,
    },
    Tooltip {
        position: Point,
        text: String,
    },
    Line {
        points: Vec<Point>,
    },
    Label {
        position: Point,
        text: String,
    },
}

impl RenderContext {
    /// Create a new render context
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            drawing_queue: Vec::new(),
            clip_bounds: Some((
                Point::new(0.0, 0.0),
                Point::new(width as f64, height as f64),
            )),
        }
    }

    /// Queue a raster tile; tiles completely outside the clip rectangle are dropped
    pub fn render_tile(&mut self, url: String, bounds: (Point, Point), opacity: f32) -> Result<()> {
        Self::validate(bounds, opacity)?;

        if let Some(clipped) = self.clip_bounds_to_viewport(bounds) {
            self.drawing_queue.push(DrawCommand::Tile {
                url,
                bounds: clipped,
                opacity,
            });
        }
        Ok(())
    }

    /// Queue a full-viewport image
    pub fn render_image(&mut self, url: String, bounds: (Point, Point), opacity: f32) -> Result<()> {
        Self::validate(bounds, opacity)?;
        self.drawing_queue.push(DrawCommand::Image {
            url,
            bounds,
            opacity,
        });
        Ok(())
    }

    pub fn render_marker(&mut self, id: &str, position: Point, title: &str) {
        if self.is_inside(&position) {
            self.drawing_queue.push(DrawCommand::Marker {
                id: id.to_string(),
                position,
                title: title.to_string(),
            });
        }
    }

    pub fn render_cluster(&mut self, position: Point, count: usize) {
        if self.is_inside(&position) {
            self.drawing_queue
                .push(DrawCommand::Cluster { position, count });
        }
    }

    pub fn render_tooltip(&mut self, position: Point, text: &str) {
        if self.is_inside(&position) {
            self.drawing_queue.push(DrawCommand::Tooltip {
                position,
                text: text.to_string(),
            });
        }
    }

    /// Render a polyline; lines are not clipped
    pub fn render_line(&mut self, points: &[Point]) {
        if points.len() >= 2 {
            self.drawing_queue.push(DrawCommand::Line {
                points: points.to_vec(),
            });
        }
    }

    pub fn render_label(&mut self, position: Point, text: &str) {
        self.drawing_queue.push(DrawCommand::Label {
            position,
            text: text.to_string(),
        });
    }

    /// Get the current drawing queue
    pub fn get_drawing_queue(&self) -> &[DrawCommand] {
        &self.drawing_queue
    }

    /// Count queued commands matching a predicate
    pub fn count(&self, predicate: impl Fn(&DrawCommand) -> bool) -> usize {
        self.drawing_queue.iter().filter(|cmd| predicate(cmd)).count()
    }

    fn validate(bounds: (Point, Point), opacity: f32) -> Result<()> {
        if bounds.0.x >= bounds.1.x || bounds.0.y >= bounds.1.y {
            return Err(MapError::Render("Invalid tile bounds".to_string()));
        }
        if !(0.0..=1.0).contains(&opacity) {
            return Err(MapError::Render(
                "Opacity must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(())
    }

    fn is_inside(&self, point: &Point) -> bool {
        match self.clip_bounds {
            Some((min, max)) => {
                point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
            }
            None => true,
        }
    }

    /// Clip bounds to viewport (returns None if completely outside)
    fn clip_bounds_to_viewport(&self, bounds: (Point, Point)) -> Option<(Point, Point)> {
        if let Some((clip_min, clip_max)) = self.clip_bounds {
            let (tile_min, tile_max) = bounds;

            if tile_max.x < clip_min.x
                || tile_min.x > clip_max.x
                || tile_max.y < clip_min.y
                || tile_min.y > clip_max.y
            {
                return None;
            }

            let clipped_min = Point::new(tile_min.x.max(clip_min.x), tile_min.y.max(clip_min.y));
            let clipped_max = Point::new(tile_max.x.min(clip_max.x), tile_max.y.min(clip_max.y));

            Some((clipped_min, clipped_max))
        } else {
            Some(bounds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_outside_viewport_is_dropped() {
        let mut ctx = RenderContext::new(256, 256);
        ctx.render_tile(
            "https://example.org/1/0/0".to_string(),
            (Point::new(300.0, 300.0), Point::new(556.0, 556.0)),
            1.0,
        )
        .unwrap();

        assert!(ctx.get_drawing_queue().is_empty());
    }

    #[test]
    fn test_tile_is_clipped() {
        let mut ctx = RenderContext::new(256, 256);
        ctx.render_tile(
            "https://example.org/1/0/0".to_string(),
            (Point::new(-128.0, 0.0), Point::new(128.0, 256.0)),
            0.8,
        )
        .unwrap();

        match &ctx.get_drawing_queue()[0] {
            DrawCommand::Tile { bounds, .. } => assert_eq!(bounds.0, Point::new(0.0, 0.0)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_invalid_opacity_is_rejected() {
        let mut ctx = RenderContext::new(256, 256);
        let result = ctx.render_image(
            "https://example.org/export".to_string(),
            (Point::new(0.0, 0.0), Point::new(256.0, 256.0)),
            1.5,
        );
        assert!(matches!(result, Err(MapError::Render(_))));
    }

    #[test]
    fn test_markers_outside_are_skipped() {
        let mut ctx = RenderContext::new(100, 100);
        ctx.render_marker("a", Point::new(50.0, 50.0), "inside");
        ctx.render_marker("b", Point::new(150.0, 50.0), "outside");

        assert_eq!(ctx.count(|cmd| matches!(cmd, DrawCommand::Marker { .. })), 1);
    }
}
