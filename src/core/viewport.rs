use crate::core::geo::{LatLng, LatLngBounds, Point, EARTH_RADIUS};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Manages the current view of the map: center, zoom, and screen dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the viewport in pixels
    pub size: Point,
    /// The minimum allowed zoom level
    pub min_zoom: f64,
    /// The maximum allowed zoom level
    pub max_zoom: f64,
}

impl Viewport {
    /// Creates a new viewport
    pub fn new(center: LatLng, zoom: f64, size: Point) -> Self {
        Self {
            center,
            zoom: zoom.clamp(0.0, 19.0),
            size,
            min_zoom: 0.0,
            max_zoom: 19.0,
        }
    }

    /// Sets center and zoom in one step
    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        self.set_center(center);
    }

    /// Sets the center of the viewport, clamped to the projectable world
    pub fn set_center(&mut self, center: LatLng) {
        self.center = LatLng::new(
            LatLng::clamp_lat(center.lat),
            center.lng.clamp(-180.0, 180.0),
        );
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Sets the viewport size
    pub fn set_size(&mut self, size: Point) {
        self.size = size;
    }

    /// Sets the zoom limits
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self.zoom = self.zoom.clamp(min_zoom, max_zoom);
    }

    /// Gets the scale factor for the current zoom level
    pub fn scale(&self) -> f64 {
        2_f64.powf(self.zoom)
    }

    /// Projects a LatLng to world pixel coordinates (EPSG:3857)
    pub fn project(&self, lat_lng: &LatLng, zoom: Option<f64>) -> Point {
        let z = zoom.unwrap_or(self.zoom);
        let scale = 256.0 * 2_f64.powf(z);

        let x = lat_lng.lng.to_radians() * EARTH_RADIUS;
        let lat = LatLng::clamp_lat(lat_lng.lat);
        let y = (PI / 4.0 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;

        let pixel_x = (x + PI * EARTH_RADIUS) / (2.0 * PI * EARTH_RADIUS) * scale;
        let pixel_y = (-y + PI * EARTH_RADIUS) / (2.0 * PI * EARTH_RADIUS) * scale;

        Point::new(pixel_x, pixel_y)
    }

    /// Unprojects world pixel coordinates back to LatLng
    pub fn unproject(&self, pixel: &Point, zoom: Option<f64>) -> LatLng {
        let z = zoom.unwrap_or(self.zoom);
        let scale = 256.0 * 2_f64.powf(z);

        let x = (pixel.x / scale) * (2.0 * PI * EARTH_RADIUS) - PI * EARTH_RADIUS;
        let y = PI * EARTH_RADIUS - (pixel.y / scale) * (2.0 * PI * EARTH_RADIUS);

        let lng = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();

        LatLng::new(lat, lng)
    }

    /// Converts a geographical coordinate to container pixel coordinates
    pub fn lat_lng_to_pixel(&self, lat_lng: &LatLng) -> Point {
        let offset = self
            .project(lat_lng, None)
            .subtract(&self.project(&self.center, None));
        Point::new(offset.x + self.size.x / 2.0, offset.y + self.size.y / 2.0)
    }

    /// Converts container pixel coordinates back to geographical coordinates
    pub fn pixel_to_lat_lng(&self, pixel: &Point) -> LatLng {
        let center = self.project(&self.center, None);
        let world = Point::new(
            center.x + pixel.x - self.size.x / 2.0,
            center.y + pixel.y - self.size.y / 2.0,
        );
        self.unproject(&world, None)
    }

    /// Pans the viewport by the given pixel offset
    pub fn pan(&mut self, delta: Point) {
        let center = self.project(&self.center, None);
        let new_center = self.unproject(&center.add(&delta), None);
        self.set_center(new_center);
    }

    /// Gets the current viewport bounds in geographical coordinates
    pub fn bounds(&self) -> LatLngBounds {
        let nw = self.pixel_to_lat_lng(&Point::new(0.0, 0.0));
        let se = self.pixel_to_lat_lng(&self.size);

        LatLngBounds::new(LatLng::new(se.lat, nw.lng), LatLng::new(nw.lat, se.lng))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(LatLng::new(0.0, 0.0), 0.0, Point::new(800.0, 600.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_creation() {
        let viewport = Viewport::new(LatLng::new(49.8, 15.5), 8.0, Point::new(800.0, 600.0));

        assert_eq!(viewport.zoom, 8.0);
        assert_eq!(viewport.center.lat, 49.8);
        assert_eq!(viewport.size.x, 800.0);
    }

    #[test]
    fn test_coordinate_conversion() {
        let viewport = Viewport::new(LatLng::new(0.0, 0.0), 1.0, Point::new(512.0, 512.0));

        let center_lat_lng = viewport.pixel_to_lat_lng(&Point::new(256.0, 256.0));
        assert!(center_lat_lng.lat.abs() < 0.01);
        assert!(center_lat_lng.lng.abs() < 0.01);

        let pixel = viewport.lat_lng_to_pixel(&LatLng::new(0.0, 0.0));
        assert!((pixel.x - 256.0).abs() < 1e-6);
        assert!((pixel.y - 256.0).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_limits() {
        let mut viewport = Viewport::default();
        viewport.set_zoom_limits(3.0, 19.0);

        viewport.set_zoom(1.0);
        assert_eq!(viewport.zoom, 3.0);

        viewport.set_zoom(22.0);
        assert_eq!(viewport.zoom, 19.0);
    }

    #[test]
    fn test_set_view() {
        let mut viewport = Viewport::new(LatLng::new(0.0, 0.0), 3.0, Point::new(512.0, 512.0));
        viewport.set_view(LatLng::new(49.1, 15.2), 14.0);

        assert_eq!(viewport.center, LatLng::new(49.1, 15.2));
        assert_eq!(viewport.zoom, 14.0);
        assert!(viewport.bounds().contains(&LatLng::new(49.1, 15.2)));
    }

    #[test]
    fn test_pan() {
        let mut viewport = Viewport::new(LatLng::new(0.0, 0.0), 1.0, Point::new(512.0, 512.0));

        let original_center = viewport.center;
        viewport.pan(Point::new(10.0, 10.0));
        assert_ne!(viewport.center, original_center);
    }

    #[test]
    fn test_project_round_trips_through_unproject() {
        let viewport = Viewport::new(LatLng::new(49.8, 15.5), 8.0, Point::new(512.0, 512.0));
        let brno = LatLng::new(49.19, 16.61);
        let back = viewport.unproject(&viewport.project(&brno, None), None);
        assert!((back.lat - brno.lat).abs() < 1e-9);
        assert!((back.lng - brno.lng).abs() < 1e-9);
    }
}
