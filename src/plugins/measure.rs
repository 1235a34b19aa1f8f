//! Ruler: click to add points, double-click to finish, Escape to cancel.
//!
//! Every segment reports its great-circle length and initial bearing; the
//! running total is shown next to the last point.

use crate::{
    core::{geo::LatLng, viewport::Viewport},
    plugins::base::{MapEvent, PluginTrait},
    rendering::context::RenderContext,
    Result,
};
use serde::{Deserialize, Serialize};

/// Unit system for measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    /// Metric system (meters, kilometers)
    Metric,
    /// Imperial system (feet, miles)
    Imperial,
    /// Nautical system (nautical miles)
    Nautical,
}

impl UnitSystem {
    /// Human-readable distance for a length in meters
    pub fn format(&self, meters: f64, decimals: usize) -> String {
        match self {
            UnitSystem::Metric => {
                if meters >= 1000.0 {
                    format!("{:.*} km", decimals, meters / 1000.0)
                } else {
                    format!("{:.*} m", decimals, meters)
                }
            }
            UnitSystem::Imperial => {
                let feet = meters * 3.28084;
                if feet >= 5280.0 {
                    format!("{:.*} mi", decimals, feet / 5280.0)
                } else {
                    format!("{:.*} ft", decimals, feet)
                }
            }
            UnitSystem::Nautical => format!("{:.*} nm", decimals, meters / 1852.0),
        }
    }
}

/// Configuration for the measure plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureConfig {
    pub unit_system: UnitSystem,
    /// Digits after the decimal point in labels
    pub decimals: usize,
    /// Keep finished measurements on the map
    pub keep_finished: bool,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            unit_system: UnitSystem::Metric,
            decimals: 2,
            keep_finished: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Great-circle length in meters
    pub distance: f64,
    /// Initial bearing in degrees clockwise from north
    pub bearing: f64,
}

/// A finished (or in-progress) polyline measurement
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub id: String,
    pub points: Vec<LatLng>,
    pub segments: Vec<Segment>,
}

impl Measurement {
    pub fn new(id: String, points: Vec<LatLng>) -> Self {
        let segments = points
            .windows(2)
            .map(|pair| Segment {
                distance: pair[0].distance_to(&pair[1]),
                bearing: pair[0].bearing_to(&pair[1]),
            })
            .collect();
        Self {
            id,
            points,
            segments,
        }
    }

    pub fn total_distance(&self) -> f64 {
        self.segments.iter().map(|s| s.distance).sum()
    }

    pub fn last_bearing(&self) -> Option<f64> {
        self.segments.last().map(|s| s.bearing)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum MeasureState {
    Idle,
    Measuring {
        points: Vec<LatLng>,
        cursor: Option<LatLng>,
    },
}

pub struct MeasurePlugin {
    config: MeasureConfig,
    state: MeasureState,
    measurements: Vec<Measurement>,
    /// Toggled by the ruler button
    active: bool,
    measurement_counter: usize,
}

impl MeasurePlugin {
    pub fn new() -> Self {
        Self::with_config(MeasureConfig::default())
    }

    pub fn with_config(config: MeasureConfig) -> Self {
        Self {
            config,
            state: MeasureState::Idle,
            measurements: Vec::new(),
            active: false,
            measurement_counter: 0,
        }
    }

    pub fn config(&self) -> &MeasureConfig {
        &self.config
    }

    /// Ruler button: switching off drops the measurement in progress
    pub fn toggle(&mut self) -> bool {
        self.active = !self.active;
        if !self.active {
            self.state = MeasureState::Idle;
        }
        self.active
    }

    pub fn is_measuring(&self) -> bool {
        matches!(self.state, MeasureState::Measuring { .. })
    }

    pub fn add_point(&mut self, point: LatLng) {
        match &mut self.state {
            MeasureState::Measuring { points, .. } => points.push(point),
            MeasureState::Idle => {
                self.state = MeasureState::Measuring {
                    points: vec![point],
                    cursor: None,
                }
            }
        }
    }

    /// The measurement being drawn, including the segment to the cursor
    pub fn current(&self) -> Option<Measurement> {
        match &self.state {
            MeasureState::Measuring { points, cursor } => {
                let mut points = points.clone();
                points.extend(cursor.iter().copied());
                Some(Measurement::new("current".to_string(), points))
            }
            MeasureState::Idle => None,
        }
    }

    /// Finish the polyline; a single point is discarded
    pub fn finish(&mut self) -> Option<&Measurement> {
        let state = std::mem::replace(&mut self.state, MeasureState::Idle);
        let MeasureState::Measuring { points, .. } = state else {
            return None;
        };
        if points.len() < 2 {
            return None;
        }
        let id = format!("measurement_{}", self.measurement_counter);
        self.measurement_counter += 1;
        let measurement = Measurement::new(id, points);
        log::debug!(
            "ruler: {} over {} segments",
            self.label(&measurement),
            measurement.segments.len()
        );
        if !self.config.keep_finished {
            self.measurements.clear();
        }
        self.measurements.push(measurement);
        self.measurements.last()
    }

    pub fn cancel(&mut self) {
        self.state = MeasureState::Idle;
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    pub fn clear_measurements(&mut self) {
        self.measurements.clear();
    }

    /// Label text: total distance and bearing of the last segment
    pub fn label(&self, measurement: &Measurement) -> String {
        let distance = self
            .config
            .unit_system
            .format(measurement.total_distance(), self.config.decimals);
        match measurement.last_bearing() {
            Some(bearing) => format!("{} / {:.*}°", distance, self.config.decimals, bearing),
            None => distance,
        }
    }

    fn render_measurement(
        &self,
        measurement: &Measurement,
        context: &mut RenderContext,
        viewport: &Viewport,
    ) {
        let pixels: Vec<_> = measurement
            .points
            .iter()
            .map(|p| viewport.lat_lng_to_pixel(p))
            .collect();
        context.render_line(&pixels);
        if let Some(last) = pixels.last() {
            context.render_label(*last, &self.label(measurement));
        }
    }
}

impl Default for MeasurePlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginTrait for MeasurePlugin {
    fn name(&self) -> &str {
        "ruler"
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn handle_event(&mut self, event: &MapEvent) -> Result<bool> {
        if !self.active {
            return Ok(false);
        }
        match *event {
            MapEvent::Click { position } => self.add_point(position),
            MapEvent::DoubleClick { position } => {
                self.add_point(position);
                self.finish();
            }
            MapEvent::MouseMove { position } => {
                if let MeasureState::Measuring { cursor, .. } = &mut self.state {
                    *cursor = Some(position);
                } else {
                    return Ok(false);
                }
            }
            MapEvent::Escape => {
                if !self.is_measuring() {
                    return Ok(false);
                }
                self.cancel();
            }
        }
        Ok(true)
    }

    fn render(&mut self, context: &mut RenderContext, viewport: &Viewport) -> Result<()> {
        for measurement in &self.measurements {
            self.render_measurement(measurement, context, viewport);
        }
        if let Some(current) = self.current() {
            self.render_measurement(&current, context, viewport);
        }
        Ok(())
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
    use crate::{core::geo::Point, rendering::context::DrawCommand};

    fn prague() -> LatLng {
        LatLng::new(50.0755, 14.4378)
    }

    fn brno() -> LatLng {
        LatLng::new(49.1951, 16.6068)
    }

    #[test]
    fn test_inactive_ruler_ignores_clicks() {
        let mut ruler = MeasurePlugin::new();
        let consumed = ruler
            .handle_event(&MapEvent::Click { position: prague() })
            .unwrap();
        assert!(!consumed);
        assert!(!ruler.is_measuring());
    }

    #[test]
    fn test_click_then_double_click_measures() {
        let mut ruler = MeasurePlugin::new();
        ruler.toggle();
        ruler.handle_event(&MapEvent::Click { position: prague() }).unwrap();
        ruler.handle_event(&MapEvent::DoubleClick { position: brno() }).unwrap();

        let measurement = &ruler.measurements()[0];
        let km = measurement.total_distance() / 1000.0;
        assert!((km - 185.0).abs() < 5.0, "got {} km", km);

        // Brno lies south-east of Prague
        let bearing = measurement.last_bearing().unwrap();
        assert!(bearing > 90.0 && bearing < 180.0, "got {}", bearing);
        assert!(ruler.label(measurement).contains(" km / "));
        assert!(!ruler.is_measuring());
    }

    #[test]
    fn test_escape_cancels() {
        let mut ruler = MeasurePlugin::new();
        ruler.toggle();
        ruler.handle_event(&MapEvent::Click { position: prague() }).unwrap();
        assert!(ruler.handle_event(&MapEvent::Escape).unwrap());
        assert!(!ruler.is_measuring());
        assert!(ruler.measurements().is_empty());
    }

    #[test]
    fn test_single_point_is_discarded() {
        let mut ruler = MeasurePlugin::new();
        ruler.add_point(prague());
        assert!(ruler.finish().is_none());
        assert!(ruler.measurements().is_empty());
    }

    #[test]
    fn test_unit_formatting() {
        assert_eq!(UnitSystem::Metric.format(950.0, 0), "950 m");
        assert_eq!(UnitSystem::Metric.format(1500.0, 1), "1.5 km");
        assert_eq!(UnitSystem::Nautical.format(1852.0, 1), "1.0 nm");
    }

    #[test]
    fn test_render_draws_line_and_label() {
        let mut ruler = MeasurePlugin::new();
        ruler.toggle();
        ruler.add_point(LatLng::new(49.8, 15.4));
        ruler.add_point(LatLng::new(49.8, 15.6));
        ruler.finish();

        let viewport = Viewport::new(LatLng::new(49.8, 15.5), 10.0, Point::new(800.0, 600.0));
        let mut ctx = RenderContext::new(800, 600);
        ruler.render(&mut ctx, &viewport).unwrap();

        assert_eq!(ctx.count(|c| matches!(c, DrawCommand::Line { .. })), 1);
        assert_eq!(ctx.count(|c| matches!(c, DrawCommand::Label { .. })), 1);
    }
}
