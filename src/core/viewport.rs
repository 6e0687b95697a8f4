use crate::core::constants::{EARTH_RADIUS, TILE_SIZE};
use crate::core::geo::{LatLng, Point};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Camera state of a headless map: center, zoom, and container size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The center of the map view in geographical coordinates
    pub center: LatLng,
    /// The current zoom level
    pub zoom: f64,
    /// The size of the map container in pixels
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
            zoom: zoom.clamp(0.0, 22.0),
            size,
            min_zoom: 0.0,
            max_zoom: 22.0,
        }
    }

    pub fn set_center(&mut self, center: LatLng) {
        self.center = LatLng::new(LatLng::clamp_lat(center.lat), center.lng);
    }

    /// Sets the zoom level, clamping to valid range
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Gets the scale factor for the current zoom level
    pub fn scale(&self) -> f64 {
        TILE_SIZE * 2_f64.powf(self.zoom)
    }

    /// Projects a LatLng to world pixel coordinates at the current zoom
    pub fn project(&self, lat_lng: &LatLng) -> Point {
        let mercator = lat_lng.to_mercator();
        let world = 2.0 * PI * EARTH_RADIUS;

        Point::new(
            (mercator.x + PI * EARTH_RADIUS) / world * self.scale(),
            (-mercator.y + PI * EARTH_RADIUS) / world * self.scale(),
        )
    }

    /// Unprojects world pixel coordinates back to LatLng at the current zoom
    pub fn unproject(&self, pixel: &Point) -> LatLng {
        let world = 2.0 * PI * EARTH_RADIUS;
        let x = pixel.x / self.scale() * world - PI * EARTH_RADIUS;
        let y = PI * EARTH_RADIUS - pixel.y / self.scale() * world;

        LatLng::from_mercator(Point::new(x, y))
    }

    /// World pixel of the container's top-left corner
    pub fn pixel_origin(&self) -> Point {
        self.project(&self.center)
            .subtract(&self.size.multiply(0.5))
    }

    /// Converts a geographical coordinate to a container-relative pixel
    pub fn lat_lng_to_container_point(&self, lat_lng: &LatLng) -> Point {
        self.project(lat_lng).subtract(&self.pixel_origin())
    }

    /// Converts a container-relative pixel back to a geographical coordinate
    pub fn container_point_to_lat_lng(&self, point: &Point) -> LatLng {
        self.unproject(&point.add(&self.pixel_origin()))
    }

    /// Pans the viewport so the content moves by `delta` pixels
    pub fn pan(&mut self, delta: Point) {
        let center = self.project(&self.center).subtract(&delta);
        let center = self.unproject(&center);
        self.set_center(center);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_center_projects_to_middle() {
        let viewport = Viewport::new(LatLng::new(37.7749, -122.4194), 12.0, Point::new(800.0, 600.0));
        let pixel = viewport.lat_lng_to_container_point(&viewport.center);
        assert!(approx(pixel.x, 400.0));
        assert!(approx(pixel.y, 300.0));
    }

    #[test]
    fn test_world_origin_at_zoom_zero() {
        let viewport = Viewport::new(LatLng::new(0.0, 0.0), 0.0, Point::new(256.0, 256.0));
        let pixel = viewport.project(&LatLng::new(0.0, 0.0));
        assert!(approx(pixel.x, 128.0));
        assert!(approx(pixel.y, 128.0));
    }

    #[test]
    fn test_pan_moves_content() {
        let mut viewport = Viewport::new(LatLng::new(10.0, 20.0), 8.0, Point::new(400.0, 400.0));
        let target = LatLng::new(10.0, 20.0);

        viewport.pan(Point::new(50.0, -30.0));
        let pixel = viewport.lat_lng_to_container_point(&target);
        assert!(approx(pixel.x, 250.0));
        assert!(approx(pixel.y, 170.0));
    }

    #[test]
    fn test_container_point_round_trip() {
        let viewport = Viewport::new(LatLng::new(51.5074, -0.1278), 10.0, Point::new(1024.0, 768.0));
        let target = LatLng::new(51.52, -0.1);
        let back = viewport.container_point_to_lat_lng(&viewport.lat_lng_to_container_point(&target));
        assert!(approx(back.lat, target.lat));
        assert!(approx(back.lng, target.lng));
    }

    #[test]
    fn test_zoom_clamped() {
        let mut viewport = Viewport::new(LatLng::default(), 3.0, Point::new(1.0, 1.0));
        viewport.set_zoom(40.0);
        assert_eq!(viewport.zoom, 22.0);
    }
}
