use geo_types::{Coord, Rect};
use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::projection::{is_valid_lon_lat, project, resolution_for_zoom, MAX_ZOOM};

/// The visible map: where it is centred, its scale and its size on screen.
///
/// Pixels are measured from the top-left corner with y growing downwards,
/// projected y grows northwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: Coord<f64>,
    pub zoom: f64,
    pub resolution: f64, // metres per pixel
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: u32, height: u32) -> Result<Self, MapError> {
        if !is_valid_lon_lat(center_lon, center_lat) {
            return Err(MapError::InvalidInput(format!(
                "view center ({}, {}) is not a valid lon/lat",
                center_lon, center_lat
            )));
        }
        // Beyond MAX_ZOOM the resolution heads for zero and pixel maths blows up
        let resolution = resolution_for_zoom(zoom);
        if !(0.0..=MAX_ZOOM).contains(&zoom) || resolution <= 0.0 {
            return Err(MapError::InvalidZoom(zoom));
        }
        if width == 0 || height == 0 {
            return Err(MapError::InvalidViewport { width, height });
        }
        Ok(Viewport {
            center: project(center_lon, center_lat),
            zoom,
            resolution,
            width,
            height,
        })
    }

    /// Projection units covered by `pixels` screen pixels at this scale.
    pub fn pixels_to_distance(&self, pixels: f64) -> f64 {
        pixels * self.resolution
    }

    pub fn to_pixel(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (coord.x - self.center.x) / self.resolution + self.width as f64 / 2.0,
            y: (self.center.y - coord.y) / self.resolution + self.height as f64 / 2.0,
        }
    }

    pub fn to_projected(&self, pixel: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.center.x + (pixel.x - self.width as f64 / 2.0) * self.resolution,
            y: self.center.y - (pixel.y - self.height as f64 / 2.0) * self.resolution,
        }
    }

    /// Projected rectangle shown on screen.
    pub fn extent(&self) -> Rect<f64> {
        let half_w = self.width as f64 / 2.0 * self.resolution;
        let half_h = self.height as f64 / 2.0 * self.resolution;
        Rect::new(
            Coord {
                x: self.center.x - half_w,
                y: self.center.y - half_h,
            },
            Coord {
                x: self.center.x + half_w,
                y: self.center.y + half_h,
            },
        )
    }

    /// Whether a symbol of `radius` pixels drawn at `pixel` touches the screen.
    pub fn shows(&self, pixel: Coord<f64>, radius: f64) -> bool {
        pixel.x + radius >= 0.0
            && pixel.x - radius <= self.width as f64
            && pixel.y + radius >= 0.0
            && pixel.y - radius <= self.height as f64
    }
}
