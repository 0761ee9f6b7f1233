use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::style::StyleConfig;
use crate::viewport::Viewport;

fn default_distance_px() -> f64 {
    45.0
}

fn default_center() -> [f64; 2] {
    [4.414, 55.422]
}

fn default_zoom() -> f64 {
    7.0
}

fn default_viewport_size() -> [u32; 2] {
    [1024, 768]
}

fn default_z_index() -> i32 {
    100
}

/// Map layer settings supplied by the host. Only `style` is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapConfig {
    /// Cluster distance in screen pixels; converted with the view resolution.
    #[serde(default = "default_distance_px")]
    pub distance_px: f64,
    /// Initial view center as `[lon, lat]`.
    #[serde(default = "default_center")]
    pub center: [f64; 2],
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    /// `[width, height]` in pixels.
    #[serde(default = "default_viewport_size")]
    pub viewport_size: [u32; 2],
    #[serde(default = "default_z_index")]
    pub z_index: i32,
    /// Extra pixels around each symbol that still count as a hit.
    #[serde(default)]
    pub hit_tolerance_px: f64,
    pub style: StyleConfig,
}

impl MapConfig {
    pub fn new(style: StyleConfig) -> Self {
        MapConfig {
            distance_px: default_distance_px(),
            center: default_center(),
            zoom: default_zoom(),
            viewport_size: default_viewport_size(),
            z_index: default_z_index(),
            hit_tolerance_px: 0.0,
            style,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let config: MapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MapError> {
        if !self.distance_px.is_finite() || self.distance_px < 0.0 {
            return Err(MapError::InvalidDistance(self.distance_px));
        }
        if !self.hit_tolerance_px.is_finite() || self.hit_tolerance_px < 0.0 {
            return Err(MapError::InvalidInput(format!(
                "hitTolerancePx must be finite and non-negative, got {}",
                self.hit_tolerance_px
            )));
        }
        self.initial_viewport().map(|_| ())
    }

    pub fn initial_viewport(&self) -> Result<Viewport, MapError> {
        Viewport::new(
            self.center[0],
            self.center[1],
            self.zoom,
            self.viewport_size[0],
            self.viewport_size[1],
        )
    }
}
