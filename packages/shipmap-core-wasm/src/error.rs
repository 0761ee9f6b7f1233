use thiserror::Error;
use wasm_bindgen::JsValue;

/// Errors raised while building or querying the ship layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    #[error("entity '{id}' at position {index} has invalid coordinates (lat {latitude}, lon {longitude})")]
    InvalidCoordinate {
        id: String,
        index: usize,
        latitude: f64,
        longitude: f64,
    },
    #[error("duplicate entity id '{id}' at positions {first} and {second}")]
    DuplicateId {
        id: String,
        first: usize,
        second: usize,
    },
    #[error("cluster distance must be finite and non-negative, got {0}")]
    InvalidDistance(f64),
    #[error("zoom must be between 0 and 30, got {0}")]
    InvalidZoom(f64),
    #[error("viewport must be at least 1x1 pixels, got {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },
    #[error("invalid style rules: {0}")]
    InvalidStyleRules(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("map is not configured; call configure_map first")]
    NotConfigured,
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        MapError::InvalidInput(err.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for MapError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        MapError::InvalidInput(err.to_string())
    }
}

impl From<MapError> for JsValue {
    fn from(err: MapError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}
