use geo_types::Coord;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

// Create a console module for logging
pub mod console;
pub mod error;
// Lon/lat to Web Mercator
pub mod projection;
pub mod models;
pub mod features;
pub mod cluster;
pub mod style;
pub mod viewport;
pub mod hit;
pub mod layer;
pub mod config;
pub mod map_service;
// Global map state behind the exported functions
mod module_state;

pub use cluster::{Cluster, ClusterIndex};
pub use config::MapConfig;
pub use error::MapError;
pub use features::{build_features, PointFeature};
pub use hit::{resolve_hit, Hit, HitResponse, HitResult, HitTest};
pub use layer::{LayerStack, RenderLayer, RenderedCluster};
pub use map_service::MapService;
pub use models::{Entity, LayerStats};
pub use style::{AggregateAppearance, StyleConfig, StyleDescriptor, StyleKind, StyleSelector};
pub use viewport::Viewport;

use module_state::ModuleState;

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

// Use the macro from our console module
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => ($crate::console::log(&format!($($t)*)))
}

use std::sync::Once;
static INIT: Once = Once::new();

// This sets up the wasm_bindgen start functionality
#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        // Set the panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console_log!("Ship map module initialized");
    });
}

fn stats_value() -> Result<JsValue, JsValue> {
    let stats = ModuleState::with(|map| map.stats())?;
    Ok(to_value(&stats)?)
}

/// Configure the ship layer from a JS object shaped like `MapConfig`.
/// Ships loaded earlier are reclustered under the new settings.
#[wasm_bindgen]
pub fn configure_map(config: JsValue) -> Result<JsValue, JsValue> {
    let config: MapConfig = from_value(config).map_err(MapError::from)?;
    ModuleState::configure(MapService::new(config)?)?;
    stats_value()
}

#[wasm_bindgen]
pub fn configure_map_json(config_json: &str) -> Result<JsValue, JsValue> {
    let config = MapConfig::from_json(config_json)?;
    ModuleState::configure(MapService::new(config)?)?;
    stats_value()
}

/// Replace the ship list, an array of `{id, name, latitude, longitude}`.
#[wasm_bindgen]
pub fn load_entities(entities: JsValue) -> Result<JsValue, JsValue> {
    let entities: Vec<Entity> = from_value(entities).map_err(MapError::from)?;
    ModuleState::with_mut(|map| map.load_entities(&entities).map(|_| ()))?;
    stats_value()
}

#[wasm_bindgen]
pub fn load_entities_json(entities_json: &str) -> Result<JsValue, JsValue> {
    let entities: Vec<Entity> = serde_json::from_str(entities_json).map_err(MapError::from)?;
    ModuleState::with_mut(|map| map.load_entities(&entities).map(|_| ()))?;
    stats_value()
}

/// Update the view after the host map moved or zoomed.
#[wasm_bindgen]
pub fn set_view(center_lon: f64, center_lat: f64, zoom: f64, width: u32, height: u32) -> Result<JsValue, JsValue> {
    let viewport = Viewport::new(center_lon, center_lat, zoom, width, height)?;
    ModuleState::with_mut(|map| map.set_view(viewport))?;
    stats_value()
}

#[wasm_bindgen]
pub fn set_cluster_distance(distance_px: f64) -> Result<JsValue, JsValue> {
    ModuleState::with_mut(|map| map.set_distance_px(distance_px))?;
    stats_value()
}

/// Clusters to draw for the current view, in paint order.
#[wasm_bindgen]
pub fn render_layer() -> Result<JsValue, JsValue> {
    let rendered = ModuleState::with(|map| map.render())?;
    Ok(to_value(&rendered)?)
}

/// Resolve a single click at pixel `(x, y)` to a ship.
#[wasm_bindgen]
pub fn resolve_click(x: f64, y: f64) -> Result<JsValue, JsValue> {
    let response = ModuleState::with(|map| HitResponse::from(&map.resolve_click(Coord { x, y })))?;
    Ok(to_value(&response)?)
}

#[wasm_bindgen]
pub fn clusters_at_pixel(x: f64, y: f64) -> Result<JsValue, JsValue> {
    let ids = ModuleState::with(|map| map.clusters_at_pixel(Coord { x, y }))?;
    Ok(to_value(&ids)?)
}

#[wasm_bindgen]
pub fn get_layer_stats() -> Result<JsValue, JsValue> {
    stats_value()
}

// Drops ships and configuration
#[wasm_bindgen]
pub fn clear_map() -> bool {
    ModuleState::reset();
    true
}
