// This is the models module containing shared data structures
use serde::{Deserialize, Serialize};

/// A geo-located record supplied by the host, e.g. a ship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Entity {
    pub fn new(id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Entity {
            id: id.into(),
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerStats {
    pub entity_count: usize,
    pub cluster_count: usize,
    pub single_count: usize,
    pub aggregate_count: usize,
    pub largest_cluster: usize,
    pub distance: f64,
    pub resolution: f64,
    pub generation: u64,
}
