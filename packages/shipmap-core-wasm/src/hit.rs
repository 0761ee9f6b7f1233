//! Click resolution.
//!
//! The renderer answers "which cluster symbols are drawn under this pixel";
//! the resolver turns that answer into a single ship, or reports that the
//! click was ambiguous or hit nothing. Each call stands on its own.

use geo_types::Coord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cluster::Cluster;
use crate::models::Entity;

/// A cluster symbol found under a pixel.
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    pub z_index: i32,
    pub cluster_index: usize,
    pub cluster: &'a Cluster,
}

/// Pixel lookup over drawn geometry.
///
/// Implementations return hits topmost first: the highest z-index layer
/// wins, and inside a layer the symbol painted last sits on top.
pub trait HitTest {
    fn hits_at(&self, pixel: Coord<f64>) -> Vec<Hit<'_>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum HitResult {
    Resolved(Arc<Entity>),
    /// The topmost cluster holds `count` ships.
    Ambiguous { count: usize },
    Empty,
}

/// Wire form of [`HitResult`] handed back to JS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HitResponse {
    Resolved { entity: Entity },
    Ambiguous { count: usize },
    Empty,
}

impl From<&HitResult> for HitResponse {
    fn from(result: &HitResult) -> Self {
        match result {
            HitResult::Resolved(entity) => HitResponse::Resolved {
                entity: Entity::clone(entity),
            },
            HitResult::Ambiguous { count } => HitResponse::Ambiguous { count: *count },
            HitResult::Empty => HitResponse::Empty,
        }
    }
}

/// Resolve a click at `pixel` against the topmost cluster under it.
pub fn resolve_hit<H: HitTest + ?Sized>(hit_test: &H, pixel: Coord<f64>) -> HitResult {
    let hits = hit_test.hits_at(pixel);
    let Some(top) = hits.first() else {
        return HitResult::Empty;
    };
    match top.cluster.sole_member() {
        Some(feature) => HitResult::Resolved(Arc::clone(&feature.entity)),
        None => HitResult::Ambiguous {
            count: top.cluster.len(),
        },
    }
}
