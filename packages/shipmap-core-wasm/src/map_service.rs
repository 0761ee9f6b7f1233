use geo_types::Coord;
use std::sync::Arc;

use crate::cluster::ClusterIndex;
use crate::config::MapConfig;
use crate::console_log;
use crate::error::MapError;
use crate::features::{build_features, PointFeature};
use crate::hit::{resolve_hit, HitResult, HitTest};
use crate::layer::{LayerStack, RenderLayer, RenderedCluster};
use crate::models::{Entity, LayerStats};
use crate::style::{StyleKind, StyleSelector};
use crate::viewport::Viewport;

/// Owns the ship snapshot, the current view and the cluster index built
/// from them. Every change to the ships, the view scale or the cluster
/// distance rebuilds the index in full.
#[derive(Debug, Clone)]
pub struct MapService {
    config: MapConfig,
    viewport: Viewport,
    features: Vec<PointFeature>,
    layer: RenderLayer,
    generation: u64,
}

impl MapService {
    pub fn new(config: MapConfig) -> Result<Self, MapError> {
        config.validate()?;
        let selector = StyleSelector::from_config(&config.style)?;
        let viewport = config.initial_viewport()?;
        let layer = RenderLayer::new(Arc::new(ClusterIndex::empty(0)), selector, config.z_index);
        Ok(MapService {
            config,
            viewport,
            features: Vec::new(),
            layer,
            generation: 0,
        })
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn layer(&self) -> &RenderLayer {
        &self.layer
    }

    pub fn index(&self) -> &Arc<ClusterIndex> {
        self.layer.index()
    }

    /// Ships of the current snapshot, in load order.
    pub fn entities(&self) -> Vec<Entity> {
        self.features.iter().map(|f| Entity::clone(&f.entity)).collect()
    }

    /// Cluster distance in projection units for the current view.
    pub fn cluster_distance(&self) -> f64 {
        self.viewport.pixels_to_distance(self.config.distance_px)
    }

    /// Replace the ship snapshot. On error the previous snapshot and index
    /// stay in place.
    pub fn load_entities(&mut self, entities: &[Entity]) -> Result<&RenderLayer, MapError> {
        let features = match build_features(entities) {
            Ok(features) => features,
            Err(err) => {
                console_log!("Rejected ship snapshot: {}", err);
                return Err(err);
            }
        };
        let index = self.cluster(&features, self.cluster_distance())?;
        self.features = features;
        self.install(index);
        Ok(&self.layer)
    }

    /// Switch to a new view. The index is rebuilt when the scale changes,
    /// a pure pan keeps it.
    pub fn set_view(&mut self, viewport: Viewport) -> Result<(), MapError> {
        if viewport.resolution != self.viewport.resolution {
            let distance = viewport.pixels_to_distance(self.config.distance_px);
            let index = self.cluster(&self.features, distance)?;
            self.install(index);
        }
        self.viewport = viewport;
        Ok(())
    }

    /// Change the cluster distance in pixels. Nothing changes unless the
    /// rebuilt index is valid.
    pub fn set_distance_px(&mut self, distance_px: f64) -> Result<(), MapError> {
        let distance = self.viewport.pixels_to_distance(distance_px);
        if !distance_px.is_finite() || distance_px < 0.0 || !distance.is_finite() {
            return Err(MapError::InvalidDistance(distance_px));
        }
        let index = self.cluster(&self.features, distance)?;
        self.config.distance_px = distance_px;
        self.install(index);
        Ok(())
    }

    fn cluster(&self, features: &[PointFeature], distance: f64) -> Result<ClusterIndex, MapError> {
        let generation = self.generation + 1;
        let index = ClusterIndex::build(features, distance, generation)?;
        console_log!(
            "Clustered {} ships into {} clusters (distance {:.1} m, generation {})",
            features.len(),
            index.len(),
            distance,
            generation
        );
        Ok(index)
    }

    fn install(&mut self, index: ClusterIndex) {
        self.generation = index.generation();
        self.layer = RenderLayer::new(
            Arc::new(index),
            self.layer.selector().clone(),
            self.config.z_index,
        );
    }

    /// Clusters to draw for the current view.
    pub fn render(&self) -> Vec<RenderedCluster> {
        self.layer.render(&self.viewport)
    }

    fn layer_stack(&self) -> LayerStack<'_> {
        LayerStack::new(&self.viewport, self.config.hit_tolerance_px).push(&self.layer)
    }

    /// Resolve a single click at screen `pixel`.
    pub fn resolve_click(&self, pixel: Coord<f64>) -> HitResult {
        resolve_hit(&self.layer_stack(), pixel)
    }

    /// Ids of every cluster under `pixel`, topmost first.
    pub fn clusters_at_pixel(&self, pixel: Coord<f64>) -> Vec<Vec<String>> {
        self.layer_stack()
            .hits_at(pixel)
            .iter()
            .map(|hit| hit.cluster.member_ids())
            .collect()
    }

    pub fn stats(&self) -> LayerStats {
        let index = self.index();
        let singles = index
            .clusters()
            .iter()
            .filter(|c| self.layer.style_for(c).kind == StyleKind::Single)
            .count();
        LayerStats {
            entity_count: index.feature_count(),
            cluster_count: index.len(),
            single_count: singles,
            aggregate_count: index.len() - singles,
            largest_cluster: index.clusters().iter().map(|c| c.len()).max().unwrap_or(0),
            distance: index.distance(),
            resolution: self.viewport.resolution,
            generation: index.generation(),
        }
    }

    /// Drop all ships, keeping config and view.
    pub fn clear(&mut self) {
        self.features.clear();
        self.generation += 1;
        self.layer = RenderLayer::new(
            Arc::new(ClusterIndex::empty(self.generation)),
            self.layer.selector().clone(),
            self.config.z_index,
        );
    }
}
