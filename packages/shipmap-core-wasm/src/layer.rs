use geo_types::Coord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cluster::{Cluster, ClusterIndex};
use crate::hit::{Hit, HitTest};
use crate::style::{StyleDescriptor, StyleSelector};
use crate::viewport::Viewport;

/// One cluster as the renderer should draw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedCluster {
    pub index: usize,
    pub center: [f64; 2], // EPSG:3857
    pub pixel: [f64; 2],
    pub count: usize,
    pub member_ids: Vec<String>,
    pub style: StyleDescriptor,
}

/// Clustered ships plus the symbology used to draw them.
#[derive(Debug, Clone)]
pub struct RenderLayer {
    index: Arc<ClusterIndex>,
    selector: StyleSelector,
    z_index: i32,
}

impl RenderLayer {
    pub fn new(index: Arc<ClusterIndex>, selector: StyleSelector, z_index: i32) -> Self {
        RenderLayer {
            index,
            selector,
            z_index,
        }
    }

    pub fn index(&self) -> &Arc<ClusterIndex> {
        &self.index
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn selector(&self) -> &StyleSelector {
        &self.selector
    }

    pub fn style_for(&self, cluster: &Cluster) -> StyleDescriptor {
        self.selector.select(cluster.len())
    }

    /// Clusters whose symbol touches the screen, in paint order.
    pub fn render(&self, viewport: &Viewport) -> Vec<RenderedCluster> {
        self.index
            .clusters()
            .iter()
            .enumerate()
            .filter_map(|(i, cluster)| {
                let style = self.style_for(cluster);
                let pixel = viewport.to_pixel(cluster.center());
                if !viewport.shows(pixel, style.symbol.hit_radius()) {
                    return None;
                }
                Some(RenderedCluster {
                    index: i,
                    center: [cluster.center().x, cluster.center().y],
                    pixel: [pixel.x, pixel.y],
                    count: cluster.len(),
                    member_ids: cluster.member_ids(),
                    style,
                })
            })
            .collect()
    }
}

/// The drawn layers of one view, used to find what sits under a pixel.
///
/// Symbols are treated as discs of their hit radius around the cluster
/// position, widened by `tolerance` pixels.
pub struct LayerStack<'a> {
    viewport: &'a Viewport,
    layers: Vec<&'a RenderLayer>,
    tolerance: f64,
}

impl<'a> LayerStack<'a> {
    pub fn new(viewport: &'a Viewport, tolerance: f64) -> Self {
        LayerStack {
            viewport,
            layers: Vec::new(),
            tolerance,
        }
    }

    /// Layers pushed later are painted over earlier ones with the same z-index.
    pub fn push(mut self, layer: &'a RenderLayer) -> Self {
        self.layers.push(layer);
        self
    }
}

impl HitTest for LayerStack<'_> {
    fn hits_at(&self, pixel: Coord<f64>) -> Vec<Hit<'_>> {
        let mut found: Vec<(usize, Hit<'_>)> = Vec::new();
        // Clicks off the map and symbols that were never drawn hit nothing
        if !self.viewport.shows(pixel, 0.0) {
            return Vec::new();
        }
        for (order, layer) in self.layers.iter().enumerate() {
            for (i, cluster) in layer.index().clusters().iter().enumerate() {
                let at = self.viewport.to_pixel(cluster.center());
                let radius = layer.style_for(cluster).symbol.hit_radius();
                if !self.viewport.shows(at, radius) {
                    continue;
                }
                if (pixel.x - at.x).hypot(pixel.y - at.y) <= radius + self.tolerance {
                    found.push((
                        order,
                        Hit {
                            z_index: layer.z_index(),
                            cluster_index: i,
                            cluster,
                        },
                    ));
                }
            }
        }
        found.sort_by(|(a_order, a), (b_order, b)| {
            b.z_index
                .cmp(&a.z_index)
                .then(b_order.cmp(a_order))
                .then(b.cluster_index.cmp(&a.cluster_index))
        });
        found.into_iter().map(|(_, hit)| hit).collect()
    }
}
