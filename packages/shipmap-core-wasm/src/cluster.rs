//! Proximity clustering of projected point features.
//!
//! Two features share a cluster when a chain of features connects them in
//! which every hop is at most `distance` projection units long.
//!
//! Features are bucketed into a grid whose cell diagonal is just under
//! `distance`, so everything in one cell is linked without a distance check.
//! Only pairs of occupied cells at most two cells apart are compared, a pair
//! is skipped once its cells already share a set, and a comparison stops at
//! the first pair of features within reach. A dense snapshot therefore costs
//! about one pass over the features rather than one check per feature pair.

use geo::{BoundingRect, Centroid};
use geo_types::{Coord, MultiPoint, Point, Rect};
use std::collections::HashMap;

use crate::error::MapError;
use crate::features::PointFeature;

/// A group of features drawn as one symbol.
#[derive(Debug, Clone)]
pub struct Cluster {
    members: Vec<PointFeature>,
    center: Coord<f64>,
    bounds: Rect<f64>,
}

impl Cluster {
    fn from_members(members: Vec<PointFeature>) -> Self {
        let points: MultiPoint<f64> = members
            .iter()
            .map(|f| Point::from(f.coord))
            .collect::<Vec<_>>()
            .into();
        // Members are never empty here, the fallbacks only keep the types total
        let first = members.first().map(|f| f.coord).unwrap_or(Coord { x: 0.0, y: 0.0 });
        let center = points.centroid().map(|p| p.0).unwrap_or(first);
        let bounds = points.bounding_rect().unwrap_or_else(|| Rect::new(first, first));
        Cluster {
            members,
            center,
            bounds,
        }
    }

    /// Members in snapshot order.
    pub fn members(&self) -> &[PointFeature] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Mean of the member coordinates; where the cluster symbol is drawn.
    pub fn center(&self) -> Coord<f64> {
        self.center
    }

    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// The only member of a single-feature cluster.
    pub fn sole_member(&self) -> Option<&PointFeature> {
        match self.members.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn member_ids(&self) -> Vec<String> {
        self.members.iter().map(|f| f.id.clone()).collect()
    }
}

/// Union-find over feature positions.
struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        DisjointSet {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

// Slightly under distance / sqrt(2) so float rounding in the cell lookup
// never puts two features more than `distance` apart in one cell.
const CELL_SHRINK: f64 = 1.0 - 1e-6;

// Past this the rounding error of `coord / side` outgrows CELL_SHRINK.
const MAX_CELL_INDEX: f64 = (1u64 << 31) as f64;

fn grid_cell(coord: Coord<f64>, side: f64) -> Option<(i64, i64)> {
    let cx = (coord.x / side).floor();
    let cy = (coord.y / side).floor();
    if cx.abs() < MAX_CELL_INDEX && cy.abs() < MAX_CELL_INDEX {
        Some((cx as i64, cy as i64))
    } else {
        None
    }
}

struct GridCell {
    key: (i64, i64),
    members: Vec<usize>,
}

fn within(a: Coord<f64>, b: Coord<f64>, distance: f64) -> bool {
    (a.x - b.x).hypot(a.y - b.y) <= distance
}

fn link_within_distance(features: &[PointFeature], distance: f64, sets: &mut DisjointSet) {
    let side = distance / std::f64::consts::SQRT_2 * CELL_SHRINK;
    let mut slot_of: HashMap<(i64, i64), usize> = HashMap::new();
    // Cells in order of their first feature
    let mut cells: Vec<GridCell> = Vec::new();

    for (i, feature) in features.iter().enumerate() {
        let Some(key) = grid_cell(feature.coord, side) else {
            // A threshold this fine against coordinates this large
            return link_by_sweep(features, distance, sets);
        };
        match slot_of.get(&key) {
            Some(&slot) => {
                sets.union(cells[slot].members[0], i);
                cells[slot].members.push(i);
            }
            None => {
                slot_of.insert(key, cells.len());
                cells.push(GridCell {
                    key,
                    members: vec![i],
                });
            }
        }
    }

    // A gap of three cells is wider than `distance`
    for a in 0..cells.len() {
        let (ax, ay) = cells[a].key;
        for dx in -2i64..=2 {
            for dy in -2i64..=2 {
                let Some(&b) = slot_of.get(&(ax + dx, ay + dy)) else {
                    continue;
                };
                if b <= a {
                    continue;
                }
                let (first_a, first_b) = (cells[a].members[0], cells[b].members[0]);
                if sets.find(first_a) == sets.find(first_b) {
                    continue;
                }
                let touching = cells[a].members.iter().any(|&i| {
                    cells[b]
                        .members
                        .iter()
                        .any(|&j| within(features[i].coord, features[j].coord, distance))
                });
                if touching {
                    sets.union(first_a, first_b);
                }
            }
        }
    }
}

// Fallback for thresholds too small for the grid: sort by x and compare
// each feature with the ones at most `distance` to its right.
fn link_by_sweep(features: &[PointFeature], distance: f64, sets: &mut DisjointSet) {
    let mut order: Vec<usize> = (0..features.len()).collect();
    order.sort_by(|&a, &b| features[a].coord.x.total_cmp(&features[b].coord.x));
    for (n, &i) in order.iter().enumerate() {
        let a = features[i].coord;
        for &j in &order[n + 1..] {
            let b = features[j].coord;
            if b.x - a.x > distance {
                break;
            }
            if within(a, b, distance) {
                sets.union(i, j);
            }
        }
    }
}

fn link_coincident(features: &[PointFeature], sets: &mut DisjointSet) {
    let mut first_at: HashMap<(u64, u64), usize> = HashMap::new();
    for (i, feature) in features.iter().enumerate() {
        // + 0.0 folds -0.0 into 0.0
        let key = ((feature.coord.x + 0.0).to_bits(), (feature.coord.y + 0.0).to_bits());
        match first_at.get(&key) {
            Some(&j) => sets.union(i, j),
            None => {
                first_at.insert(key, i);
            }
        }
    }
}

/// The full partition of a feature snapshot into clusters.
#[derive(Debug, Clone)]
pub struct ClusterIndex {
    clusters: Vec<Cluster>,
    distance: f64,
    generation: u64,
    feature_count: usize,
}

impl ClusterIndex {
    pub fn empty(generation: u64) -> Self {
        ClusterIndex {
            clusters: Vec::new(),
            distance: 0.0,
            generation,
            feature_count: 0,
        }
    }

    /// Partition `features` using `distance` in projection units.
    ///
    /// Clusters come out in the order of their first member, members in
    /// input order, so the same input always yields the same partition.
    pub fn build(
        features: &[PointFeature],
        distance: f64,
        generation: u64,
    ) -> Result<Self, MapError> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(MapError::InvalidDistance(distance));
        }

        let feature_count = features.len();
        let mut sets = DisjointSet::new(feature_count);
        if distance > 0.0 {
            link_within_distance(features, distance, &mut sets);
        } else {
            link_coincident(features, &mut sets);
        }

        let mut slot_of_root: Vec<Option<usize>> = vec![None; feature_count];
        let mut groups: Vec<Vec<PointFeature>> = Vec::new();
        for (i, feature) in features.iter().enumerate() {
            let root = sets.find(i);
            let slot = match slot_of_root[root] {
                Some(slot) => slot,
                None => {
                    groups.push(Vec::new());
                    slot_of_root[root] = Some(groups.len() - 1);
                    groups.len() - 1
                }
            };
            groups[slot].push(feature.clone());
        }

        let clusters: Vec<Cluster> = groups.into_iter().map(Cluster::from_members).collect();
        debug_assert_eq!(
            clusters.iter().map(Cluster::len).sum::<usize>(),
            feature_count,
            "clusters must cover every feature exactly once"
        );

        Ok(ClusterIndex {
            clusters,
            distance,
            generation,
            feature_count,
        })
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn get(&self, index: usize) -> Option<&Cluster> {
        self.clusters.get(index)
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Threshold the index was built with, in projection units.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    /// Position of the cluster holding the feature with `id`.
    pub fn cluster_of(&self, id: &str) -> Option<usize> {
        self.clusters
            .iter()
            .position(|c| c.members().iter().any(|f| f.id == id))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::features::build_features;
    use crate::models::Entity;
    use std::collections::HashSet;
    use std::sync::Arc;

    pub(crate) fn feature_at(id: &str, x: f64, y: f64) -> PointFeature {
        PointFeature {
            id: id.to_string(),
            coord: Coord { x, y },
            entity: Arc::new(Entity::new(id, id, 0.0, 0.0)),
        }
    }

    fn partition(index: &ClusterIndex) -> Vec<Vec<String>> {
        index.clusters().iter().map(Cluster::member_ids).collect()
    }

    fn assert_partition(index: &ClusterIndex, ids: &[&str]) {
        let mut seen = HashSet::new();
        for cluster in index.clusters() {
            assert!(!cluster.is_empty());
            for f in cluster.members() {
                assert!(seen.insert(f.id.clone()), "{} appears twice", f.id);
            }
        }
        let expected: HashSet<String> = ids.iter().map(|s| s.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_empty_features_give_empty_index() {
        let index = ClusterIndex::build(&[], 45.0, 1).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.feature_count(), 0);
    }

    #[test]
    fn test_far_points_stay_apart() {
        let features = vec![feature_at("a", 0.0, 0.0), feature_at("b", 100.0, 0.0)];
        let index = ClusterIndex::build(&features, 50.0, 1).unwrap();
        assert_eq!(partition(&index), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let features = vec![feature_at("a", 0.0, 0.0), feature_at("b", 30.0, 40.0)];
        let index = ClusterIndex::build(&features, 50.0, 1).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.clusters()[0].len(), 2);
    }

    #[test]
    fn test_chain_spans_more_than_threshold() {
        // a-b and b-c are within 10, a-c is 18 apart
        let features = vec![
            feature_at("a", 0.0, 0.0),
            feature_at("c", 18.0, 0.0),
            feature_at("b", 9.0, 0.0),
        ];
        let index = ClusterIndex::build(&features, 10.0, 1).unwrap();
        assert_eq!(partition(&index), vec![vec!["a", "c", "b"]]);
        let bounds = index.clusters()[0].bounds();
        assert_eq!(bounds.width(), 18.0);
    }

    #[test]
    fn test_chain_crosses_several_grid_cells() {
        let features: Vec<PointFeature> = (0..20)
            .map(|i| feature_at(&format!("p{}", i), i as f64 * 9.5, 0.0))
            .collect();
        let index = ClusterIndex::build(&features, 10.0, 1).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.clusters()[0].len(), 20);
    }

    #[test]
    fn test_center_is_mean_of_members() {
        let features = vec![
            feature_at("a", 0.0, 0.0),
            feature_at("b", 10.0, 0.0),
            feature_at("c", 5.0, 6.0),
        ];
        let index = ClusterIndex::build(&features, 10.0, 1).unwrap();
        let center = index.clusters()[0].center();
        assert!((center.x - 5.0).abs() < 1e-9);
        assert!((center.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_cluster_order_follows_first_member() {
        let features = vec![
            feature_at("x", 1000.0, 0.0),
            feature_at("a", 0.0, 0.0),
            feature_at("y", 1005.0, 0.0),
            feature_at("b", 3.0, 0.0),
        ];
        let index = ClusterIndex::build(&features, 10.0, 1).unwrap();
        assert_eq!(partition(&index), vec![vec!["x", "y"], vec!["a", "b"]]);
        assert_eq!(index.cluster_of("b"), Some(1));
        assert_eq!(index.cluster_of("missing"), None);
    }

    #[test]
    fn test_zero_distance_merges_only_coincident_points() {
        let features = vec![
            feature_at("a", 1.0, 1.0),
            feature_at("b", 1.0, 1.0),
            feature_at("c", 1.0, 1.000001),
            feature_at("d", 0.0, -0.0),
            feature_at("e", -0.0, 0.0),
        ];
        let index = ClusterIndex::build(&features, 0.0, 1).unwrap();
        assert_eq!(
            partition(&index),
            vec![vec!["a", "b"], vec!["c"], vec!["d", "e"]]
        );
    }

    #[test]
    fn test_invalid_distance_rejected() {
        let features = vec![feature_at("a", 0.0, 0.0)];
        assert_eq!(
            ClusterIndex::build(&features, -1.0, 1).unwrap_err(),
            MapError::InvalidDistance(-1.0)
        );
        assert!(matches!(
            ClusterIndex::build(&features, f64::NAN, 1),
            Err(MapError::InvalidDistance(_))
        ));
    }

    #[test]
    fn test_partition_is_exhaustive_and_deterministic() {
        // Pseudo-random scatter from a fixed linear congruential sequence
        let mut seed: u64 = 42;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as f64 / (1u64 << 31) as f64) * 10_000.0
        };
        let features: Vec<PointFeature> = (0..500)
            .map(|i| {
                let x = next();
                let y = next();
                feature_at(&format!("s{}", i), x, y)
            })
            .collect();
        let ids: Vec<String> = features.iter().map(|f| f.id.clone()).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

        let first = ClusterIndex::build(&features, 250.0, 1).unwrap();
        let second = ClusterIndex::build(&features, 250.0, 2).unwrap();
        assert_partition(&first, &id_refs);
        assert_eq!(partition(&first), partition(&second));
        assert!(first.len() > 1 && first.len() < 500);
    }

    fn assert_matches_pairwise_closure(features: &[PointFeature], distance: f64) {
        // Reference: quadratic single-linkage
        let mut sets = DisjointSet::new(features.len());
        for i in 0..features.len() {
            for j in 0..i {
                let a = features[i].coord;
                let b = features[j].coord;
                if (a.x - b.x).hypot(a.y - b.y) <= distance {
                    sets.union(i, j);
                }
            }
        }
        let expected: Vec<usize> = (0..features.len()).map(|i| sets.find(i)).collect();

        let index = ClusterIndex::build(features, distance, 1).unwrap();
        for i in 0..features.len() {
            for j in 0..features.len() {
                let same_expected = expected[i] == expected[j];
                let same_actual =
                    index.cluster_of(&features[i].id) == index.cluster_of(&features[j].id);
                assert_eq!(same_expected, same_actual, "{} vs {} at {}", i, j, distance);
            }
        }
    }

    #[test]
    fn test_grid_matches_pairwise_closure() {
        let mut seed: u64 = 7;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as f64 / (1u64 << 31) as f64) * 1_000.0 - 500.0
        };
        let features: Vec<PointFeature> = (0..150)
            .map(|i| {
                let x = next();
                let y = next();
                feature_at(&format!("q{}", i), x, y)
            })
            .collect();
        for distance in [3.0, 40.0, 75.0, 150.0] {
            assert_matches_pairwise_closure(&features, distance);
        }
    }

    #[test]
    fn test_points_on_cell_edges_match_pairwise_closure() {
        // Lattice spacing equal to the threshold puts pairs exactly at `distance`
        let features: Vec<PointFeature> = (0..100)
            .map(|i| feature_at(&format!("g{}", i), (i % 10) as f64 * 10.0, (i / 10) as f64 * 10.0))
            .collect();
        assert_matches_pairwise_closure(&features, 10.0);
        assert_matches_pairwise_closure(&features, 9.999);
        assert_matches_pairwise_closure(&features, 14.143);
    }

    #[test]
    fn test_tiny_threshold_far_from_origin() {
        // Grid cells this small cannot be indexed, the sweep takes over
        let features = vec![
            feature_at("a", 2.0e7, 1.0e7),
            feature_at("b", 2.0e7 + 1e-9, 1.0e7),
            feature_at("c", 2.0e7 + 1e-6, 1.0e7),
            feature_at("d", -2.0e7, 1.0e7),
        ];
        let index = ClusterIndex::build(&features, 1e-8, 1).unwrap();
        assert_eq!(partition(&index), vec![vec!["a", "b"], vec!["c"], vec!["d"]]);
        assert_matches_pairwise_closure(&features, 1e-8);
    }

    #[test]
    fn test_dense_snapshot_collapses_to_one_cluster() {
        // 20 000 ships in a 4 km square, as in a crowded anchorage
        let mut seed: u64 = 11;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as f64 / (1u64 << 31) as f64) * 4_000.0
        };
        let features: Vec<PointFeature> = (0..20_000)
            .map(|i| {
                let x = next();
                let y = next();
                feature_at(&format!("d{}", i), x, y)
            })
            .collect();
        let index = ClusterIndex::build(&features, 200.0, 1).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.clusters()[0].len(), 20_000);
        assert_eq!(index.clusters()[0].members()[0].id, "d0");
    }

    #[test]
    fn test_builds_from_entities() {
        let entities = vec![
            Entity::new("123sad", "Emma Maersk", 55.422, 4.414),
            Entity::new("asflkjd", "Boaty McBoatface", 55.6, 4.414),
        ];
        let features = build_features(&entities).unwrap();
        let index = ClusterIndex::build(&features, 30_000.0, 1).unwrap();
        assert_eq!(index.len(), 2);
        let index = ClusterIndex::build(&features, 40_000.0, 2).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.generation(), 2);
    }
}
