use crate::canonicalize::{LayerId, LayerTable, Segment};
use crate::error::Result;
use crate::graph::planar_graph::{DirEdgeId, PlanarGraph};
use crate::precision::{PointKey, Precision};
use geo::Area;
use geo_types::{Coord, LineString, Polygon};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

pub const DEFAULT_MIN_AREA_M2: f64 = 0.001;

/// An enclosed region reconstructed from the drawing.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Region {
    /// Counter-clockwise, starting at its smallest vertex.
    pub polygon: Polygon<f64>,
    pub area_raw: f64,
    /// Area in square metres.
    pub area_m2: f64,
    /// Names of the layers whose line work bounds the region, sorted.
    pub layers: Vec<String>,
}

impl Region {
    /// Ring vertices without the closing repeat of the first point.
    pub fn points(&self) -> &[Coord<f64>] {
        let coords = &self.polygon.exterior().0;
        &coords[..coords.len().saturating_sub(1)]
    }

    pub fn vertex_count(&self) -> usize {
        self.points().len()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FaceStats {
    pub dangles_pruned: usize,
    pub cut_edges_removed: usize,
    /// Bounded faces found before area filtering.
    pub faces_found: usize,
    pub slivers_filtered: usize,
}

pub struct FaceExtractor {
    pub scale: f64,
    pub min_area_m2: f64,
    precision: Precision,
}

impl FaceExtractor {
    pub fn new(scale: f64, min_area_m2: f64, precision: Precision) -> Self {
        Self { scale, min_area_m2, precision }
    }

    /// Extracts ranked regions, largest `area_raw` first.
    pub fn extract(&self, segments: &[Segment], layers: &LayerTable) -> Result<(Vec<Region>, FaceStats)> {
        let mut stats = FaceStats::default();
        let mut graph = PlanarGraph::from_segments(segments, self.precision);
        graph.sort_edges();

        // Removing cut edges can leave new dangles (e.g. a connector path),
        // so alternate until the graph is stable.
        let faces = loop {
            stats.dangles_pruned += graph.prune_dangles();
            let faces = graph.trace_faces()?;
            let cut = graph.remove_cut_edges();
            if cut == 0 {
                break faces;
            }
            stats.cut_edges_removed += cut;
        };

        let scale2 = self.scale * self.scale;
        let mut regions = Vec::new();
        for face in &faces {
            for ring in simple_loops(&graph, face) {
                let Some(region) = self.build_region(&graph, &ring, segments, layers, scale2) else {
                    continue;
                };
                stats.faces_found += 1;
                if region.area_m2 < self.min_area_m2 {
                    stats.slivers_filtered += 1;
                    continue;
                }
                regions.push(region);
            }
        }

        rank(&mut regions, self.precision);

        log::debug!(
            "face extraction: {} regions ({} slivers filtered, {} dangles pruned, {} cut edges)",
            regions.len(),
            stats.slivers_filtered,
            stats.dangles_pruned,
            stats.cut_edges_removed
        );
        Ok((regions, stats))
    }

    fn build_region(
        &self,
        graph: &PlanarGraph,
        ring: &[DirEdgeId],
        segments: &[Segment],
        layers: &LayerTable,
        scale2: f64,
    ) -> Option<Region> {
        if ring.len() < 3 {
            return None;
        }
        let coords: Vec<Coord<f64>> = ring
            .iter()
            .map(|&de| graph.nodes[graph.directed_edges[de].src].coordinate)
            .collect();
        let polygon = Polygon::new(LineString::new(canonical_start(coords, self.precision)), vec![]);
        let area_raw = polygon.signed_area();
        if area_raw <= 0.0 {
            return None;
        }

        let layer_ids: BTreeSet<LayerId> = ring
            .iter()
            .flat_map(|&de| {
                let edge = &graph.edges[graph.directed_edges[de].edge_idx];
                segments[edge.segment_idx].layers.iter().copied()
            })
            .collect();
        let mut names: Vec<String> = layer_ids
            .into_iter()
            .filter_map(|id| layers.name(id).map(str::to_string))
            .collect();
        names.sort();

        Some(Region {
            polygon,
            area_raw,
            area_m2: area_raw * scale2,
            layers: names,
        })
    }
}

// Splits a closed walk into simple loops at repeated vertices.
fn simple_loops(graph: &PlanarGraph, walk: &[DirEdgeId]) -> Vec<Vec<DirEdgeId>> {
    let mut loops = Vec::new();
    let mut stack: Vec<DirEdgeId> = Vec::with_capacity(walk.len());
    let mut open_at: HashMap<usize, usize> = HashMap::new();

    for &de in walk {
        let src = graph.directed_edges[de].src;
        if let Some(pos) = open_at.get(&src).copied() {
            let closed: Vec<DirEdgeId> = stack.drain(pos..).collect();
            for &e in &closed {
                open_at.remove(&graph.directed_edges[e].src);
            }
            loops.push(closed);
        }
        open_at.insert(src, stack.len());
        stack.push(de);
    }
    if !stack.is_empty() {
        loops.push(stack);
    }
    loops
}

fn canonical_start(mut coords: Vec<Coord<f64>>, precision: Precision) -> Vec<Coord<f64>> {
    if let Some(min_pos) = coords
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| precision.key(**c))
        .map(|(i, _)| i)
    {
        coords.rotate_left(min_pos);
    }
    coords
}

fn rank(regions: &mut [Region], precision: Precision) {
    let start_key = |r: &Region| -> Option<PointKey> { r.points().first().map(|c| precision.key(*c)) };
    regions.sort_by(|a, b| {
        b.area_raw
            .partial_cmp(&a.area_raw)
            .unwrap_or(Ordering::Equal)
            .then_with(|| start_key(a).cmp(&start_key(b)))
            .then_with(|| a.vertex_count().cmp(&b.vertex_count()))
    });
}

#[cfg(test)]
#[path = "faces_tests.rs"]
mod tests;
