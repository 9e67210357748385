use crate::canonicalize::Segment;
use crate::precision::{PointKey, Precision};
use geo::{Closest, ClosestPoint};
use geo_types::{Coord, Line, Point};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::collections::BTreeMap;

/// Undirected connectivity of a canonical segment set.
pub struct ConnectivityGraph {
    // BTreeMap keeps endpoint iteration in key order, independent of input order.
    degrees: BTreeMap<PointKey, usize>,
    precision: Precision,
}

impl ConnectivityGraph {
    pub fn build(segments: &[Segment], precision: Precision) -> Self {
        let mut degrees = BTreeMap::new();
        for seg in segments {
            *degrees.entry(precision.key(seg.line.start)).or_insert(0) += 1;
            *degrees.entry(precision.key(seg.line.end)).or_insert(0) += 1;
        }
        Self { degrees, precision }
    }

    pub fn node_count(&self) -> usize {
        self.degrees.len()
    }

    pub fn degree(&self, c: Coord<f64>) -> usize {
        self.degrees.get(&self.precision.key(c)).copied().unwrap_or(0)
    }

    /// Endpoints with exactly one incident segment, in key order.
    pub fn dangling_endpoints(&self) -> Vec<Coord<f64>> {
        self.degrees
            .iter()
            .filter(|(_, &d)| d == 1)
            .map(|(&k, _)| self.precision.coord(k))
            .collect()
    }
}

#[derive(Clone, Copy, Debug)]
struct IndexedSegment {
    line: Line<f64>,
    index: usize,
}

impl RTreeObject for IndexedSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let p1 = self.line.start;
        let p2 = self.line.end;
        AABB::from_corners([p1.x.min(p2.x), p1.y.min(p2.y)], [p1.x.max(p2.x), p1.y.max(p2.y)])
    }
}

impl PointDistance for IndexedSegment {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let p = Coord { x: point[0], y: point[1] };
        let q = nearest_on(&self.line, p);
        (q.x - p.x).powi(2) + (q.y - p.y).powi(2)
    }
}

fn nearest_on(line: &Line<f64>, p: Coord<f64>) -> Coord<f64> {
    match line.closest_point(&Point::from(p)) {
        Closest::Intersection(q) | Closest::SinglePoint(q) => q.0,
        Closest::Indeterminate => line.start,
    }
}

#[derive(Clone, Debug, Default)]
pub struct GapClosing {
    pub bridges: Vec<Segment>,
    pub dangling_endpoints: usize,
    /// Dangling endpoints with no segment within tolerance.
    pub unbridged_endpoints: usize,
    /// Dangling endpoints whose bridge rounds to zero length.
    pub snapped_endpoints: usize,
}

pub struct GapCloser {
    /// Maximum bridge length in drawing units (exclusive).
    pub tolerance: f64,
    precision: Precision,
}

impl GapCloser {
    pub fn new(tolerance: f64, precision: Precision) -> Self {
        Self { tolerance, precision }
    }

    // Single pass: only original segments are candidates, bridges are never re-examined.
    pub fn close_gaps(&self, segments: &[Segment]) -> GapClosing {
        let graph = ConnectivityGraph::build(segments, self.precision);
        let dangling = graph.dangling_endpoints();
        let mut out = GapClosing {
            dangling_endpoints: dangling.len(),
            ..Default::default()
        };
        if dangling.is_empty() {
            return out;
        }

        let indexed: Vec<IndexedSegment> = segments
            .iter()
            .enumerate()
            .map(|(index, s)| IndexedSegment { line: s.line, index })
            .collect();
        let tree = RTree::bulk_load(indexed);

        for endpoint in dangling {
            match self.nearest_candidate(&tree, endpoint) {
                Some((target, dist)) if dist < self.tolerance => {
                    let target = self.precision.snap(target);
                    if self.precision.same_point(endpoint, target) {
                        // Within rounding distance: the noder attaches it.
                        log::trace!("endpoint {:?} already touches {:?}", endpoint, target);
                        out.snapped_endpoints += 1;
                        continue;
                    }
                    log::trace!("bridging {:?} -> {:?} ({:.4} units)", endpoint, target, dist);
                    out.bridges.push(Segment::bridge(endpoint, target));
                }
                _ => out.unbridged_endpoints += 1,
            }
        }

        log::debug!(
            "gap closing: {} dangling endpoints, {} bridges, {} snapped, {} left open",
            out.dangling_endpoints,
            out.bridges.len(),
            out.snapped_endpoints,
            out.unbridged_endpoints
        );
        out
    }

    /// Nearest point on a segment not incident to `endpoint`. Among exactly
    /// equidistant segments the lowest index wins.
    fn nearest_candidate(&self, tree: &RTree<IndexedSegment>, endpoint: Coord<f64>) -> Option<(Coord<f64>, f64)> {
        let key = self.precision.key(endpoint);
        let touches = |s: &IndexedSegment| {
            self.precision.key(s.line.start) == key || self.precision.key(s.line.end) == key
        };

        let mut best: Option<(&IndexedSegment, f64)> = None;
        for (cand, d2) in tree.nearest_neighbor_iter_with_distance_2(&[endpoint.x, endpoint.y]) {
            if touches(cand) {
                continue;
            }
            match best {
                None => best = Some((cand, d2)),
                Some((b, bd2)) if d2 == bd2 => {
                    if cand.index < b.index {
                        best = Some((cand, d2));
                    }
                }
                Some(_) => break,
            }
        }

        best.map(|(seg, d2)| (nearest_on(&seg.line, endpoint), d2.sqrt()))
    }
}
