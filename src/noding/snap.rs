use crate::canonicalize::{merge_duplicates, Segment};
use crate::precision::{PointKey, Precision};
use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo_types::{Coord, Line};
use rstar::{RTree, RTreeObject, AABB};
use std::cmp::Ordering;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub const DEFAULT_MAX_PASSES: usize = 10;

#[derive(Clone, Copy, Debug)]
struct IndexedLine {
    line: Line<f64>,
    index: usize,
    // Envelope padding, so endpoints within snap distance are candidates too.
    pad: f64,
}

impl RTreeObject for IndexedLine {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        let p1 = self.line.start;
        let p2 = self.line.end;
        AABB::from_corners(
            [p1.x.min(p2.x) - self.pad, p1.y.min(p2.y) - self.pad],
            [p1.x.max(p2.x) + self.pad, p1.y.max(p2.y) + self.pad],
        )
    }
}

#[derive(Clone, Debug, Default)]
pub struct NodedArrangement {
    /// Non-crossing edges, oriented and sorted by segment key.
    pub segments: Vec<Segment>,
    pub passes: usize,
    /// False when `max_passes` ran out while splits were still being found.
    pub converged: bool,
}

// Rounding an intersection can move it off the segments that produced it,
// so noding repeats until a pass finds nothing to split.
pub struct SnapNoder {
    pub precision: Precision,
    pub max_passes: usize,
}

impl SnapNoder {
    pub fn new(precision: Precision) -> Self {
        Self { precision, max_passes: DEFAULT_MAX_PASSES }
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn node(&self, segments: Vec<Segment>) -> NodedArrangement {
        // 1. Snap endpoints, drop degenerates, merge duplicates
        let snapped: Vec<Segment> = segments
            .into_iter()
            .filter_map(|mut seg| {
                seg.line.start = self.precision.snap(seg.line.start);
                seg.line.end = self.precision.snap(seg.line.end);
                (seg.line.start != seg.line.end).then_some(seg)
            })
            .collect();
        let (mut lines, _) = merge_duplicates(snapped, self.precision);
        let precision = self.precision;
        // Key order makes every pass independent of input order.
        lines.sort_by_key(|s| precision.segment_key(&s.line));

        // 2. Iterative noding
        let mut passes = 0;
        let mut converged = false;
        loop {
            let splits = self.find_splits(&lines);
            if splits.is_empty() {
                converged = true;
                break;
            }
            if passes == self.max_passes {
                log::warn!(
                    "noding did not converge after {} passes ({} pending splits)",
                    passes,
                    splits.len()
                );
                break;
            }
            passes += 1;
            let split = self.apply_splits(lines, &splits);
            lines = merge_duplicates(split, self.precision).0;
            lines.sort_by_key(|s| precision.segment_key(&s.line));
        }

        log::debug!("noded arrangement: {} edges after {} passes", lines.len(), passes);
        NodedArrangement { segments: lines, passes, converged }
    }

    /// Collects `(segment index, split vertex)` events, sorted and unique.
    fn find_splits(&self, lines: &[Segment]) -> Vec<(usize, PointKey)> {
        let tol = self.precision.snap_tolerance();
        let indexed: Vec<IndexedLine> = lines
            .iter()
            .enumerate()
            .map(|(i, s)| IndexedLine { line: s.line, index: i, pad: tol })
            .collect();
        let tree = RTree::bulk_load(indexed);

        let precision = self.precision;
        let process_pair = |acc: &mut Vec<(usize, PointKey)>, a: &IndexedLine, b: &IndexedLine| {
            if a.index >= b.index {
                return;
            }
            let (l1, l2) = (a.line, b.line);

            if let Some(res) = line_intersection(l1, l2) {
                match res {
                    LineIntersection::SinglePoint { intersection: pt, .. } => {
                        push_split(acc, precision, a.index, l1, pt);
                        push_split(acc, precision, b.index, l2, pt);
                    }
                    LineIntersection::Collinear { intersection: overlap } => {
                        for p in [overlap.start, overlap.end] {
                            push_split(acc, precision, a.index, l1, p);
                            push_split(acc, precision, b.index, l2, p);
                        }
                    }
                }
            }

            // Endpoints that rounding left just off the other segment
            for p in [l1.start, l1.end] {
                push_near(acc, precision, tol, b.index, l2, p);
            }
            for p in [l2.start, l2.end] {
                push_near(acc, precision, tol, a.index, l1, p);
            }
        };

        #[cfg(feature = "parallel")]
        let mut events: Vec<(usize, PointKey)> = tree
            .intersection_candidates_with_other_tree(&tree)
            .par_bridge()
            .fold(Vec::new, |mut acc, (a, b)| {
                process_pair(&mut acc, a, b);
                acc
            })
            .reduce(Vec::new, |mut a, mut b| {
                a.append(&mut b);
                a
            });

        #[cfg(not(feature = "parallel"))]
        let mut events: Vec<(usize, PointKey)> = tree
            .intersection_candidates_with_other_tree(&tree)
            .fold(Vec::new(), |mut acc, (a, b)| {
                process_pair(&mut acc, a, b);
                acc
            });

        events.sort_unstable();
        events.dedup();
        events
    }

    /// Splits each segment at its events, in order along the segment.
    fn apply_splits(&self, lines: Vec<Segment>, events: &[(usize, PointKey)]) -> Vec<Segment> {
        let mut out = Vec::with_capacity(lines.len() + events.len());
        let mut cursor = 0;

        for (idx, seg) in lines.into_iter().enumerate() {
            let start = cursor;
            while cursor < events.len() && events[cursor].0 == idx {
                cursor += 1;
            }
            if start == cursor {
                out.push(seg);
                continue;
            }

            let line = seg.line;
            let mut points: Vec<Coord<f64>> = events[start..cursor]
                .iter()
                .map(|&(_, k)| self.precision.coord(k))
                .collect();
            points.push(line.start);
            points.push(line.end);
            points.sort_by(|a, b| {
                let ta = param_along(line, *a);
                let tb = param_along(line, *b);
                ta.partial_cmp(&tb).unwrap_or(Ordering::Equal)
            });
            points.dedup();

            for w in points.windows(2) {
                if w[0] != w[1] {
                    out.push(Segment::new(Line::new(w[0], w[1]), seg.layers.clone()));
                }
            }
        }
        out
    }
}

fn push_split(acc: &mut Vec<(usize, PointKey)>, precision: Precision, idx: usize, line: Line<f64>, p: Coord<f64>) {
    let key = precision.key(p);
    if key != precision.key(line.start) && key != precision.key(line.end) {
        acc.push((idx, key));
    }
}

fn push_near(
    acc: &mut Vec<(usize, PointKey)>,
    precision: Precision,
    tol: f64,
    idx: usize,
    line: Line<f64>,
    p: Coord<f64>,
) {
    let t = param_along(line, p);
    if t <= 0.0 || t >= 1.0 {
        return;
    }
    let foot = Coord {
        x: line.start.x + t * (line.end.x - line.start.x),
        y: line.start.y + t * (line.end.y - line.start.y),
    };
    if (foot.x - p.x).hypot(foot.y - p.y) <= tol {
        push_split(acc, precision, idx, line, p);
    }
}

// 0 at start, 1 at end
fn param_along(line: Line<f64>, p: Coord<f64>) -> f64 {
    let dx = line.end.x - line.start.x;
    let dy = line.end.y - line.start.y;
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return 0.0;
    }
    ((p.x - line.start.x) * dx + (p.y - line.start.y) * dy) / len2
}

#[cfg(test)]
#[path = "snap_tests.rs"]
mod tests;
