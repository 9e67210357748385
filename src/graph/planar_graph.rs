use crate::canonicalize::Segment;
use crate::error::{RegionError, Result};
use crate::precision::{PointKey, Precision};
use geo_types::{Coord, Line};
use smallvec::SmallVec;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

// Type aliases for indices to ensure we don't mix them up
pub type NodeId = usize;
pub type EdgeId = usize;
pub type DirEdgeId = usize;
pub type FaceId = usize;

#[derive(Clone, Debug)]
pub struct Node {
    pub coordinate: Coord<f64>,
    /// Outgoing half-edges.
    /// CRITICAL INVARIANT: sorted by polar angle (CCW) once `sort_edges` ran.
    pub outgoing_edges: SmallVec<[DirEdgeId; 4]>,
    /// Number of live (not removed) incident edges.
    pub degree: usize,
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub line: Line<f64>,
    /// Index of the arrangement segment this edge was built from.
    pub segment_idx: usize,
    pub dir_edges: [DirEdgeId; 2],
    pub is_removed: bool,
}

#[derive(Clone, Debug)]
pub struct DirectedEdge {
    pub src: NodeId,
    pub dst: NodeId,
    pub edge_idx: EdgeId,
    /// Index of the symmetric (reverse) half-edge
    pub sym_idx: DirEdgeId,
    /// Precomputed angle for efficient sorting
    pub angle: f64,
    /// Face this half-edge bounds (on its left), set by `trace_faces`.
    pub face: Option<FaceId>,
    pub is_removed: bool,
}

/// Half-edge structure over a noded arrangement.
pub struct PlanarGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub directed_edges: Vec<DirectedEdge>,
    /// Node keys in node order (sorted), for binary-search lookup.
    keys: Vec<PointKey>,
    precision: Precision,
}

impl PlanarGraph {
    pub fn new(precision: Precision) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            directed_edges: Vec::new(),
            keys: Vec::new(),
            precision,
        }
    }

    /// Builds the graph from noded segments. Nodes are numbered in key order,
    /// edges in input order, so the structure depends only on the input.
    pub fn from_segments(segments: &[Segment], precision: Precision) -> Self {
        let mut graph = Self::new(precision);
        if segments.is_empty() {
            return graph;
        }

        // 1. Collect, sort and dedup node keys
        let mut keys = Vec::with_capacity(segments.len() * 2);
        for seg in segments {
            keys.push(precision.key(seg.line.start));
            keys.push(precision.key(seg.line.end));
        }
        keys.sort_unstable();
        keys.dedup();

        // 2. Build nodes
        graph.nodes = keys
            .iter()
            .map(|&k| Node {
                coordinate: precision.coord(k),
                outgoing_edges: SmallVec::new(),
                degree: 0,
            })
            .collect();
        graph.keys = keys;

        // 3. Build edges
        graph.edges.reserve(segments.len());
        graph.directed_edges.reserve(segments.len() * 2);
        for (segment_idx, seg) in segments.iter().enumerate() {
            let (Some(u), Some(v)) = (graph.node_id(seg.line.start), graph.node_id(seg.line.end)) else {
                continue;
            };
            if u == v {
                continue;
            }
            graph.add_edge(u, v, seg.line, segment_idx);
        }
        graph
    }

    pub fn node_id(&self, c: Coord<f64>) -> Option<NodeId> {
        self.keys.binary_search(&self.precision.key(c)).ok()
    }

    fn add_edge(&mut self, u: NodeId, v: NodeId, line: Line<f64>, segment_idx: usize) {
        let p0 = self.nodes[u].coordinate;
        let p1 = self.nodes[v].coordinate;

        let edge_idx = self.edges.len();
        let de_u_v_idx = self.directed_edges.len();
        let de_v_u_idx = de_u_v_idx + 1;

        self.directed_edges.push(DirectedEdge {
            src: u,
            dst: v,
            edge_idx,
            sym_idx: de_v_u_idx,
            angle: (p1.y - p0.y).atan2(p1.x - p0.x),
            face: None,
            is_removed: false,
        });
        self.directed_edges.push(DirectedEdge {
            src: v,
            dst: u,
            edge_idx,
            sym_idx: de_u_v_idx,
            angle: (p0.y - p1.y).atan2(p0.x - p1.x),
            face: None,
            is_removed: false,
        });
        self.edges.push(Edge {
            line,
            segment_idx,
            dir_edges: [de_u_v_idx, de_v_u_idx],
            is_removed: false,
        });

        self.nodes[u].outgoing_edges.push(de_u_v_idx);
        self.nodes[u].degree += 1;
        self.nodes[v].outgoing_edges.push(de_v_u_idx);
        self.nodes[v].degree += 1;
    }

    pub fn live_edge_count(&self) -> usize {
        self.edges.iter().filter(|e| !e.is_removed).count()
    }

    /// Sorts all outgoing edges of all nodes by angle (CCW). Exact angle
    /// ties are ordered by destination node, i.e. by destination key.
    pub fn sort_edges(&mut self) {
        let directed_edges = &self.directed_edges;
        let sort_node = |node: &mut Node| {
            node.outgoing_edges.sort_by(|&a_idx, &b_idx| {
                let a = &directed_edges[a_idx];
                let b = &directed_edges[b_idx];
                a.angle.total_cmp(&b.angle).then(a.dst.cmp(&b.dst))
            });
        };

        #[cfg(feature = "parallel")]
        self.nodes.par_iter_mut().for_each(sort_node);
        #[cfg(not(feature = "parallel"))]
        self.nodes.iter_mut().for_each(sort_node);
    }

    fn remove_edge(&mut self, edge_idx: EdgeId) {
        let [a, b] = self.edges[edge_idx].dir_edges;
        self.edges[edge_idx].is_removed = true;
        self.directed_edges[a].is_removed = true;
        self.directed_edges[b].is_removed = true;
        let (src, dst) = (self.directed_edges[a].src, self.directed_edges[a].dst);
        self.nodes[src].degree -= 1;
        self.nodes[dst].degree -= 1;
    }

    /// Removes dangling edges iteratively: an edge ending in a degree-1 node
    /// can bound no face. Returns the number of edges removed.
    pub fn prune_dangles(&mut self) -> usize {
        let mut removed = 0;
        let mut to_process: Vec<NodeId> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.degree == 1)
            .map(|(i, _)| i)
            .collect();

        while let Some(node_idx) = to_process.pop() {
            if self.nodes[node_idx].degree != 1 {
                continue;
            }

            let live = self.nodes[node_idx]
                .outgoing_edges
                .iter()
                .copied()
                .find(|&de| !self.directed_edges[de].is_removed);
            let Some(de_idx) = live else {
                continue;
            };

            let neighbor = self.directed_edges[de_idx].dst;
            let edge_idx = self.directed_edges[de_idx].edge_idx;
            self.remove_edge(edge_idx);
            removed += 1;

            if self.nodes[neighbor].degree == 1 {
                to_process.push(neighbor);
            }
        }
        removed
    }

    /// Next half-edge around the face to the left of `de_idx`: at the
    /// destination, the first live outgoing edge clockwise from the reverse.
    fn next_in_face(&self, de_idx: DirEdgeId) -> Result<DirEdgeId> {
        let de = &self.directed_edges[de_idx];
        let dst_node = &self.nodes[de.dst];

        let Some(pos) = dst_node.outgoing_edges.iter().position(|&idx| idx == de.sym_idx) else {
            return Err(RegionError::topology(
                self.edges[de.edge_idx].line,
                "reverse half-edge missing at destination node",
            ));
        };

        let len = dst_node.outgoing_edges.len();
        for i in 1..=len {
            let candidate = dst_node.outgoing_edges[(pos + len - i) % len];
            if !self.directed_edges[candidate].is_removed {
                return Ok(candidate);
            }
        }
        Err(RegionError::topology(
            self.edges[de.edge_idx].line,
            "no live half-edge leaves destination node",
        ))
    }

    /// Partitions all live half-edges into face cycles. Each cycle keeps its
    /// face on the left, so bounded faces come out counter-clockwise.
    pub fn trace_faces(&mut self) -> Result<Vec<Vec<DirEdgeId>>> {
        for de in &mut self.directed_edges {
            de.face = None;
        }

        let mut faces = Vec::new();
        for start in 0..self.directed_edges.len() {
            if self.directed_edges[start].is_removed || self.directed_edges[start].face.is_some() {
                continue;
            }

            let face_id = faces.len();
            let mut ring = Vec::new();
            let mut curr = start;
            loop {
                if self.directed_edges[curr].face.is_some() {
                    let edge = self.directed_edges[curr].edge_idx;
                    return Err(RegionError::topology(
                        self.edges[edge].line,
                        "half-edge reached twice while tracing a face",
                    ));
                }
                self.directed_edges[curr].face = Some(face_id);
                ring.push(curr);

                curr = self.next_in_face(curr)?;
                if curr == start {
                    break;
                }
            }
            faces.push(ring);
        }
        Ok(faces)
    }

    /// Removes edges with the same face on both sides. They carry no area
    /// and would make the surrounding ring non-simple. Requires a preceding
    /// `trace_faces`; returns the number of edges removed.
    pub fn remove_cut_edges(&mut self) -> usize {
        let cut: Vec<EdgeId> = self
            .edges
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_removed)
            .filter(|(_, e)| {
                let [a, b] = e.dir_edges;
                let fa = self.directed_edges[a].face;
                fa.is_some() && fa == self.directed_edges[b].face
            })
            .map(|(i, _)| i)
            .collect();

        for &edge_idx in &cut {
            self.remove_edge(edge_idx);
        }
        cut.len()
    }
}
