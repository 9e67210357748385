use crate::precision::{Precision, SegmentKey};
use geo_types::{Coord, Line};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap};

pub type LayerId = u32;
pub type LayerSet = SmallVec<[LayerId; 2]>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Line,
    Polyline,
}

/// One entity from the drawing, already linearized by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub layer: String,
    pub kind: RecordKind,
    pub points: Vec<Coord<f64>>,
    #[serde(default)]
    pub closed: bool,
}

impl Record {
    pub fn line(layer: impl Into<String>, start: (f64, f64), end: (f64, f64)) -> Self {
        Self {
            layer: layer.into(),
            kind: RecordKind::Line,
            points: vec![start.into(), end.into()],
            closed: false,
        }
    }

    pub fn polyline(layer: impl Into<String>, points: &[(f64, f64)], closed: bool) -> Self {
        Self {
            layer: layer.into(),
            kind: RecordKind::Polyline,
            points: points.iter().map(|&p| p.into()).collect(),
            closed,
        }
    }

    fn is_well_formed(&self) -> bool {
        let count_ok = match self.kind {
            RecordKind::Line => self.points.len() == 2,
            RecordKind::Polyline => self.points.len() >= 2,
        };
        count_ok && self.points.iter().all(|c| c.x.is_finite() && c.y.is_finite())
    }
}

#[derive(Clone, Debug, Default)]
pub struct LayerTable {
    names: Vec<String>,
    ids: HashMap<String, LayerId>,
}

impl LayerTable {
    pub fn intern(&mut self, name: &str) -> LayerId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len() as LayerId;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    pub fn name(&self, id: LayerId) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub line: Line<f64>,
    /// Source layers, sorted. Empty for synthesized bridges.
    pub layers: LayerSet,
}

impl Segment {
    pub fn new(line: Line<f64>, layers: LayerSet) -> Self {
        Self { line, layers }
    }

    pub fn bridge(start: Coord<f64>, end: Coord<f64>) -> Self {
        Self {
            line: Line::new(start, end),
            layers: LayerSet::new(),
        }
    }

    pub fn is_bridge(&self) -> bool {
        self.layers.is_empty()
    }

    fn absorb_layers(&mut self, other: &LayerSet) {
        for &id in other {
            if let Err(pos) = self.layers.binary_search(&id) {
                self.layers.insert(pos, id);
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CanonicalStats {
    pub malformed_records: usize,
    pub filtered_records: usize,
    pub degenerate_segments: usize,
    pub duplicate_segments: usize,
}

#[derive(Clone, Debug, Default)]
pub struct Canonicalized {
    pub segments: Vec<Segment>,
    pub layers: LayerTable,
    pub stats: CanonicalStats,
}

/// `allowed_layers` of `None` or an empty set accepts every layer.
pub fn canonicalize<'a, I>(
    records: I,
    precision: Precision,
    allowed_layers: Option<&BTreeSet<String>>,
) -> Canonicalized
where
    I: IntoIterator<Item = &'a Record>,
{
    let allowed_layers = allowed_layers.filter(|set| !set.is_empty());
    let mut layers = LayerTable::default();
    let mut stats = CanonicalStats::default();
    let mut raw = Vec::new();

    for record in records {
        if let Some(allowed) = allowed_layers {
            if !allowed.contains(&record.layer) {
                stats.filtered_records += 1;
                continue;
            }
        }
        if !record.is_well_formed() {
            stats.malformed_records += 1;
            continue;
        }

        let layer_id = layers.intern(&record.layer);
        let pts = &record.points;
        let mut push = |a: Coord<f64>, b: Coord<f64>| {
            let (a, b) = (precision.snap(a), precision.snap(b));
            if a == b {
                stats.degenerate_segments += 1;
            } else {
                raw.push(Segment::new(Line::new(a, b), smallvec::smallvec![layer_id]));
            }
        };

        for pair in pts.windows(2) {
            push(pair[0], pair[1]);
        }
        if record.closed && record.kind == RecordKind::Polyline {
            push(pts[pts.len() - 1], pts[0]);
        }
    }

    let (segments, duplicates) = merge_duplicates(raw, precision);
    stats.duplicate_segments = duplicates;

    log::debug!(
        "canonicalized {} segments ({} malformed records, {} degenerate, {} duplicates)",
        segments.len(),
        stats.malformed_records,
        stats.degenerate_segments,
        stats.duplicate_segments
    );

    Canonicalized { segments, layers, stats }
}

// Orients each segment start < end and collapses equal keys, unioning layers.
pub(crate) fn merge_duplicates(segments: Vec<Segment>, precision: Precision) -> (Vec<Segment>, usize) {
    let mut index: HashMap<SegmentKey, usize> = HashMap::with_capacity(segments.len());
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    let mut absorbed = 0;

    for mut seg in segments {
        if precision.key(seg.line.start) > precision.key(seg.line.end) {
            seg.line = Line::new(seg.line.end, seg.line.start);
        }
        let key = precision.segment_key(&seg.line);
        match index.get(&key) {
            Some(&i) => {
                merged[i].absorb_layers(&seg.layers);
                absorbed += 1;
            }
            None => {
                index.insert(key, merged.len());
                merged.push(seg);
            }
        }
    }

    (merged, absorbed)
}
