use crate::canonicalize::{canonicalize, Record};
use crate::error::{RegionError, Result};
use crate::faces::{FaceExtractor, Region, DEFAULT_MIN_AREA_M2};
use crate::graph::GapCloser;
use crate::noding::{SnapNoder, DEFAULT_MAX_PASSES};
use crate::precision::{Precision, DEFAULT_DECIMALS, MAX_DECIMALS};
use geo::bounding_rect::BoundingRect;
use geo_types::{MultiPolygon, Rect};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_GAP_TOLERANCE_M: f64 = 1.5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Drawing units to metres.
    pub scale: f64,
    /// Largest drafting gap to bridge, in metres.
    pub gap_tolerance_m: f64,
    /// Smallest region kept, in square metres.
    pub min_area_m2: f64,
    pub precision_decimals: u32,
    pub max_noding_passes: usize,
    /// Layer allow-list. `None` or empty accepts every layer.
    pub layers: Option<BTreeSet<String>>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            gap_tolerance_m: DEFAULT_GAP_TOLERANCE_M,
            min_area_m2: DEFAULT_MIN_AREA_M2,
            precision_decimals: DEFAULT_DECIMALS,
            max_noding_passes: DEFAULT_MAX_PASSES,
            layers: None,
        }
    }
}

impl ExtractorConfig {
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_gap_tolerance(mut self, meters: f64) -> Self {
        self.gap_tolerance_m = meters;
        self
    }

    pub fn with_min_area(mut self, square_meters: f64) -> Self {
        self.min_area_m2 = square_meters;
        self
    }

    pub fn with_precision(mut self, decimals: u32) -> Self {
        self.precision_decimals = decimals;
        self
    }

    pub fn with_max_noding_passes(mut self, passes: usize) -> Self {
        self.max_noding_passes = passes;
        self
    }

    pub fn with_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.layers = Some(layers.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(RegionError::InvalidConfig(format!(
                "scale must be positive and finite, got {}",
                self.scale
            )));
        }
        if !(self.gap_tolerance_m.is_finite() && self.gap_tolerance_m >= 0.0) {
            return Err(RegionError::InvalidConfig(format!(
                "gap tolerance must be non-negative, got {}",
                self.gap_tolerance_m
            )));
        }
        if !(self.min_area_m2.is_finite() && self.min_area_m2 >= 0.0) {
            return Err(RegionError::InvalidConfig(format!(
                "minimum area must be non-negative, got {}",
                self.min_area_m2
            )));
        }
        if self.precision_decimals > MAX_DECIMALS {
            return Err(RegionError::InvalidConfig(format!(
                "precision of {} decimals exceeds the supported {}",
                self.precision_decimals, MAX_DECIMALS
            )));
        }
        Ok(())
    }

    pub fn precision(&self) -> Precision {
        Precision::with_decimals(self.precision_decimals)
    }

    /// Gap tolerance converted to drawing units.
    pub fn gap_tolerance_units(&self) -> f64 {
        self.gap_tolerance_m / self.scale
    }
}

/// Counters describing what the pipeline discarded or repaired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub malformed_records: usize,
    pub filtered_records: usize,
    pub degenerate_segments: usize,
    pub duplicate_segments: usize,
    pub dangling_endpoints: usize,
    pub bridges_added: usize,
    pub unbridged_endpoints: usize,
    pub snapped_endpoints: usize,
    pub noding_passes: usize,
    pub noding_converged: bool,
    pub arrangement_edges: usize,
    pub dangles_pruned: usize,
    pub cut_edges_removed: usize,
    pub slivers_filtered: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Extraction {
    /// Regions ordered by `area_raw`, largest first.
    pub regions: Vec<Region>,
    pub diagnostics: Diagnostics,
    pub scale: f64,
}

impl Extraction {
    pub fn bounds(&self) -> Option<Rect<f64>> {
        let polygons: MultiPolygon<f64> = self.regions.iter().map(|r| r.polygon.clone()).collect();
        polygons.bounding_rect()
    }

    pub fn largest(&self) -> Option<&Region> {
        self.regions.first()
    }
}

/// Buffers drawing records and reconstructs the regions they enclose.
pub struct RegionExtractor {
    pub config: ExtractorConfig,
    records: Vec<Record>,
}

impl RegionExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            records: Vec::new(),
        }
    }

    pub fn add_record(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn add_records<I: IntoIterator<Item = Record>>(&mut self, records: I) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn extract(&self) -> Result<Extraction> {
        extract_regions(&self.records, &self.config)
    }
}

/// One-shot form of [`RegionExtractor::extract`].
pub fn extract_regions(records: &[Record], config: &ExtractorConfig) -> Result<Extraction> {
    config.validate()?;
    let precision = config.precision();

    // 1. Canonical segments
    let canonical = canonicalize(records, precision, config.layers.as_ref());

    // 2. Bridge drafting gaps (single pass)
    let closing = GapCloser::new(config.gap_tolerance_units(), precision).close_gaps(&canonical.segments);

    // 3. Node originals + bridges together
    let mut all = Vec::with_capacity(canonical.segments.len() + closing.bridges.len());
    all.extend(canonical.segments.iter().cloned());
    all.extend(closing.bridges.iter().cloned());
    let noded = SnapNoder::new(precision)
        .with_max_passes(config.max_noding_passes)
        .node(all);

    // 4. Faces
    let (regions, face_stats) =
        FaceExtractor::new(config.scale, config.min_area_m2, precision).extract(&noded.segments, &canonical.layers)?;

    let diagnostics = Diagnostics {
        malformed_records: canonical.stats.malformed_records,
        filtered_records: canonical.stats.filtered_records,
        degenerate_segments: canonical.stats.degenerate_segments,
        duplicate_segments: canonical.stats.duplicate_segments,
        dangling_endpoints: closing.dangling_endpoints,
        bridges_added: closing.bridges.len(),
        unbridged_endpoints: closing.unbridged_endpoints,
        snapped_endpoints: closing.snapped_endpoints,
        noding_passes: noded.passes,
        noding_converged: noded.converged,
        arrangement_edges: noded.segments.len(),
        dangles_pruned: face_stats.dangles_pruned,
        cut_edges_removed: face_stats.cut_edges_removed,
        slivers_filtered: face_stats.slivers_filtered,
    };

    log::debug!(
        "extracted {} regions from {} records ({} bridges)",
        regions.len(),
        records.len(),
        diagnostics.bridges_added
    );

    Ok(Extraction {
        regions,
        diagnostics,
        scale: config.scale,
    })
}
