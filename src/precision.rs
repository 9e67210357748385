use geo_types::{Coord, Line};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DECIMALS: u32 = 3;

/// Largest supported decimal count. Beyond this, `coord * 10^d` leaves the
/// range where `i64` grid indices are exact for realistic drawing extents.
pub const MAX_DECIMALS: u32 = 9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Precision {
    decimals: u32,
    factor: f64,
}

// Grid cell identity. Ordering is lexicographic (x, then y).
#[derive(PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct PointKey(pub i64, pub i64);

/// Undirected segment identity: the two endpoint keys, smaller first.
#[derive(PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Debug)]
pub struct SegmentKey(pub PointKey, pub PointKey);

impl SegmentKey {
    pub fn new(a: PointKey, b: PointKey) -> Self {
        if a <= b {
            SegmentKey(a, b)
        } else {
            SegmentKey(b, a)
        }
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::with_decimals(DEFAULT_DECIMALS)
    }
}

impl Precision {
    pub fn with_decimals(decimals: u32) -> Self {
        Self {
            decimals,
            factor: 10f64.powi(decimals as i32),
        }
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    pub fn grid_size(&self) -> f64 {
        1.0 / self.factor
    }

    /// Half the diagonal of a grid cell.
    pub fn snap_tolerance(&self) -> f64 {
        self.grid_size() * std::f64::consts::FRAC_1_SQRT_2
    }

    pub fn key(&self, c: Coord<f64>) -> PointKey {
        PointKey((c.x * self.factor).round() as i64, (c.y * self.factor).round() as i64)
    }

    pub fn coord(&self, key: PointKey) -> Coord<f64> {
        Coord {
            x: key.0 as f64 / self.factor,
            y: key.1 as f64 / self.factor,
        }
    }

    pub fn snap(&self, c: Coord<f64>) -> Coord<f64> {
        self.coord(self.key(c))
    }

    pub fn same_point(&self, a: Coord<f64>, b: Coord<f64>) -> bool {
        self.key(a) == self.key(b)
    }

    pub fn segment_key(&self, line: &Line<f64>) -> SegmentKey {
        SegmentKey::new(self.key(line.start), self.key(line.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_to_three_decimals() {
        let p = Precision::default();
        let c = p.snap(Coord { x: 1.23449, y: -0.0004 });
        assert_eq!(c, Coord { x: 1.234, y: 0.0 });
        assert!(p.same_point(Coord { x: 2.0001, y: 5.0 }, Coord { x: 1.9996, y: 5.0004 }));
        assert!(!p.same_point(Coord { x: 2.0, y: 5.0 }, Coord { x: 2.001, y: 5.0 }));
    }

    #[test]
    fn test_snap_is_stable() {
        let p = Precision::default();
        let once = p.snap(Coord { x: 0.1 + 0.2, y: 7.0 / 3.0 });
        assert_eq!(p.snap(once), once);
        assert_eq!(p.key(once), p.key(Coord { x: 0.3, y: 2.333 }));
    }

    #[test]
    fn test_segment_key_is_undirected() {
        let p = Precision::default();
        let a = Line::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 2.0 });
        let b = Line::new(Coord { x: 1.0, y: 2.0 }, Coord { x: 0.0, y: 0.0 });
        assert_eq!(p.segment_key(&a), p.segment_key(&b));
    }
}
