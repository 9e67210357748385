use crate::faces::Region;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum RegionRole {
    Site,
    Building,
    Other,
}

pub trait RegionPolicy {
    /// One role per region, index-aligned with `regions` (largest first).
    fn classify(&self, regions: &[Region]) -> Vec<RegionRole>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LargestIsSite;

impl RegionPolicy for LargestIsSite {
    fn classify(&self, regions: &[Region]) -> Vec<RegionRole> {
        (0..regions.len())
            .map(|i| if i == 0 { RegionRole::Site } else { RegionRole::Other })
            .collect()
    }
}

/// Classifies by layer-name keywords (case-insensitive substring match).
/// Without a building match, the largest region below `fallback_ratio` of
/// the site area becomes the building.
#[derive(Clone, Debug)]
pub struct LayerKeywordPolicy {
    pub site_keywords: Vec<String>,
    pub building_keywords: Vec<String>,
    pub min_site_area_m2: f64,
    pub fallback_ratio: f64,
}

impl Default for LayerKeywordPolicy {
    fn default() -> Self {
        Self {
            site_keywords: ["SITE", "대지", "지적", "LND", "BOUNDARY"].map(String::from).to_vec(),
            building_keywords: ["HH", "WALL", "벽체", "FOOTPRINT", "FORM", "건축"].map(String::from).to_vec(),
            min_site_area_m2: 20.0,
            fallback_ratio: 0.95,
        }
    }
}

impl LayerKeywordPolicy {
    fn on_layer(region: &Region, keywords: &[String]) -> bool {
        region.layers.iter().any(|layer| {
            let layer = layer.to_uppercase();
            keywords.iter().any(|kw| layer.contains(&kw.to_uppercase()))
        })
    }
}

impl RegionPolicy for LayerKeywordPolicy {
    fn classify(&self, regions: &[Region]) -> Vec<RegionRole> {
        let mut roles = vec![RegionRole::Other; regions.len()];
        if regions.is_empty() {
            return roles;
        }

        // Regions are sorted largest first, so the first match is the largest.
        let site = regions
            .iter()
            .position(|r| Self::on_layer(r, &self.site_keywords) && r.area_m2 >= self.min_site_area_m2)
            .unwrap_or(0);
        roles[site] = RegionRole::Site;

        let mut found_building = false;
        for (i, region) in regions.iter().enumerate() {
            if i != site && Self::on_layer(region, &self.building_keywords) {
                roles[i] = RegionRole::Building;
                found_building = true;
            }
        }

        if !found_building {
            let limit = regions[site].area_m2 * self.fallback_ratio;
            if let Some(i) = (0..regions.len()).find(|&i| i != site && regions[i].area_m2 < limit) {
                roles[i] = RegionRole::Building;
            }
        }
        roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};

    fn region(side: f64, layers: &[&str]) -> Region {
        let ring = LineString::from(vec![(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)]);
        Region {
            polygon: Polygon::new(ring, vec![]),
            area_raw: side * side,
            area_m2: side * side,
            layers: layers.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_largest_is_site() {
        let regions = vec![region(10.0, &[]), region(5.0, &[])];
        assert_eq!(LargestIsSite.classify(&regions), vec![RegionRole::Site, RegionRole::Other]);
        assert!(LargestIsSite.classify(&[]).is_empty());
    }

    #[test]
    fn test_keyword_match() {
        let regions = vec![
            region(100.0, &["A-GRID"]),
            region(40.0, &["site-line"]),
            region(12.0, &["HH"]),
            region(3.0, &["TEXT"]),
        ];
        let roles = LayerKeywordPolicy::default().classify(&regions);
        assert_eq!(
            roles,
            vec![RegionRole::Other, RegionRole::Site, RegionRole::Building, RegionRole::Other]
        );
    }

    #[test]
    fn test_fallbacks() {
        // No site layer: largest wins. No building layer: next clearly smaller region.
        let regions = vec![region(30.0, &["X"]), region(29.9, &["X"]), region(10.0, &["X"])];
        let roles = LayerKeywordPolicy::default().classify(&regions);
        assert_eq!(roles, vec![RegionRole::Site, RegionRole::Other, RegionRole::Building]);
    }

    #[test]
    fn test_small_site_layer_is_ignored() {
        let regions = vec![region(50.0, &["X"]), region(2.0, &["SITE"])];
        let roles = LayerKeywordPolicy::default().classify(&regions);
        assert_eq!(roles[0], RegionRole::Site);
    }
}
