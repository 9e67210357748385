use crate::{extract_regions, ExtractorConfig, Record, RegionError, RegionExtractor};
use approx::assert_relative_eq;
use geo_types::Coord;

fn unit_square(layer: &str, x: f64, y: f64) -> Record {
    Record::polyline(
        layer,
        &[(x, y), (x + 1.0, y), (x + 1.0, y + 1.0), (x, y + 1.0), (x, y)],
        false,
    )
}

#[test]
fn test_unit_square() {
    let out = extract_regions(&[unit_square("A", 0.0, 0.0)], &ExtractorConfig::default()).unwrap();

    assert_eq!(out.regions.len(), 1);
    assert_relative_eq!(out.regions[0].area_raw, 1.0);
    assert_relative_eq!(out.regions[0].area_m2, 1.0);
    assert_eq!(out.regions[0].vertex_count(), 4);
    assert_eq!(out.diagnostics.dangling_endpoints, 0);
    assert_eq!(out.diagnostics.bridges_added, 0);
}

#[test]
fn test_sub_grid_shortening_is_absorbed_by_rounding() {
    // 0.9997 lands on the same grid point as 1.0.
    let records = vec![
        Record::line("A", (0.0, 0.0), (0.9997, 0.0)),
        Record::line("A", (1.0, 0.0), (1.0, 1.0)),
        Record::line("A", (1.0, 1.0), (0.0, 1.0)),
        Record::line("A", (0.0, 1.0), (0.0, 0.0)),
    ];
    let out = extract_regions(&records, &ExtractorConfig::default()).unwrap();
    assert_eq!(out.regions.len(), 1);
    assert_relative_eq!(out.regions[0].area_raw, 1.0);
}

#[test]
fn test_sub_grid_shortening_across_rounding_boundary_is_bridged() {
    // Corner at 1.0006 rounds to 1.001; the edge shortened to 1.0003 rounds
    // to 1.000, leaving a one-cell gap.
    let records = vec![
        Record::line("A", (0.0, 0.0), (1.0003, 0.0)),
        Record::line("A", (1.0006, 0.0), (1.0006, 1.0)),
        Record::line("A", (1.0006, 1.0), (0.0, 1.0)),
        Record::line("A", (0.0, 1.0), (0.0, 0.0)),
    ];
    let out = extract_regions(&records, &ExtractorConfig::default()).unwrap();

    assert_eq!(out.regions.len(), 1);
    assert!(out.diagnostics.bridges_added > 0);
    assert_eq!(out.diagnostics.unbridged_endpoints, 0);
    assert_relative_eq!(out.regions[0].area_raw, 1.001, epsilon = 1e-9);
}

#[test]
fn test_short_segment_is_bridged() {
    let records = vec![
        Record::line("A", (0.0, 0.0), (0.7, 0.0)),
        Record::line("A", (1.0, 0.0), (1.0, 1.0)),
        Record::line("A", (1.0, 1.0), (0.0, 1.0)),
        Record::line("A", (0.0, 1.0), (0.0, 0.0)),
    ];
    let out = extract_regions(&records, &ExtractorConfig::default()).unwrap();

    assert_eq!(out.regions.len(), 1);
    assert_relative_eq!(out.regions[0].area_raw, 1.0, epsilon = 1e-9);
    assert_eq!(out.regions[0].layers, vec!["A".to_string()]);
    assert_eq!(out.diagnostics.dangling_endpoints, 2);
    // One bridge from each side of the gap; the noder merges them.
    assert_eq!(out.diagnostics.bridges_added, 2);
    assert_eq!(out.diagnostics.unbridged_endpoints, 0);
}

#[test]
fn test_disjoint_squares_each_appear_once() {
    let records = vec![unit_square("A", 0.0, 0.0), unit_square("A", 3.0, 0.0)];
    let config = ExtractorConfig::default().with_gap_tolerance(0.0);
    let first = extract_regions(&records, &config).unwrap();

    assert_eq!(first.regions.len(), 2);
    assert_eq!(first.regions[0].points()[0], Coord { x: 0.0, y: 0.0 });
    assert_eq!(first.regions[1].points()[0], Coord { x: 3.0, y: 0.0 });

    let second = extract_regions(&records, &config).unwrap();
    assert_eq!(first, second);
}

fn gapped_rectangle() -> Vec<Record> {
    vec![
        Record::line("A", (0.0, 0.0), (1.0, 0.0)),
        Record::line("A", (1.0005, 0.0), (2.0, 0.0)),
        Record::line("A", (2.0, 0.0), (2.0, 1.0)),
        Record::line("A", (2.0, 1.0), (0.0, 1.0)),
        Record::line("A", (0.0, 1.0), (0.0, 0.0)),
    ]
}

#[test]
fn test_gap_closed_within_tolerance() {
    let config = ExtractorConfig::default().with_gap_tolerance(0.01);
    let out = extract_regions(&gapped_rectangle(), &config).unwrap();

    assert_eq!(out.regions.len(), 1);
    assert_relative_eq!(out.regions[0].area_raw, 2.0, epsilon = 1e-9);
    assert!(out.diagnostics.bridges_added > 0);
}

#[test]
fn test_gap_left_open_at_zero_tolerance() {
    let config = ExtractorConfig::default().with_gap_tolerance(0.0);
    let out = extract_regions(&gapped_rectangle(), &config).unwrap();

    assert!(out.regions.is_empty());
    assert_eq!(out.diagnostics.bridges_added, 0);
    assert_eq!(out.diagnostics.unbridged_endpoints, 2);
}

#[test]
fn test_gap_tolerance_is_scaled() {
    // Drawing in millimetres: a 0.5 mm gap against a 1 mm tolerance.
    let records = vec![
        Record::line("A", (0.0, 0.0), (1000.0, 0.0)),
        Record::line("A", (1000.5, 0.0), (2000.0, 0.0)),
        Record::line("A", (2000.0, 0.0), (2000.0, 1000.0)),
        Record::line("A", (2000.0, 1000.0), (0.0, 1000.0)),
        Record::line("A", (0.0, 1000.0), (0.0, 0.0)),
    ];
    let config = ExtractorConfig::default().with_scale(0.001).with_gap_tolerance(0.001);
    let out = extract_regions(&records, &config).unwrap();

    assert_eq!(out.regions.len(), 1);
    assert_relative_eq!(out.regions[0].area_m2, 2.0, epsilon = 1e-9);
}

#[test]
fn test_area_filter() {
    let records = vec![
        unit_square("A", 0.0, 0.0),
        Record::polyline("A", &[(5.0, 5.0), (5.01, 5.0), (5.01, 5.01), (5.0, 5.01)], true),
    ];
    let config = ExtractorConfig::default().with_min_area(0.001);
    let out = extract_regions(&records, &config).unwrap();

    assert_eq!(out.regions.len(), 1);
    assert_relative_eq!(out.regions[0].area_m2, 1.0);
    assert_eq!(out.diagnostics.slivers_filtered, 1);
}

#[test]
fn test_crossing_diagonals() {
    let records = vec![
        Record::polyline("A", &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)], true),
        Record::line("A", (0.0, 0.0), (10.0, 10.0)),
        Record::line("A", (0.0, 10.0), (10.0, 0.0)),
    ];
    let out = extract_regions(&records, &ExtractorConfig::default()).unwrap();

    assert_eq!(out.regions.len(), 4);
    for region in &out.regions {
        assert_relative_eq!(region.area_raw, 25.0, epsilon = 1e-9);
        assert_eq!(region.vertex_count(), 3);
    }
}

#[test]
fn test_collinear_overlap_merges_layers() {
    let records = vec![
        Record::line("A", (0.0, 0.0), (6.0, 0.0)),
        Record::line("B", (4.0, 0.0), (10.0, 0.0)),
        Record::polyline("A", &[(10.0, 0.0), (10.0, 5.0), (0.0, 5.0), (0.0, 0.0)], false),
    ];
    let out = extract_regions(&records, &ExtractorConfig::default()).unwrap();

    assert_eq!(out.regions.len(), 1);
    assert_relative_eq!(out.regions[0].area_raw, 50.0, epsilon = 1e-9);
    assert_eq!(out.regions[0].layers, vec!["A".to_string(), "B".to_string()]);
}

#[test]
fn test_layer_allow_list() {
    let records = vec![
        unit_square("WALL", 0.0, 0.0),
        Record::line("GRID", (0.5, -1.0), (0.5, 2.0)),
    ];
    let config = ExtractorConfig::default().with_gap_tolerance(0.0);

    let everything = extract_regions(&records, &config).unwrap();
    assert_eq!(everything.regions.len(), 2);

    let walls = extract_regions(&records, &config.clone().with_layers(["WALL"])).unwrap();
    assert_eq!(walls.regions.len(), 1);
    assert_eq!(walls.diagnostics.filtered_records, 1);
}

#[test]
fn test_noise_is_counted_not_fatal() {
    let records = vec![
        unit_square("A", 0.0, 0.0),
        Record::polyline("A", &[(3.0, 3.0)], false),
        Record::line("A", (3.0, 3.0), (3.0001, 3.0)),
    ];
    let out = extract_regions(&records, &ExtractorConfig::default()).unwrap();

    assert_eq!(out.regions.len(), 1);
    assert_eq!(out.diagnostics.malformed_records, 1);
    assert_eq!(out.diagnostics.degenerate_segments, 1);
}

#[test]
fn test_empty_input() {
    let out = extract_regions(&[], &ExtractorConfig::default()).unwrap();
    assert!(out.regions.is_empty());
    assert!(out.bounds().is_none());
    assert!(out.largest().is_none());
}

#[test]
fn test_invalid_config() {
    let bad = [
        ExtractorConfig::default().with_scale(0.0),
        ExtractorConfig::default().with_scale(f64::INFINITY),
        ExtractorConfig::default().with_gap_tolerance(-1.0),
        ExtractorConfig::default().with_min_area(f64::NAN),
        ExtractorConfig::default().with_precision(12),
    ];
    for config in &bad {
        let err = extract_regions(&[unit_square("A", 0.0, 0.0)], config).unwrap_err();
        assert!(matches!(err, RegionError::InvalidConfig(_)), "{:?}", config);
    }
}

#[test]
fn test_extractor_buffers_records() {
    let mut extractor = RegionExtractor::new(ExtractorConfig::default());
    extractor.add_record(unit_square("A", 0.0, 0.0));
    extractor.add_records(vec![unit_square("B", 5.0, 5.0)]);
    assert_eq!(extractor.records().len(), 2);

    let out = extractor.extract().unwrap();
    assert_eq!(out.regions.len(), 2);

    let bounds = out.bounds().unwrap();
    assert_eq!(bounds.min(), Coord { x: 0.0, y: 0.0 });
    assert_eq!(bounds.max(), Coord { x: 6.0, y: 6.0 });
    assert_eq!(out.largest().map(|r| r.layers.clone()), Some(vec!["A".to_string()]));
}
