use crate::canonicalize::{Record, RecordKind};
use crate::error::Result;
use crate::extractor::Extraction;
use geo_types::{Geometry as GeoGeometry, LineString};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde_json::json;
use std::str::FromStr;

pub const DEFAULT_LAYER_PROPERTY: &str = "layer";

/// Parses a GeoJSON document into records. See [`records_from_geojson`].
pub fn parse_records(input: &str, layer_property: &str) -> Result<Vec<Record>> {
    let geojson = GeoJson::from_str(input)?;
    Ok(records_from_geojson(&geojson, layer_property))
}

/// Converts lineal and polygonal features into records. Polygon rings become
/// closed polylines; points and unconvertible geometries are skipped.
pub fn records_from_geojson(geojson: &GeoJson, layer_property: &str) -> Vec<Record> {
    let mut out = Vec::new();
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                add_feature(feature, layer_property, &mut out);
            }
        }
        GeoJson::Feature(feature) => add_feature(feature, layer_property, &mut out),
        GeoJson::Geometry(geometry) => add_geometry(geometry, "", &mut out),
    }
    out
}

fn add_feature(feature: &Feature, layer_property: &str, out: &mut Vec<Record>) {
    let Some(geometry) = &feature.geometry else {
        return;
    };
    let layer = feature
        .property(layer_property)
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    add_geometry(geometry, layer, out);
}

fn add_geometry(geometry: &Geometry, layer: &str, out: &mut Vec<Record>) {
    match GeoGeometry::<f64>::try_from(geometry.clone()) {
        Ok(geom) => extract_records(&geom, layer, out),
        Err(e) => log::debug!("skipping GeoJSON geometry: {}", e),
    }
}

fn extract_records(geom: &GeoGeometry<f64>, layer: &str, out: &mut Vec<Record>) {
    let polyline = |ls: &LineString<f64>, closed: bool| Record {
        layer: layer.to_string(),
        kind: RecordKind::Polyline,
        points: ls.0.clone(),
        closed,
    };

    match geom {
        GeoGeometry::Line(line) => out.push(Record {
            layer: layer.to_string(),
            kind: RecordKind::Line,
            points: vec![line.start, line.end],
            closed: false,
        }),
        GeoGeometry::LineString(ls) => out.push(polyline(ls, false)),
        GeoGeometry::MultiLineString(mls) => out.extend(mls.0.iter().map(|ls| polyline(ls, false))),
        GeoGeometry::Polygon(poly) => {
            out.push(polyline(poly.exterior(), true));
            out.extend(poly.interiors().iter().map(|ls| polyline(ls, true)));
        }
        GeoGeometry::MultiPolygon(mpoly) => {
            for poly in mpoly {
                out.push(polyline(poly.exterior(), true));
                out.extend(poly.interiors().iter().map(|ls| polyline(ls, true)));
            }
        }
        GeoGeometry::GeometryCollection(gc) => {
            for g in gc {
                extract_records(g, layer, out);
            }
        }
        _ => {}
    }
}

/// One Polygon feature per region, in rank order.
pub fn to_feature_collection(extraction: &Extraction) -> FeatureCollection {
    let features: Vec<Feature> = extraction
        .regions
        .iter()
        .enumerate()
        .map(|(rank, region)| {
            let mut properties = JsonObject::new();
            properties.insert("rank".to_string(), json!(rank));
            properties.insert("area_raw".to_string(), json!(region.area_raw));
            properties.insert("area_m2".to_string(), json!(region.area_m2));
            properties.insert("layers".to_string(), json!(region.layers));
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&region.polygon))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
