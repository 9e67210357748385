use cad_regions::geojson_io::{records_from_geojson, to_feature_collection, DEFAULT_LAYER_PROPERTY};
use cad_regions::{ExtractorConfig, RegionExtractor};
use clap::Parser;
use geojson::GeoJson;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input GeoJSON file (line work exported from the drawing)
    #[arg(short, long)]
    input: PathBuf,

    /// Output GeoJSON file (regions)
    #[arg(short, long)]
    output: PathBuf,

    /// Drawing units to metres (0.001 for millimetre drawings)
    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Largest gap to bridge, in metres
    #[arg(long, default_value_t = 1.5)]
    gap_tolerance: f64,

    /// Smallest region to keep, in square metres
    #[arg(long, default_value_t = 0.001)]
    min_area: f64,

    /// Only use these layers (repeatable)
    #[arg(long = "layer")]
    layers: Vec<String>,

    /// Feature property holding the layer name
    #[arg(long, default_value = DEFAULT_LAYER_PROPERTY)]
    layer_property: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Reading input from {:?}", args.input);
    let file = File::open(&args.input)?;
    let reader = BufReader::new(file);
    let geojson: GeoJson = serde_json::from_reader(reader)?;

    let mut config = ExtractorConfig::default()
        .with_scale(args.scale)
        .with_gap_tolerance(args.gap_tolerance)
        .with_min_area(args.min_area);
    if !args.layers.is_empty() {
        config = config.with_layers(args.layers);
    }

    let mut extractor = RegionExtractor::new(config);
    extractor.add_records(records_from_geojson(&geojson, &args.layer_property));
    println!("Loaded {} records. Extracting regions...", extractor.records().len());

    let extraction = extractor.extract()?;
    let d = &extraction.diagnostics;
    println!(
        "Found {} regions ({} bridges, {} open endpoints, {} slivers dropped).",
        extraction.regions.len(),
        d.bridges_added,
        d.unbridged_endpoints,
        d.slivers_filtered
    );
    if let Some(largest) = extraction.largest() {
        println!("Largest region: {:.3} m2", largest.area_m2);
    }

    let file = File::create(&args.output)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &GeoJson::FeatureCollection(to_feature_collection(&extraction)))?;

    println!("Wrote output to {:?}", args.output);

    Ok(())
}
