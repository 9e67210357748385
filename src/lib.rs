pub mod batch;
pub mod canonicalize;
pub mod error;
pub mod extractor;
pub mod faces;
pub mod geojson_io;
pub mod graph;
pub mod noding;
pub mod policy;
pub mod precision;

#[cfg(test)]
mod extractor_tests;

pub use batch::BatchExtractor;
pub use canonicalize::{Record, RecordKind};
pub use error::{RegionError, Result};
pub use extractor::{extract_regions, Diagnostics, Extraction, ExtractorConfig, RegionExtractor};
pub use faces::Region;
pub use policy::{LargestIsSite, LayerKeywordPolicy, RegionPolicy, RegionRole};
pub use precision::Precision;
