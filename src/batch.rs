use crate::canonicalize::Record;
use crate::error::Result;
use crate::extractor::{extract_regions, ExtractorConfig, Extraction};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Runs many independent drawings through the pipeline with one
/// configuration. Drawings share nothing, so with the `parallel` feature each
/// one goes to its own rayon task.
pub struct BatchExtractor {
    config: ExtractorConfig,
}

impl BatchExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// One result per drawing, in input order. A failing drawing does not
    /// affect the others.
    pub fn extract_all(&self, drawings: &[Vec<Record>]) -> Vec<Result<Extraction>> {
        let process_drawing = |records: &Vec<Record>| extract_regions(records, &self.config);

        let results: Vec<Result<Extraction>>;
        #[cfg(feature = "parallel")]
        {
            results = drawings.par_iter().map(process_drawing).collect();
        }
        #[cfg(not(feature = "parallel"))]
        {
            results = drawings.iter().map(process_drawing).collect();
        }

        log::debug!("batch extraction finished for {} drawings", results.len());
        results
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
