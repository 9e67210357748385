use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An arrangement invariant broke during face tracing. This is a bug in
    /// noding or graph construction, never a property of the input data.
    #[error("Topology error on segment ({:.3}, {:.3})-({:.3}, {:.3}): {reason}", start.0, start.1, end.0, end.1)]
    Topology {
        start: (f64, f64),
        end: (f64, f64),
        reason: String,
    },

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

impl RegionError {
    pub(crate) fn topology(line: geo::Line<f64>, reason: impl Into<String>) -> Self {
        RegionError::Topology {
            start: (line.start.x, line.start.y),
            end: (line.end.x, line.end.y),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegionError>;
