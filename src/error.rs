use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the fusion pipeline.
///
/// Per-record problems (a malformed AIS row, an empty detection set) are
/// absorbed where they occur and only logged. Everything here aborts a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("AIS parse error at line {line}: {reason}")]
    AisParse { line: usize, reason: String },

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("cannot write output {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
