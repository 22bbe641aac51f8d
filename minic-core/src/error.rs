use std::path::PathBuf;

use thiserror::Error;

/// Failures of the library itself, as opposed to defects in a submitted
/// program (those are reported as diagnostics).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("samples directory was not found at {0}")]
    MissingSamples(PathBuf),
    #[error("failed to read sample {path}: {source}")]
    SampleIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}
