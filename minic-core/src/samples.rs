//! Bundled sample programs served by the `/examples` endpoint.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::CoreError;

pub const SAMPLE_EXTENSION: &str = "mc";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub code: String,
}

pub fn default_samples_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../samples")
}

/// Load every `*.mc` file under `root`, sorted by relative path.
pub fn load_samples(root: impl AsRef<Path>) -> Result<Vec<Sample>, CoreError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(CoreError::MissingSamples(root.to_path_buf()));
    }

    let mut samples = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == SAMPLE_EXTENSION) {
            let code = fs::read_to_string(path).map_err(|source| CoreError::SampleIo {
                path: path.to_path_buf(),
                source,
            })?;
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            samples.push(Sample {
                name: display_name(&relative),
                path: relative,
                code,
            });
        }
    }
    samples.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!(root = %root.display(), count = samples.len(), "loaded samples");
    Ok(samples)
}

/// `02_while_loop.mc` becomes `While loop`.
fn display_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let words = stem
        .split('_')
        .filter(|word| !word.is_empty() && !word.chars().all(|c| c.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join(" ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => stem,
    }
}
