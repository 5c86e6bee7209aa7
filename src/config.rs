use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::model::MarkingScheme;

pub const DEFAULT_DB_FILENAME: &str = "scorecard.sqlite";

/// On-disk marking scheme. Either key may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkingSchemeFile {
    pub marks_per_correct: Option<f64>,
    pub negative_per_wrong: Option<f64>,
}

pub fn load_scheme_file(path: &Path) -> Result<MarkingSchemeFile> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Flag, then scheme file, then the default of +1 / -0.25.
pub fn resolve_marking_scheme(
    marks_per_correct: Option<f64>,
    negative_per_wrong: Option<f64>,
    scheme_path: Option<&Path>,
) -> Result<MarkingScheme> {
    let file = match scheme_path {
        Some(path) => load_scheme_file(path)?,
        None => MarkingSchemeFile::default(),
    };
    let defaults = MarkingScheme::default();

    let scheme = MarkingScheme {
        marks_per_correct: marks_per_correct
            .or(file.marks_per_correct)
            .unwrap_or(defaults.marks_per_correct),
        negative_per_wrong: negative_per_wrong
            .or(file.negative_per_wrong)
            .unwrap_or(defaults.negative_per_wrong),
    };

    validate_mark("marks_per_correct", scheme.marks_per_correct)?;
    validate_mark("negative_per_wrong", scheme.negative_per_wrong)?;

    Ok(scheme)
}

pub fn validate_total_candidates(total_candidates: u64) -> Result<u64> {
    if total_candidates == 0 {
        bail!("total_candidates must be at least 1");
    }
    Ok(total_candidates)
}

pub fn resolve_db_path(cache_root: &Path, db_path: Option<&Path>) -> PathBuf {
    db_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cache_root.join(DEFAULT_DB_FILENAME))
}

fn validate_mark(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("{name} must be a finite, non-negative number (got {value})");
    }
    Ok(())
}
