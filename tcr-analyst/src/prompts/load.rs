//! Load the analysis template from a prompts directory, falling back to the embedded copy.
//!
//! **Canonical source**: `tcr-analyst/prompts/analysis.yaml`, embedded at compile time. A file
//! with the same name in the prompts directory is overlaid on it section by section.
//! See [`load`], [`load_or_default`], [`default_from_embedded`], and [`LoadError`].

use std::path::{Path, PathBuf};

use super::{AnalysisTemplate, AnalysisTemplateFile};

const EMBED_ANALYSIS: &str = include_str!("../../prompts/analysis.yaml");
const EMBED_SOURCE: &str = "<embedded analysis.yaml>";

/// Name of the template file inside the prompts directory.
const ANALYSIS_FILE: &str = "analysis.yaml";

/// Default directory name when neither a directory nor `TCR_PROMPTS_DIR` is given.
const DEFAULT_PROMPTS_DIR: &str = "prompts";

/// Env var naming the prompts directory.
pub const PROMPTS_DIR_ENV: &str = "TCR_PROMPTS_DIR";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("prompts directory not found or not readable: {0}")]
    DirNotFound(String),
    #[error("failed to read template file {path}: {message}")]
    ReadFile { path: String, message: String },
    #[error("failed to parse YAML in {path}: {message}")]
    ParseYaml { path: String, message: String },
    #[error("template {path} has no {field}")]
    MissingField { path: String, field: &'static str },
}

/// `dir` if given, else `TCR_PROMPTS_DIR`, else `./prompts`.
fn prompts_dir(dir: Option<&Path>) -> PathBuf {
    dir.map(PathBuf::from)
        .or_else(|| env_config::env_path(PROMPTS_DIR_ENV))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROMPTS_DIR))
}

fn parse_template_file(content: &str, source: &str) -> Result<AnalysisTemplateFile, LoadError> {
    serde_yaml::from_str(content).map_err(|e| LoadError::ParseYaml {
        path: source.to_string(),
        message: e.to_string(),
    })
}

/// Reads `analysis.yaml` under `dir`. A missing file is `Ok(None)`.
fn read_template_file(dir: &Path) -> Result<Option<(AnalysisTemplateFile, String)>, LoadError> {
    let path = dir.join(ANALYSIS_FILE);
    let source = path.display().to_string();
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(LoadError::ReadFile {
                path: source,
                message: e.to_string(),
            })
        }
    };
    let file = parse_template_file(&content, &source)?;
    Ok(Some((file, source)))
}

fn embedded_file() -> Result<AnalysisTemplateFile, LoadError> {
    parse_template_file(EMBED_ANALYSIS, EMBED_SOURCE)
}

/// Returns the template parsed from the embedded `analysis.yaml`.
pub fn default_from_embedded() -> Result<AnalysisTemplate, LoadError> {
    AnalysisTemplate::from_file(embedded_file()?, EMBED_SOURCE)
}

/// Loads the template from a prompts directory.
///
/// If `dir` is `None`, uses `TCR_PROMPTS_DIR` or `./prompts`. The directory must exist. A
/// missing `analysis.yaml` inside it yields the embedded template; a present file is overlaid on
/// the embedded one, so it may override only some sections.
pub fn load(dir: Option<&Path>) -> Result<AnalysisTemplate, LoadError> {
    let base = prompts_dir(dir);
    if !base.is_dir() {
        return Err(LoadError::DirNotFound(base.display().to_string()));
    }
    match read_template_file(&base)? {
        Some((file, source)) => {
            tracing::debug!(path = %source, "loaded analysis template override");
            AnalysisTemplate::from_file(embedded_file()?.overlay(file), &source)
        }
        None => default_from_embedded(),
    }
}

/// Like [`load`], but a missing prompts directory falls back to the embedded template.
/// Unreadable or invalid override files are still reported.
pub fn load_or_default(dir: Option<&Path>) -> Result<AnalysisTemplate, LoadError> {
    match load(dir) {
        Err(LoadError::DirNotFound(path)) => {
            if dir.is_some() {
                tracing::warn!(%path, "prompts directory not found, using embedded template");
            }
            default_from_embedded()
        }
        other => other,
    }
}
