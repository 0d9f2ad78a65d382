//! Guide template documents
//!
//! A template is `{"title": "...", "steps": ["...", ...]}`. Missing
//! fields default to empty.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::list::StepList;

/// A persisted guide
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub steps: Vec<String>,
}

/// Errors from reading, writing or building templates
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse template {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("failed to serialize template: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write template {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("no steps to save")]
    NoSteps,

    #[error("template name is empty")]
    EmptyName,
}

impl TemplateError {
    /// True when the file simply does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, TemplateError::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Read a template document from disk
pub fn read(path: &Path) -> Result<TemplateDocument, TemplateError> {
    let contents = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| TemplateError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Write a template document as pretty JSON
pub fn write(path: &Path, document: &TemplateDocument) -> Result<(), TemplateError> {
    let json = serde_json::to_string_pretty(document)?;
    std::fs::write(path, json).map_err(|source| TemplateError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Title used when saving to `path`: the file stem
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name for a newly created template, e.g. `Any Percent` ->
/// `any_percent_template.json`
pub fn template_file_name(name: &str) -> String {
    format!("{}_template.json", name.trim().replace(' ', "_").to_lowercase())
}

/// Split free text into steps, one per non-blank line
pub fn parse_steps(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build a new template from a name and free-text steps
pub fn new_template(name: &str, steps_text: &str) -> Result<TemplateDocument, TemplateError> {
    let title = name.trim();
    if title.is_empty() {
        return Err(TemplateError::EmptyName);
    }
    let steps = parse_steps(steps_text);
    if steps.is_empty() {
        return Err(TemplateError::NoSteps);
    }
    Ok(TemplateDocument {
        title: title.to_string(),
        steps,
    })
}

/// Load the guide shown at startup
///
/// Tries `primary`, then `fallback`. When neither exists the sample guide
/// is generated and written to `fallback`. A file that exists but cannot
/// be parsed is left untouched and the sample is used in memory.
pub fn load_startup_guide(primary: &Path, fallback: &Path) -> (StepList, Option<PathBuf>) {
    for path in [primary, fallback] {
        match read(path) {
            Ok(document) => {
                info!(?path, steps = document.steps.len(), "guide loaded");
                let mut steps = StepList::default();
                steps.load(document);
                return (steps, Some(path.to_path_buf()));
            }
            Err(e) if e.is_not_found() => continue,
            Err(e) => {
                warn!(error = %e, "failed to load guide, using sample guide");
                return (StepList::sample(), None);
            }
        }
    }

    let sample = StepList::sample();
    let document = sample.to_document(sample.title());
    match write(fallback, &document) {
        Ok(()) => info!(path = ?fallback, "sample guide created"),
        Err(e) => warn!(error = %e, "failed to write sample guide"),
    }
    (sample, Some(fallback.to_path_buf()))
}
