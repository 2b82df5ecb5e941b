//! Analysis instruction template: the versioned text handed to the downstream agent.
//!
//! The text is data, not logic. [`load`] reads it from YAML; rendering only expands the
//! `{{data_file}}`, `{{output_file}}` and `{{count}}` placeholders via [`TemplateVars`].

mod load;

use serde::Deserialize;

pub use load::{default_from_embedded, load, load_or_default, LoadError, PROMPTS_DIR_ENV};

/// Server name reported when the template does not set one.
pub const DEFAULT_SERVER_NAME: &str = "enhanced-tcr-analyzer";

/// On-disk shape of `analysis.yaml`. Every field is optional so an override file can
/// replace a single section and keep the rest from the embedded copy.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AnalysisTemplateFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub single_plan: Option<String>,
    #[serde(default)]
    pub single_reminders: Option<String>,
    #[serde(default)]
    pub batch_plan: Option<String>,
    #[serde(default)]
    pub batch_requirements: Option<String>,
}

impl AnalysisTemplateFile {
    /// Fields set in `other` replace fields in `self`.
    pub fn overlay(self, other: AnalysisTemplateFile) -> AnalysisTemplateFile {
        AnalysisTemplateFile {
            version: other.version.or(self.version),
            server_name: other.server_name.or(self.server_name),
            title: other.title.or(self.title),
            system_prompt: other.system_prompt.or(self.system_prompt),
            single_plan: other.single_plan.or(self.single_plan),
            single_reminders: other.single_reminders.or(self.single_reminders),
            batch_plan: other.batch_plan.or(self.batch_plan),
            batch_requirements: other.batch_requirements.or(self.batch_requirements),
        }
    }
}

/// Resolved template. Immutable once built; shared by every render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisTemplate {
    pub version: String,
    pub server_name: String,
    pub title: String,
    pub system_prompt: String,
    pub single_plan: String,
    pub single_reminders: String,
    pub batch_plan: String,
    pub batch_requirements: String,
}

impl AnalysisTemplate {
    /// Builds the template from a parsed file. `system_prompt` is required; `source` names the
    /// file in the error.
    pub fn from_file(file: AnalysisTemplateFile, source: &str) -> Result<Self, LoadError> {
        let system_prompt = file
            .system_prompt
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| LoadError::MissingField {
                path: source.to_string(),
                field: "system_prompt",
            })?;
        Ok(Self {
            version: file.version.unwrap_or_else(|| "unversioned".to_string()),
            server_name: file
                .server_name
                .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string()),
            title: file.title.unwrap_or_default(),
            system_prompt,
            single_plan: file.single_plan.unwrap_or_default(),
            single_reminders: file.single_reminders.unwrap_or_default(),
            batch_plan: file.batch_plan.unwrap_or_default(),
            batch_requirements: file.batch_requirements.unwrap_or_default(),
        })
    }

    /// One-line summary used as MCP `instructions`.
    pub fn instructions(&self) -> String {
        let title = if self.title.is_empty() {
            self.server_name.as_str()
        } else {
            self.title.as_str()
        };
        format!(
            "{} (template v{}). Use single_analysis for one structure file or batch_analysis for a folder.",
            title, self.version
        )
    }
}

/// Values substituted into template sections.
#[derive(Clone, Debug, Default)]
pub struct TemplateVars {
    pub data_file: String,
    pub output_file: String,
    pub count: Option<usize>,
}

impl TemplateVars {
    /// Replaces known `{{name}}` placeholders. Unknown `{{...}}` and single braces stay as-is.
    pub fn expand(&self, text: &str) -> String {
        let mut out = text
            .replace("{{data_file}}", &self.data_file)
            .replace("{{output_file}}", &self.output_file);
        if let Some(count) = self.count {
            out = out.replace("{{count}}", &count.to_string());
        }
        out
    }
}
