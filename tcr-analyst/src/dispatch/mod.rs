//! Prompt dispatcher: maps an analysis mode to exactly one handler and renders its instructions.
//!
//! [`Dispatcher`] owns the template, output paths, and a name → [`PromptHandler`] map built once
//! by [`DispatcherBuilder::build`], which rejects duplicate names and unhandled modes. Every render
//! is a pure function of the request, the template, and the filesystem state it reads.
//!
//! ```rust,no_run
//! use tcr_analyst::{Dispatcher, OutputPaths};
//!
//! # fn main() -> Result<(), tcr_analyst::DispatchError> {
//! let dispatcher = Dispatcher::builder()
//!     .paths(OutputPaths::new("/data/analysis_data.txt", "/data/results.csv"))
//!     .with_default_handlers()
//!     .build()?;
//! let prompt = dispatcher.render_batch("/data/complexes", "*.pdb")?;
//! println!("{}", prompt.text());
//! # Ok(())
//! # }
//! ```

mod batch;
mod paths;
mod single;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::DispatchError;
use crate::prompts::{self, AnalysisTemplate, TemplateVars};

pub use batch::{discover_files, render_batch, BatchAnalysis};
pub use paths::{OutputPaths, DATA_FILE_ENV, OUTPUT_FILE_ENV};
pub use single::{pdb_id, render_single, SingleAnalysis};

/// Glob used by batch analysis when the request gives none.
pub const DEFAULT_PATTERN: &str = "*.pdb";
/// Env var overriding [`DEFAULT_PATTERN`].
pub const DEFAULT_PATTERN_ENV: &str = "TCR_DEFAULT_PATTERN";

/// Named arguments of one invocation (MCP `arguments` object).
pub type PromptArguments = Map<String, Value>;

/// Analysis modes the dispatcher must cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Single,
    Batch,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 2] = [AnalysisMode::Single, AnalysisMode::Batch];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisMode::Single => "single",
            AnalysisMode::Batch => "batch",
        }
    }

    /// Public operation name (`single_analysis`, `batch_analysis`).
    pub fn prompt_name(self) -> &'static str {
        match self {
            AnalysisMode::Single => "single_analysis",
            AnalysisMode::Batch => "batch_analysis",
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = DispatchError;

    /// Accepts the short mode (`single`) or the operation name (`single_analysis`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisMode::ALL
            .into_iter()
            .find(|m| s == m.as_str() || s == m.prompt_name())
            .ok_or_else(|| DispatchError::UnknownMode(s.to_string()))
    }
}

/// One invocation, already validated for shape (not for filesystem state).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisRequest {
    Single { path: PathBuf },
    Batch { folder: PathBuf, pattern: String },
}

impl AnalysisRequest {
    pub fn mode(&self) -> AnalysisMode {
        match self {
            AnalysisRequest::Single { .. } => AnalysisMode::Single,
            AnalysisRequest::Batch { .. } => AnalysisMode::Batch,
        }
    }

    /// Canonical argument object for this request (`path`, or `folder` + `pattern`).
    pub fn to_arguments(&self) -> PromptArguments {
        let mut args = Map::new();
        match self {
            AnalysisRequest::Single { path } => {
                args.insert("path".into(), Value::String(path.display().to_string()));
            }
            AnalysisRequest::Batch { folder, pattern } => {
                args.insert("folder".into(), Value::String(folder.display().to_string()));
                args.insert("pattern".into(), Value::String(pattern.clone()));
            }
        }
        args
    }
}

/// Declared argument of a prompt (MCP `PromptArgument`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArgumentSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
    /// Older argument names still accepted on input. Not advertised.
    #[serde(skip)]
    pub aliases: Vec<String>,
}

/// Name, description and arguments of one operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PromptSpec {
    pub name: String,
    pub description: String,
    pub arguments: Vec<ArgumentSpec>,
}

impl PromptSpec {
    /// JSON Schema object for the arguments, used when the prompt is also listed as a tool.
    pub fn input_schema(&self) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for arg in &self.arguments {
            properties.insert(
                arg.name.clone(),
                serde_json::json!({ "type": "string", "description": arg.description }),
            );
            if arg.required {
                required.push(Value::String(arg.name.clone()));
            }
        }
        let mut schema = Map::new();
        schema.insert("type".into(), Value::String("object".into()));
        schema.insert("properties".into(), Value::Object(properties));
        schema.insert("required".into(), Value::Array(required));
        schema
    }
}

/// Output of one render: description plus ordered text segments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderedPrompt {
    pub name: String,
    pub description: String,
    segments: Vec<String>,
}

impl RenderedPrompt {
    pub fn new(name: impl Into<String>, description: impl Into<String>, segments: Vec<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            segments,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Segments joined by a blank line, ending with a single newline.
    pub fn text(&self) -> String {
        let mut out = self
            .segments
            .iter()
            .map(|s| s.trim_end_matches('\n'))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        out.push('\n');
        out
    }
}

/// Shared inputs every handler renders against.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    pub template: &'a AnalysisTemplate,
    pub paths: &'a OutputPaths,
    pub default_pattern: &'a str,
}

impl RenderContext<'_> {
    /// Placeholder values for this context; `count` is set by batch rendering.
    pub fn vars(&self, count: Option<usize>) -> TemplateVars {
        TemplateVars {
            data_file: self.paths.data_file_display(),
            output_file: self.paths.output_file_display(),
            count,
        }
    }
}

/// One analysis operation.
///
/// Implementations parse their own arguments and render against the shared [`RenderContext`].
/// Registered with [`DispatcherBuilder::handler`]; looked up by [`PromptHandler::name`].
pub trait PromptHandler: Send + Sync {
    /// Mode this handler covers.
    fn mode(&self) -> AnalysisMode;

    /// Unique operation name. Defaults to the mode's prompt name.
    fn name(&self) -> &str {
        self.mode().prompt_name()
    }

    fn spec(&self) -> PromptSpec;

    /// Turns raw arguments into a request. Missing or non-string required arguments fail
    /// with [`DispatchError::InvalidArguments`].
    fn parse(
        &self,
        args: &PromptArguments,
        ctx: &RenderContext<'_>,
    ) -> Result<AnalysisRequest, DispatchError>;

    /// Validates the request against the filesystem and renders the instructions.
    fn render(
        &self,
        request: &AnalysisRequest,
        ctx: &RenderContext<'_>,
    ) -> Result<RenderedPrompt, DispatchError>;
}

/// Reads a string argument by canonical name or alias.
///
/// Absent and JSON `null` read as `None`; any other non-string value is rejected.
pub(crate) fn string_arg(
    args: &PromptArguments,
    spec: &ArgumentSpec,
) -> Result<Option<String>, DispatchError> {
    let names = std::iter::once(spec.name.as_str()).chain(spec.aliases.iter().map(String::as_str));
    for name in names {
        match args.get(name) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => return Ok(Some(s.clone())),
            Some(other) => {
                return Err(DispatchError::InvalidArguments(format!(
                    "{} must be a string, got {}",
                    spec.name, other
                )))
            }
        }
    }
    Ok(None)
}

pub(crate) fn required_arg(args: &PromptArguments, spec: &ArgumentSpec) -> Result<String, DispatchError> {
    string_arg(args, spec)?
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| DispatchError::InvalidArguments(format!("missing required argument: {}", spec.name)))
}

/// Builds a [`Dispatcher`]. Handlers are kept in registration order for listing.
pub struct DispatcherBuilder {
    handlers: Vec<Arc<dyn PromptHandler>>,
    template: Option<AnalysisTemplate>,
    paths: OutputPaths,
    default_pattern: String,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self {
            handlers: Vec::new(),
            template: None,
            paths: OutputPaths::default(),
            default_pattern: DEFAULT_PATTERN.to_string(),
        }
    }
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded from the environment: template from `prompts_dir` (or
    /// `TCR_PROMPTS_DIR`, falling back to the embedded copy), [`OutputPaths::from_env`], and
    /// `TCR_DEFAULT_PATTERN`. No handlers are registered yet.
    pub fn from_env(prompts_dir: Option<&Path>) -> Result<Self, DispatchError> {
        let template = prompts::load_or_default(prompts_dir)?;
        let default_pattern = env_config::env_string(DEFAULT_PATTERN_ENV)
            .unwrap_or_else(|| DEFAULT_PATTERN.to_string());
        Ok(Self::new()
            .template(template)
            .paths(OutputPaths::from_env())
            .default_pattern(default_pattern))
    }

    /// Template to render with; defaults to the embedded one.
    pub fn template(mut self, template: AnalysisTemplate) -> Self {
        self.template = Some(template);
        self
    }

    pub fn paths(mut self, paths: OutputPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Overrides only the data-bridge file.
    pub fn data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.data_file = path.into();
        self
    }

    pub fn output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.output_file = path.into();
        self
    }

    pub fn default_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.default_pattern = pattern.into();
        self
    }

    pub fn handler(mut self, handler: impl PromptHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Registers [`SingleAnalysis`] and [`BatchAnalysis`].
    pub fn with_default_handlers(self) -> Self {
        self.handler(SingleAnalysis).handler(BatchAnalysis)
    }

    /// Validates the handler map: each name once, every [`AnalysisMode`] covered.
    pub fn build(self) -> Result<Dispatcher, DispatchError> {
        let mut handlers: HashMap<String, Arc<dyn PromptHandler>> = HashMap::new();
        let mut order = Vec::with_capacity(self.handlers.len());
        for handler in self.handlers {
            let name = handler.name().to_string();
            if handlers.contains_key(&name) {
                return Err(DispatchError::DuplicateMode(name));
            }
            order.push(name.clone());
            handlers.insert(name, handler);
        }
        for mode in AnalysisMode::ALL {
            if !handlers.values().any(|h| h.mode() == mode) {
                return Err(DispatchError::MissingMode(mode.prompt_name().to_string()));
            }
        }
        let default_pattern = if self.default_pattern.trim().is_empty() {
            DEFAULT_PATTERN.to_string()
        } else {
            self.default_pattern
        };
        let template = match self.template {
            Some(t) => t,
            None => prompts::default_from_embedded()?,
        };
        Ok(Dispatcher {
            handlers,
            order,
            template,
            paths: self.paths,
            default_pattern,
        })
    }
}

/// Immutable after construction; `Send + Sync`, so one instance serves all callers.
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn PromptHandler>>,
    order: Vec<String>,
    template: AnalysisTemplate,
    paths: OutputPaths,
    default_pattern: String,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.order)
            .field("template_version", &self.template.version)
            .field("paths", &self.paths)
            .field("default_pattern", &self.default_pattern)
            .finish()
    }
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Default handlers with the given template and paths.
    pub fn new(template: AnalysisTemplate, paths: OutputPaths) -> Result<Self, DispatchError> {
        Self::builder()
            .template(template)
            .paths(paths)
            .with_default_handlers()
            .build()
    }

    /// Default handlers on top of [`DispatcherBuilder::from_env`].
    pub fn from_env(prompts_dir: Option<&Path>) -> Result<Self, DispatchError> {
        DispatcherBuilder::from_env(prompts_dir)?
            .with_default_handlers()
            .build()
    }

    pub fn template(&self) -> &AnalysisTemplate {
        &self.template
    }

    pub fn paths(&self) -> &OutputPaths {
        &self.paths
    }

    pub fn default_pattern(&self) -> &str {
        &self.default_pattern
    }

    fn context(&self) -> RenderContext<'_> {
        RenderContext {
            template: &self.template,
            paths: &self.paths,
            default_pattern: &self.default_pattern,
        }
    }

    /// Specs of all handlers in registration order.
    pub fn list(&self) -> Vec<PromptSpec> {
        self.order
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|h| h.spec())
            .collect()
    }

    fn handler(&self, name: &str) -> Result<&Arc<dyn PromptHandler>, DispatchError> {
        if let Some(h) = self.handlers.get(name) {
            return Ok(h);
        }
        // Short mode names (`single`, `batch`) resolve to the handler covering that mode.
        let mode: AnalysisMode = name.parse()?;
        self.handlers
            .values()
            .find(|h| h.mode() == mode)
            .ok_or_else(|| DispatchError::UnknownMode(name.to_string()))
    }

    /// Renders the operation `name` with raw arguments. Unknown names fail with
    /// [`DispatchError::UnknownMode`].
    pub fn dispatch(&self, name: &str, args: &PromptArguments) -> Result<RenderedPrompt, DispatchError> {
        let handler = self.handler(name)?;
        let ctx = self.context();
        let request = handler.parse(args, &ctx)?;
        tracing::debug!(prompt = handler.name(), ?request, "rendering");
        handler.render(&request, &ctx)
    }

    /// Renders a typed request through the handler registered for its mode.
    pub fn render(&self, request: &AnalysisRequest) -> Result<RenderedPrompt, DispatchError> {
        let handler = self.handler(request.mode().prompt_name())?;
        handler.render(request, &self.context())
    }

    pub fn render_single(&self, path: impl Into<PathBuf>) -> Result<RenderedPrompt, DispatchError> {
        self.render(&AnalysisRequest::Single { path: path.into() })
    }

    pub fn render_batch(
        &self,
        folder: impl Into<PathBuf>,
        pattern: impl Into<String>,
    ) -> Result<RenderedPrompt, DispatchError> {
        self.render(&AnalysisRequest::Batch {
            folder: folder.into(),
            pattern: pattern.into(),
        })
    }
}
