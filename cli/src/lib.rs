//! Library side of the `tcr-analyst` binary: dispatcher setup from flags and the stdout writers.
//!
//! `main.rs` keeps argument parsing and process exit handling; everything here writes to a
//! caller-supplied [`Write`] so it can be tested without a terminal.

use std::io::Write;
use std::path::PathBuf;

use tcr_analyst::{DispatchError, Dispatcher, DispatcherBuilder, PromptSpec, RenderedPrompt, ServeError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Serve(#[from] ServeError),
    #[error("write output: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Flag values that shape the dispatcher. `None` or blank means "use the environment".
#[derive(Clone, Debug, Default)]
pub struct DispatcherOptions {
    pub prompts_dir: Option<PathBuf>,
    pub data_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
}

fn non_blank(p: &Option<PathBuf>) -> Option<PathBuf> {
    p.clone().filter(|p| !p.as_os_str().is_empty())
}

/// [`DispatcherBuilder::from_env`] with the flags applied on top.
pub fn build_dispatcher(opts: &DispatcherOptions) -> Result<Dispatcher, DispatchError> {
    let prompts_dir = non_blank(&opts.prompts_dir);
    let mut builder = DispatcherBuilder::from_env(prompts_dir.as_deref())?;
    if let Some(p) = non_blank(&opts.data_file) {
        builder = builder.data_file(p);
    }
    if let Some(p) = non_blank(&opts.output_file) {
        builder = builder.output_file(p);
    }
    builder.with_default_handlers().build()
}

/// The `--pattern` value, or the dispatcher's default when absent or blank.
pub fn batch_pattern(dispatcher: &Dispatcher, pattern: Option<String>) -> String {
    pattern
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| dispatcher.default_pattern().to_string())
}

/// Plain text, or one JSON line `{description, text}`.
pub fn write_prompt<W: Write>(out: &mut W, prompt: &RenderedPrompt, json: bool) -> Result<(), CliError> {
    if json {
        let value = serde_json::json!({
            "description": prompt.description,
            "text": prompt.text(),
        });
        writeln!(out, "{}", serde_json::to_string(&value)?)?;
    } else {
        out.write_all(prompt.text().as_bytes())?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_prompt_list<W: Write>(out: &mut W, specs: &[PromptSpec], json: bool) -> Result<(), CliError> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(specs)?)?;
    } else {
        for spec in specs {
            writeln!(out, "{}\t{}", spec.name, spec.description)?;
            for arg in &spec.arguments {
                let required = if arg.required { "required" } else { "optional" };
                writeln!(out, "  {} ({}): {}", arg.name, required, arg.description)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}
