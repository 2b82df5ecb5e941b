//! `single_analysis`: instructions for one structure file.

use std::path::Path;

use super::{
    paths::prompt_path, required_arg, AnalysisMode, AnalysisRequest, ArgumentSpec, PromptArguments,
    PromptHandler, PromptSpec, RenderContext, RenderedPrompt,
};
use crate::error::DispatchError;

fn path_argument() -> ArgumentSpec {
    ArgumentSpec {
        name: "path".to_string(),
        description: "Path to the TCR-pMHC structure file (PDB format)".to_string(),
        required: true,
        aliases: vec!["pdb_file_path".to_string()],
    }
}

/// Upper-cased file stem, e.g. `/data/1ao7.pdb` → `1AO7`.
pub fn pdb_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_default()
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Renders the single-file instructions. Fails with [`DispatchError::NotFound`] when `path`
/// does not exist; the file content is not inspected.
pub fn render_single(path: &Path, ctx: &RenderContext<'_>) -> Result<RenderedPrompt, DispatchError> {
    if !path.exists() {
        return Err(DispatchError::NotFound {
            path: path.display().to_string(),
        });
    }
    let absolute = std::path::absolute(path).map_err(|source| DispatchError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let id = pdb_id(path);
    let vars = ctx.vars(None);
    let template = ctx.template;

    let header = format!(
        "## Single File Analysis Task\n\n\
         **Target**: {}\n\
         **Path**: {}\n\
         **PDB ID**: {}\n\
         **Data Collection File**: {}\n",
        basename(path),
        prompt_path(&absolute),
        id,
        vars.data_file,
    );

    tracing::info!(pdb_id = %id, path = %absolute.display(), "rendered single analysis");
    Ok(RenderedPrompt::new(
        AnalysisMode::Single.prompt_name(),
        format!("Enhanced single file analysis - {} with biological validation", id),
        vec![
            vars.expand(&template.system_prompt),
            header,
            vars.expand(&template.single_plan),
            vars.expand(&template.single_reminders),
        ],
    ))
}

/// Handler for [`AnalysisMode::Single`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleAnalysis;

impl PromptHandler for SingleAnalysis {
    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Single
    }

    fn spec(&self) -> PromptSpec {
        PromptSpec {
            name: self.name().to_string(),
            description: "Single TCR-pMHC complex structure analysis".to_string(),
            arguments: vec![path_argument()],
        }
    }

    fn parse(
        &self,
        args: &PromptArguments,
        _ctx: &RenderContext<'_>,
    ) -> Result<AnalysisRequest, DispatchError> {
        let path = required_arg(args, &path_argument())?;
        Ok(AnalysisRequest::Single { path: path.into() })
    }

    fn render(
        &self,
        request: &AnalysisRequest,
        ctx: &RenderContext<'_>,
    ) -> Result<RenderedPrompt, DispatchError> {
        match request {
            AnalysisRequest::Single { path } => render_single(path, ctx),
            other => Err(DispatchError::InvalidArguments(format!(
                "{} cannot render a {} request",
                self.name(),
                other.mode()
            ))),
        }
    }
}
