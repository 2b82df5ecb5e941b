//! `batch_analysis`: instructions for every structure file in a folder matching a glob.

use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};

use super::{
    required_arg, string_arg, AnalysisMode, AnalysisRequest, ArgumentSpec, PromptArguments,
    PromptHandler, PromptSpec, RenderContext, RenderedPrompt,
};
use crate::error::DispatchError;

fn folder_argument() -> ArgumentSpec {
    ArgumentSpec {
        name: "folder".to_string(),
        description: "Folder containing TCR-pMHC structure files".to_string(),
        required: true,
        aliases: vec!["folder_path".to_string()],
    }
}

fn pattern_argument() -> ArgumentSpec {
    ArgumentSpec {
        name: "pattern".to_string(),
        description: "Glob pattern for structure files inside the folder (default *.pdb)".to_string(),
        required: false,
        aliases: vec!["file_pattern".to_string()],
    }
}

/// `*` and `?` stop at `/`, and hidden files need an explicit leading dot, as in shell globbing.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Lists regular files under `folder` matching `pattern`, sorted by path.
///
/// The pattern is relative to `folder` and may name subdirectories (`chains/*.pdb`). Entries
/// that cannot be read are skipped. Absolute patterns and `..` components are rejected, so
/// matches never leave `folder`. Does not check that `folder` exists.
pub fn discover_files(folder: &Path, pattern: &str) -> Result<Vec<PathBuf>, DispatchError> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(DispatchError::InvalidArguments(
            "pattern must be non-empty".to_string(),
        ));
    }
    let relative = Path::new(pattern);
    let escapes = relative.has_root()
        || relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
    if escapes {
        return Err(DispatchError::InvalidArguments(format!(
            "pattern must stay inside the folder: {}",
            pattern
        )));
    }
    let root = Pattern::escape(&folder.to_string_lossy());
    let full = if root.is_empty() || root.ends_with('/') {
        format!("{}{}", root, pattern)
    } else {
        format!("{}/{}", root, pattern)
    };
    let entries = glob::glob_with(&full, MATCH_OPTIONS).map_err(|e| {
        DispatchError::InvalidArguments(format!("invalid glob pattern {}: {}", pattern, e))
    })?;

    let mut matched: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|p| p.is_file())
        .collect();
    matched.sort();
    matched.dedup();
    Ok(matched)
}

fn list_entry(index: usize, path: &Path) -> String {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    format!("  {}. {}", index + 1, name)
}

/// Renders the batch instructions.
///
/// Checks, in order: `folder` exists ([`DispatchError::NotFound`]), `pattern` is a valid glob
/// ([`DispatchError::InvalidArguments`]), at least one file matches ([`DispatchError::NoMatch`]).
/// Surrounding whitespace in `pattern` is ignored everywhere, including the header.
pub fn render_batch(
    folder: &Path,
    pattern: &str,
    ctx: &RenderContext<'_>,
) -> Result<RenderedPrompt, DispatchError> {
    let pattern = pattern.trim();
    if !folder.exists() {
        return Err(DispatchError::NotFound {
            path: folder.display().to_string(),
        });
    }
    let files = discover_files(folder, pattern)?;
    if files.is_empty() {
        return Err(DispatchError::NoMatch {
            folder: folder.display().to_string(),
            pattern: pattern.to_string(),
        });
    }

    let count = files.len();
    let vars = ctx.vars(Some(count));
    let template = ctx.template;

    let header = format!(
        "## Batch Analysis Task\n\n\
         **Target**: {} ({} files)\n\
         **Pattern**: {}\n\
         **Data Collection File**: {}\n",
        folder.display(),
        count,
        pattern,
        vars.data_file,
    );
    let list = std::iter::once("### File List".to_string())
        .chain(files.iter().enumerate().map(|(i, p)| list_entry(i, p)))
        .collect::<Vec<_>>()
        .join("\n");

    tracing::info!(folder = %folder.display(), pattern, count, "rendered batch analysis");
    Ok(RenderedPrompt::new(
        AnalysisMode::Batch.prompt_name(),
        format!(
            "Enhanced batch analysis - {} files from {}",
            count,
            folder.display()
        ),
        vec![
            vars.expand(&template.system_prompt),
            header,
            list,
            vars.expand(&template.batch_plan),
            vars.expand(&template.batch_requirements),
        ],
    ))
}

/// Handler for [`AnalysisMode::Batch`].
#[derive(Clone, Copy, Debug, Default)]
pub struct BatchAnalysis;

impl PromptHandler for BatchAnalysis {
    fn mode(&self) -> AnalysisMode {
        AnalysisMode::Batch
    }

    fn spec(&self) -> PromptSpec {
        PromptSpec {
            name: self.name().to_string(),
            description: "Batch TCR-pMHC complex structure analysis".to_string(),
            arguments: vec![folder_argument(), pattern_argument()],
        }
    }

    fn parse(
        &self,
        args: &PromptArguments,
        ctx: &RenderContext<'_>,
    ) -> Result<AnalysisRequest, DispatchError> {
        let folder = required_arg(args, &folder_argument())?;
        let pattern = string_arg(args, &pattern_argument())?
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| ctx.default_pattern.to_string());
        Ok(AnalysisRequest::Batch {
            folder: folder.into(),
            pattern,
        })
    }

    fn render(
        &self,
        request: &AnalysisRequest,
        ctx: &RenderContext<'_>,
    ) -> Result<RenderedPrompt, DispatchError> {
        match request {
            AnalysisRequest::Batch { folder, pattern } => render_batch(folder, pattern, ctx),
            other => Err(DispatchError::InvalidArguments(format!(
                "{} cannot render a {} request",
                self.name(),
                other.mode()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::OutputPaths;
    use crate::prompts::{default_from_embedded, AnalysisTemplate};
    use serde_json::json;

    fn touch(dir: &Path, name: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "ATOM\n").unwrap();
    }

    fn with_ctx<T>(f: impl FnOnce(&RenderContext<'_>) -> T) -> T {
        let template: AnalysisTemplate = default_from_embedded().unwrap();
        let paths = OutputPaths::new("/lab/bridge.txt", "/lab/out.csv");
        let ctx = RenderContext {
            template: &template,
            paths: &paths,
            default_pattern: "*.pdb",
        };
        f(&ctx)
    }

    #[test]
    fn discover_sorts_and_filters_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["2XYZ.pdb", "1ABC.pdb", "notes.txt", ".hidden.pdb"] {
            touch(dir.path(), name);
        }
        std::fs::create_dir(dir.path().join("dir.pdb")).unwrap();

        let files = discover_files(dir.path(), "*.pdb").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1ABC.pdb", "2XYZ.pdb"]);
    }

    #[test]
    fn discover_does_not_cross_directories_with_star() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "top.pdb");
        touch(dir.path(), "chains/inner.pdb");
        assert_eq!(discover_files(dir.path(), "*.pdb").unwrap().len(), 1);
        assert_eq!(discover_files(dir.path(), "chains/*.pdb").unwrap().len(), 1);
        assert_eq!(discover_files(dir.path(), "**/*.pdb").unwrap().len(), 2);
    }

    #[test]
    fn discover_escapes_folder_metacharacters() {
        let dir = tempfile::tempdir().unwrap();
        let odd = dir.path().join("run [1]");
        touch(&odd, "1ABC.pdb");
        assert_eq!(discover_files(&odd, "*.pdb").unwrap().len(), 1);
    }

    #[test]
    fn discover_rejects_invalid_and_empty_patterns() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_files(dir.path(), "[unclosed"),
            Err(DispatchError::InvalidArguments(_))
        ));
        assert!(matches!(
            discover_files(dir.path(), "  "),
            Err(DispatchError::InvalidArguments(_))
        ));
    }

    #[test]
    fn discover_rejects_patterns_leaving_the_folder() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("complexes");
        touch(&inner, "1ABC.pdb");
        touch(dir.path(), "outside.pdb");
        for pattern in ["../*.pdb", "chains/../../*.pdb", "/etc/*"] {
            let err = discover_files(&inner, pattern).unwrap_err();
            assert!(
                matches!(err, DispatchError::InvalidArguments(ref m) if m.contains("inside the folder")),
                "{} was accepted",
                pattern
            );
        }
        // Dots inside a name are not a parent component.
        touch(&inner, "..2XYZ.pdb");
        assert_eq!(discover_files(&inner, "..*.pdb").unwrap().len(), 1);
    }

    #[test]
    fn render_batch_reports_trimmed_pattern() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "1ABC.pdb");
        let p = with_ctx(|ctx| render_batch(dir.path(), "  *.pdb \t", ctx)).unwrap();
        assert!(p.text().contains("**Pattern**: *.pdb\n"));

        let err = with_ctx(|ctx| render_batch(dir.path(), " *.cif ", ctx)).unwrap_err();
        assert!(matches!(err, DispatchError::NoMatch { ref pattern, .. } if pattern == "*.cif"));
    }

    #[test]
    fn render_batch_numbers_files_and_states_count() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "2XYZ.pdb");
        touch(dir.path(), "1ABC.pdb");

        let p = with_ctx(|ctx| render_batch(dir.path(), "*.pdb", ctx)).unwrap();
        let text = p.text();
        assert!(text.contains("### File List\n  1. 1ABC.pdb\n  2. 2XYZ.pdb"));
        assert!(text.contains(&format!("**Target**: {} (2 files)", dir.path().display())));
        assert!(text.contains("**Pattern**: *.pdb"));
        assert!(text.contains("(X/2 completed)"));
        assert!(text.trim_end().ends_with("Start enhanced batch processing!"));
        assert!(p.description.starts_with("Enhanced batch analysis - 2 files"));
    }

    #[test]
    fn render_batch_missing_folder_is_not_found() {
        let err = with_ctx(|ctx| render_batch(Path::new("/nonexistent_tcr_folder_987"), "*.pdb", ctx))
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound { ref path } if path.contains("nonexistent_tcr_folder_987")));
    }

    #[test]
    fn render_batch_without_matches_is_no_match() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "1ABC.cif");
        let err = with_ctx(|ctx| render_batch(dir.path(), "*.pdb", ctx)).unwrap_err();
        assert!(matches!(err, DispatchError::NoMatch { ref pattern, .. } if pattern == "*.pdb"));
    }

    #[test]
    fn parse_defaults_pattern_and_accepts_legacy_names() {
        with_ctx(|ctx| {
            let req = BatchAnalysis
                .parse(json!({ "folder": "/data" }).as_object().unwrap(), ctx)
                .unwrap();
            assert_eq!(
                req,
                AnalysisRequest::Batch {
                    folder: "/data".into(),
                    pattern: "*.pdb".into()
                }
            );
            let req = BatchAnalysis
                .parse(
                    json!({ "folder_path": "/data", "file_pattern": "*.cif" })
                        .as_object()
                        .unwrap(),
                    ctx,
                )
                .unwrap();
            assert_eq!(
                req,
                AnalysisRequest::Batch {
                    folder: "/data".into(),
                    pattern: "*.cif".into()
                }
            );
        });
    }

    #[test]
    fn batch_handler_refuses_single_request() {
        let err = with_ctx(|ctx| {
            BatchAnalysis.render(
                &AnalysisRequest::Single {
                    path: "/data/1ABC.pdb".into(),
                },
                ctx,
            )
        })
        .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArguments(_)));
    }
}
