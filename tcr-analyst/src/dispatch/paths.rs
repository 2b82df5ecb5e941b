//! Where the downstream agent is told to stage results.
//!
//! These paths only appear in rendered text; nothing here creates or writes them.

use std::path::{Path, PathBuf};

/// Env var for the data-bridge file.
pub const DATA_FILE_ENV: &str = "TCR_DATA_FILE";
/// Env var for the final CSV file.
pub const OUTPUT_FILE_ENV: &str = "TCR_OUTPUT_FILE";

const DEFAULT_SUBDIR: &str = "tcr-analyst";
const DEFAULT_DATA_FILE: &str = "analysis_data.txt";
const DEFAULT_OUTPUT_FILE: &str = "tcr_pmhc_analysis_results.csv";

/// Data-bridge file and CSV output file named in the instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    pub data_file: PathBuf,
    pub output_file: PathBuf,
}

impl Default for OutputPaths {
    /// `<temp dir>/tcr-analyst/analysis_data.txt` and `<temp dir>/tcr-analyst/tcr_pmhc_analysis_results.csv`.
    fn default() -> Self {
        let base = std::env::temp_dir().join(DEFAULT_SUBDIR);
        Self {
            data_file: base.join(DEFAULT_DATA_FILE),
            output_file: base.join(DEFAULT_OUTPUT_FILE),
        }
    }
}

impl OutputPaths {
    pub fn new(data_file: impl Into<PathBuf>, output_file: impl Into<PathBuf>) -> Self {
        Self {
            data_file: data_file.into(),
            output_file: output_file.into(),
        }
    }

    /// `TCR_DATA_FILE` / `TCR_OUTPUT_FILE`, each falling back to [`Default`] when unset or blank.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            data_file: env_config::env_path(DATA_FILE_ENV).unwrap_or(default.data_file),
            output_file: env_config::env_path(OUTPUT_FILE_ENV).unwrap_or(default.output_file),
        }
    }

    /// Data file as written into prompts (forward slashes).
    pub fn data_file_display(&self) -> String {
        prompt_path(&self.data_file)
    }

    /// Output file as written into prompts (forward slashes).
    pub fn output_file_display(&self) -> String {
        prompt_path(&self.output_file)
    }
}

/// Forward slashes keep the embedded Python `open('...')` snippets valid on Windows.
pub(crate) fn prompt_path(p: &Path) -> String {
    p.to_string_lossy().replace('\\', "/")
}
