//! tcr-analyst binary: serve the analysis prompts over MCP stdio, or render one to stdout.
//!
//! Subcommands: `serve` (default), `single`, `batch`, `prompts`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cli::{batch_pattern, build_dispatcher, write_prompt, write_prompt_list, CliError, DispatcherOptions};
use tcr_analyst::{run_stdio, McpServer};

#[derive(Parser, Debug)]
#[command(name = "tcr-analyst")]
#[command(version)]
#[command(about = "TCR-pMHC structure analysis prompts: MCP stdio server and renderer")]
struct Args {
    #[command(subcommand)]
    cmd: Option<Command>,

    /// Data-bridge file named in the instructions (default: <temp>/tcr-analyst/analysis_data.txt)
    #[arg(long, value_name = "PATH", env = "TCR_DATA_FILE", global = true)]
    data_file: Option<PathBuf>,

    /// CSV results file named in the instructions (default: <temp>/tcr-analyst/tcr_pmhc_analysis_results.csv)
    #[arg(long, value_name = "PATH", env = "TCR_OUTPUT_FILE", global = true)]
    output_file: Option<PathBuf>,

    /// Directory holding an analysis.yaml override (default: ./prompts, else embedded)
    #[arg(long, value_name = "DIR", env = "TCR_PROMPTS_DIR", global = true)]
    prompts_dir: Option<PathBuf>,

    /// Append logs to this file
    #[arg(long, value_name = "PATH", env = "LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Verbose: log to stderr at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output JSON (`{description, text}` for renders, spec array for `prompts`)
    #[arg(long, global = true)]
    json: bool,
}

impl Args {
    fn dispatcher_options(&self) -> DispatcherOptions {
        DispatcherOptions {
            prompts_dir: self.prompts_dir.clone(),
            data_file: self.data_file.clone(),
            output_file: self.output_file.clone(),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Serve single_analysis and batch_analysis over MCP on stdin/stdout
    Serve,
    /// Render the single-file analysis instructions
    Single {
        /// Structure file (PDB format)
        path: PathBuf,
    },
    /// Render the batch analysis instructions for a folder
    Batch {
        /// Folder containing structure files
        folder: PathBuf,
        /// Glob relative to the folder (default *.pdb or TCR_DEFAULT_PATTERN)
        #[arg(short, long, value_name = "GLOB")]
        pattern: Option<String>,
    },
    /// List the available prompts and their arguments
    Prompts,
}

async fn run(args: &Args) -> Result<(), CliError> {
    let dispatcher = build_dispatcher(&args.dispatcher_options())?;
    tracing::debug!(?dispatcher, "dispatcher ready");

    match args.cmd.clone().unwrap_or(Command::Serve) {
        Command::Serve => run_stdio(McpServer::new(dispatcher)).await?,
        Command::Single { path } => {
            let prompt = dispatcher.render_single(path)?;
            write_prompt(&mut std::io::stdout().lock(), &prompt, args.json)?;
        }
        Command::Batch { folder, pattern } => {
            let pattern = batch_pattern(&dispatcher, pattern);
            let prompt = dispatcher.render_batch(folder, pattern)?;
            write_prompt(&mut std::io::stdout().lock(), &prompt, args.json)?;
        }
        Command::Prompts => {
            write_prompt_list(&mut std::io::stdout().lock(), &dispatcher.list(), args.json)?
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let loaded = config::load_and_apply(config::APP_NAME, None);
    let args = Args::parse();

    let guard = config::init_tracing(&config::TracingOptions {
        verbose: args.verbose,
        log_file: args.log_file.clone().filter(|p| !p.as_os_str().is_empty()),
    })?;
    if let Err(e) = loaded {
        tracing::warn!(error = %e, "config not loaded, using process environment only");
    }

    if let Err(e) = run(&args).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("tcr-analyst: {}", e);
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}
