//! # tcr-analyst
//!
//! Serves instruction prompts for TCR-pMHC structure analysis to an AI agent over MCP. Given a
//! structure file or a folder of them, the server validates the paths, lists the files, and
//! renders a fixed analysis protocol the agent then carries out. No structure is parsed here.
//!
//! ## Main modules
//!
//! - [`dispatch`]: [`Dispatcher`], [`PromptHandler`], [`SingleAnalysis`], [`BatchAnalysis`],
//!   [`OutputPaths`]: map an operation name to its handler and render the instructions.
//! - [`prompts`]: [`AnalysisTemplate`] and its YAML loader (embedded default, directory override).
//! - [`server`]: [`McpServer`], an `rmcp` server handler, with [`serve`] and [`run_stdio`].
//! - [`error`]: [`DispatchError`] and its JSON-RPC codes.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tcr_analyst::{run_stdio, Dispatcher, McpServer};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let server = McpServer::new(Dispatcher::from_env(None)?);
//! run_stdio(server).await?;
//! # Ok(())
//! # }
//! ```

pub mod dispatch;
pub mod error;
pub mod prompts;
pub mod server;

pub use dispatch::{
    discover_files, pdb_id, AnalysisMode, AnalysisRequest, ArgumentSpec, BatchAnalysis,
    Dispatcher, DispatcherBuilder, OutputPaths, PromptArguments, PromptHandler, PromptSpec,
    RenderContext, RenderedPrompt, SingleAnalysis, DEFAULT_PATTERN, DEFAULT_PATTERN_ENV,
};
pub use error::DispatchError;
pub use prompts::{AnalysisTemplate, LoadError, PROMPTS_DIR_ENV};
pub use server::{run_stdio, serve, LineLimit, McpServer, ServeError, MAX_MESSAGE_BYTES};
