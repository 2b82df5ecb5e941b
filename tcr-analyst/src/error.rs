//! Dispatch errors: validation failures, unknown prompts, and dispatcher construction errors.
//!
//! A failed request never yields partial prompt text; the error is the whole answer.

use crate::prompts::LoadError;

/// JSON-RPC error code for invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC error code for internal server errors.
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Supplied structure file or folder does not exist.
    #[error("path does not exist: {path}")]
    NotFound { path: String },
    /// Folder exists but nothing in it matches the pattern.
    #[error("no matching files found: {pattern} in {folder}")]
    NoMatch { folder: String, pattern: String },
    #[error("unknown analysis type: {0}")]
    UnknownMode(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("analysis type registered twice: {0}")]
    DuplicateMode(String),
    #[error("no handler registered for analysis type: {0}")]
    MissingMode(String),
    #[error("template: {0}")]
    Template(#[from] LoadError),
    #[error("resolve {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl DispatchError {
    /// JSON-RPC error code used when this error answers a protocol request.
    pub fn rpc_code(&self) -> i64 {
        match self {
            DispatchError::NotFound { .. }
            | DispatchError::NoMatch { .. }
            | DispatchError::UnknownMode(_)
            | DispatchError::InvalidArguments(_) => INVALID_PARAMS,
            DispatchError::DuplicateMode(_)
            | DispatchError::MissingMode(_)
            | DispatchError::Template(_)
            | DispatchError::Io { .. } => INTERNAL_ERROR,
        }
    }

    /// True for errors caused by the caller's input rather than the server.
    pub fn is_validation(&self) -> bool {
        self.rpc_code() == INVALID_PARAMS
    }
}
