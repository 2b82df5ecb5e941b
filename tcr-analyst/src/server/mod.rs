//! MCP server on `rmcp`.
//!
//! [`McpServer`] implements [`ServerHandler`]: both analysis operations are listed as prompts
//! and as tools, and every call goes through [`Dispatcher::dispatch`]. [`serve`] runs it over any
//! async byte stream, [`run_stdio`] over the process's stdio.
//!
//! **Public API**: [`McpServer`], [`serve`], [`run_stdio`], [`ServeError`], [`LineLimit`].

mod limit;

use std::sync::Arc;

use rmcp::{
    model::*, service::RequestContext, ErrorData as McpError, RoleServer, ServerHandler,
    ServiceExt,
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::dispatch::{Dispatcher, PromptArguments, PromptSpec};
use crate::error::DispatchError;

pub use limit::{LineLimit, MAX_MESSAGE_BYTES};

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("mcp initialize: {0}")]
    Initialize(String),
    #[error("mcp session: {0}")]
    Session(String),
}

/// Answers MCP requests from a shared [`Dispatcher`]. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
}

fn mcp_error(e: &DispatchError) -> McpError {
    if e.is_validation() {
        McpError::invalid_params(e.to_string(), None)
    } else {
        McpError::internal_error(e.to_string(), None)
    }
}

fn prompt_from_spec(spec: &PromptSpec) -> Result<Prompt, McpError> {
    let arguments: Vec<PromptArgument> = serde_json::to_value(&spec.arguments)
        .and_then(serde_json::from_value)
        .map_err(|e| McpError::internal_error(format!("prompt {}: {}", spec.name, e), None))?;
    Ok(Prompt::new(
        spec.name.as_str(),
        Some(spec.description.as_str()),
        Some(arguments),
    ))
}

fn tool_from_spec(spec: &PromptSpec) -> Tool {
    Tool::new(
        spec.name.clone(),
        spec.description.clone(),
        Arc::new(spec.input_schema()),
    )
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Prompt listing, in handler registration order.
    pub fn prompts(&self) -> Result<Vec<Prompt>, McpError> {
        self.dispatcher.list().iter().map(prompt_from_spec).collect()
    }

    /// Tool listing; one tool per prompt, arguments as a JSON Schema.
    pub fn tools(&self) -> Vec<Tool> {
        self.dispatcher.list().iter().map(tool_from_spec).collect()
    }

    /// `prompts/get`: the rendered text as one user message. Dispatch failures are errors.
    pub fn render_prompt(
        &self,
        name: &str,
        arguments: Option<PromptArguments>,
    ) -> Result<GetPromptResult, McpError> {
        let _span = tracing::info_span!("mcp_request", method = "prompts/get", name).entered();
        let prompt = self
            .dispatcher
            .dispatch(name, &arguments.unwrap_or_default())
            .map_err(|e| {
                tracing::warn!(error = %e, "prompt failed");
                mcp_error(&e)
            })?;
        let text = prompt.text();
        Ok(GetPromptResult {
            description: Some(prompt.description),
            messages: vec![PromptMessage::new_text(PromptMessageRole::User, text)],
        })
    }

    /// `tools/call`: dispatch failures become an `isError` result so the agent reads the message.
    pub fn run_tool(&self, name: &str, arguments: Option<PromptArguments>) -> CallToolResult {
        let _span = tracing::info_span!("mcp_request", method = "tools/call", name).entered();
        match self.dispatcher.dispatch(name, &arguments.unwrap_or_default()) {
            Ok(prompt) => CallToolResult::success(vec![Content::text(prompt.text())]),
            Err(e) => {
                tracing::warn!(error = %e, "tool call failed");
                CallToolResult::error(vec![Content::text(e.to_string())])
            }
        }
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        let template = self.dispatcher.template();
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_prompts()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: template.server_name.clone(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(template.instructions()),
        }
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(ListPromptsResult {
            prompts: self.prompts()?,
            next_cursor: None,
            meta: None,
        })
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        self.render_prompt(&request.name, request.arguments)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tools(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.run_tool(&request.name, request.arguments))
    }
}

/// Runs one MCP session over `reader`/`writer` until the peer closes the stream.
pub async fn serve<R, W>(server: McpServer, reader: R, writer: W) -> Result<(), ServeError>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let reader = LineLimit::new(reader, MAX_MESSAGE_BYTES);
    let running = server
        .serve((reader, writer))
        .await
        .map_err(|e| ServeError::Initialize(e.to_string()))?;
    tracing::info!("mcp session initialized");
    let reason = running
        .waiting()
        .await
        .map_err(|e| ServeError::Session(e.to_string()))?;
    tracing::info!(?reason, "mcp session closed");
    Ok(())
}

/// Serves on stdin/stdout. Logs must not go to stdout while this runs.
pub async fn run_stdio(server: McpServer) -> Result<(), ServeError> {
    let (stdin, stdout) = rmcp::transport::stdio();
    serve(server, stdin, stdout).await
}
