// SPDX-License-Identifier: MIT

//! Tool trait and tool descriptors
//!
//! A [`Tool`] is a local callable the workflow executes itself. A
//! [`ToolSpec`] is what gets bound to a model call: either such a local tool,
//! or a capability the backend resolves on its own (built-in web search, a
//! remote MCP server).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Trait for tools that can be called by agents.
///
/// `name()`, `description()` and `schema()` return borrowed data;
/// implementations should keep these in fields or statics.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool name (must be unique within an agent's tool set)
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the tool does
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's input parameters
    fn schema(&self) -> &Value;

    /// Execute the tool with the given input and return the result
    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>>;
}

/// Approval policy for remote MCP calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approval {
    #[default]
    Never,
    Always,
}

impl Approval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Approval::Never => "never",
            Approval::Always => "always",
        }
    }
}

/// A remote MCP server the backend connects to on the model's behalf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServer {
    pub label: String,
    pub url: String,
    #[serde(default)]
    pub require_approval: Approval,
}

/// Capability bound to a model call
#[derive(Clone)]
pub enum ToolSpec {
    /// Executed locally by a tool-dispatch node
    Local(Arc<dyn Tool>),
    /// Backend built-in such as `web_search_preview`
    Builtin {
        kind: String,
        params: Map<String, Value>,
    },
    /// Remote MCP server resolved by the backend
    Remote(McpServer),
}

impl ToolSpec {
    pub fn local(tool: Arc<dyn Tool>) -> Self {
        ToolSpec::Local(tool)
    }

    pub fn builtin(kind: impl Into<String>) -> Self {
        ToolSpec::Builtin {
            kind: kind.into(),
            params: Map::new(),
        }
    }

    /// The backend's built-in web search
    pub fn web_search() -> Self {
        Self::builtin("web_search_preview")
    }

    /// An MCP server that never asks for approval
    pub fn mcp(label: impl Into<String>, url: impl Into<String>) -> Self {
        ToolSpec::Remote(McpServer {
            label: label.into(),
            url: url.into(),
            require_approval: Approval::Never,
        })
    }

    /// The local tool, if this descriptor holds one
    pub fn as_local(&self) -> Option<&Arc<dyn Tool>> {
        match self {
            ToolSpec::Local(tool) => Some(tool),
            _ => None,
        }
    }

    /// Name used in logs
    pub fn label(&self) -> &str {
        match self {
            ToolSpec::Local(tool) => tool.name(),
            ToolSpec::Builtin { kind, .. } => kind,
            ToolSpec::Remote(server) => &server.label,
        }
    }
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolSpec::Local(tool) => f.debug_tuple("Local").field(&tool.name()).finish(),
            ToolSpec::Builtin { kind, params } => f
                .debug_struct("Builtin")
                .field("kind", kind)
                .field("params", params)
                .finish(),
            ToolSpec::Remote(server) => f.debug_tuple("Remote").field(server).finish(),
        }
    }
}
