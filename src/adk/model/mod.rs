// SPDX-License-Identifier: MIT

//! Model module - defines the chat model trait and message types
//!
//! This module provides the core Model trait and shared types.
//! Backends live in their own submodules:
//! - [responses] - OpenAI-compatible Responses API (built-in tools and MCP)
//! - [openai] - OpenAI-compatible Chat Completions API

pub mod openai;
pub mod responses;

use crate::adk::error::ModelError;
use crate::adk::tool::ToolSpec;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";
pub const ROLE_TOOL: &str = "tool";

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Parts of a message - text, tool calls and tool results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Part {
    /// Regular text
    Text(String),
    /// Tool call requested by the model
    FunctionCall {
        /// Call identifier the matching result must echo
        id: String,
        name: String,
        args: Value,
    },
    /// Result of executing a tool call
    FunctionResponse {
        id: String,
        name: String,
        response: Value,
    },
}

impl Content {
    pub fn new(role: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            role: role.into(),
            parts,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(ROLE_SYSTEM, vec![Part::Text(text.into())])
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ROLE_USER, vec![Part::Text(text.into())])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(ROLE_ASSISTANT, vec![Part::Text(text.into())])
    }

    /// One tool result, correlated to its call by `id`
    pub fn tool_result(id: impl Into<String>, name: impl Into<String>, response: Value) -> Self {
        Self::new(
            ROLE_TOOL,
            vec![Part::FunctionResponse {
                id: id.into(),
                name: name.into(),
                response,
            }],
        )
    }

    /// Concatenated text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Tool calls requested in this message as `(id, name, args)`
    pub fn function_calls(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.parts.iter().filter_map(|p| match p {
            Part::FunctionCall { id, name, args } => Some((id.as_str(), name.as_str(), args)),
            _ => None,
        })
    }

    pub fn has_function_calls(&self) -> bool {
        self.function_calls().next().is_some()
    }
}

/// JSON schema a structured reply must satisfy
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
}

impl OutputSchema {
    /// Derive the schema from a Rust type
    pub fn of<T: JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        let mut schema = serde_json::to_value(&root).unwrap_or_default();
        if let Value::Object(obj) = &mut schema {
            obj.remove("$schema");
        }
        Self {
            name: T::schema_name(),
            schema,
        }
    }
}

/// Core trait for chat model backends
#[async_trait]
pub trait Model: Send + Sync {
    /// Produce the next message given the conversation and the bound tools
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: &[ToolSpec],
    ) -> Result<Content, ModelError>;

    /// Produce a JSON value constrained by `schema`
    async fn generate_structured(
        &self,
        history: &[Content],
        schema: &OutputSchema,
    ) -> Result<Value, ModelError>;
}

/// Structured extraction into a typed value
pub async fn generate_typed<T>(model: &dyn Model, history: &[Content]) -> Result<T, ModelError>
where
    T: DeserializeOwned + JsonSchema,
{
    let schema = OutputSchema::of::<T>();
    let value = model.generate_structured(history, &schema).await?;
    serde_json::from_value(value)
        .map_err(|e| ModelError::InvalidResponse(format!("{} does not match: {}", schema.name, e)))
}

/// Parse a JSON object out of model text, tolerating code fences
pub(crate) fn parse_json_text(text: &str) -> Result<Value, ModelError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(body)
        .map_err(|e| ModelError::InvalidResponse(format!("expected JSON, got '{}': {}", body, e)))
}
