// SPDX-License-Identifier: MIT

//! OpenAI-compatible Chat Completions backend
//!
//! Only local tools can be expressed on this API. Built-in and MCP
//! descriptors are dropped with a warning; use [`super::responses`] for those.

use super::{parse_json_text, Content, GenerationConfig, Model, OutputSchema, Part};
use crate::adk::error::ModelError;
use crate::adk::tool::ToolSpec;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

/// Chat Completions model implementation
pub struct ChatCompletionsModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl ChatCompletionsModel {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model_name: model_name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Convert internal Content to chat messages.
    ///
    /// A tool message may carry several results; each becomes its own
    /// `tool` message so every `tool_call_id` is answered.
    fn content_to_messages(content: &Content) -> Vec<Value> {
        let responses: Vec<Value> = content
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::FunctionResponse { id, response, .. } => Some(json!({
                    "role": "tool",
                    "tool_call_id": id,
                    "content": response_text(response),
                })),
                _ => None,
            })
            .collect();
        if !responses.is_empty() {
            return responses;
        }

        let mut tool_calls = Vec::new();
        let mut text_content = String::new();

        for part in &content.parts {
            match part {
                Part::Text(t) => text_content.push_str(t),
                Part::FunctionCall { id, name, args } => {
                    tool_calls.push(json!({
                        "id": id,
                        "type": "function",
                        "function": {
                            "name": name,
                            "arguments": args.to_string()
                        }
                    }));
                }
                Part::FunctionResponse { .. } => {}
            }
        }

        if !tool_calls.is_empty() {
            vec![json!({
                "role": content.role,
                "content": if text_content.is_empty() { Value::Null } else { json!(text_content) },
                "tool_calls": tool_calls
            })]
        } else {
            vec![json!({
                "role": content.role,
                "content": text_content
            })]
        }
    }

    /// Convert local tools to function format
    fn tools_to_openai_format(tools: &[ToolSpec]) -> Vec<Value> {
        tools
            .iter()
            .filter_map(|spec| match spec {
                ToolSpec::Local(t) => Some(json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.schema()
                    }
                })),
                other => {
                    log::warn!(
                        "Chat Completions cannot bind '{}', skipping it",
                        other.label()
                    );
                    None
                }
            })
            .collect()
    }

    /// Parse a completion into Content
    fn parse_openai_response(response: &Value) -> Result<Content, ModelError> {
        let message = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .map(|choice| &choice["message"])
            .ok_or_else(|| ModelError::InvalidResponse("no choices in response".to_string()))?;

        let mut parts = Vec::new();

        if let Some(content) = message["content"].as_str() {
            if !content.is_empty() {
                parts.push(Part::Text(content.to_string()));
            }
        }

        if let Some(tool_calls) = message["tool_calls"].as_array() {
            for tc in tool_calls {
                let id = tc["id"].as_str().unwrap_or_default().to_string();
                let name = tc["function"]["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                let args_str = tc["function"]["arguments"].as_str().unwrap_or("{}");
                let args: Value = serde_json::from_str(args_str).unwrap_or(json!({}));

                parts.push(Part::FunctionCall { id, name, args });
            }
        }

        Ok(Content::new(super::ROLE_ASSISTANT, parts))
    }

    async fn post(&self, body: &Value) -> Result<Value, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        log::debug!("Chat Completions request body: {}", body);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await?;
            return Err(ModelError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let resp_json: Value = resp.json().await?;
        log::debug!("Chat Completions response: {}", resp_json);
        Ok(resp_json)
    }

    fn messages(history: &[Content]) -> Vec<Value> {
        history
            .iter()
            .flat_map(Self::content_to_messages)
            .collect()
    }
}

/// Tool results go over the wire as text
pub(crate) fn response_text(response: &Value) -> String {
    match response {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl Model for ChatCompletionsModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: &[ToolSpec],
    ) -> Result<Content, ModelError> {
        let mut body = json!({
            "model": self.model_name,
            "messages": Self::messages(history)
        });

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
        }

        let functions = Self::tools_to_openai_format(tools);
        if !functions.is_empty() {
            log::info!(
                "Binding {} tools to {}",
                functions.len(),
                self.model_name
            );
            body["tools"] = json!(functions);
            body["tool_choice"] = json!("auto");
        }

        let resp_json = self.post(&body).await?;
        Self::parse_openai_response(&resp_json)
    }

    async fn generate_structured(
        &self,
        history: &[Content],
        schema: &OutputSchema,
    ) -> Result<Value, ModelError> {
        let body = json!({
            "model": self.model_name,
            "messages": Self::messages(history),
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema
                }
            }
        });

        let resp_json = self.post(&body).await?;
        let content = Self::parse_openai_response(&resp_json)?;
        parse_json_text(&content.text())
    }
}
