// SPDX-License-Identifier: MIT

//! OpenAI-compatible Responses API backend
//!
//! This is the API the demos target: besides local function tools it accepts
//! built-in tools and MCP server descriptors, which the backend executes on
//! its own. Only `function_call` output items come back to the workflow as
//! tool calls; `web_search_call`, `mcp_call` and friends are already resolved.

use super::openai::response_text;
use super::{parse_json_text, Content, GenerationConfig, Model, OutputSchema, Part, ROLE_TOOL};
use crate::adk::error::ModelError;
use crate::adk::tool::ToolSpec;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

/// Responses API model implementation
pub struct ResponsesModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl ResponsesModel {
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

    /// Convert one message into Responses input items
    fn content_to_input_items(content: &Content) -> Vec<Value> {
        let mut items = Vec::new();
        let text = content.text();

        if content.role == ROLE_TOOL {
            for part in &content.parts {
                if let Part::FunctionResponse { id, response, .. } = part {
                    items.push(json!({
                        "type": "function_call_output",
                        "call_id": id,
                        "output": response_text(response),
                    }));
                }
            }
            return items;
        }

        if !text.is_empty() || !content.has_function_calls() {
            items.push(json!({
                "role": content.role,
                "content": text,
            }));
        }

        for (id, name, args) in content.function_calls() {
            items.push(json!({
                "type": "function_call",
                "call_id": id,
                "name": name,
                "arguments": args.to_string(),
            }));
        }

        items
    }

    fn tool_to_wire(spec: &ToolSpec) -> Value {
        match spec {
            ToolSpec::Local(t) => json!({
                "type": "function",
                "name": t.name(),
                "description": t.description(),
                "parameters": t.schema(),
            }),
            ToolSpec::Builtin { kind, params } => {
                let mut obj = params.clone();
                obj.insert("type".to_string(), json!(kind));
                Value::Object(obj)
            }
            ToolSpec::Remote(server) => json!({
                "type": "mcp",
                "server_label": server.label,
                "server_url": server.url,
                "require_approval": server.require_approval.as_str(),
            }),
        }
    }

    /// Parse a Responses payload into Content
    fn parse_response(response: &Value) -> Result<Content, ModelError> {
        if let Some(err) = response.get("error").filter(|e| !e.is_null()) {
            return Err(ModelError::InvalidResponse(format!(
                "response failed: {}",
                err
            )));
        }

        let output = response["output"]
            .as_array()
            .ok_or_else(|| ModelError::InvalidResponse("no output in response".to_string()))?;

        let mut parts = Vec::new();
        for item in output {
            match item["type"].as_str().unwrap_or_default() {
                "message" => {
                    let texts = item["content"].as_array().into_iter().flatten();
                    for block in texts {
                        if block["type"] == "output_text" {
                            if let Some(t) = block["text"].as_str() {
                                parts.push(Part::Text(t.to_string()));
                            }
                        }
                    }
                }
                "function_call" => {
                    let args_str = item["arguments"].as_str().unwrap_or("{}");
                    parts.push(Part::FunctionCall {
                        id: item["call_id"].as_str().unwrap_or_default().to_string(),
                        name: item["name"].as_str().unwrap_or_default().to_string(),
                        args: serde_json::from_str(args_str).unwrap_or(json!({})),
                    });
                }
                other => {
                    log::debug!("Backend resolved '{}' output item", other);
                }
            }
        }

        Ok(Content::new(super::ROLE_ASSISTANT, parts))
    }

    fn base_body(&self, history: &[Content]) -> Map<String, Value> {
        let input: Vec<Value> = history
            .iter()
            .flat_map(Self::content_to_input_items)
            .collect();

        let mut body = Map::new();
        body.insert("model".to_string(), json!(self.model_name));
        body.insert("input".to_string(), json!(input));
        body
    }

    async fn post(&self, body: Map<String, Value>) -> Result<Value, ModelError> {
        let url = format!("{}/responses", self.base_url);
        log::debug!("Responses request body: {:?}", body);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
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
        log::debug!("Responses response: {}", resp_json);
        Ok(resp_json)
    }
}

#[async_trait]
impl Model for ResponsesModel {
    async fn generate_content(
        &self,
        history: &[Content],
        config: Option<&GenerationConfig>,
        tools: &[ToolSpec],
    ) -> Result<Content, ModelError> {
        let mut body = self.base_body(history);

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body.insert("temperature".to_string(), json!(temp));
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body.insert("max_output_tokens".to_string(), json!(max_tokens));
            }
            if let Some(top_p) = cfg.top_p {
                body.insert("top_p".to_string(), json!(top_p));
            }
        }

        if !tools.is_empty() {
            let labels: Vec<&str> = tools.iter().map(|t| t.label()).collect();
            log::info!("Binding tools {:?} to {}", labels, self.model_name);
            let wire: Vec<Value> = tools.iter().map(Self::tool_to_wire).collect();
            body.insert("tools".to_string(), json!(wire));
        }

        let resp_json = self.post(body).await?;
        Self::parse_response(&resp_json)
    }

    async fn generate_structured(
        &self,
        history: &[Content],
        schema: &OutputSchema,
    ) -> Result<Value, ModelError> {
        let mut body = self.base_body(history);
        body.insert(
            "text".to_string(),
            json!({
                "format": {
                    "type": "json_schema",
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": false
                }
            }),
        );

        let resp_json = self.post(body).await?;
        let content = Self::parse_response(&resp_json)?;
        parse_json_text(&content.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::tool::{Approval, McpServer};

    #[test]
    fn test_text_message_item() {
        let items = ResponsesModel::content_to_input_items(&Content::user("Hello"));
        assert_eq!(items, vec![json!({"role": "user", "content": "Hello"})]);
    }

    #[test]
    fn test_function_calls_become_items() {
        let content = Content::new(
            "assistant",
            vec![Part::FunctionCall {
                id: "fc_1".to_string(),
                name: "multiply".to_string(),
                args: json!({"a": 11, "b": 11}),
            }],
        );
        let items = ResponsesModel::content_to_input_items(&content);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["type"], "function_call");
        assert_eq!(items[0]["call_id"], "fc_1");
        assert_eq!(items[0]["arguments"], "{\"a\":11,\"b\":11}");
    }

    #[test]
    fn test_tool_results_become_outputs() {
        let items = ResponsesModel::content_to_input_items(&Content::tool_result(
            "fc_1",
            "multiply",
            json!(121),
        ));
        assert_eq!(
            items,
            vec![json!({"type": "function_call_output", "call_id": "fc_1", "output": "121"})]
        );
    }

    #[test]
    fn test_tool_wire_formats() {
        assert_eq!(
            ResponsesModel::tool_to_wire(&ToolSpec::web_search()),
            json!({"type": "web_search_preview"})
        );
        let mcp = ToolSpec::Remote(McpServer {
            label: "gitmcp".to_string(),
            url: "https://gitmcp.io/rh-ai-kickstart/RAG".to_string(),
            require_approval: Approval::Never,
        });
        assert_eq!(
            ResponsesModel::tool_to_wire(&mcp),
            json!({
                "type": "mcp",
                "server_label": "gitmcp",
                "server_url": "https://gitmcp.io/rh-ai-kickstart/RAG",
                "require_approval": "never"
            })
        );
    }

    #[test]
    fn test_parse_mixed_output() {
        let response = json!({
            "output": [
                {"type": "web_search_call", "id": "ws_1", "status": "completed"},
                {"type": "message", "role": "assistant", "content": [
                    {"type": "output_text", "text": "Let me multiply."}
                ]},
                {"type": "function_call", "call_id": "fc_7", "name": "multiply",
                 "arguments": "{\"a\": 11, \"b\": 11}"}
            ]
        });
        let content = ResponsesModel::parse_response(&response).unwrap();
        assert_eq!(content.text(), "Let me multiply.");
        let calls: Vec<_> = content.function_calls().collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "fc_7");
        assert_eq!(calls[0].2["b"], 11);
    }

    #[test]
    fn test_error_payload_is_invalid() {
        let response = json!({"error": {"message": "model not found"}, "output": []});
        assert!(ResponsesModel::parse_response(&response).is_err());
    }
}
