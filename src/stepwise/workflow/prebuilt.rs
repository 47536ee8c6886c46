// SPDX-License-Identifier: MIT

//! Prebuilt nodes for the model/tool loop
//!
//! - [`ChatNode`] calls the model with the message history and bound tools
//! - [`ToolNode`] executes the tool calls in the last message
//! - [`tools_condition`] routes to `"tools"` while calls are pending

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::graph::{Node, Router, END};
use super::state::{State, StateUpdate};
use crate::adk::error::Result;
use crate::adk::model::{Content, Model};
use crate::adk::tool::{Tool, ToolSpec};

/// Conventional name of the tool-dispatch node
pub const TOOLS_NODE: &str = "tools";

/// Model-invocation node
pub struct ChatNode {
    model: Arc<dyn Model>,
    tools: Vec<ToolSpec>,
    instruction: Option<String>,
}

impl ChatNode {
    pub fn new(model: Arc<dyn Model>, tools: Vec<ToolSpec>) -> Self {
        Self {
            model,
            tools,
            instruction: None,
        }
    }

    /// System prompt sent ahead of the history on every call
    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }
}

#[async_trait]
impl Node for ChatNode {
    async fn run(&self, state: &State) -> Result<StateUpdate> {
        let response = match &self.instruction {
            Some(instruction) => {
                let mut history = Vec::with_capacity(state.messages().len() + 1);
                history.push(Content::system(instruction.clone()));
                history.extend_from_slice(state.messages());
                self.model
                    .generate_content(&history, None, &self.tools)
                    .await?
            }
            None => {
                self.model
                    .generate_content(state.messages(), None, &self.tools)
                    .await?
            }
        };

        log::info!(
            "Model replied with {} parts ({} tool calls)",
            response.parts.len(),
            response.function_calls().count()
        );

        Ok(StateUpdate::new().message(response))
    }
}

/// Tool-dispatch node for local tools
pub struct ToolNode {
    tools: Vec<Arc<dyn Tool>>,
    /// HashMap for O(1) tool lookups
    tool_map: HashMap<String, usize>,
}

impl ToolNode {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let tool_map: HashMap<String, usize> = tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();

        Self { tools, tool_map }
    }

    /// Keep the local tools out of a model's tool binding
    pub fn from_specs(specs: &[ToolSpec]) -> Self {
        Self::new(specs.iter().filter_map(|s| s.as_local().cloned()).collect())
    }

    fn get_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tool_map.get(name).map(|&i| &self.tools[i])
    }

    /// Run one call. Failures become the result text so the model can react.
    async fn call(&self, name: &str, args: &Value) -> Value {
        let Some(tool) = self.get_tool(name) else {
            log::error!("Tool {} not found", name);
            return Value::String(format!("Error: Tool '{}' not found", name));
        };

        match tool.execute(args.clone()).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Tool {} failed: {}", name, e);
                Value::String(format!("Error: {}", e))
            }
        }
    }
}

#[async_trait]
impl Node for ToolNode {
    async fn run(&self, state: &State) -> Result<StateUpdate> {
        let Some(last) = state.last_message() else {
            return Ok(StateUpdate::new());
        };

        let mut update = StateUpdate::new();
        for (id, name, args) in last.function_calls() {
            log::info!("Tool call {}: {} {}", id, name, args);
            let result = self.call(name, args).await;
            log::info!("Tool {} response: {}", name, result);
            update = update.message(Content::tool_result(id, name, result));
        }
        Ok(update)
    }
}

/// Routes to [`TOOLS_NODE`] when the last message requests tool calls
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolsCondition;

pub fn tools_condition() -> ToolsCondition {
    ToolsCondition
}

impl Router for ToolsCondition {
    fn labels(&self) -> Vec<String> {
        vec![TOOLS_NODE.to_string(), END.to_string()]
    }

    fn route(&self, state: &State) -> String {
        match state.last_message() {
            Some(msg) if msg.has_function_calls() => TOOLS_NODE.to_string(),
            _ => END.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::ModelError;
    use crate::adk::model::{GenerationConfig, OutputSchema, Part, ROLE_ASSISTANT, ROLE_TOOL};
    use once_cell::sync::Lazy;
    use serde_json::json;
    use std::error::Error;
    use std::sync::Mutex;

    static ARGS_SCHEMA: Lazy<Value> = Lazy::new(|| json!({"type": "object"}));

    struct Doubler;

    #[async_trait]
    impl Tool for Doubler {
        fn name(&self) -> &str {
            "double"
        }
        fn description(&self) -> &str {
            "doubles n"
        }
        fn schema(&self) -> &Value {
            &ARGS_SCHEMA
        }
        async fn execute(
            &self,
            input: Value,
        ) -> std::result::Result<Value, Box<dyn Error + Send + Sync>> {
            let n = input["n"].as_i64().ok_or("n must be an integer")?;
            Ok(json!(n * 2))
        }
    }

    /// Records what it was asked and replies with a fixed message
    struct RecordingModel {
        seen: Mutex<Vec<(usize, usize)>>,
    }

    #[async_trait]
    impl Model for RecordingModel {
        async fn generate_content(
            &self,
            history: &[Content],
            _config: Option<&GenerationConfig>,
            tools: &[ToolSpec],
        ) -> std::result::Result<Content, ModelError> {
            self.seen.lock().unwrap().push((history.len(), tools.len()));
            Ok(Content::assistant("ok"))
        }

        async fn generate_structured(
            &self,
            _history: &[Content],
            _schema: &OutputSchema,
        ) -> std::result::Result<Value, ModelError> {
            Ok(json!({}))
        }
    }

    fn call(id: &str, name: &str, args: Value) -> Part {
        Part::FunctionCall {
            id: id.to_string(),
            name: name.to_string(),
            args,
        }
    }

    #[tokio::test]
    async fn test_tool_node_answers_every_call_by_id() {
        let node = ToolNode::new(vec![Arc::new(Doubler)]);
        let state = State::empty().with_message(Content::new(
            ROLE_ASSISTANT,
            vec![
                call("a", "double", json!({"n": 2})),
                call("b", "double", json!({"n": 5})),
            ],
        ));

        let update = node.run(&state).await.unwrap();
        let results = update.appended_messages();
        assert_eq!(results.len(), 2);
        for (msg, (id, expected)) in results.iter().zip([("a", 4), ("b", 10)]) {
            assert_eq!(msg.role, ROLE_TOOL);
            match &msg.parts[0] {
                Part::FunctionResponse { id: got, response, .. } => {
                    assert_eq!(got, id);
                    assert_eq!(response, &json!(expected));
                }
                other => panic!("expected a tool result, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_tool_failures_become_results() {
        let node = ToolNode::new(vec![Arc::new(Doubler)]);
        let state = State::empty().with_message(Content::new(
            ROLE_ASSISTANT,
            vec![
                call("bad", "double", json!({"n": "two"})),
                call("missing", "triple", json!({})),
            ],
        ));

        let update = node.run(&state).await.unwrap();
        let texts: Vec<String> = update
            .appended_messages()
            .iter()
            .map(|m| match &m.parts[0] {
                Part::FunctionResponse { response, .. } => response.to_string(),
                _ => String::new(),
            })
            .collect();
        assert!(texts[0].contains("n must be an integer"));
        assert!(texts[1].contains("not found"));
    }

    #[tokio::test]
    async fn test_tool_node_without_calls_is_noop() {
        let node = ToolNode::new(vec![]);
        let state = State::empty().with_message(Content::assistant("done"));
        assert!(node.run(&state).await.unwrap().is_empty());
    }

    #[test]
    fn test_tools_condition() {
        let router = tools_condition();
        let pending = State::empty().with_message(Content::new(
            ROLE_ASSISTANT,
            vec![call("a", "double", json!({"n": 1}))],
        ));
        assert_eq!(router.route(&pending), TOOLS_NODE);
        assert_eq!(router.route(&State::empty().with_message(Content::assistant("hi"))), END);
        assert_eq!(router.route(&State::empty()), END);
    }

    #[tokio::test]
    async fn test_chat_node_prepends_instruction() {
        let model = Arc::new(RecordingModel {
            seen: Mutex::new(Vec::new()),
        });
        let node = ChatNode::new(model.clone(), vec![ToolSpec::web_search()])
            .with_instruction("be brief");
        let state = State::empty().with_message(Content::user("hi"));

        let update = node.run(&state).await.unwrap();
        assert_eq!(update.appended_messages(), &[Content::assistant("ok")]);
        assert_eq!(model.seen.lock().unwrap()[0], (2, 1));
    }

    #[test]
    fn test_from_specs_keeps_local_tools() {
        let node = ToolNode::from_specs(&[
            ToolSpec::local(Arc::new(Doubler)),
            ToolSpec::web_search(),
        ]);
        assert!(node.get_tool("double").is_some());
        assert_eq!(node.tools.len(), 1);
    }
}
