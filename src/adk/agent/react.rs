// SPDX-License-Identifier: MIT

//! ReAct Agent - Reasoning + Acting loop
//!
//! The model is called with the conversation and its tools. While it asks
//! for local tool calls, the calls are executed and the results fed back.
//! The loop is an ordinary workflow:
//!
//! ```text
//! START -> agent -(tool calls)-> tools -> agent
//!                -(no calls)---> END
//! ```

use super::Agent;
use crate::adk::error::{GraphError, Result};
use crate::adk::model::{Content, Model};
use crate::adk::tool::ToolSpec;
use crate::stepwise::workflow::graph::{Execution, Workflow, WorkflowBuilder, END, START};
use crate::stepwise::workflow::prebuilt::{tools_condition, ChatNode, ToolNode, TOOLS_NODE};
use crate::stepwise::workflow::state::{State, StateSchema};
use async_trait::async_trait;
use std::sync::Arc;

const AGENT_NODE: &str = "agent";

/// ReAct (Reasoning + Acting) Agent
pub struct ReActAgent {
    name: String,
    max_iterations: usize,
    workflow: Workflow,
}

impl ReActAgent {
    /// Compile the agent loop.
    ///
    /// `max_iterations` bounds the model calls of one run; an empty
    /// `instruction` sends no system prompt.
    pub fn new(
        name: impl Into<String>,
        instruction: impl Into<String>,
        model: Arc<dyn Model>,
        tools: Vec<ToolSpec>,
        max_iterations: usize,
    ) -> std::result::Result<Self, GraphError> {
        let name = name.into();
        let instruction = instruction.into();
        let max_iterations = max_iterations.max(1);

        let tool_node = ToolNode::from_specs(&tools);
        let mut chat = ChatNode::new(model, tools);
        if !instruction.trim().is_empty() {
            chat = chat.with_instruction(instruction);
        }

        // Every model call but the last is followed by a tools step.
        let workflow = WorkflowBuilder::new(name.clone(), StateSchema::new())
            .add_node(AGENT_NODE, chat)
            .add_node(TOOLS_NODE, tool_node)
            .add_edge(START, AGENT_NODE)
            .add_conditional_edges(
                AGENT_NODE,
                tools_condition(),
                &[(TOOLS_NODE, TOOLS_NODE), (END, END)],
            )
            .add_edge(TOOLS_NODE, AGENT_NODE)
            .step_limit(max_iterations * 2 - 1)
            .compile()?;

        Ok(Self {
            name,
            max_iterations,
            workflow,
        })
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// The compiled loop, for mounting inside a larger workflow
    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Run the loop over an existing conversation
    pub async fn invoke(&self, messages: Vec<Content>) -> Result<Execution> {
        let mut state = State::empty();
        for message in messages {
            state = state.with_message(message);
        }
        self.workflow.execute(state).await
    }
}

#[async_trait]
impl Agent for ReActAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, input: String) -> Result<String> {
        log::info!("ReActAgent {} started", self.name);
        let execution = self.invoke(vec![Content::user(input)]).await?;

        if execution.halted {
            log::warn!(
                "ReActAgent {} reached maximum iterations ({})",
                self.name,
                self.max_iterations
            );
            return Ok(format!(
                "Reached maximum iterations ({}) without final answer",
                self.max_iterations
            ));
        }

        let answer = execution
            .state
            .last_message()
            .map(Content::text)
            .unwrap_or_default();
        log::info!("ReActAgent {} finished in {} steps", self.name, execution.steps);
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::error::ModelError;
    use crate::adk::model::{GenerationConfig, OutputSchema, Part, ROLE_ASSISTANT, ROLE_TOOL};
    use crate::adk::tool::Tool;
    use once_cell::sync::Lazy;
    use serde_json::{json, Value};
    use std::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static ECHO_SCHEMA: Lazy<Value> = Lazy::new(|| json!({"type": "object"}));

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn schema(&self) -> &Value {
            &ECHO_SCHEMA
        }
        async fn execute(
            &self,
            input: Value,
        ) -> std::result::Result<Value, Box<dyn Error + Send + Sync>> {
            Ok(input)
        }
    }

    /// Requests `echo` for the first `calls` turns, then answers with the
    /// number of tool results it has seen
    struct ScriptedModel {
        calls: usize,
        turn: AtomicUsize,
    }

    #[async_trait]
    impl Model for ScriptedModel {
        async fn generate_content(
            &self,
            history: &[Content],
            _config: Option<&GenerationConfig>,
            _tools: &[ToolSpec],
        ) -> std::result::Result<Content, ModelError> {
            let turn = self.turn.fetch_add(1, Ordering::SeqCst);
            if turn < self.calls {
                return Ok(Content::new(
                    ROLE_ASSISTANT,
                    vec![Part::FunctionCall {
                        id: format!("call_{}", turn),
                        name: "echo".to_string(),
                        args: json!({"turn": turn}),
                    }],
                ));
            }
            let results = history.iter().filter(|c| c.role == ROLE_TOOL).count();
            Ok(Content::assistant(format!("saw {} results", results)))
        }

        async fn generate_structured(
            &self,
            _history: &[Content],
            _schema: &OutputSchema,
        ) -> std::result::Result<Value, ModelError> {
            Ok(json!({}))
        }
    }

    fn agent(calls: usize, max_iterations: usize) -> ReActAgent {
        let model = Arc::new(ScriptedModel {
            calls,
            turn: AtomicUsize::new(0),
        });
        ReActAgent::new(
            "test_agent",
            "You are helpful.",
            model,
            vec![ToolSpec::local(Arc::new(Echo))],
            max_iterations,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_answers_without_tools() {
        let answer = agent(0, 5).run("hi".to_string()).await.unwrap();
        assert_eq!(answer, "saw 0 results");
    }

    #[tokio::test]
    async fn test_loops_through_tool_calls() {
        let exec = agent(2, 5).invoke(vec![Content::user("hi")]).await.unwrap();
        assert!(!exec.halted);
        assert_eq!(exec.path, vec!["agent", "tools", "agent", "tools", "agent"]);
        assert_eq!(exec.state.last_message().unwrap().text(), "saw 2 results");
    }

    #[tokio::test]
    async fn test_max_iterations_is_reported() {
        let a = agent(100, 3);
        let answer = a.run("hi".to_string()).await.unwrap();
        assert!(answer.contains("Reached maximum iterations (3)"));
        assert_eq!(a.workflow().step_limit(), 5);
    }
}
