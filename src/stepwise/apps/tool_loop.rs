// SPDX-License-Identifier: MIT

//! Tool loop demos: the prebuilt ReAct agent and the same loop wired by hand
//!
//! Both bind a local `multiply`, the backend's web search and a gitmcp server.

use std::sync::Arc;

use crate::adk::agent::ReActAgent;
use crate::adk::error::{GraphError, Result};
use crate::adk::model::{Content, Model};
use crate::adk::tool::ToolSpec;
use crate::stepwise::tools::MultiplyTool;
use crate::stepwise::workflow::graph::{Execution, Workflow, WorkflowBuilder, START};
use crate::stepwise::workflow::prebuilt::{tools_condition, ChatNode, ToolNode, TOOLS_NODE};
use crate::stepwise::workflow::state::StateSchema;

pub const GITMCP_RAG_URL: &str = "https://gitmcp.io/rh-ai-kickstart/RAG";

/// Questions exercising web search, the local tool and the MCP server
pub const DEMO_PROMPTS: [&str; 3] = [
    "Who won Roland Garros for men in 2025?",
    "How much is 11 times 11?",
    "What are the components of the Red Hat RAG Kickstart?",
];

pub fn tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec::local(Arc::new(MultiplyTool)),
        ToolSpec::web_search(),
        ToolSpec::mcp("gitmcp", GITMCP_RAG_URL),
    ]
}

/// Option 1: the prebuilt loop
pub fn react_agent(
    model: Arc<dyn Model>,
    max_iterations: usize,
) -> std::result::Result<ReActAgent, GraphError> {
    ReActAgent::new("tool_loop_agent", "", model, tools(), max_iterations)
}

/// Option 2: `chatbot <-> tools`, built node by node
pub fn chatbot_graph(
    model: Arc<dyn Model>,
    step_limit: usize,
) -> std::result::Result<Workflow, GraphError> {
    let tools = tools();
    WorkflowBuilder::new("chatbot", StateSchema::new())
        .add_node("chatbot", ChatNode::new(model, tools.clone()))
        .add_node(TOOLS_NODE, ToolNode::from_specs(&tools))
        .add_edge(START, "chatbot")
        .add_edge(TOOLS_NODE, "chatbot")
        .add_conditional_edges("chatbot", tools_condition(), &[])
        .step_limit(step_limit)
        .compile()
}

/// Ask one question through a compiled loop
pub async fn ask(workflow: &Workflow, question: &str) -> Result<Execution> {
    workflow
        .execute(workflow.new_state().with_message(Content::user(question)))
        .await
}
