// SPDX-License-Identifier: MIT

//! Idea vault: triage free text, then research it and email a summary
//!
//! ```text
//! START -> triage_agent -topic-> topic_agent  (set_message -> llm_node <-> tools)
//!                       -github-> github_agent (set_message -> llm_node <-> tools)
//!                       -else--> END  "Unable to determine request type."
//! ```

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::adk::error::{GraphError, ModelError, Result};
use crate::adk::model::{generate_typed, Content, Model};
use crate::adk::tool::ToolSpec;
use crate::stepwise::tools::SendEmailTool;
use crate::stepwise::workflow::graph::{
    node_fn, FnRouter, Node, Workflow, WorkflowBuilder, END, START,
};
use crate::stepwise::workflow::prebuilt::{tools_condition, ChatNode, ToolNode, TOOLS_NODE};
use crate::stepwise::workflow::state::{FieldType, State, StateSchema, StateUpdate};

pub const TRIAGE_NODE: &str = "triage_agent";
pub const TOPIC_AGENT: &str = "topic_agent";
pub const GITHUB_AGENT: &str = "github_agent";

/// Assistant reply when the input is neither a topic nor a repository
pub const UNKNOWN_REQUEST: &str = "Unable to determine request type.";

const TRIAGE_PROMPT: &str = "Determine if the following message is a topic or a GitHub reference: ";
const TOPIC_PROMPT: &str = "First do a web search for the given topic and summarize the \
                            results, then send an email with the summary: ";
const GITHUB_PROMPT: &str = "First retrieve the README.md and send an email with the summary.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Topic,
    Github,
    Unknown,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Topic => "topic",
            Classification::Github => "github",
            Classification::Unknown => "unknown",
        }
    }
}

/// Analyze the input and route it according to its content.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TriageSchema {
    /// The classification of the input: 'topic' if the input is a topic to
    /// research, 'github' if the input is a GitHub repository to research,
    /// 'unknown' for everything else
    pub classification: Classification,
}

/// State fields of the idea vault
pub fn schema() -> StateSchema {
    StateSchema::new()
        .field("input", FieldType::String)
        .field("decision", FieldType::String)
        .field("data", FieldType::String)
}

/// Turn a GitHub repository URL into its gitmcp.io counterpart
pub fn gitmcp_url(repo: &str) -> String {
    let repo = repo.trim();
    match url::Url::parse(repo) {
        Ok(mut url) if matches!(url.host_str(), Some("github.com") | Some("www.github.com")) => {
            match url.set_host(Some("gitmcp.io")) {
                Ok(()) => url.to_string(),
                Err(_) => repo.replace("github.com", "gitmcp.io"),
            }
        }
        _ => repo.replace("github.com", "gitmcp.io"),
    }
}

/// Classifies `input` and records the decision and routing payload
pub struct TriageNode {
    model: Arc<dyn Model>,
}

impl TriageNode {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self { model }
    }

    async fn classify(&self, input: &str) -> Result<Classification> {
        let prompt = vec![Content::user(format!("{}{}", TRIAGE_PROMPT, input))];
        match generate_typed::<TriageSchema>(self.model.as_ref(), &prompt).await {
            Ok(triage) => Ok(triage.classification),
            Err(ModelError::InvalidResponse(reason)) => {
                log::warn!("Triage reply not understood, treating as unknown: {}", reason);
                Ok(Classification::Unknown)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Node for TriageNode {
    async fn run(&self, state: &State) -> Result<StateUpdate> {
        let input = state.require_str("input")?;
        let classification = self.classify(input).await?;
        log::info!("Triage result: {}", classification.as_str());

        let update = StateUpdate::new().set("decision", classification.as_str());
        Ok(match classification {
            Classification::Topic | Classification::Github => update.set("data", input),
            Classification::Unknown => update
                .set("data", "")
                .message(Content::assistant(UNKNOWN_REQUEST)),
        })
    }
}

/// Model call for the GitHub branch. The MCP server depends on the
/// repository, so the tool binding is assembled per call.
struct GithubLlmNode {
    model: Arc<dyn Model>,
    email: ToolSpec,
}

#[async_trait]
impl Node for GithubLlmNode {
    async fn run(&self, state: &State) -> Result<StateUpdate> {
        let server_url = gitmcp_url(state.get_str("data").unwrap_or_default());
        log::info!("Binding gitmcp server {}", server_url);
        let tools = vec![self.email.clone(), ToolSpec::mcp("gitmcp", server_url)];

        let response = self
            .model
            .generate_content(state.messages(), None, &tools)
            .await?;
        Ok(StateUpdate::new().message(response))
    }
}

/// `set_message -> llm_node <-> tools`
fn research_loop(
    name: &str,
    set_message: impl Node + 'static,
    llm_node: impl Node + 'static,
    email: ToolSpec,
    step_limit: usize,
) -> std::result::Result<Workflow, GraphError> {
    WorkflowBuilder::new(name, schema())
        .add_node("set_message", set_message)
        .add_node("llm_node", llm_node)
        .add_node(TOOLS_NODE, ToolNode::from_specs(&[email]))
        .add_edge(START, "set_message")
        .add_edge("set_message", "llm_node")
        .add_conditional_edges("llm_node", tools_condition(), &[])
        .add_edge(TOOLS_NODE, "llm_node")
        .step_limit(step_limit)
        .compile()
}

fn topic_agent(
    model: Arc<dyn Model>,
    email: ToolSpec,
    step_limit: usize,
) -> std::result::Result<Workflow, GraphError> {
    let set_message = node_fn(|state: &State| {
        let data = state.get_str("data").unwrap_or_default();
        Ok(StateUpdate::new().message(Content::user(format!("{}{}", TOPIC_PROMPT, data))))
    });
    let llm_node = ChatNode::new(model, vec![email.clone(), ToolSpec::web_search()]);
    research_loop(TOPIC_AGENT, set_message, llm_node, email, step_limit)
}

fn github_agent(
    model: Arc<dyn Model>,
    email: ToolSpec,
    step_limit: usize,
) -> std::result::Result<Workflow, GraphError> {
    let set_message =
        node_fn(|_: &State| Ok(StateUpdate::new().message(Content::user(GITHUB_PROMPT))));
    let llm_node = GithubLlmNode {
        model,
        email: email.clone(),
    };
    research_loop(GITHUB_AGENT, set_message, llm_node, email, step_limit)
}

/// Compile the idea vault workflow. Emails go to `email`'s outbox.
pub fn build_workflow(
    model: Arc<dyn Model>,
    email: SendEmailTool,
    step_limit: usize,
) -> std::result::Result<Workflow, GraphError> {
    let email = ToolSpec::local(Arc::new(email));

    let route = FnRouter::new(&[TOPIC_AGENT, GITHUB_AGENT, END], |state: &State| {
        match state.get_str("decision") {
            Some("topic") => TOPIC_AGENT.to_string(),
            Some("github") => GITHUB_AGENT.to_string(),
            _ => END.to_string(),
        }
    });

    WorkflowBuilder::new("idea_vault", schema())
        .add_node(TRIAGE_NODE, TriageNode::new(model.clone()))
        .add_node(TOPIC_AGENT, topic_agent(model.clone(), email.clone(), step_limit)?)
        .add_node(GITHUB_AGENT, github_agent(model, email, step_limit)?)
        .add_edge(START, TRIAGE_NODE)
        .add_conditional_edges(TRIAGE_NODE, route, &[])
        .add_edge(TOPIC_AGENT, END)
        .add_edge(GITHUB_AGENT, END)
        .step_limit(step_limit)
        .compile()
}

/// Initial state for one submitted idea
pub fn initial_state(workflow: &Workflow, idea: &str) -> State {
    workflow.new_state().with("input", idea)
}
