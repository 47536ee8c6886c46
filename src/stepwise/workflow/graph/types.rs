// SPDX-License-Identifier: MIT

//! Graph building blocks: nodes, routers and edges

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::adk::error::Result;
use crate::stepwise::workflow::state::{State, StateUpdate};

/// Reserved label for the graph entry
pub const START: &str = "__start__";
/// Reserved label that terminates an invocation
pub const END: &str = "__end__";

/// A named unit of work: reads the state, returns a partial update
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, state: &State) -> Result<StateUpdate>;
}

/// Node backed by a synchronous closure
pub struct FnNode<F> {
    f: F,
}

/// Wrap a closure as a [`Node`]
pub fn node_fn<F>(f: F) -> FnNode<F>
where
    F: Fn(&State) -> Result<StateUpdate> + Send + Sync,
{
    FnNode { f }
}

#[async_trait]
impl<F> Node for FnNode<F>
where
    F: Fn(&State) -> Result<StateUpdate> + Send + Sync,
{
    async fn run(&self, state: &State) -> Result<StateUpdate> {
        (self.f)(state)
    }
}

/// Where an edge leads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Node(String),
    End,
}

impl Target {
    pub fn parse(label: &str) -> Self {
        if label == END {
            Target::End
        } else {
            Target::Node(label.to_string())
        }
    }
}

impl From<&str> for Target {
    fn from(label: &str) -> Self {
        Target::parse(label)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Node(name) => f.write_str(name),
            Target::End => f.write_str(END),
        }
    }
}

/// Picks the next label from the updated state.
///
/// `labels` lists every value `route` can return, so the branch map can be
/// checked when the workflow is compiled.
pub trait Router: Send + Sync {
    fn labels(&self) -> Vec<String>;
    fn route(&self, state: &State) -> String;
}

/// Router backed by a closure and a declared label set
pub struct FnRouter<F> {
    labels: Vec<String>,
    route: F,
}

impl<F> FnRouter<F>
where
    F: Fn(&State) -> String + Send + Sync,
{
    pub fn new(labels: &[&str], route: F) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            route,
        }
    }
}

impl<F> Router for FnRouter<F>
where
    F: Fn(&State) -> String + Send + Sync,
{
    fn labels(&self) -> Vec<String> {
        self.labels.clone()
    }

    fn route(&self, state: &State) -> String {
        (self.route)(state)
    }
}

/// Outgoing edge of a node
#[derive(Clone)]
pub enum Edge {
    /// Always proceed to the target
    Direct(Target),
    /// Ask the router, then resolve its label through `branches`
    Conditional {
        router: Arc<dyn Router>,
        branches: HashMap<String, Target>,
    },
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Direct(target) => f.debug_tuple("Direct").field(target).finish(),
            Edge::Conditional { branches, .. } => f
                .debug_struct("Conditional")
                .field("branches", branches)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parse() {
        assert_eq!(Target::parse(END), Target::End);
        assert_eq!(Target::parse("tools"), Target::Node("tools".to_string()));
        assert_eq!(Target::End.to_string(), "__end__");
    }

    #[tokio::test]
    async fn test_fn_node_runs_closure() {
        let node = node_fn(|state: &State| {
            let name = state.require_str("name")?;
            Ok(StateUpdate::new().set("greeting", format!("hi {}", name)))
        });
        let update = node.run(&State::empty().with("name", "Ada")).await.unwrap();
        assert_eq!(update.get("greeting").and_then(|v| v.as_str()), Some("hi Ada"));
    }

    #[test]
    fn test_fn_router_declares_labels() {
        let router = FnRouter::new(&["yes", END], |state: &State| {
            if state.get("ok").is_some() {
                "yes".to_string()
            } else {
                END.to_string()
            }
        });
        assert_eq!(router.labels(), vec!["yes".to_string(), END.to_string()]);
        assert_eq!(router.route(&State::empty()), END);
        assert_eq!(router.route(&State::empty().with("ok", true)), "yes");
    }
}
