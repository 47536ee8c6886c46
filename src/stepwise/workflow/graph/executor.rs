// SPDX-License-Identifier: MIT

//! Workflow executor
//!
//! Runs one node at a time on a single state thread: run the node, merge its
//! update, ask the outgoing edge for the next node, stop at [`END`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::types::{Edge, Node, Target, END};
use crate::adk::error::{GraphError, Result, StepwiseError};
use crate::stepwise::workflow::state::{State, StateSchema, StateUpdate};

/// Node executions allowed per invocation unless configured otherwise
pub const DEFAULT_STEP_LIMIT: usize = 25;

/// Immutable compiled graph. Safe to share across concurrent invocations.
#[derive(Clone)]
pub struct Workflow {
    name: String,
    schema: StateSchema,
    nodes: HashMap<String, Arc<dyn Node>>,
    edges: HashMap<String, Edge>,
    start: String,
    step_limit: usize,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("start", &self.start)
            .field("step_limit", &self.step_limit)
            .finish()
    }
}

/// Outcome of one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub state: State,
    /// Node executions performed
    pub steps: usize,
    /// Nodes in the order they ran
    pub path: Vec<String>,
    /// True when a step limit cut the run or one of its sub-workflows short
    pub halted: bool,
}

impl Workflow {
    pub(crate) fn new(
        name: String,
        schema: StateSchema,
        nodes: HashMap<String, Arc<dyn Node>>,
        edges: HashMap<String, Edge>,
        start: String,
        step_limit: usize,
    ) -> Self {
        Self {
            name,
            schema,
            nodes,
            edges,
            start,
            step_limit,
        }
    }

    pub fn step_limit(&self) -> usize {
        self.step_limit
    }

    /// Fresh state carrying this workflow's defaults and reducers
    pub fn new_state(&self) -> State {
        State::new(&self.schema)
    }

    /// Run to completion and return the final state
    pub async fn invoke(&self, initial: State) -> Result<State> {
        Ok(self.execute(initial).await?.state)
    }

    /// Run to completion and report how the run went
    pub async fn execute(&self, initial: State) -> Result<Execution> {
        let mut state = initial;
        let mut current = self.start.clone();
        let mut path = Vec::new();
        let mut nested_halt = false;

        loop {
            if path.len() >= self.step_limit {
                log::warn!(
                    "Workflow {} stopped after {} steps before reaching {}, next node was {}",
                    self.name,
                    path.len(),
                    END,
                    current
                );
                return Ok(Execution {
                    state,
                    steps: path.len(),
                    path,
                    halted: true,
                });
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| GraphError::UnknownNode {
                    from: self.name.clone(),
                    target: current.clone(),
                })?;

            log::info!(
                "Workflow {} step {}: running node {}",
                self.name,
                path.len() + 1,
                current
            );

            let update = node
                .run(&state)
                .await
                .map_err(|e| StepwiseError::node(current.clone(), e))?;
            if update.is_halted() {
                log::warn!("Workflow {} node {} was cut short", self.name, current);
                nested_halt = true;
            }
            state.apply(update);
            path.push(current.clone());

            match self.next_target(&current, &state)? {
                Target::End => {
                    log::info!("Workflow {} finished after {} steps", self.name, path.len());
                    return Ok(Execution {
                        state,
                        steps: path.len(),
                        path,
                        halted: nested_halt,
                    });
                }
                Target::Node(next) => current = next,
            }
        }
    }

    /// Resolve the outgoing edge of `node` against the updated state
    fn next_target(&self, node: &str, state: &State) -> Result<Target> {
        let edge = self
            .edges
            .get(node)
            .ok_or_else(|| GraphError::DeadEnd(node.to_string()))?;

        match edge {
            Edge::Direct(target) => Ok(target.clone()),
            Edge::Conditional { router, branches } => {
                let label = router.route(state);
                log::debug!("Router on {} chose '{}'", node, label);
                branches.get(&label).cloned().ok_or_else(|| {
                    GraphError::UnknownRoute {
                        node: node.to_string(),
                        label,
                    }
                    .into()
                })
            }
        }
    }
}

/// A compiled workflow mounted as a node contributes what it added, flagged
/// as halted when it did not finish.
#[async_trait]
impl Node for Workflow {
    async fn run(&self, state: &State) -> Result<StateUpdate> {
        let execution = self.execute(state.clone()).await?;
        let delta = execution.state.delta_since(state);
        if execution.halted {
            log::warn!("Sub-workflow {} returned a partial result", self.name);
            return Ok(delta.mark_halted());
        }
        Ok(delta)
    }
}
