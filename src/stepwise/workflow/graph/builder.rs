// SPDX-License-Identifier: MIT

//! Workflow assembly and the compile step
//!
//! ```rust,no_run
//! use stepwise_rs::stepwise::workflow::graph::{node_fn, WorkflowBuilder, END, START};
//! use stepwise_rs::stepwise::workflow::state::{StateSchema, StateUpdate};
//!
//! let workflow = WorkflowBuilder::new("greeter", StateSchema::new())
//!     .add_node("greet", node_fn(|_| Ok(StateUpdate::new().set("greeting", "hello"))))
//!     .add_edge(START, "greet")
//!     .add_edge("greet", END)
//!     .compile()?;
//! # Ok::<(), stepwise_rs::adk::error::GraphError>(())
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use super::executor::{Workflow, DEFAULT_STEP_LIMIT};
use super::types::{Edge, Node, Router, Target, END, START};
use crate::adk::error::GraphError;
use crate::stepwise::workflow::state::StateSchema;

/// Collects nodes and edges, then validates them into a [`Workflow`]
pub struct WorkflowBuilder {
    name: String,
    schema: StateSchema,
    nodes: HashMap<String, Arc<dyn Node>>,
    order: Vec<String>,
    edges: BTreeMap<String, Edge>,
    start: Option<String>,
    step_limit: usize,
    errors: Vec<GraphError>,
}

impl WorkflowBuilder {
    pub fn new(name: impl Into<String>, schema: StateSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: BTreeMap::new(),
            start: None,
            step_limit: DEFAULT_STEP_LIMIT,
            errors: Vec::new(),
        }
    }

    /// Declare a node
    pub fn add_node(self, name: &str, node: impl Node + 'static) -> Self {
        self.add_shared_node(name, Arc::new(node))
    }

    /// Declare a node that is shared with other workflows
    pub fn add_shared_node(mut self, name: &str, node: Arc<dyn Node>) -> Self {
        if name == START || name == END {
            self.errors.push(GraphError::ReservedName(name.to_string()));
        } else if self.nodes.insert(name.to_string(), node).is_some() {
            self.errors.push(GraphError::DuplicateNode(name.to_string()));
        } else {
            self.order.push(name.to_string());
        }
        self
    }

    /// Unconditional edge; an edge from [`START`] sets the start node
    pub fn add_edge(mut self, from: &str, to: &str) -> Self {
        if from == START {
            return self.set_start(to);
        }
        self.insert_edge(from, Edge::Direct(Target::parse(to)));
        self
    }

    /// Conditional edge.
    ///
    /// `branches` maps router labels to node names or [`END`]. When empty,
    /// every label the router declares is taken as the node name itself.
    pub fn add_conditional_edges<R>(
        mut self,
        from: &str,
        router: R,
        branches: &[(&str, &str)],
    ) -> Self
    where
        R: Router + 'static,
    {
        let branches: HashMap<String, Target> = if branches.is_empty() {
            router
                .labels()
                .into_iter()
                .map(|label| {
                    let target = Target::parse(&label);
                    (label, target)
                })
                .collect()
        } else {
            branches
                .iter()
                .map(|(label, to)| (label.to_string(), Target::parse(to)))
                .collect()
        };

        self.insert_edge(
            from,
            Edge::Conditional {
                router: Arc::new(router),
                branches,
            },
        );
        self
    }

    pub fn set_start(mut self, node: &str) -> Self {
        self.start = Some(node.to_string());
        self
    }

    /// Maximum node executions per invocation
    pub fn step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    fn insert_edge(&mut self, from: &str, edge: Edge) {
        if self.edges.contains_key(from) {
            self.errors.push(GraphError::ConflictingEdges(from.to_string()));
        } else {
            self.edges.insert(from.to_string(), edge);
        }
    }

    /// Validate the graph and freeze it
    pub fn compile(self) -> Result<Workflow, GraphError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        let start = self
            .start
            .ok_or_else(|| GraphError::MissingStart(self.name.clone()))?;
        if !self.nodes.contains_key(&start) {
            return Err(GraphError::UnknownStart(start));
        }

        let declared: HashSet<&str> = self.nodes.keys().map(String::as_str).collect();
        let check_target = |from: &str, target: &Target| match target {
            Target::Node(name) if !declared.contains(name.as_str()) => Err(GraphError::UnknownNode {
                from: from.to_string(),
                target: name.clone(),
            }),
            _ => Ok(()),
        };

        for (from, edge) in &self.edges {
            if !declared.contains(from.as_str()) {
                return Err(GraphError::UnknownNode {
                    from: from.clone(),
                    target: from.clone(),
                });
            }
            match edge {
                Edge::Direct(target) => check_target(from, target)?,
                Edge::Conditional { router, branches } => {
                    let mut labels: Vec<&String> = branches.keys().collect();
                    labels.sort();
                    for label in labels {
                        check_target(from, &branches[label])?;
                    }
                    for label in router.labels() {
                        if !branches.contains_key(&label) {
                            return Err(GraphError::UnmappedLabel {
                                node: from.clone(),
                                label,
                            });
                        }
                    }
                }
            }
        }

        for name in &self.order {
            if !self.edges.contains_key(name) {
                return Err(GraphError::DeadEnd(name.clone()));
            }
        }

        log::debug!(
            "Compiled workflow '{}' with {} nodes, start '{}'",
            self.name,
            self.order.len(),
            start
        );

        Ok(Workflow::new(
            self.name,
            self.schema,
            self.nodes,
            self.edges.into_iter().collect(),
            start,
            self.step_limit,
        ))
    }
}
