// SPDX-License-Identifier: MIT

//! Directed-graph workflow engine
//!
//! Nodes transform a shared [`State`](crate::stepwise::workflow::state::State);
//! edges are either unconditional or pick the next node through a
//! [`Router`]. A [`WorkflowBuilder`] validates the graph into an immutable
//! [`Workflow`].

mod builder;
pub mod executor;
pub mod types;

pub use builder::WorkflowBuilder;
pub use executor::{Execution, Workflow, DEFAULT_STEP_LIMIT};
pub use types::{node_fn, Edge, FnNode, FnRouter, Node, Router, Target, END, START};
