// SPDX-License-Identifier: MIT

//! Typed error handling for stepwise-rs
//!
//! Three layers of failure are kept apart:
//! - [`ModelError`] - anything that goes wrong talking to the chat backend
//! - [`GraphError`] - workflow assembly problems found at compile time, plus
//!   routing faults discovered while running
//! - [`StepwiseError`] - the top-level error returned from workflow invocation

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, StepwiseError>;

/// Top-level error type for stepwise-rs
#[derive(Debug, Error)]
pub enum StepwiseError {
    /// Configuration errors (missing env vars, invalid values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Chat backend failures
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Graph assembly or routing failures
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// A node failed while the workflow was running
    #[error("Node '{node}' failed: {source}")]
    Node {
        node: String,
        #[source]
        source: Box<StepwiseError>,
    },

    /// A field the node needs is missing from state or has the wrong shape
    #[error("State field '{0}' is missing or not a string")]
    MissingField(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

/// Chat backend errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// Non-success status returned by the backend
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response could not be interpreted
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    /// Transport errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Workflow graph errors
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    /// No start node was set before compiling
    #[error("Workflow '{0}' has no start node")]
    MissingStart(String),

    /// Start node is not a declared node
    #[error("Start node '{0}' is not declared")]
    UnknownStart(String),

    /// A node name was declared twice
    #[error("Node '{0}' is declared more than once")]
    DuplicateNode(String),

    /// A node used one of the reserved labels
    #[error("Node name '{0}' is reserved")]
    ReservedName(String),

    /// An edge starts or ends at an undeclared node
    #[error("Edge from '{from}' references undeclared node '{target}'")]
    UnknownNode { from: String, target: String },

    /// A node has more than one way out
    #[error("Node '{0}' has more than one outgoing edge")]
    ConflictingEdges(String),

    /// A node has no way out
    #[error("Node '{0}' has no outgoing edge")]
    DeadEnd(String),

    /// A router can produce a label the branch map does not cover
    #[error("Router on '{node}' can return '{label}', which has no branch")]
    UnmappedLabel { node: String, label: String },

    /// A router produced a label it never declared
    #[error("Router on '{node}' returned undeclared label '{label}'")]
    UnknownRoute { node: String, label: String },
}

impl StepwiseError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Wrap an error raised by a running node
    pub fn node(node: impl Into<String>, source: StepwiseError) -> Self {
        Self::Node {
            node: node.into(),
            source: Box::new(source),
        }
    }

    /// Create from a generic message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for StepwiseError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for StepwiseError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_error_names_node_and_cause() {
        let err = StepwiseError::node(
            "triage_agent",
            ModelError::InvalidResponse("empty".to_string()).into(),
        );
        let msg = err.to_string();
        assert!(msg.contains("triage_agent"));
        assert!(msg.contains("empty"));
    }

    #[test]
    fn test_graph_error_converts() {
        let err: StepwiseError = GraphError::DeadEnd("tools".to_string()).into();
        assert!(matches!(err, StepwiseError::Graph(GraphError::DeadEnd(_))));
    }

    #[test]
    fn test_from_str() {
        let err: StepwiseError = "boom".into();
        assert_eq!(err.to_string(), "boom");
    }
}
