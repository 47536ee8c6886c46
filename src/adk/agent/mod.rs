// SPDX-License-Identifier: MIT

//! Agent module - defines agent types for AI workflows
//!
//! - `ReActAgent` - model/tool loop compiled as a two-node workflow

mod react;

pub use react::ReActAgent;

use async_trait::async_trait;

use crate::adk::error::Result;

/// Core agent trait for all agent types
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the agent name
    fn name(&self) -> &str;

    /// Run the agent with the given input and return its final answer
    async fn run(&self, input: String) -> Result<String>;
}
