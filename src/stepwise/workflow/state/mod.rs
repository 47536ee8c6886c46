// SPDX-License-Identifier: MIT

//! State management for workflows
//!
//! This module provides:
//! - `StateSchema` - declares the fields a workflow's state carries
//! - `State` - runtime state with the append-only message history
//! - `StateUpdate` - the partial update a node hands back
//! - `ReducerType` - how an update is merged into a field

mod schema;
mod store;

pub use schema::{FieldType, ReducerType, StateFieldDef, StateSchema};
pub use store::{State, StateUpdate, MESSAGES};
