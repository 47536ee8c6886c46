// SPDX-License-Identifier: MIT

//! Agent development kit: messages, model backends, tools and agents

pub mod agent;
pub mod error;
pub mod model;
pub mod tool;
