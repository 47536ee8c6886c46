// SPDX-License-Identifier: MIT

//! Demonstration workflows

pub mod birthdate;
pub mod idea_vault;
pub mod tool_loop;
