// SPDX-License-Identifier: MIT

//! Directed-graph agent workflows over a shared state with an append-only
//! message history, conditional routing and model/tool loops.

pub mod adk;
pub mod stepwise;
