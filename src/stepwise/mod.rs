// SPDX-License-Identifier: MIT

pub mod apps;
pub mod config;
pub mod server;
pub mod tools;
pub mod workflow;
