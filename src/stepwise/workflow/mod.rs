// SPDX-License-Identifier: MIT

pub mod graph;
pub mod prebuilt;
pub mod state;
