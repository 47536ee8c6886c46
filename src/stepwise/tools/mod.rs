// SPDX-License-Identifier: MIT

//! Local tools used by the demonstration workflows

pub mod age;
pub mod calculator;
pub mod email;

pub use age::CalculateAgeTool;
pub use calculator::MultiplyTool;
pub use email::{Email, SendEmailTool};
