// SPDX-License-Identifier: MIT

use crate::adk::tool::Tool;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::error::Error;

static MULTIPLY_SCHEMA: Lazy<Value> = Lazy::new(|| {
    let mut schema = serde_json::to_value(schemars::schema_for!(MultiplyArgs)).unwrap_or_default();
    if let Value::Object(obj) = &mut schema {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
});

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MultiplyArgs {
    /// First factor
    pub a: i64,
    /// Second factor
    pub b: i64,
}

/// Multiplies two integers
pub struct MultiplyTool;

#[async_trait]
impl Tool for MultiplyTool {
    fn name(&self) -> &str {
        "multiply"
    }

    fn description(&self) -> &str {
        "Multiply two numbers."
    }

    fn schema(&self) -> &Value {
        &MULTIPLY_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>> {
        let args: MultiplyArgs = serde_json::from_value(input)?;
        let product = args
            .a
            .checked_mul(args.b)
            .ok_or_else(|| format!("{} x {} overflows", args.a, args.b))?;
        log::debug!("multiply {} x {} = {}", args.a, args.b, product);
        Ok(json!(product))
    }
}
