// SPDX-License-Identifier: MIT

//! State schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Schema defining the workflow state structure.
///
/// The `messages` history is not declared here; every state carries it and it
/// is always append-only.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct StateSchema {
    /// Field definitions
    #[serde(flatten)]
    pub fields: HashMap<String, StateFieldDef>,
}

/// Definition of a single state field
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StateFieldDef {
    /// Type of the field
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Reducer for merging values
    #[serde(default)]
    pub reducer: ReducerType,
    /// Default value
    pub default: Option<serde_json::Value>,
}

/// Supported field types
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

/// Reducer types for merging values into state
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ReducerType {
    /// Replace the value (default)
    #[default]
    Overwrite,
    /// Concatenate onto an array
    Append,
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a last-write-wins field
    pub fn field(mut self, name: &str, field_type: FieldType) -> Self {
        self.fields.insert(
            name.to_string(),
            StateFieldDef {
                field_type,
                reducer: ReducerType::Overwrite,
                default: None,
            },
        );
        self
    }

    /// Declare an append-only array field
    pub fn list(mut self, name: &str) -> Self {
        self.fields.insert(
            name.to_string(),
            StateFieldDef {
                field_type: FieldType::Array,
                reducer: ReducerType::Append,
                default: None,
            },
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_schema_deserialize() {
        let schema: StateSchema = serde_json::from_value(json!({
            "decision": {"type": "string"},
            "score": {"type": "number", "default": 0.0},
            "findings": {"type": "array", "reducer": "append"}
        }))
        .unwrap();

        assert_eq!(schema.fields.len(), 3);
        assert_eq!(schema.fields["decision"].field_type, FieldType::String);
        assert_eq!(schema.fields["score"].default, Some(json!(0.0)));
        assert_eq!(schema.fields["findings"].reducer, ReducerType::Append);
    }

    #[test]
    fn test_reducer_default() {
        let def: StateFieldDef = serde_json::from_value(json!({"type": "string"})).unwrap();
        assert_eq!(def.reducer, ReducerType::Overwrite);
    }

    #[test]
    fn test_builder_helpers() {
        let schema = StateSchema::new()
            .field("input", FieldType::String)
            .list("notes");
        assert_eq!(schema.fields["input"].reducer, ReducerType::Overwrite);
        assert_eq!(schema.fields["notes"].field_type, FieldType::Array);
        assert_eq!(schema.fields["notes"].reducer, ReducerType::Append);
    }
}
