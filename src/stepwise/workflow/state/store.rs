// SPDX-License-Identifier: MIT

//! Runtime state storage for workflow execution

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::schema::{FieldType, ReducerType, StateSchema};
use crate::adk::error::{Result, StepwiseError};
use crate::adk::model::Content;

/// Name of the append-only conversation history
pub const MESSAGES: &str = "messages";

/// Runtime workflow state with reducer support.
///
/// Only [`State::apply`] and [`State::update`] mutate it; routers and nodes
/// receive `&State`.
#[derive(Debug, Clone, Default)]
pub struct State {
    messages: Vec<Content>,
    /// Current state values
    fields: Map<String, Value>,
    /// Reducers for each field
    reducers: HashMap<String, ReducerType>,
}

/// Partial update returned by a node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    messages: Vec<Content>,
    values: Vec<(String, Value)>,
    /// Set when the work behind this update was cut short by a step limit
    halted: bool,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field; merged with the field's reducer
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((key.into(), value.into()));
        self
    }

    /// Append one message to the history
    pub fn message(mut self, content: Content) -> Self {
        self.messages.push(content);
        self
    }

    /// Append several messages to the history
    pub fn messages(mut self, contents: impl IntoIterator<Item = Content>) -> Self {
        self.messages.extend(contents);
        self
    }

    pub fn appended_messages(&self) -> &[Content] {
        &self.messages
    }

    /// Last value set for `key` in this update
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Flag the update as the partial result of a halted run
    pub fn mark_halted(mut self) -> Self {
        self.halted = true;
        self
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.values.is_empty()
    }
}

impl State {
    /// Create a new State from a schema
    pub fn new(schema: &StateSchema) -> Self {
        let mut fields = Map::new();
        let mut reducers = HashMap::new();

        for (name, def) in &schema.fields {
            match (&def.default, def.field_type, def.reducer) {
                (Some(default), _, _) => {
                    fields.insert(name.clone(), default.clone());
                }
                (None, FieldType::Array, ReducerType::Append) => {
                    fields.insert(name.clone(), Value::Array(vec![]));
                }
                _ => {}
            }
            reducers.insert(name.clone(), def.reducer);
        }

        Self {
            messages: Vec::new(),
            fields,
            reducers,
        }
    }

    /// Create an empty State
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder-style field update
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.update(key, value.into());
        self
    }

    /// Builder-style message append
    pub fn with_message(mut self, content: Content) -> Self {
        self.messages.push(content);
        self
    }

    /// Merge a node's partial update.
    ///
    /// Messages are concatenated; every other field goes through its reducer.
    pub fn apply(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);
        for (key, value) in update.values {
            self.update(&key, value);
        }
    }

    /// Update a field using the appropriate reducer
    pub fn update(&mut self, key: &str, value: Value) {
        if key == MESSAGES {
            self.append_message_value(value);
            return;
        }

        let reducer = self
            .reducers
            .get(key)
            .copied()
            .unwrap_or(ReducerType::Overwrite);

        match reducer {
            ReducerType::Overwrite => {
                self.fields.insert(key.to_string(), value);
            }
            ReducerType::Append => {
                let arr = self
                    .fields
                    .entry(key.to_string())
                    .or_insert(Value::Array(vec![]));
                match arr {
                    Value::Array(a) => match value {
                        Value::Array(new_items) => a.extend(new_items),
                        other => a.push(other),
                    },
                    other => {
                        log::warn!(
                            "Field '{}' is append-only but holds {}, replacing",
                            key,
                            other
                        );
                        *other = match value {
                            Value::Array(items) => Value::Array(items),
                            item => Value::Array(vec![item]),
                        };
                    }
                }
            }
        }
    }

    fn append_message_value(&mut self, value: Value) {
        let parsed = match value {
            Value::Array(_) => serde_json::from_value::<Vec<Content>>(value),
            single => serde_json::from_value::<Content>(single).map(|c| vec![c]),
        };
        match parsed {
            Ok(contents) => self.messages.extend(contents),
            Err(e) => log::warn!("Ignoring malformed message update: {}", e),
        }
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Get a string field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Get a string field a node cannot do without
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key)
            .ok_or_else(|| StepwiseError::MissingField(key.to_string()))
    }

    /// Conversation history, oldest first
    pub fn messages(&self) -> &[Content] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Content> {
        self.messages.last()
    }

    /// Everything this state gained since `before`.
    ///
    /// Applying the result to `before` reproduces `self`, which is how a
    /// nested workflow hands its work back to the enclosing one.
    pub fn delta_since(&self, before: &State) -> StateUpdate {
        let mut update = StateUpdate::new();

        if let Some(new_messages) = self.messages.get(before.messages.len()..) {
            update = update.messages(new_messages.iter().cloned());
        }

        for (key, value) in &self.fields {
            let old = before.fields.get(key);
            if old == Some(value) {
                continue;
            }
            let reducer = before
                .reducers
                .get(key)
                .copied()
                .unwrap_or(ReducerType::Overwrite);
            match (reducer, old, value) {
                (ReducerType::Append, Some(Value::Array(old)), Value::Array(new))
                    if new.starts_with(old) =>
                {
                    update = update.set(key.clone(), Value::Array(new[old.len()..].to_vec()));
                }
                _ => {
                    update = update.set(key.clone(), value.clone());
                }
            }
        }

        update
    }

    /// Convert state to a JSON object
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.messages == other.messages && self.fields == other.fields
    }
}

impl Serialize for State {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(MESSAGES, &self.messages)?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stepwise::workflow::state::schema::StateFieldDef;
    use serde_json::json;

    fn make_schema(fields: Vec<(&str, FieldType, ReducerType, Option<Value>)>) -> StateSchema {
        let mut schema = StateSchema::default();
        for (name, field_type, reducer, default) in fields {
            schema.fields.insert(
                name.to_string(),
                StateFieldDef {
                    field_type,
                    reducer,
                    default,
                },
            );
        }
        schema
    }

    #[test]
    fn test_empty_state() {
        let state = State::empty();
        assert!(state.get("anything").is_none());
        assert!(state.messages().is_empty());
    }

    #[test]
    fn test_state_with_defaults() {
        let schema = make_schema(vec![
            ("decision", FieldType::String, ReducerType::Overwrite, Some(json!("unknown"))),
            ("notes", FieldType::Array, ReducerType::Append, None),
        ]);
        let state = State::new(&schema);

        assert_eq!(state.get("decision"), Some(&json!("unknown")));
        assert_eq!(state.get("notes"), Some(&json!([])));
    }

    #[test]
    fn test_overwrite_reducer() {
        let mut state = State::empty();
        state.update("value", json!("first"));
        state.update("value", json!("second"));
        assert_eq!(state.get("value"), Some(&json!("second")));
    }

    #[test]
    fn test_append_reducer() {
        let schema = make_schema(vec![("items", FieldType::Array, ReducerType::Append, None)]);
        let mut state = State::new(&schema);

        state.update("items", json!("item1"));
        state.update("items", json!(["item2", "item3"]));
        assert_eq!(state.get("items"), Some(&json!(["item1", "item2", "item3"])));
    }

    #[test]
    fn test_apply_concatenates_messages() {
        let mut state = State::empty().with_message(Content::user("hi"));
        let before = state.messages().len();

        let update = StateUpdate::new()
            .message(Content::assistant("hello"))
            .message(Content::assistant("again"))
            .set("decision", "topic");
        let added = update.appended_messages().len();
        state.apply(update);

        assert_eq!(state.messages().len(), before + added);
        assert_eq!(state.messages()[0], Content::user("hi"));
        assert_eq!(state.get_str("decision"), Some("topic"));
    }

    #[test]
    fn test_message_values_route_to_history() {
        let mut state = State::empty();
        state.update(MESSAGES, serde_json::to_value(Content::user("x")).unwrap());
        assert_eq!(state.messages().len(), 1);
        assert!(state.get(MESSAGES).is_none());
    }

    #[test]
    fn test_require_str() {
        let state = State::empty().with("name", "Matt Bellamy").with("count", 3);
        assert_eq!(state.require_str("name").unwrap(), "Matt Bellamy");
        assert!(matches!(
            state.require_str("count"),
            Err(StepwiseError::MissingField(_))
        ));
    }

    #[test]
    fn test_delta_round_trips_onto_before() {
        let schema = make_schema(vec![("notes", FieldType::Array, ReducerType::Append, None)]);
        let before = State::new(&schema)
            .with("input", "rust")
            .with("notes", json!("a"))
            .with_message(Content::user("hi"));

        let mut after = before.clone();
        after.apply(
            StateUpdate::new()
                .message(Content::assistant("hello"))
                .set("notes", json!("b"))
                .set("data", "rust"),
        );

        let delta = after.delta_since(&before);
        assert_eq!(delta.appended_messages().len(), 1);
        assert_eq!(delta.get("notes"), Some(&json!(["b"])));
        assert!(delta.get("input").is_none());

        let mut replayed = before.clone();
        replayed.apply(delta);
        assert_eq!(replayed, after);
    }

    #[test]
    fn test_halted_flag_is_not_state() {
        let update = StateUpdate::new().set("data", "partial").mark_halted();
        assert!(update.is_halted());
        assert!(!update.is_empty());

        let mut state = State::empty();
        state.apply(update);
        assert_eq!(state.get_str("data"), Some("partial"));
        assert!(state.get("halted").is_none());
    }

    #[test]
    fn test_to_json_includes_messages() {
        let state = State::empty().with("a", 1).with_message(Content::user("q"));
        let json = state.to_json();
        assert_eq!(json["a"], 1);
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
