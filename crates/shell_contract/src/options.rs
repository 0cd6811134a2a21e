//! Flat option bag handed to command handlers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named option values plus the ordered list of bare (positional) tokens.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommandOptions {
    #[serde(default)]
    named: BTreeMap<String, Value>,
    #[serde(default, rename = "_")]
    positional: Vec<Value>,
}

impl CommandOptions {
    /// Creates an empty option bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `key` is bound.
    pub fn contains(&self, key: &str) -> bool {
        self.named.contains_key(key)
    }

    /// Returns the value bound to `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.named.get(key)
    }

    /// Returns the value bound to `key` when it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.named.get(key).and_then(Value::as_str)
    }

    /// Returns the value bound to `key` rendered as text.
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.named.get(key).map(display_value)
    }

    /// Returns the value bound to `key` as an unsigned integer, parsing numeric strings.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.named.get(key)? {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns whether `key` is bound to boolean `true`.
    pub fn is_set(&self, key: &str) -> bool {
        matches!(self.named.get(key), Some(Value::Bool(true)))
    }

    /// Binds `value` to `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.named.insert(key.into(), value)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.named.remove(key)
    }

    /// Iterates named values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.named.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns the unconsumed positional values.
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Appends one positional value.
    pub fn push_positional(&mut self, value: Value) {
        self.positional.push(value);
    }

    /// Removes and returns the leftmost positional value.
    pub fn take_positional(&mut self) -> Option<Value> {
        if self.positional.is_empty() {
            None
        } else {
            Some(self.positional.remove(0))
        }
    }

    /// Binds every pair from `overrides`, replacing existing keys.
    pub fn merge<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.named.extend(overrides);
    }
}

/// Renders a value the way it is shown to users and matched by pattern validators.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}
