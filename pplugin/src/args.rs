//! Argument parsing helpers for action plugins.
//!
//! Markers carry one raw argument string. Plugins that want structure can
//! treat it as JSON or as a comma-separated list.
//!
//! ```rust
//! use pplugin::{parse_json_object, required_string, split_arguments};
//!
//! let args = parse_json_object(r#"{"food":"tuna"}"#).expect("object should parse");
//! assert_eq!(required_string(&args, "food").expect("food"), "tuna");
//! assert_eq!(split_arguments(" ball, yarn ,"), vec!["ball", "yarn"]);
//! ```

use serde_json::{Map, Value};

use crate::PluginError;

pub fn parse_json_value(arguments: &str) -> Result<Value, PluginError> {
    serde_json::from_str(arguments)
        .map_err(|err| PluginError::invalid_arguments(format!("invalid JSON arguments: {err}")))
}

pub fn parse_json_object(arguments: &str) -> Result<Map<String, Value>, PluginError> {
    match parse_json_value(arguments)? {
        Value::Object(map) => Ok(map),
        _ => Err(PluginError::invalid_arguments("expected JSON object arguments")),
    }
}

pub fn required_string(args: &Map<String, Value>, key: &str) -> Result<String, PluginError> {
    optional_string(args, key)
        .ok_or_else(|| PluginError::invalid_arguments(format!("missing required string: '{key}'")))
}

pub fn optional_string(args: &Map<String, Value>, key: &str) -> Option<String> {
    args.get(key).and_then(Value::as_str).map(ToString::to_string)
}

/// Splits on commas, trimming items and dropping empty ones.
pub fn split_arguments(arguments: &str) -> Vec<String> {
    arguments
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}
