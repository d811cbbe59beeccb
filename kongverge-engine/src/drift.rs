//! Drift normalization for schemaless plugin configuration.
//!
//! The Admin API echoes plugin config back with server-computed keys mixed
//! in. Those keys are stripped and the remainder serialized with sorted keys,
//! so the same configuration always yields the same text.

use serde_json::{Map, Value};

use crate::desired::ValidationError;

/// Keys the Admin API computes; never part of the tracked configuration.
pub const COMPUTED_CONFIG_KEYS: &[&str] = &["created_at", "id", "consumer", "service", "route"];

/// How an observed configuration is surfaced to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftMode {
    /// Observed config is the tracked value; any difference is drift.
    Strict,
    /// Observed config is reported separately and may be ignored.
    Lenient,
}

impl DriftMode {
    /// Per-instance override wins, otherwise the process-wide default.
    pub fn resolve(instance_override: Option<bool>, strict_default: bool) -> Self {
        if instance_override.unwrap_or(strict_default) {
            DriftMode::Strict
        } else {
            DriftMode::Lenient
        }
    }
}

/// Canonical text of a remote configuration mapping.
pub fn canonical_config(config: &Map<String, Value>) -> String {
    let mut retained = Map::new();
    let mut keys: Vec<&String> = config
        .keys()
        .filter(|key| !COMPUTED_CONFIG_KEYS.contains(&key.as_str()))
        .collect();
    keys.sort();
    for key in keys {
        if let Some(value) = config.get(key) {
            retained.insert(key.clone(), sorted(value));
        }
    }
    Value::Object(retained).to_string()
}

/// Validate and canonicalize a desired configuration document.
///
/// The document must be a JSON object.
pub fn normalize_document(attribute: &str, text: &str) -> Result<String, ValidationError> {
    Ok(canonical_config(&parse_document(attribute, text)?))
}

/// Parse a desired configuration document into a mapping.
pub fn parse_document(attribute: &str, text: &str) -> Result<Map<String, Value>, ValidationError> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        ValidationError::new(attribute, format!("failed to unmarshal {}: {}", attribute, e))
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ValidationError::new(
            attribute,
            format!("must be a JSON object, got {}", json_type(&other)),
        )),
    }
}

/// Whether the observed canonical config differs from the desired document.
///
/// An unset desired document never drifts.
pub fn has_drift(
    attribute: &str,
    desired: Option<&str>,
    observed: &str,
) -> Result<bool, ValidationError> {
    match desired {
        None => Ok(false),
        Some(text) if text.is_empty() => Ok(false),
        Some(text) => Ok(normalize_document(attribute, text)? != observed),
    }
}

// Rebuild objects with keys inserted in sorted order so output does not
// depend on whether serde_json preserves insertion order.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                if let Some(inner) = map.get(key) {
                    out.insert(key.clone(), sorted(inner));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
