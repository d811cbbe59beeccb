//! Desired records: the attribute maps a host hands to the engine.
//!
//! A record is keyed by attribute name and holds loosely typed values. The
//! typed accessors return a [`ValidationError`] when an attribute is present
//! with the wrong shape, and `None` when it is unset, so request builders can
//! tell "left unset" apart from "explicitly zero".

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A desired-state attribute failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("attribute `{attribute}`: {reason}")]
pub struct ValidationError {
    pub attribute: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(attribute: &str) -> Self {
        Self::new(attribute, "is required")
    }

    fn wrong_type(attribute: &str, expected: &str, found: &AttrValue) -> Self {
        Self::new(
            attribute,
            format!("expected {}, found {}", expected, found.type_name()),
        )
    }
}

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    String(String),
    Bool(bool),
    Int(i64),
    List(Vec<String>),
    Set(Vec<DesiredRecord>),
    /// Opaque JSON document, kept as text.
    Json(String),
}

impl AttrValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::String(_) => "string",
            AttrValue::Bool(_) => "bool",
            AttrValue::Int(_) => "integer",
            AttrValue::List(_) => "list",
            AttrValue::Set(_) => "set",
            AttrValue::Json(_) => "document",
        }
    }

    /// Wrap a JSON document.
    pub fn json(document: &Value) -> Self {
        AttrValue::Json(document.to_string())
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(i64::from(value))
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        AttrValue::List(value)
    }
}

impl From<Vec<&str>> for AttrValue {
    fn from(value: Vec<&str>) -> Self {
        AttrValue::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<DesiredRecord>> for AttrValue {
    fn from(value: Vec<DesiredRecord>) -> Self {
        AttrValue::Set(value)
    }
}

/// Caller-supplied target attributes for one resource instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DesiredRecord {
    attrs: BTreeMap<String, AttrValue>,
}

impl DesiredRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<AttrValue>) {
        self.attrs.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn string(&self, name: &str) -> Result<Option<&str>, ValidationError> {
        match self.attrs.get(name) {
            None => Ok(None),
            Some(AttrValue::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ValidationError::wrong_type(name, "string", other)),
        }
    }

    pub fn required_string(&self, name: &str) -> Result<&str, ValidationError> {
        self.string(name)?
            .ok_or_else(|| ValidationError::missing(name))
    }

    pub fn int(&self, name: &str) -> Result<Option<i64>, ValidationError> {
        match self.attrs.get(name) {
            None => Ok(None),
            Some(AttrValue::Int(i)) => Ok(Some(*i)),
            Some(other) => Err(ValidationError::wrong_type(name, "integer", other)),
        }
    }

    pub fn bool(&self, name: &str) -> Result<Option<bool>, ValidationError> {
        match self.attrs.get(name) {
            None => Ok(None),
            Some(AttrValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(ValidationError::wrong_type(name, "bool", other)),
        }
    }

    pub fn list(&self, name: &str) -> Result<Option<&[String]>, ValidationError> {
        match self.attrs.get(name) {
            None => Ok(None),
            Some(AttrValue::List(items)) => Ok(Some(items.as_slice())),
            Some(other) => Err(ValidationError::wrong_type(name, "list", other)),
        }
    }

    /// Set of sub-records. An empty list is accepted as an empty set.
    pub fn set_of(&self, name: &str) -> Result<Option<&[DesiredRecord]>, ValidationError> {
        match self.attrs.get(name) {
            None => Ok(None),
            Some(AttrValue::Set(items)) => Ok(Some(items.as_slice())),
            Some(AttrValue::List(items)) if items.is_empty() => Ok(Some(&[])),
            Some(other) => Err(ValidationError::wrong_type(name, "set", other)),
        }
    }

    /// Embedded document text, given either as a string or as a document.
    pub fn document(&self, name: &str) -> Result<Option<&str>, ValidationError> {
        match self.attrs.get(name) {
            None => Ok(None),
            Some(AttrValue::String(s)) | Some(AttrValue::Json(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(ValidationError::wrong_type(name, "document", other)),
        }
    }

    /// Build a record from a JSON object. `null` members are treated as unset.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let object = value
            .as_object()
            .ok_or_else(|| ValidationError::new("<root>", "desired record must be a JSON object"))?;

        let mut record = DesiredRecord::new();
        for (name, member) in object {
            if let Some(attr) = attr_from_json(name, member)? {
                record.attrs.insert(name.clone(), attr);
            }
        }
        Ok(record)
    }
}

fn attr_from_json(name: &str, value: &Value) -> Result<Option<AttrValue>, ValidationError> {
    let attr = match value {
        Value::Null => return Ok(None),
        Value::String(s) => AttrValue::String(s.clone()),
        Value::Bool(b) => AttrValue::Bool(*b),
        Value::Number(n) => AttrValue::Int(
            n.as_i64()
                .ok_or_else(|| ValidationError::new(name, format!("{} is not an integer", n)))?,
        ),
        Value::Object(_) => AttrValue::json(value),
        Value::Array(items) => {
            if items.iter().all(Value::is_string) {
                AttrValue::List(
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                )
            } else if items.iter().all(Value::is_object) {
                AttrValue::Set(
                    items
                        .iter()
                        .map(DesiredRecord::from_json)
                        .collect::<Result<_, _>>()?,
                )
            } else {
                return Err(ValidationError::new(
                    name,
                    "lists must hold only strings or only objects",
                ));
            }
        }
    };
    Ok(Some(attr))
}
