//! Resource kinds managed through the Admin API.
//!
//! Each kind supplies its remote record shape, its request shape, the
//! mapping from a [`DesiredRecord`] to a request, and its unique key.

pub mod consumer;
pub mod plugin;
pub mod route;
pub mod service;

pub use consumer::{Consumer, ConsumerRequest};
pub use plugin::{Plugin, PluginRequest};
pub use route::{IpPort, Route, RouteRequest};
pub use service::{Service, ServiceRequest};

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::desired::{AttrValue, DesiredRecord, ValidationError};
use crate::drift::DriftMode;

/// Resource kinds the engine knows how to reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Service,
    Route,
    Plugin,
    Consumer,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Service,
        ResourceKind::Route,
        ResourceKind::Plugin,
        ResourceKind::Consumer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Service => "service",
            ResourceKind::Route => "route",
            ResourceKind::Plugin => "plugin",
            ResourceKind::Consumer => "consumer",
        }
    }

    /// Admin API collection path segment.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Service => "services",
            ResourceKind::Route => "routes",
            ResourceKind::Plugin => "plugins",
            ResourceKind::Consumer => "consumers",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || kind.collection() == s)
            .ok_or_else(|| format!("unknown resource kind: {}", s))
    }
}

/// Reference to an owning entity, as the Admin API encodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    pub id: String,
}

impl IdRef {
    pub fn from_attr(id: Option<&str>) -> Option<IdRef> {
        id.map(|id| IdRef { id: id.to_string() })
    }
}

/// Identifier of an optional reference; unset is the empty string.
pub fn ref_id(reference: &Option<IdRef>) -> &str {
    reference.as_ref().map_or("", |r| r.id.as_str())
}

/// Attribute tuple the Admin API enforces uniqueness over.
///
/// Unset owner references are stored as the empty string, matching how the
/// API compares them.
#[derive(Debug, Clone, Default)]
pub struct UniqueKey {
    fields: Vec<(&'static str, String)>,
    lookup: Option<String>,
}

impl UniqueKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key on a single addressable name.
    pub fn named(field: &'static str, name: &str) -> Self {
        Self {
            fields: vec![(field, name.to_string())],
            lookup: Some(name.to_string()),
        }
    }

    pub fn field(mut self, name: &'static str, value: &str) -> Self {
        self.fields.push((name, value.to_string()));
        self
    }

    pub fn reference(self, name: &'static str, reference: &Option<IdRef>) -> Self {
        let id = ref_id(reference).to_string();
        self.field(name, &id)
    }

    /// Value usable with `get_by_unique_key`, if the key is addressable.
    pub fn lookup(&self) -> Option<&str> {
        self.lookup.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether every field of this key has the same value in `record`.
    pub fn matches(&self, record: &UniqueKey) -> bool {
        !self.fields.is_empty()
            && self
                .fields
                .iter()
                .all(|(name, value)| record.get(name) == Some(value.as_str()))
    }
}

impl fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| format!("{}={:?}", name, value))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// A resource kind: remote record shape plus its request mapping.
pub trait Resource:
    Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Request body for create and update.
    type Request: Clone + fmt::Debug + Serialize + Send + Sync + 'static;

    const KIND: ResourceKind;

    /// Map desired attributes to a request.
    fn build_request(desired: &DesiredRecord) -> Result<Self::Request, ValidationError>;

    /// Server-assigned identifier.
    fn id(&self) -> &str;

    /// Unique key a request would collide on. `None` when the request
    /// carries nothing an existing resource could be adopted by.
    fn request_key(request: &Self::Request) -> Option<UniqueKey>;

    /// Unique-key attributes of an existing record.
    fn record_key(&self) -> UniqueKey;

    /// Render the record as attributes for the host's state.
    fn to_state(&self, drift: DriftMode) -> DesiredRecord;
}

pub(crate) fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_string)
}

pub(crate) fn owned_list(value: Option<&[String]>) -> Option<Vec<String>> {
    value.map(<[String]>::to_vec)
}

pub(crate) fn put<T: Into<AttrValue>>(state: &mut DesiredRecord, name: &str, value: Option<T>) {
    if let Some(value) = value {
        state.set(name, value);
    }
}

pub(crate) fn port(desired: &DesiredRecord, name: &str) -> Result<Option<i64>, ValidationError> {
    match desired.int(name)? {
        Some(p) if !(0..=65535).contains(&p) => Err(ValidationError::new(
            name,
            format!("{} is not a valid port", p),
        )),
        other => Ok(other),
    }
}

pub(crate) fn non_negative(
    desired: &DesiredRecord,
    name: &str,
) -> Result<Option<i64>, ValidationError> {
    match desired.int(name)? {
        Some(v) if v < 0 => Err(ValidationError::new(name, "must not be negative")),
        other => Ok(other),
    }
}
