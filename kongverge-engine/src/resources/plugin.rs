//! Plugins, optionally scoped to a consumer, service or route.
//!
//! Plugin config is a schemaless document. It is captured through the drift
//! normalizer rather than attribute by attribute.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{put, ref_id, IdRef, Resource, ResourceKind, UniqueKey};
use crate::desired::{DesiredRecord, ValidationError};
use crate::drift::{self, DriftMode};

/// Plugin as returned by the Admin API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub id: String,
    pub name: String,
    pub consumer: Option<IdRef>,
    pub service: Option<IdRef>,
    pub route: Option<IdRef>,
    pub enabled: Option<bool>,
    pub config: Option<Map<String, Value>>,
    pub created_at: Option<i64>,
}

impl Plugin {
    /// Canonical text of the remote config.
    pub fn canonical_config(&self) -> String {
        self.config
            .as_ref()
            .map(drift::canonical_config)
            .unwrap_or_else(|| drift::canonical_config(&Map::new()))
    }
}

/// Body for creating or updating a plugin.
///
/// Owner references are always sent so an update can clear them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginRequest {
    pub name: String,
    pub consumer: Option<IdRef>,
    pub service: Option<IdRef>,
    pub route: Option<IdRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
}

impl Resource for Plugin {
    type Request = PluginRequest;

    const KIND: ResourceKind = ResourceKind::Plugin;

    fn build_request(desired: &DesiredRecord) -> Result<PluginRequest, ValidationError> {
        let config = match desired.document("config_json")? {
            Some(text) if !text.is_empty() => Some(drift::parse_document("config_json", text)?),
            _ => None,
        };

        Ok(PluginRequest {
            name: desired.required_string("name")?.to_string(),
            consumer: IdRef::from_attr(non_empty(desired.string("consumer_id")?)),
            service: IdRef::from_attr(non_empty(desired.string("service_id")?)),
            route: IdRef::from_attr(non_empty(desired.string("route_id")?)),
            enabled: Some(desired.bool("enabled")?.unwrap_or(true)),
            config,
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn request_key(request: &PluginRequest) -> Option<UniqueKey> {
        Some(
            UniqueKey::new()
                .field("name", &request.name)
                .reference("consumer", &request.consumer)
                .reference("route", &request.route)
                .reference("service", &request.service),
        )
    }

    fn record_key(&self) -> UniqueKey {
        UniqueKey::new()
            .field("name", &self.name)
            .reference("consumer", &self.consumer)
            .reference("route", &self.route)
            .reference("service", &self.service)
    }

    fn to_state(&self, drift: DriftMode) -> DesiredRecord {
        let mut state = DesiredRecord::new().with("name", self.name.as_str());
        for (attribute, reference) in [
            ("consumer_id", &self.consumer),
            ("service_id", &self.service),
            ("route_id", &self.route),
        ] {
            if reference.is_some() {
                state.set(attribute, ref_id(reference));
            }
        }
        put(&mut state, "enabled", self.enabled);

        let observed = self.canonical_config();
        match drift {
            DriftMode::Strict => state.set("config_json", observed),
            DriftMode::Lenient => state.set("computed_config", observed),
        }
        state
    }
}

// An empty reference is the same as no reference.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
