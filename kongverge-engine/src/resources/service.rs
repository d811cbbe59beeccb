//! Upstream services.

use serde::{Deserialize, Serialize};

use super::{non_negative, owned, port, put, Resource, ResourceKind, UniqueKey};
use crate::desired::{DesiredRecord, ValidationError};
use crate::drift::DriftMode;

pub const DEFAULT_PORT: i64 = 80;
pub const DEFAULT_RETRIES: i64 = 5;
pub const DEFAULT_TIMEOUT_MS: i64 = 60_000;

/// Service as returned by the Admin API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: Option<String>,
    pub protocol: Option<String>,
    pub host: Option<String>,
    pub port: Option<i64>,
    pub path: Option<String>,
    pub retries: Option<i64>,
    pub connect_timeout: Option<i64>,
    pub write_timeout: Option<i64>,
    pub read_timeout: Option<i64>,
    pub created_at: Option<i64>,
}

/// Body for creating or updating a service. `None` fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<i64>,
}

impl Resource for Service {
    type Request = ServiceRequest;

    const KIND: ResourceKind = ResourceKind::Service;

    fn build_request(desired: &DesiredRecord) -> Result<ServiceRequest, ValidationError> {
        Ok(ServiceRequest {
            name: Some(desired.required_string("name")?.to_string()),
            protocol: Some(desired.required_string("protocol")?.to_string()),
            host: owned(desired.string("host")?),
            port: Some(port(desired, "port")?.unwrap_or(DEFAULT_PORT)),
            path: owned(desired.string("path")?),
            retries: Some(non_negative(desired, "retries")?.unwrap_or(DEFAULT_RETRIES)),
            connect_timeout: Some(
                non_negative(desired, "connect_timeout")?.unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
            write_timeout: Some(
                non_negative(desired, "write_timeout")?.unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
            read_timeout: Some(
                non_negative(desired, "read_timeout")?.unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn request_key(request: &ServiceRequest) -> Option<UniqueKey> {
        request
            .name
            .as_deref()
            .map(|name| UniqueKey::named("name", name))
    }

    fn record_key(&self) -> UniqueKey {
        UniqueKey::new().field("name", self.name.as_deref().unwrap_or(""))
    }

    fn to_state(&self, _drift: DriftMode) -> DesiredRecord {
        let mut state = DesiredRecord::new();
        put(&mut state, "name", self.name.clone());
        put(&mut state, "protocol", self.protocol.clone());
        put(&mut state, "host", self.host.clone());
        put(&mut state, "port", self.port);
        put(&mut state, "path", self.path.clone());
        put(&mut state, "retries", self.retries);
        put(&mut state, "connect_timeout", self.connect_timeout);
        put(&mut state, "write_timeout", self.write_timeout);
        put(&mut state, "read_timeout", self.read_timeout);
        state
    }
}
