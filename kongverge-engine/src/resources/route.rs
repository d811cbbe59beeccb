//! Routes attached to services.

use serde::{Deserialize, Serialize};

use super::{
    owned, owned_list, port, put, ref_id, IdRef, Resource, ResourceKind, UniqueKey,
};
use crate::desired::{DesiredRecord, ValidationError};
use crate::drift::DriftMode;

/// Address/port pair used by stream route matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpPort {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
}

impl IpPort {
    fn from_desired(attribute: &str, entry: &DesiredRecord) -> Result<Self, ValidationError> {
        let ip = owned(entry.string("ip").map_err(|e| nested(attribute, e))?);
        let port = port(entry, "port").map_err(|e| nested(attribute, e))?;
        if ip.is_none() && port.is_none() {
            return Err(ValidationError::new(attribute, "entry needs an ip or a port"));
        }
        Ok(IpPort { ip, port })
    }

    fn to_desired(&self) -> DesiredRecord {
        let mut entry = DesiredRecord::new();
        put(&mut entry, "ip", self.ip.clone());
        put(&mut entry, "port", self.port);
        entry
    }
}

fn nested(attribute: &str, err: ValidationError) -> ValidationError {
    ValidationError::new(format!("{}.{}", attribute, err.attribute), err.reason)
}

fn ip_ports(desired: &DesiredRecord, name: &str) -> Result<Option<Vec<IpPort>>, ValidationError> {
    desired
        .set_of(name)?
        .map(|entries| {
            entries
                .iter()
                .map(|entry| IpPort::from_desired(name, entry))
                .collect()
        })
        .transpose()
}

/// Route as returned by the Admin API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    pub name: Option<String>,
    pub protocols: Option<Vec<String>>,
    pub methods: Option<Vec<String>>,
    pub hosts: Option<Vec<String>>,
    pub paths: Option<Vec<String>>,
    pub snis: Option<Vec<String>>,
    pub strip_path: Option<bool>,
    pub preserve_host: Option<bool>,
    pub regex_priority: Option<i64>,
    pub sources: Option<Vec<IpPort>>,
    pub destinations: Option<Vec<IpPort>>,
    pub service: Option<IdRef>,
    pub created_at: Option<i64>,
}

/// Body for creating or updating a route. `None` fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RouteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocols: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snis: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_path: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_host: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex_priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<IpPort>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destinations: Option<Vec<IpPort>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<IdRef>,
}

impl Resource for Route {
    type Request = RouteRequest;

    const KIND: ResourceKind = ResourceKind::Route;

    fn build_request(desired: &DesiredRecord) -> Result<RouteRequest, ValidationError> {
        let protocols = desired
            .list("protocols")?
            .ok_or_else(|| ValidationError::missing("protocols"))?;

        Ok(RouteRequest {
            name: owned(desired.string("name")?),
            protocols: Some(protocols.to_vec()),
            methods: owned_list(desired.list("methods")?),
            hosts: owned_list(desired.list("hosts")?),
            paths: owned_list(desired.list("paths")?),
            snis: owned_list(desired.list("snis")?),
            strip_path: Some(desired.bool("strip_path")?.unwrap_or(true)),
            preserve_host: desired.bool("preserve_host")?,
            regex_priority: desired.int("regex_priority")?,
            sources: ip_ports(desired, "source")?,
            destinations: ip_ports(desired, "destination")?,
            service: IdRef::from_attr(Some(desired.required_string("service_id")?)),
        })
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn request_key(request: &RouteRequest) -> Option<UniqueKey> {
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
        put(&mut state, "protocols", self.protocols.clone());
        put(&mut state, "methods", self.methods.clone());
        put(&mut state, "hosts", self.hosts.clone());
        put(&mut state, "paths", self.paths.clone());
        put(&mut state, "snis", self.snis.clone());
        put(&mut state, "strip_path", self.strip_path);
        put(&mut state, "preserve_host", self.preserve_host);
        put(&mut state, "regex_priority", self.regex_priority);
        put(
            &mut state,
            "source",
            self.sources
                .as_ref()
                .map(|s| s.iter().map(IpPort::to_desired).collect::<Vec<_>>()),
        );
        put(
            &mut state,
            "destination",
            self.destinations
                .as_ref()
                .map(|d| d.iter().map(IpPort::to_desired).collect::<Vec<_>>()),
        );
        if self.service.is_some() {
            state.set("service_id", ref_id(&self.service));
        }
        state
    }
}
