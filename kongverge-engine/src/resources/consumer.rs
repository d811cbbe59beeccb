//! Consumers.

use serde::{Deserialize, Serialize};

use super::{owned, put, Resource, ResourceKind, UniqueKey};
use crate::desired::{DesiredRecord, ValidationError};
use crate::drift::DriftMode;

/// Consumer as returned by the Admin API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumer {
    pub id: String,
    pub username: Option<String>,
    pub custom_id: Option<String>,
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsumerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
}

impl Resource for Consumer {
    type Request = ConsumerRequest;

    const KIND: ResourceKind = ResourceKind::Consumer;

    fn build_request(desired: &DesiredRecord) -> Result<ConsumerRequest, ValidationError> {
        let request = ConsumerRequest {
            username: owned(desired.string("username")?),
            custom_id: owned(desired.string("custom_id")?),
        };
        if request.username.is_none() && request.custom_id.is_none() {
            return Err(ValidationError::new(
                "username",
                "one of username or custom_id is required",
            ));
        }
        Ok(request)
    }

    fn id(&self) -> &str {
        &self.id
    }

    // Username is addressable; custom_id alone needs a scan.
    fn request_key(request: &ConsumerRequest) -> Option<UniqueKey> {
        match (&request.username, &request.custom_id) {
            (Some(username), _) => Some(UniqueKey::named("username", username)),
            (None, Some(custom_id)) => Some(UniqueKey::new().field("custom_id", custom_id)),
            (None, None) => None,
        }
    }

    fn record_key(&self) -> UniqueKey {
        UniqueKey::new()
            .field("username", self.username.as_deref().unwrap_or(""))
            .field("custom_id", self.custom_id.as_deref().unwrap_or(""))
    }

    fn to_state(&self, _drift: DriftMode) -> DesiredRecord {
        let mut state = DesiredRecord::new();
        put(&mut state, "username", self.username.clone());
        put(&mut state, "custom_id", self.custom_id.clone());
        state
    }
}
