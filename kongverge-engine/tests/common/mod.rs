//! Shared test utilities for kongverge-engine integration tests.

use async_trait::async_trait;
use kongverge_engine::client::{ClientError, Page, ResourceClient, Result};
use kongverge_engine::{Resource, ResourceKind};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory stand-in for the Admin API.
///
/// Records are stored as JSON per resource kind, in insertion order, and
/// converted to the typed record on the way out. Unique keys are enforced
/// the way the API enforces them: a create whose key matches an existing
/// record fails with a conflict.
#[derive(Default)]
pub struct FakeAdmin {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    records: HashMap<ResourceKind, Vec<Value>>,
    create_failures: VecDeque<ClientError>,
    create_delay: Option<Duration>,
    stall_pagination: bool,
    wrap_pagination: bool,
    hide_reads: bool,
    read_failure: Option<ClientError>,
    next_id: u64,
    calls: Calls,
}

/// Per-operation call counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub create: u32,
    pub get: u32,
    pub list: u32,
    pub update: u32,
    pub delete: u32,
}

impl FakeAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record as if it had been created out of band. Returns its id.
    pub fn seed(&self, kind: ResourceKind, mut record: Value) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate_id();
        record["id"] = json!(id);
        record["created_at"] = json!(chrono::Utc::now().timestamp());
        state.records.entry(kind).or_default().push(record);
        id
    }

    /// Fail the next creates with these errors, in order.
    pub fn fail_creates(&self, errors: impl IntoIterator<Item = ClientError>) {
        self.state.lock().unwrap().create_failures.extend(errors);
    }

    /// Make every create take this long before answering.
    pub fn delay_creates(&self, delay: Duration) {
        self.state.lock().unwrap().create_delay = Some(delay);
    }

    /// Serve the same cursor forever instead of advancing.
    pub fn stall_pagination(&self) {
        self.state.lock().unwrap().stall_pagination = true;
    }

    /// Point the last page back at the first instead of ending the listing.
    pub fn wrap_pagination(&self) {
        self.state.lock().unwrap().wrap_pagination = true;
    }

    /// Answer every fetch by id with not found, even for stored records.
    pub fn hide_reads(&self) {
        self.state.lock().unwrap().hide_reads = true;
    }

    /// Fail every fetch by id with this error.
    pub fn fail_reads(&self, error: ClientError) {
        self.state.lock().unwrap().read_failure = Some(error);
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.state
            .lock()
            .unwrap()
            .records
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Raw stored record, bypassing the client surface and its counters.
    pub fn stored(&self, kind: ResourceKind, id: &str) -> Option<Value> {
        self.state.lock().unwrap().find(kind, id).cloned()
    }
}

impl FakeState {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:08x}-{}", self.next_id, uuid::Uuid::new_v4().simple())
    }

    fn find(&self, kind: ResourceKind, id: &str) -> Option<&Value> {
        self.records
            .get(&kind)?
            .iter()
            .find(|record| record["id"] == id)
    }

    fn find_mut(&mut self, kind: ResourceKind, id: &str) -> Option<&mut Value> {
        self.records
            .get_mut(&kind)?
            .iter_mut()
            .find(|record| record["id"] == id)
    }
}

fn decode<R: Resource>(value: &Value) -> Result<R> {
    serde_json::from_value(value.clone()).map_err(|e| ClientError::Decode(e.to_string()))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl<R: Resource> ResourceClient<R> for FakeAdmin {
    async fn create(&self, request: &R::Request) -> Result<R> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.calls.create += 1;
            state.create_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.create_failures.pop_front() {
            return Err(err);
        }

        if let Some(key) = R::request_key(request) {
            let existing = state.records.get(&R::KIND).into_iter().flatten();
            for value in existing {
                let record: R = decode(value)?;
                if key.matches(&record.record_key()) {
                    return Err(ClientError::Conflict(format!(
                        "UNIQUE violation detected on '{{{}}}'",
                        key
                    )));
                }
            }
        }

        let mut value = encode(request)?;
        value["id"] = json!(state.allocate_id());
        value["created_at"] = json!(chrono::Utc::now().timestamp());
        let record = decode(&value)?;
        state.records.entry(R::KIND).or_default().push(value);
        Ok(record)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<R>> {
        let mut state = self.state.lock().unwrap();
        state.calls.get += 1;
        if let Some(err) = &state.read_failure {
            return Err(err.clone());
        }
        if state.hide_reads {
            return Ok(None);
        }
        state.find(R::KIND, id).map(decode).transpose()
    }

    async fn get_by_unique_key(&self, key: &str) -> Result<Option<R>> {
        let mut state = self.state.lock().unwrap();
        state.calls.get += 1;
        state
            .records
            .get(&R::KIND)
            .into_iter()
            .flatten()
            .find(|record| {
                record["id"] == key || record["name"] == key || record["username"] == key
            })
            .map(decode)
            .transpose()
    }

    async fn list_page(&self, size: usize, offset: Option<&str>) -> Result<Page<R>> {
        let mut state = self.state.lock().unwrap();
        state.calls.list += 1;

        let start = match offset {
            Some(offset) => offset
                .parse::<usize>()
                .map_err(|_| ClientError::Status {
                    status: 400,
                    message: format!("invalid offset {}", offset),
                })?,
            None => 0,
        };
        let records = state.records.get(&R::KIND).cloned().unwrap_or_default();
        let end = (start + size).min(records.len());
        let data = records[start.min(end)..end]
            .iter()
            .map(decode)
            .collect::<Result<Vec<R>>>()?;

        let offset = if state.stall_pagination {
            Some("0".to_string())
        } else if end < records.len() {
            Some(end.to_string())
        } else if state.wrap_pagination {
            Some("0".to_string())
        } else {
            None
        };
        Ok(Page { data, offset })
    }

    async fn update_by_id(&self, id: &str, request: &R::Request) -> Result<R> {
        let mut state = self.state.lock().unwrap();
        state.calls.update += 1;

        let patch = encode(request)?;
        let record = state
            .find_mut(R::KIND, id)
            .ok_or_else(|| ClientError::NotFound(id.to_string()))?;
        if let (Some(record), Some(patch)) = (record.as_object_mut(), patch.as_object()) {
            for (field, value) in patch {
                record.insert(field.clone(), value.clone());
            }
        }
        decode(record)
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.delete += 1;

        let records = state.records.entry(R::KIND).or_default();
        let before = records.len();
        records.retain(|record| record["id"] != id);
        if records.len() == before {
            return Err(ClientError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
