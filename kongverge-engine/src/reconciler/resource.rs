//! Generic reconciler over any [`Resource`] kind.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{Provenance, Reconciled, Reconciler};
use crate::client::{list_all, ClientError, ResourceClient};
use crate::config::EngineConfig;
use crate::desired::DesiredRecord;
use crate::drift::DriftMode;
use crate::error::{Operation, ReconcileError, Result};
use crate::resources::{Resource, UniqueKey};
use crate::retry::RetryError;
use crate::shutdown::Shutdown;

/// Reconciles resources of kind `R` through client `C`.
///
/// Holds no per-call state, so one instance can serve concurrent calls for
/// different identifiers.
pub struct ResourceReconciler<R, C: ?Sized> {
    client: Arc<C>,
    config: Arc<EngineConfig>,
    shutdown: Shutdown,
    _kind: PhantomData<fn() -> R>,
}

impl<R, C> ResourceReconciler<R, C>
where
    R: Resource,
    C: ResourceClient<R> + ?Sized,
{
    pub fn new(client: Arc<C>, config: Arc<EngineConfig>) -> Self {
        Self {
            client,
            config,
            shutdown: Shutdown::never(),
            _kind: PhantomData,
        }
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn build(&self, desired: &DesiredRecord) -> Result<R::Request> {
        R::build_request(desired).map_err(|source| ReconcileError::Validation {
            kind: R::KIND,
            source,
        })
    }

    /// One create attempt, falling back to adoption on a unique-key conflict.
    async fn create_once(&self, request: &R::Request) -> Result<(String, Provenance)> {
        let key = R::request_key(request);
        let label = describe(key.as_ref());
        info!("Creating {} {}", R::KIND, label);

        match self.client.create(request).await {
            Ok(record) => Ok((record.id().to_string(), Provenance::Created)),
            Err(source) if source.is_conflict() => match key {
                Some(key) if self.config.upsert_resources => {
                    let existing = self.adopt(&key).await?;
                    info!(
                        "{} with {} already exists with ID {}, using it",
                        R::KIND,
                        key,
                        existing.id()
                    );
                    Ok((existing.id().to_string(), Provenance::Adopted))
                }
                _ => Err(ReconcileError::Conflict {
                    kind: R::KIND,
                    key: label,
                    source,
                }),
            },
            Err(source) => Err(ReconcileError::Client {
                kind: R::KIND,
                op: Operation::Create,
                target: label,
                source,
            }),
        }
    }

    /// Find the existing resource holding `key`.
    ///
    /// Addressable keys are fetched directly; anything else is found by
    /// scanning every page of the collection.
    async fn adopt(&self, key: &UniqueKey) -> Result<R> {
        let adopt_error = |source: ClientError| ReconcileError::Client {
            kind: R::KIND,
            op: Operation::Adopt,
            target: key.to_string(),
            source,
        };

        let found = match key.lookup() {
            Some(handle) => self
                .client
                .get_by_unique_key(handle)
                .await
                .map_err(adopt_error)?
                .filter(|record| key.matches(&record.record_key())),
            None => {
                let records = list_all::<R, C>(self.client.as_ref(), self.config.page_size)
                    .await
                    .map_err(adopt_error)?;
                debug!("Scanned {} existing {} records", records.len(), R::KIND);
                records
                    .into_iter()
                    .find(|record| key.matches(&record.record_key()))
            }
        };

        found.ok_or_else(|| ReconcileError::AdoptionNotFound {
            kind: R::KIND,
            key: key.to_string(),
        })
    }

    fn retry_failure(&self, err: RetryError<ReconcileError>) -> ReconcileError {
        match err {
            RetryError::Permanent(err) => err,
            RetryError::Exhausted {
                last,
                attempts,
                elapsed,
            } => {
                warn!(
                    "Giving up creating {} after {} attempts in {:?}",
                    R::KIND,
                    attempts,
                    elapsed
                );
                last
            }
            RetryError::TimedOut { elapsed, .. } => ReconcileError::Timeout {
                kind: R::KIND,
                after: elapsed,
            },
            RetryError::Cancelled { .. } => ReconcileError::Cancelled {
                kind: R::KIND,
                op: Operation::Create,
            },
        }
    }

    async fn fetch(&self, id: &str, op: Operation) -> Result<Option<R>> {
        self.client
            .get_by_id(id)
            .await
            .map_err(|source| ReconcileError::Client {
                kind: R::KIND,
                op,
                target: id.to_string(),
                source,
            })
    }
}

#[async_trait]
impl<R, C> Reconciler for ResourceReconciler<R, C>
where
    R: Resource,
    C: ResourceClient<R> + ?Sized + 'static,
{
    type Record = R;

    async fn create(&self, desired: &DesiredRecord) -> Result<Reconciled<R>> {
        let request = self.build(desired)?;
        let policy = self.config.retry_policy();

        let (id, provenance) = policy
            .run(&self.shutdown, || self.create_once(&request))
            .await
            .map_err(|err| self.retry_failure(err))?;

        let record = self
            .fetch(&id, Operation::Read)
            .await?
            .ok_or_else(|| ReconcileError::ReadBack {
                kind: R::KIND,
                id: id.clone(),
            })?;

        match provenance {
            Provenance::Adopted => warn!(
                "Adopted existing {} {}; its attributes were not converged, an update is required",
                R::KIND,
                id
            ),
            _ => info!("Created {} {}", R::KIND, id),
        }

        Ok(Reconciled {
            id,
            record,
            provenance,
        })
    }

    async fn read(&self, id: &str) -> Result<Option<R>> {
        let record = self.fetch(id, Operation::Read).await?;
        if record.is_none() {
            info!("{} {} no longer exists", R::KIND, id);
        }
        Ok(record)
    }

    async fn update(&self, id: &str, desired: &DesiredRecord) -> Result<Reconciled<R>> {
        let request = self.build(desired)?;
        info!("Updating {} {}", R::KIND, id);

        let record = self
            .client
            .update_by_id(id, &request)
            .await
            .map_err(|source| ReconcileError::Client {
                kind: R::KIND,
                op: Operation::Update,
                target: id.to_string(),
                source,
            })?;

        Ok(Reconciled {
            id: record.id().to_string(),
            record,
            provenance: Provenance::Updated,
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        info!("Deleting {} {}", R::KIND, id);
        self.client
            .delete_by_id(id)
            .await
            .map_err(|source| ReconcileError::Client {
                kind: R::KIND,
                op: Operation::Delete,
                target: id.to_string(),
                source,
            })
    }

    async fn import(&self, id: &str) -> Result<R> {
        info!("Importing {} {}", R::KIND, id);
        self.fetch(id, Operation::Import)
            .await?
            .ok_or_else(|| ReconcileError::NotFound {
                kind: R::KIND,
                id: id.to_string(),
            })
    }

    fn state(&self, record: &R, desired: Option<&DesiredRecord>) -> DesiredRecord {
        let strict_match = desired.and_then(|d| d.bool("strict_match").ok().flatten());
        record.to_state(DriftMode::resolve(
            strict_match,
            self.config.strict_plugins_match,
        ))
    }
}

fn describe(key: Option<&UniqueKey>) -> String {
    key.map_or_else(|| "(no unique key)".to_string(), UniqueKey::to_string)
}
