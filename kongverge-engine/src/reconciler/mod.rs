//! Reconcilers for Admin API resources.
//!
//! A reconciler turns a desired record into remote calls for one resource
//! kind and reports the authoritative record back to the host.

mod resource;

pub use resource::ResourceReconciler;

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::ResourceClient;
use crate::config::EngineConfig;
use crate::desired::DesiredRecord;
use crate::error::Result;
use crate::resources::{Consumer, Plugin, Resource, Route, Service};
use crate::shutdown::Shutdown;

pub type ServiceReconciler<C> = ResourceReconciler<Service, C>;
pub type RouteReconciler<C> = ResourceReconciler<Route, C>;
pub type PluginReconciler<C> = ResourceReconciler<Plugin, C>;
pub type ConsumerReconciler<C> = ResourceReconciler<Consumer, C>;

/// How a resource came to exist under its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Created,
    Adopted,
    Updated,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Provenance::Created => "created",
            Provenance::Adopted => "adopted",
            Provenance::Updated => "updated",
        })
    }
}

/// Outcome of a successful create or update.
#[derive(Debug, Clone)]
pub struct Reconciled<R> {
    pub id: String,
    pub record: R,
    pub provenance: Provenance,
}

/// Host-facing operations for one resource kind.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// The remote record type.
    type Record: Send;

    /// Ensure the resource exists, creating or adopting it.
    async fn create(&self, desired: &DesiredRecord) -> Result<Reconciled<Self::Record>>;

    /// Fetch the resource. `None` means it was deleted out of band.
    async fn read(&self, id: &str) -> Result<Option<Self::Record>>;

    /// Push desired attributes to an existing resource.
    async fn update(&self, id: &str, desired: &DesiredRecord) -> Result<Reconciled<Self::Record>>;

    /// Delete the resource. Deleting a missing resource is an error.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Bring an existing resource under management.
    async fn import(&self, id: &str) -> Result<Self::Record>;

    /// Render a record into state for the host.
    fn state(&self, record: &Self::Record, desired: Option<&DesiredRecord>) -> DesiredRecord;
}

/// Shared client and configuration, handing out per-kind reconcilers.
pub struct Engine<C: ?Sized> {
    client: Arc<C>,
    config: Arc<EngineConfig>,
    shutdown: Shutdown,
}

impl<C: ?Sized> Clone for Engine<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            config: Arc::clone(&self.config),
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<C: ?Sized> Engine<C> {
    pub fn new(client: Arc<C>, config: EngineConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
            shutdown: Shutdown::never(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reconciler<R>(&self) -> ResourceReconciler<R, C>
    where
        R: Resource,
        C: ResourceClient<R>,
    {
        ResourceReconciler::new(Arc::clone(&self.client), Arc::clone(&self.config))
            .with_shutdown(self.shutdown.clone())
    }
}
