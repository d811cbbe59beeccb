//! kongverge-engine: reconciliation of Kong Admin API resources
//!
//! Turns desired records supplied by a declarative host into create, read,
//! update, delete and import calls against the Admin API. Creates are retried
//! within a time budget and, when enabled, adopt an existing resource that
//! already holds the same unique key.
//!
//! # Example
//! ```ignore
//! use kongverge_engine::{DesiredRecord, Engine, EngineConfig, Reconciler, Service};
//!
//! let engine = Engine::new(client, EngineConfig::default());
//! let services = engine.reconciler::<Service>();
//! let desired = DesiredRecord::new()
//!     .with("name", "billing")
//!     .with("protocol", "http")
//!     .with("host", "billing.internal");
//! let created = services.create(&desired).await?;
//! ```

pub mod client;
pub mod config;
pub mod desired;
pub mod drift;
pub mod error;
pub mod reconciler;
pub mod resources;
pub mod retry;
pub mod shutdown;

// Re-export commonly used types at crate root
pub use client::{list_all, ClientError, Page, ResourceClient, MAX_PAGE_SIZE};
pub use config::{ConfigError, EngineConfig};
pub use desired::{AttrValue, DesiredRecord, ValidationError};
pub use drift::{has_drift, normalize_document, DriftMode};
pub use error::{Operation, ReconcileError};
pub use reconciler::{Engine, Provenance, Reconciled, Reconciler, ResourceReconciler};
pub use resources::{
    Consumer, IdRef, Plugin, Resource, ResourceKind, Route, Service, UniqueKey,
};
pub use retry::{Backoff, RetryError, RetryPolicy};
pub use shutdown::Shutdown;
