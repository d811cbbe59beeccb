//! Engine error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::client::ClientError;
use crate::desired::ValidationError;
use crate::resources::ResourceKind;

/// Operation that was being performed when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
    Adopt,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Import => "import",
            Operation::Adopt => "adopt",
        };
        f.write_str(name)
    }
}

/// Errors surfaced to the host.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The desired record is malformed. Never retried.
    #[error("invalid {kind}: {source}")]
    Validation {
        kind: ResourceKind,
        source: ValidationError,
    },

    /// Create collided with an existing resource and was not adopted.
    #[error("failed to create {kind} ({key}): {source}")]
    Conflict {
        kind: ResourceKind,
        key: String,
        source: ClientError,
    },

    /// Create collided but no resource with the same unique key was found.
    #[error("could not find existing {kind} with {key} to adopt")]
    AdoptionNotFound { kind: ResourceKind, key: String },

    /// The remote client failed.
    #[error("failed to {op} {kind} {target}: {source}")]
    Client {
        kind: ResourceKind,
        op: Operation,
        target: String,
        source: ClientError,
    },

    /// The identifier does not exist remotely.
    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: String },

    /// Create succeeded but the record could not be read back.
    #[error("{kind} {id} was created but could not be read back")]
    ReadBack { kind: ResourceKind, id: String },

    /// The retry deadline elapsed before any attempt finished.
    #[error("timed out after {after:?} creating {kind}")]
    Timeout { kind: ResourceKind, after: Duration },

    /// The host signalled shutdown.
    #[error("{op} {kind} cancelled")]
    Cancelled { kind: ResourceKind, op: Operation },
}

impl ReconcileError {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ReconcileError::Validation { kind, .. }
            | ReconcileError::Conflict { kind, .. }
            | ReconcileError::AdoptionNotFound { kind, .. }
            | ReconcileError::Client { kind, .. }
            | ReconcileError::NotFound { kind, .. }
            | ReconcileError::ReadBack { kind, .. }
            | ReconcileError::Timeout { kind, .. }
            | ReconcileError::Cancelled { kind, .. } => *kind,
        }
    }

    /// Whether the remote reported the addressed resource missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            ReconcileError::NotFound { .. } => true,
            ReconcileError::Client { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    pub fn is_conflict(&self) -> bool {
        match self {
            ReconcileError::Conflict { .. } => true,
            ReconcileError::Client { source, .. } => source.is_conflict(),
            _ => false,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;
