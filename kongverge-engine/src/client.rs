//! Remote resource client contract.
//!
//! The engine talks to the Admin API only through [`ResourceClient`]. The
//! HTTP implementation lives in `kongverge-admin`; tests substitute an
//! in-memory store.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::resources::Resource;

/// Largest page the Admin API serves.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Errors returned by a remote resource client.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The addressed resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A unique constraint rejected the write.
    #[error("unique constraint violation: {0}")]
    Conflict(String),

    /// The API answered with an unexpected status.
    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("decode: {0}")]
    Decode(String),

    /// A list cursor repeated instead of advancing.
    #[error("pagination stalled at offset {0}")]
    StalledPagination(String),

    /// The client itself is misconfigured.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ClientError::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// One page of a list response.
#[derive(Debug, Clone)]
pub struct Page<R> {
    pub data: Vec<R>,
    /// Cursor for the next page; `None` on the last page.
    pub offset: Option<String>,
}

/// CRUD surface of the Admin API for one resource kind.
#[async_trait]
pub trait ResourceClient<R: Resource>: Send + Sync {
    /// Create a resource.
    async fn create(&self, request: &R::Request) -> Result<R>;

    /// Fetch by identifier. Not found yields `Ok(None)`.
    async fn get_by_id(&self, id: &str) -> Result<Option<R>>;

    /// Fetch by an addressable unique key (a name). Not found yields `Ok(None)`.
    async fn get_by_unique_key(&self, key: &str) -> Result<Option<R>>;

    /// Fetch one page of the collection.
    async fn list_page(&self, size: usize, offset: Option<&str>) -> Result<Page<R>>;

    /// Update by identifier. Not found is an error.
    async fn update_by_id(&self, id: &str, request: &R::Request) -> Result<R>;

    /// Delete by identifier. Not found is an error.
    async fn delete_by_id(&self, id: &str) -> Result<()>;
}

/// Fetch every page of the collection.
///
/// Stops only when the API reports no further cursor. A cursor seen before,
/// on any earlier page, fails instead of looping or returning a partial
/// listing.
pub async fn list_all<R, C>(client: &C, page_size: usize) -> Result<Vec<R>>
where
    R: Resource,
    C: ResourceClient<R> + ?Sized,
{
    let size = page_size.clamp(1, MAX_PAGE_SIZE);
    let mut records = Vec::new();
    let mut offset: Option<String> = None;
    let mut seen: HashSet<String> = HashSet::new();
    let mut pages = 0u32;

    loop {
        let page = client.list_page(size, offset.as_deref()).await?;
        pages += 1;
        debug!(
            "Fetched {} page {} ({} records)",
            R::KIND,
            pages,
            page.data.len()
        );
        records.extend(page.data);

        match page.offset {
            None => break,
            Some(next) if !seen.insert(next.clone()) => {
                return Err(ClientError::StalledPagination(next));
            }
            Some(next) => offset = Some(next),
        }
    }

    Ok(records)
}
