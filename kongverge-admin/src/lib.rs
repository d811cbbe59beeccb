//! kongverge-admin: Kong Admin API client
//!
//! Implements the engine's `ResourceClient` for every resource kind over
//! HTTP, using the Admin API's REST conventions:
//!
//! - `POST /{collection}` creates
//! - `GET /{collection}/{id or name}` fetches, 404 meaning absent
//! - `GET /{collection}?size=&offset=` lists one page
//! - `PATCH /{collection}/{id}` updates
//! - `DELETE /{collection}/{id}` deletes

pub mod client;
pub mod config;

pub use client::KongAdminClient;
pub use config::{AdminConfig, AdminConfigError, DEFAULT_ADMIN_URI};
