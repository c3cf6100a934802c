//! # CiviLens client library
//!
//! Authenticated access to the CiviLens backend: attaches credentials to
//! outbound requests, refreshes an expired access token transparently,
//! normalizes every response into one envelope, and keeps cached reads
//! consistent with the identity holding the session.
//!
//! Modules:
//! - `session`: token store, durable storage and the user snapshot
//! - `transport`: HTTP wrapper and the `{ success, data, error }` envelope
//! - `auth`: refresh coordination, login/logout/profile flows
//! - `cache`: query cache and the invalidation bridge
//! - `api`: the authenticated client and per-resource endpoints
//! - `config`: YAML configuration and validation

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod helpers;
pub mod observability;
pub mod session;
pub mod transport;
pub mod utils;

#[cfg(test)]
pub mod tests;

pub use crate::api::client::ApiClient;
pub use crate::auth::service::AuthService;
pub use crate::config::settings::ClientConfig;
pub use crate::transport::envelope::{ApiError, Envelope};
