//! App Store Connect REST API client.
//!
//! [`AscRestClient`] signs every request with a short-lived ES256 token,
//! retries idempotent requests that fail with 429 or 503, and refuses to
//! follow links to hosts outside its [`TrustPolicy`](crate::url_guard::TrustPolicy).
//!
//! Typed endpoint groups live in [`apps`] and [`reports`]. Anything else can
//! be reached through [`AscRestClient::get`] and friends, or by building a
//! [`RequestDescriptor`] and calling [`AscRestClient::execute`].

pub mod apps;
pub mod classify;
mod client;
pub mod endpoints;
pub mod reports;

pub use client::{AscRestClient, AscRestClientBuilder, JSON_MEDIA_TYPE, RequestDescriptor};
pub(crate) use client::checked_id;
