//! # App Store Connect Client
//!
//! An async Rust client library for the App Store Connect REST API.
//!
//! ## Features
//!
//! - ES256 bearer tokens minted per request from an API key
//! - Automatic retries of idempotent requests on 429 and 503, honoring `Retry-After`
//! - Per-call cancellation and deadlines
//! - Host allowlists for pagination links and analytics downloads
//! - Typed JSON:API documents and error objects
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use asc_api_client::rest::AscRestClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads ASC_ISSUER_ID, ASC_KEY_ID and ASC_PRIVATE_KEY_PATH,
//!     // falling back to ~/.asc/config.json.
//!     let client = AscRestClient::from_env()?;
//!     let apps = client.list_apps(None).await?;
//!     println!("{} apps", apps.data.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Cancellation
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use asc_api_client::rest::{AscRestClient, RequestDescriptor};
//!
//! # async fn run(client: AscRestClient) -> Result<(), asc_api_client::AscError> {
//! let ctx = client.context().with_timeout(Duration::from_secs(10));
//! let body = client.execute(&ctx, &RequestDescriptor::get("/v1/apps")).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod rest;
pub mod retry;
pub mod types;
pub mod url_guard;

// Re-export commonly used types at crate root
pub use context::CallContext;
pub use error::{ApiError, AscError, RetryableError};
pub use rest::{AscRestClient, AscRestClientBuilder, RequestDescriptor};
pub use retry::{RetryOverrides, RetryPolicy};
pub use url_guard::{SecurityError, TrustPolicy};

/// Result type alias using AscError
pub type Result<T> = std::result::Result<T, AscError>;
