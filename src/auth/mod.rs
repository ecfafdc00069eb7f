//! Authentication module for the App Store Connect API.
//!
//! This module provides:
//! - Identity management with secure private key storage
//! - ES256 JSON Web Token minting for each authenticated request

mod credentials;
mod token;

pub use credentials::{EnvIdentity, Identity, IdentityProvider, StaticIdentity};
pub use token::{AUDIENCE, AuthToken, TOKEN_LIFETIME, issue_token};
