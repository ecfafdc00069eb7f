//! Common types used across the App Store Connect client library.

pub mod jsonapi;
pub mod serde_helpers;

pub use jsonapi::*;
