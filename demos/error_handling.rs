//! Example: Telling transient, permanent and local failures apart.
//!
//! Run with: cargo run --example error_handling

use std::time::Duration;

use asc_api_client::error::{ApiError, RetryableError};
use asc_api_client::{AscError, TrustPolicy};

fn describe(err: &AscError) {
    match err {
        AscError::Retryable(e) => println!(
            "transient ({}), tried {} times, server hint {:?}",
            e.status, e.attempts, e.retry_after
        ),
        AscError::Api(e) if e.is_unauthorized() => println!("check the API key: {e}"),
        AscError::Api(e) => println!("permanent: {e}"),
        AscError::Security(e) => println!("refused: {e}"),
        AscError::Cancelled | AscError::Timeout => println!("gave up: {err}"),
        other => println!("other: {other}"),
    }
}

fn main() {
    let mut rate_limited =
        RetryableError::new(429, "Too many requests", Some(Duration::from_secs(5)));
    rate_limited.attempts = 3;
    describe(&AscError::Retryable(rate_limited));

    describe(&AscError::Api(ApiError::from_raw(401, "NOT_AUTHORIZED")));

    let policy = TrustPolicy::default();
    if let Err(e) = policy.validate_next_url("https://evil.example/v1/apps?cursor=AQ") {
        describe(&AscError::Security(e));
    }
}
