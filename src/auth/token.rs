//! ES256 bearer token minting for App Store Connect API authentication.
//!
//! Every request carries a JSON Web Token signed with the API key's EC private key:
//! ```text
//! header:  { "alg": "ES256", "kid": <key id>, "typ": "JWT" }
//! payload: { "iss": <issuer id>, "iat": now, "exp": now + 20 min, "aud": "appstoreconnect-v1" }
//! ```
//!
//! Tokens are minted fresh for each request and never cached.

use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::Identity;
use crate::error::AscError;

/// Audience claim expected by the App Store Connect API.
pub const AUDIENCE: &str = "appstoreconnect-v1";

/// Lifetime of a minted token.
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(20 * 60);

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub(crate) iss: String,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
    pub(crate) aud: String,
}

/// A signed bearer token for a single request.
#[derive(Clone)]
pub struct AuthToken {
    /// Issuer id the token was minted for
    pub issuer: String,
    /// Audience claim
    pub audience: &'static str,
    /// Issue time
    pub issued_at: OffsetDateTime,
    /// Expiry time (`issued_at + TOKEN_LIFETIME`)
    pub expires_at: OffsetDateTime,
    /// Key id carried in the JWT header
    pub key_id: String,
    encoded: SecretString,
}

impl AuthToken {
    /// The compact JWT.
    ///
    /// This method exposes the secret - use carefully.
    pub fn expose(&self) -> &str {
        self.encoded.expose_secret()
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.expose())
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("key_id", &self.key_id)
            .field("encoded", &"[REDACTED]")
            .finish()
    }
}

/// Mint a token for `identity`, valid from `now` for [`TOKEN_LIFETIME`].
///
/// # Example
///
/// ```rust,no_run
/// use asc_api_client::auth::{Identity, issue_token};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let identity = Identity::from_key_file("issuer-id", "KEY123", "AuthKey_KEY123.p8")?;
/// let token = issue_token(&identity, time::OffsetDateTime::now_utc())?;
/// println!("expires at {}", token.expires_at);
/// # Ok(())
/// # }
/// ```
pub fn issue_token(identity: &Identity, now: OffsetDateTime) -> Result<AuthToken, AscError> {
    let key = EncodingKey::from_ec_pem(identity.expose_private_key().as_bytes())
        .map_err(|e| AscError::Signing(format!("invalid EC private key: {e}")))?;

    let expires_at = now + TOKEN_LIFETIME;
    let claims = Claims {
        iss: identity.issuer_id.clone(),
        iat: now.unix_timestamp(),
        exp: expires_at.unix_timestamp(),
        aud: AUDIENCE.to_string(),
    };

    let mut header = Header::new(Algorithm::ES256);
    header.kid = Some(identity.key_id.clone());
    header.typ = Some("JWT".to_string());

    let encoded = encode(&header, &claims, &key).map_err(|e| AscError::Signing(e.to_string()))?;

    Ok(AuthToken {
        issuer: identity.issuer_id.clone(),
        audience: AUDIENCE,
        issued_at: now,
        expires_at,
        key_id: identity.key_id.clone(),
        encoded: SecretString::from(encoded),
    })
}
