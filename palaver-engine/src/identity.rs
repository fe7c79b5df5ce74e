//! Connection identity
//!
//! The engine connects either as a raw user id or with a bearer credential
//! from which the user id is derived by decoding the token payload. The
//! token is never validated here; validating signatures and expiry belongs
//! to the issuing service.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use uuid::Uuid;

use palaver_utils::{PalaverError, Result};

/// Who this connection speaks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Raw user identifier
    UserId(Uuid),
    /// Bearer credential (JWT-shaped); the user id lives in the `sub` claim
    Bearer(String),
}

impl Identity {
    /// Resolve the user id this identity names
    pub fn user_id(&self) -> Result<Uuid> {
        match self {
            Identity::UserId(id) => Ok(*id),
            Identity::Bearer(token) => decode_bearer_user_id(token),
        }
    }
}

/// Extract the `sub` claim from the payload segment of a JWT-shaped token,
/// without any signature validation
fn decode_bearer_user_id(token: &str) -> Result<Uuid> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| PalaverError::identity("credential is not a three-segment token"))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| PalaverError::identity(format!("payload is not base64: {}", e)))?;

    let claims: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| PalaverError::identity(format!("payload is not JSON: {}", e)))?;

    let sub = claims
        .get("sub")
        .and_then(|v| v.as_str())
        .ok_or_else(|| PalaverError::identity("missing sub claim"))?;

    Uuid::parse_str(sub)
        .map_err(|e| PalaverError::identity(format!("sub claim is not a user id: {}", e)))
}
