use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Role, TokenError};

/// Signed session claims.
///
/// Created once at login/register and embedded in the token; immutable after
/// issuance. `exp` is unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub role: Role,
    pub exp: i64,
}

impl Claims {
    /// Claims for `email`/`role` expiring `ttl` after `issued_at`.
    pub fn issue(email: impl Into<String>, role: Role, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            email: email.into(),
            role,
            exp: (issued_at + ttl).timestamp(),
        }
    }

    /// Expiry as a timestamp (falls back to the epoch for out-of-range values).
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_default()
    }
}

/// Deterministically validate the time window of already-verified claims.
///
/// Strict: `now >= exp` is expired, there is no clock-skew allowance.
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), TokenError> {
    if now.timestamp() >= claims.exp {
        return Err(TokenError::Expired);
    }
    Ok(())
}
