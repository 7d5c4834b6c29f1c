//! HS256 token codec.
//!
//! Tokens are standard compact JWS (`header.payload.signature`, base64url)
//! signed with HMAC-SHA256. Verification order matters: the signature is
//! checked before anything inside the payload is trusted, so a token signed
//! under another secret is rejected as `InvalidSignature` even if expired.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::{Claims, SigningSecret, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Encodes, decodes and verifies signed [`Claims`].
///
/// Built once from the startup secret; cheap to clone and safe to share.
#[derive(Clone)]
pub struct TokenCodec {
    header: Header,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl TokenCodec {
    pub fn new(secret: &SigningSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` after the signature, strictly.
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            header: Header::new(Algorithm::HS256),
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation: Arc::new(validation),
        }
    }

    /// Sign `claims` into a token string. Deterministic for equal inputs.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&self.header, claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, then expiry, and return the embedded claims.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            }
        })?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.header.alg)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::Duration;
    use proptest::prelude::*;

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(&SigningSecret::new(secret))
    }

    #[test]
    fn roundtrip_preserves_claims() {
        let now = Utc::now();
        let claims = Claims::issue("a@b.com", Role::Admin, now, Duration::minutes(60));
        let codec = codec("test-secret");

        let token = codec.encode(&claims).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert_eq!(codec.verify(&token, now).unwrap(), claims);
    }

    #[test]
    fn encoding_is_deterministic() {
        let now = Utc::now();
        let claims = Claims::issue("a@b.com", Role::User, now, Duration::minutes(60));
        let codec = codec("test-secret");
        assert_eq!(codec.encode(&claims).unwrap(), codec.encode(&claims).unwrap());
    }

    #[test]
    fn wrong_secret_is_invalid_signature() {
        let now = Utc::now();
        let claims = Claims::issue("a@b.com", Role::User, now, Duration::minutes(60));
        let token = codec("right").encode(&claims).unwrap();

        assert_eq!(
            codec("wrong").verify(&token, now),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn signature_is_checked_before_expiry() {
        let now = Utc::now();
        let claims = Claims::issue("a@b.com", Role::User, now - Duration::hours(2), Duration::minutes(60));
        let token = codec("right").encode(&claims).unwrap();

        assert_eq!(codec("wrong").verify(&token, now), Err(TokenError::InvalidSignature));
        assert_eq!(codec("right").verify(&token, now), Err(TokenError::Expired));
    }

    #[test]
    fn expiry_boundary_is_strict() {
        let now = Utc::now();
        let claims = Claims::issue("a@b.com", Role::User, now, Duration::seconds(30));
        let codec = codec("s");
        let token = codec.encode(&claims).unwrap();

        assert!(codec.verify(&token, claims.expires_at() - Duration::seconds(1)).is_ok());
        assert_eq!(codec.verify(&token, claims.expires_at()), Err(TokenError::Expired));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec("s");
        for token in ["", "abc", "a.b.c", "...."] {
            assert_eq!(codec.verify(token, Utc::now()), Err(TokenError::Malformed), "{token}");
        }
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let now = Utc::now();
        let codec = codec("s");
        let user = codec
            .encode(&Claims::issue("a@b.com", Role::User, now, Duration::minutes(5)))
            .unwrap();
        let admin = codec
            .encode(&Claims::issue("a@b.com", Role::Admin, now, Duration::minutes(5)))
            .unwrap();

        // Splice the admin payload onto the user signature.
        let user_parts: Vec<&str> = user.split('.').collect();
        let admin_parts: Vec<&str> = admin.split('.').collect();
        let forged = format!("{}.{}.{}", user_parts[0], admin_parts[1], user_parts[2]);

        assert_eq!(codec.verify(&forged, now), Err(TokenError::InvalidSignature));
    }

    proptest! {
        #[test]
        fn roundtrip_any_claims(
            email in "[a-z0-9._+-]{1,16}@[a-z0-9]{1,12}\\.[a-z]{2,5}",
            admin in any::<bool>(),
            ttl_secs in 1i64..86_400,
        ) {
            let now = Utc::now();
            let role = if admin { Role::Admin } else { Role::User };
            let claims = Claims::issue(email, role, now, Duration::seconds(ttl_secs));
            let token = codec("prop-secret").encode(&claims).unwrap();

            prop_assert_eq!(codec("prop-secret").verify(&token, now).unwrap(), claims);
            prop_assert_eq!(
                codec("other-secret").verify(&token, now),
                Err(TokenError::InvalidSignature)
            );
        }

        #[test]
        fn past_expiry_always_rejected(age_secs in 0i64..1_000_000) {
            let now = Utc::now();
            let claims = Claims {
                email: "a@b.com".into(),
                role: Role::User,
                exp: now.timestamp() - age_secs,
            };
            let token = codec("s").encode(&claims).unwrap();
            prop_assert_eq!(codec("s").verify(&token, now), Err(TokenError::Expired));
        }
    }
}
