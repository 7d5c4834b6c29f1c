//! `gatehouse-auth`: pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how
//! to shape credentials, sign and verify claims, and what a user directory
//! must offer, but never how requests arrive or where users live.

pub mod claims;
pub mod credentials;
pub mod directory;
pub mod roles;
pub mod secret;
pub mod token;

pub use claims::{Claims, validate_claims};
pub use credentials::{Credential, Registration};
pub use directory::{DirectoryError, UserDirectory, UserRecord};
pub use roles::{Role, UnknownRole};
pub use secret::{
    EnvSecretProvider, INSECURE_DEV_SECRET, SecretError, SecretProvider, SigningSecret,
    StaticSecretProvider,
};
pub use token::{TokenCodec, TokenError};
