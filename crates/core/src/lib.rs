//! `gatehouse-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no HTTP, no storage).

pub mod email;
pub mod error;
pub mod id;

pub use email::EmailAddress;
pub use error::DomainError;
pub use id::RequestId;
