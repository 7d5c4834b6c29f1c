//! Infrastructure layer: user directory adapters.

pub mod directory;

pub use directory::InMemoryUserDirectory;
#[cfg(feature = "postgres")]
pub use directory::PostgresUserDirectory;
