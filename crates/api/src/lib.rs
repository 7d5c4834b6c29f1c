//! HTTP gateway: session auth, gate chain, and the routes behind it.

pub mod app;
pub mod authz;
pub mod config;
pub mod context;
pub mod cookie;
pub mod middleware;

pub use app::{AppState, build_app, build_app_with_policy};
pub use config::{AppConfig, ConfigError};
