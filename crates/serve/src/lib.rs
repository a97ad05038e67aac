//! TextProof Serve Library
//!
//! Web server interface for the TextProof proofreading service: the axum
//! HTTP surface, the application state, the task manager, the SQLite-backed
//! durable store and the background correction workers.

use std::path::PathBuf;

pub mod api;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;
pub mod store;
pub mod tasks;
pub mod worker;

pub use server::{ProofServer, ServerBuilder};
pub use state::AppState;

/// Server version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Directory holding the database and legacy cache files
    pub cache_dir: PathBuf,
    /// Dotfile the settings are loaded from and persisted to
    pub env_file: PathBuf,
    /// Whether permissive CORS is enabled
    pub cors_enabled: bool,
    /// Upload size cap in bytes
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cache_dir: PathBuf::from("cache"),
            env_file: PathBuf::from(".env"),
            cors_enabled: true,
            max_request_size: 50 * 1024 * 1024, // novels are large but bounded
        }
    }
}
