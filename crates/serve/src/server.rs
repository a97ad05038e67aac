//! Server assembly for the TextProof serve crate

use crate::api::create_routes;
use crate::state::AppState;
use crate::ServerConfig;
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    Router,
};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use textproof_core::{ProofError, Result};

/// TextProof HTTP server
pub struct ProofServer {
    config: ServerConfig,
    app: Router,
}

impl ProofServer {
    /// Create a server over an assembled application state
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        let app = create_app(&config, state);
        Self { config, app }
    }

    /// Bind and serve until shutdown
    pub async fn start(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| ProofError::validation(format!("Invalid address {}: {}", addr, e)))?;

        tracing::info!("Starting TextProof server on {}", addr);

        let listener = tokio::net::TcpListener::bind(socket_addr)
            .await
            .map_err(|e| ProofError::config(format!("Failed to bind to {}: {}", addr, e)))?;

        axum::serve(listener, self.app)
            .await
            .map_err(|e| ProofError::config(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Create the axum application with middleware
fn create_app(config: &ServerConfig, state: AppState) -> Router {
    let mut app = create_routes(state);

    app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(RequestBodyLimitLayer::new(config.max_request_size)),
    );

    if config.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE]);

        app = app.layer(cors);
    }

    app
}

/// Server builder for configuration
pub struct ServerBuilder {
    config: ServerConfig,
}

impl ServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Set the host address
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the cache directory
    pub fn cache_dir<P: Into<std::path::PathBuf>>(mut self, dir: P) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    /// Set the dotfile path
    pub fn env_file<P: Into<std::path::PathBuf>>(mut self, path: P) -> Self {
        self.config.env_file = path.into();
        self
    }

    /// Enable or disable CORS
    pub fn cors(mut self, enabled: bool) -> Self {
        self.config.cors_enabled = enabled;
        self
    }

    /// Set maximum request size
    pub fn max_request_size(mut self, size: usize) -> Self {
        self.config.max_request_size = size;
        self
    }

    /// Finish configuration
    pub fn config(self) -> ServerConfig {
        self.config
    }

    /// Build the server over an application state
    pub fn build(self, state: AppState) -> ProofServer {
        ProofServer::new(self.config, state)
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
