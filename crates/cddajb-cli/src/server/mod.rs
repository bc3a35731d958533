//! HTTP backend for the browser frontend.

mod autolink;
mod error;
mod routes;

use crate::app::App;
use autolink::AutoLinker;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub use error::{ServerError, ServerResult};
pub use routes::build_router;

/// State shared by every request handler.
pub struct ServerState {
    pub app: App,
    linker: AutoLinker,
}

impl ServerState {
    pub fn new(app: App) -> ServerResult<Self> {
        let linker = AutoLinker::new().map_err(|e| ServerError::Internal(e.to_string()))?;
        Ok(ServerState { app, linker })
    }
}

/// The cddajb HTTP server.
pub struct BlobServer {
    state: Arc<ServerState>,
}

impl BlobServer {
    pub fn new(app: App) -> ServerResult<Self> {
        Ok(Self {
            state: Arc::new(ServerState::new(app)?),
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.state.app.config.server.bind_addr
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Kick off the initial rebuild and serve requests until shutdown.
    pub async fn serve(self, bind: SocketAddr) -> ServerResult<()> {
        if !self.state.app.store.rebuild(None) {
            tracing::warn!("Initial rebuild already running");
        }

        let app = self.router();
        let listener = TcpListener::bind(bind).await?;
        tracing::info!("cddajb server listening on {}", bind);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cddajb_core::Config;
    use tempfile::TempDir;

    #[test]
    fn server_construction() {
        let dir = TempDir::new().unwrap();
        let app = App::new(Config::for_root(dir.path())).unwrap();
        let server = BlobServer::new(app).unwrap();
        assert_eq!(server.bind_addr(), "127.0.0.1:8080".parse().unwrap());
        let _router = server.router();
    }
}
