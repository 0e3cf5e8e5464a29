//! Prediction API.
//!
//! Thin axum layer over [`InferencePipeline`](crate::pipeline::InferencePipeline):
//! accepts a multipart image upload, runs inference on a blocking worker and
//! renders the result as JSON.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod upload;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

/// Binds `host:port`. `host` may be an IP literal or a resolvable name.
pub async fn bind(host: &str, port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind((host, port)).await
}

/// Bind `host:port` and serve `app` until Ctrl+C.
pub async fn serve(app: Router, host: &str, port: u16) -> std::io::Result<()> {
    let listener = bind(host, port).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_host_names_as_well_as_ip_literals() {
        let named = bind("localhost", 0).await.unwrap();
        assert!(named.local_addr().unwrap().ip().is_loopback());

        let literal = bind("127.0.0.1", 0).await.unwrap();
        assert_ne!(literal.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn unresolvable_host_is_an_error() {
        assert!(bind("no such host", 0).await.is_err());
    }
}
