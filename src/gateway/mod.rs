//! HTTP gateway
//!
//! Bridges synchronous HTTP calls to the asynchronous ledger workers. Each
//! call is validated, published to its operation's request queue and held
//! until the correlated response arrives in the pending cache.

pub mod collector;
pub mod correlator;
pub mod jobs;
pub mod middleware;
pub mod paths;
pub mod pending;
pub mod router;

pub use collector::ResponseCollector;
pub use correlator::{decompose, Correlator, IdGenerator, MAX_INSTANCE_ID};
pub use jobs::PendingSweep;
pub use paths::{match_path, Params, PathMatch};
pub use pending::PendingResponses;
pub use router::{build_request, dispatch, resolve, Endpoint, Resolution};

use std::future::IntoFuture;
use std::sync::Arc;

use axum::{middleware as axum_middleware, routing::get, Router};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::{ConfigError, GatewayConfig};
use crate::queue::MessageQueue;

/// Shared gateway context, constructed once and injected into every handler
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub correlator: Arc<Correlator>,
    pub pending: PendingResponses,
}

impl GatewayState {
    /// `publisher` is used for request publishing only; response
    /// collectors need queue handles of their own.
    pub fn new(config: GatewayConfig, publisher: Arc<dyn MessageQueue>) -> Self {
        let instance_id = config
            .instance_id
            .unwrap_or_else(|| rand::thread_rng().gen_range(0..=MAX_INSTANCE_ID));
        tracing::info!(instance_id, "Gateway instance id assigned");

        let pending = PendingResponses::new();
        let correlator = Correlator::new(instance_id, publisher, pending.clone(), config.poll_interval);

        Self {
            config: Arc::new(config),
            correlator: Arc::new(correlator),
            pending,
        }
    }

    /// Sweep job for this gateway's pending cache
    pub fn sweep(&self) -> PendingSweep {
        PendingSweep::new(
            self.pending.clone(),
            self.config.pending_ttl,
            self.config.sweep_interval,
        )
    }
}

/// Build the gateway router
pub fn create_router(state: GatewayState) -> Router {
    // Layers run outermost last-added first: trace -> logging -> handler
    Router::new()
        .route("/health", get(health_check))
        .fallback(dispatch)
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Serve HTTP until `shutdown` is cancelled.
///
/// Bind and serve failures are retried after `retry_interval`. Once
/// shutdown starts, in-flight requests get `shutdown_timeout` to finish.
pub async fn serve(state: GatewayState, shutdown: CancellationToken) -> Result<(), ConfigError> {
    let addr = state.config.addr()?;
    let retry_interval = state.config.retry_interval;
    let grace = state.config.shutdown_timeout;
    let app = create_router(state);

    while !shutdown.is_cancelled() {
        tracing::info!("Starting HTTP server");

        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(%addr, error = %e, retry_in = ?retry_interval, "Unable to listen");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(retry_interval) => continue,
                }
            }
        };
        tracing::info!("Listening on http://{}", addr);

        let token = shutdown.clone();
        let server = axum::serve(listener, app.clone())
            .with_graceful_shutdown(async move { token.cancelled().await })
            .into_future();
        tokio::pin!(server);

        let result = tokio::select! {
            result = &mut server => result,
            _ = shutdown.cancelled() => match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(grace = ?grace, "Shutdown grace period elapsed, closing connections");
                    Ok(())
                }
            },
        };

        if let Err(e) = result {
            tracing::error!(error = %e, retry_in = ?retry_interval, "HTTP server failed");
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(retry_interval) => {}
            }
        }
    }

    tracing::info!("HTTP server stopped");
    Ok(())
}
