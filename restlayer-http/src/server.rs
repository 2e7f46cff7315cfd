//! HTTP server with graceful shutdown

use axum::Router;
use tokio::{net::TcpListener, signal};
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    config::{ApiConfig, Config},
    error::ServiceError,
    router::RestApi,
};

/// Mounts the API under the configured prefix.
pub fn app(api: RestApi, config: &ApiConfig) -> Router {
    let prefix = config.prefix.trim_end_matches('/');
    let router = api.into_router();

    match prefix.is_empty() {
        true => router,
        false => Router::new().nest(prefix, router),
    }
}

pub struct Server {
    config: Config,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Serves `app` until SIGINT or SIGTERM, then drains in-flight requests.
    pub async fn serve(self, app: Router) -> Result<(), ServiceError> {
        let service = &self.config.service;
        let addr = format!("{}:{}", service.host, service.port);

        let app = app
            .layer(CompressionLayer::new())
            .layer(RequestBodyLimitLayer::new(service.body_limit_kb * 1024))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_response(DefaultOnResponse::new().include_headers(true)),
            )
            .layer(CatchPanicLayer::new());

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!(service = %service.name, %addr, "Starting server");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
