use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use pkg_metrics::MetricsRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub fn router(registry: Arc<MetricsRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .with_state(registry)
}

/// Serve `/metrics` and `/healthz` until `cancel` fires.
pub async fn serve(
    addr: SocketAddr,
    registry: Arc<MetricsRegistry>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Serving metrics on {}", addr);
    axum::serve(listener, router(registry))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    info!("Metrics server stopped");
    Ok(())
}

async fn metrics(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], registry.render())
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use pkg_metrics::{LeaseGcMetrics, LeaseGcRecorder};

    #[tokio::test]
    async fn test_metrics_handler_renders_registry() {
        let registry = Arc::new(MetricsRegistry::new());
        let recorder = LeaseGcRecorder::new(registry.clone());
        recorder.culled_leases_inc();

        let response = metrics(State(registry)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            PROMETHEUS_CONTENT_TYPE
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("lease_gc_culled_leases_total 1\n"));
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let registry = Arc::new(MetricsRegistry::new());
        let cancel = CancellationToken::new();
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let handle = tokio::spawn(serve(addr, registry, cancel.clone()));

        cancel.cancel();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("server should stop after cancellation")
            .unwrap();
        assert!(result.is_ok());
    }
}
