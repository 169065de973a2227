//! The inspection HTTP server: `/healthz`, `/arbs`, `/metrics`.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::core::domain::OpportunitySnapshot;
use crate::core::stream::StateHandle;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct InspectionState {
    pub snapshot: Arc<ArcSwap<OpportunitySnapshot>>,
    pub pm_state: StateHandle,
    pub kalshi_state: StateHandle,
}

/// Serves the three routes on `addr` (e.g. `:8080`) until `shutdown` fires.
/// The accept loop itself runs indefinitely; only the post-signal drain is
/// bounded to [`DRAIN_TIMEOUT`]. `metrics_handle` is installed by the caller
/// before any task that emits metrics is spawned, so nothing is dropped.
pub async fn serve(
    addr: &str,
    state: InspectionState,
    metrics_handle: PrometheusHandle,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut shutdown_signal = shutdown.clone();

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/arbs", get(arbs))
        .route("/metrics", get(metrics_text))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state((state, metrics_handle));

    let bind_addr = normalize_addr(addr);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error = %e, addr = %bind_addr, "inspection server failed to bind");
            return;
        }
    };

    info!(addr = %bind_addr, "inspection server listening");

    let serve_fut = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown.changed().await;
    });
    tokio::pin!(serve_fut);

    tokio::select! {
        result = &mut serve_fut => {
            if let Err(e) = result {
                tracing::error!(error = %e, "inspection server exited with error");
            }
            return;
        }
        _ = shutdown_signal.changed() => {}
    }

    if tokio::time::timeout(DRAIN_TIMEOUT, serve_fut).await.is_err() {
        tracing::warn!("inspection server drain exceeded timeout");
    }
}

/// `HTTP_ADDR` may be given as a bare `:8080`; axum wants a full host.
fn normalize_addr(addr: &str) -> String {
    if let Some(port) = addr.strip_prefix(':') {
        format!("0.0.0.0:{port}")
    } else {
        addr.to_string()
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn arbs(State((state, _)): State<(InspectionState, PrometheusHandle)>) -> impl IntoResponse {
    axum::Json(state.snapshot.load_full().as_slice().to_vec())
}

async fn metrics_text(State((state, handle)): State<(InspectionState, PrometheusHandle)>) -> String {
    metrics::gauge!("pm_stream_state").set(state.pm_state.get() as u8 as f64);
    metrics::gauge!("kalshi_stream_state").set(state.kalshi_state.get() as u8 as f64);
    handle.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_addr_expands_bare_port() {
        assert_eq!(normalize_addr(":8080"), "0.0.0.0:8080");
    }

    #[test]
    fn normalize_addr_leaves_full_host_alone() {
        assert_eq!(normalize_addr("127.0.0.1:8080"), "127.0.0.1:8080");
    }
}
