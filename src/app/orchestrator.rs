//! Wires configuration, caches, the two stream clients, the arbitrage
//! engine, and the inspection server into one running process.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::app::config::Config;
use crate::app::inspection::{self, InspectionState};
use crate::core::cache::{KalshiPriceCache, PmPriceCache};
use crate::core::discovery::{PairSource, StaticPairSource};
use crate::core::domain::MarketPair;
use crate::core::engine::{ArbitrageEngine, EngineConfig};
use crate::core::stream::{KalshiClientConfig, KalshiCredentials, KalshiStreamClient, PmClientConfig, PmStreamClient};
use crate::error::Result;

/// The running application: owns every long-lived task and the shutdown
/// signal that tears them all down together.
pub struct App;

impl App {
    pub async fn run(config: Config) -> Result<()> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        Self::run_with_shutdown(config, shutdown_rx).await
    }

    pub async fn run_with_shutdown(config: Config, shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(http_addr = %config.http_addr, kalshi_disabled = config.kalshi_disabled(), "starting");

        // Installed before any task that records metrics is spawned, so
        // nothing emitted in the window before the HTTP server binds is lost.
        let metrics_handle = crate::core::observability::init_metrics();

        let pairs = bootstrap_pairs().await?;
        info!(pair_count = pairs.len(), "pairs loaded");

        let pm_cache = Arc::new(PmPriceCache::new());
        let kalshi_cache = Arc::new(KalshiPriceCache::new());

        let pm_client = Arc::new(PmStreamClient::new(
            PmClientConfig {
                ws_url: config.pm_ws_url.clone(),
                chunk_size: config.pm_chunk,
            },
            pm_cache.clone(),
        ));

        let kalshi_client = Arc::new(KalshiStreamClient::new(
            KalshiClientConfig {
                ws_url: config.kalshi_ws_url.clone(),
                credentials: KalshiCredentials {
                    key_id: config.kalshi_key_id.clone(),
                    private_key_path: config.kalshi_private_key_path.clone(),
                },
            },
            kalshi_cache.clone(),
        ));

        let token_ids = pairs.iter().flat_map(MarketPair::pm_token_ids).collect::<Vec<_>>();

        let engine = Arc::new(ArbitrageEngine::new(
            pairs,
            pm_cache.clone(),
            kalshi_cache.clone(),
            kalshi_client.is_disabled(),
            EngineConfig {
                threshold_pct: config.edge_min_ror_pct,
                ..EngineConfig::default()
            },
        ));

        let inspection_state = InspectionState {
            snapshot: engine.snapshot_handle(),
            pm_state: pm_client.state_handle(),
            kalshi_state: kalshi_client.state_handle(),
        };

        let pm_task = {
            let pm_client = pm_client.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { pm_client.run(token_ids, shutdown).await })
        };
        let kalshi_task = {
            let kalshi_client = kalshi_client.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { kalshi_client.run(shutdown).await })
        };
        let engine_task = {
            let engine = engine.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { engine.run(shutdown).await })
        };
        let http_task = {
            let addr = config.http_addr.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                inspection::serve(&addr, inspection_state, metrics_handle, shutdown).await
            })
        };

        let _ = tokio::join!(pm_task, kalshi_task, engine_task, http_task);

        info!("stopped");
        Ok(())
    }
}

/// Pair discovery is intentionally out of scope here; this crate consumes
/// whatever a `PairSource` produces. Until a real crawler lands, that is an
/// empty static list — the engine simply has nothing to evaluate.
async fn bootstrap_pairs() -> Result<Vec<MarketPair>> {
    let source: Box<dyn PairSource> = Box::new(StaticPairSource::new(Vec::new()));
    source.discover().await
}
