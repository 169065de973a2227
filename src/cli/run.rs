//! Handler for the `run` command.

use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use crate::app::{App, Config};
use crate::core::observability::{self, LogFormat};
use crate::error::{Error, Result};

fn map_app_result(result: std::result::Result<Result<()>, tokio::task::JoinError>) -> Result<()> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(error = %e, "application exited with error");
            Err(e)
        }
        Err(e) => {
            error!(error = %e, "application task join failed");
            Err(Error::Connection(e.to_string()))
        }
    }
}

pub async fn execute() -> Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;

    observability::init_logging(
        &config.log_level,
        if config.log_json { LogFormat::Json } else { LogFormat::Pretty },
    );

    info!(http_addr = %config.http_addr, "duoedge starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut app_handle = tokio::spawn(async move { App::run_with_shutdown(config, shutdown_rx).await });

    tokio::select! {
        result = &mut app_handle => {
            map_app_result(result)?;
            info!("duoedge stopped");
            return Ok(());
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    }

    map_app_result(app_handle.await)?;
    info!("duoedge stopped");
    Ok(())
}
