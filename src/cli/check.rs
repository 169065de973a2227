//! `check-config`: validate environment-derived configuration without
//! starting any connection.

use crate::app::Config;
use crate::cli::output;
use crate::core::stream::SigningKeyHandle;
use crate::error::Result;

pub fn execute_config() -> Result<()> {
    let _ = dotenvy::dotenv();
    output::section("Configuration Check");

    match Config::from_env() {
        Ok(config) => {
            output::success("configuration is valid");

            output::section("Summary");
            output::field("HTTP_ADDR", &config.http_addr);
            output::field("EDGE_MIN_ROR_PCT", config.edge_min_ror_pct);
            output::field("TITLE_SIM", config.title_sim);
            output::field("TIME_WINDOW_H", config.time_window_h);
            output::field("PM_CHUNK", config.pm_chunk);
            output::field("PM_WS_URL", &config.pm_ws_url);
            output::field("KALSHI_WS_URL", &config.kalshi_ws_url);

            if config.kalshi_disabled() {
                output::warning("KALSHI_KEY_ID not set; venue B is disabled");
                output::success("configuration check complete");
                return Ok(());
            }

            output::success("venue B credentials configured");

            let path = config
                .kalshi_private_key_path
                .as_deref()
                .expect("validate() requires a path alongside KALSHI_KEY_ID");

            match SigningKeyHandle::load_from_pem_file(path) {
                Ok(_) => {
                    output::success("KALSHI_PRIVATE_KEY_PATH parses as a valid private key");
                    output::success("configuration check complete");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        Err(e) => Err(e),
    }
}
