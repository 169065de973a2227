//! Application configuration, loaded entirely from environment variables
//! with a `validate()` pass before anything connects.

use std::path::PathBuf;

use crate::error::{Error, Result};

const DEFAULT_HTTP_ADDR: &str = ":8080";
const DEFAULT_EDGE_MIN_ROR_PCT: f64 = 3.0;
const DEFAULT_TITLE_SIM: f64 = 0.60;
const DEFAULT_TIME_WINDOW_H: u64 = 168;
const DEFAULT_PM_CHUNK: usize = 400;
const DEFAULT_PM_WS_URL: &str = "wss://ws-subscriptions-clob.polymarket.com/ws/market";
const DEFAULT_KALSHI_WS_URL: &str = "wss://trading-api.kalshi.com/trade-api/ws/v2";

/// Fully resolved, validated configuration. Built once at startup from
/// environment variables; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub http_addr: String,
    pub edge_min_ror_pct: f64,
    pub title_sim: f64,
    pub time_window_h: u64,
    pub pm_chunk: usize,
    pub pm_ws_url: String,
    pub kalshi_ws_url: String,
    pub kalshi_key_id: Option<String>,
    pub kalshi_private_key_path: Option<PathBuf>,
    pub log_level: String,
    pub log_json: bool,
}

impl Config {
    /// Load from the process environment. `dotenvy::dotenv()` should be
    /// called by the binary before this, so a `.env` file is honored too.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            http_addr: env_or("HTTP_ADDR", DEFAULT_HTTP_ADDR),
            edge_min_ror_pct: env_parse_or("EDGE_MIN_ROR_PCT", DEFAULT_EDGE_MIN_ROR_PCT)?,
            title_sim: env_parse_or("TITLE_SIM", DEFAULT_TITLE_SIM)?,
            time_window_h: env_parse_or("TIME_WINDOW_H", DEFAULT_TIME_WINDOW_H)?,
            pm_chunk: env_parse_or("PM_CHUNK", DEFAULT_PM_CHUNK)?,
            pm_ws_url: env_or("PM_WS_URL", DEFAULT_PM_WS_URL),
            kalshi_ws_url: env_or("KALSHI_WS_URL", DEFAULT_KALSHI_WS_URL),
            kalshi_key_id: std::env::var("KALSHI_KEY_ID").ok().filter(|s| !s.is_empty()),
            kalshi_private_key_path: std::env::var("KALSHI_PRIVATE_KEY_PATH")
                .ok()
                .map(PathBuf::from),
            log_level: env_or("RUST_LOG", "info"),
            log_json: std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
        };
        config.validate()?;
        Ok(config)
    }

    /// `true` when venue B has no key configured: absence
    /// of `KALSHI_KEY_ID` downgrades venue B to permanently `Disabled`.
    #[must_use]
    pub fn kalshi_disabled(&self) -> bool {
        self.kalshi_key_id.is_none()
    }

    fn validate(&self) -> Result<()> {
        if self.http_addr.trim().is_empty() {
            return Err(Error::Config("HTTP_ADDR must not be empty".into()));
        }
        if self.edge_min_ror_pct < 0.0 {
            return Err(Error::Config("EDGE_MIN_ROR_PCT must be >= 0".into()));
        }
        if !(0.0..=1.0).contains(&self.title_sim) {
            return Err(Error::Config("TITLE_SIM must be within [0.0, 1.0]".into()));
        }
        if self.time_window_h == 0 {
            return Err(Error::Config("TIME_WINDOW_H must be > 0".into()));
        }
        if self.pm_chunk == 0 {
            return Err(Error::Config("PM_CHUNK must be > 0".into()));
        }
        if self.pm_ws_url.trim().is_empty() {
            return Err(Error::Config("PM_WS_URL must not be empty".into()));
        }
        if self.kalshi_ws_url.trim().is_empty() {
            return Err(Error::Config("KALSHI_WS_URL must not be empty".into()));
        }
        if self.kalshi_key_id.is_some() && self.kalshi_private_key_path.is_none() {
            return Err(Error::Config(
                "KALSHI_PRIVATE_KEY_PATH is required when KALSHI_KEY_ID is set".into(),
            ));
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "HTTP_ADDR",
            "EDGE_MIN_ROR_PCT",
            "TITLE_SIM",
            "TIME_WINDOW_H",
            "PM_CHUNK",
            "PM_WS_URL",
            "KALSHI_WS_URL",
            "KALSHI_KEY_ID",
            "KALSHI_PRIVATE_KEY_PATH",
            "LOG_FORMAT",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn defaults_apply_with_no_env_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.http_addr, DEFAULT_HTTP_ADDR);
        assert_eq!(config.edge_min_ror_pct, DEFAULT_EDGE_MIN_ROR_PCT);
        assert_eq!(config.title_sim, DEFAULT_TITLE_SIM);
        assert_eq!(config.time_window_h, DEFAULT_TIME_WINDOW_H);
        assert_eq!(config.pm_chunk, DEFAULT_PM_CHUNK);
        assert!(config.kalshi_disabled());
    }

    #[test]
    fn missing_private_key_path_with_key_id_fails_validation() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("KALSHI_KEY_ID", "key-1");
        let result = Config::from_env();
        assert!(result.is_err());
        clear_env();
    }

    #[test]
    fn title_sim_out_of_range_fails_validation() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("TITLE_SIM", "1.5");
        let result = Config::from_env();
        assert!(result.is_err());
        clear_env();
    }

    #[test]
    fn key_id_present_with_path_disables_nothing() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("KALSHI_KEY_ID", "key-1");
        std::env::set_var("KALSHI_PRIVATE_KEY_PATH", "/tmp/key.pem");
        let config = Config::from_env().unwrap();
        assert!(!config.kalshi_disabled());
        clear_env();
    }
}
