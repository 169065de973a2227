//! Price caches shared between the stream clients and the arbitrage engine.

mod kalshi_cache;
mod pm_cache;

pub use kalshi_cache::{KalshiPriceCache, KalshiPriceUpdate};
pub use pm_cache::{PmPriceCache, PmPriceUpdate, Side};
