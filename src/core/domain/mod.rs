//! Core domain types for duoedge.
//!
//! - [`TokenId`] / [`Ticker`] — instrument identifiers on venue A and venue B.
//! - [`MarketPair`] — a market tracked across both venues.
//! - [`PmPriceRecord`] / [`KalshiPriceRecord`] — per-venue top-of-book.
//! - [`Opportunity`] / [`OpportunitySnapshot`] — detected arbitrage output.

mod ids;
mod opportunity;
mod pair;
mod price_record;

pub use ids::{Ticker, TokenId};
pub use opportunity::{Combo, Opportunity, OpportunitySnapshot};
pub use pair::MarketPair;
pub use price_record::{KalshiPriceRecord, PmPriceRecord};
