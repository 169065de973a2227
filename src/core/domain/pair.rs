//! The `MarketPair` — a logically-equivalent binary market tracked on both venues.

use super::ids::{Ticker, TokenId};

/// Instrument identifiers on both venues for one logically-equivalent binary
/// market, plus display titles. Created once by discovery at bootstrap and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketPair {
    pm_yes_token: TokenId,
    pm_no_token: TokenId,
    pm_title: String,
    kalshi_ticker: Ticker,
    kalshi_title: String,
}

impl MarketPair {
    #[must_use]
    pub fn new(
        pm_yes_token: TokenId,
        pm_no_token: TokenId,
        pm_title: impl Into<String>,
        kalshi_ticker: Ticker,
        kalshi_title: impl Into<String>,
    ) -> Self {
        Self {
            pm_yes_token,
            pm_no_token,
            pm_title: pm_title.into(),
            kalshi_ticker,
            kalshi_title: kalshi_title.into(),
        }
    }

    #[must_use]
    pub fn pm_yes_token(&self) -> &TokenId {
        &self.pm_yes_token
    }

    #[must_use]
    pub fn pm_no_token(&self) -> &TokenId {
        &self.pm_no_token
    }

    #[must_use]
    pub fn pm_title(&self) -> &str {
        &self.pm_title
    }

    #[must_use]
    pub fn kalshi_ticker(&self) -> &Ticker {
        &self.kalshi_ticker
    }

    #[must_use]
    pub fn kalshi_title(&self) -> &str {
        &self.kalshi_title
    }

    /// Every venue-A token this pair subscribes to (YES and NO legs).
    #[must_use]
    pub fn pm_token_ids(&self) -> [TokenId; 2] {
        [self.pm_yes_token.clone(), self.pm_no_token.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pair() -> MarketPair {
        MarketPair::new(
            TokenId::new("yes-token"),
            TokenId::new("no-token"),
            "Will X happen?",
            Ticker::new("KX-X"),
            "Will X happen by year end?",
        )
    }

    #[test]
    fn accessors_return_constructed_values() {
        let pair = make_pair();
        assert_eq!(pair.pm_yes_token().as_str(), "yes-token");
        assert_eq!(pair.pm_no_token().as_str(), "no-token");
        assert_eq!(pair.pm_title(), "Will X happen?");
        assert_eq!(pair.kalshi_ticker().as_str(), "KX-X");
        assert_eq!(pair.kalshi_title(), "Will X happen by year end?");
    }

    #[test]
    fn pm_token_ids_covers_both_legs() {
        let pair = make_pair();
        let ids = pair.pm_token_ids();
        assert_eq!(ids[0].as_str(), "yes-token");
        assert_eq!(ids[1].as_str(), "no-token");
    }
}
