//! Detected arbitrage opportunities and the engine's published snapshot.

use serde::Serialize;

/// One of the two ways to assemble a covering YES+NO pair across venues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combo {
    /// YES on venue A (pm) + NO on venue B (kalshi).
    AYesBNo,
    /// YES on venue B (kalshi) + NO on venue A (pm).
    BYesANo,
}

impl Combo {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AYesBNo => "A-YES + B-NO",
            Self::BYesANo => "B-YES + A-NO",
        }
    }
}

impl Serialize for Combo {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A detected arbitrage candidate. Immutable; produced fresh on every
/// engine tick and superseded by the next tick's snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    pub timestamp: i64,
    pub combo: Combo,
    pub edge_abs: f64,
    pub edge_pct_turn: f64,
    pub pm_title: String,
    pub pm_yes_ask: f64,
    pub pm_no_ask: f64,
    pub kalshi_ticker: String,
    pub kalshi_title: String,
    pub kalshi_yes_bid: f64,
    pub kalshi_yes_ask: f64,
    pub kalshi_no_bid: f64,
    pub kalshi_no_ask: f64,
    pub total_cost: f64,
}

/// The engine's current sorted, capped opportunity list. Replaced
/// atomically on each tick; readers always see a fully-formed slice.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OpportunitySnapshot {
    opportunities: Vec<Opportunity>,
}

impl OpportunitySnapshot {
    #[must_use]
    pub fn new(mut opportunities: Vec<Opportunity>, max_len: usize) -> Self {
        opportunities.sort_by(|a, b| {
            b.edge_pct_turn
                .partial_cmp(&a.edge_pct_turn)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        opportunities.truncate(max_len);
        Self { opportunities }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Opportunity] {
        &self.opportunities
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.opportunities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.opportunities.is_empty()
    }
}
