//! The arbitrage engine: on a fixed cadence, scores every tracked
//! [`MarketPair`] against both caches and atomically republishes the
//! current [`OpportunitySnapshot`].

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use tokio::sync::watch;
use tokio::time::interval;

use crate::core::cache::{KalshiPriceCache, PmPriceCache};
use crate::core::domain::{Combo, KalshiPriceRecord, MarketPair, Opportunity, OpportunitySnapshot};

pub struct EngineConfig {
    pub threshold_pct: f64,
    pub max_opportunities: usize,
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold_pct: 3.0,
            max_opportunities: 1000,
            tick_interval: Duration::from_secs(1),
        }
    }
}

/// Owns the static list of pairs and the two caches; publishes a fresh
/// snapshot on every tick via an [`ArcSwap`] so readers never block the
/// tick loop and never observe a partial merge.
pub struct ArbitrageEngine {
    pairs: Vec<MarketPair>,
    pm_cache: Arc<PmPriceCache>,
    kalshi_cache: Arc<KalshiPriceCache>,
    kalshi_disabled: bool,
    config: EngineConfig,
    snapshot: Arc<ArcSwap<OpportunitySnapshot>>,
}

impl ArbitrageEngine {
    #[must_use]
    pub fn new(
        pairs: Vec<MarketPair>,
        pm_cache: Arc<PmPriceCache>,
        kalshi_cache: Arc<KalshiPriceCache>,
        kalshi_disabled: bool,
        config: EngineConfig,
    ) -> Self {
        Self {
            pairs,
            pm_cache,
            kalshi_cache,
            kalshi_disabled,
            config,
            snapshot: Arc::new(ArcSwap::from_pointee(OpportunitySnapshot::default())),
        }
    }

    /// A cloneable handle the inspection server reads from without ever
    /// touching the engine.
    #[must_use]
    pub fn snapshot_handle(&self) -> Arc<ArcSwap<OpportunitySnapshot>> {
        self.snapshot.clone()
    }

    /// Runs the 1-second (configurable) tick loop until `shutdown` fires.
    /// Never exits on a single-pair evaluation gap; exits only on
    /// cancellation.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.tick_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(),
                _ = shutdown.changed() => return,
            }
        }
    }

    fn tick(&self) {
        let now = Utc::now().timestamp_millis();
        let mut opportunities = Vec::new();

        if !self.kalshi_disabled {
            for pair in &self.pairs {
                opportunities.extend(evaluate_pair(
                    pair,
                    &self.pm_cache,
                    &self.kalshi_cache,
                    self.config.threshold_pct,
                    now,
                ));
            }
        }

        let snapshot = OpportunitySnapshot::new(opportunities, self.config.max_opportunities);
        metrics::gauge!("engine_opportunity_count").set(snapshot.len() as f64);
        self.snapshot.store(Arc::new(snapshot));
    }
}

/// Runs both combinations for one pair. Returns zero, one, or
/// two opportunities — the combinations are independent.
fn evaluate_pair(
    pair: &MarketPair,
    pm_cache: &PmPriceCache,
    kalshi_cache: &KalshiPriceCache,
    threshold_pct: f64,
    now_ms: i64,
) -> Vec<Opportunity> {
    let mut out = Vec::new();

    let Some(pm_yes) = pm_cache.lookup(pair.pm_yes_token()) else {
        return out;
    };
    let Some(pm_no) = pm_cache.lookup(pair.pm_no_token()) else {
        return out;
    };
    if pm_yes.ask <= 0.0 || pm_no.ask <= 0.0 {
        return out;
    }

    let Some(kalshi) = kalshi_cache.lookup(pair.kalshi_ticker()) else {
        return out;
    };
    if kalshi.yes_bid <= 0.0 || kalshi.yes_ask <= 0.0 {
        return out;
    }

    if let Some(opp) = price_combo(
        Combo::AYesBNo,
        pm_yes.ask + kalshi.no_ask,
        pair,
        pm_yes.ask,
        pm_no.ask,
        &kalshi,
        threshold_pct,
        now_ms,
    ) {
        out.push(opp);
    }

    if let Some(opp) = price_combo(
        Combo::BYesANo,
        kalshi.yes_ask + pm_no.ask,
        pair,
        pm_yes.ask,
        pm_no.ask,
        &kalshi,
        threshold_pct,
        now_ms,
    ) {
        out.push(opp);
    }

    out
}

#[allow(clippy::too_many_arguments)]
fn price_combo(
    combo: Combo,
    total_cost: f64,
    pair: &MarketPair,
    pm_yes_ask: f64,
    pm_no_ask: f64,
    kalshi: &KalshiPriceRecord,
    threshold_pct: f64,
    now_ms: i64,
) -> Option<Opportunity> {
    let edge_abs = 1.0 - total_cost;
    let edge_pct_turn = if total_cost > 0.0 {
        edge_abs / total_cost * 100.0
    } else {
        0.0
    };

    if edge_pct_turn < threshold_pct {
        return None;
    }

    Some(Opportunity {
        timestamp: now_ms,
        combo,
        edge_abs,
        edge_pct_turn,
        pm_title: pair.pm_title().to_string(),
        pm_yes_ask,
        pm_no_ask,
        kalshi_ticker: pair.kalshi_ticker().as_str().to_string(),
        kalshi_title: pair.kalshi_title().to_string(),
        kalshi_yes_bid: kalshi.yes_bid,
        kalshi_yes_ask: kalshi.yes_ask,
        kalshi_no_bid: kalshi.no_bid,
        kalshi_no_ask: kalshi.no_ask,
        total_cost,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::Side;
    use crate::core::domain::{Ticker, TokenId};

    fn make_pair() -> MarketPair {
        MarketPair::new(
            TokenId::new("yes"),
            TokenId::new("no"),
            "Pair title",
            Ticker::new("KX-1"),
            "Kalshi title",
        )
    }

    fn seeded_caches(
        pm_yes_ask: f64,
        pm_no_ask: f64,
        kalshi_yes_bid: f64,
        kalshi_yes_ask: f64,
    ) -> (PmPriceCache, KalshiPriceCache) {
        let pm = PmPriceCache::new();
        pm.update(TokenId::new("yes"), Side::Ask, pm_yes_ask);
        pm.update(TokenId::new("no"), Side::Ask, pm_no_ask);

        let kalshi = KalshiPriceCache::new();
        kalshi.replace(
            Ticker::new("KX-1"),
            KalshiPriceRecord::from_yes(kalshi_yes_bid, kalshi_yes_ask),
        );
        (pm, kalshi)
    }

    #[test]
    fn scenario_1_clear_combo_1() {
        let pair = make_pair();
        let (pm, kalshi) = seeded_caches(0.45, 0.60, 0.54, 0.55);
        let opps = evaluate_pair(&pair, &pm, &kalshi, 3.0, 0);

        assert_eq!(opps.len(), 1);
        let opp = &opps[0];
        assert_eq!(opp.combo.as_str(), "A-YES + B-NO");
        assert!((opp.total_cost - 0.91).abs() < 1e-9);
        assert!((opp.edge_abs - 0.09).abs() < 1e-9);
        assert!((opp.edge_pct_turn - 9.89).abs() < 1e-2);
    }

    #[test]
    fn scenario_2_clear_combo_2() {
        let pair = make_pair();
        let (pm, kalshi) = seeded_caches(0.60, 0.42, 0.51, 0.52);
        let opps = evaluate_pair(&pair, &pm, &kalshi, 3.0, 0);

        assert_eq!(opps.len(), 1);
        let opp = &opps[0];
        assert_eq!(opp.combo.as_str(), "B-YES + A-NO");
        assert!((opp.total_cost - 0.94).abs() < 1e-9);
        assert!((opp.edge_pct_turn - 6.38).abs() < 1e-2);
    }

    #[test]
    fn scenario_3_efficient_market_is_empty() {
        let pair = make_pair();
        let (pm, kalshi) = seeded_caches(0.50, 0.50, 0.50, 0.50);
        let opps = evaluate_pair(&pair, &pm, &kalshi, 3.0, 0);
        assert!(opps.is_empty());
    }

    #[test]
    fn scenario_4_both_combos_positive() {
        let pair = make_pair();
        let (pm, kalshi) = seeded_caches(0.44, 0.44, 0.55, 0.45);
        let opps = evaluate_pair(&pair, &pm, &kalshi, 3.0, 0);
        assert_eq!(opps.len(), 2);
        assert!((opps[0].edge_pct_turn - opps[1].edge_pct_turn).abs() < 1e-9);
    }

    #[test]
    fn missing_pm_price_skips_pair_without_error() {
        let pair = make_pair();
        let pm = PmPriceCache::new();
        pm.update(TokenId::new("yes"), Side::Ask, 0.45);
        // no-token never updated
        let kalshi = KalshiPriceCache::new();
        kalshi.replace(Ticker::new("KX-1"), KalshiPriceRecord::from_yes(0.5, 0.5));

        let opps = evaluate_pair(&pair, &pm, &kalshi, 3.0, 0);
        assert!(opps.is_empty());
    }

    #[test]
    fn threshold_monotonicity_raising_threshold_never_adds() {
        let pair = make_pair();
        let (pm, kalshi) = seeded_caches(0.45, 0.60, 0.54, 0.55);
        let low = evaluate_pair(&pair, &pm, &kalshi, 1.0, 0).len();
        let high = evaluate_pair(&pair, &pm, &kalshi, 20.0, 0).len();
        assert!(high <= low);
    }

    #[test]
    fn tick_publishes_atomically_readable_snapshot() {
        let pair = make_pair();
        let pm = Arc::new(PmPriceCache::new());
        pm.update(TokenId::new("yes"), Side::Ask, 0.45);
        pm.update(TokenId::new("no"), Side::Ask, 0.60);
        let kalshi = Arc::new(KalshiPriceCache::new());
        kalshi.replace(Ticker::new("KX-1"), KalshiPriceRecord::from_yes(0.54, 0.55));

        let engine = ArbitrageEngine::new(
            vec![pair],
            pm,
            kalshi,
            false,
            EngineConfig::default(),
        );
        engine.tick();

        let snapshot = engine.snapshot_handle().load_full();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn disabled_venue_b_yields_empty_snapshot() {
        let pair = make_pair();
        let pm = Arc::new(PmPriceCache::new());
        pm.update(TokenId::new("yes"), Side::Ask, 0.45);
        pm.update(TokenId::new("no"), Side::Ask, 0.60);
        let kalshi = Arc::new(KalshiPriceCache::new());

        let engine = ArbitrageEngine::new(vec![pair], pm, kalshi, true, EngineConfig::default());
        engine.tick();

        assert!(engine.snapshot_handle().load_full().is_empty());
    }
}
