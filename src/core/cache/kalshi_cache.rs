//! Thread-safe price cache for venue B (authenticated ticker), replaced
//! atomically per ticker identifier on each frame.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::core::domain::{KalshiPriceRecord, Ticker};

#[derive(Debug, Clone)]
pub struct KalshiPriceUpdate {
    pub ticker: Ticker,
}

pub struct KalshiPriceCache {
    records: RwLock<HashMap<Ticker, KalshiPriceRecord>>,
    tx: Option<broadcast::Sender<KalshiPriceUpdate>>,
}

impl KalshiPriceCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            tx: None,
        }
    }

    #[must_use]
    pub fn with_notifications(capacity: usize) -> (Self, broadcast::Receiver<KalshiPriceUpdate>) {
        let (tx, rx) = broadcast::channel(capacity);
        (
            Self {
                records: RwLock::new(HashMap::new()),
                tx: Some(tx),
            },
            rx,
        )
    }

    #[must_use]
    pub fn subscribe(&self) -> Option<broadcast::Receiver<KalshiPriceUpdate>> {
        self.tx.as_ref().map(|tx| tx.subscribe())
    }

    /// Replace the record for `ticker` in full. Callers derive the NO side
    /// before calling (see [`KalshiPriceRecord::from_yes`]); a frame with no
    /// usable YES side should not call this at all, leaving the previous
    /// record (or absence) untouched.
    pub fn replace(&self, ticker: Ticker, record: KalshiPriceRecord) {
        {
            self.records.write().insert(ticker.clone(), record);
        }
        if let Some(ref tx) = self.tx {
            let _ = tx.send(KalshiPriceUpdate { ticker });
        }
    }

    #[must_use]
    pub fn lookup(&self, ticker: &Ticker) -> Option<KalshiPriceRecord> {
        self.records.read().get(ticker).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for KalshiPriceCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_of_unknown_ticker_is_not_present() {
        let cache = KalshiPriceCache::new();
        assert!(cache.lookup(&Ticker::new("missing")).is_none());
    }

    #[test]
    fn replace_is_atomic_across_all_four_fields() {
        let cache = KalshiPriceCache::new();
        let ticker = Ticker::new("KX-1");
        cache.replace(ticker.clone(), KalshiPriceRecord::from_yes(0.54, 0.55));

        let record = cache.lookup(&ticker).unwrap();
        assert_eq!(record.yes_bid, 0.54);
        assert_eq!(record.yes_ask, 0.55);
        assert_eq!(record.no_bid, 0.45);
        assert_eq!(record.no_ask, 0.46);
    }

    #[tokio::test]
    async fn subscribers_are_notified_on_replace() {
        let (cache, mut rx) = KalshiPriceCache::with_notifications(16);
        let ticker = Ticker::new("KX-1");
        cache.replace(ticker.clone(), KalshiPriceRecord::from_yes(0.5, 0.5));
        let update = rx.recv().await.unwrap();
        assert_eq!(update.ticker, ticker);
    }
}
