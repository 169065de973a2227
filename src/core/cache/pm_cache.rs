//! Thread-safe price cache for venue A (public orderbook), one writer
//! (the stream client's read loop) and many readers (the engine, the
//! inspection server).

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::core::domain::{PmPriceRecord, TokenId};

/// Notification sent when a token's top-of-book changes.
#[derive(Debug, Clone)]
pub struct PmPriceUpdate {
    pub token_id: TokenId,
}

/// Side carried by a single venue-A frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

pub struct PmPriceCache {
    records: RwLock<HashMap<TokenId, PmPriceRecord>>,
    tx: Option<broadcast::Sender<PmPriceUpdate>>,
}

impl PmPriceCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            tx: None,
        }
    }

    /// Construct a cache that also broadcasts update notifications,
    /// bounded so a slow/absent consumer never blocks the writer.
    #[must_use]
    pub fn with_notifications(capacity: usize) -> (Self, broadcast::Receiver<PmPriceUpdate>) {
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
    pub fn subscribe(&self) -> Option<broadcast::Receiver<PmPriceUpdate>> {
        self.tx.as_ref().map(|tx| tx.subscribe())
    }

    /// Merge a single-sided price update into the record for `token_id`,
    /// creating the record on first update. Idempotent on identical input.
    pub fn update(&self, token_id: TokenId, side: Side, price: f64) {
        {
            let mut records = self.records.write();
            let record = records.entry(token_id.clone()).or_default();
            match side {
                Side::Ask => record.apply_ask(price),
                Side::Bid => record.apply_bid(price),
            }
        }
        if let Some(ref tx) = self.tx {
            let _ = tx.send(PmPriceUpdate { token_id });
        }
    }

    /// Value-copy lookup; absence is not an error, just `None`.
    #[must_use]
    pub fn lookup(&self, token_id: &TokenId) -> Option<PmPriceRecord> {
        self.records.read().get(token_id).copied()
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

impl Default for PmPriceCache {
    fn default() -> Self {
        Self::new()
    }
}
