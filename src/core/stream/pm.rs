//! Stream Client A: venue A's public, chunked, many-token orderbook feed.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{interval, sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::core::cache::{PmPriceCache, Side};
use crate::core::domain::TokenId;
use crate::core::stream::backoff::{Backoff, BackoffConfig};
use crate::core::stream::state::{ClientState, StateHandle};

const PING_INTERVAL: Duration = Duration::from_secs(30);
const READ_DEADLINE: Duration = Duration::from_secs(60);
const INTER_CHUNK_PAUSE: Duration = Duration::from_millis(100);
const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct SubscribeMessage {
    #[serde(rename = "type")]
    msg_type: &'static str,
    assets_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct InboundFrame {
    event_type: Option<String>,
    asset: Option<String>,
    price: Option<String>,
    side: Option<String>,
}

pub struct PmClientConfig {
    pub ws_url: String,
    pub chunk_size: usize,
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum ReadOutcome {
    /// Socket closed or errored; reconnect without treating it specially.
    Disconnected,
    /// Read deadline expired with no frames; reconnect, counted separately.
    Stalled,
    /// External shutdown signal received.
    Terminated,
}

/// Venue A stream client. One instance owns one connection lifecycle and
/// writes every applied price update into the shared [`PmPriceCache`].
pub struct PmStreamClient {
    config: PmClientConfig,
    cache: Arc<PmPriceCache>,
    state: StateHandle,
}

impl PmStreamClient {
    #[must_use]
    pub fn new(config: PmClientConfig, cache: Arc<PmPriceCache>) -> Self {
        Self {
            config,
            cache,
            state: StateHandle::new(ClientState::Idle),
        }
    }

    #[must_use]
    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    /// Drive the Idle -> Dialing -> Subscribing -> Reading -> (Closing ->
    /// Backoff ->)* -> Terminated state machine until `shutdown` fires.
    pub async fn run(&self, token_ids: Vec<TokenId>, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = Backoff::new(BackoffConfig::default());

        loop {
            if *shutdown.borrow() {
                self.state.set(ClientState::Terminated);
                return;
            }

            self.state.set(ClientState::Dialing);
            let dial = tokio::select! {
                res = timeout(DIAL_TIMEOUT, connect_async(&self.config.ws_url)) => res,
                _ = shutdown.changed() => {
                    self.state.set(ClientState::Terminated);
                    return;
                }
            };

            let mut ws = match dial {
                Ok(Ok((ws, _response))) => ws,
                Ok(Err(e)) => {
                    warn!(error = %e, "pm dial failed");
                    metrics::counter!("pm_stream_dial_failures_total").increment(1);
                    if self.wait_backoff(&mut backoff, &mut shutdown).await {
                        return;
                    }
                    continue;
                }
                Err(_) => {
                    warn!("pm dial timed out");
                    metrics::counter!("pm_stream_dial_failures_total").increment(1);
                    if self.wait_backoff(&mut backoff, &mut shutdown).await {
                        return;
                    }
                    continue;
                }
            };

            self.state.set(ClientState::Subscribing);
            if let Err(e) = Self::subscribe_chunks(&mut ws, &token_ids, self.config.chunk_size).await {
                warn!(error = %e, "pm subscribe failed");
                self.state.set(ClientState::Closing);
                let _ = ws.close(None).await;
                if self.wait_backoff(&mut backoff, &mut shutdown).await {
                    return;
                }
                continue;
            }

            self.state.set(ClientState::Reading);
            backoff.reset();
            metrics::gauge!("pm_stream_connected").set(1.0);

            let outcome = self.read_loop(&mut ws, &mut shutdown).await;

            metrics::gauge!("pm_stream_connected").set(0.0);
            self.state.set(ClientState::Closing);
            let _ = ws.close(None).await;

            if let ReadOutcome::Terminated = outcome {
                self.state.set(ClientState::Terminated);
                return;
            }
            if let ReadOutcome::Stalled = outcome {
                metrics::counter!("pm_stream_stalls_total").increment(1);
            }

            if self.wait_backoff(&mut backoff, &mut shutdown).await {
                return;
            }
        }
    }

    /// Returns `true` if shutdown fired while waiting.
    async fn wait_backoff(&self, backoff: &mut Backoff, shutdown: &mut watch::Receiver<bool>) -> bool {
        backoff.record_failure();
        self.state.set(ClientState::Backoff);
        let delay = backoff.next_delay();
        debug!(delay_ms = delay.as_millis(), "pm backing off");
        tokio::select! {
            () = sleep(delay) => false,
            _ = shutdown.changed() => {
                self.state.set(ClientState::Terminated);
                true
            }
        }
    }

    async fn subscribe_chunks(
        ws: &mut WsStream,
        token_ids: &[TokenId],
        chunk_size: usize,
    ) -> crate::error::Result<()> {
        let chunk_size = chunk_size.max(1);
        let ids: Vec<String> = token_ids.iter().map(|t| t.as_str().to_string()).collect();

        for (i, chunk) in ids.chunks(chunk_size).enumerate() {
            let msg = SubscribeMessage {
                msg_type: "MARKET",
                assets_ids: chunk.to_vec(),
            };
            let json = serde_json::to_string(&msg)?;
            ws.send(Message::Text(json)).await?;
            info!(chunk = i, assets = chunk.len(), "pm subscribe chunk sent");
            if i + 1 < ids.len().div_ceil(chunk_size) {
                sleep(INTER_CHUNK_PAUSE).await;
            }
        }
        Ok(())
    }

    async fn read_loop(&self, ws: &mut WsStream, shutdown: &mut watch::Receiver<bool>) -> ReadOutcome {
        let mut ping_timer = interval(PING_INTERVAL);
        ping_timer.tick().await; // first tick fires immediately
        let mut deadline = Instant::now() + READ_DEADLINE;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    return ReadOutcome::Terminated;
                }
                _ = ping_timer.tick() => {
                    if ws.send(Message::Ping(Vec::new())).await.is_err() {
                        return ReadOutcome::Disconnected;
                    }
                }
                () = tokio::time::sleep_until(deadline) => {
                    return ReadOutcome::Stalled;
                }
                frame = ws.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            deadline = Instant::now() + READ_DEADLINE;
                            self.apply_frame(&text);
                        }
                        Some(Ok(Message::Ping(data))) => {
                            deadline = Instant::now() + READ_DEADLINE;
                            if ws.send(Message::Pong(data)).await.is_err() {
                                return ReadOutcome::Disconnected;
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            deadline = Instant::now() + READ_DEADLINE;
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            return ReadOutcome::Disconnected;
                        }
                        Some(Ok(_)) => {
                            deadline = Instant::now() + READ_DEADLINE;
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "pm read error");
                            return ReadOutcome::Disconnected;
                        }
                    }
                }
            }
        }
    }

    fn apply_frame(&self, text: &str) {
        let frame: InboundFrame = match serde_json::from_str(text) {
            Ok(f) => f,
            Err(e) => {
                debug!(error = %e, raw = text, "pm frame parse failed");
                metrics::counter!("pm_stream_malformed_frames_total").increment(1);
                return;
            }
        };

        let is_relevant = matches!(frame.event_type.as_deref(), Some("book") | Some("price_change"));
        if !is_relevant {
            return;
        }

        let (Some(asset), Some(price_str), Some(side_str)) = (frame.asset, frame.price, frame.side) else {
            return;
        };

        let Ok(price) = price_str.parse::<f64>() else {
            metrics::counter!("pm_stream_malformed_frames_total").increment(1);
            return;
        };
        if price <= 0.0 {
            return;
        }

        let side = match side_str.as_str() {
            "sell" => Side::Ask,
            "buy" => Side::Bid,
            _ => return,
        };

        self.cache.update(TokenId::from(asset), side, price);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_message_shape_matches_wire_contract() {
        let msg = SubscribeMessage {
            msg_type: "MARKET",
            assets_ids: vec!["a".into(), "b".into()],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "MARKET");
        assert_eq!(json["assets_ids"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn apply_frame_routes_sell_to_ask_and_buy_to_bid() {
        let cache = Arc::new(PmPriceCache::new());
        let client = PmStreamClient::new(
            PmClientConfig {
                ws_url: "wss://example".into(),
                chunk_size: 400,
            },
            cache.clone(),
        );

        client.apply_frame(
            r#"{"event_type":"book","asset":"tok","price":"0.45","side":"sell"}"#,
        );
        client.apply_frame(
            r#"{"event_type":"price_change","asset":"tok","price":"0.40","side":"buy"}"#,
        );

        let record = cache.lookup(&TokenId::new("tok")).unwrap();
        assert_eq!(record.ask, 0.45);
        assert_eq!(record.bid, 0.40);
    }

    #[test]
    fn apply_frame_ignores_unknown_event_types() {
        let cache = Arc::new(PmPriceCache::new());
        let client = PmStreamClient::new(
            PmClientConfig {
                ws_url: "wss://example".into(),
                chunk_size: 400,
            },
            cache.clone(),
        );
        client.apply_frame(r#"{"event_type":"tick_size_change"}"#);
        assert!(cache.is_empty());
    }

    #[test]
    fn apply_frame_skips_zero_price() {
        let cache = Arc::new(PmPriceCache::new());
        let client = PmStreamClient::new(
            PmClientConfig {
                ws_url: "wss://example".into(),
                chunk_size: 400,
            },
            cache.clone(),
        );
        client.apply_frame(r#"{"event_type":"book","asset":"tok","price":"0","side":"sell"}"#);
        assert!(cache.lookup(&TokenId::new("tok")).is_none());
    }
}
