//! Stream Client B: venue B's authenticated, single-channel ticker feed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{interval, sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::core::cache::KalshiPriceCache;
use crate::core::domain::{KalshiPriceRecord, Ticker};
use crate::core::stream::backoff::{Backoff, BackoffConfig};
use crate::core::stream::signing::{build_handshake, SignedHandshake, SigningKeyHandle};
use crate::core::stream::state::{ClientState, StateHandle};
use crate::error::{Error, Result};

const PING_INTERVAL: Duration = Duration::from_secs(30);
const READ_DEADLINE: Duration = Duration::from_secs(60);
const DIAL_TIMEOUT: Duration = Duration::from_secs(10);
const UPGRADE_PATH: &str = "/trade-api/ws/v2";

#[derive(Debug, Serialize)]
struct SubscribeMessage {
    #[serde(rename = "type")]
    msg_type: &'static str,
    channel: &'static str,
}

#[derive(Debug, Deserialize)]
struct InboundFrame {
    channel: Option<String>,
    ticker: Option<String>,
    yes_bid: Option<f64>,
    yes_ask: Option<f64>,
}

/// Venue-B credentials. Absence of either field downgrades the client to
/// the absorbing `Disabled` state.
pub struct KalshiCredentials {
    pub key_id: Option<String>,
    pub private_key_path: Option<PathBuf>,
}

pub struct KalshiClientConfig {
    pub ws_url: String,
    pub credentials: KalshiCredentials,
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

enum ReadOutcome {
    Disconnected,
    Stalled,
    Terminated,
}

/// Either an armed client with loaded credentials, or permanently disabled.
enum Armed {
    Ready { key_id: String, key: SigningKeyHandle },
    Disabled,
}

pub struct KalshiStreamClient {
    ws_url: String,
    armed: Armed,
    cache: Arc<KalshiPriceCache>,
    state: StateHandle,
}

impl KalshiStreamClient {
    /// Construct the client, loading the private key if both the key id and
    /// key path are configured. Key-load failure also downgrades to
    /// `Disabled` rather than making startup fatal; a missing credential is
    /// purely a construction-time concern, not an operational error.
    #[must_use]
    pub fn new(config: KalshiClientConfig, cache: Arc<KalshiPriceCache>) -> Self {
        let armed = match (config.credentials.key_id, config.credentials.private_key_path) {
            (Some(key_id), Some(path)) => match SigningKeyHandle::load_from_pem_file(&path) {
                Ok(key) => Armed::Ready { key_id, key },
                Err(e) => {
                    warn!(error = %e, "kalshi private key failed to load, disabling venue B");
                    Armed::Disabled
                }
            },
            _ => Armed::Disabled,
        };

        let initial_state = if matches!(armed, Armed::Disabled) {
            ClientState::Disabled
        } else {
            ClientState::Idle
        };

        Self {
            ws_url: config.ws_url,
            armed,
            cache,
            state: StateHandle::new(initial_state),
        }
    }

    #[must_use]
    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        matches!(self.armed, Armed::Disabled)
    }

    /// No-op if disabled; otherwise runs the same FSM shape as Stream
    /// Client A (§4.2), with a signed handshake on each dial attempt.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let (key_id, key) = match &self.armed {
            Armed::Disabled => return,
            Armed::Ready { key_id, key } => (key_id, key),
        };

        let mut backoff = Backoff::new(BackoffConfig::default());

        loop {
            if *shutdown.borrow() {
                self.state.set(ClientState::Terminated);
                return;
            }

            self.state.set(ClientState::Dialing);
            let handshake = build_handshake(key, key_id, UPGRADE_PATH, now_ms());

            let request = match Self::build_request(&self.ws_url, &handshake) {
                Ok(req) => req,
                Err(e) => {
                    warn!(error = %e, "kalshi request build failed");
                    if self.wait_backoff(&mut backoff, &mut shutdown).await {
                        return;
                    }
                    continue;
                }
            };

            let dial = tokio::select! {
                res = timeout(DIAL_TIMEOUT, connect_async(request)) => res,
                _ = shutdown.changed() => {
                    self.state.set(ClientState::Terminated);
                    return;
                }
            };

            let mut ws = match dial {
                Ok(Ok((ws, _response))) => ws,
                Ok(Err(e)) => {
                    warn!(error = %e, "kalshi dial/handshake failed");
                    metrics::counter!("kalshi_stream_dial_failures_total").increment(1);
                    if self.wait_backoff(&mut backoff, &mut shutdown).await {
                        return;
                    }
                    continue;
                }
                Err(_) => {
                    warn!("kalshi dial timed out");
                    metrics::counter!("kalshi_stream_dial_failures_total").increment(1);
                    if self.wait_backoff(&mut backoff, &mut shutdown).await {
                        return;
                    }
                    continue;
                }
            };

            self.state.set(ClientState::Subscribing);
            let sub = SubscribeMessage {
                msg_type: "subscribe",
                channel: "ticker",
            };
            let json = match serde_json::to_string(&sub) {
                Ok(j) => j,
                Err(e) => {
                    warn!(error = %e, "kalshi subscribe encode failed");
                    if self.wait_backoff(&mut backoff, &mut shutdown).await {
                        return;
                    }
                    continue;
                }
            };
            if ws.send(Message::Text(json)).await.is_err() {
                self.state.set(ClientState::Closing);
                let _ = ws.close(None).await;
                if self.wait_backoff(&mut backoff, &mut shutdown).await {
                    return;
                }
                continue;
            }
            info!("kalshi subscribed to ticker channel");

            self.state.set(ClientState::Reading);
            backoff.reset();
            metrics::gauge!("kalshi_stream_connected").set(1.0);

            let outcome = self.read_loop(&mut ws, &mut shutdown).await;

            metrics::gauge!("kalshi_stream_connected").set(0.0);
            self.state.set(ClientState::Closing);
            let _ = ws.close(None).await;

            if let ReadOutcome::Terminated = outcome {
                self.state.set(ClientState::Terminated);
                return;
            }
            if let ReadOutcome::Stalled = outcome {
                metrics::counter!("kalshi_stream_stalls_total").increment(1);
            }

            if self.wait_backoff(&mut backoff, &mut shutdown).await {
                return;
            }
        }
    }

    fn build_request(ws_url: &str, handshake: &SignedHandshake) -> Result<Request> {
        let mut request = ws_url
            .into_client_request()
            .map_err(|e| Error::Connection(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert(
            "KALSHI-ACCESS-KEY",
            HeaderValue::from_str(&handshake.key_id).map_err(|e| Error::Signing(e.to_string()))?,
        );
        headers.insert(
            "KALSHI-ACCESS-SIGNATURE",
            HeaderValue::from_str(&handshake.signature_b64).map_err(|e| Error::Signing(e.to_string()))?,
        );
        headers.insert(
            "KALSHI-ACCESS-TIMESTAMP",
            HeaderValue::from_str(&handshake.timestamp_ms.to_string())
                .map_err(|e| Error::Signing(e.to_string()))?,
        );
        Ok(request)
    }

    async fn wait_backoff(&self, backoff: &mut Backoff, shutdown: &mut watch::Receiver<bool>) -> bool {
        backoff.record_failure();
        self.state.set(ClientState::Backoff);
        let delay = backoff.next_delay();
        debug!(delay_ms = delay.as_millis(), "kalshi backing off");
        tokio::select! {
            () = sleep(delay) => false,
            _ = shutdown.changed() => {
                self.state.set(ClientState::Terminated);
                true
            }
        }
    }

    async fn read_loop(&self, ws: &mut WsStream, shutdown: &mut watch::Receiver<bool>) -> ReadOutcome {
        let mut ping_timer = interval(PING_INTERVAL);
        ping_timer.tick().await;
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
                            warn!(error = %e, "kalshi read error");
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
                debug!(error = %e, raw = text, "kalshi frame parse failed");
                metrics::counter!("kalshi_stream_malformed_frames_total").increment(1);
                return;
            }
        };

        if frame.channel.as_deref() != Some("ticker") {
            return;
        }
        let Some(ticker) = frame.ticker else { return };

        // A partial ticker (missing either YES side) is treated as
        // "unchanged" rather than deriving a silently-invalid NO side.
        let (Some(yes_bid), Some(yes_ask)) = (frame.yes_bid, frame.yes_ask) else {
            return;
        };

        self.cache
            .replace(Ticker::from(ticker), KalshiPriceRecord::from_yes(yes_bid, yes_ask));
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_client() -> KalshiStreamClient {
        KalshiStreamClient::new(
            KalshiClientConfig {
                ws_url: "wss://example".into(),
                credentials: KalshiCredentials {
                    key_id: None,
                    private_key_path: None,
                },
            },
            Arc::new(KalshiPriceCache::new()),
        )
    }

    #[test]
    fn missing_credentials_disables_client() {
        let client = disabled_client();
        assert!(client.is_disabled());
        assert_eq!(client.state_handle().get(), ClientState::Disabled);
    }

    #[tokio::test]
    async fn run_is_a_no_op_when_disabled() {
        let client = disabled_client();
        let (_tx, rx) = watch::channel(false);
        client.run(rx).await;
        assert!(client.is_disabled());
    }

    #[test]
    fn apply_frame_derives_no_side() {
        let client = disabled_client();
        client.apply_frame(r#"{"channel":"ticker","ticker":"KX-1","yes_bid":0.54,"yes_ask":0.55}"#);
        let record = client.cache.lookup(&Ticker::new("KX-1")).unwrap();
        assert_eq!(record.no_bid, 0.45);
        assert_eq!(record.no_ask, 0.46);
    }

    #[test]
    fn apply_frame_ignores_partial_ticker() {
        let client = disabled_client();
        client.apply_frame(r#"{"channel":"ticker","ticker":"KX-1","yes_bid":0.54}"#);
        assert!(client.cache.lookup(&Ticker::new("KX-1")).is_none());
    }

    #[test]
    fn apply_frame_ignores_non_ticker_channel() {
        let client = disabled_client();
        client.apply_frame(r#"{"channel":"orderbook_delta","ticker":"KX-1"}"#);
        assert!(client.cache.lookup(&Ticker::new("KX-1")).is_none());
    }
}
