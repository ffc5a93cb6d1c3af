//! Build-event channel
//!
//! One WebSocket subscription scoped to a single deployment's build channel.
//! The connection is opened and subscribed *before* the deploy is triggered
//! so no early build output is lost. Inbound frames for other channels, and
//! malformed frames, are dropped without affecting state.

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{protocol::Message, Bytes};
use tokio_tungstenite::connect_async;
use tracing::{debug, warn};
use url::Url;

use serde::Deserialize;

use std::time::Duration;

/// Application-level keepalive period while the connection is open.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Bound on the connect + subscribe handshake.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Reserved prefix for control lines; never printed.
const CONTROL_PREFIX: &str = "__";

/// Terminal sentinel carrying the build result.
const END_SENTINEL_PREFIX: &str = "__DEPLOY_END__:";

/// Build channel name for a project's deployments.
pub fn build_channel(project_id: &str) -> String {
    format!("project:{}:build", project_id)
}

/// Signals surfaced to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Transport open, subscribe message sent.
    Subscribed,

    /// An in-scope, non-control log line ready for display.
    Line(String),

    /// The terminal sentinel was observed. Always the last event.
    Ended { success: bool },

    /// Transport closed without a sentinel.
    Closed,

    /// The transport could not be established or errored.
    Failed(String),
}

/// One inbound frame as sent by the platform.
#[derive(Debug, Deserialize)]
struct Frame {
    channel: String,

    #[serde(default)]
    data: serde_json::Value,
}

/// Decode one inbound text frame. `None` means the frame is dropped:
/// malformed JSON, a foreign channel, non-string data or a control line.
pub fn decode_frame(raw: &str, channel: &str) -> Option<ChannelEvent> {
    let frame: Frame = serde_json::from_str(raw).ok()?;
    if frame.channel != channel {
        return None;
    }

    let line = frame.data.as_str()?;
    if let Some(result) = line.strip_prefix(END_SENTINEL_PREFIX) {
        return Some(ChannelEvent::Ended {
            success: result.contains("success"),
        });
    }
    if line.starts_with(CONTROL_PREFIX) {
        return None;
    }

    Some(ChannelEvent::Line(line.to_string()))
}

/// Handle for closing the channel; closing also stops the keepalive.
pub struct ChannelHandle {
    close_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    /// Close the transport if still open and wait for the task to finish.
    pub async fn close(mut self) {
        if let Some(tx) = self.close_tx.take() {
            let _ = tx.send(());
        }
        let _ = self.task.await;
    }
}

/// Open the event channel for one deployment.
///
/// Returns immediately; `ChannelEvent::Subscribed` (or `Failed`) arrives on
/// the receiver once the handshake resolves.
pub fn open_channel(
    url: Url,
    channel: String,
) -> (mpsc::UnboundedReceiver<ChannelEvent>, ChannelHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (close_tx, close_rx) = oneshot::channel();

    let task = tokio::spawn(run_channel(url, channel, tx, close_rx));

    (
        rx,
        ChannelHandle {
            close_tx: Some(close_tx),
            task,
        },
    )
}

async fn run_channel(
    url: Url,
    channel: String,
    tx: mpsc::UnboundedSender<ChannelEvent>,
    mut close_rx: oneshot::Receiver<()>,
) {
    debug!("Connecting to event stream: {}", url);

    let mut ws = match tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url.as_str())).await {
        Ok(Ok((ws, _))) => ws,
        Ok(Err(e)) => {
            let _ = tx.send(ChannelEvent::Failed(e.to_string()));
            return;
        }
        Err(_) => {
            let _ = tx.send(ChannelEvent::Failed("connection timed out".to_string()));
            return;
        }
    };

    let subscribe = serde_json::json!({ "channel": &channel, "data": "subscribe" }).to_string();
    if let Err(e) = ws.send(Message::Text(subscribe.into())).await {
        let _ = tx.send(ChannelEvent::Failed(e.to_string()));
        return;
    }
    let _ = tx.send(ChannelEvent::Subscribed);

    // First keepalive fires one interval after subscribing, not immediately.
    let mut keepalive = tokio::time::interval_at(
        tokio::time::Instant::now() + KEEPALIVE_INTERVAL,
        KEEPALIVE_INTERVAL,
    );

    loop {
        tokio::select! {
            _ = &mut close_rx => {
                let _ = ws.close(None).await;
                return;
            }
            _ = keepalive.tick() => {
                // Send failures are non-fatal; a dead transport surfaces on
                // the read side as close or error.
                if let Err(e) = ws.send(Message::Ping(Bytes::new())).await {
                    warn!("Keepalive ping failed: {}", e);
                }
            }
            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(event) = decode_frame(&text, &channel) {
                            let ended = matches!(event, ChannelEvent::Ended { .. });
                            if tx.send(event).is_err() {
                                return;
                            }
                            if ended {
                                // The sentinel is the last channel-sourced
                                // event; nothing may follow it.
                                let _ = ws.close(None).await;
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = tx.send(ChannelEvent::Closed);
                        return;
                    }
                    Some(Err(e)) => {
                        let _ = tx.send(ChannelEvent::Failed(e.to_string()));
                        return;
                    }
                    Some(Ok(_)) => {} // pings, pongs, binary frames
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAN: &str = "project:P1:build";

    fn frame(channel: &str, data: &str) -> String {
        serde_json::json!({ "channel": channel, "data": data }).to_string()
    }

    #[test]
    fn test_build_channel_name() {
        assert_eq!(build_channel("P1"), "project:P1:build");
    }

    #[test]
    fn test_ordinary_line_forwarded() {
        assert_eq!(
            decode_frame(&frame(CHAN, "Building..."), CHAN),
            Some(ChannelEvent::Line("Building...".to_string()))
        );
    }

    #[test]
    fn test_foreign_channel_dropped() {
        assert_eq!(decode_frame(&frame("project:P2:build", "line"), CHAN), None);
    }

    #[test]
    fn test_malformed_json_dropped() {
        assert_eq!(decode_frame("not json at all", CHAN), None);
        assert_eq!(decode_frame("{\"channel\": 3}", CHAN), None);
    }

    #[test]
    fn test_non_string_data_dropped() {
        let raw = serde_json::json!({ "channel": CHAN, "data": 42 }).to_string();
        assert_eq!(decode_frame(&raw, CHAN), None);
    }

    #[test]
    fn test_sentinel_success() {
        assert_eq!(
            decode_frame(&frame(CHAN, "__DEPLOY_END__:success"), CHAN),
            Some(ChannelEvent::Ended { success: true })
        );
    }

    #[test]
    fn test_sentinel_failure() {
        assert_eq!(
            decode_frame(&frame(CHAN, "__DEPLOY_END__:failure"), CHAN),
            Some(ChannelEvent::Ended { success: false })
        );
    }

    #[test]
    fn test_other_control_lines_dropped() {
        assert_eq!(decode_frame(&frame(CHAN, "__PROGRESS__:50"), CHAN), None);
    }

    #[test]
    fn test_dunder_in_middle_is_ordinary() {
        assert_eq!(
            decode_frame(&frame(CHAN, "step __init__ done"), CHAN),
            Some(ChannelEvent::Line("step __init__ done".to_string()))
        );
    }
}
