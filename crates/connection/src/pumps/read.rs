//! WebSocket read pump — parses and dispatches inbound messages.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use tvlink_protocol::constants::MAX_MESSAGE_SIZE;
use tvlink_protocol::envelope::Message;

use crate::ws_client::{DisconnectCallback, MessageCallback};

/// Reads frames from the WebSocket and hands parsed messages to the
/// inbound callback. Fires the disconnect callback when the stream
/// ends, errors, or receives a close frame.
pub(crate) async fn read_pump<S>(
    mut read: S,
    on_message: Arc<Mutex<Option<MessageCallback>>>,
    on_disconnect: DisconnectCallback,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            // Owner-initiated teardown: the manager is replacing or
            // shutting down this connection and must not see a
            // disconnect (which would schedule a reconnect loop).
            _ = cancel.cancelled() => return,

            msg = read.next() => {
                match msg {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        handle_text_message(&text, &on_message).await;
                    }
                    Some(Ok(tungstenite::Message::Ping(data))) => {
                        trace!("received ping, sending pong");
                        let _ = write_tx.send(tungstenite::Message::Pong(data)).await;
                    }
                    Some(Ok(tungstenite::Message::Close(_))) => {
                        debug!("received close frame");
                        break;
                    }
                    Some(Ok(_)) => {} // Pong, Binary — ignore
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {e}");
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    if let Some(cb) = on_disconnect.lock().await.as_ref() {
        cb();
    }
}

/// Parses a text frame and dispatches it.
///
/// Malformed JSON is logged and dropped — a bad frame from the TV must
/// never take the connection loop down.
async fn handle_text_message(text: &str, on_message: &Arc<Mutex<Option<MessageCallback>>>) {
    if text.len() > MAX_MESSAGE_SIZE {
        warn!("message too large ({} bytes), dropping", text.len());
        return;
    }

    let msg: Message = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!("failed to parse message: {e}");
            return;
        }
    };

    trace!(msg_type = ?msg.msg_type, id = msg.id, "received message");

    let guard = on_message.lock().await;
    if let Some(cb) = guard.as_ref() {
        cb(msg);
    } else {
        warn!(id = msg.id, "no message callback set, dropping");
    }
}
