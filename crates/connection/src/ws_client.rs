//! WebSocket client for a single TV connection.
//!
//! Splits the socket into a write pump (mpsc -> sink) and a read pump
//! (stream -> message callback). Commands are fire-and-forget; the TV
//! answers with correlated `response` messages that the read pump hands
//! back through the inbound callback.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite;

use tvlink_protocol::constants::MAX_MESSAGE_SIZE;
use tvlink_protocol::envelope::Message;

/// Errors from the connection layer.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("WebSocket error: {0}")]
    Ws(#[from] tungstenite::Error),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection closed")]
    Closed,

    #[error("not paired")]
    NotPaired,
}

/// Callback type for inbound messages.
pub type MessageCallback = Box<dyn Fn(Message) + Send + Sync>;

/// Callback type for disconnect notification.
pub(crate) type DisconnectCallback = Arc<Mutex<Option<Box<dyn Fn() + Send + Sync>>>>;

/// WebSocket client connected to a single TV.
pub struct WsClient {
    write_tx: mpsc::Sender<tungstenite::Message>,
    on_message: Arc<Mutex<Option<MessageCallback>>>,
    on_disconnect: DisconnectCallback,
    _read_handle: tokio::task::JoinHandle<()>,
    _write_handle: tokio::task::JoinHandle<()>,
    cancel: tokio_util::sync::CancellationToken,
}

impl WsClient {
    /// Opens a WebSocket to the TV.
    ///
    /// When `secure` is set, certificate validation is disabled: TVs
    /// present self-signed certificates on the TLS port.
    pub async fn connect(url: &str, secure: bool) -> Result<Self, ConnectionError> {
        let mut ws_config = tungstenite::protocol::WebSocketConfig::default();
        ws_config.max_message_size = Some(MAX_MESSAGE_SIZE);
        ws_config.max_frame_size = Some(MAX_MESSAGE_SIZE);

        let connector = if secure {
            let tls = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()?;
            Some(tokio_tungstenite::Connector::NativeTls(tls))
        } else {
            None
        };

        let (ws_stream, _) = tokio_tungstenite::connect_async_tls_with_config(
            url,
            Some(ws_config),
            false,
            connector,
        )
        .await?;
        let (write, read) = ws_stream.split();

        let (write_tx, write_rx) = mpsc::channel::<tungstenite::Message>(64);
        let on_message: Arc<Mutex<Option<MessageCallback>>> = Arc::new(Mutex::new(None));
        let on_disconnect: DisconnectCallback = Arc::new(Mutex::new(None));
        let cancel = tokio_util::sync::CancellationToken::new();

        let write_handle = {
            let cancel = cancel.clone();
            tokio::spawn(crate::pumps::write::write_pump(write, write_rx, cancel))
        };

        let read_handle = {
            let on_message = on_message.clone();
            let on_disconnect = on_disconnect.clone();
            let cancel = cancel.clone();
            let write_tx = write_tx.clone();
            tokio::spawn(crate::pumps::read::read_pump(
                read,
                on_message,
                on_disconnect,
                write_tx,
                cancel,
            ))
        };

        Ok(Self {
            write_tx,
            on_message,
            on_disconnect,
            _read_handle: read_handle,
            _write_handle: write_handle,
            cancel,
        })
    }

    /// Queues a message for sending.
    pub async fn send(&self, msg: &Message) -> Result<(), ConnectionError> {
        let json = serde_json::to_string(msg)?;
        self.write_tx
            .send(tungstenite::Message::Text(json.into()))
            .await
            .map_err(|_| ConnectionError::Closed)
    }

    /// Returns a handle for queueing raw frames from dispatch code.
    pub(crate) fn sender(&self) -> mpsc::Sender<tungstenite::Message> {
        self.write_tx.clone()
    }

    /// Sets the callback for inbound messages.
    pub async fn set_message_callback(&self, cb: MessageCallback) {
        *self.on_message.lock().await = Some(cb);
    }

    /// Sets the callback for disconnection.
    pub async fn set_disconnect_callback(&self, cb: Box<dyn Fn() + Send + Sync>) {
        *self.on_disconnect.lock().await = Some(cb);
    }

    /// Gracefully closes the connection.
    pub async fn close(&self) {
        self.cancel.cancel();
        let _ = self.write_tx.send(tungstenite::Message::Close(None)).await;
    }
}

impl Drop for WsClient {
    fn drop(&mut self) {
        self.cancel.cancel();
        self._read_handle.abort();
        self._write_handle.abort();
    }
}
