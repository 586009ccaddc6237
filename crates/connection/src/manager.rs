//! Connection manager for a single TV.
//!
//! Owns the socket lifecycle: opening, the registration handshake,
//! inbound dispatch (including the alert auto-dismiss), pairing state,
//! key renewal, and the reconnect loop. One instance per endpoint, alive
//! for the process lifetime.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite;
use tracing::{info, warn};

use tvlink_protocol::alert::{AlertCreatedPayload, alert_payload, close_alert_payload};
use tvlink_protocol::constants::{ALERT_HACK_ID, MessageType};
use tvlink_protocol::envelope::Message;
use tvlink_protocol::registration::ClientKeyPayload;
use tvlink_protocol::uris::{CLOSE_ALERT, CREATE_ALERT, Scheme, Target};

use crate::keystore::KeyStore;
use crate::pairing::{PairingEvent, PairingState};
use crate::reconnection::{ConnCtx, cancel_any_reconnect, schedule_reconnect, try_connect};
use crate::types::{ConnectionEvent, Endpoint, ReconnectConfig};
use crate::ws_client::ConnectionError;

/// Connection manager for one TV endpoint.
pub struct ConnectionManager {
    ctx: ConnCtx,
    events_rx: Mutex<Option<mpsc::Receiver<ConnectionEvent>>>,
}

impl ConnectionManager {
    /// Creates a manager for an endpoint, with the last-known client key
    /// loaded from the shared store.
    pub fn new(endpoint: Endpoint, keys: Arc<KeyStore>) -> Self {
        Self::with_config(endpoint, keys, ReconnectConfig::default())
    }

    pub fn with_config(
        endpoint: Endpoint,
        keys: Arc<KeyStore>,
        reconnect: ReconnectConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        let url = endpoint.url();
        let client_key = keys.get(&url);
        info!(url = %url, paired_before = !client_key.is_empty(), "manager created");

        let ctx = ConnCtx {
            endpoint,
            url,
            keys,
            pairing: Arc::new(PairingState::new()),
            client: Arc::new(Mutex::new(None)),
            events_tx,
            next_id: Arc::new(AtomicI64::new(0)),
            register_id: Arc::new(AtomicI64::new(-1)),
            client_key: Arc::new(std::sync::Mutex::new(client_key)),
            reconnect_cancel: Arc::new(std::sync::Mutex::new(None)),
            missed_disconnect: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            reconnect,
        };

        Self {
            ctx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Canonical connection URL for this endpoint.
    pub fn url(&self) -> &str {
        &self.ctx.url
    }

    /// Opens the connection and sends the registration message.
    ///
    /// Idempotent entry point: cancels any pending reconnect loop and
    /// replaces the current socket. Failure is not returned — a failed
    /// attempt schedules the reconnect loop, and all outcomes are
    /// observable through the event stream.
    pub async fn connect(&self) {
        cancel_any_reconnect(&self.ctx.reconnect_cancel);
        if let Some(old) = self.ctx.client.lock().await.take() {
            old.close().await;
        }
        if let Err(e) = try_connect(&self.ctx).await {
            warn!(url = %self.ctx.url, error = %e, "connection failed");
            self.ctx
                .emit_state(crate::types::ConnectionState::Disconnected);
            schedule_reconnect(&self.ctx);
        }
    }

    /// Returns whether the registration handshake has been accepted.
    pub fn is_paired(&self) -> bool {
        self.ctx.pairing.is_paired()
    }

    /// Takes the event receiver. Can only be called once.
    pub async fn take_events(&self) -> Option<mpsc::Receiver<ConnectionEvent>> {
        self.events_rx.lock().await.take()
    }

    /// Sends a command to a resolved target.
    ///
    /// Ssap targets go out as plain requests. Luna targets are wrapped
    /// in the alert hack: the real URI and params ride in the alert's
    /// button and close hooks, under the reserved sentinel id so the
    /// dispatch logic can dismiss the alert once the TV names it.
    pub async fn send_request(
        &self,
        target: Target,
        payload: &serde_json::Value,
    ) -> Result<(), ConnectionError> {
        if !self.is_paired() {
            return Err(ConnectionError::NotPaired);
        }

        match target.scheme {
            Scheme::Ssap => {
                self.send_command(MessageType::Request, target.to_uri(), Some(payload), None)
                    .await
            }
            Scheme::Luna => {
                let alert = alert_payload(&target.to_uri(), payload);
                self.send_command(
                    MessageType::Request,
                    CREATE_ALERT.to_uri(),
                    Some(&alert),
                    Some(ALERT_HACK_ID),
                )
                .await
            }
        }
    }

    /// Builds and sends a wire message.
    ///
    /// Uses the next counter value unless an explicit id is supplied
    /// (the alert hack passes the sentinel here).
    pub async fn send_command<T: serde::Serialize>(
        &self,
        msg_type: MessageType,
        uri: impl Into<String>,
        payload: Option<&T>,
        id: Option<i64>,
    ) -> Result<(), ConnectionError> {
        let id = id.unwrap_or_else(|| self.ctx.next_id.fetch_add(1, Ordering::SeqCst));
        let msg = Message::new(id, msg_type, uri, payload)?;

        let guard = self.ctx.client.lock().await;
        let client = guard.as_ref().ok_or(ConnectionError::Closed)?;
        client.send(&msg).await
    }

    /// Stops the reconnect loop and closes the socket.
    pub async fn shutdown(&self) {
        cancel_any_reconnect(&self.ctx.reconnect_cancel);
        if let Some(client) = self.ctx.client.lock().await.take() {
            client.close().await;
        }
        info!(url = %self.ctx.url, "manager shut down");
    }

    #[cfg(test)]
    pub(crate) fn ctx(&self) -> &ConnCtx {
        &self.ctx
    }
}

/// Routes one inbound message.
///
/// Runs on the read pump; `outbound` is the write pump handle, used for
/// the alert auto-dismiss which bypasses the normal request path.
pub(crate) fn handle_message(
    ctx: &ConnCtx,
    outbound: &mpsc::Sender<tungstenite::Message>,
    msg: Message,
) {
    match msg.msg_type {
        MessageType::Registered => {
            let key = msg
                .parse_payload::<ClientKeyPayload>()
                .ok()
                .flatten()
                .map(|p| p.client_key)
                .unwrap_or_default();
            info!(url = %ctx.url, "paired");
            if let Some(event) = ctx.pairing.set(true) {
                emit_pairing(ctx, event);
            }

            let changed = {
                let mut held = ctx.client_key.lock().unwrap();
                if *held != key {
                    *held = key.clone();
                    true
                } else {
                    false
                }
            };
            if changed {
                info!(url = %ctx.url, "client key renewed");
                // File write happens off the read pump so a slow disk
                // cannot stall inbound dispatch.
                let keys = ctx.keys.clone();
                let url = ctx.url.clone();
                tokio::task::spawn_blocking(move || {
                    if let Err(e) = keys.renew(&url, &key) {
                        warn!(url = %url, error = %e, "failed to persist client key");
                    }
                });
            }
        }

        MessageType::Error if msg.id == ctx.register_id.load(Ordering::SeqCst) => {
            warn!(url = %ctx.url, error = ?msg.error, "pairing rejected");
            if let Some(event) = ctx.pairing.set(false) {
                emit_pairing(ctx, event);
            }
        }

        MessageType::Response if msg.id == ALERT_HACK_ID => {
            let alert_id = msg
                .parse_payload::<AlertCreatedPayload>()
                .ok()
                .flatten()
                .map(|p| p.alert_id)
                .unwrap_or_default();
            if alert_id.is_empty() {
                ctx.emit(ConnectionEvent::Inbound(msg));
                return;
            }
            close_alert(ctx, outbound, &alert_id);
        }

        _ => {
            ctx.emit(ConnectionEvent::Inbound(msg));
        }
    }
}

fn emit_pairing(ctx: &ConnCtx, event: PairingEvent) {
    ctx.emit(match event {
        PairingEvent::Paired => ConnectionEvent::Paired,
        PairingEvent::Unpaired => ConnectionEvent::Unpaired,
    });
}

/// Dismisses an alert created by the Luna workaround.
fn close_alert(ctx: &ConnCtx, outbound: &mpsc::Sender<tungstenite::Message>, alert_id: &str) {
    info!(url = %ctx.url, alert_id, "auto-closing alert");
    let id = ctx.next_id.fetch_add(1, Ordering::SeqCst);
    let payload = close_alert_payload(alert_id);
    let msg = match Message::new(id, MessageType::Request, CLOSE_ALERT.to_uri(), Some(&payload))
    {
        Ok(m) => m,
        Err(e) => {
            warn!(url = %ctx.url, error = %e, "failed to build closeAlert");
            return;
        }
    };
    match serde_json::to_string(&msg) {
        Ok(json) => {
            if outbound
                .try_send(tungstenite::Message::Text(json.into()))
                .is_err()
            {
                warn!(url = %ctx.url, "failed to queue closeAlert");
            }
        }
        Err(e) => warn!(url = %ctx.url, error = %e, "failed to encode closeAlert"),
    }
}
