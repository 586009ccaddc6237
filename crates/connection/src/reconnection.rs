//! Fixed-interval reconnect loop.
//!
//! Contains the shared [`ConnCtx`], cancellation helpers, WebSocket
//! callback setup, and the retry loop. Retries run forever at the
//! configured interval — no backoff growth, no giving up — and only the
//! guard slot's cancellation token (cancelled when an open succeeds or
//! the manager shuts down) stops them.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tvlink_protocol::constants::MessageType;
use tvlink_protocol::envelope::Message;
use tvlink_protocol::registration::registration_payload;

use crate::keystore::KeyStore;
use crate::pairing::PairingState;
use crate::types::{ConnectionEvent, ConnectionState, Endpoint, ReconnectConfig};
use crate::ws_client::{ConnectionError, WsClient};

/// Shared state passed to free functions for callback setup and
/// reconnection. Avoids threading a dozen separate Arc parameters.
#[derive(Clone)]
pub(crate) struct ConnCtx {
    pub(crate) endpoint: Endpoint,
    pub(crate) url: String,
    pub(crate) keys: Arc<KeyStore>,
    pub(crate) pairing: Arc<PairingState>,
    pub(crate) client: Arc<Mutex<Option<WsClient>>>,
    pub(crate) events_tx: mpsc::Sender<ConnectionEvent>,
    /// Monotonic request id counter, starts at 0.
    pub(crate) next_id: Arc<AtomicI64>,
    /// Id of the in-flight registration request, for error correlation.
    pub(crate) register_id: Arc<AtomicI64>,
    /// Key currently presented to the TV; replaced on renewal.
    pub(crate) client_key: Arc<std::sync::Mutex<String>>,
    /// Cancel token for the active reconnect loop. At most one loop
    /// exists per manager; an occupied slot means one is running.
    pub(crate) reconnect_cancel: Arc<std::sync::Mutex<Option<CancellationToken>>>,
    /// Set when a disconnect found the slot occupied. A loop in its
    /// success window would otherwise swallow that disconnect; it
    /// re-checks this latch before exiting.
    pub(crate) missed_disconnect: Arc<AtomicBool>,
    pub(crate) reconnect: ReconnectConfig,
}

impl ConnCtx {
    pub(crate) fn emit(&self, event: ConnectionEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            debug!(url = %self.url, "event dropped: {e}");
        }
    }

    pub(crate) fn emit_state(&self, state: ConnectionState) {
        self.emit(ConnectionEvent::StateChanged(state));
    }
}

/// Cancels any active reconnect loop.
pub(crate) fn cancel_any_reconnect(
    reconnect_cancel: &std::sync::Mutex<Option<CancellationToken>>,
) {
    if let Ok(mut guard) = reconnect_cancel.lock()
        && let Some(token) = guard.take()
    {
        token.cancel();
    }
}

/// Starts the reconnect loop unless one is already running.
///
/// Edge-triggered guard: the slot holds the active loop's cancel token,
/// so a second close event while a loop is pending is a no-op. Returns
/// whether a new loop was started.
pub(crate) fn schedule_reconnect(ctx: &ConnCtx) -> bool {
    let cancel = {
        let Ok(mut guard) = ctx.reconnect_cancel.lock() else {
            return false;
        };
        if guard.is_some() {
            // The running loop may be about to exit after a successful
            // open. Latch the disconnect so it re-schedules on its way
            // out instead of leaving the endpoint dead.
            ctx.missed_disconnect.store(true, Ordering::SeqCst);
            return false;
        }
        let cancel = CancellationToken::new();
        *guard = Some(cancel.clone());
        ctx.missed_disconnect.store(false, Ordering::SeqCst);
        cancel
    };

    info!(url = %ctx.url, interval_secs = ctx.reconnect.interval.as_secs(), "scheduling reconnect");
    tokio::spawn(reconnect_loop(ctx.clone(), cancel));
    true
}

/// Retry loop: wait one interval, attempt a connect, repeat until an
/// open succeeds.
///
/// Returns a boxed future to break the recursive type cycle with
/// `setup_ws_callbacks` (whose disconnect callback schedules this loop).
pub(crate) fn reconnect_loop(
    ctx: ConnCtx,
    cancel: CancellationToken,
) -> Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
    Box::pin(async move {
        loop {
            ctx.emit_state(ConnectionState::Reconnecting);

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(url = %ctx.url, "reconnect cancelled");
                    return;
                }
                _ = tokio::time::sleep(ctx.reconnect.interval) => {}
            }

            info!(url = %ctx.url, "reconnecting");
            match try_connect(&ctx).await {
                Ok(()) => break,
                Err(e) => {
                    warn!(url = %ctx.url, error = %e, "reconnect attempt failed");
                }
            }

            if cancel.is_cancelled() {
                return;
            }
        }

        // Socket is open again. Release the guard slot, but only our
        // own token: the slot changes hands only after the holder is
        // cancelled, so a cancelled token means a newer loop owns it.
        if let Ok(mut guard) = ctx.reconnect_cancel.lock()
            && !cancel.is_cancelled()
        {
            *guard = None;
        }
        info!(url = %ctx.url, "reconnected");

        // The fresh socket can drop before the slot is released above.
        // That disconnect saw an occupied slot and latched instead of
        // scheduling; honour it now.
        if !cancel.is_cancelled() && ctx.missed_disconnect.swap(false, Ordering::SeqCst) {
            info!(url = %ctx.url, "connection dropped during handover, rescheduling");
            schedule_reconnect(&ctx);
        }
    })
}

/// Opens the socket, wires callbacks, and sends the registration
/// message carrying the current client key.
pub(crate) async fn try_connect(ctx: &ConnCtx) -> Result<(), ConnectionError> {
    ctx.emit_state(ConnectionState::Connecting);

    let client = WsClient::connect(&ctx.url, ctx.endpoint.secure).await?;
    setup_ws_callbacks(&client, ctx.clone()).await;

    let key = ctx.client_key.lock().unwrap().clone();
    let id = ctx.next_id.fetch_add(1, Ordering::SeqCst);
    ctx.register_id.store(id, Ordering::SeqCst);
    let payload = registration_payload(&key);
    let register = Message::new(id, MessageType::Register, "", Some(&payload))?;
    client.send(&register).await?;

    // Drop the previous client (if any) only after the new one is live.
    *ctx.client.lock().await = Some(client);
    ctx.emit_state(ConnectionState::Connected);
    info!(url = %ctx.url, "connected, registration sent");
    Ok(())
}

/// Wires inbound dispatch and the disconnect-triggers-reconnect
/// callback onto a fresh [`WsClient`].
pub(crate) async fn setup_ws_callbacks(client: &WsClient, ctx: ConnCtx) {
    let ctx_msg = ctx.clone();
    let outbound = client.sender();
    client
        .set_message_callback(Box::new(move |msg| {
            crate::manager::handle_message(&ctx_msg, &outbound, msg);
        }))
        .await;

    let ctx_dc = ctx;
    client
        .set_disconnect_callback(Box::new(move || {
            info!(url = %ctx_dc.url, "disconnected from TV");
            ctx_dc.emit_state(ConnectionState::Disconnected);
            schedule_reconnect(&ctx_dc);
        }))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::time::Duration;

    fn test_ctx(
        url: String,
        interval: Duration,
    ) -> (ConnCtx, mpsc::Receiver<ConnectionEvent>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let (events_tx, events_rx) = mpsc::channel(64);
        let ctx = ConnCtx {
            endpoint: Endpoint::new("127.0.0.1", false),
            url,
            keys: Arc::new(KeyStore::open(tmp.path().join("keys.json"))),
            pairing: Arc::new(PairingState::new()),
            client: Arc::new(Mutex::new(None)),
            events_tx,
            next_id: Arc::new(AtomicI64::new(0)),
            register_id: Arc::new(AtomicI64::new(-1)),
            client_key: Arc::new(std::sync::Mutex::new(String::new())),
            reconnect_cancel: Arc::new(std::sync::Mutex::new(None)),
            missed_disconnect: Arc::new(AtomicBool::new(false)),
            reconnect: ReconnectConfig { interval },
        };
        (ctx, events_rx, tmp)
    }

    #[test]
    fn cancel_any_reconnect_clears_token() {
        let slot = std::sync::Mutex::new(None);
        let token = CancellationToken::new();
        *slot.lock().unwrap() = Some(token.clone());

        cancel_any_reconnect(&slot);

        assert!(slot.lock().unwrap().is_none());
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_any_reconnect_empty_slot_is_noop() {
        let slot = std::sync::Mutex::new(None);
        cancel_any_reconnect(&slot);
        assert!(slot.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn disconnect_while_slot_held_is_latched() {
        let (ctx, _events, _tmp) =
            test_ctx("ws://127.0.0.1:3000".into(), Duration::from_secs(60));

        assert!(schedule_reconnect(&ctx));
        // Declined while a loop holds the slot, but not dropped.
        assert!(!schedule_reconnect(&ctx));
        assert!(ctx.missed_disconnect.load(Ordering::SeqCst));

        // Installing a fresh token makes the latch obsolete.
        cancel_any_reconnect(&ctx.reconnect_cancel);
        assert!(schedule_reconnect(&ctx));
        assert!(!ctx.missed_disconnect.load(Ordering::SeqCst));
        cancel_any_reconnect(&ctx.reconnect_cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_retries_every_interval_until_cancelled() {
        // Bind then drop to get a port with nothing listening on it.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let interval = Duration::from_secs(60);
        let (ctx, mut events, _tmp) = test_ctx(format!("ws://{addr}"), interval);
        let start = tokio::time::Instant::now();

        let token = CancellationToken::new();
        *ctx.reconnect_cancel.lock().unwrap() = Some(token.clone());
        let handle = tokio::spawn(reconnect_loop(ctx.clone(), token.clone()));

        // Each cycle waits a full interval before dialing, so the Nth
        // attempt cannot start before N intervals have passed.
        for round in 1u32..=2 {
            loop {
                match events.recv().await.unwrap() {
                    ConnectionEvent::StateChanged(ConnectionState::Connecting) => break,
                    ConnectionEvent::StateChanged(_) => {}
                    other => panic!("unexpected event: {other:?}"),
                }
            }
            assert!(start.elapsed() >= interval * round);
        }

        // Cancellation mid-sleep ends the loop without another attempt.
        token.cancel();
        tokio::time::timeout(Duration::from_secs(300), handle)
            .await
            .expect("loop should exit after cancellation")
            .unwrap();
    }

    #[tokio::test]
    async fn drop_right_after_reconnect_dials_again() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (ctx, _events, _tmp) =
            test_ctx(format!("ws://{addr}"), Duration::from_millis(20));

        // Accept, wait for the registration message, then hang up. The
        // client loses the link in the loop's handover window; if the
        // disconnect got swallowed there would be no second dial.
        let server = tokio::spawn(async move {
            let mut accepted = 0u32;
            while accepted < 2 {
                let (stream, _) = listener.accept().await.unwrap();
                if let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await {
                    let _ = ws.next().await;
                    drop(ws);
                    accepted += 1;
                }
            }
        });

        assert!(schedule_reconnect(&ctx));

        tokio::time::timeout(Duration::from_secs(10), server)
            .await
            .expect("no second dial after the connection dropped")
            .unwrap();

        cancel_any_reconnect(&ctx.reconnect_cancel);
    }
}
