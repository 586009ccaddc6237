//! Outbound half of the socket: drains the frame queue into the sink.

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Drains queued frames into the sink until the owner cancels, all
/// senders drop, or a write fails. Every exit path attempts a final
/// Close frame so the TV sees a clean shutdown rather than a cut wire.
pub(crate) async fn write_pump<S>(
    mut sink: S,
    mut frames: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = frames.recv() => frame,
        };
        let Some(frame) = frame else { break };
        if let Err(err) = sink.send(frame).await {
            warn!(error = %err, "socket write failed");
            break;
        }
    }

    let _ = sink.send(tungstenite::Message::Close(None)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::sink;
    use std::pin::Pin;
    use std::time::Duration;

    type FrameSink = Pin<
        Box<dyn futures_util::Sink<tungstenite::Message, Error = tungstenite::Error> + Send>,
    >;

    /// Sink that copies every frame into a channel for assertions.
    fn capture_sink() -> (FrameSink, mpsc::Receiver<tungstenite::Message>) {
        let (tx, rx) = mpsc::channel::<tungstenite::Message>(16);
        let sink = sink::unfold(tx, |tx, frame: tungstenite::Message| async move {
            let _ = tx.send(frame).await;
            Ok::<_, tungstenite::Error>(tx)
        });
        (Box::pin(sink), rx)
    }

    #[tokio::test]
    async fn frames_reach_the_sink_in_order() {
        let (sink, mut seen) = capture_sink();
        let (frames_tx, frames_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let pump = tokio::spawn(write_pump(sink, frames_rx, cancel.clone()));

        for text in ["first", "second"] {
            frames_tx
                .send(tungstenite::Message::Text(text.into()))
                .await
                .unwrap();
        }

        for want in ["first", "second"] {
            let frame = seen.recv().await.unwrap();
            assert!(matches!(frame, tungstenite::Message::Text(t) if t == want));
        }

        cancel.cancel();
        let _ = pump.await;
    }

    #[tokio::test]
    async fn close_frame_follows_queue_shutdown() {
        let (sink, mut seen) = capture_sink();
        let (frames_tx, frames_rx) = mpsc::channel(16);
        let pump = tokio::spawn(write_pump(sink, frames_rx, CancellationToken::new()));

        // Dropping the last sender ends the pump without cancellation.
        drop(frames_tx);
        tokio::time::timeout(Duration::from_secs(2), pump)
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(
            seen.recv().await,
            Some(tungstenite::Message::Close(_))
        ));
    }

    #[tokio::test]
    async fn cancellation_stops_the_pump_with_a_close_frame() {
        let (sink, mut seen) = capture_sink();
        let (_frames_tx, frames_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let pump = tokio::spawn(write_pump(sink, frames_rx, cancel.clone()));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), pump)
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(
            seen.recv().await,
            Some(tungstenite::Message::Close(_))
        ));
    }
}
