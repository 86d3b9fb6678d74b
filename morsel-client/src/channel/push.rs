//! WebSocket push transport
//!
//! One socket per subscription, scoped to the order via the URL query. The
//! server only ever sends; the client answers transport pings and otherwise
//! just decodes status frames.

use crate::channel::EventSink;
use crate::error::ChannelError;
use futures::{SinkExt, StreamExt};
use shared::StatusEvent;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Open the status socket for one order.
pub(crate) async fn connect(ws_url: &str) -> Result<WsStream, ChannelError> {
    let (ws, _response) = connect_async(ws_url)
        .await
        .map_err(|e| ChannelError::Connect(e.to_string()))?;
    Ok(ws)
}

/// Run one socket until cancellation or transport failure.
///
/// Returns `Ok(())` only on cancellation; any server-side close or transport
/// error is reported so the owner can fall back and reconnect.
pub(crate) async fn run_session(
    ws: WsStream,
    order_id: &str,
    sink: &EventSink,
    cancel: &CancellationToken,
) -> Result<(), ChannelError> {
    let (mut ws_sink, mut ws_stream) = ws.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws_sink.close().await;
                return Ok(());
            }

            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_frame(text.as_str(), order_id, sink);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(order_id, "status socket closed by server");
                        return Err(ChannelError::Closed);
                    }
                    Some(Err(e)) => {
                        return Err(ChannelError::Protocol(e.to_string()));
                    }
                    None => {
                        return Err(ChannelError::Closed);
                    }
                    _ => {} // Binary, Pong: ignore
                }
            }
        }
    }
}

/// Decode one text frame and emit its status.
///
/// Malformed frames and frames tagged for another order are dropped; a bad
/// event never tears down an established session.
fn handle_frame(text: &str, order_id: &str, sink: &EventSink) {
    let event: StatusEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(order_id, error = %e, "dropping malformed status frame");
            return;
        }
    };

    if let Some(tag) = event.order_id.as_deref()
        && tag != order_id
    {
        tracing::debug!(order_id, frame_order_id = tag, "dropping status frame for another order");
        return;
    }

    sink.emit(event.status);
}
