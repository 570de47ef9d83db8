//! The `/ws` real-time channel.
//!
//! The handshake is guarded by [`ConnectionAuthenticator`](crate::auth::ConnectionAuthenticator);
//! a refused handshake answers 401 and never upgrades. Once open, a reader
//! task forwards text messages in arrival order to the connection task, which
//! runs each frame through the connection's [`ChannelSession`] and then the
//! [`ChannelBroker`], and interleaves broadcast activities.

mod broker;

pub use broker::{ChannelBroker, Dispatch};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio_util::sync::CancellationToken;
use tracklog_proto::Frame;

use crate::auth::{ChannelSession, ConnectionAttributes, ConnectionRequest};
use crate::state::AppState;

/// Inbound frames buffered between the reader task and the connection task.
const INBOUND_QUEUE: usize = 64;

/// WebSocket routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// Authenticate the handshake, then upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let request = ConnectionRequest::new(uri.query(), headers);
    let mut attributes = ConnectionAttributes::new();

    if !state
        .connection_gate
        .before_accept(&request, &mut attributes, state.now())
        .await
    {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, attributes))
}

async fn handle_socket(socket: WebSocket, state: AppState, attributes: ConnectionAttributes) {
    let subject = attributes
        .user()
        .map(|identity| identity.subject.clone())
        .unwrap_or_default();
    let connection_id = state.connections.register(&subject);

    let (mut sink, mut stream) = socket.split();
    let closed = CancellationToken::new();
    let (frames_tx, mut frames_rx) = mpsc::channel::<String>(INBOUND_QUEUE);

    let reader = {
        let closed = closed.clone();
        let connection_id = connection_id.clone();
        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if frames_tx.send(text).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!(connection_id = %connection_id, error = %e, "websocket read error");
                        break;
                    }
                }
            }
            closed.cancel();
        })
    };

    let mut session = ChannelSession::new(state.authenticator.clone(), connection_id.clone());
    let mut broker = ChannelBroker::new(&state, connection_id.clone());
    let mut events = state.broadcaster.subscribe();

    loop {
        let dispatch = tokio::select! {
            biased;

            _ = closed.cancelled() => break,

            Some(text) = frames_rx.recv() => match Frame::decode(&text) {
                Ok(Some(frame)) => {
                    // Abandon authentication if the peer goes away meanwhile.
                    let forwarded = tokio::select! {
                        biased;
                        _ = closed.cancelled() => None,
                        forwarded = session.pre_send(frame, state.now()) => forwarded,
                    };

                    match forwarded {
                        Some(frame) => broker.handle(frame, session.identity()),
                        None => Dispatch::none(),
                    }
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "malformed frame");
                    // Unauthenticated peers get no protocol feedback.
                    if session.identity().is_some() {
                        Dispatch::reply(Frame::error("Malformed frame", e.to_string()))
                    } else {
                        Dispatch::none()
                    }
                }
            },

            received = events.recv() => match received {
                Ok(event) => Dispatch::replies(broker.deliver(&event, session.identity())),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(connection_id = %connection_id, skipped, "connection lagging behind broadcasts");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        };

        let mut write_failed = false;
        for frame in dispatch.replies {
            if sink.send(Message::Text(frame.encode())).await.is_err() {
                write_failed = true;
                break;
            }
        }
        if write_failed || dispatch.close {
            break;
        }
    }

    session.close();
    reader.abort();
    let _ = sink.close().await;
    if let Some(info) = state.connections.remove(&connection_id) {
        let open_ms = (Utc::now() - info.connected_at).num_milliseconds();
        tracing::info!(connection_id = %info.id, subject = %info.subject, open_ms, "connection closed");
    }
}
