use crate::error::ProxyError;
use crate::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::header::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use sparql_proxy_scheduler::QueueSnapshot;
use tokio::sync::broadcast;

#[derive(Serialize)]
struct StateFrame<'a> {
    r#type: &'static str,
    #[serde(flatten)]
    state: &'a QueueSnapshot,
}

/// Commands an admin observer may send over the live channel.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    PurgeCache,
    CancelJob { id: String },
}

/// `GET /live`: queue snapshots pushed to admin observers.
///
/// The admin cookie is checked at handshake time; unauthenticated
/// connections are refused before the upgrade.
pub(crate) async fn handle_live(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if !state.admin.is_authorized(&headers) {
        return ProxyError::Unauthorized.into_response();
    }
    ws.on_upgrade(move |socket| live_session(socket, state))
}

async fn live_session(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let mut events = state.queue.subscribe();

    if send_state(&mut sink, &state.queue.snapshot()).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(snapshot) => {
                    if send_state(&mut sink, &snapshot).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "live observer lagged behind queue events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => handle_client_frame(&state, text.as_str()).await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!(error = %err, "live channel closed with error");
                    break;
                }
            },
        }
    }
}

async fn send_state(
    sink: &mut SplitSink<WebSocket, Message>,
    snapshot: &QueueSnapshot,
) -> Result<(), axum::Error> {
    let frame = serde_json::to_string(&StateFrame {
        r#type: "state",
        state: snapshot,
    })
    .map_err(axum::Error::new)?;
    sink.send(Message::Text(frame.into())).await
}

async fn handle_client_frame(state: &AppState, text: &str) {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::PurgeCache) => match state.cache.purge().await {
            Ok(()) => tracing::info!("cache purged by admin"),
            Err(err) => tracing::warn!(error = %err, "cache purge failed"),
        },
        Ok(ClientFrame::CancelJob { id }) => {
            let cancelled = state.queue.cancel(&id);
            tracing::info!(%id, cancelled, "admin cancellation");
        }
        Err(err) => tracing::debug!(error = %err, "ignoring malformed live frame"),
    }
}
