//! WebSocket transport and connection lifecycle.
//!
//! Each client holds one persistent WebSocket. The upgrade handler assigns
//! a fresh [`PeerId`], registers an outbound channel, and runs a read loop
//! and a write loop until either side of the socket goes away; whichever
//! finishes first tears the other down and triggers disconnect cleanup.
//!
//! A reconnecting client gets a new ID; there is no session resumption.

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use huddle_protocol::{ClientEvent, PeerId, ServerEvent};
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::error::ClientRequestError;
use crate::relay;
use crate::state::ServerState;

/// Build the relay's HTTP surface: the WebSocket endpoint plus a static
/// liveness check.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "Server is running"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ServerState) {
    let peer = PeerId::random();
    let (sink, stream) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();

    if let Err(err) = state.register(peer, tx).await {
        warn!(%peer, %err, "refusing connection");
        return;
    }
    info!(%peer, "peer connected");

    let mut send_task = tokio::spawn(write_loop(sink, rx));
    let mut recv_task = tokio::spawn(read_loop(stream, state.clone(), peer));

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    disconnect(&state, peer).await;
}

/// Forward queued relay events onto the socket until either end closes.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    while let Some(event) = rx.recv().await {
        if sink.send(Message::Text(event.to_string().into())).await.is_err() {
            break;
        }
    }
}

/// Parse and dispatch inbound frames. Malformed frames are dropped with a
/// diagnostic; they never fail the connection.
async fn read_loop(mut stream: SplitStream<WebSocket>, state: ServerState, peer: PeerId) {
    while let Some(Ok(frame)) = stream.next().await {
        match parse_frame(&frame) {
            Ok(Some(event)) => relay::dispatch(&state, peer, event).await,
            Ok(None) => {}
            Err(ClientRequestError::Close) => break,
            Err(err) => warn!(%peer, %err, "dropping malformed frame"),
        }
    }
}

/// Interpret one transport frame. `Ok(None)` for control frames the relay
/// has nothing to do with.
fn parse_frame(frame: &Message) -> Result<Option<ClientEvent>, ClientRequestError> {
    match frame {
        Message::Text(text) => Ok(Some(text.as_str().parse()?)),
        Message::Ping(_) | Message::Pong(_) => Ok(None),
        Message::Binary(_) => Err(ClientRequestError::UnsupportedType),
        Message::Close(_) => Err(ClientRequestError::Close),
    }
}

/// Disconnect cleanup: vacate the room, tell whoever is left, drop the
/// registration. Idempotent, so a duplicate disconnect signal finds
/// nothing to do and emits no second `userLeft`.
pub async fn disconnect(state: &ServerState, peer: PeerId) {
    if let Some(room) = state.leave(peer).await {
        relay::broadcast(state, &room, None, ServerEvent::UserLeft(peer)).await;
        info!(%peer, %room, "peer left room");
    }
    state.unregister(peer).await;
}
