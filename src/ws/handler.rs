//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{SessionHandle, UserId};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::ClientMsg;

/// WebSocket upgrade handler. Connections are anonymous; identity is assigned
/// server-side on connect.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let Some((user_id, outbound_rx, session)) = state.engine.connect().await else {
        error!("Failed to register connection, closing socket");
        return;
    };

    info!(user_id = user_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();

    run_connection(user_id, ws_sink, ws_stream, outbound_rx, &session).await;

    // Eviction resynchronizes the remaining session members.
    session.leave(user_id).await;

    info!(user_id = user_id, "WebSocket connection closed");
}

/// Run the connection with read/write split
async fn run_connection(
    user_id: UserId,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    session: &SessionHandle,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Writer task: pre-serialized session frames -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(frame)).await {
                debug!(user_id = user_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> session task
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(user_id = user_id, "Rate limited input message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        if !session.input(user_id, msg).await {
                            debug!(user_id = user_id, "Session is gone, closing connection");
                            break;
                        }
                    }
                    // Malformed input never tears down the connection.
                    Err(e) => {
                        warn!(user_id = user_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(user_id = user_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(user_id = user_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(user_id = user_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}
