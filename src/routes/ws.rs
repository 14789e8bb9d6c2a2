//! WebSocket channel: fixture broadcasts, online count and chat rooms.
//!
//! Frames are JSON objects `{"event": <name>, "data": <payload>}` in both
//! directions. On connect the client receives `globalChatHistory`, then
//! the most recent `matchListFull` if one has been published.

use std::collections::HashSet;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::app::AppState;
use crate::hub::{ClientMessage, ServerMessage};
use crate::state::now_ms;

type WsSender = SplitSink<WebSocket, Message>;

/// WebSocket upgrade handler: `GET /ws`
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before announcing so this client sees its own count.
    let mut frames = state.hub.subscribe();
    let online = state.hub.client_connected();
    debug!(online, "WebSocket client connected");

    let mut rooms: HashSet<String> = HashSet::new();

    let greeting = ServerMessage::GlobalChatHistory(state.chat.global_history());
    let mut open = send_message(&mut sender, &greeting).await;
    if open {
        if let Some(snapshot) = state.hub.latest_snapshot() {
            open = send_text(&mut sender, &snapshot.text).await;
        }
    }

    while open {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(frame) => {
                    if frame.visible_to(&rooms) {
                        open = send_text(&mut sender, &frame.text).await;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    debug!("WebSocket client lagged by {n} frames");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    open = handle_client_text(&state, &mut sender, &mut rooms, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!("WebSocket error: {e}");
                    break;
                }
                Some(Ok(_)) => {} // ping/pong/binary
            },
        }
    }

    let online = state.hub.client_disconnected();
    debug!(online, "WebSocket client disconnected");
}

/// Returns `false` once the socket can no longer be written to.
async fn handle_client_text(
    state: &AppState,
    sender: &mut WsSender,
    rooms: &mut HashSet<String>,
    text: &str,
) -> bool {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            debug!("invalid frame from client: {err}");
            return true;
        }
    };

    match message {
        ClientMessage::JoinMatch(room) => {
            let key = room.key();
            if key.is_empty() {
                return true;
            }
            let history = ServerMessage::MatchChatHistory(state.chat.match_history(&key));
            rooms.insert(key);
            send_message(sender, &history).await
        }
        ClientMessage::LeaveMatch(room) => {
            rooms.remove(&room.key());
            true
        }
        ClientMessage::SendGlobalMessage(chat) => {
            let message = state.chat.post_global(&chat, now_ms());
            state
                .hub
                .publish(&ServerMessage::NewGlobalMessage(message), None);
            true
        }
        ClientMessage::SendMatchMessage(chat) => {
            let key = chat.match_id.key();
            if key.is_empty() {
                return true;
            }
            let message = state.chat.post_match(&key, &chat.chat, now_ms());
            state
                .hub
                .publish(&ServerMessage::NewMatchMessage(message), Some(&key));
            true
        }
    }
}

async fn send_message(sender: &mut WsSender, message: &ServerMessage) -> bool {
    match message.to_json() {
        Some(json) => send_text(sender, &json).await,
        None => true,
    }
}

async fn send_text(sender: &mut WsSender, text: &str) -> bool {
    sender.send(Message::Text(text.to_string().into())).await.is_ok()
}
