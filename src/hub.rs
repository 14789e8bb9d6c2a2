//! Live distribution channel: every WebSocket subscriber receives the same
//! serialized frames through a `tokio::sync::broadcast` channel. Publishing
//! never waits on subscribers; a slow one lags and skips frames.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::chat::{ChatMessage, IncomingChat, RoomKey};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureList {
    pub date: String,
    pub fixtures: Vec<Value>,
}

/// Server-to-client frames, serialized as `{"event": .., "data": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    MatchListFull(FixtureList),
    LivePatch(FixtureList),
    OnlineCount(usize),
    GlobalChatHistory(Vec<ChatMessage>),
    MatchChatHistory(Vec<ChatMessage>),
    NewGlobalMessage(ChatMessage),
    NewMatchMessage(ChatMessage),
}

impl ServerMessage {
    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(err) => {
                warn!("failed to serialize server message: {err}");
                None
            }
        }
    }
}

/// Client-to-server frames.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    JoinMatch(RoomKey),
    LeaveMatch(RoomKey),
    SendGlobalMessage(IncomingChat),
    SendMatchMessage(IncomingMatchChat),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMatchChat {
    pub match_id: RoomKey,
    #[serde(flatten)]
    pub chat: IncomingChat,
}

/// A serialized frame plus the room it is scoped to (`None` = everyone).
#[derive(Debug, Clone)]
pub struct Frame {
    pub room: Option<String>,
    pub text: Arc<str>,
}

impl Frame {
    pub fn visible_to(&self, joined: &std::collections::HashSet<String>) -> bool {
        self.room.as_ref().is_none_or(|room| joined.contains(room))
    }
}

#[derive(Debug, Clone)]
pub struct LiveHub {
    tx: broadcast::Sender<Frame>,
    latest: Arc<RwLock<Option<Frame>>>,
    online: Arc<AtomicUsize>,
}

impl LiveHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            latest: Arc::new(RwLock::new(None)),
            online: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.tx.subscribe()
    }

    /// Sends to every subscriber (or to the room's members). Returns the
    /// serialized frame, or `None` if serialization failed.
    pub fn publish(&self, message: &ServerMessage, room: Option<&str>) -> Option<Frame> {
        let frame = Frame {
            room: room.map(str::to_string),
            text: Arc::from(message.to_json()?),
        };
        // No receivers is fine.
        if let Ok(count) = self.tx.send(frame.clone()) {
            debug!(receivers = count, "frame published");
        }
        Some(frame)
    }

    /// Publishes the enriched list twice: as the full snapshot and again as
    /// a patch. Both frames carry identical payloads; clients listen on
    /// either name.
    pub fn publish_fixtures(&self, date: &str, fixtures: Vec<Value>) {
        let list = FixtureList {
            date: date.to_string(),
            fixtures,
        };
        let full = ServerMessage::MatchListFull(list);
        if let Some(frame) = self.publish(&full, None) {
            *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(frame);
        }
        let ServerMessage::MatchListFull(list) = full else {
            return;
        };
        self.publish(&ServerMessage::LivePatch(list), None);
    }

    /// Last `matchListFull` frame, replayed to clients as they connect.
    pub fn latest_snapshot(&self) -> Option<Frame> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn client_connected(&self) -> usize {
        let count = self.online.fetch_add(1, Ordering::SeqCst) + 1;
        self.publish(&ServerMessage::OnlineCount(count), None);
        count
    }

    pub fn client_disconnected(&self) -> usize {
        let previous = self
            .online
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        let count = previous.saturating_sub(1);
        self.publish(&ServerMessage::OnlineCount(count), None);
        count
    }

    pub fn online(&self) -> usize {
        self.online.load(Ordering::SeqCst)
    }
}
