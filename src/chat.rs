use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_TEXT_CHARS: usize = 500;
pub const GLOBAL_HISTORY_SENT: usize = 50;
pub const MATCH_HISTORY_SENT: usize = 100;
const HISTORY_KEPT: usize = 500;
const GUEST: &str = "guest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub user_id: String,
    pub text: String,
    pub ts: i64,
    pub special: bool,
}

/// Chat payload as sent by a client; every field is optional and loosely
/// typed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingChat {
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub text: Option<Value>,
    #[serde(default)]
    pub special: Option<Value>,
}

impl IncomingChat {
    pub fn sanitize(&self, ts: i64) -> ChatMessage {
        let user_id = self
            .user_id
            .as_ref()
            .map(value_to_text)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| GUEST.to_string());
        let text = self
            .text
            .as_ref()
            .map(value_to_text)
            .unwrap_or_default()
            .chars()
            .take(MAX_TEXT_CHARS)
            .collect();
        ChatMessage {
            user_id,
            text,
            ts,
            special: self.special.as_ref().is_some_and(is_truthy),
        }
    }
}

/// Match room id as clients send it: a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RoomKey {
    Number(u64),
    Text(String),
}

impl RoomKey {
    pub fn key(&self) -> String {
        match self {
            RoomKey::Number(n) => n.to_string(),
            RoomKey::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct ChatLog {
    global: VecDeque<ChatMessage>,
    rooms: HashMap<String, VecDeque<ChatMessage>>,
}

/// Global room plus one room per match, each keeping a bounded history.
#[derive(Debug, Default)]
pub struct ChatRooms {
    log: Mutex<ChatLog>,
}

impl ChatRooms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post_global(&self, incoming: &IncomingChat, ts: i64) -> ChatMessage {
        let message = incoming.sanitize(ts);
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        push_bounded(&mut log.global, message.clone());
        message
    }

    pub fn post_match(&self, room: &str, incoming: &IncomingChat, ts: i64) -> ChatMessage {
        let message = incoming.sanitize(ts);
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        push_bounded(log.rooms.entry(room.to_string()).or_default(), message.clone());
        message
    }

    pub fn global_history(&self) -> Vec<ChatMessage> {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        tail(&log.global, GLOBAL_HISTORY_SENT)
    }

    pub fn match_history(&self, room: &str) -> Vec<ChatMessage> {
        let log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        log.rooms
            .get(room)
            .map(|history| tail(history, MATCH_HISTORY_SENT))
            .unwrap_or_default()
    }
}

fn push_bounded(history: &mut VecDeque<ChatMessage>, message: ChatMessage) {
    history.push_back(message);
    while history.len() > HISTORY_KEPT {
        history.pop_front();
    }
}

fn tail(history: &VecDeque<ChatMessage>, n: usize) -> Vec<ChatMessage> {
    let skip = history.len().saturating_sub(n);
    history.iter().skip(skip).cloned().collect()
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}
