use serde_json::json;

use pulse_server::chat::{
    ChatRooms, GLOBAL_HISTORY_SENT, IncomingChat, MATCH_HISTORY_SENT, MAX_TEXT_CHARS,
};

fn incoming(user: Option<&str>, text: &str) -> IncomingChat {
    IncomingChat {
        user_id: user.map(|u| json!(u)),
        text: Some(json!(text)),
        special: None,
    }
}

#[test]
fn anonymous_senders_become_guest() {
    let rooms = ChatRooms::new();
    let msg = rooms.post_global(&incoming(None, "hello"), 10);
    assert_eq!(msg.user_id, "guest");
    assert_eq!(msg.text, "hello");
    assert_eq!(msg.ts, 10);
    assert!(!msg.special);

    let msg = rooms.post_global(&incoming(Some(""), "again"), 11);
    assert_eq!(msg.user_id, "guest");
}

#[test]
fn long_messages_are_truncated() {
    let rooms = ChatRooms::new();
    let long = "ğ".repeat(MAX_TEXT_CHARS + 40);
    let msg = rooms.post_global(&incoming(Some("ayse"), &long), 1);
    assert_eq!(msg.text.chars().count(), MAX_TEXT_CHARS);
}

#[test]
fn loosely_typed_fields_are_accepted() {
    let chat: IncomingChat =
        serde_json::from_value(json!({"userId": 42, "text": 7, "special": 1})).unwrap();
    let msg = chat.sanitize(5);
    assert_eq!(msg.user_id, "42");
    assert_eq!(msg.text, "7");
    assert!(msg.special);
}

#[test]
fn global_history_returns_the_latest_messages() {
    let rooms = ChatRooms::new();
    for i in 0..(GLOBAL_HISTORY_SENT + 20) {
        rooms.post_global(&incoming(Some("u"), &i.to_string()), i as i64);
    }
    let history = rooms.global_history();
    assert_eq!(history.len(), GLOBAL_HISTORY_SENT);
    assert_eq!(history[0].text, "20");
    assert_eq!(
        history.last().unwrap().text,
        (GLOBAL_HISTORY_SENT + 19).to_string()
    );
}

#[test]
fn match_rooms_are_isolated() {
    let rooms = ChatRooms::new();
    for i in 0..(MATCH_HISTORY_SENT + 5) {
        rooms.post_match("1035", &incoming(Some("a"), &format!("m{i}")), i as i64);
    }
    rooms.post_match("2000", &incoming(Some("b"), "other"), 0);

    let history = rooms.match_history("1035");
    assert_eq!(history.len(), MATCH_HISTORY_SENT);
    assert_eq!(history[0].text, "m5");
    assert_eq!(rooms.match_history("2000").len(), 1);
    assert!(rooms.match_history("3000").is_empty());
    assert!(rooms.global_history().is_empty());
}
