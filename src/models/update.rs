//! Long poll update models.
//!
//! VK delivers two shapes of updates depending on the long poll flavour:
//! - user long poll: arrays `[code, message_id, flags, peer_id, ts, text, ...]`
//! - community (Bots) long poll: objects `{"type": "message_new", "object": {...}}`

use serde::Serialize;
use serde_json::Value;

/// Legacy event code for a new message.
pub const LEGACY_NEW_MESSAGE: i64 = 4;

/// Legacy message flag set on messages sent by us.
pub const LEGACY_FLAG_OUTBOX: i64 = 2;

/// Community event type for a new incoming message.
pub const EVENT_MESSAGE_NEW: &str = "message_new";

/// One update received from the long poll server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum VkUpdate {
    /// Array update; `fields[0]` is the event code.
    Legacy { code: i64, fields: Vec<Value> },
    /// Community event object.
    Event { kind: String, object: Value },
}

/// Message data pulled out of an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncomingMessage {
    pub user_id: i64,
    pub text: String,
    pub message_id: Option<i64>,
}

impl VkUpdate {
    /// Parse a raw update value. Returns None for shapes we do not understand.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Array(fields) => {
                let code = fields.first()?.as_i64()?;
                Some(Self::Legacy { code, fields })
            }
            Value::Object(mut map) => {
                let kind = map.get("type")?.as_str()?.to_string();
                let object = map.remove("object").unwrap_or(Value::Null);
                Some(Self::Event { kind, object })
            }
            _ => None,
        }
    }

    pub fn is_message(&self) -> bool {
        match self {
            Self::Legacy { code, .. } => *code == LEGACY_NEW_MESSAGE,
            Self::Event { kind, .. } => kind == EVENT_MESSAGE_NEW,
        }
    }

    pub fn is_outgoing(&self) -> bool {
        match self {
            Self::Legacy { fields, .. } => {
                if !self.is_message() || fields.len() < 3 {
                    return false;
                }
                fields[2]
                    .as_i64()
                    .map(|flags| flags & LEGACY_FLAG_OUTBOX != 0)
                    .unwrap_or(false)
            }
            Self::Event { object, .. } => message_object(object)
                .get("out")
                .and_then(Value::as_i64)
                .map(|out| out == 1)
                .unwrap_or(false),
        }
    }

    /// Extract sender, text and message id from an incoming message update.
    pub fn extract_message(&self) -> Option<IncomingMessage> {
        if !self.is_message() || self.is_outgoing() {
            return None;
        }

        match self {
            Self::Legacy { fields, .. } => extract_legacy(fields),
            Self::Event { object, .. } => extract_event(message_object(object)),
        }
    }
}

fn extract_legacy(fields: &[Value]) -> Option<IncomingMessage> {
    if fields.len() < 4 {
        return None;
    }

    let (user_id, mut text, message_id) = match &fields[3] {
        Value::Number(n) => (n.as_i64(), String::new(), fields[1].as_i64()),
        Value::Object(data) => (
            data.get("from_id")
                .and_then(Value::as_i64)
                .filter(|id| *id != 0)
                .or_else(|| data.get("user_id").and_then(Value::as_i64)),
            data.get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string(),
            data.get("id").and_then(Value::as_i64),
        ),
        _ => (None, String::new(), None),
    };

    let user_id = user_id.filter(|id| *id != 0)?;

    if text.is_empty() {
        // Text sits among the trailing fields; skip service placeholders
        text = fields
            .iter()
            .rev()
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty() && *s != "...")
            .unwrap_or_default()
            .to_string();
    }

    Some(IncomingMessage {
        user_id,
        text,
        message_id,
    })
}

fn extract_event(message: &Value) -> Option<IncomingMessage> {
    let user_id = message
        .get("from_id")
        .and_then(Value::as_i64)
        .filter(|id| *id != 0)
        .or_else(|| message.get("user_id").and_then(Value::as_i64))
        .filter(|id| *id != 0)?;

    Some(IncomingMessage {
        user_id,
        text: message
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string(),
        message_id: message.get("id").and_then(Value::as_i64),
    })
}

/// API 5.103+ nests the message under `object.message`.
fn message_object(object: &Value) -> &Value {
    match object.get("message") {
        Some(inner) if inner.is_object() => inner,
        _ => object,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_new_message() {
        let update =
            VkUpdate::from_value(json!([4, 1001, 17, 555, 1700000000, "Привет, бот", {}])).unwrap();
        assert!(update.is_message());
        assert!(!update.is_outgoing());
        assert_eq!(
            update.extract_message(),
            Some(IncomingMessage {
                user_id: 555,
                text: "Привет, бот".to_string(),
                message_id: Some(1001),
            })
        );
    }

    #[test]
    fn test_legacy_outgoing_is_skipped() {
        let update = VkUpdate::from_value(json!([4, 1002, 3, 555, 1700000000, "ответ"])).unwrap();
        assert!(update.is_outgoing());
        assert_eq!(update.extract_message(), None);
    }

    #[test]
    fn test_legacy_skips_placeholder_strings() {
        let update =
            VkUpdate::from_value(json!([4, 1003, 1, 555, 1700000000, "настоящий текст", " ... "]))
                .unwrap();
        assert_eq!(update.extract_message().unwrap().text, "настоящий текст");
    }

    #[test]
    fn test_legacy_object_payload() {
        let update = VkUpdate::from_value(json!([
            4,
            1004,
            0,
            {"from_id": 777, "text": "  из объекта  ", "id": 9}
        ]))
        .unwrap();
        assert_eq!(
            update.extract_message(),
            Some(IncomingMessage {
                user_id: 777,
                text: "из объекта".to_string(),
                message_id: Some(9),
            })
        );
    }

    #[test]
    fn test_legacy_too_short_or_other_code() {
        assert_eq!(
            VkUpdate::from_value(json!([4, 1, 0])).unwrap().extract_message(),
            None
        );
        let read_event = VkUpdate::from_value(json!([6, 555, 1001])).unwrap();
        assert!(!read_event.is_message());
        assert_eq!(read_event.extract_message(), None);
    }

    #[test]
    fn test_legacy_zero_user_is_rejected() {
        let update = VkUpdate::from_value(json!([4, 1, 0, 0, 0, "text"])).unwrap();
        assert_eq!(update.extract_message(), None);
    }

    #[test]
    fn test_community_event_message_new() {
        let update = VkUpdate::from_value(json!({
            "type": "message_new",
            "object": {
                "message": {"id": 55, "from_id": 321, "peer_id": 321, "text": "Скажи это", "out": 0},
                "client_info": {}
            },
            "group_id": 1
        }))
        .unwrap();
        assert!(update.is_message());
        assert_eq!(
            update.extract_message(),
            Some(IncomingMessage {
                user_id: 321,
                text: "Скажи это".to_string(),
                message_id: Some(55),
            })
        );
    }

    #[test]
    fn test_community_event_old_api_shape() {
        let update = VkUpdate::from_value(json!({
            "type": "message_new",
            "object": {"id": 56, "from_id": 322, "text": "старый формат"}
        }))
        .unwrap();
        assert_eq!(update.extract_message().unwrap().user_id, 322);
    }

    #[test]
    fn test_community_other_events_ignored() {
        let update = VkUpdate::from_value(json!({
            "type": "message_typing_state",
            "object": {"from_id": 1}
        }))
        .unwrap();
        assert!(!update.is_message());
        assert_eq!(update.extract_message(), None);
    }

    #[test]
    fn test_unparseable_values() {
        assert_eq!(VkUpdate::from_value(json!([])), None);
        assert_eq!(VkUpdate::from_value(json!(["x"])), None);
        assert_eq!(VkUpdate::from_value(json!("nope")), None);
        assert_eq!(VkUpdate::from_value(json!({"object": {}})), None);
    }
}
