//! Realtime protocol message types
//!
//! Phoenix channel frames exchanged with the realtime server, JSON encoded:
//! `{"topic": .., "event": .., "payload": {..}, "ref": ..}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::models::Todo;
use crate::remote::ChangeEvent;

pub const EVENT_JOIN: &str = "phx_join";
pub const EVENT_LEAVE: &str = "phx_leave";
pub const EVENT_REPLY: &str = "phx_reply";
pub const EVENT_ERROR: &str = "phx_error";
pub const EVENT_CLOSE: &str = "phx_close";
pub const EVENT_HEARTBEAT: &str = "heartbeat";
pub const EVENT_CHANGES: &str = "postgres_changes";
pub const EVENT_SYSTEM: &str = "system";

/// Topic used for connection-level heartbeats
pub const PHOENIX_TOPIC: &str = "phoenix";

/// A single Phoenix channel frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixMessage {
    /// Join a topic with a postgres_changes subscription
    pub fn join(
        topic: &str,
        schema: &str,
        table: &str,
        filter: &str,
        access_token: Option<&str>,
        reference: &str,
    ) -> Self {
        let mut payload = json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [{
                    "event": "*",
                    "schema": schema,
                    "table": table,
                    "filter": filter,
                }],
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = Value::String(token.to_string());
        }
        Self {
            topic: topic.to_string(),
            event: EVENT_JOIN.to_string(),
            payload,
            reference: Some(reference.to_string()),
        }
    }

    /// Leave a topic
    pub fn leave(topic: &str, reference: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: EVENT_LEAVE.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    /// Keep the socket alive
    pub fn heartbeat(reference: &str) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_string(),
            event: EVENT_HEARTBEAT.to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    /// Encode to a text frame
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a text frame
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// What an inbound frame means for the subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A row changed
    Change(ChangeEvent),
    /// The server accepted a request (join, heartbeat, leave)
    Ack { reference: Option<String> },
    /// The server rejected the channel or reported a failure
    Error(String),
    /// The server closed the channel
    Closed,
    /// Anything else (presence, system notices)
    Ignored,
}

/// Type tag on a postgres_changes record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Deserialize)]
struct ChangePayload {
    data: ChangeData,
}

#[derive(Debug, Deserialize)]
struct ChangeData {
    #[serde(rename = "type")]
    kind: ChangeKind,
    #[serde(default)]
    record: Option<Value>,
    #[serde(default)]
    old_record: Option<Value>,
}

/// Interpret a decoded frame
pub fn classify(msg: &PhoenixMessage) -> Result<Inbound, serde_json::Error> {
    match msg.event.as_str() {
        EVENT_CHANGES => {
            let payload: ChangePayload = serde_json::from_value(msg.payload.clone())?;
            Ok(Inbound::Change(change_event(payload.data)?))
        }
        EVENT_REPLY => {
            let status = msg.payload.get("status").and_then(Value::as_str);
            if status == Some("ok") {
                Ok(Inbound::Ack {
                    reference: msg.reference.clone(),
                })
            } else {
                Ok(Inbound::Error(describe(&msg.payload)))
            }
        }
        EVENT_SYSTEM => {
            let status = msg.payload.get("status").and_then(Value::as_str);
            if status == Some("error") {
                Ok(Inbound::Error(describe(&msg.payload)))
            } else {
                Ok(Inbound::Ignored)
            }
        }
        EVENT_ERROR => Ok(Inbound::Error(describe(&msg.payload))),
        EVENT_CLOSE => Ok(Inbound::Closed),
        _ => Ok(Inbound::Ignored),
    }
}

fn change_event(data: ChangeData) -> Result<ChangeEvent, serde_json::Error> {
    match data.kind {
        ChangeKind::Insert => {
            let todo: Todo = serde_json::from_value(data.record.unwrap_or_default())?;
            Ok(ChangeEvent::Insert(todo))
        }
        ChangeKind::Update => {
            let todo: Todo = serde_json::from_value(data.record.unwrap_or_default())?;
            Ok(ChangeEvent::Update(todo))
        }
        ChangeKind::Delete => {
            let old = data.old_record.unwrap_or_default();
            let id = match old.get("id") {
                Some(Value::String(s)) => s.clone(),
                _ => {
                    return Err(serde::de::Error::custom(
                        "delete event without a string id in old_record",
                    ))
                }
            };
            Ok(ChangeEvent::Delete { id })
        }
    }
}

/// Best-effort human-readable reason from an error payload
fn describe(payload: &Value) -> String {
    payload
        .pointer("/response/reason")
        .or_else(|| payload.get("message"))
        .or_else(|| payload.get("reason"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| payload.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(event: &str, payload: Value) -> PhoenixMessage {
        PhoenixMessage {
            topic: "realtime:public:todos".to_string(),
            event: event.to_string(),
            payload,
            reference: None,
        }
    }

    fn record(id: &str, completed: bool) -> Value {
        json!({
            "id": id,
            "title": "Buy milk",
            "completed": completed,
            "user_id": "u-1",
            "created_at": "2024-05-01T10:00:00+00:00",
            "updated_at": "2024-05-01T10:05:00+00:00"
        })
    }

    #[test]
    fn test_join_message_shape() {
        let msg = PhoenixMessage::join(
            "realtime:public:todos",
            "public",
            "todos",
            "user_id=eq.u-1",
            Some("jwt"),
            "1",
        );
        let value: Value = serde_json::from_str(&msg.encode().unwrap()).unwrap();

        assert_eq!(value["event"], "phx_join");
        assert_eq!(value["ref"], "1");
        assert_eq!(value["payload"]["access_token"], "jwt");
        let changes = &value["payload"]["config"]["postgres_changes"][0];
        assert_eq!(changes["event"], "*");
        assert_eq!(changes["table"], "todos");
        assert_eq!(changes["filter"], "user_id=eq.u-1");
    }

    #[test]
    fn test_heartbeat_targets_phoenix_topic() {
        let msg = PhoenixMessage::heartbeat("7");
        assert_eq!(msg.topic, "phoenix");
        assert_eq!(msg.event, "heartbeat");
    }

    #[test]
    fn test_decode_insert() {
        let text = json!({
            "topic": "realtime:public:todos",
            "event": "postgres_changes",
            "payload": {
                "ids": [1],
                "data": {
                    "schema": "public",
                    "table": "todos",
                    "commit_timestamp": "2024-05-01T10:05:00Z",
                    "type": "INSERT",
                    "record": record("abc", false),
                    "old_record": null,
                    "errors": null
                }
            },
            "ref": null
        })
        .to_string();

        let msg = PhoenixMessage::decode(&text).unwrap();
        match classify(&msg).unwrap() {
            Inbound::Change(ChangeEvent::Insert(todo)) => {
                assert_eq!(todo.id, "abc");
                assert_eq!(todo.title, "Buy milk");
                assert!(todo.updated_at.is_some());
            }
            other => panic!("Expected insert, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_update() {
        let msg = frame(
            EVENT_CHANGES,
            json!({ "data": { "type": "UPDATE", "record": record("abc", true), "old_record": { "id": "abc" } } }),
        );
        match classify(&msg).unwrap() {
            Inbound::Change(ChangeEvent::Update(todo)) => assert!(todo.completed),
            other => panic!("Expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_delete() {
        let msg = frame(
            EVENT_CHANGES,
            json!({ "data": { "type": "DELETE", "record": null, "old_record": { "id": "abc" } } }),
        );
        assert_eq!(
            classify(&msg).unwrap(),
            Inbound::Change(ChangeEvent::Delete {
                id: "abc".to_string()
            })
        );

    }

    #[test]
    fn test_numeric_ids_are_rejected_like_rows() {
        let msg = frame(
            EVENT_CHANGES,
            json!({ "data": { "type": "DELETE", "old_record": { "id": 42 } } }),
        );
        assert!(classify(&msg).is_err());

        let mut row = record("x", false);
        row["id"] = json!(42);
        let msg = frame(
            EVENT_CHANGES,
            json!({ "data": { "type": "INSERT", "record": row } }),
        );
        assert!(classify(&msg).is_err());
    }

    #[test]
    fn test_delete_without_id_is_an_error() {
        let msg = frame(
            EVENT_CHANGES,
            json!({ "data": { "type": "DELETE", "old_record": {} } }),
        );
        assert!(classify(&msg).is_err());
    }

    #[test]
    fn test_reply_status() {
        let mut ok = frame(EVENT_REPLY, json!({ "status": "ok", "response": {} }));
        ok.reference = Some("1".to_string());
        assert_eq!(
            classify(&ok).unwrap(),
            Inbound::Ack {
                reference: Some("1".to_string())
            }
        );

        let err = frame(
            EVENT_REPLY,
            json!({ "status": "error", "response": { "reason": "Invalid JWT" } }),
        );
        assert_eq!(
            classify(&err).unwrap(),
            Inbound::Error("Invalid JWT".to_string())
        );
    }

    #[test]
    fn test_close_and_unknown_events() {
        assert_eq!(
            classify(&frame(EVENT_CLOSE, json!({}))).unwrap(),
            Inbound::Closed
        );
        assert_eq!(
            classify(&frame("presence_state", json!({}))).unwrap(),
            Inbound::Ignored
        );
    }
}
