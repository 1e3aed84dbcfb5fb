//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game::character::CharacterState;
use crate::game::user::UserId;

/// Dotted-path partial update payload: `"state.position.x" -> 105`
pub type Properties = BTreeMap<String, Value>;

/// Input keys a client can hold down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ActionKey {
    Up,
    Down,
    Left,
    Right,
    Jump,
    /// Any action name this server does not know. Treated as a no-op, not a
    /// protocol error.
    Unknown,
}

impl From<String> for ActionKey {
    fn from(name: String) -> Self {
        match name.as_str() {
            "up" => Self::Up,
            "down" => Self::Down,
            "left" => Self::Left,
            "right" => Self::Right,
            "jump" => Self::Jump,
            _ => Self::Unknown,
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Register interest; the server replies with the character catalog and
    /// the client's assigned identity
    Join,

    /// A key was pressed
    Keydown { action: ActionKey },

    /// A key was released
    Keyup { action: ActionKey },

    /// Switch the active character definition
    SetCharacter { name: String },

    /// Unknown message types are silently dropped
    #[serde(other)]
    Unknown,
}

/// Messages sent from server to client. The per-pulse frame is a JSON array
/// mixing `Session` and `Update` messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// The full character catalog, sent once on join
    Characters { characters: Value },

    /// Identity assignment, sent once on join
    User { id: UserId },

    /// Full snapshot of every session member, sent on every membership change
    Session { users: Vec<UserSnapshot> },

    /// Partial state patch addressed by user id
    Update { id: UserId, properties: Properties },
}

/// Full serialization of one session member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: UserId,
    pub name: String,
    pub state: CharacterState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_client_vocabulary() {
        let join: ClientMsg = serde_json::from_str(r#"{"type":"join"}"#).unwrap();
        assert!(matches!(join, ClientMsg::Join));

        let down: ClientMsg = serde_json::from_str(r#"{"type":"keydown","action":"up"}"#).unwrap();
        assert!(matches!(
            down,
            ClientMsg::Keydown {
                action: ActionKey::Up
            }
        ));

        let select: ClientMsg =
            serde_json::from_str(r#"{"type":"setCharacter","name":"bunny"}"#).unwrap();
        assert!(matches!(select, ClientMsg::SetCharacter { name } if name == "bunny"));
    }

    #[test]
    fn unknown_message_type_is_a_default_arm() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"teleport"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Unknown));
    }

    #[test]
    fn unknown_action_key_maps_to_unknown() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"keydown","action":"barrel-roll"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMsg::Keydown {
                action: ActionKey::Unknown
            }
        ));
    }

    #[test]
    fn update_message_shape_matches_wire_contract() {
        let mut properties = Properties::new();
        properties.insert("state.position.x".to_string(), serde_json::json!(105));

        let json = serde_json::to_value(ServerMsg::Update { id: 100, properties }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "update",
                "id": 100,
                "properties": {"state.position.x": 105}
            })
        );
    }

    #[test]
    fn session_message_is_tagged() {
        let json = serde_json::to_value(ServerMsg::Session { users: vec![] }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "session", "users": []}));
    }
}
