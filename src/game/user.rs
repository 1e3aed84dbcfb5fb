//! Connected user: one network connection, one character

use tokio::sync::mpsc;
use tracing::warn;

use crate::assets::character::CharacterCatalog;
use crate::ws::protocol::{ClientMsg, Properties, ServerMsg, UserSnapshot};

use super::character::CharacterActor;

/// Integer user identity, monotonically assigned and never reused while the
/// process runs
pub type UserId = u64;

/// Error writing to a user's outbound channel; the other end hung up
#[derive(Debug, thiserror::Error)]
#[error("user connection is gone")]
pub struct UserGone;

/// One connected user. Owned by exactly one session at a time; all mutation
/// happens on that session's task.
#[derive(Debug)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Pre-serialized frames queued for the socket writer
    outbound: mpsc::UnboundedSender<String>,
    pub character: CharacterActor,
}

impl User {
    pub fn new(
        id: UserId,
        name: String,
        outbound: mpsc::UnboundedSender<String>,
        character: CharacterActor,
    ) -> Self {
        Self {
            id,
            name,
            outbound,
            character,
        }
    }

    /// Queue a pre-serialized frame for this user's socket. Failure means the
    /// connection is gone; eviction is left to the transport close event.
    pub fn send(&self, frame: String) -> Result<(), UserGone> {
        self.outbound.send(frame).map_err(|_| UserGone)
    }

    /// Full serialization of this user for session snapshots
    pub fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            id: self.id,
            name: self.name.clone(),
            state: self.character.state.clone(),
        }
    }

    /// Closed dispatch over the inbound message vocabulary. Returns the
    /// property delta to broadcast, if the event produced one; join replies
    /// go to this user alone.
    pub fn dispatch(&mut self, msg: ClientMsg, catalog: &CharacterCatalog) -> Option<Properties> {
        match msg {
            ClientMsg::Join => {
                self.send_msg(&ServerMsg::Characters {
                    characters: catalog.client_payload().clone(),
                });
                self.send_msg(&ServerMsg::User { id: self.id });
                None
            }
            ClientMsg::Keydown { action } => self.character.press(action),
            ClientMsg::Keyup { action } => {
                self.character.release(action);
                None
            }
            ClientMsg::SetCharacter { name } => self.character.select_character(catalog, &name),
            ClientMsg::Unknown => None,
        }
    }

    /// Serialize and send a single targeted message
    fn send_msg(&self, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(frame) => {
                if self.send(frame).is_err() {
                    warn!(user_id = self.id, "Dropping reply for closed connection");
                }
            }
            Err(e) => warn!(user_id = self.id, error = %e, "Failed to serialize reply"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::character::{CharacterCatalog, CharacterDefinition, HitBox, StateDef};
    use crate::game::character::CharacterActor;
    use crate::util::vec2::Vec2;
    use crate::ws::protocol::ActionKey;
    use std::collections::HashMap;

    fn catalog() -> CharacterCatalog {
        let mut states = HashMap::new();
        states.insert(
            "walking".to_string(),
            StateDef {
                motion: vec![Vec2::new(5, 0)],
                ..Default::default()
            },
        );
        CharacterCatalog::from_definitions(vec![CharacterDefinition {
            name: "bunny".to_string(),
            hit_box: HitBox::DEFAULT,
            states,
            payload: serde_json::json!({"name": "bunny"}),
        }])
        .unwrap()
    }

    fn user(catalog: &CharacterCatalog) -> (User, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let character = CharacterActor::new(catalog.get("bunny").unwrap(), Vec2::new(100, 100));
        (User::new(100, "100-bunny".to_string(), tx, character), rx)
    }

    #[test]
    fn join_replies_with_catalog_and_identity() {
        let catalog = catalog();
        let (mut user, mut rx) = user(&catalog);

        assert!(user.dispatch(ClientMsg::Join, &catalog).is_none());

        let characters: ServerMsg = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert!(matches!(characters, ServerMsg::Characters { .. }));

        let identity: ServerMsg = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert!(matches!(identity, ServerMsg::User { id: 100 }));

        // Join does not itself produce a session snapshot.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn keydown_produces_a_delta_and_keyup_none() {
        let catalog = catalog();
        let (mut user, _rx) = user(&catalog);

        let delta = user
            .dispatch(
                ClientMsg::Keydown {
                    action: ActionKey::Right,
                },
                &catalog,
            )
            .unwrap();
        assert_eq!(delta["state.position.x"], 105);

        assert!(user
            .dispatch(
                ClientMsg::Keyup {
                    action: ActionKey::Right,
                },
                &catalog,
            )
            .is_none());
    }

    #[test]
    fn unknown_message_type_is_dropped() {
        let catalog = catalog();
        let (mut user, mut rx) = user(&catalog);
        assert!(user.dispatch(ClientMsg::Unknown, &catalog).is_none());
        assert!(rx.try_recv().is_err());
    }
}
