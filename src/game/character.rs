//! Active character wrapping one connected user

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::assets::character::{CharacterCatalog, CharacterDefinition, HitBox};
use crate::util::vec2::Vec2;
use crate::ws::protocol::{ActionKey, Properties};

use super::action::ActionStateMachine;

/// Mutable per-character state, serialized verbatim into snapshots. Partial
/// updates address it with `state.`-prefixed dotted paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterState {
    /// Name of the selected character definition; always matches it
    pub name: String,
    /// Current animation state: "idle", "walking", "jumping"
    pub state: String,
    pub position: Vec2,
    /// Direction vector of the most recent walking action
    pub direction: Vec2,
    pub hit_box: HitBox,
    /// Cursor of the most recently stepped action; free-wraps via modulo
    pub motion_index: usize,
}

/// One user's active character: the selected read-only definition plus the
/// authoritative mutable state and input machine.
#[derive(Debug)]
pub struct CharacterActor {
    definition: Arc<CharacterDefinition>,
    pub state: CharacterState,
    actions: ActionStateMachine,
}

impl CharacterActor {
    pub fn new(definition: Arc<CharacterDefinition>, spawn: Vec2) -> Self {
        let state = CharacterState {
            name: definition.name.clone(),
            state: "idle".to_string(),
            position: spawn,
            direction: Vec2::new(0, -1),
            hit_box: definition.state_hit_box("idle"),
            motion_index: 0,
        };
        Self {
            definition,
            state,
            actions: ActionStateMachine::new(),
        }
    }

    /// Whether the motion clock is running (the session loop only ticks
    /// characters that report true)
    pub fn motion_running(&self) -> bool {
        self.actions.is_running()
    }

    pub fn press(&mut self, key: ActionKey) -> Option<Properties> {
        self.actions.press(key, &mut self.state, &self.definition)
    }

    pub fn release(&mut self, key: ActionKey) {
        self.actions.release(key)
    }

    pub fn tick(&mut self) -> Option<Properties> {
        self.actions.tick(&mut self.state, &self.definition)
    }

    /// Switch to the named character definition. Selecting the current
    /// character or an unknown name is a soft no-op; a successful switch
    /// emits a targeted delta for the name and motion cursor only, leaving
    /// the position untouched.
    pub fn select_character(
        &mut self,
        catalog: &CharacterCatalog,
        name: &str,
    ) -> Option<Properties> {
        if name == self.definition.name {
            return None;
        }
        let Some(definition) = catalog.get(name) else {
            debug!(character = name, "Unknown character name, keeping current");
            return None;
        };

        self.definition = definition;
        self.state.name = self.definition.name.clone();
        self.state.motion_index = 0;
        self.state.hit_box = self.definition.state_hit_box(&self.state.state);

        let mut properties = Properties::new();
        properties.insert("state.name".to_string(), json!(self.state.name));
        properties.insert("state.motionIndex".to_string(), json!(self.state.motion_index));
        Some(properties)
    }
}
