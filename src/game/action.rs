//! Per-character active-action set and motion stepping
//!
//! Every held key maps to an Action through a fixed template table. Active
//! actions are stepped once per tick in insertion order (the tie-break order
//! when several apply in the same tick), and all resulting property changes
//! for one tick fold into a single combined delta, so message volume stays
//! O(1) per character per tick.

use serde_json::json;
use tracing::debug;

use crate::assets::character::CharacterDefinition;
use crate::util::vec2::Vec2;
use crate::ws::protocol::{ActionKey, Properties};

use super::character::CharacterState;

/// Motion category of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionCategory {
    /// Repeats while the key is held
    Walking,
    /// Single-shot: runs its motion sequence to completion even after the key
    /// is released
    Jumping,
}

impl ActionCategory {
    /// Animation state (and motion sequence) this category reads from the
    /// character definition
    pub fn state_name(self) -> &'static str {
        match self {
            ActionCategory::Walking => "walking",
            ActionCategory::Jumping => "jumping",
        }
    }

    pub fn is_single_shot(self) -> bool {
        matches!(self, ActionCategory::Jumping)
    }
}

/// One currently-held input
#[derive(Debug, Clone)]
pub struct Action {
    pub key: ActionKey,
    pub category: ActionCategory,
    /// Unit direction vector the motion deltas are scaled by
    pub direction: Vec2,
    /// Free-running cursor into the motion sequence; reads wrap via modulo
    pub cursor: usize,
    /// Set on key-release of a single-shot action so it can finish its
    /// remaining sequence before being dropped
    pub finished: bool,
}

/// Fixed key -> action template table. Unknown keys have no template.
fn template(key: ActionKey) -> Option<(ActionCategory, Vec2)> {
    match key {
        ActionKey::Up => Some((ActionCategory::Walking, Vec2::new(0, -1))),
        ActionKey::Down => Some((ActionCategory::Walking, Vec2::new(0, 1))),
        ActionKey::Left => Some((ActionCategory::Walking, Vec2::new(-1, 0))),
        ActionKey::Right => Some((ActionCategory::Walking, Vec2::new(1, 0))),
        ActionKey::Jump => Some((ActionCategory::Jumping, Vec2::new(0, -1))),
        ActionKey::Unknown => None,
    }
}

/// Explicit state of the per-character motion clock. The session loop only
/// steps machines whose clock is `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionClock {
    Idle,
    Running,
}

/// The per-character input state machine
#[derive(Debug)]
pub struct ActionStateMachine {
    /// Insertion-ordered active set
    actions: Vec<Action>,
    clock: MotionClock,
}

impl ActionStateMachine {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
            clock: MotionClock::Idle,
        }
    }

    pub fn clock(&self) -> MotionClock {
        self.clock
    }

    pub fn is_running(&self) -> bool {
        self.clock == MotionClock::Running
    }

    pub fn active_count(&self) -> usize {
        self.actions.len()
    }

    pub fn is_active(&self, key: ActionKey) -> bool {
        self.actions.iter().any(|a| a.key == key)
    }

    /// Begin an action for a pressed key. The first step applies
    /// synchronously so input feels instantaneous; pressing the first key
    /// starts the motion clock. Unknown keys and re-presses of an already
    /// active key are soft no-ops.
    pub fn press(
        &mut self,
        key: ActionKey,
        state: &mut CharacterState,
        definition: &CharacterDefinition,
    ) -> Option<Properties> {
        let (category, direction) = template(key)?;

        if self.is_active(key) {
            return None;
        }
        if definition.motion(category.state_name()).is_none() {
            debug!(
                character = %definition.name,
                state = category.state_name(),
                "Definition has no motion for this action, ignoring"
            );
            return None;
        }

        let mut action = Action {
            key,
            category,
            direction,
            cursor: 0,
            finished: false,
        };

        let mut properties = Properties::new();
        state.state = category.state_name().to_string();
        properties.insert("state.state".to_string(), json!(state.state));
        if category == ActionCategory::Walking {
            state.direction = direction;
            properties.insert("state.direction.x".to_string(), json!(direction.x));
            properties.insert("state.direction.y".to_string(), json!(direction.y));
        }

        apply_step(&mut action, state, definition, &mut properties);

        self.actions.push(action);
        self.clock = MotionClock::Running;

        Some(properties)
    }

    /// End an action for a released key. Repeating actions are removed
    /// immediately; a single-shot action still in progress is only marked
    /// finished and drops itself once its sequence completes.
    pub fn release(&mut self, key: ActionKey) {
        if let Some(index) = self.actions.iter().position(|a| a.key == key) {
            if self.actions[index].category.is_single_shot() {
                self.actions[index].finished = true;
            } else {
                self.actions.remove(index);
            }
        }
    }

    /// One clock tick. An empty active set stops the clock and emits the idle
    /// transition; otherwise every active action applies once, in insertion
    /// order, into one combined delta.
    pub fn tick(
        &mut self,
        state: &mut CharacterState,
        definition: &CharacterDefinition,
    ) -> Option<Properties> {
        if self.clock == MotionClock::Idle {
            return None;
        }

        if self.actions.is_empty() {
            self.clock = MotionClock::Idle;
            state.state = "idle".to_string();
            state.motion_index = 0;
            state.direction.x = 0;

            let mut properties = Properties::new();
            properties.insert("state.state".to_string(), json!(state.state));
            properties.insert("state.motionIndex".to_string(), json!(state.motion_index));
            properties.insert("state.direction.x".to_string(), json!(state.direction.x));
            return Some(properties);
        }

        let mut properties = Properties::new();
        for action in &mut self.actions {
            apply_step(action, state, definition, &mut properties);
        }

        // Completed single-shot actions drop themselves. A single-shot whose
        // key is never released keeps replaying its sequence.
        self.actions.retain(|action| {
            let len = definition
                .motion(action.category.state_name())
                .map(|m| m.len())
                .unwrap_or(0);
            !(action.category.is_single_shot() && action.finished && action.cursor >= len)
        });

        if properties.is_empty() {
            None
        } else {
            Some(properties)
        }
    }
}

impl Default for ActionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply one motion step of an action: read `motion[cursor % len]`, scale by
/// the direction vector, add to the position, advance the cursor.
fn apply_step(
    action: &mut Action,
    state: &mut CharacterState,
    definition: &CharacterDefinition,
    properties: &mut Properties,
) {
    let Some(motion) = definition.motion(action.category.state_name()) else {
        return;
    };

    let delta = motion[action.cursor % motion.len()];
    state.position.add(delta.scale(action.direction));
    action.cursor += 1;
    state.motion_index = action.cursor;

    properties.insert("state.motionIndex".to_string(), json!(state.motion_index));
    properties.insert("state.position.x".to_string(), json!(state.position.x));
    properties.insert("state.position.y".to_string(), json!(state.position.y));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::character::{HitBox, StateDef};
    use std::collections::HashMap;

    fn definition() -> CharacterDefinition {
        let mut states = HashMap::new();
        states.insert("idle".to_string(), StateDef::default());
        states.insert(
            "walking".to_string(),
            StateDef {
                motion: vec![Vec2::new(5, 0)],
                ..Default::default()
            },
        );
        states.insert(
            "jumping".to_string(),
            StateDef {
                motion: vec![
                    Vec2::new(3, 10),
                    Vec2::new(3, 5),
                    Vec2::new(3, 0),
                    Vec2::new(3, -5),
                    Vec2::new(3, -10),
                ],
                ..Default::default()
            },
        );
        CharacterDefinition {
            name: "bunny".to_string(),
            hit_box: HitBox::DEFAULT,
            states,
            payload: serde_json::json!({"name": "bunny"}),
        }
    }

    fn state() -> CharacterState {
        CharacterState {
            name: "bunny".to_string(),
            state: "idle".to_string(),
            position: Vec2::new(100, 100),
            direction: Vec2::new(0, -1),
            hit_box: HitBox::DEFAULT,
            motion_index: 0,
        }
    }

    #[test]
    fn press_applies_first_step_immediately() {
        let definition = definition();
        let mut state = state();
        let mut machine = ActionStateMachine::new();

        let properties = machine
            .press(ActionKey::Right, &mut state, &definition)
            .unwrap();

        assert_eq!(state.position, Vec2::new(105, 100));
        assert_eq!(state.state, "walking");
        assert!(machine.is_running());
        assert_eq!(properties["state.position.x"], 105);
        assert_eq!(properties["state.state"], "walking");
    }

    #[test]
    fn unknown_key_is_a_soft_no_op() {
        let definition = definition();
        let mut state = state();
        let mut machine = ActionStateMachine::new();

        assert!(machine
            .press(ActionKey::Unknown, &mut state, &definition)
            .is_none());
        assert_eq!(state.position, Vec2::new(100, 100));
        assert!(!machine.is_running());
    }

    #[test]
    fn repress_of_active_key_is_ignored() {
        let definition = definition();
        let mut state = state();
        let mut machine = ActionStateMachine::new();

        machine.press(ActionKey::Right, &mut state, &definition);
        assert!(machine
            .press(ActionKey::Right, &mut state, &definition)
            .is_none());
        assert_eq!(machine.active_count(), 1);
        assert_eq!(state.position.x, 105);
    }

    #[test]
    fn press_release_returns_set_to_empty_and_stops_clock() {
        let definition = definition();
        let mut state = state();
        let mut machine = ActionStateMachine::new();

        machine.press(ActionKey::Left, &mut state, &definition);
        machine.release(ActionKey::Left);
        assert_eq!(machine.active_count(), 0);

        // Clock stops on the tick that observes the drained set.
        let idle = machine.tick(&mut state, &definition).unwrap();
        assert_eq!(machine.clock(), MotionClock::Idle);
        assert_eq!(state.state, "idle");
        assert_eq!(state.motion_index, 0);
        assert_eq!(idle["state.state"], "idle");

        // Once idle, further ticks emit nothing.
        assert!(machine.tick(&mut state, &definition).is_none());
    }

    #[test]
    fn three_ticks_of_right_then_release() {
        let definition = definition();
        let mut state = state();
        let mut machine = ActionStateMachine::new();

        machine.press(ActionKey::Right, &mut state, &definition);
        machine.tick(&mut state, &definition);
        machine.tick(&mut state, &definition);
        machine.release(ActionKey::Right);

        assert_eq!(state.position.x, 115);
        let idle = machine.tick(&mut state, &definition).unwrap();
        assert_eq!(idle["state.state"], "idle");
        assert_eq!(state.position.x, 115);
        assert!(!machine.is_running());
    }

    #[test]
    fn released_jump_still_runs_to_completion() {
        let definition = definition();
        let mut state = state();
        let mut machine = ActionStateMachine::new();

        machine.press(ActionKey::Jump, &mut state, &definition);
        assert_eq!(state.position.y, 100 - 10);

        machine.tick(&mut state, &definition);
        machine.release(ActionKey::Jump);
        assert_eq!(machine.active_count(), 1, "finished jump is not removed early");

        // Remaining three steps of the arc run on their own.
        machine.tick(&mut state, &definition);
        machine.tick(&mut state, &definition);
        machine.tick(&mut state, &definition);

        // The full arc sums to zero vertical displacement.
        assert_eq!(state.position.y, 100);
        assert_eq!(machine.active_count(), 0);

        let idle = machine.tick(&mut state, &definition).unwrap();
        assert_eq!(idle["state.state"], "idle");
    }

    #[test]
    fn unreleased_jump_replays_forever() {
        let definition = definition();
        let mut state = state();
        let mut machine = ActionStateMachine::new();

        machine.press(ActionKey::Jump, &mut state, &definition);
        for _ in 0..12 {
            machine.tick(&mut state, &definition);
        }
        // Sequence length is 5; the cursor wrapped more than twice and the
        // action is still active.
        assert_eq!(machine.active_count(), 1);
        assert!(machine.is_running());
    }

    #[test]
    fn opposite_directions_sum_without_cancellation_logic() {
        let definition = definition();
        let mut state = state();
        let mut machine = ActionStateMachine::new();

        machine.press(ActionKey::Left, &mut state, &definition);
        machine.press(ActionKey::Right, &mut state, &definition);
        assert_eq!(state.position.x, 100);

        let properties = machine.tick(&mut state, &definition).unwrap();
        assert_eq!(state.position.x, 100);
        // Both actions fired into one combined delta.
        assert_eq!(properties["state.position.x"], 100);
        assert_eq!(machine.active_count(), 2);
    }

    #[test]
    fn tick_emits_one_combined_delta_for_many_actions() {
        let definition = definition();
        let mut state = state();
        let mut machine = ActionStateMachine::new();

        machine.press(ActionKey::Right, &mut state, &definition);
        machine.press(ActionKey::Jump, &mut state, &definition);

        let properties = machine.tick(&mut state, &definition).unwrap();
        // One Properties map, not one per action.
        assert_eq!(properties["state.position.x"], state.position.x);
        assert_eq!(properties["state.position.y"], state.position.y);
    }
}
