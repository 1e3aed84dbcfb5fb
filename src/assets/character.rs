//! Character definition catalog
//!
//! A character lives in `<assets>/characters/<name>/` with a `definition.json`
//! describing its animation states, per-state motion sequences and asset
//! files. `<assets>/characters/characters.json` lists the valid names. The
//! typed fields below are what the simulation needs; the raw definition (with
//! image files embedded as data URLs) is kept as a JSON payload so it can be
//! sent to clients wholesale.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{image_data_url, AssetError};
use crate::game::patch;
use crate::util::vec2::Vec2;

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl HitBox {
    /// Fallback when a definition carries no hit box at all
    pub const DEFAULT: HitBox = HitBox {
        x1: 0,
        y1: 0,
        x2: 64,
        y2: 64,
    };
}

/// One animation state of a character (idle, walking, jumping, ...)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDef {
    /// Per-tick motion deltas; empty for states without motion
    #[serde(default)]
    pub motion: Vec<Vec2>,
    /// State-specific hit box override
    #[serde(default)]
    pub hit_box: Option<HitBox>,
    /// Asset file name(s) relative to the character directory
    #[serde(default)]
    pub assets: Option<AssetSource>,
}

/// Either a single animation sheet or an explicit frame list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AssetSource {
    Sheet(String),
    Frames(Vec<String>),
}

/// Shape of `definition.json` on disk
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionFile {
    #[serde(default)]
    hit_box: Option<HitBox>,
    #[serde(default)]
    thumbnail: Option<String>,
    states: HashMap<String, StateDef>,
}

/// A loaded character template: shared, read-only, looked up by name
#[derive(Debug, Clone)]
pub struct CharacterDefinition {
    pub name: String,
    pub hit_box: HitBox,
    pub states: HashMap<String, StateDef>,
    /// Client-facing definition with assets embedded as data URLs
    pub payload: Value,
}

impl CharacterDefinition {
    /// Motion sequence of the given animation state, if it has one
    pub fn motion(&self, state: &str) -> Option<&[Vec2]> {
        self.states
            .get(state)
            .map(|s| s.motion.as_slice())
            .filter(|m| !m.is_empty())
    }

    /// Hit box for the given animation state, falling back to the
    /// definition-level hit box
    pub fn state_hit_box(&self, state: &str) -> HitBox {
        self.states
            .get(state)
            .and_then(|s| s.hit_box)
            .unwrap_or(self.hit_box)
    }
}

/// All loaded characters, keyed by name
#[derive(Debug)]
pub struct CharacterCatalog {
    characters: HashMap<String, Arc<CharacterDefinition>>,
    /// Listing order from characters.json; the first entry is the implicit
    /// default
    names: Vec<String>,
    /// Pre-built `characters` reply payload
    payload: Value,
}

impl CharacterCatalog {
    /// Load every listed character from `<assets>/characters/`
    pub fn load(assets_dir: &Path) -> Result<Self, AssetError> {
        let root = assets_dir.join("characters");
        let list_path = root.join("characters.json");

        let raw = fs::read_to_string(&list_path).map_err(|e| AssetError::io(&list_path, e))?;
        let names: Vec<String> =
            serde_json::from_str(&raw).map_err(|e| AssetError::json(&list_path, e))?;

        let definitions = names
            .iter()
            .map(|name| load_character(&root.join(name), name))
            .collect::<Result<Vec<_>, _>>()?;

        info!(count = definitions.len(), "Loaded character catalog");

        Self::from_definitions(definitions)
    }

    /// Build a catalog from in-memory definitions. Listing order is preserved.
    pub fn from_definitions(
        definitions: Vec<CharacterDefinition>,
    ) -> Result<Self, AssetError> {
        if definitions.is_empty() {
            return Err(AssetError::EmptyCatalog);
        }

        let names: Vec<String> = definitions.iter().map(|d| d.name.clone()).collect();
        let payload = Value::Array(definitions.iter().map(|d| d.payload.clone()).collect());
        let characters = definitions
            .into_iter()
            .map(|d| (d.name.clone(), Arc::new(d)))
            .collect();

        Ok(Self {
            characters,
            names,
            payload,
        })
    }

    pub fn get(&self, name: &str) -> Option<Arc<CharacterDefinition>> {
        self.characters.get(name).cloned()
    }

    /// Character names in listing order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The full catalog as sent to clients on join
    pub fn client_payload(&self) -> &Value {
        &self.payload
    }

    /// Resolve the character assigned to new connections. A configured name
    /// that is not in the catalog is a startup error, not a soft no-op.
    pub fn default_character(
        &self,
        preferred: Option<&str>,
    ) -> Result<Arc<CharacterDefinition>, AssetError> {
        match preferred {
            Some(name) => self
                .get(name)
                .ok_or_else(|| AssetError::UnknownCharacter(name.to_string())),
            None => {
                // from_definitions rejects empty catalogs
                let first = &self.names[0];
                self.get(first)
                    .ok_or_else(|| AssetError::UnknownCharacter(first.clone()))
            }
        }
    }
}

fn load_character(root: &Path, name: &str) -> Result<CharacterDefinition, AssetError> {
    let def_path = root.join("definition.json");
    let raw = fs::read_to_string(&def_path).map_err(|e| AssetError::io(&def_path, e))?;

    let mut payload: Value =
        serde_json::from_str(&raw).map_err(|e| AssetError::json(&def_path, e))?;
    let parsed: DefinitionFile =
        serde_json::from_str(&raw).map_err(|e| AssetError::json(&def_path, e))?;

    patch::set(&mut payload, "name", json!(name));

    // Replace asset file names with embedded data URLs so the whole
    // definition can be shipped to the client in one message.
    for (state_name, state) in &parsed.states {
        if let Some(source) = &state.assets {
            let frames = load_frames(root, source)?;
            patch::set(
                &mut payload,
                &format!("states.{}.assets", state_name),
                json!(frames),
            );
        }
    }

    if let Some(thumbnail) = &parsed.thumbnail {
        patch::set(
            &mut payload,
            "thumbnail",
            json!(image_data_url(&root.join(thumbnail))?),
        );
    }

    Ok(CharacterDefinition {
        name: name.to_string(),
        hit_box: parsed.hit_box.unwrap_or(HitBox::DEFAULT),
        states: parsed.states,
        payload,
    })
}

fn load_frames(root: &Path, source: &AssetSource) -> Result<Vec<String>, AssetError> {
    match source {
        // Animated sheets are embedded whole; frame extraction is the
        // client's concern.
        AssetSource::Sheet(file) => Ok(vec![image_data_url(&root.join(file))?]),
        AssetSource::Frames(files) => files
            .iter()
            .map(|file| image_data_url(&root.join(file)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_definition(name: &str) -> CharacterDefinition {
        let mut states = HashMap::new();
        states.insert(
            "walking".to_string(),
            StateDef {
                motion: vec![Vec2::new(5, 0)],
                ..Default::default()
            },
        );
        CharacterDefinition {
            name: name.to_string(),
            hit_box: HitBox::DEFAULT,
            states,
            payload: json!({"name": name}),
        }
    }

    #[test]
    fn empty_catalog_is_rejected() {
        assert!(matches!(
            CharacterCatalog::from_definitions(vec![]),
            Err(AssetError::EmptyCatalog)
        ));
    }

    #[test]
    fn first_listed_character_is_the_default() {
        let catalog = CharacterCatalog::from_definitions(vec![
            bare_definition("bunny"),
            bare_definition("fox"),
        ])
        .unwrap();

        assert_eq!(catalog.default_character(None).unwrap().name, "bunny");
        assert_eq!(catalog.default_character(Some("fox")).unwrap().name, "fox");
        assert!(matches!(
            catalog.default_character(Some("ghost")),
            Err(AssetError::UnknownCharacter(_))
        ));
    }

    #[test]
    fn motion_lookup_ignores_states_without_motion() {
        let definition = bare_definition("bunny");
        assert!(definition.motion("walking").is_some());
        assert!(definition.motion("idle").is_none());
    }
}
