//! Map definition catalog
//!
//! Maps live in `<assets>/maps/<name>/definition.json`. A session holds a
//! read-only reference to one map and spawns new characters at its spawn
//! point. A missing maps directory falls back to a built-in default map so a
//! bare checkout still serves the lobby.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{image_data_url, AssetError};
use crate::game::patch;
use crate::util::vec2::Vec2;

/// Shape of a map `definition.json` on disk
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionFile {
    #[serde(default = "default_spawn")]
    spawn: Vec2,
    #[serde(default)]
    background: Option<String>,
}

fn default_spawn() -> Vec2 {
    Vec2::new(100, 100)
}

/// A loaded map template: shared, read-only, never mutated by sessions
#[derive(Debug, Clone)]
pub struct MapDefinition {
    pub name: String,
    /// Where newly joined characters start
    pub spawn: Vec2,
    /// Client-facing definition with the background embedded as a data URL
    pub payload: Value,
}

impl MapDefinition {
    /// Built-in map used when no maps are installed
    pub fn fallback() -> Self {
        Self {
            name: "lobby".to_string(),
            spawn: default_spawn(),
            payload: json!({"name": "lobby", "displayName": "Lobby"}),
        }
    }
}

/// All loaded maps, keyed by name
#[derive(Debug)]
pub struct MapCatalog {
    maps: HashMap<String, Arc<MapDefinition>>,
    names: Vec<String>,
}

impl MapCatalog {
    /// Load every map under `<assets>/maps/`
    pub fn load(assets_dir: &Path) -> Result<Self, AssetError> {
        let root = assets_dir.join("maps");
        if !root.is_dir() {
            warn!(path = %root.display(), "No maps directory, using built-in lobby map");
            return Ok(Self::from_definitions(vec![MapDefinition::fallback()]));
        }

        let entries = fs::read_dir(&root).map_err(|e| AssetError::io(&root, e))?;
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().join("definition.json").is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();

        if names.is_empty() {
            warn!(path = %root.display(), "No map definitions found, using built-in lobby map");
            return Ok(Self::from_definitions(vec![MapDefinition::fallback()]));
        }

        let definitions = names
            .iter()
            .map(|name| load_map(&root.join(name), name))
            .collect::<Result<Vec<_>, _>>()?;

        info!(count = definitions.len(), "Loaded map catalog");

        Ok(Self::from_definitions(definitions))
    }

    /// Build a catalog from in-memory definitions
    pub fn from_definitions(definitions: Vec<MapDefinition>) -> Self {
        let names = definitions.iter().map(|d| d.name.clone()).collect();
        let maps = definitions
            .into_iter()
            .map(|d| (d.name.clone(), Arc::new(d)))
            .collect();
        Self { maps, names }
    }

    pub fn get(&self, name: &str) -> Option<Arc<MapDefinition>> {
        self.maps.get(name).cloned()
    }

    /// Resolve the map backing the default session
    pub fn default_map(&self, preferred: Option<&str>) -> Result<Arc<MapDefinition>, AssetError> {
        match preferred {
            Some(name) => self
                .get(name)
                .ok_or_else(|| AssetError::UnknownMap(name.to_string())),
            None => {
                let first = &self.names[0];
                self.get(first)
                    .ok_or_else(|| AssetError::UnknownMap(first.clone()))
            }
        }
    }
}

fn load_map(root: &Path, name: &str) -> Result<MapDefinition, AssetError> {
    let def_path = root.join("definition.json");
    let raw = fs::read_to_string(&def_path).map_err(|e| AssetError::io(&def_path, e))?;

    let mut payload: Value =
        serde_json::from_str(&raw).map_err(|e| AssetError::json(&def_path, e))?;
    let parsed: DefinitionFile =
        serde_json::from_str(&raw).map_err(|e| AssetError::json(&def_path, e))?;

    patch::set(&mut payload, "name", json!(name));

    if let Some(background) = &parsed.background {
        patch::set(
            &mut payload,
            "background",
            json!(image_data_url(&root.join(background))?),
        );
    }

    Ok(MapDefinition {
        name: name.to_string(),
        spawn: parsed.spawn,
        payload,
    })
}
