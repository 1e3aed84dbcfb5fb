//! Session registry and connection routing

use std::sync::Arc;

use dashmap::DashMap;
use rand::seq::SliceRandom;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::assets::map::MapDefinition;
use crate::assets::{AssetError, CharacterCatalog, MapCatalog};
use crate::config::Config;
use crate::util::ids::IdGenerator;

use super::character::CharacterActor;
use super::session::{Session, SessionHandle};
use super::user::{User, UserId};

/// Creates and tracks sessions and routes new connections into the default
/// session. Holds the process-wide identity generator; users and sessions
/// draw from the same sequence.
pub struct Engine {
    config: Arc<Config>,
    characters: Arc<CharacterCatalog>,
    ids: Arc<IdGenerator>,
    sessions: DashMap<u64, SessionHandle>,
    default_map: Arc<MapDefinition>,
    default_session: SessionHandle,
}

impl Engine {
    /// Build the engine and start the default session. A configured default
    /// character or map that is not in its catalog fails startup here.
    pub fn new(
        config: Arc<Config>,
        characters: Arc<CharacterCatalog>,
        maps: Arc<MapCatalog>,
    ) -> Result<Self, AssetError> {
        characters.default_character(config.default_character.as_deref())?;
        let default_map = maps.default_map(config.default_map.as_deref())?;

        let ids = Arc::new(IdGenerator::new());
        let sessions = DashMap::new();

        let default_session = spawn_session(&ids, &sessions, &config, &characters, &default_map);

        Ok(Self {
            config,
            characters,
            ids,
            sessions,
            default_map,
            default_session,
        })
    }

    /// Create and start an additional session on the given map
    pub fn create_session(&self, map: Arc<MapDefinition>) -> SessionHandle {
        spawn_session(
            &self.ids,
            &self.sessions,
            &self.config,
            &self.characters,
            &map,
        )
    }

    /// Register a new connection: assign an identity and display name, build
    /// the default-character actor at the map spawn point, and route the user
    /// into the default session. Returns the identity, the outbound frame
    /// stream for the socket writer, and the session handle for routing
    /// inbound events.
    pub async fn connect(
        &self,
    ) -> Option<(UserId, mpsc::UnboundedReceiver<String>, SessionHandle)> {
        let id = self.ids.next_id();
        let name = display_name(id, self.characters.names());

        let definition = match self
            .characters
            .default_character(self.config.default_character.as_deref())
        {
            Ok(definition) => definition,
            Err(e) => {
                // Validated at startup; only a bug gets here.
                error!(error = %e, "Default character vanished from catalog");
                return None;
            }
        };

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let character = CharacterActor::new(definition, self.default_map.spawn);
        let user = User::new(id, name, outbound_tx, character);

        if !self.default_session.join(user).await {
            error!(user_id = id, "Default session is gone, dropping connection");
            return None;
        }

        Some((id, outbound_rx, self.default_session.clone()))
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn connected_users(&self) -> usize {
        self.sessions.iter().map(|s| s.value().user_count()).sum()
    }
}

fn spawn_session(
    ids: &Arc<IdGenerator>,
    sessions: &DashMap<u64, SessionHandle>,
    config: &Config,
    characters: &Arc<CharacterCatalog>,
    map: &Arc<MapDefinition>,
) -> SessionHandle {
    let id = ids.next_id();
    let (session, handle) = Session::new(
        id,
        Arc::clone(map),
        Arc::clone(characters),
        config.tick_interval,
    );
    tokio::spawn(session.run());
    sessions.insert(id, handle.clone());

    info!(session_id = id, map = %map.name, "Created session");
    handle
}

/// `"<id>-<random character name>"`, e.g. `103-bunny`
fn display_name(id: UserId, names: &[String]) -> String {
    let suffix = names
        .choose(&mut rand::thread_rng())
        .map(String::as_str)
        .unwrap_or("guest");
    format!("{id}-{suffix}")
}
