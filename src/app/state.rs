//! Application state shared across routes

use std::sync::Arc;

use anyhow::Context;

use crate::assets::{CharacterCatalog, MapCatalog};
use crate::config::Config;
use crate::game::Engine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub characters: Arc<CharacterCatalog>,
    pub maps: Arc<MapCatalog>,
    pub engine: Arc<Engine>,
}

impl AppState {
    /// Load the asset catalogs and start the engine. Any failure here is
    /// fatal; the server does not run with a partial catalog.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let characters = Arc::new(
            CharacterCatalog::load(&config.assets_dir)
                .context("Failed to load character catalog")?,
        );
        let maps =
            Arc::new(MapCatalog::load(&config.assets_dir).context("Failed to load map catalog")?);

        let engine = Arc::new(
            Engine::new(config.clone(), characters.clone(), maps.clone())
                .context("Failed to start session engine")?,
        );

        Ok(Self {
            config,
            characters,
            maps,
            engine,
        })
    }
}
