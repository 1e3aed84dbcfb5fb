//! Read-only character and map definition catalogs
//!
//! Loaded once at startup and treated as injected, immutable data by the game
//! core. Any load failure is fatal - there is no partial-start mode.

pub mod character;
pub mod map;

use std::path::Path;

pub use character::{CharacterCatalog, CharacterDefinition, HitBox};
pub use map::{MapCatalog, MapDefinition};

/// Asset loading errors
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Character catalog is empty")]
    EmptyCatalog,

    #[error("Configured default character '{0}' is not in the catalog")]
    UnknownCharacter(String),

    #[error("Configured default map '{0}' is not in the catalog")]
    UnknownMap(String),
}

impl AssetError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Read an image file and embed it as a base64 data URL, the format the
/// browser client consumes directly.
fn image_data_url(path: &Path) -> Result<String, AssetError> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    let kind = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("png")
        .to_ascii_lowercase();
    let bytes = std::fs::read(path).map_err(|e| AssetError::io(path, e))?;

    Ok(format!("data:image/{};base64,{}", kind, STANDARD.encode(bytes)))
}
