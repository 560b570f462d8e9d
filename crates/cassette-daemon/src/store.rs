//! Key-scoped durable storage: one JSON file per key under the store
//! directory, each wrapped in a versioned envelope.
//!
//! Reads happen once at startup and are synchronous; writes happen after
//! every collection mutation and are async. Malformed or unrecognized
//! content is treated as "collection absent" — the file is removed, a
//! warning logged, and the caller starts from empty. Corruption never
//! propagates as a crash.

use cassette_proto::error::PlayerError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const KEY_HISTORY: &str = "history";
pub const KEY_FAVORITES: &str = "favorites";
pub const KEY_PLAYLISTS: &str = "playlists";
pub const KEY_AUTOPAY: &str = "autopay";

/// Envelope version. Bump when a stored shape changes incompatibly; readers
/// of an unknown version reset to empty rather than misread old data.
const STORE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    data: T,
}

#[derive(Clone)]
pub struct PersistentStore {
    dir: PathBuf,
}

impl PersistentStore {
    pub fn new(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Loads the value stored under `key`, or `None` when absent or when the
    /// stored content is unusable (self-heals by removing the bad file).
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.path_for(key);
        match read_envelope(&path) {
            Ok(value) => value,
            Err(PlayerError::StorageCorrupt(reason)) => {
                warn!("store: key '{}' corrupt ({}), resetting", key, reason);
                let _ = std::fs::remove_file(&path);
                None
            }
            Err(e) => {
                warn!("store: key '{}' unreadable ({}), resetting", key, e);
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    pub async fn save<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        let envelope = Envelope {
            version: STORE_VERSION,
            data: value,
        };
        let json = serde_json::to_string_pretty(&envelope)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(key), json).await?;
        debug!("store: saved key '{}'", key);
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> anyhow::Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_envelope<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, PlayerError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PlayerError::StorageCorrupt(e.to_string())),
    };

    let envelope: Envelope<T> = serde_json::from_str(&content)
        .map_err(|e| PlayerError::StorageCorrupt(e.to_string()))?;

    if envelope.version != STORE_VERSION {
        return Err(PlayerError::StorageCorrupt(format!(
            "version {} (expected {})",
            envelope.version, STORE_VERSION
        )));
    }

    Ok(Some(envelope.data))
}
