//! Records for the three persisted collections: history, favorites,
//! playlists. Mutation and persistence live in the daemon's
//! CollectionManager; these are the shared shapes that cross the wire and
//! the store.

use crate::catalog::TrackId;
use crate::error::PlayerError;
use crate::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One paid play. Immutable once created; the history sequence is
/// append-only, most recent first, no dedup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub track_id: TrackId,
    pub price_paid: Amount,
    pub played_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(track_id: TrackId, price_paid: Amount) -> Self {
        Self {
            track_id,
            price_paid,
            played_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Ordered, duplicate-free within one playlist.
    pub track_ids: Vec<TrackId>,
}

impl Playlist {
    /// Creates an empty playlist with a fresh id. The name is trimmed;
    /// a name that trims to nothing fails `InvalidName`.
    pub fn new(name: &str) -> Result<Self, PlayerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlayerError::InvalidName);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
            track_ids: Vec::new(),
        })
    }

    pub fn contains(&self, track_id: TrackId) -> bool {
        self.track_ids.contains(&track_id)
    }
}
