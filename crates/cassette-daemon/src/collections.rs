//! The three user collections: history, favorites, playlists.
//!
//! Each mutation persists the whole collection through the store before
//! returning — simple read-modify-write, no batching; collection sizes are
//! small and local. Loading happens once at startup; corrupt store content
//! has already been healed to absent by then.

use crate::store::{PersistentStore, KEY_FAVORITES, KEY_HISTORY, KEY_PLAYLISTS};
use cassette_proto::catalog::{CatalogIndex, TrackId};
use cassette_proto::collections::{HistoryEntry, Playlist};
use cassette_proto::error::PlayerError;
use cassette_proto::money::Amount;
use tracing::{debug, info};
use uuid::Uuid;

pub struct CollectionManager {
    store: PersistentStore,
    history: Vec<HistoryEntry>,
    favorites: Vec<TrackId>,
    playlists: Vec<Playlist>,
}

impl CollectionManager {
    /// Loads all three collections from the store; anything absent or healed
    /// starts empty.
    pub fn load(store: PersistentStore) -> Self {
        let history: Vec<HistoryEntry> = store.load(KEY_HISTORY).unwrap_or_default();
        let favorites: Vec<TrackId> = store.load(KEY_FAVORITES).unwrap_or_default();
        let playlists: Vec<Playlist> = store.load(KEY_PLAYLISTS).unwrap_or_default();
        info!(
            "collections loaded: {} history, {} favorites, {} playlists",
            history.len(),
            favorites.len(),
            playlists.len()
        );
        Self {
            store,
            history,
            favorites,
            playlists,
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn favorites(&self) -> &[TrackId] {
        &self.favorites
    }

    pub fn playlists(&self) -> &[Playlist] {
        &self.playlists
    }

    // ── history ───────────────────────────────────────────────────────────────

    /// Prepends one paid play — most recent first, no cap, no dedup. Called
    /// once per successful charge, never for a failed or cancelled play.
    pub async fn record_play(
        &mut self,
        track_id: TrackId,
        price_paid: Amount,
    ) -> Result<(), PlayerError> {
        self.history.insert(0, HistoryEntry::new(track_id, price_paid));
        self.store
            .save(KEY_HISTORY, &self.history)
            .await
            .map_err(PlayerError::internal)
    }

    pub async fn clear_history(&mut self) -> Result<(), PlayerError> {
        self.history.clear();
        self.store
            .remove(KEY_HISTORY)
            .await
            .map_err(PlayerError::internal)
    }

    // ── favorites ─────────────────────────────────────────────────────────────

    /// Flips membership: add if absent, remove if present. Returns whether
    /// the track is a favorite afterwards.
    pub async fn toggle_favorite(
        &mut self,
        catalog: &CatalogIndex,
        track_id: TrackId,
    ) -> Result<bool, PlayerError> {
        if !catalog.contains(track_id) {
            return Err(PlayerError::UnknownTrack(track_id));
        }

        let now_favorite = match self.favorites.iter().position(|&id| id == track_id) {
            Some(idx) => {
                self.favorites.remove(idx);
                false
            }
            None => {
                self.favorites.push(track_id);
                true
            }
        };
        debug!("favorite {} -> {}", track_id, now_favorite);

        self.store
            .save(KEY_FAVORITES, &self.favorites)
            .await
            .map_err(PlayerError::internal)
            .map(|_| now_favorite)
    }

    pub async fn clear_favorites(&mut self) -> Result<(), PlayerError> {
        self.favorites.clear();
        self.store
            .remove(KEY_FAVORITES)
            .await
            .map_err(PlayerError::internal)
    }

    // ── playlists ─────────────────────────────────────────────────────────────

    pub async fn create_playlist(&mut self, name: &str) -> Result<Uuid, PlayerError> {
        let playlist = Playlist::new(name)?;
        let id = playlist.id;
        self.playlists.push(playlist);
        self.persist_playlists().await?;
        Ok(id)
    }

    /// No-op when the id is unknown; destructive intent is confirmed at the
    /// presentation boundary, not here.
    pub async fn delete_playlist(&mut self, playlist_id: Uuid) -> Result<(), PlayerError> {
        let before = self.playlists.len();
        self.playlists.retain(|p| p.id != playlist_id);
        if self.playlists.len() == before {
            return Ok(());
        }
        self.persist_playlists().await
    }

    pub async fn add_to_playlist(
        &mut self,
        catalog: &CatalogIndex,
        playlist_id: Uuid,
        track_id: TrackId,
    ) -> Result<(), PlayerError> {
        if !catalog.contains(track_id) {
            return Err(PlayerError::UnknownTrack(track_id));
        }
        let playlist = self
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or(PlayerError::UnknownPlaylist(playlist_id))?;
        if playlist.contains(track_id) {
            return Err(PlayerError::AlreadyPresent);
        }
        playlist.track_ids.push(track_id);
        self.persist_playlists().await
    }

    /// No-op when the track is not in the playlist.
    pub async fn remove_from_playlist(
        &mut self,
        playlist_id: Uuid,
        track_id: TrackId,
    ) -> Result<(), PlayerError> {
        let playlist = self
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or(PlayerError::UnknownPlaylist(playlist_id))?;
        let before = playlist.track_ids.len();
        playlist.track_ids.retain(|&id| id != track_id);
        if playlist.track_ids.len() == before {
            return Ok(());
        }
        self.persist_playlists().await
    }

    async fn persist_playlists(&self) -> Result<(), PlayerError> {
        self.store
            .save(KEY_PLAYLISTS, &self.playlists)
            .await
            .map_err(PlayerError::internal)
    }
}
