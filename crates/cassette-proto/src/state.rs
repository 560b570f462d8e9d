use crate::catalog::{Track, TrackId};
use crate::collections::{HistoryEntry, Playlist};
use crate::money::Amount;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Playback status as driven by the coordinator. `Idle` is reachable from
/// every state via explicit stop or terminal failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle, // nothing loaded / explicitly stopped
    Loading, // payment settled, transport loading
    Playing, // transport running
    Paused,  // explicitly paused
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WalletState {
    pub connected: bool,
    pub address: Option<String>,
    pub balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PlaybackSession {
    pub current_track: Option<TrackId>,
    pub status: PlaybackStatus,
    /// True exactly when status is Playing. Kept alongside status so clients
    /// can bind a play/pause control without matching on the enum.
    pub is_playing: bool,
    pub position_secs: f64,
}

/// Full coordinator state as broadcast to clients. `rev` is a monotonically
/// increasing counter incremented on every change; clients use it to detect
/// missed updates and request a resync.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlayerState {
    #[serde(default)]
    pub rev: u64,
    pub tracks: Vec<Track>,
    pub wallet: WalletState,
    pub playback: PlaybackSession,
    pub auto_pay: bool,
    /// Track held by the confirmation step, if any.
    pub pending_track: Option<TrackId>,
    pub history: Vec<HistoryEntry>,
    pub favorites: Vec<TrackId>,
    pub playlists: Vec<Playlist>,
}

/// Owns the broadcast snapshot. Only the coordinator loop mutates it; the
/// socket and HTTP surfaces read clones. Durable data (collections,
/// auto-pay) is persisted by its owning component, not here — this is a
/// volatile mirror rebuilt at startup.
pub struct StateManager {
    state: Arc<RwLock<PlayerState>>,
}

impl StateManager {
    pub fn new(initial: PlayerState) -> Self {
        Self {
            state: Arc::new(RwLock::new(PlayerState { rev: 1, ..initial })),
        }
    }

    pub fn arc(&self) -> Arc<RwLock<PlayerState>> {
        Arc::clone(&self.state)
    }

    pub async fn get_state(&self) -> PlayerState {
        self.state.read().await.clone()
    }

    /// Narrow read of the playback session. The full snapshot clones the
    /// whole history/playlist mirror; playback-only readers should use this.
    pub async fn playback(&self) -> PlaybackSession {
        self.state.read().await.playback.clone()
    }

    pub async fn set_wallet(&self, wallet: WalletState) {
        let mut state = self.state.write().await;
        state.wallet = wallet;
        state.rev += 1;
    }

    pub async fn set_loading(&self, track_id: TrackId) {
        let mut state = self.state.write().await;
        state.playback.current_track = Some(track_id);
        state.playback.status = PlaybackStatus::Loading;
        state.playback.is_playing = false;
        state.playback.position_secs = 0.0;
        state.rev += 1;
    }

    pub async fn set_playing(&self, track_id: TrackId) {
        let mut state = self.state.write().await;
        state.playback.current_track = Some(track_id);
        state.playback.status = PlaybackStatus::Playing;
        state.playback.is_playing = true;
        state.rev += 1;
    }

    /// Flips Playing <-> Paused. No effect in any other status.
    pub async fn set_paused(&self, paused: bool) {
        let mut state = self.state.write().await;
        match state.playback.status {
            PlaybackStatus::Playing | PlaybackStatus::Paused => {
                state.playback.status = if paused {
                    PlaybackStatus::Paused
                } else {
                    PlaybackStatus::Playing
                };
                state.playback.is_playing = !paused;
                state.rev += 1;
            }
            _ => {}
        }
    }

    pub async fn set_stopped(&self) {
        let mut state = self.state.write().await;
        state.playback = PlaybackSession::default();
        state.rev += 1;
    }

    pub async fn set_position(&self, position_secs: f64) {
        let mut state = self.state.write().await;
        state.playback.position_secs = position_secs;
        state.rev += 1;
    }

    pub async fn set_auto_pay(&self, enabled: bool) {
        let mut state = self.state.write().await;
        state.auto_pay = enabled;
        state.rev += 1;
    }

    pub async fn set_pending_track(&self, pending: Option<TrackId>) {
        let mut state = self.state.write().await;
        state.pending_track = pending;
        state.rev += 1;
    }

    pub async fn set_history(&self, history: Vec<HistoryEntry>) {
        let mut state = self.state.write().await;
        state.history = history;
        state.rev += 1;
    }

    pub async fn set_favorites(&self, favorites: Vec<TrackId>) {
        let mut state = self.state.write().await;
        state.favorites = favorites;
        state.rev += 1;
    }

    pub async fn set_playlists(&self, playlists: Vec<Playlist>) {
        let mut state = self.state.write().await;
        state.playlists = playlists;
        state.rev += 1;
    }
}

impl PlayerState {
    /// Sum of everything ever paid, per the history sequence.
    pub fn total_spent(&self) -> Amount {
        self.history
            .iter()
            .fold(Amount::ZERO, |acc, e| {
                acc.checked_add(e.price_paid).unwrap_or(acc)
            })
    }
}
