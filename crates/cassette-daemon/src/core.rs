//! The coordinator core: one event loop that owns every piece of mutable
//! state and processes one event at a time.
//!
//! All external inputs — client commands, wallet notices, transport events —
//! funnel into a single mpsc channel. Each command runs to completion
//! (including any settlement await) before the next event is dequeued, which
//! is what guarantees that play requests never interleave their
//! gate-and-transition sequence and that wallet notices are never applied
//! mid-settlement.

use crate::collections::CollectionManager;
use crate::confirm::{ConfirmationPolicy, GateDecision};
use crate::payment;
use crate::store::{PersistentStore, KEY_AUTOPAY};
use crate::transport::{self, TransportEvent, TransportHandle};
use crate::wallet::{self, AccountsOutcome, ProviderHandle, WalletNotice, WalletSession};
use cassette_proto::catalog::{self, CatalogIndex, TrackId};
use cassette_proto::config::Config;
use cassette_proto::error::PlayerError;
use cassette_proto::protocol::{Command, Receipt};
use cassette_proto::state::{PlaybackStatus, PlayerState, StateManager};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Fan-out from the coordinator to connected clients (socket sessions).
#[derive(Debug, Clone)]
pub enum BroadcastMessage {
    StateUpdated,
    /// A charge settled; playback of the receipt's track is starting.
    Settled(Receipt),
    /// A command failed with a typed error.
    CommandFailed(PlayerError),
    Log(String),
}

/// Everything that can wake the coordinator.
#[derive(Debug)]
pub enum DaemonEvent {
    ClientCommand(Command),
    Wallet(WalletNotice),
    Transport(TransportEvent),
    ClientConnected,
    ClientCountChanged(usize),
}

enum Direction {
    Next,
    Prev,
}

pub struct CoordinatorCore {
    catalog: CatalogIndex,
    state: Arc<StateManager>,
    session: WalletSession,
    policy: ConfirmationPolicy,
    collections: CollectionManager,
    store: PersistentStore,
    transport: TransportHandle,
    broadcast_tx: broadcast::Sender<BroadcastMessage>,
}

impl CoordinatorCore {
    /// Builds the coordinator: resolves the catalog, loads persisted
    /// collections and the auto-pay flag, spawns the wallet provider and the
    /// transport, and seeds the broadcast state snapshot.
    pub async fn new(
        config: Config,
        broadcast_tx: broadcast::Sender<BroadcastMessage>,
        event_tx: mpsc::Sender<DaemonEvent>,
    ) -> anyhow::Result<Self> {
        let catalog = resolve_catalog(&config).await?;
        info!("catalog ready: {} tracks", catalog.len());

        let store = PersistentStore::new(&config.daemon.store_dir)?;
        let collections = CollectionManager::load(store.clone());
        let auto_pay = store
            .load::<bool>(KEY_AUTOPAY)
            .unwrap_or(config.payment.auto_pay_default);

        let policy =
            ConfirmationPolicy::new(config.payment.confirmation_secret.clone(), auto_pay);

        let provider = match config.wallet.provider.as_str() {
            "simulated" => wallet::spawn_simulated(&config.wallet)?,
            "none" => ProviderHandle::unavailable(),
            other => anyhow::bail!("unknown wallet.provider '{}'", other),
        };
        let session = WalletSession::new(provider);

        // Transport events join the same funnel as everything else.
        let (transport_tx, mut transport_rx) = mpsc::channel::<TransportEvent>(64);
        let transport = transport::spawn(transport_tx);
        let forward_tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(event) = transport_rx.recv().await {
                if forward_tx.send(DaemonEvent::Transport(event)).await.is_err() {
                    break;
                }
            }
        });

        let initial = PlayerState {
            tracks: catalog.tracks().to_vec(),
            auto_pay,
            history: collections.history().to_vec(),
            favorites: collections.favorites().to_vec(),
            playlists: collections.playlists().to_vec(),
            ..PlayerState::default()
        };
        let state = Arc::new(StateManager::new(initial));

        Ok(Self {
            catalog,
            state,
            session,
            policy,
            collections,
            store,
            transport,
            broadcast_tx,
        })
    }

    pub fn state_manager(&self) -> Arc<StateManager> {
        Arc::clone(&self.state)
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub async fn run(mut self, mut event_rx: mpsc::Receiver<DaemonEvent>) -> anyhow::Result<()> {
        while let Some(event) = event_rx.recv().await {
            self.handle_event(event).await;
        }
        info!("event channel closed, coordinator exiting");
        Ok(())
    }

    /// Processes one event to completion. Public so tests can drive the
    /// coordinator without a socket.
    pub async fn handle_event(&mut self, event: DaemonEvent) {
        match event {
            DaemonEvent::ClientCommand(cmd) => {
                debug!("command: {:?}", cmd);
                if let Err(e) = self.exec_command(cmd).await {
                    warn!("command failed: {}", e);
                    let _ = self.broadcast_tx.send(BroadcastMessage::CommandFailed(e));
                }
                let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
            }
            DaemonEvent::Wallet(notice) => {
                self.handle_wallet_notice(notice).await;
                let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
            }
            DaemonEvent::Transport(event) => self.handle_transport_event(event).await,
            DaemonEvent::ClientConnected => {}
            DaemonEvent::ClientCountChanged(count) => {
                debug!("{} client(s) connected", count);
            }
        }
    }

    /// Executes one client command. Every failure is typed; state is only
    /// mutated once the whole command can no longer fail, so a failed
    /// command leaves no partial state behind.
    pub async fn exec_command(&mut self, cmd: Command) -> Result<(), PlayerError> {
        match cmd {
            Command::Connect => {
                let wallet = self.session.connect().await?;
                self.state.set_wallet(wallet).await;
                Ok(())
            }
            Command::Disconnect => {
                self.session.disconnect();
                self.state.set_wallet(self.session.snapshot()).await;
                Ok(())
            }
            Command::Play { track_id } => self.request_play(track_id).await,
            Command::TogglePause => self.toggle_pause().await,
            Command::Stop => self.stop_playback().await,
            Command::Next => self.play_adjacent(Direction::Next).await,
            Command::Prev => self.play_adjacent(Direction::Prev).await,
            Command::SeekTo { seconds } => self.seek_to(seconds).await,
            Command::Confirm { secret } => self.confirm_pending(&secret).await,
            Command::CancelPending => {
                let dropped = self.policy.cancel()?;
                info!("confirmation cancelled for track {}", dropped);
                self.state.set_pending_track(None).await;
                Ok(())
            }
            Command::SetAutoPay { enabled } => {
                self.policy.set_auto_pay(enabled);
                self.store
                    .save(KEY_AUTOPAY, &enabled)
                    .await
                    .map_err(PlayerError::internal)?;
                self.state.set_auto_pay(enabled).await;
                Ok(())
            }
            Command::ToggleFavorite { track_id } => {
                self.collections
                    .toggle_favorite(&self.catalog, track_id)
                    .await?;
                self.state
                    .set_favorites(self.collections.favorites().to_vec())
                    .await;
                Ok(())
            }
            Command::ClearFavorites => {
                self.collections.clear_favorites().await?;
                self.state.set_favorites(Vec::new()).await;
                Ok(())
            }
            Command::ClearHistory => {
                self.collections.clear_history().await?;
                self.state.set_history(Vec::new()).await;
                Ok(())
            }
            Command::CreatePlaylist { name } => {
                self.collections.create_playlist(&name).await?;
                self.push_playlists().await;
                Ok(())
            }
            Command::DeletePlaylist { playlist_id } => {
                self.collections.delete_playlist(playlist_id).await?;
                self.push_playlists().await;
                Ok(())
            }
            Command::AddToPlaylist {
                playlist_id,
                track_id,
            } => {
                self.collections
                    .add_to_playlist(&self.catalog, playlist_id, track_id)
                    .await?;
                self.push_playlists().await;
                Ok(())
            }
            Command::RemoveFromPlaylist {
                playlist_id,
                track_id,
            } => {
                self.collections
                    .remove_from_playlist(playlist_id, track_id)
                    .await?;
                self.push_playlists().await;
                Ok(())
            }
            // Answered by the state broadcast every command triggers.
            Command::GetState => Ok(()),
        }
    }

    // ── playback gating ───────────────────────────────────────────────────────

    /// The full gate for a play request: catalog, wallet connection,
    /// confirmation policy, then payment.
    async fn request_play(&mut self, track_id: TrackId) -> Result<(), PlayerError> {
        if !self.catalog.contains(track_id) {
            return Err(PlayerError::UnknownTrack(track_id));
        }
        if !self.session.is_connected() {
            return Err(PlayerError::NotConnected);
        }

        match self.policy.intercept(track_id)? {
            GateDecision::Proceed(id) => self.start_paid_playback(id).await,
            GateDecision::Held(id) => {
                info!("track {} held for confirmation", id);
                self.state.set_pending_track(Some(id)).await;
                Ok(())
            }
        }
    }

    /// Charges the track and, only once the receipt is in hand, records
    /// history and advances playback.
    async fn start_paid_playback(&mut self, track_id: TrackId) -> Result<(), PlayerError> {
        let receipt = payment::charge(&mut self.session, &self.catalog, track_id).await?;
        self.state.set_wallet(self.session.snapshot()).await;

        self.collections
            .record_play(track_id, receipt.amount)
            .await?;
        self.state
            .set_history(self.collections.history().to_vec())
            .await;

        let duration_secs = self
            .catalog
            .get(track_id)
            .map(|t| t.duration_secs)
            .unwrap_or(catalog::DEFAULT_DURATION_SECS);

        self.state.set_loading(track_id).await;
        self.transport
            .load(duration_secs)
            .await
            .map_err(PlayerError::internal)?;
        self.state.set_playing(track_id).await;

        let _ = self.broadcast_tx.send(BroadcastMessage::Settled(receipt));
        Ok(())
    }

    async fn confirm_pending(&mut self, secret: &str) -> Result<(), PlayerError> {
        let track_id = self.policy.confirm(secret)?;
        self.state.set_pending_track(None).await;
        self.start_paid_playback(track_id).await
    }

    async fn toggle_pause(&mut self) -> Result<(), PlayerError> {
        let playback = self.state.playback().await;
        match playback.status {
            PlaybackStatus::Playing => {
                self.transport.pause().await.map_err(PlayerError::internal)?;
                self.state.set_paused(true).await;
            }
            PlaybackStatus::Paused => {
                self.transport
                    .resume()
                    .await
                    .map_err(PlayerError::internal)?;
                self.state.set_paused(false).await;
            }
            _ => debug!("toggle ignored: nothing loaded"),
        }
        Ok(())
    }

    async fn play_adjacent(&mut self, direction: Direction) -> Result<(), PlayerError> {
        let current = self.state.playback().await.current_track;
        let Some(current) = current else {
            debug!("next/prev ignored: no current track");
            return Ok(());
        };
        let target = match direction {
            Direction::Next => self.catalog.next_after(current),
            Direction::Prev => self.catalog.prev_before(current),
        };
        // A current track is always in the catalog; guard anyway.
        let Some(track) = target else {
            return Err(PlayerError::UnknownTrack(current));
        };
        self.request_play(track.id).await
    }

    async fn stop_playback(&mut self) -> Result<(), PlayerError> {
        self.transport.stop().await.map_err(PlayerError::internal)?;
        self.state.set_stopped().await;
        Ok(())
    }

    async fn seek_to(&mut self, seconds: f64) -> Result<(), PlayerError> {
        let playback = self.state.playback().await;
        if !matches!(
            playback.status,
            PlaybackStatus::Playing | PlaybackStatus::Paused
        ) {
            debug!("seek ignored: nothing loaded");
            return Ok(());
        }
        let duration = playback
            .current_track
            .and_then(|id| self.catalog.get(id))
            .map(|t| t.duration_secs as f64)
            .unwrap_or(0.0);
        let clamped = seconds.clamp(0.0, duration);
        self.transport
            .seek_to(clamped)
            .await
            .map_err(PlayerError::internal)?;
        self.state.set_position(clamped).await;
        Ok(())
    }

    // ── wallet notices ────────────────────────────────────────────────────────

    async fn handle_wallet_notice(&mut self, notice: WalletNotice) {
        match notice {
            WalletNotice::AccountsChanged(accounts) => {
                match self.session.classify_accounts_change(&accounts) {
                    AccountsOutcome::DisconnectRequired => {
                        info!("wallet accounts revoked, disconnecting");
                        self.session.disconnect();
                        self.state.set_wallet(self.session.snapshot()).await;
                    }
                    AccountsOutcome::ReconnectRequired => match self.session.connect().await {
                        Ok(wallet) => {
                            info!("wallet account changed, reconnected");
                            self.state.set_wallet(wallet).await;
                        }
                        Err(e) => {
                            warn!("reconnect after account change failed: {}", e);
                            self.session.disconnect();
                            self.state.set_wallet(self.session.snapshot()).await;
                        }
                    },
                    AccountsOutcome::Unchanged => {}
                }
            }
            WalletNotice::NetworkChanged(network) => {
                // The whole session is invalid on another network; drop it
                // and make the user reconnect rather than resync in place.
                warn!(
                    "wallet network changed to '{}'; session invalidated, reconnect required",
                    network
                );
                self.session.disconnect();
                self.state.set_wallet(self.session.snapshot()).await;
            }
        }
    }

    // ── transport events ──────────────────────────────────────────────────────

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Progress(position) => {
                self.state.set_position(position).await;
                let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
            }
            TransportEvent::Ended => {
                let finished = self.state.playback().await.current_track;
                self.state.set_stopped().await;
                if let Some(finished) = finished {
                    debug!("track {} ended, advancing", finished);
                    if let Some(next_id) = self.catalog.next_after(finished).map(|t| t.id) {
                        if let Err(e) = self.request_play(next_id).await {
                            warn!("auto-advance failed: {}", e);
                            let _ = self.broadcast_tx.send(BroadcastMessage::CommandFailed(e));
                        }
                    }
                }
                let _ = self.broadcast_tx.send(BroadcastMessage::StateUpdated);
            }
        }
    }

    async fn push_playlists(&self) {
        self.state
            .set_playlists(self.collections.playlists().to_vec())
            .await;
    }
}

/// Catalog resolution order: local TOML file, remote TOML URL, bundled demo
/// catalog.
async fn resolve_catalog(config: &Config) -> anyhow::Result<CatalogIndex> {
    let path = &config.catalog.catalog_toml;
    if path.exists() {
        info!("loading catalog from {:?}", path);
        return catalog::load_catalog_from_toml(path);
    }

    if !config.catalog.catalog_url.is_empty() {
        info!("fetching catalog from {}", config.catalog.catalog_url);
        match catalog::fetch_catalog_from_url(&config.catalog.catalog_url).await {
            Ok(catalog) => return Ok(catalog),
            Err(e) => warn!("catalog fetch failed ({}), using demo catalog", e),
        }
    }

    catalog::demo_catalog()
}
