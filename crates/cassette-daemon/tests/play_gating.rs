//! Every track transition is a payment event: these scenarios drive the
//! coordinator through connect/play/next/prev and check that failures leave
//! no partial state behind.

mod common;

use cassette_daemon::core::{BroadcastMessage, DaemonEvent};
use cassette_daemon::transport::TransportEvent;
use cassette_proto::catalog::TrackId;
use cassette_proto::error::PlayerError;
use cassette_proto::protocol::Command;
use cassette_proto::state::PlaybackStatus;

#[tokio::test]
async fn play_without_wallet_fails_not_connected() {
    let mut h = common::start("1", true).await;

    let result = h.core.exec_command(Command::Play { track_id: TrackId(1) }).await;
    assert_eq!(result, Err(PlayerError::NotConnected));

    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.status, PlaybackStatus::Idle);
    assert!(state.history.is_empty());
}

#[tokio::test]
async fn play_unknown_track_fails() {
    let mut h = common::start("1", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();

    let result = h.core.exec_command(Command::Play { track_id: TrackId(42) }).await;
    assert_eq!(result, Err(PlayerError::UnknownTrack(TrackId(42))));
}

#[tokio::test]
async fn insufficient_balance_leaves_no_partial_state() {
    // Track 1 costs 0.001; the wallet holds less.
    let mut h = common::start("0.0005", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();

    let result = h.core.exec_command(Command::Play { track_id: TrackId(1) }).await;
    assert!(matches!(result, Err(PlayerError::InsufficientFunds { .. })));

    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.status, PlaybackStatus::Idle);
    assert_eq!(state.playback.current_track, None);
    assert!(state.history.is_empty());
    assert_eq!(state.wallet.balance.to_string(), "0.0005");
}

#[tokio::test]
async fn paid_play_debits_balance_and_records_history() {
    // Balance covers track 1 (0.001) but not track 2 (0.0015) afterwards.
    let mut h = common::start("0.0015", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();

    h.core
        .exec_command(Command::Play { track_id: TrackId(1) })
        .await
        .unwrap();

    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.current_track, Some(TrackId(1)));
    assert_eq!(state.playback.status, PlaybackStatus::Playing);
    assert!(state.playback.is_playing);
    assert_eq!(state.wallet.balance.to_string(), "0.0005");
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.history[0].track_id, TrackId(1));
    assert_eq!(state.history[0].price_paid.to_string(), "0.001");

    // The second track is no longer affordable; nothing about the session
    // changes.
    let result = h.core.exec_command(Command::Play { track_id: TrackId(2) }).await;
    assert!(matches!(result, Err(PlayerError::InsufficientFunds { .. })));

    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.current_track, Some(TrackId(1)));
    assert_eq!(state.playback.status, PlaybackStatus::Playing);
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.wallet.balance.to_string(), "0.0005");
}

#[tokio::test]
async fn settlement_failure_leaves_no_partial_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config(&dir, "1", true);
    config.wallet.settlement_failure_rate = 1.0;
    let mut h = common::start_with(dir, config).await;

    h.core.exec_command(Command::Connect).await.unwrap();
    let result = h.core.exec_command(Command::Play { track_id: TrackId(1) }).await;
    assert!(matches!(result, Err(PlayerError::SettlementFailed(_))));

    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.status, PlaybackStatus::Idle);
    assert!(state.history.is_empty());
    assert_eq!(state.wallet.balance.to_string(), "1");
}

#[tokio::test]
async fn successful_play_broadcasts_a_receipt() {
    let mut h = common::start("1", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();
    h.core
        .exec_command(Command::Play { track_id: TrackId(3) })
        .await
        .unwrap();

    let receipts: Vec<_> = common::drain_broadcasts(&mut h.broadcasts)
        .into_iter()
        .filter_map(|msg| match msg {
            BroadcastMessage::Settled(receipt) => Some(receipt),
            _ => None,
        })
        .collect();
    assert_eq!(receipts.len(), 1);
    assert_eq!(receipts[0].track_id, TrackId(3));
    assert_eq!(receipts[0].amount.to_string(), "0.002");
    assert_eq!(receipts[0].paid_to, "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
}

#[tokio::test]
async fn next_cycles_back_to_the_start_charging_each_hop() {
    let mut h = common::start("1", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();
    h.core
        .exec_command(Command::Play { track_id: TrackId(1) })
        .await
        .unwrap();

    // Five-track demo catalog: five nexts land back on track 1.
    for _ in 0..5 {
        h.core.exec_command(Command::Next).await.unwrap();
    }

    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.current_track, Some(TrackId(1)));
    // One initial play plus five paid skips.
    assert_eq!(state.history.len(), 6);
    // 0.001*2 + 0.0015 + 0.002 + 0.0012 + 0.0018 spent in total.
    assert_eq!(state.wallet.balance.to_string(), "0.9915");
}

#[tokio::test]
async fn prev_wraps_to_the_last_track() {
    let mut h = common::start("1", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();
    h.core
        .exec_command(Command::Play { track_id: TrackId(1) })
        .await
        .unwrap();

    h.core.exec_command(Command::Prev).await.unwrap();

    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.current_track, Some(TrackId(5)));
    assert_eq!(state.history.len(), 2);
}

#[tokio::test]
async fn next_with_nothing_playing_is_a_noop() {
    let mut h = common::start("1", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();

    h.core.exec_command(Command::Next).await.unwrap();
    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.current_track, None);
    assert!(state.history.is_empty());
}

#[tokio::test]
async fn toggle_pause_flips_only_between_playing_and_paused() {
    let mut h = common::start("1", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();

    // Nothing loaded: toggling is a no-op, not an error.
    h.core.exec_command(Command::TogglePause).await.unwrap();
    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.status, PlaybackStatus::Idle);

    h.core
        .exec_command(Command::Play { track_id: TrackId(1) })
        .await
        .unwrap();
    h.core.exec_command(Command::TogglePause).await.unwrap();
    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.status, PlaybackStatus::Paused);
    assert!(!state.playback.is_playing);

    h.core.exec_command(Command::TogglePause).await.unwrap();
    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.status, PlaybackStatus::Playing);

    // No extra charge for pausing around.
    assert_eq!(state.history.len(), 1);
}

#[tokio::test]
async fn stop_returns_to_idle_without_touching_collections() {
    let mut h = common::start("1", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();
    h.core
        .exec_command(Command::Play { track_id: TrackId(2) })
        .await
        .unwrap();

    h.core.exec_command(Command::Stop).await.unwrap();

    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.status, PlaybackStatus::Idle);
    assert_eq!(state.playback.current_track, None);
    assert_eq!(state.history.len(), 1);
}

#[tokio::test]
async fn natural_end_advances_to_the_next_paid_track() {
    let mut h = common::start("1", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();
    h.core
        .exec_command(Command::Play { track_id: TrackId(1) })
        .await
        .unwrap();

    h.core
        .handle_event(DaemonEvent::Transport(TransportEvent::Ended))
        .await;

    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.current_track, Some(TrackId(2)));
    assert_eq!(state.playback.status, PlaybackStatus::Playing);
    assert_eq!(state.history.len(), 2);
}

#[tokio::test]
async fn natural_end_with_empty_wallet_stops_playback() {
    // Exactly one play's worth of funds.
    let mut h = common::start("0.001", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();
    h.core
        .exec_command(Command::Play { track_id: TrackId(1) })
        .await
        .unwrap();

    h.core
        .handle_event(DaemonEvent::Transport(TransportEvent::Ended))
        .await;

    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playback.status, PlaybackStatus::Idle);
    assert_eq!(state.playback.current_track, None);
    assert_eq!(state.history.len(), 1);

    let failures: Vec<_> = common::drain_broadcasts(&mut h.broadcasts)
        .into_iter()
        .filter(|msg| matches!(msg, BroadcastMessage::CommandFailed(PlayerError::InsufficientFunds { .. })))
        .collect();
    assert_eq!(failures.len(), 1);
}

#[tokio::test]
async fn failed_command_is_broadcast_as_typed_error() {
    let mut h = common::start("1", true).await;

    h.core
        .handle_event(DaemonEvent::ClientCommand(Command::Play {
            track_id: TrackId(1),
        }))
        .await;

    let broadcasts = common::drain_broadcasts(&mut h.broadcasts);
    assert!(broadcasts
        .iter()
        .any(|msg| matches!(msg, BroadcastMessage::CommandFailed(PlayerError::NotConnected))));
    // A fresh state snapshot still follows every command.
    assert!(broadcasts
        .iter()
        .any(|msg| matches!(msg, BroadcastMessage::StateUpdated)));
}

#[tokio::test]
async fn provider_none_surfaces_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config(&dir, "1", true);
    config.wallet.provider = "none".to_string();
    let mut h = common::start_with(dir, config).await;

    assert_eq!(
        h.core.exec_command(Command::Connect).await,
        Err(PlayerError::ProviderUnavailable)
    );
}

#[tokio::test]
async fn rejected_wallet_access_surfaces_user_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::test_config(&dir, "1", true);
    config.wallet.grant_access = false;
    let mut h = common::start_with(dir, config).await;

    assert_eq!(
        h.core.exec_command(Command::Connect).await,
        Err(PlayerError::UserRejected)
    );
}

#[tokio::test]
async fn account_revocation_disconnects_the_session() {
    let mut h = common::start("1", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();

    h.core
        .handle_event(DaemonEvent::Wallet(
            cassette_daemon::wallet::WalletNotice::AccountsChanged(Vec::new()),
        ))
        .await;

    let state = h.core.state_manager().get_state().await;
    assert!(!state.wallet.connected);
    assert_eq!(state.wallet.address, None);
}

#[tokio::test]
async fn network_change_invalidates_the_session() {
    let mut h = common::start("1", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();

    h.core
        .handle_event(DaemonEvent::Wallet(
            cassette_daemon::wallet::WalletNotice::NetworkChanged("0x5".to_string()),
        ))
        .await;

    let state = h.core.state_manager().get_state().await;
    assert!(!state.wallet.connected);

    // Playing again requires a fresh connect.
    assert_eq!(
        h.core.exec_command(Command::Play { track_id: TrackId(1) }).await,
        Err(PlayerError::NotConnected)
    );
}
