//! Collection commands through the coordinator: favorites and playlists
//! mutate independently of playback and survive a daemon restart.

mod common;

use cassette_proto::catalog::TrackId;
use cassette_proto::error::PlayerError;
use cassette_proto::protocol::Command;

#[tokio::test]
async fn favorite_toggle_pairs_restore_membership() {
    let mut h = common::start("1", true).await;

    // Collections need no wallet.
    for _ in 0..2 {
        h.core
            .exec_command(Command::ToggleFavorite { track_id: TrackId(2) })
            .await
            .unwrap();
    }
    let state = h.core.state_manager().get_state().await;
    assert!(state.favorites.is_empty());

    h.core
        .exec_command(Command::ToggleFavorite { track_id: TrackId(2) })
        .await
        .unwrap();
    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.favorites, vec![TrackId(2)]);
}

#[tokio::test]
async fn favorite_of_unknown_track_is_rejected() {
    let mut h = common::start("1", true).await;

    assert_eq!(
        h.core
            .exec_command(Command::ToggleFavorite { track_id: TrackId(42) })
            .await,
        Err(PlayerError::UnknownTrack(TrackId(42)))
    );
    assert!(h.core.state_manager().get_state().await.favorites.is_empty());
}

#[tokio::test]
async fn whitespace_playlist_name_changes_nothing() {
    let mut h = common::start("1", true).await;

    assert_eq!(
        h.core
            .exec_command(Command::CreatePlaylist { name: "   ".to_string() })
            .await,
        Err(PlayerError::InvalidName)
    );
    assert!(h.core.state_manager().get_state().await.playlists.is_empty());
}

#[tokio::test]
async fn duplicate_playlist_add_is_rejected_once() {
    let mut h = common::start("1", true).await;

    h.core
        .exec_command(Command::CreatePlaylist { name: "Mix".to_string() })
        .await
        .unwrap();
    let playlist_id = h.core.state_manager().get_state().await.playlists[0].id;

    h.core
        .exec_command(Command::AddToPlaylist { playlist_id, track_id: TrackId(1) })
        .await
        .unwrap();
    assert_eq!(
        h.core
            .exec_command(Command::AddToPlaylist { playlist_id, track_id: TrackId(1) })
            .await,
        Err(PlayerError::AlreadyPresent)
    );

    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.playlists[0].track_ids.len(), 1);
}

#[tokio::test]
async fn playlists_round_trip_through_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(&dir, "1", true);

    let (dir, expected) = {
        let mut h = common::start_with(dir, config).await;
        h.core
            .exec_command(Command::CreatePlaylist { name: "Road Trip".to_string() })
            .await
            .unwrap();
        h.core
            .exec_command(Command::CreatePlaylist { name: "Focus".to_string() })
            .await
            .unwrap();
        let playlist_id = h.core.state_manager().get_state().await.playlists[0].id;
        for track in [TrackId(3), TrackId(1), TrackId(4)] {
            h.core
                .exec_command(Command::AddToPlaylist { playlist_id, track_id: track })
                .await
                .unwrap();
        }
        (h.dir, h.core.state_manager().get_state().await.playlists)
    };

    let config = common::test_config(&dir, "1", true);
    let h = common::start_with(dir, config).await;
    let reloaded = h.core.state_manager().get_state().await.playlists;
    // Field-for-field identical after the round trip.
    assert_eq!(reloaded, expected);
}

#[tokio::test]
async fn delete_playlist_and_remove_track_tolerate_absence() {
    let mut h = common::start("1", true).await;

    h.core
        .exec_command(Command::CreatePlaylist { name: "Mix".to_string() })
        .await
        .unwrap();
    let playlist_id = h.core.state_manager().get_state().await.playlists[0].id;

    // Removing a track that was never added is a quiet no-op.
    h.core
        .exec_command(Command::RemoveFromPlaylist { playlist_id, track_id: TrackId(1) })
        .await
        .unwrap();

    h.core
        .exec_command(Command::DeletePlaylist { playlist_id })
        .await
        .unwrap();
    assert!(h.core.state_manager().get_state().await.playlists.is_empty());

    // Deleting again changes nothing.
    h.core
        .exec_command(Command::DeletePlaylist { playlist_id })
        .await
        .unwrap();

    // Playlist-scoped track ops on a deleted playlist are typed failures.
    assert_eq!(
        h.core
            .exec_command(Command::AddToPlaylist { playlist_id, track_id: TrackId(1) })
            .await,
        Err(PlayerError::UnknownPlaylist(playlist_id))
    );
}

#[tokio::test]
async fn clear_history_and_favorites_commands() {
    let mut h = common::start("1", true).await;
    h.core.exec_command(Command::Connect).await.unwrap();
    h.core
        .exec_command(Command::Play { track_id: TrackId(1) })
        .await
        .unwrap();
    h.core
        .exec_command(Command::ToggleFavorite { track_id: TrackId(1) })
        .await
        .unwrap();

    h.core.exec_command(Command::ClearHistory).await.unwrap();
    h.core.exec_command(Command::ClearFavorites).await.unwrap();

    let state = h.core.state_manager().get_state().await;
    assert!(state.history.is_empty());
    assert!(state.favorites.is_empty());
    // Playback is untouched by collection clears.
    assert_eq!(state.playback.current_track, Some(TrackId(1)));
}

#[tokio::test]
async fn history_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::test_config(&dir, "1", true);

    let dir = {
        let mut h = common::start_with(dir, config).await;
        h.core.exec_command(Command::Connect).await.unwrap();
        h.core
            .exec_command(Command::Play { track_id: TrackId(2) })
            .await
            .unwrap();
        h.dir
    };

    let config = common::test_config(&dir, "1", true);
    let h = common::start_with(dir, config).await;
    let state = h.core.state_manager().get_state().await;
    assert_eq!(state.history.len(), 1);
    assert_eq!(state.history[0].track_id, TrackId(2));
    assert_eq!(state.history[0].price_paid.to_string(), "0.0015");
}
