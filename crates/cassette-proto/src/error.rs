//! Typed failure taxonomy for every externally-facing command.
//!
//! The enum is serializable so failures cross the client socket as data, not
//! as pre-rendered strings — the client decides how to present them.

use crate::catalog::TrackId;
use crate::money::Amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, PlayerError>;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum PlayerError {
    /// No wallet capability is present (provider absent or dead).
    #[error("wallet provider unavailable")]
    ProviderUnavailable,

    /// The wallet holder declined the account-access request.
    #[error("wallet access rejected by user")]
    UserRejected,

    /// The command needs a connected wallet.
    #[error("wallet not connected")]
    NotConnected,

    /// The track id does not exist in the catalog.
    #[error("unknown track {0}")]
    UnknownTrack(TrackId),

    /// The cached balance cannot cover the track price.
    #[error("insufficient funds: price {price}, balance {balance}")]
    InsufficientFunds { price: Amount, balance: Amount },

    /// The external settlement call failed; balance was left unchanged.
    #[error("settlement failed: {0}")]
    SettlementFailed(String),

    /// Playlist name was empty after trimming.
    #[error("playlist name must not be empty")]
    InvalidName,

    /// The track is already in that playlist.
    #[error("track already in playlist")]
    AlreadyPresent,

    /// The playlist id does not exist.
    #[error("unknown playlist {0}")]
    UnknownPlaylist(Uuid),

    /// A play request arrived while another one awaits confirmation.
    #[error("a confirmation is already pending")]
    ConfirmationPending,

    /// The supplied confirmation secret did not match.
    #[error("confirmation secret mismatch")]
    ConfirmationMismatch,

    /// Confirm or cancel was issued with no request pending.
    #[error("no confirmation pending")]
    NothingPending,

    /// A persisted collection could not be decoded. Recovered locally by
    /// resetting the collection to empty; never surfaced to clients.
    #[error("stored data corrupt: {0}")]
    StorageCorrupt(String),

    /// Infrastructure failure (e.g. a store write) behind an otherwise
    /// valid command.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PlayerError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        PlayerError::Internal(err.to_string())
    }
}
