use crate::catalog::TrackId;
use crate::error::PlayerError;
use crate::money::Amount;
use crate::state::PlayerState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current protocol version.  Bump this when the wire format changes in a
/// breaking way.  Clients check this on connect and can refuse to talk to an
/// incompatible daemon.
pub const PROTOCOL_VERSION: u32 = 1;

/// Commands sent from a client to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    // Wallet
    Connect,
    Disconnect,
    // Playback — every track change is a fresh payment event
    Play { track_id: TrackId },
    TogglePause,
    Stop,
    Next,
    Prev,
    SeekTo { seconds: f64 },
    // Confirmation step
    Confirm { secret: String },
    CancelPending,
    SetAutoPay { enabled: bool },
    // Collections
    ToggleFavorite { track_id: TrackId },
    ClearFavorites,
    ClearHistory,
    CreatePlaylist { name: String },
    DeletePlaylist { playlist_id: Uuid },
    AddToPlaylist { playlist_id: Uuid, track_id: TrackId },
    RemoveFromPlaylist { playlist_id: Uuid, track_id: TrackId },
    GetState,
}

/// Proof-of-payment for one settled charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub track_id: TrackId,
    pub amount: Amount,
    pub paid_to: String,
    pub paid_at: DateTime<Utc>,
}

/// Messages sent from the daemon to clients (broadcasts).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "broadcast")]
pub enum Broadcast {
    /// Sent immediately on connect: daemon version + full state snapshot.
    Hello {
        protocol_version: u32,
        daemon_rev: u64,
        state: PlayerState,
    },
    State {
        data: PlayerState,
    },
    /// A charge settled; playback of the receipt's track is starting.
    Settled {
        receipt: Receipt,
    },
    /// A command failed. Typed so clients can present each failure their
    /// own way.
    CommandFailed {
        error: PlayerError,
    },
    Log {
        message: String,
    },
}

/// Wrapper for socket communication
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Command(Command),
    Broadcast(Broadcast),
}

impl Message {
    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        let len = json.len() as u32;
        let mut result = Vec::with_capacity(4 + json.len());
        result.extend_from_slice(&len.to_be_bytes());
        result.extend_from_slice(&json);
        Ok(result)
    }

    pub fn decode(data: &[u8]) -> anyhow::Result<(Self, usize)> {
        if data.len() < 4 {
            anyhow::bail!("Insufficient data for length header");
        }
        let len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if data.len() < 4 + len {
            anyhow::bail!("Insufficient data for message");
        }
        let msg: Self = serde_json::from_slice(&data[4..4 + len])?;
        Ok((msg, 4 + len))
    }
}
