//! The payment gate: every track transition passes through `charge` before
//! playback may advance.

use crate::wallet::WalletSession;
use cassette_proto::catalog::{CatalogIndex, TrackId};
use cassette_proto::error::PlayerError;
use cassette_proto::protocol::Receipt;
use chrono::Utc;
use tracing::info;

/// Collects the listed price for one track.
///
/// Preconditions are checked in order: wallet connected, track known, cached
/// balance covers the price. Only then is the external settlement invoked.
/// On settlement failure the cached balance is left untouched; on success it
/// is debited and a receipt returned. The caller (the coordinator loop)
/// serializes play requests, so at most one charge is ever outstanding.
///
/// No retry happens here; retry policy belongs to the caller.
pub async fn charge(
    session: &mut WalletSession,
    catalog: &CatalogIndex,
    track_id: TrackId,
) -> Result<Receipt, PlayerError> {
    if !session.is_connected() {
        return Err(PlayerError::NotConnected);
    }

    let track = catalog
        .get(track_id)
        .ok_or(PlayerError::UnknownTrack(track_id))?;

    if session.balance() < track.price {
        return Err(PlayerError::InsufficientFunds {
            price: track.price,
            balance: session.balance(),
        });
    }

    session
        .provider()
        .submit_payment(&track.payee_address, track.price)
        .await?;

    session.debit(track.price)?;
    info!(
        "charged {} for track {} ({}), balance {}",
        track.price, track.id, track.title, session.balance()
    );

    Ok(Receipt {
        track_id,
        amount: track.price,
        paid_to: track.payee_address.clone(),
        paid_at: Utc::now(),
    })
}
