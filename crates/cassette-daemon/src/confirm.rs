//! Manual-confirmation step that can intercept a play request before the
//! payment gate runs.
//!
//! With auto-pay on, every request passes straight through. With auto-pay
//! off, the request parks as the pending target until the user confirms with
//! the configured secret, fails the comparison (and may retry), or cancels.
//! While one request is pending, further play requests are rejected — the
//! pending target is never overwritten, otherwise a second track could ride
//! on the first track's confirmation.
//!
//! The secret is compared in plain text with no lockout. It is a spending
//! speed bump, not an authentication mechanism.

use cassette_proto::catalog::TrackId;
use cassette_proto::error::PlayerError;
use tracing::debug;

/// Outcome of presenting a play request to the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Auto-pay is on; go straight to the payment gate.
    Proceed(TrackId),
    /// Auto-pay is off; the request is parked awaiting confirmation.
    Held(TrackId),
}

pub struct ConfirmationPolicy {
    secret: String,
    auto_pay: bool,
    pending: Option<TrackId>,
}

impl ConfirmationPolicy {
    pub fn new(secret: String, auto_pay: bool) -> Self {
        Self {
            secret,
            auto_pay,
            pending: None,
        }
    }

    pub fn auto_pay(&self) -> bool {
        self.auto_pay
    }

    pub fn set_auto_pay(&mut self, enabled: bool) {
        self.auto_pay = enabled;
    }

    pub fn pending(&self) -> Option<TrackId> {
        self.pending
    }

    /// Routes a play request: through, held, or rejected while another
    /// request awaits confirmation.
    pub fn intercept(&mut self, track_id: TrackId) -> Result<GateDecision, PlayerError> {
        if self.auto_pay {
            return Ok(GateDecision::Proceed(track_id));
        }
        if self.pending.is_some() {
            return Err(PlayerError::ConfirmationPending);
        }
        self.pending = Some(track_id);
        debug!("confirmation: holding track {}", track_id);
        Ok(GateDecision::Held(track_id))
    }

    /// Resolves the pending request with a secret. A mismatch leaves the
    /// request pending so the user can retry.
    pub fn confirm(&mut self, secret: &str) -> Result<TrackId, PlayerError> {
        let pending = self.pending.ok_or(PlayerError::NothingPending)?;
        if secret != self.secret {
            debug!("confirmation: secret mismatch for track {}", pending);
            return Err(PlayerError::ConfirmationMismatch);
        }
        self.pending = None;
        Ok(pending)
    }

    /// Drops the pending request without charging.
    pub fn cancel(&mut self) -> Result<TrackId, PlayerError> {
        self.pending.take().ok_or(PlayerError::NothingPending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(auto_pay: bool) -> ConfirmationPolicy {
        ConfirmationPolicy::new("1234".to_string(), auto_pay)
    }

    #[test]
    fn auto_pay_passes_straight_through() {
        let mut p = policy(true);
        assert_eq!(p.intercept(TrackId(1)), Ok(GateDecision::Proceed(TrackId(1))));
        assert_eq!(p.pending(), None);
    }

    #[test]
    fn manual_mode_holds_the_request() {
        let mut p = policy(false);
        assert_eq!(p.intercept(TrackId(1)), Ok(GateDecision::Held(TrackId(1))));
        assert_eq!(p.pending(), Some(TrackId(1)));
    }

    #[test]
    fn second_request_rejected_while_pending() {
        let mut p = policy(false);
        p.intercept(TrackId(1)).unwrap();
        assert_eq!(p.intercept(TrackId(2)), Err(PlayerError::ConfirmationPending));
        // The original target survives untouched.
        assert_eq!(p.pending(), Some(TrackId(1)));
    }

    #[test]
    fn wrong_secret_allows_retry() {
        let mut p = policy(false);
        p.intercept(TrackId(1)).unwrap();

        assert_eq!(p.confirm("9999"), Err(PlayerError::ConfirmationMismatch));
        assert_eq!(p.pending(), Some(TrackId(1)));
        assert_eq!(p.confirm("1234"), Ok(TrackId(1)));
        assert_eq!(p.pending(), None);
    }

    #[test]
    fn cancel_drops_the_request() {
        let mut p = policy(false);
        p.intercept(TrackId(1)).unwrap();
        assert_eq!(p.cancel(), Ok(TrackId(1)));
        assert_eq!(p.pending(), None);
        assert_eq!(p.cancel(), Err(PlayerError::NothingPending));
    }

    #[test]
    fn confirm_without_pending_fails() {
        let mut p = policy(false);
        assert_eq!(p.confirm("1234"), Err(PlayerError::NothingPending));
    }

    #[test]
    fn toggling_auto_pay_does_not_clear_pending() {
        let mut p = policy(false);
        p.intercept(TrackId(1)).unwrap();
        p.set_auto_pay(true);
        assert_eq!(p.pending(), Some(TrackId(1)));
        assert_eq!(p.confirm("1234"), Ok(TrackId(1)));
    }
}
