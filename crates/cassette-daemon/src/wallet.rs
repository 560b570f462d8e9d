//! Wallet capability boundary and session lifecycle.
//!
//! Architecture:
//!
//! ```text
//!   spawn_simulated()
//!         │
//!         └── provider task   ← receives ProviderRequest via mpsc
//!                                  ├── request_access  → oneshot reply
//!                                  ├── get_balance     → oneshot reply
//!                                  └── submit_payment  → sleep(latency), debit ledger, reply
//! ```
//!
//! Public API:
//!   - `ProviderHandle` — cheaply cloneable; each call sends a request and
//!     awaits the oneshot reply. A dead or absent provider task surfaces as
//!     `ProviderUnavailable`, never a crash.
//!   - `WalletSession` — the one owner of `WalletState`: connect/disconnect
//!     lifecycle and the cached balance that PaymentGate debits.
//!   - `WalletNotice` — unsolicited provider notifications (account set,
//!     network). The coordinator subscribes once at startup and applies them
//!     between commands, never mid-settlement.

use cassette_proto::config::WalletConfig;
use cassette_proto::error::PlayerError;
use cassette_proto::money::Amount;
use cassette_proto::state::WalletState;
use rand::Rng;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

// ── internal channel types ────────────────────────────────────────────────────

enum ProviderRequest {
    RequestAccess {
        reply: oneshot::Sender<Result<Vec<String>, PlayerError>>,
    },
    GetBalance {
        address: String,
        reply: oneshot::Sender<Result<Amount, PlayerError>>,
    },
    SubmitPayment {
        to: String,
        amount: Amount,
        reply: oneshot::Sender<Result<(), PlayerError>>,
    },
}

/// Unsolicited notification from the wallet capability.
#[derive(Debug, Clone)]
pub enum WalletNotice {
    /// The exposed account set changed. Empty means access was revoked.
    AccountsChanged(Vec<String>),
    /// The provider switched networks; the whole session is invalid.
    NetworkChanged(String),
}

// ── public handle ─────────────────────────────────────────────────────────────

/// Cloneable handle to the provider task.
#[derive(Clone)]
pub struct ProviderHandle {
    tx: mpsc::Sender<ProviderRequest>,
}

impl ProviderHandle {
    /// A handle with no provider behind it: every call fails
    /// `ProviderUnavailable`. Used when `wallet.provider = "none"`.
    pub fn unavailable() -> Self {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        Self { tx }
    }

    pub async fn request_access(&self) -> Result<Vec<String>, PlayerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ProviderRequest::RequestAccess { reply: reply_tx })
            .await
            .map_err(|_| PlayerError::ProviderUnavailable)?;
        reply_rx.await.map_err(|_| PlayerError::ProviderUnavailable)?
    }

    pub async fn get_balance(&self, address: &str) -> Result<Amount, PlayerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ProviderRequest::GetBalance {
                address: address.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| PlayerError::ProviderUnavailable)?;
        reply_rx.await.map_err(|_| PlayerError::ProviderUnavailable)?
    }

    pub async fn submit_payment(&self, to: &str, amount: Amount) -> Result<(), PlayerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(ProviderRequest::SubmitPayment {
                to: to.to_string(),
                amount,
                reply: reply_tx,
            })
            .await
            .map_err(|_| PlayerError::ProviderUnavailable)?;
        reply_rx.await.map_err(|_| PlayerError::ProviderUnavailable)?
    }
}

// ── simulated provider ────────────────────────────────────────────────────────

/// Spawns the in-process stand-in for the external wallet. It keeps the
/// authoritative per-address ledger, sleeps for the configured settlement
/// latency, and fails a configurable fraction of settlements. It never emits
/// a `WalletNotice`; that channel exists for real providers to fill.
pub fn spawn_simulated(config: &WalletConfig) -> anyhow::Result<ProviderHandle> {
    let initial: Amount = config
        .initial_balance
        .parse()
        .map_err(|e| anyhow::anyhow!("wallet.initial_balance: {}", e))?;

    let account = config.account_address.clone();
    let grant_access = config.grant_access;
    let latency = std::time::Duration::from_millis(config.settlement_latency_ms);
    let failure_rate = config.settlement_failure_rate;

    let mut ledger: HashMap<String, Amount> = HashMap::new();
    ledger.insert(account.clone(), initial);

    let (tx, mut rx) = mpsc::channel::<ProviderRequest>(16);

    tokio::spawn(async move {
        while let Some(req) = rx.recv().await {
            match req {
                ProviderRequest::RequestAccess { reply } => {
                    let result = if grant_access {
                        Ok(vec![account.clone()])
                    } else {
                        Err(PlayerError::UserRejected)
                    };
                    let _ = reply.send(result);
                }
                ProviderRequest::GetBalance { address, reply } => {
                    let balance = ledger.get(&address).copied().unwrap_or(Amount::ZERO);
                    debug!("provider: balance of {} is {}", address, balance);
                    let _ = reply.send(Ok(balance));
                }
                ProviderRequest::SubmitPayment { to, amount, reply } => {
                    tokio::time::sleep(latency).await;

                    if failure_rate > 0.0 && rand::thread_rng().gen::<f32>() < failure_rate {
                        warn!("provider: simulated settlement failure for {}", to);
                        let _ = reply.send(Err(PlayerError::SettlementFailed(
                            "simulated settlement failure".to_string(),
                        )));
                        continue;
                    }

                    let payer = ledger.entry(account.clone()).or_insert(Amount::ZERO);
                    match payer.checked_sub(amount) {
                        Some(remaining) => {
                            *payer = remaining;
                            let payee = ledger.entry(to.clone()).or_insert(Amount::ZERO);
                            *payee = payee.checked_add(amount).unwrap_or(*payee);
                            debug!("provider: settled {} to {}", amount, to);
                            let _ = reply.send(Ok(()));
                        }
                        None => {
                            let _ = reply.send(Err(PlayerError::SettlementFailed(
                                "insufficient funds at provider".to_string(),
                            )));
                        }
                    }
                }
            }
        }
        debug!("provider: task exiting");
    });

    Ok(ProviderHandle { tx })
}

// ── session ───────────────────────────────────────────────────────────────────

/// What the coordinator should do in response to an account-set change.
#[derive(Debug, PartialEq, Eq)]
pub enum AccountsOutcome {
    /// Account set went empty: implicit disconnect.
    DisconnectRequired,
    /// A different account is now first: full reconnect.
    ReconnectRequired,
    /// Same account (or not connected): nothing to do.
    Unchanged,
}

/// Connection lifecycle and balance cache for the wallet capability. The
/// single owner of `WalletState`; everything else reads snapshots.
pub struct WalletSession {
    provider: ProviderHandle,
    connected: bool,
    address: Option<String>,
    balance: Amount,
}

impl WalletSession {
    pub fn new(provider: ProviderHandle) -> Self {
        Self {
            provider,
            connected: false,
            address: None,
            balance: Amount::ZERO,
        }
    }

    pub fn provider(&self) -> &ProviderHandle {
        &self.provider
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn snapshot(&self) -> WalletState {
        WalletState {
            connected: self.connected,
            address: self.address.clone(),
            balance: self.balance,
        }
    }

    /// Requests account access and fetches the opening balance. The first
    /// exposed account becomes the session address, as in the original
    /// client.
    pub async fn connect(&mut self) -> Result<WalletState, PlayerError> {
        let accounts = self.provider.request_access().await?;
        let address = match accounts.into_iter().next() {
            Some(a) => a,
            None => return Err(PlayerError::UserRejected),
        };
        let balance = self.provider.get_balance(&address).await?;

        self.connected = true;
        self.address = Some(address);
        self.balance = balance;
        info!("wallet: connected, balance {}", self.balance);
        Ok(self.snapshot())
    }

    /// Resets to disconnected defaults; idempotent.
    pub fn disconnect(&mut self) {
        self.connected = false;
        self.address = None;
        self.balance = Amount::ZERO;
    }

    /// Deducts a settled payment from the cached balance.
    pub fn debit(&mut self, amount: Amount) -> Result<(), PlayerError> {
        match self.balance.checked_sub(amount) {
            Some(remaining) => {
                self.balance = remaining;
                Ok(())
            }
            None => Err(PlayerError::InsufficientFunds {
                price: amount,
                balance: self.balance,
            }),
        }
    }

    /// Classifies an account-set change against the current session.
    pub fn classify_accounts_change(&self, accounts: &[String]) -> AccountsOutcome {
        match accounts.first() {
            None => AccountsOutcome::DisconnectRequired,
            Some(first) => {
                if self.connected && self.address.as_deref() == Some(first.as_str()) {
                    AccountsOutcome::Unchanged
                } else {
                    AccountsOutcome::ReconnectRequired
                }
            }
        }
    }
}
