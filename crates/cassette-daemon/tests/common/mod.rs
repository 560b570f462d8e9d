//! Shared harness: a coordinator wired to a temp store, the bundled demo
//! catalog and a zero-latency simulated wallet, driven directly through
//! `exec_command`/`handle_event` — no socket involved.
#![allow(dead_code)]

use cassette_daemon::core::{BroadcastMessage, CoordinatorCore, DaemonEvent};
use cassette_proto::config::Config;
use tempfile::TempDir;
use tokio::sync::{broadcast, mpsc};

pub struct Harness {
    pub core: CoordinatorCore,
    pub broadcasts: broadcast::Receiver<BroadcastMessage>,
    // Held so transport/wallet forwarders keep a live channel.
    pub events: mpsc::Receiver<DaemonEvent>,
    pub dir: TempDir,
}

pub fn test_config(dir: &TempDir, balance: &str, auto_pay: bool) -> Config {
    let mut config = Config::default();
    config.daemon.store_dir = dir.path().join("store");
    // Point at a file that does not exist so the demo catalog is used.
    config.catalog.catalog_toml = dir.path().join("catalog.toml");
    config.catalog.catalog_url = String::new();
    config.wallet.initial_balance = balance.to_string();
    config.wallet.settlement_latency_ms = 0;
    config.payment.auto_pay_default = auto_pay;
    config
}

pub async fn start(balance: &str, auto_pay: bool) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(&dir, balance, auto_pay);
    start_with(dir, config).await
}

pub async fn start_with(dir: TempDir, config: Config) -> Harness {
    let (broadcast_tx, broadcasts) = broadcast::channel(256);
    let (event_tx, events) = mpsc::channel(256);
    let core = CoordinatorCore::new(config, broadcast_tx, event_tx)
        .await
        .expect("coordinator");
    Harness {
        core,
        broadcasts,
        events,
        dir,
    }
}

/// Drains currently queued broadcasts, returning them in order.
pub fn drain_broadcasts(rx: &mut broadcast::Receiver<BroadcastMessage>) -> Vec<BroadcastMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}
