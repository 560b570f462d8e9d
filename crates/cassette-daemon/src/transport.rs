//! Simulated audio transport.
//!
//! Stands in for the audio element: a task that ticks position once per
//! second while running, reports progress, and emits `Ended` when the loaded
//! duration is reached. The coordinator treats `Ended` exactly like a user
//! pressing next. No bytes are decoded anywhere — playback timing is the
//! only thing this system needs from a transport.

use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportEvent {
    /// Position advanced to this many seconds into the track.
    Progress(f64),
    /// The loaded track ran to its end.
    Ended,
}

enum TransportCmd {
    Load { duration_secs: u32 },
    Pause,
    Resume,
    SeekTo { seconds: f64 },
    Stop,
}

/// Cheaply cloneable handle to the transport task.
#[derive(Clone)]
pub struct TransportHandle {
    tx: mpsc::Sender<TransportCmd>,
}

impl TransportHandle {
    pub async fn load(&self, duration_secs: u32) -> anyhow::Result<()> {
        self.send(TransportCmd::Load { duration_secs }).await
    }

    pub async fn pause(&self) -> anyhow::Result<()> {
        self.send(TransportCmd::Pause).await
    }

    pub async fn resume(&self) -> anyhow::Result<()> {
        self.send(TransportCmd::Resume).await
    }

    pub async fn seek_to(&self, seconds: f64) -> anyhow::Result<()> {
        self.send(TransportCmd::SeekTo { seconds }).await
    }

    pub async fn stop(&self) -> anyhow::Result<()> {
        self.send(TransportCmd::Stop).await
    }

    async fn send(&self, cmd: TransportCmd) -> anyhow::Result<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| anyhow::anyhow!("transport task gone"))
    }
}

/// Spawns the transport task. Events land on `event_tx`.
pub fn spawn(event_tx: mpsc::Sender<TransportEvent>) -> TransportHandle {
    let (tx, mut rx) = mpsc::channel::<TransportCmd>(16);

    tokio::spawn(async move {
        let mut duration: Option<f64> = None;
        let mut running = false;
        let mut position = 0.0_f64;
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = rx.recv() => {
                    match cmd {
                        Some(TransportCmd::Load { duration_secs }) => {
                            duration = Some(duration_secs as f64);
                            position = 0.0;
                            running = true;
                            ticker.reset();
                            debug!("transport: loaded {}s track", duration_secs);
                        }
                        Some(TransportCmd::Pause) => running = false,
                        Some(TransportCmd::Resume) => {
                            if duration.is_some() {
                                running = true;
                            }
                        }
                        Some(TransportCmd::SeekTo { seconds }) => {
                            if let Some(d) = duration {
                                position = seconds.clamp(0.0, d);
                            }
                        }
                        Some(TransportCmd::Stop) => {
                            duration = None;
                            running = false;
                            position = 0.0;
                        }
                        None => {
                            debug!("transport: task exiting");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    let Some(d) = duration else { continue };
                    if !running {
                        continue;
                    }
                    position = (position + 1.0).min(d);
                    if event_tx.send(TransportEvent::Progress(position)).await.is_err() {
                        break;
                    }
                    if position >= d {
                        duration = None;
                        running = false;
                        if event_tx.send(TransportEvent::Ended).await.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    });

    TransportHandle { tx }
}
