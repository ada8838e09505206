//! Read-only roster view fed by membership snapshots.
//!
//! The session publishes through a `watch` channel: the view only ever sees
//! the newest snapshot, older ones are overwritten unread. The view runs as
//! its own task and can be torn down at any time without affecting the
//! control loop.

use std::fmt::Write as _;
use std::net::IpAddr;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::registry::Participant;

pub type RosterSnapshot = Vec<Participant>;

/// Session side of the roster channel.
#[derive(Debug)]
pub struct RosterPublisher {
    tx: watch::Sender<RosterSnapshot>,
}

impl RosterPublisher {
    pub fn new(initial: RosterSnapshot) -> (Self, watch::Receiver<RosterSnapshot>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx }, rx)
    }

    /// Replace the current snapshot. Never blocks, and succeeds even when no
    /// view is listening.
    pub fn publish(&self, snapshot: RosterSnapshot) {
        self.tx.send_replace(snapshot);
    }

    pub fn subscribe(&self) -> watch::Receiver<RosterSnapshot> {
        self.tx.subscribe()
    }
}

/// A running roster view task.
pub struct RosterView {
    handle: JoinHandle<()>,
}

impl RosterView {
    /// Start a task that calls `render` with every snapshot it observes,
    /// starting with the current one. Must be called inside a tokio runtime.
    pub fn spawn<F>(mut rx: watch::Receiver<RosterSnapshot>, local: IpAddr, mut render: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            loop {
                let text = render_roster(&rx.borrow_and_update(), local);
                render(&text);
                if rx.changed().await.is_err() {
                    debug!("roster publisher gone, view exiting");
                    break;
                }
            }
        });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the view, waiting at most `timeout` for it to wind down.
    pub async fn shutdown(self, timeout: Duration) {
        self.handle.abort();
        match tokio::time::timeout(timeout, self.handle).await {
            Ok(Ok(())) => debug!("roster view finished"),
            Ok(Err(e)) if e.is_cancelled() => debug!("roster view stopped"),
            Ok(Err(e)) => warn!("roster view failed: {}", e),
            Err(_) => warn!("roster view did not stop within {:?}, abandoning it", timeout),
        }
    }
}

/// Text form of a roster: one line per participant, active ones first.
pub fn render_roster(snapshot: &[Participant], local: IpAddr) -> String {
    let active = snapshot.iter().filter(|p| p.active).count();
    let mut out = format!("players connected: {}\n", active);
    let ordered = snapshot
        .iter()
        .filter(|p| p.active)
        .chain(snapshot.iter().filter(|p| !p.active));
    for p in ordered {
        let _ = write!(out, "  {:<15} {}", p.address, if p.active { "online" } else { "left" });
        if p.address == local {
            out.push_str(" (you)");
        }
        out.push('\n');
    }
    out
}
