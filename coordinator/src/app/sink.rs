//! The single update channel between power operations and the display.
//!
//! Workers only ever send; one consumer owns the roster and applies the
//! updates, so no worker touches shared state directly.

use tokio::sync::mpsc;
use tracing::debug;

use powerlan_common::HostStatus;

use crate::roster::{HostRecord, Roster};

/// A status change for the roster entry at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusUpdate {
    pub index: usize,
    pub status: HostStatus,
}

pub type StatusRx = mpsc::UnboundedReceiver<StatusUpdate>;

/// Sending half of the status channel. Cheap to clone; one per worker.
#[derive(Debug, Clone)]
pub struct StatusSink {
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl StatusSink {
    /// Queues an update. Never blocks; updates sent after the consumer is gone are dropped.
    pub fn emit(&self, index: usize, status: HostStatus) {
        if self.tx.send(StatusUpdate { index, status }).is_err() {
            debug!(index, %status, "Status consumer gone, dropping update");
        }
    }
}

/// Creates a connected sink/receiver pair.
#[must_use]
pub fn channel() -> (StatusSink, StatusRx) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StatusSink { tx }, rx)
}

/// Drains `rx` into `roster` until every sink has been dropped, calling
/// `on_update` with each updated record.
pub async fn apply_updates<F>(mut rx: StatusRx, roster: &mut Roster, mut on_update: F)
where
    F: FnMut(usize, &HostRecord),
{
    while let Some(update) = rx.recv().await {
        match roster.apply(update) {
            Some(host) => on_update(update.index, host),
            None => debug!(index = update.index, "Update for a host no longer in the roster"),
        }
    }
}
