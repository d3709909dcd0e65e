pub mod poller;
pub mod remote;
pub mod status;

pub use poller::PollOutcome;
pub use remote::{FetchOutcome, MemorySnapshotStore, SnapshotStore, StoreFuture};
pub use status::SyncStatus;

use std::sync::Arc;

use anyhow::Result;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::store::WorkshopSnapshot;

// Set to true to log every write-through
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error};

/// Link between local state and the document store.
///
/// Saves are queued to one writer task and applied in order; when several
/// snapshots pile up only the newest is written. Nothing here ever blocks or
/// rolls back a local mutation.
#[derive(Clone)]
pub struct Syncer {
    remote: Arc<dyn SnapshotStore>,
    outbox: mpsc::UnboundedSender<Arc<WorkshopSnapshot>>,
    status: Arc<watch::Sender<SyncStatus>>,
    visible: Arc<watch::Sender<bool>>,
}

impl Syncer {
    /// Spawns the writer task. It drains pending saves and exits once `cancel` fires.
    pub fn spawn(remote: Arc<dyn SnapshotStore>, cancel: CancellationToken) -> (Self, JoinHandle<()>) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(SyncStatus::Offline);
        let (visible, _) = watch::channel(true);

        let syncer = Self {
            remote,
            outbox,
            status: Arc::new(status),
            visible: Arc::new(visible),
        };

        let handle = tokio::spawn(writer_loop(syncer.clone(), inbox, cancel));
        (syncer, handle)
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    pub(crate) fn set_status(&self, status: SyncStatus) {
        self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    /// Foreground/background flag; the poller only runs while visible.
    pub fn set_visible(&self, visible: bool) {
        self.visible.send_replace(visible);
    }

    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    pub fn subscribe_visible(&self) -> watch::Receiver<bool> {
        self.visible.subscribe()
    }

    /// Queues `snapshot` for saving and returns immediately.
    pub fn write_through(&self, snapshot: Arc<WorkshopSnapshot>) {
        if self.outbox.send(snapshot).is_err() {
            log_error!("Sync writer has stopped; snapshot not persisted");
            self.set_status(SyncStatus::Error);
        }
    }

    /// Saves directly, bypassing the queue, and updates the status flag.
    pub async fn save_now(&self, snapshot: &WorkshopSnapshot) -> Result<()> {
        self.set_status(SyncStatus::Syncing);
        match self.remote.save_snapshot(snapshot).await {
            Ok(()) => {
                self.set_status(SyncStatus::Online);
                Ok(())
            }
            Err(err) => {
                self.set_status(SyncStatus::Error);
                Err(err)
            }
        }
    }

    pub(crate) fn remote(&self) -> &Arc<dyn SnapshotStore> {
        &self.remote
    }
}

async fn writer_loop(
    syncer: Syncer,
    mut inbox: mpsc::UnboundedReceiver<Arc<WorkshopSnapshot>>,
    cancel: CancellationToken,
) {
    loop {
        let next = tokio::select! {
            received = inbox.recv() => received,
            _ = cancel.cancelled() => break,
        };
        let Some(mut snapshot) = next else {
            break;
        };

        // Coalesce a backlog down to its newest entry.
        while let Ok(newer) = inbox.try_recv() {
            snapshot = newer;
        }

        if let Err(err) = syncer.save_now(&snapshot).await {
            log_error!("Failed to persist snapshot: {err:#}");
        } else {
            log_debug!("Snapshot persisted");
        }
    }

    // Flush whatever was queued before shutdown.
    let mut last = None;
    while let Ok(pending) = inbox.try_recv() {
        last = Some(pending);
    }
    if let Some(snapshot) = last {
        if let Err(err) = syncer.save_now(&snapshot).await {
            log_error!("Failed to persist final snapshot: {err:#}");
        }
    }
    syncer.set_status(SyncStatus::Offline);
}
