use anyhow::Result;
use tokio::{
    task::JoinHandle,
    time::{self, Duration, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::store::Store;

use super::{FetchOutcome, SyncStatus, Syncer};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Remote state differed and replaced the local snapshot.
    Replaced,
    Unchanged,
    /// Remote was empty; the local snapshot was queued as its first version.
    Seeded,
}

impl Syncer {
    /// Pulls the remote document once. Last write wins: a fetched snapshot
    /// replaces local state wholesale, with no merge.
    pub async fn poll_once(&self, store: &Store) -> Result<PollOutcome> {
        self.set_status(SyncStatus::Syncing);
        let fetched = match self.remote().fetch_snapshot().await {
            Ok(fetched) => fetched,
            Err(err) => {
                self.set_status(SyncStatus::Error);
                return Err(err);
            }
        };

        match fetched {
            FetchOutcome::Snapshot(remote) => {
                let replaced = store.replace(remote);
                self.set_status(SyncStatus::Online);
                Ok(if replaced {
                    PollOutcome::Replaced
                } else {
                    PollOutcome::Unchanged
                })
            }
            FetchOutcome::Empty => {
                log_info!("Document store is empty; seeding it with local state");
                self.write_through(store.snapshot());
                Ok(PollOutcome::Seeded)
            }
        }
    }

    /// Polls every `every` while the client is visible, until `cancel` fires.
    pub fn spawn_poller(
        &self,
        store: Store,
        every: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let syncer = self.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !syncer.is_visible() {
                            log_debug!("Client hidden; skipping poll");
                            continue;
                        }
                        match syncer.poll_once(&store).await {
                            Ok(PollOutcome::Replaced) => log_debug!("Local state replaced from document store"),
                            Ok(_) => {}
                            Err(err) => log_error!("Poll failed: {err:#}"),
                        }
                    }
                    _ = cancel.cancelled() => {
                        log_info!("poller shutting down");
                        break;
                    }
                }
            }
        })
    }
}
