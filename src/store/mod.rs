pub mod access;
pub mod action;
pub mod snapshot;

pub use access::{resolve_actor, resolve_admin, resolve_mechanic, Actor};
pub use action::{reduce, Action, Confirmation};
pub use snapshot::WorkshopSnapshot;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::watch;

/// Holds the current workshop snapshot and hands out read-only views of it.
///
/// The snapshot is never mutated in place: each applied action or remote pull
/// swaps in a fresh `Arc<WorkshopSnapshot>`.
#[derive(Clone)]
pub struct Store {
    current: Arc<watch::Sender<Arc<WorkshopSnapshot>>>,
}

impl Store {
    pub fn new(initial: WorkshopSnapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self {
            current: Arc::new(tx),
        }
    }

    pub fn snapshot(&self) -> Arc<WorkshopSnapshot> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<WorkshopSnapshot>> {
        self.current.subscribe()
    }

    /// Runs `action` through the reducer. Returns the new snapshot when the
    /// action changed something.
    pub fn apply(&self, action: &Action, now: DateTime<Utc>) -> Option<Arc<WorkshopSnapshot>> {
        self.apply_change(action, now).map(|(_, next)| next)
    }

    /// Like [`Store::apply`], but also hands back the snapshot the reducer
    /// started from.
    pub fn apply_change(
        &self,
        action: &Action,
        now: DateTime<Utc>,
    ) -> Option<(Arc<WorkshopSnapshot>, Arc<WorkshopSnapshot>)> {
        let mut applied = None;
        self.current.send_if_modified(|current| match reduce(current, action, now) {
            Some(next) => {
                let next = Arc::new(next);
                let previous = std::mem::replace(current, Arc::clone(&next));
                applied = Some((previous, next));
                true
            }
            None => false,
        });

        if applied.is_none() {
            debug!("Action {} left state unchanged", action.name());
        }
        applied
    }

    /// Replaces the whole snapshot with one pulled from the document store.
    /// Returns false when the pulled state equals the local one.
    pub fn replace(&self, snapshot: WorkshopSnapshot) -> bool {
        self.current.send_if_modified(|current| {
            if **current == snapshot {
                return false;
            }
            *current = Arc::new(snapshot);
            true
        })
    }
}
