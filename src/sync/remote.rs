use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use anyhow::{bail, Context, Result};

use crate::store::WorkshopSnapshot;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// What a fetch found in the document store.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Snapshot(WorkshopSnapshot),
    /// Nothing stored yet for this tenant.
    Empty,
}

/// Whole-document persistence for one workshop. An `Err` from either call is a
/// transport failure; callers report it and carry on with local state.
pub trait SnapshotStore: Send + Sync {
    fn fetch_snapshot(&self) -> StoreFuture<'_, FetchOutcome>;
    fn save_snapshot<'a>(&'a self, snapshot: &'a WorkshopSnapshot) -> StoreFuture<'a, ()>;
}

/// Keeps the encoded document in memory. Used by tests and embedders without
/// a database; still goes through JSON so the wire shape is exercised.
#[derive(Clone, Default)]
pub struct MemorySnapshotStore {
    document: Arc<Mutex<Option<String>>>,
    failing: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(raw: impl Into<String>) -> Self {
        let store = Self::default();
        store.set_document(raw);
        store
    }

    /// Overwrites the stored document, as another client's save would.
    pub fn set_document(&self, raw: impl Into<String>) {
        let mut guard = self
            .document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(raw.into());
    }

    pub fn document(&self) -> Option<String> {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Makes every following call fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn fetch_snapshot(&self) -> StoreFuture<'_, FetchOutcome> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                bail!("document store unreachable");
            }
            match self.document() {
                Some(raw) => {
                    let snapshot = serde_json::from_str(&raw)
                        .context("failed to decode stored snapshot")?;
                    Ok(FetchOutcome::Snapshot(snapshot))
                }
                None => Ok(FetchOutcome::Empty),
            }
        })
    }

    fn save_snapshot<'a>(&'a self, snapshot: &'a WorkshopSnapshot) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            if self.failing.load(Ordering::SeqCst) {
                bail!("document store unreachable");
            }
            let raw = serde_json::to_string(snapshot).context("failed to encode snapshot")?;
            self.set_document(raw);
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_until_first_save() {
        let store = MemorySnapshotStore::new();
        assert_eq!(store.fetch_snapshot().await.unwrap(), FetchOutcome::Empty);

        let snapshot = WorkshopSnapshot::default();
        store.save_snapshot(&snapshot).await.unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(
            store.fetch_snapshot().await.unwrap(),
            FetchOutcome::Snapshot(snapshot)
        );
    }

    #[tokio::test]
    async fn failing_store_reports_errors() {
        let store = MemorySnapshotStore::new();
        store.set_failing(true);
        assert!(store.fetch_snapshot().await.is_err());
        assert!(store.save_snapshot(&WorkshopSnapshot::default()).await.is_err());
        assert_eq!(store.save_count(), 0);
    }
}
