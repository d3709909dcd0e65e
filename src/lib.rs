pub mod console;
pub mod db;
pub mod ledger;
pub mod models;
pub mod pricing;
pub mod reports;
pub mod settings;
pub mod store;
pub mod sync;
pub mod timer;
mod utils;
pub mod workshop_commands;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use chrono::{DateTime, SubsecRound, Utc};
use db::{Database, DocumentStore};
use log::{info, warn};
use settings::{data_dir, AppSettings, SettingsStore};
use store::{Action, Store, WorkshopSnapshot};
use sync::{PollOutcome, SnapshotStore, Syncer};
use timer::TimerController;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SEED_ENV: &str = "WORKBAY_SEED";

/// Current instant at the millisecond precision documents are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Everything a command needs: the local snapshot, its link to the document
/// store, the live-board ticker and the loaded configuration.
pub struct AppState {
    pub(crate) store: Store,
    pub(crate) sync: Syncer,
    pub(crate) timer: TimerController,
    pub(crate) settings: AppSettings,
}

impl AppState {
    /// Wires a state around `remote`. Must be called inside a Tokio runtime;
    /// the returned handle is the sync writer task, which exits once `cancel` fires.
    pub fn new(
        initial: WorkshopSnapshot,
        remote: Arc<dyn SnapshotStore>,
        settings: AppSettings,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let store = Store::new(initial);
        let (sync, writer) = Syncer::spawn(remote, cancel);
        let timer = TimerController::new(
            store.clone(),
            settings.tick_interval(),
            settings.report_zone(),
        );

        let state = Self {
            store,
            sync,
            timer,
            settings,
        };
        (state, writer)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn sync(&self) -> &Syncer {
        &self.sync
    }

    pub fn timer(&self) -> &TimerController {
        &self.timer
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn dispatch(&self, action: &Action) -> Option<Arc<WorkshopSnapshot>> {
        self.dispatch_at(action, now())
    }

    /// Applies `action` locally and, when it changed anything, queues the new
    /// snapshot for write-through without waiting on it.
    pub fn dispatch_at(&self, action: &Action, now: DateTime<Utc>) -> Option<Arc<WorkshopSnapshot>> {
        let (_, next) = self.dispatch_change_at(action, now)?;
        Some(next)
    }

    /// [`AppState::dispatch`] that also returns the snapshot the action was
    /// reduced from.
    pub fn dispatch_change(
        &self,
        action: &Action,
    ) -> Option<(Arc<WorkshopSnapshot>, Arc<WorkshopSnapshot>)> {
        self.dispatch_change_at(action, now())
    }

    fn dispatch_change_at(
        &self,
        action: &Action,
        now: DateTime<Utc>,
    ) -> Option<(Arc<WorkshopSnapshot>, Arc<WorkshopSnapshot>)> {
        let (previous, next) = self.store.apply_change(action, now)?;
        self.sync.write_through(Arc::clone(&next));
        Some((previous, next))
    }
}

fn load_seed(path: &Path) -> Result<WorkshopSnapshot> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed document {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse seed document {}", path.display()))
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    info!("Workbay starting up...");

    let runtime = tokio::runtime::Runtime::new().context("failed to start Tokio runtime")?;
    runtime.block_on(serve())
}

async fn serve() -> Result<()> {
    let data_dir = data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let settings = SettingsStore::new(data_dir.join("settings.json"))?.get();
    let database = Database::new(data_dir.join("workbay.sqlite3"))?;
    let remote: Arc<dyn SnapshotStore> =
        Arc::new(DocumentStore::new(database, settings.tenant_id.clone()));

    // Used only when the tenant has no stored document yet.
    let initial = match std::env::var_os(SEED_ENV) {
        Some(path) => load_seed(Path::new(&path))?,
        None => WorkshopSnapshot::default(),
    };

    let cancel = CancellationToken::new();
    let (state, writer) = AppState::new(initial, remote, settings, cancel.clone());

    match state.sync.poll_once(&state.store).await {
        Ok(PollOutcome::Seeded) => info!("Seeded tenant {}", state.settings.tenant_id),
        Ok(_) => info!("Loaded tenant {}", state.settings.tenant_id),
        Err(err) => warn!("Initial load failed; starting from local state: {err:#}"),
    }
    if state.store.snapshot().users.is_empty() {
        warn!("Workshop has no staff; set {SEED_ENV} to a workshop document to provision it");
    }

    let poller = state.sync.spawn_poller(
        state.store.clone(),
        state.settings.poll_interval(),
        cancel.child_token(),
    );
    state.timer.spawn_ticker(cancel.child_token()).await;

    let served = console::serve_stdio(&state).await;

    cancel.cancel();
    state.timer.cancel_ticker().await;
    if let Err(err) = poller.await {
        warn!("Poller task ended abnormally: {err}");
    }
    if let Err(err) = writer.await {
        warn!("Sync writer ended abnormally: {err}");
    }
    info!("Workbay stopped");
    served
}
