use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    models::SessionStatus,
    reports::{time_rollup, MechanicTime, TimeWindow},
    settings::ReportZone,
    store::{Store, WorkshopSnapshot},
};

use super::session_duration_ms;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LiveSession {
    pub session_id: String,
    pub mechanic_id: String,
    pub mechanic_name: String,
    pub status: SessionStatus,
    pub elapsed_ms: u64,
}

/// What the floor display shows: every open shift with its running time,
/// plus today's ranking.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LiveBoard {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub generated_at: DateTime<Utc>,
    pub open_sessions: Vec<LiveSession>,
    pub today: Vec<MechanicTime>,
}

impl LiveBoard {
    pub fn build<Tz: TimeZone>(snapshot: &WorkshopSnapshot, now: DateTime<Utc>, zone: &Tz) -> Self {
        let mut open_sessions: Vec<LiveSession> = snapshot
            .sessions
            .open_sessions()
            .map(|session| LiveSession {
                session_id: session.id.clone(),
                mechanic_id: session.mechanic_id.clone(),
                mechanic_name: session.mechanic_name.clone(),
                status: session.status,
                elapsed_ms: session_duration_ms(session, now),
            })
            .collect();
        open_sessions.sort_by(|a, b| b.elapsed_ms.cmp(&a.elapsed_ms));

        Self {
            generated_at: now,
            open_sessions,
            today: time_rollup(snapshot.sessions.iter(), TimeWindow::Daily, now, zone),
        }
    }
}

/// Read-side ticker recomputing live durations about once a second, and
/// right away whenever the snapshot changes.
#[derive(Clone)]
pub struct TimerController {
    store: Store,
    zone: ReportZone,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
    board: Arc<watch::Sender<LiveBoard>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TimerController {
    pub fn new(store: Store, tick_interval: Duration, zone: ReportZone) -> Self {
        let debug_mode = std::env::var("WORKBAY_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let (board, _) = watch::channel(LiveBoard::default());

        Self {
            store,
            zone,
            tick_interval,
            heartbeat_every_ticks: if debug_mode { 1 } else { 60 },
            board: Arc::new(board),
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    pub fn zone(&self) -> ReportZone {
        self.zone
    }

    pub fn board_at(&self, now: DateTime<Utc>) -> LiveBoard {
        let snapshot = self.store.snapshot();
        match self.zone {
            ReportZone::Local => LiveBoard::build(&snapshot, now, &Local),
            ReportZone::Fixed(offset) => LiveBoard::build(&snapshot, now, &offset),
        }
    }

    /// Last board published by the ticker. Empty until the ticker first runs.
    pub fn board(&self) -> LiveBoard {
        self.board.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveBoard> {
        self.board.subscribe()
    }

    pub async fn spawn_ticker(&self, cancel: CancellationToken) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let controller = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(controller.tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut changes = controller.store.subscribe();
            let mut ticks: u32 = 0;

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = cancel.cancelled() => {
                        log_info!("live board ticker shutting down");
                        break;
                    }
                }

                let board = controller.board_at(crate::now());
                ticks = ticks.wrapping_add(1);
                if ticks % controller.heartbeat_every_ticks == 0 {
                    log_debug!(
                        "Live board: {} open sessions, {} mechanics on today's board",
                        board.open_sessions.len(),
                        board.today.len()
                    );
                }
                controller.board.send_replace(board);
            }
        });

        *ticker_guard = Some(handle);
    }

    pub async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}
