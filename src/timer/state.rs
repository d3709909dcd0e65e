use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::models::{Pause, SessionStatus, WorkSession};

impl WorkSession {
    pub fn begin(
        id: String,
        mechanic_id: String,
        mechanic_name: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            mechanic_id,
            mechanic_name,
            start_time: now,
            end_time: None,
            pauses: Vec::new(),
            status: SessionStatus::Active,
        }
    }

    /// `active -> paused`. Any other state is left untouched.
    pub fn paused_at(&self, now: DateTime<Utc>) -> Option<Self> {
        if self.status != SessionStatus::Active || self.open_pause().is_some() {
            return None;
        }
        let mut next = self.clone();
        next.pauses.push(Pause::open(now));
        next.status = SessionStatus::Paused;
        Some(next)
    }

    /// `paused -> active`, closing the open pause.
    pub fn resumed_at(&self, now: DateTime<Utc>) -> Option<Self> {
        if self.status != SessionStatus::Paused {
            return None;
        }
        let mut next = self.clone();
        next.close_open_pause(now);
        next.status = SessionStatus::Active;
        Some(next)
    }

    /// `active | paused -> completed`. `end_time` is written here and nowhere else.
    pub fn finished_at(&self, now: DateTime<Utc>) -> Option<Self> {
        if !self.is_open() {
            return None;
        }
        let mut next = self.clone();
        next.close_open_pause(now);
        next.end_time = Some(now);
        next.status = SessionStatus::Completed;
        Some(next)
    }

    fn close_open_pause(&mut self, now: DateTime<Utc>) {
        if let Some(pause) = self.pauses.last_mut().filter(|pause| pause.is_open()) {
            pause.end = Some(now);
        }
    }
}

/// All shifts of one workshop, split into at most one open shift per mechanic
/// and the completed history.
///
/// Serialized as the flat list the document store expects, ordered by start time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<WorkSession>", into = "Vec<WorkSession>")]
pub struct SessionBook {
    open: BTreeMap<String, WorkSession>,
    closed: Vec<WorkSession>,
}

impl SessionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_for(&self, mechanic_id: &str) -> Option<&WorkSession> {
        self.open.get(mechanic_id)
    }

    pub fn open_sessions(&self) -> impl Iterator<Item = &WorkSession> {
        self.open.values()
    }

    pub fn closed_sessions(&self) -> &[WorkSession] {
        &self.closed
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkSession> {
        self.closed.iter().chain(self.open.values())
    }

    pub fn len(&self) -> usize {
        self.open.len() + self.closed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, session_id: &str) -> Option<&WorkSession> {
        self.iter().find(|session| session.id == session_id)
    }

    /// Opens a shift for a mechanic who has none.
    pub fn start(&self, session: WorkSession) -> Option<Self> {
        if !session.is_open() || self.open.contains_key(&session.mechanic_id) {
            return None;
        }
        let mut next = self.clone();
        next.open.insert(session.mechanic_id.clone(), session);
        Some(next)
    }

    pub fn pause(&self, mechanic_id: &str, now: DateTime<Utc>) -> Option<Self> {
        self.replace_open(mechanic_id, |session| session.paused_at(now))
    }

    pub fn resume(&self, mechanic_id: &str, now: DateTime<Utc>) -> Option<Self> {
        self.replace_open(mechanic_id, |session| session.resumed_at(now))
    }

    /// Stops the mechanic's open shift and moves it to the history.
    pub fn finish(&self, mechanic_id: &str, now: DateTime<Utc>) -> Option<Self> {
        let finished = self.open.get(mechanic_id)?.finished_at(now)?;
        let mut next = self.clone();
        next.open.remove(mechanic_id);
        next.closed.push(finished);
        Some(next)
    }

    /// Removes every listed session, open or closed. Unknown ids are ignored.
    pub fn delete(&self, session_ids: &[String]) -> Option<Self> {
        let doomed = |session: &WorkSession| session_ids.iter().any(|id| *id == session.id);
        if !self.iter().any(doomed) {
            return None;
        }
        let mut next = self.clone();
        next.open.retain(|_, session| !doomed(session));
        next.closed.retain(|session| !doomed(session));
        Some(next)
    }

    fn replace_open<F>(&self, mechanic_id: &str, transition: F) -> Option<Self>
    where
        F: FnOnce(&WorkSession) -> Option<WorkSession>,
    {
        let updated = transition(self.open.get(mechanic_id)?)?;
        let mut next = self.clone();
        next.open.insert(mechanic_id.to_string(), updated);
        Some(next)
    }
}

impl From<Vec<WorkSession>> for SessionBook {
    fn from(mut sessions: Vec<WorkSession>) -> Self {
        sessions.sort_by_key(|session| session.start_time);

        let mut book = SessionBook::new();
        for session in sessions {
            if !session.is_open() {
                book.closed.push(session);
                continue;
            }

            // Newer open shift wins; the older one is closed where the newer began.
            if let Some(mut older) = book.open.remove(&session.mechanic_id) {
                warn!(
                    "Mechanic {} has more than one open session; closing {} at start of {}",
                    session.mechanic_id, older.id, session.id
                );
                let cutoff = session.start_time.max(older.start_time);
                // A break opened after the cutoff collapses onto it.
                if let Some(pause) = older.pauses.last_mut().filter(|pause| pause.is_open()) {
                    pause.start = pause.start.min(cutoff);
                }
                if let Some(closed) = older.finished_at(cutoff) {
                    book.closed.push(closed);
                }
            }
            book.open.insert(session.mechanic_id.clone(), session);
        }
        book
    }
}

impl From<SessionBook> for Vec<WorkSession> {
    fn from(book: SessionBook) -> Self {
        let SessionBook { open, mut closed } = book;
        closed.extend(open.into_values());
        closed.sort_by_key(|session| session.start_time);
        closed
    }
}
