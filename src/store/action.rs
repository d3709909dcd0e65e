use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    ledger::{self, Settler},
    models::{ServiceRecord, SettingsUpdate, WorkSession},
};

use super::WorkshopSnapshot;

/// Operator answer to a "are you sure?" prompt on a destructive action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Confirmation {
    Granted,
    Declined,
}

impl Confirmation {
    pub fn is_granted(&self) -> bool {
        matches!(self, Confirmation::Granted)
    }
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Granted
        } else {
            Confirmation::Declined
        }
    }
}

/// Every mutation the workshop state accepts. Ids for new records are chosen by
/// the caller so that `reduce` stays deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Action {
    StartSession {
        session_id: String,
        mechanic_id: String,
        mechanic_name: String,
    },
    PauseSession {
        mechanic_id: String,
    },
    ResumeSession {
        mechanic_id: String,
    },
    StopSession {
        mechanic_id: String,
    },
    ForceFinalize {
        mechanic_id: String,
        confirmation: Confirmation,
    },
    DeleteSessions {
        session_ids: Vec<String>,
        confirmation: Confirmation,
    },
    RecordService {
        record: ServiceRecord,
    },
    Settle {
        settlement_id: String,
        mechanic_id: String,
        settled_by_id: String,
        settled_by_name: String,
        confirmation: Confirmation,
    },
    UpdateSettings {
        update: SettingsUpdate,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::StartSession { .. } => "startSession",
            Action::PauseSession { .. } => "pauseSession",
            Action::ResumeSession { .. } => "resumeSession",
            Action::StopSession { .. } => "stopSession",
            Action::ForceFinalize { .. } => "forceFinalize",
            Action::DeleteSessions { .. } => "deleteSessions",
            Action::RecordService { .. } => "recordService",
            Action::Settle { .. } => "settle",
            Action::UpdateSettings { .. } => "updateSettings",
        }
    }
}

/// Applies `action` to `state` at instant `now`.
///
/// Returns the next snapshot, or `None` when the action does not apply
/// (no qualifying session, declined confirmation, zero balance, ...).
pub fn reduce(
    state: &WorkshopSnapshot,
    action: &Action,
    now: DateTime<Utc>,
) -> Option<WorkshopSnapshot> {
    match action {
        Action::StartSession {
            session_id,
            mechanic_id,
            mechanic_name,
        } => {
            let session = WorkSession::begin(
                session_id.clone(),
                mechanic_id.clone(),
                mechanic_name.clone(),
                now,
            );
            let sessions = state.sessions.start(session)?;
            Some(state.with_sessions(sessions))
        }
        Action::PauseSession { mechanic_id } => state
            .sessions
            .pause(mechanic_id, now)
            .map(|sessions| state.with_sessions(sessions)),
        Action::ResumeSession { mechanic_id } => state
            .sessions
            .resume(mechanic_id, now)
            .map(|sessions| state.with_sessions(sessions)),
        Action::StopSession { mechanic_id } => state
            .sessions
            .finish(mechanic_id, now)
            .map(|sessions| state.with_sessions(sessions)),
        Action::ForceFinalize {
            mechanic_id,
            confirmation,
        } => {
            if !confirmation.is_granted() {
                debug!("Force-finalize for {mechanic_id} declined");
                return None;
            }
            let sessions = state.sessions.finish(mechanic_id, now)?;
            Some(state.with_sessions(sessions))
        }
        Action::DeleteSessions {
            session_ids,
            confirmation,
        } => {
            if !confirmation.is_granted() {
                debug!("Deletion of {} sessions declined", session_ids.len());
                return None;
            }
            let sessions = state.sessions.delete(session_ids)?;
            Some(state.with_sessions(sessions))
        }
        Action::RecordService { record } => record_service(state, record),
        Action::Settle {
            settlement_id,
            mechanic_id,
            settled_by_id,
            settled_by_name,
            confirmation,
        } => {
            if !confirmation.is_granted() {
                debug!("Settlement for {mechanic_id} declined");
                return None;
            }
            let settler = Settler {
                id: settled_by_id,
                name: settled_by_name,
            };
            let (users, settlements) = ledger::settle(
                &state.users,
                &state.settlements,
                mechanic_id,
                settlement_id.clone(),
                &settler,
                now,
            )?;
            Some(state.with_users(users).with_settlements(settlements))
        }
        Action::UpdateSettings { update } => {
            if let Err(err) = update.validate() {
                warn!("Rejected settings update: {err}");
                return None;
            }
            update
                .apply(&state.workshop)
                .map(|workshop| state.with_workshop(workshop))
        }
    }
}

fn record_service(state: &WorkshopSnapshot, record: &ServiceRecord) -> Option<WorkshopSnapshot> {
    if state.services.iter().any(|existing| existing.id == record.id) {
        debug!("Service {} already recorded", record.id);
        return None;
    }

    let mut services = state.services.as_ref().clone();
    services.push(record.clone());
    let next = state.with_services(services);

    match ledger::accrue(&next.users, &record.mechanic_id, record.tax) {
        Some(users) => Some(next.with_users(users)),
        None => {
            if next.user(&record.mechanic_id).is_none() {
                warn!(
                    "Service {} performed by unknown mechanic {}; no tax accrued",
                    record.id, record.mechanic_id
                );
            }
            Some(next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, SessionStatus, User};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn workshop() -> WorkshopSnapshot {
        WorkshopSnapshot::default().with_users(vec![
            User {
                id: "boss".into(),
                name: "Boss".into(),
                role: Role::Owner,
                pending_tax: 0.0,
            },
            User {
                id: "a".into(),
                name: "Rico".into(),
                role: Role::Mechanic,
                pending_tax: 1_500.0,
            },
        ])
    }

    fn start(mechanic: &str) -> Action {
        Action::StartSession {
            session_id: format!("{mechanic}-shift"),
            mechanic_id: mechanic.into(),
            mechanic_name: mechanic.into(),
        }
    }

    fn service(id: &str, tax: f64) -> ServiceRecord {
        ServiceRecord {
            id: id.into(),
            mechanic_id: "a".into(),
            mechanic_name: "Rico".into(),
            customer: String::new(),
            items: Vec::new(),
            labor: 0.0,
            discount_percent: 0.0,
            tax,
            final_price: tax * 10.0,
            created_at: at(0),
        }
    }

    fn settle(confirmation: Confirmation) -> Action {
        Action::Settle {
            settlement_id: "st1".into(),
            mechanic_id: "a".into(),
            settled_by_id: "boss".into(),
            settled_by_name: "Boss".into(),
            confirmation,
        }
    }

    #[test]
    fn session_actions_drive_the_book() {
        let state = reduce(&workshop(), &start("a"), at(0)).unwrap();
        let state = reduce(&state, &Action::PauseSession { mechanic_id: "a".into() }, at(1_000)).unwrap();
        assert_eq!(state.sessions.open_for("a").unwrap().status, SessionStatus::Paused);

        let state = reduce(&state, &Action::ResumeSession { mechanic_id: "a".into() }, at(4_000)).unwrap();
        let state = reduce(&state, &Action::StopSession { mechanic_id: "a".into() }, at(5_000)).unwrap();
        assert!(state.sessions.open_for("a").is_none());
        assert_eq!(state.sessions.closed_sessions().len(), 1);

        assert!(reduce(&state, &Action::PauseSession { mechanic_id: "a".into() }, at(6_000)).is_none());
    }

    #[test]
    fn declined_confirmations_change_nothing() {
        let state = reduce(&workshop(), &start("a"), at(0)).unwrap();

        let force = Action::ForceFinalize {
            mechanic_id: "a".into(),
            confirmation: Confirmation::Declined,
        };
        assert!(reduce(&state, &force, at(10)).is_none());

        let delete = Action::DeleteSessions {
            session_ids: vec!["a-shift".into()],
            confirmation: Confirmation::Declined,
        };
        assert!(reduce(&state, &delete, at(10)).is_none());
        assert!(reduce(&state, &settle(Confirmation::Declined), at(10)).is_none());

        let delete = Action::DeleteSessions {
            session_ids: vec!["a-shift".into()],
            confirmation: Confirmation::Granted,
        };
        assert!(reduce(&state, &delete, at(10)).unwrap().sessions.is_empty());
    }

    #[test]
    fn service_accrues_and_settlement_archives() {
        let state = reduce(
            &workshop(),
            &Action::RecordService { record: service("svc1", 300.0) },
            at(10),
        )
        .unwrap();
        assert_eq!(state.user("a").unwrap().pending_tax, 1_800.0);
        assert_eq!(state.services.len(), 1);

        // Same record twice is ignored.
        assert!(reduce(&state, &Action::RecordService { record: service("svc1", 300.0) }, at(11)).is_none());

        let settled = reduce(&state, &settle(Confirmation::Granted), at(20)).unwrap();
        assert_eq!(settled.user("a").unwrap().pending_tax, 0.0);
        assert_eq!(settled.settlements.len(), 1);
        assert_eq!(settled.settlements.entries()[0].amount, 1_800.0);
        assert!(Arc::ptr_eq(&state.sessions, &settled.sessions));

        assert!(reduce(&settled, &settle(Confirmation::Granted), at(30)).is_none());
    }

    #[test]
    fn service_by_unknown_mechanic_is_kept_without_accrual() {
        let mut record = service("svc9", 50.0);
        record.mechanic_id = "ghost".into();
        let state = reduce(&workshop(), &Action::RecordService { record }, at(0)).unwrap();
        assert_eq!(state.services.len(), 1);
        assert_eq!(state.users, workshop().users);
    }

    #[test]
    fn settings_updates_are_validated() {
        let bad = Action::UpdateSettings { update: SettingsUpdate::TaxRate(-1.0) };
        assert!(reduce(&workshop(), &bad, at(0)).is_none());

        let good = Action::UpdateSettings { update: SettingsUpdate::TaxRate(15.0) };
        let state = reduce(&workshop(), &good, at(0)).unwrap();
        assert_eq!(state.workshop.settings.tax_rate_percent, 15.0);
    }

    #[test]
    fn actions_round_trip_as_tagged_json() {
        let json = serde_json::to_value(settle(Confirmation::Granted)).unwrap();
        assert_eq!(json["type"], "settle");
        assert_eq!(json["settledById"], "boss");
        assert_eq!(json["confirmation"], "granted");
    }
}
