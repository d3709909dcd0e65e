use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::WorkSession,
    reports::{mechanic_time, time_rollup as rollup, MechanicTime, TimeWindow},
    settings::ReportZone,
    store::{
        resolve_actor, resolve_admin, resolve_mechanic, Action, Actor, Confirmation,
        WorkshopSnapshot,
    },
    timer::{session_duration_ms, LiveBoard},
    AppState,
};

/// Reply to every shift transition. `applied` is false when the transition
/// did not apply (no open shift, already paused, ...).
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShiftView {
    pub applied: bool,
    pub session: Option<WorkSession>,
    pub elapsed_ms: u64,
}

fn shift_view(state: &AppState, session_id: Option<&str>, applied: bool, now: DateTime<Utc>) -> ShiftView {
    let snapshot = state.store.snapshot();
    let session = session_id.and_then(|id| snapshot.sessions.get(id)).cloned();
    ShiftView {
        applied,
        elapsed_ms: session
            .as_ref()
            .map(|session| session_duration_ms(session, now))
            .unwrap_or(0),
        session,
    }
}

fn open_session_id(state: &AppState, mechanic_id: &str) -> Option<String> {
    state
        .store
        .snapshot()
        .sessions
        .open_for(mechanic_id)
        .map(|session| session.id.clone())
}

/// Runs a transition on `mechanic`'s shift and reports where it ended up.
fn transition(state: &AppState, mechanic: &Actor, action: Action) -> ShiftView {
    let now = crate::now();
    let before = open_session_id(state, &mechanic.id);
    let applied = state.dispatch_at(&action, now).is_some();
    let target = open_session_id(state, &mechanic.id).or(before);
    shift_view(state, target.as_deref(), applied, now)
}

fn start_action(mechanic: &Actor) -> Action {
    Action::StartSession {
        session_id: Uuid::new_v4().to_string(),
        mechanic_id: mechanic.id.clone(),
        mechanic_name: mechanic.name.clone(),
    }
}

fn actor(state: &AppState, actor_id: &str) -> Result<Actor, String> {
    resolve_actor(&state.store.snapshot(), actor_id).map_err(|e| e.to_string())
}

fn admin_and_target(state: &AppState, actor_id: &str, mechanic_id: &str) -> Result<Actor, String> {
    let snapshot = state.store.snapshot();
    resolve_admin(&snapshot, actor_id).map_err(|e| e.to_string())?;
    resolve_mechanic(&snapshot, mechanic_id).map_err(|e| e.to_string())
}

// Self-service: the actor drives their own shift.

pub fn start_shift(state: &AppState, actor_id: &str) -> Result<ShiftView, String> {
    let me = actor(state, actor_id)?;
    Ok(transition(state, &me, start_action(&me)))
}

pub fn pause_shift(state: &AppState, actor_id: &str) -> Result<ShiftView, String> {
    let me = actor(state, actor_id)?;
    let action = Action::PauseSession { mechanic_id: me.id.clone() };
    Ok(transition(state, &me, action))
}

pub fn resume_shift(state: &AppState, actor_id: &str) -> Result<ShiftView, String> {
    let me = actor(state, actor_id)?;
    let action = Action::ResumeSession { mechanic_id: me.id.clone() };
    Ok(transition(state, &me, action))
}

pub fn end_shift(state: &AppState, actor_id: &str) -> Result<ShiftView, String> {
    let me = actor(state, actor_id)?;
    let action = Action::StopSession { mechanic_id: me.id.clone() };
    Ok(transition(state, &me, action))
}

// Administrative: owners and managers drive anyone's shift.

pub fn remote_start(state: &AppState, actor_id: &str, mechanic_id: &str) -> Result<ShiftView, String> {
    let mechanic = admin_and_target(state, actor_id, mechanic_id)?;
    Ok(transition(state, &mechanic, start_action(&mechanic)))
}

pub fn remote_pause(state: &AppState, actor_id: &str, mechanic_id: &str) -> Result<ShiftView, String> {
    let mechanic = admin_and_target(state, actor_id, mechanic_id)?;
    let action = Action::PauseSession { mechanic_id: mechanic.id.clone() };
    Ok(transition(state, &mechanic, action))
}

pub fn remote_resume(state: &AppState, actor_id: &str, mechanic_id: &str) -> Result<ShiftView, String> {
    let mechanic = admin_and_target(state, actor_id, mechanic_id)?;
    let action = Action::ResumeSession { mechanic_id: mechanic.id.clone() };
    Ok(transition(state, &mechanic, action))
}

pub fn remote_stop(state: &AppState, actor_id: &str, mechanic_id: &str) -> Result<ShiftView, String> {
    let mechanic = admin_and_target(state, actor_id, mechanic_id)?;
    let action = Action::StopSession { mechanic_id: mechanic.id.clone() };
    Ok(transition(state, &mechanic, action))
}

pub fn force_finalize(
    state: &AppState,
    actor_id: &str,
    mechanic_id: &str,
    confirmed: bool,
) -> Result<ShiftView, String> {
    let mechanic = admin_and_target(state, actor_id, mechanic_id)?;
    let action = Action::ForceFinalize {
        mechanic_id: mechanic.id.clone(),
        confirmation: Confirmation::from(confirmed),
    };
    Ok(transition(state, &mechanic, action))
}

/// Deletes session records outright. Returns how many were removed.
pub fn delete_sessions(
    state: &AppState,
    actor_id: &str,
    session_ids: Vec<String>,
    confirmed: bool,
) -> Result<usize, String> {
    resolve_admin(&state.store.snapshot(), actor_id).map_err(|e| e.to_string())?;

    let action = Action::DeleteSessions {
        session_ids,
        confirmation: Confirmation::from(confirmed),
    };
    // Count against the snapshot the reducer actually saw; a poll may have
    // replaced it since the admin check above.
    Ok(match state.dispatch_change(&action) {
        Some((previous, next)) => previous.sessions.len().saturating_sub(next.sessions.len()),
        None => 0,
    })
}

/// The board the ticker last published.
pub fn live_board(state: &AppState, actor_id: &str) -> Result<LiveBoard, String> {
    resolve_admin(&state.store.snapshot(), actor_id).map_err(|e| e.to_string())?;
    Ok(state.timer.board())
}

fn rollup_rows<Tz: TimeZone>(
    snapshot: &WorkshopSnapshot,
    target: Option<String>,
    window: TimeWindow,
    now: DateTime<Utc>,
    zone: &Tz,
) -> Vec<MechanicTime> {
    match target {
        Some(mechanic_id) => {
            let mut row = mechanic_time(snapshot.sessions.iter(), &mechanic_id, window, now, zone);
            if row.mechanic_name.is_empty() {
                if let Some(user) = snapshot.user(&mechanic_id) {
                    row.mechanic_name = user.name.clone();
                }
            }
            vec![row]
        }
        None => rollup(snapshot.sessions.iter(), window, now, zone),
    }
}

/// Mechanics see only their own figure; administrators see the whole ranking
/// or, with `mechanic_id`, one row.
pub fn time_rollup(
    state: &AppState,
    actor_id: &str,
    window: TimeWindow,
    mechanic_id: Option<String>,
) -> Result<Vec<MechanicTime>, String> {
    let snapshot = state.store.snapshot();
    let me = resolve_actor(&snapshot, actor_id).map_err(|e| e.to_string())?;
    let now = crate::now();

    let target = if me.role.can_administer() {
        mechanic_id
    } else {
        Some(me.id.clone())
    };

    // The zone itself, not its offset at `now`: midnight may sit on the
    // other side of a DST change.
    Ok(match state.timer.zone() {
        ReportZone::Local => rollup_rows(&snapshot, target, window, now, &Local),
        ReportZone::Fixed(offset) => rollup_rows(&snapshot, target, window, now, &offset),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Role, SessionStatus, User},
        test_support::{state_with_users, SpringForward},
    };
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn staff() -> Vec<User> {
        vec![
            User {
                id: "boss".into(),
                name: "Benny".into(),
                role: Role::Owner,
                pending_tax: 0.0,
            },
            User {
                id: "m1".into(),
                name: "Rico".into(),
                role: Role::Mechanic,
                pending_tax: 0.0,
            },
            User {
                id: "m2".into(),
                name: "Sal".into(),
                role: Role::Mechanic,
                pending_tax: 0.0,
            },
        ]
    }

    #[tokio::test]
    async fn mechanic_walks_through_own_shift() {
        let (state, _memory) = state_with_users(staff());

        let started = start_shift(&state, "m1").unwrap();
        assert!(started.applied);
        let session_id = started.session.as_ref().unwrap().id.clone();

        let paused = pause_shift(&state, "m1").unwrap();
        assert!(paused.applied);
        assert_eq!(paused.session.as_ref().unwrap().status, SessionStatus::Paused);

        assert!(!pause_shift(&state, "m1").unwrap().applied);
        assert!(resume_shift(&state, "m1").unwrap().applied);

        let ended = end_shift(&state, "m1").unwrap();
        assert!(ended.applied);
        let session = ended.session.unwrap();
        assert_eq!(session.id, session_id);
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(session.end_time.is_some());
    }

    #[tokio::test]
    async fn second_start_is_a_no_op() {
        let (state, _memory) = state_with_users(staff());
        let first = start_shift(&state, "m1").unwrap();
        let second = start_shift(&state, "m1").unwrap();

        assert!(!second.applied);
        assert_eq!(second.session.unwrap().id, first.session.unwrap().id);
        assert_eq!(state.store.snapshot().sessions.len(), 1);
    }

    #[tokio::test]
    async fn transitions_without_a_shift_are_silent() {
        let (state, _memory) = state_with_users(staff());
        let view = end_shift(&state, "m1").unwrap();
        assert!(!view.applied);
        assert!(view.session.is_none());
        assert_eq!(view.elapsed_ms, 0);
    }

    #[tokio::test]
    async fn unknown_actor_is_an_error() {
        let (state, _memory) = state_with_users(staff());
        assert!(start_shift(&state, "ghost").is_err());
    }

    #[tokio::test]
    async fn mechanics_cannot_use_remote_controls() {
        let (state, _memory) = state_with_users(staff());
        start_shift(&state, "m2").unwrap();

        let err = remote_stop(&state, "m1", "m2").unwrap_err();
        assert_eq!(err, "not permitted");
        assert!(state.store.snapshot().sessions.open_for("m2").is_some());
    }

    #[tokio::test]
    async fn owner_remote_controls_a_mechanic() {
        let (state, _memory) = state_with_users(staff());

        let started = remote_start(&state, "boss", "m2").unwrap();
        assert!(started.applied);
        assert_eq!(started.session.as_ref().unwrap().mechanic_name, "Sal");

        assert!(remote_pause(&state, "boss", "m2").unwrap().applied);
        assert!(remote_resume(&state, "boss", "m2").unwrap().applied);
        let stopped = remote_stop(&state, "boss", "m2").unwrap();
        assert_eq!(stopped.session.unwrap().status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn force_finalize_needs_confirmation() {
        let (state, _memory) = state_with_users(staff());
        start_shift(&state, "m1").unwrap();
        pause_shift(&state, "m1").unwrap();

        let declined = force_finalize(&state, "boss", "m1", false).unwrap();
        assert!(!declined.applied);
        assert!(state.store.snapshot().sessions.open_for("m1").is_some());

        let forced = force_finalize(&state, "boss", "m1", true).unwrap();
        assert!(forced.applied);
        let session = forced.session.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert!(session.pauses.iter().all(|pause| pause.end.is_some()));
    }

    #[tokio::test]
    async fn delete_reports_removed_count() {
        let (state, _memory) = state_with_users(staff());
        let first = start_shift(&state, "m1").unwrap().session.unwrap().id;
        end_shift(&state, "m1").unwrap();
        let second = start_shift(&state, "m2").unwrap().session.unwrap().id;

        let ids = vec![first, second, "missing".to_string()];
        assert_eq!(delete_sessions(&state, "boss", ids.clone(), false).unwrap(), 0);
        assert_eq!(delete_sessions(&state, "boss", ids, true).unwrap(), 2);
        assert!(state.store.snapshot().sessions.is_empty());
    }

    #[tokio::test]
    async fn mechanic_rollup_is_scoped_to_self() {
        let (state, _memory) = state_with_users(staff());
        start_shift(&state, "m1").unwrap();
        start_shift(&state, "m2").unwrap();

        let own = time_rollup(&state, "m1", TimeWindow::Weekly, Some("m2".into())).unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].mechanic_id, "m1");
        assert_eq!(own[0].session_count, 1);

        let all = time_rollup(&state, "boss", TimeWindow::Weekly, None).unwrap();
        assert_eq!(all.len(), 2);

        let idle = time_rollup(&state, "boss", TimeWindow::Daily, Some("boss".into())).unwrap();
        assert_eq!(idle[0].mechanic_name, "Benny");
        assert_eq!(idle[0].total_ms, 0);
    }

    #[tokio::test]
    async fn delete_counts_against_the_state_it_reduced() {
        let (state, _memory) = state_with_users(staff());
        let local = start_shift(&state, "m1").unwrap().session.unwrap().id;

        // A poll lands a larger remote history before the delete runs.
        let mut remote = state.store.snapshot().as_ref().clone();
        for (id, mechanic) in [("r1", "m2"), ("r2", "boss")] {
            remote = crate::store::reduce(
                &remote,
                &Action::StartSession {
                    session_id: id.into(),
                    mechanic_id: mechanic.into(),
                    mechanic_name: mechanic.into(),
                },
                crate::now(),
            )
            .unwrap();
        }
        assert!(state.store.replace(remote));

        assert_eq!(delete_sessions(&state, "boss", vec![local], true).unwrap(), 1);
        assert_eq!(state.store.snapshot().sessions.len(), 2);
    }

    #[test]
    fn daily_rows_use_zone_rules_not_current_offset() {
        // Started 23:30 local on Mar 30, the night clocks went forward.
        let late = WorkSession::begin(
            "late".into(),
            "m1".into(),
            "Rico".into(),
            Utc.with_ymd_and_hms(2024, 3, 30, 22, 30, 0).unwrap(),
        );
        let snapshot = WorkshopSnapshot::default()
            .with_users(staff())
            .with_sessions(vec![late].into());
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 8, 0, 0).unwrap();

        assert!(rollup_rows(&snapshot, None, TimeWindow::Daily, now, &SpringForward).is_empty());
        let own = rollup_rows(&snapshot, Some("m1".into()), TimeWindow::Daily, now, &SpringForward);
        assert_eq!(own[0].total_ms, 0);
        assert_eq!(own[0].mechanic_name, "Rico");

        let weekly = rollup_rows(&snapshot, None, TimeWindow::Weekly, now, &SpringForward);
        assert_eq!(weekly[0].session_count, 1);
    }

    #[tokio::test]
    async fn live_board_is_admin_only() {
        let (state, _memory) = state_with_users(staff());
        let mut boards = state.timer.subscribe();
        let cancel = CancellationToken::new();
        state.timer.spawn_ticker(cancel.clone()).await;
        start_shift(&state, "m1").unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while state.timer.board().open_sessions.is_empty() {
                boards.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        assert!(live_board(&state, "m1").is_err());
        assert_eq!(live_board(&state, "boss").unwrap().open_sessions.len(), 1);

        cancel.cancel();
        state.timer.cancel_ticker().await;
    }
}
