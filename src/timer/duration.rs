use chrono::{DateTime, Utc};

use crate::models::{SessionStatus, WorkSession};

/// On-duty milliseconds of `session` as seen at `now`.
///
/// Completed sessions ignore `now`. A paused session only counts up to the start
/// of its latest pause, so time spent on the current break never shows as work.
/// Every closed pause is subtracted; the open one is already excluded by the
/// cut-off above and is not subtracted a second time.
pub fn session_duration_ms(session: &WorkSession, now: DateTime<Utc>) -> u64 {
    let counted_until = match session.status {
        SessionStatus::Completed => session.end_time.unwrap_or(session.start_time),
        SessionStatus::Active => now,
        SessionStatus::Paused => session
            .pauses
            .last()
            .map(|pause| pause.start)
            .unwrap_or(now),
    };

    let gross_ms = (counted_until - session.start_time).num_milliseconds();
    let paused_ms: i64 = session.pauses.iter().filter_map(|pause| pause.closed_ms()).sum();

    gross_ms.saturating_sub(paused_ms).max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Pause;
    use chrono::TimeZone;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn session(status: SessionStatus, end: Option<i64>, pauses: &[(i64, Option<i64>)]) -> WorkSession {
        WorkSession {
            id: "s1".into(),
            mechanic_id: "m1".into(),
            mechanic_name: "Rico".into(),
            start_time: at(0),
            end_time: end.map(at),
            pauses: pauses
                .iter()
                .map(|(start, end)| Pause {
                    start: at(*start),
                    end: end.map(at),
                })
                .collect(),
            status,
        }
    }

    #[test]
    fn no_pauses_is_plain_elapsed_time() {
        let active = session(SessionStatus::Active, None, &[]);
        assert_eq!(session_duration_ms(&active, at(7_500)), 7_500);

        let done = session(SessionStatus::Completed, Some(4_000), &[]);
        assert_eq!(session_duration_ms(&done, at(99_000)), 4_000);
    }

    #[test]
    fn completed_session_subtracts_closed_pauses() {
        let done = session(SessionStatus::Completed, Some(5_000), &[(1_000, Some(4_000))]);
        assert_eq!(session_duration_ms(&done, at(1_000_000)), 2_000);
    }

    #[test]
    fn open_pause_freezes_the_clock() {
        let paused = session(SessionStatus::Paused, None, &[(1_000, None)]);
        assert_eq!(session_duration_ms(&paused, at(9_000)), 1_000);
        assert_eq!(session_duration_ms(&paused, at(90_000)), 1_000);
    }

    #[test]
    fn earlier_closed_pauses_still_count_while_paused_again() {
        let paused = session(
            SessionStatus::Paused,
            None,
            &[(1_000, Some(2_000)), (5_000, None)],
        );
        assert_eq!(session_duration_ms(&paused, at(60_000)), 4_000);
    }

    #[test]
    fn active_session_with_history_of_pauses() {
        let active = session(
            SessionStatus::Active,
            None,
            &[(1_000, Some(2_000)), (3_000, Some(3_500))],
        );
        assert_eq!(session_duration_ms(&active, at(10_000)), 8_500);
    }

    #[test]
    fn clock_skew_clamps_to_zero() {
        let active = session(SessionStatus::Active, None, &[]);
        assert_eq!(session_duration_ms(&active, at(-5_000)), 0);

        let malformed = session(SessionStatus::Completed, Some(1_000), &[(0, Some(5_000))]);
        assert_eq!(session_duration_ms(&malformed, at(0)), 0);
    }

    #[test]
    fn repeated_calls_agree() {
        let paused = session(SessionStatus::Paused, None, &[(1_000, Some(1_500)), (3_000, None)]);
        let first = session_duration_ms(&paused, at(12_345));
        let second = session_duration_ms(&paused, at(12_345));
        assert_eq!(first, second);
    }
}
