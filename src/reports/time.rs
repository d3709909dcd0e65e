use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{models::WorkSession, timer::session_duration_ms};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// Since local midnight today.
    Daily,
    /// Trailing 7×24h ending now.
    Weekly,
    /// Trailing 30×24h ending now.
    Monthly,
}

impl TimeWindow {
    /// First instant included in the window, evaluated in `zone` for the daily cut.
    pub fn start<Tz: TimeZone>(&self, now: DateTime<Utc>, zone: &Tz) -> DateTime<Utc> {
        match self {
            TimeWindow::Daily => local_midnight(now, zone),
            TimeWindow::Weekly => now - Duration::days(7),
            TimeWindow::Monthly => now - Duration::days(30),
        }
    }
}

fn local_midnight<Tz: TimeZone>(now: DateTime<Utc>, zone: &Tz) -> DateTime<Utc> {
    let local_day = now.with_timezone(zone).date_naive();
    let midnight = local_day.and_time(NaiveTime::MIN);
    zone.from_local_datetime(&midnight)
        .earliest()
        .map(|start| start.with_timezone(&Utc))
        // Midnight skipped by a DST jump; fall back to a plain 24h window.
        .unwrap_or_else(|| now - Duration::days(1))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MechanicTime {
    pub mechanic_id: String,
    pub mechanic_name: String,
    pub total_ms: u64,
    pub session_count: usize,
}

/// Per-mechanic on-duty time for sessions started inside `window`,
/// ranked by total time, longest first.
pub fn time_rollup<'a, Tz, I>(
    sessions: I,
    window: TimeWindow,
    now: DateTime<Utc>,
    zone: &Tz,
) -> Vec<MechanicTime>
where
    Tz: TimeZone,
    I: IntoIterator<Item = &'a WorkSession>,
{
    let since = window.start(now, zone);
    let mut totals: HashMap<&str, MechanicTime> = HashMap::new();

    for session in sessions {
        if session.start_time < since {
            continue;
        }
        let entry = totals
            .entry(session.mechanic_id.as_str())
            .or_insert_with(|| MechanicTime {
                mechanic_id: session.mechanic_id.clone(),
                mechanic_name: session.mechanic_name.clone(),
                total_ms: 0,
                session_count: 0,
            });
        entry.total_ms += session_duration_ms(session, now);
        entry.session_count += 1;
    }

    let mut ranked: Vec<MechanicTime> = totals.into_values().collect();
    ranked.sort_by(|a, b| {
        b.total_ms
            .cmp(&a.total_ms)
            .then_with(|| a.mechanic_name.cmp(&b.mechanic_name))
    });
    ranked
}

/// Rollup restricted to one mechanic; zero totals when nothing falls in the window.
pub fn mechanic_time<'a, Tz, I>(
    sessions: I,
    mechanic_id: &str,
    window: TimeWindow,
    now: DateTime<Utc>,
    zone: &Tz,
) -> MechanicTime
where
    Tz: TimeZone,
    I: IntoIterator<Item = &'a WorkSession>,
{
    let own = sessions
        .into_iter()
        .filter(|session| session.mechanic_id == mechanic_id);
    time_rollup(own, window, now, zone)
        .into_iter()
        .next()
        .unwrap_or_else(|| MechanicTime {
            mechanic_id: mechanic_id.to_string(),
            mechanic_name: String::new(),
            total_ms: 0,
            session_count: 0,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Pause, SessionStatus},
        test_support::SpringForward,
    };
    use chrono::FixedOffset;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn utc(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text).unwrap().with_timezone(&Utc)
    }

    fn active(id: &str, mechanic: &str, start: DateTime<Utc>) -> WorkSession {
        WorkSession::begin(id.into(), mechanic.into(), mechanic.to_uppercase(), start)
    }

    #[test]
    fn daily_window_starts_at_local_midnight() {
        let zone = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = utc("2024-05-10T08:00:00Z"); // 10:00 local
        assert_eq!(TimeWindow::Daily.start(now, &zone), utc("2024-05-09T22:00:00Z"));
        assert_eq!(TimeWindow::Weekly.start(now, &zone), utc("2024-05-03T08:00:00Z"));
        assert_eq!(TimeWindow::Monthly.start(now, &zone), utc("2024-04-10T08:00:00Z"));
    }

    #[test]
    fn daily_window_uses_the_offset_in_force_at_midnight() {
        let now = utc("2024-03-31T08:00:00Z"); // 10:00 local, summer time
        assert_eq!(
            TimeWindow::Daily.start(now, &SpringForward),
            utc("2024-03-30T23:00:00Z")
        );
    }

    #[test]
    fn daily_rollup_excludes_shift_started_yesterday_even_if_still_active() {
        let now = utc("2024-05-10T09:00:00Z");
        let sessions = vec![
            active("late", "m1", utc("2024-05-09T23:30:00Z")),
            active("today", "m2", utc("2024-05-10T08:00:00Z")),
        ];

        let daily = time_rollup(&sessions, TimeWindow::Daily, now, &Utc);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].mechanic_id, "m2");
        assert_eq!(daily[0].total_ms, 3_600_000);

        let weekly = time_rollup(&sessions, TimeWindow::Weekly, now, &Utc);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].mechanic_id, "m1");
    }

    #[test]
    fn sums_and_counts_per_mechanic_ranked_by_time() {
        let base = 1_700_000_000_000;
        let now = at(base + 10_000);

        let mut done = active("a", "m1", at(base));
        done = done.finished_at(at(base + 2_000)).unwrap();
        let running = active("b", "m1", at(base + 4_000));
        let paused = WorkSession {
            pauses: vec![Pause::open(at(base + 1_000))],
            status: SessionStatus::Paused,
            ..active("c", "m2", at(base))
        };

        let sessions = vec![done, running, paused];
        let ranked = time_rollup(&sessions, TimeWindow::Monthly, now, &Utc);
        assert_eq!(ranked[0].mechanic_id, "m1");
        assert_eq!(ranked[0].total_ms, 2_000 + 6_000);
        assert_eq!(ranked[0].session_count, 2);
        assert_eq!(ranked[1].total_ms, 1_000);

        let later = time_rollup(&sessions, TimeWindow::Monthly, at(base + 20_000), &Utc);
        assert_eq!(later[0].total_ms, 2_000 + 16_000);
        assert_eq!(later[1].total_ms, 1_000);

        let own = mechanic_time(&sessions, "m2", TimeWindow::Monthly, now, &Utc);
        assert_eq!(own.session_count, 1);
        let nobody = mechanic_time(&sessions, "m9", TimeWindow::Monthly, now, &Utc);
        assert_eq!(nobody.total_ms, 0);
    }
}
