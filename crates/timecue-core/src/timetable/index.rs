//! Active / upcoming entry resolution.
//!
//! Every entry is anchored to the calendar date of `now` in `now`'s time zone.
//! Windows are half-open `[start, end)`:
//!
//! ```text
//! end = start + duration          if the entry has a non-zero duration
//!     = start of the next entry   otherwise, when one exists
//!     = end of the day            for the last entry (23:59:59 inclusive)
//! ```
//!
//! Resolution is pure; it only reads the timetable.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};

use super::{Timetable, TimetableEntry};

/// An entry anchored to a concrete date.
#[derive(Debug, Clone)]
pub struct EntryWindow<Tz: TimeZone> {
    pub entry: TimetableEntry,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl<Tz: TimeZone> EntryWindow<Tz> {
    pub fn contains(&self, now: &DateTime<Tz>) -> bool {
        self.start <= *now && *now < self.end
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone)]
pub struct Resolution<Tz: TimeZone> {
    pub active: Option<EntryWindow<Tz>>,
    pub upcoming: Option<EntryWindow<Tz>>,
    /// Whole minutes from now to the upcoming start, truncated toward zero.
    /// Negative while inside the grace period. Zero when nothing is upcoming.
    pub minutes_until_upcoming: i64,
    pub upcoming_just_started: bool,
}

/// Anchor a time of day to `date` in `tz`.
///
/// Ambiguous local times (DST fold) take the earlier instant; nonexistent
/// ones (DST gap) yield `None`.
fn anchor<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(time)).earliest()
}

/// Compute the window of every entry for `now`'s date, in timetable order.
pub fn windows<Tz: TimeZone>(now: &DateTime<Tz>, timetable: &Timetable) -> Vec<EntryWindow<Tz>> {
    let tz = now.timezone();
    let date = now.date_naive();

    let starts: Vec<(&TimetableEntry, DateTime<Tz>)> = timetable
        .entries()
        .iter()
        .filter_map(|entry| match anchor(&tz, date, entry.time) {
            Some(start) => Some((entry, start)),
            None => {
                tracing::warn!(
                    task = %entry.task,
                    time = %entry.time_label(),
                    "entry time does not exist on {date} in this time zone, skipping"
                );
                None
            }
        })
        .collect();

    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
    let end_of_day = anchor(&tz, date, last_second)
        .map(|t| t + Duration::seconds(1))
        .unwrap_or_else(|| now.clone() + Duration::days(1));

    starts
        .iter()
        .enumerate()
        .map(|(i, (entry, start))| {
            let end = match entry.explicit_minutes() {
                Some(minutes) => start.clone() + Duration::minutes(i64::from(minutes)),
                None => starts
                    .get(i + 1)
                    .map(|(_, next)| next.clone())
                    .unwrap_or_else(|| end_of_day.clone()),
            };
            EntryWindow {
                entry: (*entry).clone(),
                start: start.clone(),
                end,
            }
        })
        .collect()
}

/// Resolve the active and upcoming entries at `now`.
///
/// The active entry is the first window (in timetable order) containing
/// `now`. The upcoming entry is the first whose start is at or after
/// `now - grace_minutes_after_start`, so a task that began a moment ago is
/// still reported as upcoming with `upcoming_just_started` set.
pub fn resolve<Tz: TimeZone>(
    now: &DateTime<Tz>,
    timetable: &Timetable,
    grace_minutes_after_start: u32,
) -> Resolution<Tz> {
    let windows = windows(now, timetable);
    let grace = Duration::minutes(i64::from(grace_minutes_after_start));

    let active = windows.iter().find(|w| w.contains(now)).cloned();

    let horizon = now.clone() - grace;
    let upcoming = windows.iter().find(|w| w.start >= horizon).cloned();

    let (minutes_until_upcoming, upcoming_just_started) = match &upcoming {
        Some(w) => {
            let until = w.start.clone() - now.clone();
            let since = now.clone() - w.start.clone();
            let just_started = *now >= w.start && since <= grace;
            (until.num_minutes(), just_started)
        }
        None => (0, false),
    };

    tracing::debug!(
        active = active.as_ref().map(|w| w.entry.task.as_str()),
        upcoming = upcoming.as_ref().map(|w| w.entry.task.as_str()),
        minutes_until_upcoming,
        upcoming_just_started,
        "timetable resolved"
    );

    Resolution {
        active,
        upcoming,
        minutes_until_upcoming,
        upcoming_just_started,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, s).unwrap()
    }

    fn day() -> Timetable {
        Timetable::new(vec![
            TimetableEntry::new(t(8, 0), "Wake"),
            TimetableEntry::new(t(9, 0), "Work").with_duration("4h"),
            TimetableEntry::new(t(13, 0), "Sleep"),
        ])
    }

    fn active_task<Tz: TimeZone>(r: &Resolution<Tz>) -> Option<&str> {
        r.active.as_ref().map(|w| w.entry.task.as_str())
    }

    fn upcoming_task<Tz: TimeZone>(r: &Resolution<Tz>) -> Option<&str> {
        r.upcoming.as_ref().map(|w| w.entry.task.as_str())
    }

    #[test]
    fn empty_timetable_resolves_to_nothing() {
        let r = resolve(&at(12, 0, 0), &Timetable::default(), 2);
        assert!(r.active.is_none());
        assert!(r.upcoming.is_none());
        assert_eq!(r.minutes_until_upcoming, 0);
        assert!(!r.upcoming_just_started);
    }

    #[test]
    fn entry_without_duration_runs_until_next_start() {
        let r = resolve(&at(8, 59, 59), &day(), 2);
        assert_eq!(active_task(&r), Some("Wake"));

        let wake = r.active.unwrap();
        assert_eq!(wake.end, at(9, 0, 0));
    }

    #[test]
    fn boundary_belongs_to_the_next_entry() {
        let r = resolve(&at(9, 0, 0), &day(), 2);
        assert_eq!(active_task(&r), Some("Work"));
    }

    #[test]
    fn last_entry_runs_to_end_of_day() {
        let r = resolve(&at(23, 59, 59), &day(), 2);
        assert_eq!(active_task(&r), Some("Sleep"));
        assert_eq!(r.active.unwrap().end, at(23, 59, 59) + Duration::seconds(1));
    }

    #[test]
    fn before_first_entry_nothing_is_active() {
        let r = resolve(&at(7, 30, 0), &day(), 2);
        assert!(r.active.is_none());
        assert_eq!(upcoming_task(&r), Some("Wake"));
        assert_eq!(r.minutes_until_upcoming, 30);
    }

    #[test]
    fn explicit_duration_can_leave_a_gap() {
        let table = Timetable::new(vec![
            TimetableEntry::new(t(9, 0), "Standup").with_duration("15m"),
            TimetableEntry::new(t(10, 0), "Review"),
        ]);
        assert_eq!(active_task(&resolve(&at(9, 14, 59), &table, 2)), Some("Standup"));
        assert!(resolve(&at(9, 15, 0), &table, 2).active.is_none());
        assert!(resolve(&at(9, 45, 0), &table, 2).active.is_none());
    }

    #[test]
    fn overlapping_windows_pick_first_in_order() {
        let table = Timetable::new(vec![
            TimetableEntry::new(t(9, 0), "Deep work").with_duration("3h"),
            TimetableEntry::new(t(10, 0), "Meeting").with_duration("30m"),
        ]);
        let r = resolve(&at(10, 10, 0), &table, 2);
        assert_eq!(active_task(&r), Some("Deep work"));
    }

    #[test]
    fn upcoming_minutes_truncate_toward_zero() {
        let r = resolve(&at(8, 50, 30), &day(), 2);
        assert_eq!(upcoming_task(&r), Some("Work"));
        assert_eq!(r.minutes_until_upcoming, 9);
        assert!(!r.upcoming_just_started);
    }

    #[test]
    fn grace_period_keeps_started_entry_upcoming() {
        let r = resolve(&at(9, 1, 30), &day(), 2);
        assert_eq!(upcoming_task(&r), Some("Work"));
        assert_eq!(r.minutes_until_upcoming, -1);
        assert!(r.upcoming_just_started);

        let r = resolve(&at(9, 2, 0), &day(), 2);
        assert!(r.upcoming_just_started);

        let r = resolve(&at(9, 2, 1), &day(), 2);
        assert_eq!(upcoming_task(&r), Some("Sleep"));
        assert!(!r.upcoming_just_started);
    }

    #[test]
    fn nothing_upcoming_after_last_start() {
        let r = resolve(&at(20, 0, 0), &day(), 2);
        assert!(r.upcoming.is_none());
        assert_eq!(active_task(&r), Some("Sleep"));
    }

    #[test]
    fn windows_follow_now_time_zone() {
        let tz = chrono_tz::Asia::Kolkata;
        let now = tz.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        let r = resolve(&now, &day(), 2);
        assert_eq!(active_task(&r), Some("Work"));
        assert_eq!(r.active.unwrap().start, tz.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap());
    }

    #[test]
    fn dst_gap_entry_is_skipped() {
        // 02:30 does not exist on 2026-03-08 in New York.
        let tz = chrono_tz::America::New_York;
        let table = Timetable::new(vec![
            TimetableEntry::new(t(1, 0), "Night shift"),
            TimetableEntry::new(t(2, 30), "Ghost"),
            TimetableEntry::new(t(6, 0), "Wake"),
        ]);
        let now = tz.with_ymd_and_hms(2026, 3, 8, 4, 0, 0).unwrap();
        let all = windows(&now, &table);
        assert_eq!(all.len(), 2);
        assert_eq!(active_task(&resolve(&now, &table, 2)), Some("Night shift"));
    }

    proptest! {
        #[test]
        fn tiled_day_always_has_active_entry(
            mut starts in proptest::collection::btree_set(1u32..1440, 0..12),
            probe in 0u32..86_400,
        ) {
            starts.insert(0);
            let entries: Vec<_> = starts
                .iter()
                .map(|m| TimetableEntry::new(t(m / 60, m % 60), format!("task-{m}")))
                .collect();
            let table = Timetable::new(entries);

            let now = at(0, 0, 0) + Duration::seconds(i64::from(probe));
            let r = resolve(&now, &table, 2);
            let active = r.active.expect("tiled day must have an active entry");
            prop_assert!(active.start <= now && now < active.end);
        }
    }
}
