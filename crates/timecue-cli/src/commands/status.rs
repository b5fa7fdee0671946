use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::{json, Value};
use timecue_core::timetable::parse_time_of_day;
use timecue_core::{resolve, EntryWindow, Resolution};

type Error = Box<dyn std::error::Error>;

pub fn run(config_path: &Path, at: Option<&str>) -> Result<(), Error> {
    let (config, timetable) = super::load(config_path)?;
    let tz = config.tz()?;
    let now = instant(Utc::now().with_timezone(&tz), at)?;

    let resolution = resolve(&now, &timetable, config.notifications.grace_minutes_after_start);
    println!("{}", serde_json::to_string_pretty(&render(&now, &resolution))?);
    Ok(())
}

/// `now`, or `at` (HH:MM) on the same local day.
fn instant(now: DateTime<Tz>, at: Option<&str>) -> Result<DateTime<Tz>, Error> {
    let Some(at) = at else {
        return Ok(now);
    };
    let time = parse_time_of_day(at).map_err(|e| format!("invalid --at '{at}': {e}"))?;
    let local = now.date_naive().and_time(time);
    now.timezone()
        .from_local_datetime(&local)
        .earliest()
        .ok_or_else(|| format!("{at} does not exist on {} in {}", now.date_naive(), now.timezone()).into())
}

fn window(w: &EntryWindow<Tz>) -> Value {
    json!({
        "task": w.entry.task,
        "time": w.entry.time_label(),
        "duration_minutes": w.entry.duration_minutes,
        "notes": w.entry.notes,
        "start": w.start.to_rfc3339(),
        "end": w.end.to_rfc3339(),
    })
}

fn render(now: &DateTime<Tz>, r: &Resolution<Tz>) -> Value {
    json!({
        "now": now.to_rfc3339(),
        "timezone": now.timezone().name(),
        "active": r.active.as_ref().map(window),
        "upcoming": r.upcoming.as_ref().map(window),
        "minutes_until_upcoming": r.minutes_until_upcoming,
        "upcoming_just_started": r.upcoming_just_started,
    })
}
