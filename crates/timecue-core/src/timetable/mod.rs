//! Daily timetable: loading, ordering and window resolution.
//!
//! A timetable is a JSON array of `{ "time": "HH:MM", "task": ..., "duration": ..., "notes": ... }`
//! objects. Entries are parsed once, sorted by time of day (stable), and never
//! mutated afterwards. Entries with an unparseable `time` are skipped and
//! recorded in [`Timetable::skipped`] so the rest of the day still resolves.

pub mod index;

pub use index::{resolve, windows, EntryWindow, Resolution};

use std::path::Path;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::duration::parse_duration;
use crate::error::TimetableError;

/// Wire shape of one timetable entry as it appears in the JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEntry {
    pub time: String,
    pub task: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A parsed timetable entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    /// Wall-clock start, no date.
    pub time: NaiveTime,
    pub task: String,
    /// Source duration string, kept for display.
    pub duration: Option<String>,
    pub duration_minutes: Option<u32>,
    pub notes: String,
}

impl TimetableEntry {
    pub fn new(time: NaiveTime, task: impl Into<String>) -> Self {
        Self {
            time,
            task: task.into(),
            duration: None,
            duration_minutes: None,
            notes: String::new(),
        }
    }

    /// Set the duration from a compact string like `"1h30m"`.
    pub fn with_duration(mut self, duration: &str) -> Self {
        self.duration_minutes = parse_duration(duration);
        self.duration = Some(duration.to_string());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Case-insensitive match on the "sleep" task name.
    pub fn is_sleep(&self) -> bool {
        self.task.eq_ignore_ascii_case("sleep")
    }

    /// `HH:MM` rendering used in messages.
    pub fn time_label(&self) -> String {
        self.time.format("%H:%M").to_string()
    }

    /// Explicit window length, if any. Zero counts as none.
    pub(crate) fn explicit_minutes(&self) -> Option<u32> {
        self.duration_minutes.filter(|m| *m > 0)
    }
}

impl TryFrom<RawEntry> for TimetableEntry {
    type Error = chrono::ParseError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        let time = parse_time_of_day(&raw.time)?;
        let duration_minutes = raw.duration.as_deref().and_then(parse_duration);
        Ok(Self {
            time,
            task: raw.task,
            duration: raw.duration,
            duration_minutes,
            notes: raw.notes.unwrap_or_default(),
        })
    }
}

/// Parse a 24-hour `HH:MM` string.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
}

/// An entry dropped at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    /// Position in the source file.
    pub index: usize,
    pub time: String,
    pub task: String,
    pub reason: String,
}

/// An ordered daily timetable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Timetable {
    entries: Vec<TimetableEntry>,
    skipped: Vec<SkippedEntry>,
}

impl Timetable {
    /// Build from already-parsed entries, sorting them by time of day.
    pub fn new(mut entries: Vec<TimetableEntry>) -> Self {
        entries.sort_by_key(|e| e.time);
        Self {
            entries,
            skipped: Vec::new(),
        }
    }

    /// Build from wire entries, skipping (and recording) malformed times.
    pub fn from_raw(raw: Vec<RawEntry>) -> Self {
        let mut entries = Vec::with_capacity(raw.len());
        let mut skipped = Vec::new();

        for (index, entry) in raw.into_iter().enumerate() {
            let time = entry.time.clone();
            let task = entry.task.clone();
            match TimetableEntry::try_from(entry) {
                Ok(parsed) => entries.push(parsed),
                Err(e) => {
                    tracing::warn!(index, time = %time, task = %task, "skipping timetable entry: {e}");
                    skipped.push(SkippedEntry {
                        index,
                        time,
                        task,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut table = Self::new(entries);
        table.skipped = skipped;
        table
    }

    /// Parse a JSON array of entries.
    ///
    /// # Errors
    ///
    /// Returns an error only if the document itself is not a list of
    /// entry objects; bad `time` values are skipped instead.
    pub fn from_json(json: &str) -> Result<Self, TimetableError> {
        let raw: Vec<RawEntry> = serde_json::from_str(json)?;
        Ok(Self::from_raw(raw))
    }

    /// Load a timetable file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self, TimetableError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| TimetableError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        let table = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            entries = table.len(),
            skipped = table.skipped.len(),
            "timetable loaded"
        );
        Ok(table)
    }

    /// Entries in time-of-day order.
    pub fn entries(&self) -> &[TimetableEntry] {
        &self.entries
    }

    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
