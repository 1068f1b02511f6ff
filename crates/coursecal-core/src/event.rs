//! Event types for scheduled sessions.
//!
//! This module provides the canonical in-memory event shape shared by the
//! expander, the validator and the exception manager:
//! - [`Event`]: a single session, a recurring series, or an exception split
//!   out of a series
//! - [`Recurrence`]: the weekly rule attached to a series
//! - [`SessionDuration`]: the length of every occurrence of a series
//! - [`Occurrence`]: one concrete instance produced by expansion
//! - [`EventPatch`]: partial overrides applied when editing
//!
//! Field names serialize in camelCase so the shape round-trips through the
//! persistence layer's JSON unchanged.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};
use crate::time::{TimeWindow, midnight, next_midnight_at_or_after, saturating_add};

/// How often a series repeats. Only weekly series are supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Weekly,
}

/// The length of each occurrence of a recurring series.
///
/// Only the first occurrence's `start` is stored on a series, so every
/// occurrence's end is derived as `start + duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionDuration {
    #[serde(default)]
    pub hours: i64,
    #[serde(default)]
    pub minutes: i64,
}

impl SessionDuration {
    /// Creates a new duration.
    pub fn new(hours: i64, minutes: i64) -> Self {
        Self { hours, minutes }
    }

    /// The fallback used when a series carries no duration.
    pub fn one_hour() -> Self {
        Self::new(1, 0)
    }

    /// Splits a chrono duration into whole hours and leftover minutes.
    pub fn from_duration(duration: Duration) -> Self {
        let total = duration.num_minutes();
        Self::new(total / 60, total % 60)
    }

    /// Converts to a chrono duration, or `None` if it does not fit.
    pub fn checked_duration(self) -> Option<Duration> {
        Duration::try_hours(self.hours)?.checked_add(&Duration::try_minutes(self.minutes)?)
    }

    /// Converts to a chrono duration, saturating when out of range.
    pub fn to_duration(self) -> Duration {
        self.checked_duration().unwrap_or(if self.hours < 0 || self.minutes < 0 {
            Duration::MIN
        } else {
            Duration::MAX
        })
    }

    /// Returns true if the duration is strictly positive.
    pub fn is_positive(self) -> bool {
        self.checked_duration().is_some_and(|d| d > Duration::zero())
    }
}

impl Default for SessionDuration {
    fn default() -> Self {
        Self::one_hour()
    }
}

/// A weekly recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    #[serde(default)]
    pub freq: Frequency,
    /// Number of weeks between occurrences.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Anchor of the first occurrence. Falls back to the series `start`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtstart: Option<DateTime<Utc>>,
    /// Last instant an occurrence may start at (inclusive).
    pub until: DateTime<Utc>,
    /// Calendar dates whose occurrence is not generated.
    #[serde(default, deserialize_with = "exception_dates::deserialize")]
    pub exception_dates: BTreeSet<NaiveDate>,
}

fn default_interval() -> u32 {
    1
}

impl Recurrence {
    /// Creates a rule repeating every week until `until`.
    pub fn weekly(until: DateTime<Utc>) -> Self {
        Self {
            freq: Frequency::Weekly,
            interval: 1,
            dtstart: None,
            until,
            exception_dates: BTreeSet::new(),
        }
    }

    /// Builder method to exclude a date.
    pub fn with_exception_date(mut self, date: NaiveDate) -> Self {
        self.exception_dates.insert(date);
        self
    }

    /// Returns the anchor of the first occurrence.
    pub fn anchor(&self, series_start: DateTime<Utc>) -> DateTime<Utc> {
        self.dtstart.unwrap_or(series_start)
    }

    /// Returns true if `date` is excluded from generation.
    pub fn excludes(&self, date: NaiveDate) -> bool {
        self.exception_dates.contains(&date)
    }
}

/// A scheduled session.
///
/// An `Event` is one of three things:
/// - a single session (`recurrence` is `None`, `is_exception` is false)
/// - a series template (`recurrence` and usually `duration` are set)
/// - an exception: a standalone copy of one occurrence of a series, carrying
///   `original_event_id` and `original_date`
///
/// For all-day events `start` and `end` only carry date semantics and `end`
/// is exclusive (one day past the last included day).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trainer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<SessionDuration>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_exception: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_cancelled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Event {
    /// Creates a single timed event.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start,
            end,
            all_day: false,
            trainer_id: None,
            course_id: None,
            description: None,
            recurrence: None,
            duration: None,
            is_exception: false,
            original_event_id: None,
            original_date: None,
            is_cancelled: false,
            background_color: None,
            text_color: None,
        }
    }

    /// Builder method to set the trainer.
    pub fn with_trainer(mut self, trainer_id: impl Into<String>) -> Self {
        self.trainer_id = Some(trainer_id.into());
        self
    }

    /// Builder method to set the course.
    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    /// Builder method to turn the event into a series.
    pub fn with_recurrence(mut self, recurrence: Recurrence, duration: SessionDuration) -> Self {
        self.recurrence = Some(recurrence);
        self.duration = Some(duration);
        self
    }

    /// Builder method to mark as all-day.
    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.all_day = all_day;
        self
    }

    /// Returns true if this event is a series template.
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Returns true if this is an all-day event.
    pub fn is_all_day(&self) -> bool {
        self.all_day
    }

    /// Returns true if this exception replaces `date` of series `series_id`.
    pub fn is_exception_for(&self, series_id: &str, date: NaiveDate) -> bool {
        self.is_exception
            && self.original_event_id.as_deref() == Some(series_id)
            && self.original_date == Some(date)
    }

    /// Returns true if both events are assigned to the same trainer.
    ///
    /// Events without a trainer never share one.
    pub fn shares_trainer_with(&self, other: &Event) -> bool {
        matches!(
            (&self.trainer_id, &other.trainer_id),
            (Some(a), Some(b)) if a == b
        )
    }

    /// Returns the length of one occurrence.
    ///
    /// A series without a stored duration is treated as one hour long.
    pub fn session_duration(&self) -> Duration {
        if self.is_recurring() {
            self.duration.unwrap_or_default().to_duration()
        } else {
            self.end - self.start
        }
    }

    /// Returns the window of the first (or only) occurrence.
    pub fn occurrence_window(&self) -> TimeWindow {
        TimeWindow::from_duration(self.start, self.session_duration())
    }

    /// Checks the event shape, failing fast on caller defects.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::ZeroInterval`] for a series stepping by zero weeks
    /// - [`ValidationError::DurationOutOfRange`] for a series duration chrono
    ///   cannot represent
    /// - [`ValidationError::NonPositiveDuration`] for a series of zero length
    /// - [`ValidationError::EndNotAfterStart`] for a timed single event
    ///   ending at or before its start
    pub fn check(&self) -> ValidationResult<()> {
        if let Some(ref recurrence) = self.recurrence {
            if recurrence.interval == 0 {
                return Err(ValidationError::ZeroInterval {
                    id: self.id.clone(),
                });
            }
            if let Some(duration) = self.duration {
                if duration.checked_duration().is_none() {
                    return Err(ValidationError::DurationOutOfRange {
                        id: self.id.clone(),
                        hours: duration.hours,
                        minutes: duration.minutes,
                    });
                }
                if !duration.is_positive() {
                    return Err(ValidationError::non_positive_duration(&self.id));
                }
            }
            return Ok(());
        }

        if !self.all_day && self.end <= self.start {
            return Err(ValidationError::EndNotAfterStart {
                id: self.id.clone(),
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Brings the event into canonical form.
    ///
    /// All-day events get their start truncated to midnight and their end
    /// rounded up to an exclusive midnight, at least one day after start.
    pub fn normalize(&mut self) {
        if self.all_day {
            let start = midnight(self.start.date_naive());
            let end = next_midnight_at_or_after(self.end).max(saturating_add(start, Duration::days(1)));
            self.start = start;
            self.end = end;
        }
    }

    /// Returns a normalized copy.
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Moves the event by `delta`, as a calendar drag does.
    ///
    /// For a series the recurrence anchor and `until` move by the same delta.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ShiftOutOfRange`] if any moved bound would
    /// leave the representable date range. The event is left untouched.
    pub fn shift_by(&mut self, delta: Duration) -> ValidationResult<()> {
        let out_of_range = || ValidationError::ShiftOutOfRange {
            id: self.id.clone(),
            minutes: delta.num_minutes(),
        };
        let moved = |dt: DateTime<Utc>| dt.checked_add_signed(delta).ok_or_else(out_of_range);

        let start = moved(self.start)?;
        let end = moved(self.end)?;
        let bounds = match self.recurrence {
            Some(ref recurrence) => Some((
                recurrence.dtstart.map(moved).transpose()?,
                moved(recurrence.until)?,
            )),
            None => None,
        };

        self.start = start;
        self.end = end;
        if let (Some(recurrence), Some((dtstart, until))) = (self.recurrence.as_mut(), bounds) {
            recurrence.dtstart = dtstart;
            recurrence.until = until;
        }
        Ok(())
    }

    /// Moves the end of the event, as a calendar resize does.
    ///
    /// For a series this rewrites the per-occurrence duration.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EndNotAfterStart`] if `new_end` is not after
    /// `start`.
    pub fn resize_to(&mut self, new_end: DateTime<Utc>) -> ValidationResult<()> {
        if new_end <= self.start {
            return Err(ValidationError::EndNotAfterStart {
                id: self.id.clone(),
                start: self.start,
                end: new_end,
            });
        }
        self.end = new_end;
        if self.is_recurring() {
            self.duration = Some(SessionDuration::from_duration(new_end - self.start));
        }
        Ok(())
    }

    /// Applies every field set on `patch`.
    pub fn apply_patch(&mut self, patch: &EventPatch) {
        if let Some(ref title) = patch.title {
            self.title = title.clone();
        }
        if let Some(start) = patch.start {
            self.start = start;
        }
        if let Some(end) = patch.end {
            self.end = end;
        }
        if let Some(all_day) = patch.all_day {
            self.all_day = all_day;
        }
        if let Some(ref trainer_id) = patch.trainer_id {
            self.trainer_id = Some(trainer_id.clone());
        }
        if let Some(ref course_id) = patch.course_id {
            self.course_id = Some(course_id.clone());
        }
        if let Some(ref description) = patch.description {
            self.description = Some(description.clone());
        }
        if let Some(ref color) = patch.background_color {
            self.background_color = Some(color.clone());
        }
        if let Some(ref color) = patch.text_color {
            self.text_color = Some(color.clone());
        }
    }
}

/// Partial overrides for an [`Event`].
///
/// Every `None` field leaves the target untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
    pub trainer_id: Option<String>,
    pub course_id: Option<String>,
    pub description: Option<String>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
}

impl EventPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One concrete instance generated from an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source_id: String,
    pub source_title: String,
}

impl Occurrence {
    /// Creates an occurrence of `source` spanning `window`.
    pub fn of(source: &Event, window: TimeWindow) -> Self {
        Self {
            start: window.start,
            end: window.end,
            source_id: source.id.clone(),
            source_title: source.title.clone(),
        }
    }

    /// Returns the time window of this occurrence.
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start,
            end: self.end,
        }
    }

    /// Returns the calendar date this occurrence is keyed by.
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

/// Parses a calendar date from either `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// Timestamps are reduced to their UTC date.
pub fn parse_calendar_date(input: &str) -> Result<NaiveDate, chrono::ParseError> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d").or_else(|_| {
        DateTime::parse_from_rfc3339(input).map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

/// Lenient reader for `exceptionDates`.
///
/// Persisted data carries either a single string or an array, with entries
/// that are plain dates or full timestamps.
mod exception_dates {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeSet<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = match Option::<OneOrMany>::deserialize(deserializer)? {
            None => Vec::new(),
            Some(OneOrMany::One(value)) => vec![value],
            Some(OneOrMany::Many(values)) => values,
        };

        raw.iter()
            .filter(|value| !value.trim().is_empty())
            .map(|value| {
                super::parse_calendar_date(value)
                    .map_err(|e| {
                        <D::Error as de::Error>::custom(format!(
                            "invalid exception date {value:?}: {e}"
                        ))
                    })
            })
            .collect()
    }
}
