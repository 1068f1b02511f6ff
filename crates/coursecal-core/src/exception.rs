//! Per-occurrence exceptions to recurring series.
//!
//! Editing or cancelling a single occurrence never touches the other
//! occurrences: the occurrence date is added to the series' exclusion list
//! and a standalone exception event takes its place. Splitting the same
//! occurrence again updates that exception instead of creating another.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ValidationError, ValidationResult};
use crate::event::{Event, EventPatch, Occurrence};
use crate::recurrence::{DEFAULT_MAX_OCCURRENCES, occurrence_on};

/// Appended to the title of a cancelled occurrence ("cancelled").
pub const CANCELLED_SUFFIX: &str = " (בוטל)";

/// Muted background for cancelled occurrences.
pub const CANCELLED_BACKGROUND: &str = "#e0e0e0";

/// Muted foreground for cancelled occurrences.
pub const CANCELLED_TEXT: &str = "#9e9e9e";

/// How a single occurrence is split out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    EditOne,
    CancelOne,
}

/// The result of [`split_occurrence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitOutcome {
    /// The occurrence was split out (or its existing exception updated).
    Split {
        updated_series: Event,
        exception: Event,
        /// False when an existing exception was updated in place.
        created: bool,
    },
    /// The series generates no such occurrence; nothing changed.
    NotFound,
}

impl SplitOutcome {
    /// Returns true if an occurrence was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Split { .. })
    }

    /// Returns the exception event, if any.
    pub fn exception(&self) -> Option<&Event> {
        match self {
            Self::Split { exception, .. } => Some(exception),
            Self::NotFound => None,
        }
    }
}

/// Returns the id given to the exception for `date` of `series_id`.
///
/// Deterministic, so repeated splits of one occurrence address the same
/// record.
pub fn exception_id(series_id: &str, date: NaiveDate) -> String {
    format!("{series_id}-{}", date.format("%Y%m%d"))
}

/// Finds the exception replacing `date` of `series_id`, if one exists.
pub fn find_exception<'a>(
    existing: &'a [Event],
    series_id: &str,
    date: NaiveDate,
) -> Option<&'a Event> {
    existing.iter().find(|e| e.is_exception_for(series_id, date))
}

/// Splits the occurrence of `series` on `date` out into a standalone event.
///
/// Uses the default expansion cap; see [`split_occurrence_with_limit`].
pub fn split_occurrence(
    series: &Event,
    date: NaiveDate,
    mode: SplitMode,
    overrides: Option<&EventPatch>,
    existing: &[Event],
) -> ValidationResult<SplitOutcome> {
    split_occurrence_with_limit(series, date, mode, overrides, existing, DEFAULT_MAX_OCCURRENCES)
}

/// Splits the occurrence of `series` on `date` out into a standalone event.
///
/// If `existing` already holds an exception for `(series.id, date)` it is
/// updated in place. Otherwise a new exception is built from the generated
/// occurrence: its start, end, title, trainer and course default to the
/// occurrence's, then `overrides` apply (`EditOne`), or it is marked
/// cancelled with a suffixed title and muted colors (`CancelOne`).
///
/// The returned series has `date` in its exclusion list; adding a date
/// that is already there is a no-op.
///
/// # Errors
///
/// Fails if `series` is not a well-formed recurring series. A date the
/// series does not generate (already excluded with no exception on record,
/// outside `until`, or the wrong weekday) yields [`SplitOutcome::NotFound`].
pub fn split_occurrence_with_limit(
    series: &Event,
    date: NaiveDate,
    mode: SplitMode,
    overrides: Option<&EventPatch>,
    existing: &[Event],
    limit: usize,
) -> ValidationResult<SplitOutcome> {
    series.check()?;
    let recurrence = series
        .recurrence
        .as_ref()
        .ok_or_else(|| ValidationError::not_recurring(&series.id))?;

    let (mut exception, created) = match find_exception(existing, &series.id, date) {
        Some(previous) => (previous.clone(), false),
        None => {
            if recurrence.excludes(date) {
                debug!(series = %series.id, %date, "Occurrence already excluded");
                return Ok(SplitOutcome::NotFound);
            }
            let Some(occurrence) = occurrence_on(series, date, limit)? else {
                debug!(series = %series.id, %date, "No occurrence on date");
                return Ok(SplitOutcome::NotFound);
            };
            (build_exception(series, date, &occurrence), true)
        }
    };

    match mode {
        SplitMode::EditOne => {
            if let Some(patch) = overrides {
                exception.apply_patch(patch);
            }
        }
        SplitMode::CancelOne => mark_cancelled(&mut exception),
    }

    let mut updated_series = series.clone();
    if let Some(ref mut recurrence) = updated_series.recurrence {
        recurrence.exception_dates.insert(date);
    }

    debug!(
        series = %series.id,
        exception = %exception.id,
        %date,
        ?mode,
        created,
        "Split occurrence"
    );
    Ok(SplitOutcome::Split {
        updated_series,
        exception,
        created,
    })
}

fn build_exception(series: &Event, date: NaiveDate, occurrence: &Occurrence) -> Event {
    let mut exception = Event::new(
        exception_id(&series.id, date),
        series.title.clone(),
        occurrence.start,
        occurrence.end,
    );
    exception.trainer_id = series.trainer_id.clone();
    exception.course_id = series.course_id.clone();
    exception.description = series.description.clone();
    exception.background_color = series.background_color.clone();
    exception.text_color = series.text_color.clone();
    exception.is_exception = true;
    exception.original_event_id = Some(series.id.clone());
    exception.original_date = Some(date);
    exception
}

fn mark_cancelled(event: &mut Event) {
    event.is_cancelled = true;
    if !event.title.ends_with(CANCELLED_SUFFIX) {
        event.title.push_str(CANCELLED_SUFFIX);
    }
    event.background_color = Some(CANCELLED_BACKGROUND.to_string());
    event.text_color = Some(CANCELLED_TEXT.to_string());
}

/// What the user chose to do with one occurrence of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "patch", rename_all = "snake_case")]
pub enum OccurrenceAction {
    /// Change only this occurrence.
    EditOne(EventPatch),
    /// Change the whole series.
    EditAll(EventPatch),
    /// Cancel only this occurrence.
    CancelOne,
}

/// The result of [`apply_action`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The series itself was edited.
    SeriesUpdated(Event),
    /// One occurrence was split out.
    OccurrenceSplit {
        updated_series: Event,
        exception: Event,
        created: bool,
    },
    /// The series generates no such occurrence; nothing changed.
    NotFound,
}

/// Applies a recurring-event action chosen for the occurrence on `date`.
///
/// `EditAll` edits the series in place: a new `start` drags the whole
/// series (anchor and `until` included), a new `end` resizes every
/// occurrence, and the remaining fields are copied over.
pub fn apply_action(
    series: &Event,
    date: NaiveDate,
    action: &OccurrenceAction,
    existing: &[Event],
    limit: usize,
) -> ValidationResult<ActionOutcome> {
    let split = match action {
        OccurrenceAction::EditAll(patch) => return edit_series(series, patch),
        OccurrenceAction::EditOne(patch) => split_occurrence_with_limit(
            series,
            date,
            SplitMode::EditOne,
            Some(patch),
            existing,
            limit,
        )?,
        OccurrenceAction::CancelOne => split_occurrence_with_limit(
            series,
            date,
            SplitMode::CancelOne,
            None,
            existing,
            limit,
        )?,
    };

    Ok(match split {
        SplitOutcome::Split {
            updated_series,
            exception,
            created,
        } => ActionOutcome::OccurrenceSplit {
            updated_series,
            exception,
            created,
        },
        SplitOutcome::NotFound => ActionOutcome::NotFound,
    })
}

fn edit_series(series: &Event, patch: &EventPatch) -> ValidationResult<ActionOutcome> {
    if !series.is_recurring() {
        return Err(ValidationError::not_recurring(&series.id));
    }

    let mut updated = series.clone();
    if let Some(start) = patch.start {
        updated.shift_by(start - updated.start)?;
    }
    if let Some(end) = patch.end {
        updated.resize_to(end)?;
    }
    updated.apply_patch(&EventPatch {
        start: None,
        end: None,
        ..patch.clone()
    });
    updated.check()?;

    debug!(series = %series.id, "Edited whole series");
    Ok(ActionOutcome::SeriesUpdated(updated))
}
