//! Conflict validation for candidate sessions.
//!
//! Checks a new or edited event against the existing calendar, expanding
//! recurring series, and reports advisory warnings. Nothing here blocks a
//! save: the caller decides whether to override or cancel.
//!
//! Three checks run, all parameterized by [`ValidationRules`]:
//! - [`WarningKind::NonStandardDuration`]: the session is not the standard
//!   length (one hour by default)
//! - [`WarningKind::ScheduleConflict`]: the trainer is already booked for an
//!   overlapping occurrence
//! - [`WarningKind::MinimumGapViolation`]: the same class for the same
//!   trainer lands too close (under twelve hours by default) to another
//!   occurrence without overlapping it
//!
//! All-day events are exempt on both sides.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::ValidationResult;
use crate::event::{Event, Occurrence};
use crate::locale::Locale;
use crate::recurrence::{DEFAULT_MAX_OCCURRENCES, expand_with_limit, occurrences_of};
use crate::time::{TimeWindow, saturating_add};

/// An advisory finding about a candidate event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    ScheduleConflict,
    NonStandardDuration,
    MinimumGapViolation,
}

impl WarningKind {
    /// Returns the user-facing message for this warning.
    pub fn message(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Self::ScheduleConflict, Locale::Hebrew) => "קיימת התנגשות בלוח הזמנים של המדריך",
            (Self::ScheduleConflict, Locale::English) => {
                "The trainer is already booked at this time"
            }
            (Self::NonStandardDuration, Locale::Hebrew) => "משך המפגש אינו שעה אחת",
            (Self::NonStandardDuration, Locale::English) => {
                "The session is not the standard length"
            }
            (Self::MinimumGapViolation, Locale::Hebrew) => {
                "אותו שיעור עם אותו מדריך מתוזמן בהפרש זמן קצר מדי"
            }
            (Self::MinimumGapViolation, Locale::English) => {
                "The same class with the same trainer is scheduled too close"
            }
        }
    }
}

/// Thresholds shared by every validation call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    /// Expected session length in minutes.
    pub standard_duration_minutes: i64,
    /// Minimum rest between two sessions of the same class, in hours.
    pub minimum_gap_hours: i64,
    /// Interval steps generated per series expansion.
    pub max_occurrences: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            standard_duration_minutes: 60,
            minimum_gap_hours: 12,
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
        }
    }
}

impl ValidationRules {
    /// Returns the standard session length, saturating when out of range.
    pub fn standard_duration(&self) -> Duration {
        Duration::try_minutes(self.standard_duration_minutes).unwrap_or(Duration::MAX)
    }

    /// Returns the minimum gap between same-class sessions, saturating when
    /// out of range.
    pub fn minimum_gap(&self) -> Duration {
        Duration::try_hours(self.minimum_gap_hours).unwrap_or(Duration::MAX)
    }
}

/// Why an occurrence was recorded as a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The occurrence overlaps the candidate.
    Overlap,
    /// The occurrence is the same class, too close to the candidate.
    InsufficientGap,
}

/// An occurrence of an existing event that clashes with the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub kind: ConflictKind,
    /// The existing occurrence.
    pub occurrence: Occurrence,
    /// The candidate occurrence it was compared against.
    pub candidate: TimeWindow,
    /// Rest time between the two, for gap conflicts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap_minutes: Option<i64>,
}

impl Conflict {
    /// Returns true for overlaps (as opposed to soft gap conflicts).
    pub fn is_hard(&self) -> bool {
        self.kind == ConflictKind::Overlap
    }
}

/// The outcome of validating a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub warnings: BTreeSet<WarningKind>,
    pub conflicts: Vec<Conflict>,
}

impl ValidationReport {
    /// Returns true if nothing was flagged.
    pub fn is_clear(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Returns true if the given warning was raised.
    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.contains(&kind)
    }

    /// Returns the ids of conflicting events, each once, in report order.
    pub fn conflicting_event_ids(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.conflicts
            .iter()
            .map(|c| c.occurrence.source_id.as_str())
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Returns only the overlap conflicts.
    pub fn hard_conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter().filter(|c| c.is_hard())
    }

    /// Renders the report as user-facing lines.
    pub fn describe(&self, candidate: &Event, catalog: &Catalog, locale: Locale) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();

        for warning in &self.warnings {
            let message = warning.message(locale);
            let line = match (warning, candidate.trainer_id.as_deref()) {
                (WarningKind::ScheduleConflict, Some(trainer)) => {
                    format!("{message} ({})", catalog.trainer_name(trainer))
                }
                _ => message.to_string(),
            };
            lines.push(line);
        }

        for conflict in &self.conflicts {
            let occ = &conflict.occurrence;
            let when = format!(
                "{} {}-{}",
                occ.start.format("%d/%m/%Y"),
                occ.start.format("%H:%M"),
                occ.end.format("%H:%M")
            );
            let line = match (conflict.kind, locale) {
                (ConflictKind::Overlap, Locale::Hebrew) => {
                    format!("  חופף ל\"{}\" ב-{when}", occ.source_title)
                }
                (ConflictKind::Overlap, Locale::English) => {
                    format!("  overlaps \"{}\" on {when}", occ.source_title)
                }
                (ConflictKind::InsufficientGap, Locale::Hebrew) => format!(
                    "  קרוב מדי ל\"{}\" ב-{when} ({} דקות)",
                    occ.source_title,
                    conflict.gap_minutes.unwrap_or_default()
                ),
                (ConflictKind::InsufficientGap, Locale::English) => format!(
                    "  too close to \"{}\" on {when} ({} minutes apart)",
                    occ.source_title,
                    conflict.gap_minutes.unwrap_or_default()
                ),
            };
            lines.push(line);
        }

        lines
    }
}

/// Runs the conflict checks with a fixed set of rules.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    rules: ValidationRules,
}

impl Validator {
    /// Creates a validator with the given rules.
    pub fn new(rules: ValidationRules) -> Self {
        Self { rules }
    }

    /// Returns the rules in use.
    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Validates `candidate` against `existing`.
    ///
    /// `existing` may contain the candidate itself (matched by id) and is
    /// never modified. A recurring candidate is checked occurrence by
    /// occurrence. Cancelled events never conflict, and an exception
    /// candidate ignores its parent series' occurrence on the date it
    /// replaces. Malformed existing events are logged and skipped.
    ///
    /// # Errors
    ///
    /// Fails only if the candidate itself is malformed.
    pub fn validate(
        &self,
        candidate: &Event,
        existing: &[Event],
    ) -> ValidationResult<ValidationReport> {
        candidate.check()?;
        let mut report = ValidationReport::default();

        if candidate.is_all_day() || candidate.is_cancelled {
            debug!(candidate = %candidate.id, "Skipping validation for all-day or cancelled event");
            return Ok(report);
        }

        if candidate.session_duration() != self.rules.standard_duration() {
            report.warnings.insert(WarningKind::NonStandardDuration);
        }

        let windows = self.candidate_windows(candidate)?;
        let Some(last) = windows.iter().map(|w| w.end).max() else {
            return Ok(report);
        };
        let horizon_end = saturating_add(last, self.rules.minimum_gap());

        for other in existing {
            if other.id == candidate.id
                || other.is_all_day()
                || other.is_cancelled
                || !candidate.shares_trainer_with(other)
            {
                continue;
            }
            self.check_against(candidate, &windows, other, horizon_end, &mut report);
        }

        debug!(
            candidate = %candidate.id,
            warnings = report.warnings.len(),
            conflicts = report.conflicts.len(),
            "Validated event"
        );
        Ok(report)
    }

    fn candidate_windows(&self, candidate: &Event) -> ValidationResult<Vec<TimeWindow>> {
        match candidate.recurrence {
            Some(ref recurrence) => {
                let horizon_end = saturating_add(recurrence.until, Duration::seconds(1));
                let occs = expand_with_limit(candidate, horizon_end, self.rules.max_occurrences)?;
                Ok(occs.iter().map(Occurrence::window).collect())
            }
            None => Ok(vec![candidate.occurrence_window()]),
        }
    }

    fn check_against(
        &self,
        candidate: &Event,
        windows: &[TimeWindow],
        other: &Event,
        horizon_end: DateTime<Utc>,
        report: &mut ValidationReport,
    ) {
        let occurrences = match occurrences_of(other, horizon_end, self.rules.max_occurrences) {
            Ok(occs) => occs,
            Err(e) => {
                warn!(event = %other.id, error = %e, "Skipping malformed event during validation");
                return;
            }
        };

        let same_class = candidate.title.trim() == other.title.trim();
        let replaced_date = match (&candidate.original_event_id, candidate.original_date) {
            (Some(parent), Some(date)) if *parent == other.id => Some(date),
            _ => None,
        };

        for occ in occurrences {
            if replaced_date == Some(occ.date()) {
                continue;
            }
            let occ_window = occ.window();

            for window in windows {
                if window.overlaps(&occ_window) {
                    debug!(candidate = %candidate.id, other = %other.id, start = %occ.start, "Schedule conflict");
                    report.warnings.insert(WarningKind::ScheduleConflict);
                    report.conflicts.push(Conflict {
                        kind: ConflictKind::Overlap,
                        occurrence: occ.clone(),
                        candidate: *window,
                        gap_minutes: None,
                    });
                } else if same_class {
                    let gap = window.gap_to(&occ_window);
                    if gap < self.rules.minimum_gap() {
                        debug!(
                            candidate = %candidate.id,
                            other = %other.id,
                            gap_minutes = gap.num_minutes(),
                            "Minimum gap violation"
                        );
                        report.warnings.insert(WarningKind::MinimumGapViolation);
                        report.conflicts.push(Conflict {
                            kind: ConflictKind::InsufficientGap,
                            occurrence: occ.clone(),
                            candidate: *window,
                            gap_minutes: Some(gap.num_minutes()),
                        });
                    }
                }
            }
        }
    }
}

/// Validates `candidate` against `existing` with the default rules.
pub fn validate(candidate: &Event, existing: &[Event]) -> ValidationResult<ValidationReport> {
    Validator::default().validate(candidate, existing)
}
