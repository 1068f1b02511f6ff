//! Time helpers for session scheduling.
//!
//! This module provides [`TimeWindow`], the half-open interval every
//! occurrence is reduced to before overlap and gap checks, plus the day
//! boundary helpers used to normalize all-day events.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// A span of time between two UTC instants.
///
/// Represents a half-open interval `[start, end)`: two windows that merely
/// touch (one ends exactly when the other starts) do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvertedWindow`] if `end` precedes `start`.
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> ValidationResult<Self> {
        if end < start {
            return Err(ValidationError::InvertedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a time window from a start time and a non-negative duration.
    ///
    /// An end past the representable range is clamped to its upper bound.
    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            start,
            end: saturating_add(start, duration.max(Duration::zero())),
        }
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks whether two windows overlap.
    ///
    /// `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2 && s2 < e1`, which is
    /// symmetric in its arguments.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns the rest time between this window and another.
    ///
    /// Computed as `min(|self.end - other.start|, |other.end - self.start|)`.
    /// Only meaningful for windows that do not overlap.
    pub fn gap_to(&self, other: &TimeWindow) -> Duration {
        let a = (self.end - other.start).abs();
        let b = (other.end - self.start).abs();
        a.min(b)
    }
}

/// Adds `delta` to `dt`, clamping to the representable range.
pub fn saturating_add(dt: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    dt.checked_add_signed(delta).unwrap_or(if delta < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Returns midnight UTC at the start of `date`.
pub fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Returns `dt` if it is already a UTC midnight, otherwise the next one.
pub fn next_midnight_at_or_after(dt: DateTime<Utc>) -> DateTime<Utc> {
    let floor = midnight(dt.date_naive());
    if floor == dt {
        dt
    } else {
        saturating_add(floor, Duration::days(1))
    }
}
