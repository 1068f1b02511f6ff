//! Engine error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for engine operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Malformed input handed to the engine.
///
/// These indicate a caller defect, not a scheduling condition: advisory
/// findings such as overlaps are reported through
/// [`ValidationReport`](crate::validate::ValidationReport) instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A single timed event ends at or before it starts.
    #[error("event {id}: end {end} is not after start {start}")]
    EndNotAfterStart {
        id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A time window was built with its bounds reversed.
    #[error("time window end {end} precedes start {start}")]
    InvertedWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A recurring series has a zero or negative session duration.
    #[error("series {id}: duration must be positive")]
    NonPositiveDuration { id: String },

    /// A recurring series steps by zero weeks.
    #[error("series {id}: recurrence interval must be at least 1")]
    ZeroInterval { id: String },

    /// A series duration too large to represent.
    #[error("series {id}: duration of {hours}h{minutes}m is out of range")]
    DurationOutOfRange { id: String, hours: i64, minutes: i64 },

    /// Moving an event would push it past the representable calendar.
    #[error("event {id}: moving by {minutes} minutes leaves the supported date range")]
    ShiftOutOfRange { id: String, minutes: i64 },

    /// An operation that needs a recurring series got a single event.
    #[error("event {id} is not a recurring series")]
    NotRecurring { id: String },
}

impl ValidationError {
    /// Creates a not-recurring error.
    pub fn not_recurring(id: impl Into<String>) -> Self {
        Self::NotRecurring { id: id.into() }
    }

    /// Creates a non-positive duration error.
    pub fn non_positive_duration(id: impl Into<String>) -> Self {
        Self::NonPositiveDuration { id: id.into() }
    }
}
