//! Core types: events, recurrence expansion, conflict validation, exceptions
//!
//! Everything here is synchronous and side-effect free: functions take the
//! caller's events by reference and return new or updated values for the
//! caller to persist.

pub mod catalog;
pub mod error;
pub mod event;
pub mod exception;
pub mod locale;
pub mod logging;
pub mod recurrence;
pub mod time;
pub mod validate;

pub use catalog::{Catalog, Course, Trainer};
pub use error::{ValidationError, ValidationResult};
pub use event::{
    Event, EventPatch, Frequency, Occurrence, Recurrence, SessionDuration, parse_calendar_date,
};
pub use exception::{
    ActionOutcome, OccurrenceAction, SplitMode, SplitOutcome, apply_action, exception_id,
    find_exception, split_occurrence, split_occurrence_with_limit,
};
pub use locale::Locale;
pub use logging::{LogFormat, LoggingConfig, LoggingError, init_logging};
pub use recurrence::{
    DEFAULT_MAX_OCCURRENCES, Occurrences, expand, expand_with_limit, occurrence_on, occurrences,
    occurrences_of,
};
pub use time::TimeWindow;
pub use validate::{
    Conflict, ConflictKind, ValidationReport, ValidationRules, Validator, WarningKind, validate,
};
