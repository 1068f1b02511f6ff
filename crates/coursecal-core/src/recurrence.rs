//! Weekly recurrence expansion.
//!
//! Expands a series into concrete [`Occurrence`]s up to a horizon, skipping
//! the dates listed in its `exceptionDates`. Generation is capped at a fixed
//! number of interval steps so an open-ended series always terminates.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::trace;

use crate::error::{ValidationError, ValidationResult};
use crate::event::{Event, Occurrence, Recurrence};
use crate::time::TimeWindow;

/// Default number of interval steps generated per expansion (about a year
/// of weekly sessions).
pub const DEFAULT_MAX_OCCURRENCES: usize = 52;

/// A restartable, chronologically ordered sequence of occurrences.
///
/// Produced by [`occurrences`]; cloning yields an iterator that starts over
/// from the current position.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    series: &'a Event,
    recurrence: &'a Recurrence,
    anchor: DateTime<Utc>,
    duration: Duration,
    horizon_end: Option<DateTime<Utc>>,
    limit: usize,
    index: usize,
    skip_exceptions: bool,
}

impl<'a> Occurrences<'a> {
    fn new(
        series: &'a Event,
        horizon_end: Option<DateTime<Utc>>,
        limit: usize,
    ) -> ValidationResult<Self> {
        series.check()?;
        let recurrence = series
            .recurrence
            .as_ref()
            .ok_or_else(|| ValidationError::not_recurring(&series.id))?;

        Ok(Self {
            series,
            recurrence,
            anchor: recurrence.anchor(series.start),
            duration: series.session_duration(),
            horizon_end,
            limit,
            index: 0,
            skip_exceptions: true,
        })
    }

    /// Includes occurrences whose date is listed as an exception.
    fn including_exceptions(mut self) -> Self {
        self.skip_exceptions = false;
        self
    }

    /// Returns the start of step `index`, or `None` once it leaves the
    /// representable range.
    fn start_at(&self, index: usize) -> Option<DateTime<Utc>> {
        let weeks = i64::from(self.recurrence.interval).checked_mul(i64::try_from(index).ok()?)?;
        self.anchor.checked_add_signed(Duration::try_weeks(weeks)?)
    }
}

impl Iterator for Occurrences<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        while self.index < self.limit {
            let Some(start) = self.start_at(self.index) else {
                self.index = self.limit;
                return None;
            };
            self.index += 1;

            let past_until = start > self.recurrence.until;
            let past_horizon = self.horizon_end.is_some_and(|end| start >= end);
            if past_until || past_horizon {
                self.index = self.limit;
                return None;
            }

            if self.skip_exceptions && self.recurrence.excludes(start.date_naive()) {
                continue;
            }

            let window = TimeWindow::from_duration(start, self.duration);
            return Some(Occurrence::of(self.series, window));
        }
        None
    }
}

/// Returns the occurrences of `series` starting before `horizon_end`.
///
/// Uses the default cap of [`DEFAULT_MAX_OCCURRENCES`] interval steps.
///
/// # Errors
///
/// Fails if `series` is not recurring or its shape is invalid.
pub fn occurrences(series: &Event, horizon_end: DateTime<Utc>) -> ValidationResult<Occurrences<'_>> {
    occurrences_with_limit(series, horizon_end, DEFAULT_MAX_OCCURRENCES)
}

/// Like [`occurrences`] with an explicit cap on interval steps.
pub fn occurrences_with_limit(
    series: &Event,
    horizon_end: DateTime<Utc>,
    limit: usize,
) -> ValidationResult<Occurrences<'_>> {
    Occurrences::new(series, Some(horizon_end), limit)
}

/// Expands `series` into a vector of occurrences starting before
/// `horizon_end`.
///
/// Stepping starts at `recurrence.dtstart` (or the series `start`) and moves
/// by `interval` weeks until `horizon_end` (exclusive), `until` (inclusive)
/// or the step cap, whichever comes first. Dates listed in
/// `exceptionDates` are skipped but still count against the cap. A series
/// whose `until` precedes its anchor yields nothing.
pub fn expand(series: &Event, horizon_end: DateTime<Utc>) -> ValidationResult<Vec<Occurrence>> {
    expand_with_limit(series, horizon_end, DEFAULT_MAX_OCCURRENCES)
}

/// Like [`expand`] with an explicit cap on interval steps.
pub fn expand_with_limit(
    series: &Event,
    horizon_end: DateTime<Utc>,
    limit: usize,
) -> ValidationResult<Vec<Occurrence>> {
    let expanded: Vec<Occurrence> = occurrences_with_limit(series, horizon_end, limit)?.collect();
    trace!(series = %series.id, count = expanded.len(), "Expanded series");
    Ok(expanded)
}

/// Finds the occurrence `series` generates on `date`, ignoring its
/// exception list.
///
/// Returns `None` when no step of the series lands on that date within
/// `until` and the step cap.
pub fn occurrence_on(
    series: &Event,
    date: NaiveDate,
    limit: usize,
) -> ValidationResult<Option<Occurrence>> {
    let found = Occurrences::new(series, None, limit)?
        .including_exceptions()
        .take_while(|occ| occ.date() <= date)
        .find(|occ| occ.date() == date);
    Ok(found)
}

/// Returns every occurrence of `event` relevant before `horizon_end`.
///
/// A single event is its own only occurrence; a series is expanded.
pub fn occurrences_of(
    event: &Event,
    horizon_end: DateTime<Utc>,
    limit: usize,
) -> ValidationResult<Vec<Occurrence>> {
    if event.is_recurring() {
        expand_with_limit(event, horizon_end, limit)
    } else {
        Ok(vec![Occurrence::of(event, event.occurrence_window())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SessionDuration;
    use chrono::{Datelike, TimeZone, Weekday};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Sunday 10:00-11:00 weekly for trainer T1, ten weeks long.
    fn sunday_series() -> Event {
        let start = utc(2024, 6, 2, 10, 0);
        Event::new("S", "Algebra", start, start + Duration::hours(1))
            .with_trainer("T1")
            .with_recurrence(
                Recurrence::weekly(start + Duration::weeks(10)),
                SessionDuration::one_hour(),
            )
    }

    fn with_recurrence(mut series: Event, edit: impl FnOnce(&mut Recurrence)) -> Event {
        if let Some(ref mut r) = series.recurrence {
            edit(r);
        }
        series
    }

    #[test]
    fn five_week_horizon_yields_five_weekly_occurrences() {
        let series = sunday_series();
        let occs = expand(&series, series.start + Duration::weeks(5)).unwrap();

        assert_eq!(occs.len(), 5);
        for (i, occ) in occs.iter().enumerate() {
            assert_eq!(occ.start, series.start + Duration::weeks(i as i64));
            assert_eq!(occ.end - occ.start, Duration::hours(1));
            assert_eq!(occ.start.weekday(), Weekday::Sun);
            assert_eq!(occ.source_id, "S");
            assert_eq!(occ.source_title, "Algebra");
        }
        for pair in occs.windows(2) {
            assert_eq!(pair[1].start - pair[0].start, Duration::days(7));
        }
    }

    #[test]
    fn until_is_inclusive() {
        let series = sunday_series();
        let occs = expand(&series, utc(2030, 1, 1, 0, 0)).unwrap();
        // Weeks 0 through 10; the occurrence starting exactly at `until` counts.
        assert_eq!(occs.len(), 11);
        assert_eq!(occs.last().unwrap().start, series.start + Duration::weeks(10));
    }

    #[test]
    fn cap_bounds_open_ended_series() {
        let series = with_recurrence(sunday_series(), |r| r.until = utc(2040, 1, 1, 0, 0));
        let occs = expand(&series, utc(2040, 1, 1, 0, 0)).unwrap();
        assert_eq!(occs.len(), DEFAULT_MAX_OCCURRENCES);

        let occs = expand_with_limit(&series, utc(2040, 1, 1, 0, 0), 3).unwrap();
        assert_eq!(occs.len(), 3);
        assert!(expand_with_limit(&series, utc(2040, 1, 1, 0, 0), 0).unwrap().is_empty());
    }

    #[test]
    fn exception_dates_are_skipped_but_count_against_cap() {
        let series = with_recurrence(sunday_series(), |r| {
            r.exception_dates.insert(date(2024, 6, 9));
            r.exception_dates.insert(date(2024, 6, 23));
        });
        let occs = expand_with_limit(&series, utc(2030, 1, 1, 0, 0), 5).unwrap();

        let dates: Vec<_> = occs.iter().map(Occurrence::date).collect();
        assert_eq!(dates, vec![date(2024, 6, 2), date(2024, 6, 16), date(2024, 6, 30)]);
        assert!(occs.iter().all(|o| !series.recurrence.as_ref().unwrap().excludes(o.date())));
    }

    #[test]
    fn interval_spacing() {
        let series = with_recurrence(sunday_series(), |r| r.interval = 2);
        let occs = expand(&series, utc(2030, 1, 1, 0, 0)).unwrap();
        assert_eq!(occs.len(), 6);
        for pair in occs.windows(2) {
            assert_eq!(pair[1].start - pair[0].start, Duration::weeks(2));
        }
    }

    #[test]
    fn until_before_anchor_yields_nothing() {
        let series = with_recurrence(sunday_series(), |r| r.until = utc(2024, 5, 1, 0, 0));
        assert!(expand(&series, utc(2030, 1, 1, 0, 0)).unwrap().is_empty());
    }

    #[test]
    fn dtstart_overrides_series_start() {
        let series = with_recurrence(sunday_series(), |r| r.dtstart = Some(utc(2024, 6, 9, 10, 0)));
        let occs = expand(&series, utc(2030, 1, 1, 0, 0)).unwrap();
        assert_eq!(occs.first().unwrap().start, utc(2024, 6, 9, 10, 0));
    }

    #[test]
    fn missing_duration_defaults_to_one_hour() {
        let mut series = sunday_series();
        series.duration = None;
        let occs = expand(&series, series.start + Duration::weeks(1)).unwrap();
        assert_eq!(occs[0].end, utc(2024, 6, 2, 11, 0));
    }

    #[test]
    fn iterator_is_restartable() {
        let series = sunday_series();
        let iter = occurrences(&series, series.start + Duration::weeks(3)).unwrap();
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn rejects_non_series_and_malformed_series() {
        let single = Event::new("e", "One-off", utc(2024, 6, 2, 10, 0), utc(2024, 6, 2, 11, 0));
        assert_eq!(
            expand(&single, utc(2030, 1, 1, 0, 0)),
            Err(ValidationError::not_recurring("e"))
        );

        let stalled = with_recurrence(sunday_series(), |r| r.interval = 0);
        assert!(matches!(
            expand(&stalled, utc(2030, 1, 1, 0, 0)),
            Err(ValidationError::ZeroInterval { .. })
        ));
    }

    #[test]
    fn occurrence_on_ignores_exception_list() {
        let series = with_recurrence(sunday_series(), |r| {
            r.exception_dates.insert(date(2024, 6, 9));
        });
        let occ = occurrence_on(&series, date(2024, 6, 9), DEFAULT_MAX_OCCURRENCES)
            .unwrap()
            .unwrap();
        assert_eq!(occ.start, utc(2024, 6, 9, 10, 0));

        // Not a Sunday
        assert!(occurrence_on(&series, date(2024, 6, 10), DEFAULT_MAX_OCCURRENCES)
            .unwrap()
            .is_none());
        // Past until
        assert!(occurrence_on(&series, date(2024, 9, 1), DEFAULT_MAX_OCCURRENCES)
            .unwrap()
            .is_none());
    }

    #[test]
    fn step_past_calendar_range_ends_expansion() {
        let series = with_recurrence(sunday_series(), |r| {
            r.interval = 20_000_000;
            r.until = utc(2024, 6, 3, 10, 0);
        });
        let occs = expand(&series, utc(2030, 1, 1, 0, 0)).unwrap();
        assert_eq!(occs.len(), 1);
        assert_eq!(occs[0].start, series.start);

        let widest = with_recurrence(sunday_series(), |r| r.interval = u32::MAX);
        assert!(occurrence_on(&widest, date(2024, 6, 9), DEFAULT_MAX_OCCURRENCES)
            .unwrap()
            .is_none());
    }

    #[test]
    fn unrepresentable_duration_is_an_error() {
        let mut series = sunday_series();
        series.duration = Some(SessionDuration::new(i64::MAX, 0));
        assert!(matches!(
            expand(&series, utc(2030, 1, 1, 0, 0)),
            Err(ValidationError::DurationOutOfRange { .. })
        ));
    }

    #[test]
    fn single_event_is_its_own_occurrence() {
        let single = Event::new("e", "One-off", utc(2024, 6, 2, 10, 0), utc(2024, 6, 2, 11, 30));
        let occs = occurrences_of(&single, utc(2024, 6, 3, 0, 0), DEFAULT_MAX_OCCURRENCES).unwrap();
        assert_eq!(occs.len(), 1);
        assert_eq!(occs[0].end, utc(2024, 6, 2, 11, 30));
    }
}
