//! Event commands.
//!
//! Each command loads what it needs from the [`Context`], runs the engine,
//! and only writes the store when validation is clear or forced. Commands
//! return their rendered output; the caller decides where it goes.

use std::path::Path;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use coursecal_core::{
    ActionOutcome, Event, Occurrence, OccurrenceAction, ValidationError, ValidationReport,
    apply_action, expand_with_limit, occurrences_of,
    time::{midnight, saturating_add},
};
use tracing::{debug, info, warn};

use super::Context;
use crate::error::{ClientError, ClientResult};
use crate::store::read_event;

/// Lists the occurrences of a stored series.
///
/// With `weeks`, only occurrences starting within that many weeks of the
/// series start are listed; otherwise the series runs to its `until`.
pub fn expand(ctx: &Context, series_id: &str, weeks: Option<u32>) -> ClientResult<String> {
    let series = ctx.store.get(series_id)?;
    let recurrence = series
        .recurrence
        .as_ref()
        .ok_or_else(|| ValidationError::not_recurring(series_id))?;

    let horizon_end = match weeks {
        Some(weeks) => saturating_add(series.start, Duration::weeks(i64::from(weeks))),
        None => saturating_add(recurrence.until, Duration::seconds(1)),
    };
    let occurrences = expand_with_limit(series, horizon_end, ctx.max_occurrences())?;
    ctx.renderer.occurrences(&occurrences)
}

/// Validates the candidate in `path` against the stored calendar.
///
/// Nothing is saved.
pub fn validate(ctx: &Context, path: &Path) -> ClientResult<String> {
    let candidate = read_event(path)?.normalized();
    let report = ctx.validator.validate(&candidate, ctx.store.events())?;
    ctx.renderer.report(&report, &candidate, &ctx.catalog)
}

/// Validates and stores the event in `path`.
pub fn add(ctx: &mut Context, path: &Path, force: bool) -> ClientResult<String> {
    let mut event = read_event(path)?.normalized();
    ctx.catalog.apply_course_style(&mut event);

    let report = ctx.validator.validate(&event, ctx.store.events())?;
    confirm(ctx, &report, &event, force)?;

    let replaced = ctx.store.upsert(event.clone());
    ctx.store.save()?;
    info!(event = %event.id, replaced, "Stored event");
    ctx.renderer.saved(&event)
}

/// Moves a stored event by `minutes`, as a calendar drag does.
pub fn shift(ctx: &mut Context, event_id: &str, minutes: i64, force: bool) -> ClientResult<String> {
    let mut event = ctx.store.get(event_id)?.clone();
    let delta = Duration::try_minutes(minutes).ok_or_else(|| ValidationError::ShiftOutOfRange {
        id: event_id.to_string(),
        minutes,
    })?;
    event.shift_by(delta)?;
    event.check()?;
    debug!(event = %event_id, minutes, "Shifted event");
    store_checked(ctx, event, force)
}

/// Moves the end of a stored event, as a calendar resize does.
pub fn resize(
    ctx: &mut Context,
    event_id: &str,
    end: DateTime<Utc>,
    force: bool,
) -> ClientResult<String> {
    let mut event = ctx.store.get(event_id)?.clone();
    event.resize_to(end)?;
    debug!(event = %event_id, %end, "Resized event");
    store_checked(ctx, event, force)
}

/// Applies a recurring-event action to the occurrence of `series_id` on
/// `date`.
///
/// A date the series does not generate is reported, not treated as an
/// error. Cancelling is never blocked by warnings.
pub fn occurrence(
    ctx: &mut Context,
    series_id: &str,
    date: NaiveDate,
    action: &OccurrenceAction,
    force: bool,
) -> ClientResult<String> {
    let series = ctx.store.get(series_id)?;
    let outcome = apply_action(series, date, action, ctx.store.events(), ctx.max_occurrences())?;

    match outcome {
        ActionOutcome::NotFound => {
            info!(series = %series_id, %date, "No occurrence on date, nothing to do");
        }
        ActionOutcome::SeriesUpdated(ref updated) => {
            let report = ctx.validator.validate(updated, ctx.store.events())?;
            confirm(ctx, &report, updated, force)?;
            ctx.store.upsert(updated.clone());
            ctx.store.save()?;
        }
        ActionOutcome::OccurrenceSplit {
            ref updated_series,
            ref exception,
            created,
        } => {
            if !exception.is_cancelled {
                let report = ctx.validator.validate(exception, ctx.store.events())?;
                confirm(ctx, &report, exception, force)?;
            }
            ctx.store.upsert(updated_series.clone());
            ctx.store.upsert(exception.clone());
            ctx.store.save()?;
            info!(series = %series_id, exception = %exception.id, created, "Stored occurrence exception");
        }
    }

    ctx.renderer.outcome(&outcome)
}

/// Lists every non-cancelled occurrence starting in `days` days from `from`.
pub fn agenda(ctx: &Context, from: NaiveDate, days: u32) -> ClientResult<String> {
    let occurrences = agenda_occurrences(ctx, from, days);
    ctx.renderer
        .agenda(&occurrences, ctx.store.events(), &ctx.catalog)
}

fn agenda_occurrences(ctx: &Context, from: NaiveDate, days: u32) -> Vec<Occurrence> {
    let range_start = midnight(from);
    let range_end = saturating_add(range_start, Duration::days(i64::from(days)));

    let mut occurrences: Vec<Occurrence> = Vec::new();
    for event in ctx.store.events() {
        if event.is_cancelled {
            continue;
        }
        match occurrences_of(event, range_end, ctx.max_occurrences()) {
            Ok(occs) => occurrences.extend(
                occs.into_iter()
                    .filter(|occ| occ.start >= range_start && occ.start < range_end),
            ),
            Err(e) => warn!(event = %event.id, error = %e, "Skipping malformed event"),
        }
    }
    occurrences.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.source_id.cmp(&b.source_id)));
    occurrences
}

fn store_checked(ctx: &mut Context, event: Event, force: bool) -> ClientResult<String> {
    let report = ctx.validator.validate(&event, ctx.store.events())?;
    confirm(ctx, &report, &event, force)?;
    ctx.store.upsert(event.clone());
    ctx.store.save()?;
    ctx.renderer.saved(&event)
}

/// Shows any warnings and refuses to continue unless forced.
fn confirm(ctx: &Context, report: &ValidationReport, event: &Event, force: bool) -> ClientResult<()> {
    if report.is_clear() {
        return Ok(());
    }
    eprintln!("{}", ctx.renderer.report(report, event, &ctx.catalog)?);
    if force {
        warn!(event = %event.id, warnings = report.warnings.len(), "Saving despite warnings");
        return Ok(());
    }
    Err(ClientError::Unconfirmed(report.warnings.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Overrides;
    use crate::config::ClientConfig;
    use crate::store::EventStore;
    use chrono::TimeZone;
    use coursecal_core::{EventPatch, Locale, Recurrence, SessionDuration};
    use tempfile::TempDir;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn weekly_yoga() -> Event {
        Event::new("yoga", "Yoga", at(4, 9), at(4, 10))
            .with_trainer("t1")
            .with_recurrence(
                Recurrence::weekly(at(25, 9)),
                SessionDuration::one_hour(),
            )
    }

    fn context(dir: &TempDir, events: Vec<Event>) -> Context {
        let events_path = dir.path().join("events.json");
        let mut store = EventStore::load(&events_path).unwrap();
        for event in events {
            store.upsert(event);
        }
        store.save().unwrap();

        Context::load(
            &ClientConfig::default(),
            Overrides {
                events_path: Some(events_path),
                catalog_path: Some(dir.path().join("catalog.json")),
                locale: Some(Locale::English),
                json: false,
            },
        )
        .unwrap()
    }

    fn write_event(dir: &TempDir, event: &Event) -> std::path::PathBuf {
        let path = dir.path().join(format!("{}.json", event.id));
        std::fs::write(&path, serde_json::to_string(event).unwrap()).unwrap();
        path
    }

    mod expand {
        use super::*;

        #[test]
        fn lists_until_end_of_series() {
            let dir = tempfile::tempdir().unwrap();
            let ctx = context(&dir, vec![weekly_yoga()]);
            let out = expand(&ctx, "yoga", None).unwrap();
            assert_eq!(out.lines().count(), 4);
            assert!(out.ends_with("25/03/2024 09:00-10:00  Yoga"));
        }

        #[test]
        fn weeks_limit_horizon() {
            let dir = tempfile::tempdir().unwrap();
            let ctx = context(&dir, vec![weekly_yoga()]);
            let out = expand(&ctx, "yoga", Some(2)).unwrap();
            assert_eq!(out.lines().count(), 2);
        }

        #[test]
        fn single_event_is_not_a_series() {
            let dir = tempfile::tempdir().unwrap();
            let ctx = context(&dir, vec![Event::new("one", "Yoga", at(4, 9), at(4, 10))]);
            let err = expand(&ctx, "one", None).unwrap_err();
            assert!(matches!(
                err,
                ClientError::Validation(ValidationError::NotRecurring { .. })
            ));
        }

        #[test]
        fn huge_week_count_stops_at_series_end() {
            let dir = tempfile::tempdir().unwrap();
            let ctx = context(&dir, vec![weekly_yoga()]);
            let out = expand(&ctx, "yoga", Some(u32::MAX)).unwrap();
            assert_eq!(out.lines().count(), 4);
        }

        #[test]
        fn unknown_id() {
            let dir = tempfile::tempdir().unwrap();
            let ctx = context(&dir, vec![]);
            assert!(matches!(
                expand(&ctx, "nope", None),
                Err(ClientError::EventNotFound(_))
            ));
        }
    }

    mod add {
        use super::*;

        #[test]
        fn clear_event_is_saved() {
            let dir = tempfile::tempdir().unwrap();
            let mut ctx = context(&dir, vec![weekly_yoga()]);
            let candidate = Event::new("pilates", "Pilates", at(5, 9), at(5, 10)).with_trainer("t1");
            let path = write_event(&dir, &candidate);

            add(&mut ctx, &path, false).unwrap();

            let reloaded = EventStore::load(dir.path().join("events.json")).unwrap();
            assert_eq!(reloaded.find("pilates"), Some(&candidate));
        }

        #[test]
        fn conflicting_event_needs_force() {
            let dir = tempfile::tempdir().unwrap();
            let mut ctx = context(&dir, vec![weekly_yoga()]);
            let candidate =
                Event::new("clash", "Pilates", at(11, 9), at(11, 10)).with_trainer("t1");
            let path = write_event(&dir, &candidate);

            let err = add(&mut ctx, &path, false).unwrap_err();
            assert!(matches!(err, ClientError::Unconfirmed(1)));
            assert!(ctx.store.find("clash").is_none());

            add(&mut ctx, &path, true).unwrap();
            let reloaded = EventStore::load(dir.path().join("events.json")).unwrap();
            assert!(reloaded.find("clash").is_some());
        }

        #[test]
        fn other_trainer_does_not_conflict() {
            let dir = tempfile::tempdir().unwrap();
            let mut ctx = context(&dir, vec![weekly_yoga()]);
            let candidate =
                Event::new("other", "Pilates", at(11, 9), at(11, 10)).with_trainer("t2");
            let path = write_event(&dir, &candidate);
            assert!(add(&mut ctx, &path, false).is_ok());
        }
    }

    mod shift_and_resize {
        use super::*;

        #[test]
        fn shifting_a_series_moves_until() {
            let dir = tempfile::tempdir().unwrap();
            let mut ctx = context(&dir, vec![weekly_yoga()]);

            shift(&mut ctx, "yoga", 120, false).unwrap();

            let stored = ctx.store.find("yoga").unwrap();
            assert_eq!(stored.start, at(4, 11));
            assert_eq!(stored.recurrence.as_ref().unwrap().until, at(25, 11));
        }

        #[test]
        fn shift_out_of_range_leaves_store_untouched() {
            let dir = tempfile::tempdir().unwrap();
            let mut ctx = context(&dir, vec![weekly_yoga()]);

            for minutes in [i64::MAX, 1_000_000_000_000] {
                let err = shift(&mut ctx, "yoga", minutes, true).unwrap_err();
                assert!(matches!(
                    err,
                    ClientError::Validation(ValidationError::ShiftOutOfRange { .. })
                ));
            }
            assert_eq!(ctx.store.events(), &[weekly_yoga()]);
            let reloaded = EventStore::load(dir.path().join("events.json")).unwrap();
            assert_eq!(reloaded.events(), &[weekly_yoga()]);
        }

        #[test]
        fn resize_to_two_hours_warns() {
            let dir = tempfile::tempdir().unwrap();
            let mut ctx = context(&dir, vec![weekly_yoga()]);

            let err = resize(&mut ctx, "yoga", at(4, 11), false).unwrap_err();
            assert!(matches!(err, ClientError::Unconfirmed(1)));

            resize(&mut ctx, "yoga", at(4, 11), true).unwrap();
            let stored = ctx.store.find("yoga").unwrap();
            assert_eq!(stored.duration, Some(SessionDuration::new(2, 0)));
        }

        #[test]
        fn resize_before_start_is_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let mut ctx = context(&dir, vec![weekly_yoga()]);
            let err = resize(&mut ctx, "yoga", at(4, 8), true).unwrap_err();
            assert!(matches!(
                err,
                ClientError::Validation(ValidationError::EndNotAfterStart { .. })
            ));
        }
    }

    mod occurrence {
        use super::*;

        fn date(day: u32) -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
        }

        #[test]
        fn cancel_one_stores_exception() {
            let dir = tempfile::tempdir().unwrap();
            let mut ctx = context(&dir, vec![weekly_yoga()]);

            occurrence(&mut ctx, "yoga", date(11), &OccurrenceAction::CancelOne, false).unwrap();

            let reloaded = EventStore::load(dir.path().join("events.json")).unwrap();
            let exception = reloaded.find("yoga-20240311").unwrap();
            assert!(exception.is_cancelled);
            let series = reloaded.find("yoga").unwrap();
            assert!(series.recurrence.as_ref().unwrap().excludes(date(11)));
        }

        #[test]
        fn cancel_twice_keeps_one_exception() {
            let dir = tempfile::tempdir().unwrap();
            let mut ctx = context(&dir, vec![weekly_yoga()]);

            occurrence(&mut ctx, "yoga", date(11), &OccurrenceAction::CancelOne, false).unwrap();
            occurrence(&mut ctx, "yoga", date(11), &OccurrenceAction::CancelOne, false).unwrap();

            assert_eq!(ctx.store.events().len(), 2);
        }

        #[test]
        fn edit_one_moves_only_that_date() {
            let dir = tempfile::tempdir().unwrap();
            let mut ctx = context(&dir, vec![weekly_yoga()]);
            let action = OccurrenceAction::EditOne(EventPatch {
                start: Some(at(11, 20)),
                end: Some(at(11, 21)),
                ..EventPatch::default()
            });

            let out = occurrence(&mut ctx, "yoga", date(11), &action, false).unwrap();
            assert!(out.starts_with("Occurrence split out"));

            let exception = ctx.store.find("yoga-20240311").unwrap();
            assert_eq!(exception.start, at(11, 20));
            let expanded = expand(&ctx, "yoga", None).unwrap();
            assert!(!expanded.contains("11/03/2024"));
        }

        #[test]
        fn missing_date_changes_nothing() {
            let dir = tempfile::tempdir().unwrap();
            let mut ctx = context(&dir, vec![weekly_yoga()]);

            let out =
                occurrence(&mut ctx, "yoga", date(12), &OccurrenceAction::CancelOne, false).unwrap();
            assert!(out.contains("nothing changed"));
            assert_eq!(ctx.store.events(), &[weekly_yoga()]);
        }
    }

    #[test]
    fn agenda_merges_series_and_singles() {
        let dir = tempfile::tempdir().unwrap();
        let single = Event::new("talk", "Talk", at(12, 15), at(12, 16));
        let ctx = context(&dir, vec![weekly_yoga(), single]);

        let from = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let occurrences = agenda_occurrences(&ctx, from, 7);
        let ids: Vec<&str> = occurrences.iter().map(|o| o.source_id.as_str()).collect();
        assert_eq!(ids, vec!["yoga", "talk"]);
        assert_eq!(occurrences[0].start, at(11, 9));
    }

    #[test]
    fn agenda_survives_extreme_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut wide = weekly_yoga();
        wide.id = "wide".to_string();
        wide.recurrence.as_mut().unwrap().interval = u32::MAX;
        let mut long = weekly_yoga();
        long.id = "long".to_string();
        long.duration = Some(SessionDuration::new(i64::MAX, 0));
        let ctx = context(&dir, vec![weekly_yoga(), wide, long]);

        let from = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let occurrences = agenda_occurrences(&ctx, from, u32::MAX);
        let ids: Vec<&str> = occurrences.iter().map(|o| o.source_id.as_str()).collect();
        assert_eq!(ids, vec!["wide", "yoga", "yoga", "yoga", "yoga"]);
    }
}
