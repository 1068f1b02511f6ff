//! Output rendering for engine results.
//!
//! Every renderer returns a `String` so commands only decide where it goes.
//! JSON output mirrors the engine's own serde shapes.

use chrono::{DateTime, Utc};
use coursecal_core::{ActionOutcome, Catalog, Event, Locale, Occurrence, ValidationReport};
use serde_json::json;

use crate::error::{ClientError, ClientResult};

/// Formats results for the terminal or as JSON.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    locale: Locale,
    json: bool,
}

impl Renderer {
    /// Creates a renderer.
    pub fn new(locale: Locale, json: bool) -> Self {
        Self { locale, json }
    }

    /// Renders a validation report for `candidate`.
    pub fn report(
        &self,
        report: &ValidationReport,
        candidate: &Event,
        catalog: &Catalog,
    ) -> ClientResult<String> {
        if self.json {
            return to_json(&json!({
                "candidateId": candidate.id,
                "warnings": report.warnings,
                "messages": report
                    .warnings
                    .iter()
                    .map(|w| w.message(self.locale))
                    .collect::<Vec<_>>(),
                "conflicts": report.conflicts,
                "conflictingEventIds": report.conflicting_event_ids(),
                "overlapCount": report.hard_conflicts().count(),
            }));
        }

        if report.is_clear() {
            return Ok(self.label("No warnings", "אין אזהרות").to_string());
        }
        Ok(report.describe(candidate, catalog, self.locale).join("\n"))
    }

    /// Renders expanded occurrences, one per line.
    pub fn occurrences(&self, occurrences: &[Occurrence]) -> ClientResult<String> {
        if self.json {
            return to_json(&occurrences);
        }
        if occurrences.is_empty() {
            return Ok(self.label("No occurrences", "אין מופעים").to_string());
        }
        Ok(occurrences
            .iter()
            .map(|occ| format!("{}  {}", span(occ.start, occ.end), occ.source_title))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Renders the outcome of an occurrence action.
    pub fn outcome(&self, outcome: &ActionOutcome) -> ClientResult<String> {
        if self.json {
            let value = match outcome {
                ActionOutcome::SeriesUpdated(series) => json!({
                    "result": "series_updated",
                    "series": series,
                }),
                ActionOutcome::OccurrenceSplit {
                    updated_series,
                    exception,
                    created,
                } => json!({
                    "result": "occurrence_split",
                    "series": updated_series,
                    "exception": exception,
                    "created": created,
                }),
                ActionOutcome::NotFound => json!({ "result": "not_found" }),
            };
            return to_json(&value);
        }

        Ok(match outcome {
            ActionOutcome::SeriesUpdated(series) => format!(
                "{}: {} ({})",
                self.label("Series updated", "הסדרה עודכנה"),
                series.title,
                span(series.start, series.end)
            ),
            ActionOutcome::OccurrenceSplit {
                exception, created, ..
            } => {
                let verb = match (exception.is_cancelled, created) {
                    (true, _) => self.label("Occurrence cancelled", "המופע בוטל"),
                    (false, true) => self.label("Occurrence split out", "המופע הופרד מהסדרה"),
                    (false, false) => self.label("Occurrence updated", "המופע עודכן"),
                };
                format!(
                    "{verb}: {} [{}] ({})",
                    exception.title,
                    exception.id,
                    span(exception.start, exception.end)
                )
            }
            ActionOutcome::NotFound => self
                .label(
                    "The series has no occurrence on that date, nothing changed",
                    "לסדרה אין מופע בתאריך זה, לא בוצע שינוי",
                )
                .to_string(),
        })
    }

    /// Renders a stored event after it was saved.
    pub fn saved(&self, event: &Event) -> ClientResult<String> {
        if self.json {
            return to_json(event);
        }
        Ok(format!(
            "{}: {} [{}] ({})",
            self.label("Saved", "נשמר"),
            event.title,
            event.id,
            span(event.start, event.end)
        ))
    }

    /// Renders an agenda of occurrences with course and trainer names
    /// resolved.
    pub fn agenda(
        &self,
        occurrences: &[Occurrence],
        events: &[Event],
        catalog: &Catalog,
    ) -> ClientResult<String> {
        if self.json {
            return to_json(&occurrences);
        }
        if occurrences.is_empty() {
            return Ok(self.label("Nothing scheduled", "אין מפגשים מתוכננים").to_string());
        }
        Ok(occurrences
            .iter()
            .map(|occ| {
                let source = events.iter().find(|e| e.id == occ.source_id);
                let course = source
                    .and_then(|e| e.course_id.as_deref())
                    .map(|id| format!(" [{}]", catalog.course_name(id)))
                    .unwrap_or_default();
                let trainer = source
                    .and_then(|e| e.trainer_id.as_deref())
                    .map(|id| format!(" - {}", catalog.trainer_name(id)))
                    .unwrap_or_default();
                format!(
                    "{}  {}{course}{trainer}",
                    span(occ.start, occ.end),
                    occ.source_title
                )
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn label(&self, english: &'static str, hebrew: &'static str) -> &'static str {
        match self.locale {
            Locale::English => english,
            Locale::Hebrew => hebrew,
        }
    }
}

fn span(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "{} {}-{}",
        start.format("%d/%m/%Y"),
        start.format("%H:%M"),
        end.format("%H:%M")
    )
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> ClientResult<String> {
    serde_json::to_string_pretty(value).map_err(ClientError::Output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use coursecal_core::{Validator, WarningKind};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn session(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Event {
        Event::new(id, "Yoga", start, end).with_trainer("t1")
    }

    mod report {
        use super::*;

        #[test]
        fn clear_report() {
            let candidate = session("c", at(4, 9), at(4, 10));
            let report = ValidationReport::default();
            let text = Renderer::new(Locale::English, false)
                .report(&report, &candidate, &Catalog::default())
                .unwrap();
            assert_eq!(text, "No warnings");
        }

        #[test]
        fn json_lists_warning_codes() {
            let candidate = session("c", at(4, 9), at(4, 11));
            let existing = vec![session("e", at(4, 10), at(4, 11))];
            let report = Validator::default().validate(&candidate, &existing).unwrap();
            assert!(report.has(WarningKind::ScheduleConflict));

            let text = Renderer::new(Locale::English, true)
                .report(&report, &candidate, &Catalog::default())
                .unwrap();
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["candidateId"], "c");
            let warnings = value["warnings"].as_array().unwrap();
            assert!(warnings.contains(&json!("schedule_conflict")));
            assert!(warnings.contains(&json!("non_standard_duration")));
            assert_eq!(value["conflicts"][0]["occurrence"]["sourceId"], "e");
            assert_eq!(value["conflictingEventIds"], json!(["e"]));
            assert_eq!(value["overlapCount"], 1);
        }

        #[test]
        fn hebrew_text() {
            let candidate = session("c", at(4, 9), at(4, 11));
            let report = Validator::default().validate(&candidate, &[]).unwrap();
            let text = Renderer::new(Locale::Hebrew, false)
                .report(&report, &candidate, &Catalog::default())
                .unwrap();
            assert_eq!(text, "משך המפגש אינו שעה אחת");
        }
    }

    mod outcome {
        use super::*;

        #[test]
        fn not_found() {
            let text = Renderer::new(Locale::English, false)
                .outcome(&ActionOutcome::NotFound)
                .unwrap();
            assert!(text.contains("nothing changed"));

            let json = Renderer::new(Locale::English, true)
                .outcome(&ActionOutcome::NotFound)
                .unwrap();
            assert!(json.contains("\"not_found\""));
        }

        #[test]
        fn split_created() {
            let series = session("s", at(4, 9), at(4, 10));
            let exception = session("s-20240311", at(11, 12), at(11, 13));
            let outcome = ActionOutcome::OccurrenceSplit {
                updated_series: series,
                exception,
                created: true,
            };
            let text = Renderer::new(Locale::English, false)
                .outcome(&outcome)
                .unwrap();
            assert_eq!(
                text,
                "Occurrence split out: Yoga [s-20240311] (11/03/2024 12:00-13:00)"
            );
        }
    }

    #[test]
    fn unserializable_output_is_an_output_error() {
        let map = std::collections::BTreeMap::from([(vec![1u8], 1u8)]);
        let err = to_json(&map).unwrap_err();
        assert!(matches!(err, ClientError::Output(_)));
        assert!(err.to_string().starts_with("failed to serialize output"));
    }

    #[test]
    fn occurrences_lines() {
        let series = session("s", at(4, 9), at(4, 10));
        let occurrences = vec![
            Occurrence::of(&series, coursecal_core::TimeWindow::try_new(at(4, 9), at(4, 10)).unwrap()),
            Occurrence::of(&series, coursecal_core::TimeWindow::try_new(at(11, 9), at(11, 10)).unwrap()),
        ];
        let text = Renderer::new(Locale::English, false)
            .occurrences(&occurrences)
            .unwrap();
        assert_eq!(
            text,
            "04/03/2024 09:00-10:00  Yoga\n11/03/2024 09:00-10:00  Yoga"
        );
    }

    #[test]
    fn agenda_resolves_course_and_trainer_names() {
        let series = session("s", at(4, 9), at(4, 10)).with_course("c1");
        let catalog = Catalog::new(
            vec![coursecal_core::Trainer {
                id: "t1".to_string(),
                name: "Dana".to_string(),
                color: None,
            }],
            vec![coursecal_core::Course {
                id: "c1".to_string(),
                name: "Morning flow".to_string(),
                color: None,
            }],
        );
        let occurrences = vec![Occurrence::of(&series, series.occurrence_window())];
        let text = Renderer::new(Locale::English, false)
            .agenda(&occurrences, std::slice::from_ref(&series), &catalog)
            .unwrap();
        assert_eq!(text, "04/03/2024 09:00-10:00  Yoga [Morning flow] - Dana");

        let unknown_course = session("u", at(5, 9), at(5, 10)).with_course("c9");
        let occurrences = vec![Occurrence::of(&unknown_course, unknown_course.occurrence_window())];
        let text = Renderer::new(Locale::English, false)
            .agenda(&occurrences, std::slice::from_ref(&unknown_course), &catalog)
            .unwrap();
        assert_eq!(text, "05/03/2024 09:00-10:00  Yoga [c9] - Dana");
    }
}
