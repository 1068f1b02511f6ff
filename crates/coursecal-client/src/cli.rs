//! Command-line interface definition.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use coursecal_core::{EventPatch, Locale, LogFormat, OccurrenceAction, parse_calendar_date};

/// coursecal - Course and trainer scheduling with conflict checks
#[derive(Debug, Parser)]
#[command(name = "coursecal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "COURSECAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Log line format on stderr (text, json), overrides the config
    #[arg(long, env = "COURSECAL_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Language for messages (he, en)
    #[arg(long, global = true)]
    pub locale: Option<Locale>,

    /// Path to the events file (overrides the config)
    #[arg(long, env = "COURSECAL_EVENTS")]
    pub events: Option<PathBuf>,

    /// Path to the trainers/courses file (overrides the config)
    #[arg(long, env = "COURSECAL_CATALOG")]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the occurrences of a recurring series
    Expand {
        /// Id of the series
        series_id: String,

        /// Only list occurrences starting within this many weeks of the series start
        #[arg(long)]
        weeks: Option<u32>,
    },

    /// Check a candidate event against the stored calendar without saving
    Validate {
        /// JSON file holding the candidate event
        candidate: PathBuf,
    },

    /// Validate and store a new event
    Add {
        /// JSON file holding the event
        event: PathBuf,

        /// Save even if warnings are raised
        #[arg(long)]
        force: bool,
    },

    /// Move an event (or a whole series) by a number of minutes
    Shift {
        /// Id of the event
        event_id: String,

        /// Minutes to move by, negative moves earlier
        #[arg(long, allow_hyphen_values = true)]
        minutes: i64,

        /// Save even if warnings are raised
        #[arg(long)]
        force: bool,
    },

    /// Change the end time of an event (or every occurrence of a series)
    Resize {
        /// Id of the event
        event_id: String,

        /// New end as an RFC 3339 timestamp
        #[arg(long, value_parser = parse_timestamp)]
        end: DateTime<Utc>,

        /// Save even if warnings are raised
        #[arg(long)]
        force: bool,
    },

    /// Edit or cancel one occurrence of a series, or edit the whole series
    Occurrence {
        /// Id of the series
        series_id: String,

        /// Date of the occurrence (YYYY-MM-DD)
        #[arg(value_parser = parse_date)]
        date: NaiveDate,

        #[command(subcommand)]
        action: OccurrenceCommand,
    },

    /// Show everything scheduled in a range of days
    Agenda {
        /// First day (YYYY-MM-DD), defaults to today
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,

        /// Number of days to show
        #[arg(long, default_value = "7")]
        days: u32,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// What to do with the chosen occurrence.
#[derive(Debug, Subcommand)]
pub enum OccurrenceCommand {
    /// Change only this occurrence
    EditOne {
        #[command(flatten)]
        patch: PatchArgs,

        /// Save even if warnings are raised
        #[arg(long)]
        force: bool,
    },

    /// Change the whole series
    EditAll {
        #[command(flatten)]
        patch: PatchArgs,

        /// Save even if warnings are raised
        #[arg(long)]
        force: bool,
    },

    /// Cancel only this occurrence
    CancelOne,
}

impl OccurrenceCommand {
    /// Converts the parsed command into an engine action.
    pub fn to_action(&self) -> OccurrenceAction {
        match self {
            Self::EditOne { patch, .. } => OccurrenceAction::EditOne(patch.to_patch()),
            Self::EditAll { patch, .. } => OccurrenceAction::EditAll(patch.to_patch()),
            Self::CancelOne => OccurrenceAction::CancelOne,
        }
    }

    /// Returns true if warnings should not block saving.
    pub fn force(&self) -> bool {
        match self {
            Self::EditOne { force, .. } | Self::EditAll { force, .. } => *force,
            Self::CancelOne => true,
        }
    }
}

/// Field overrides shared by the edit commands.
#[derive(Debug, Clone, Default, Args)]
pub struct PatchArgs {
    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// New start as an RFC 3339 timestamp
    #[arg(long, value_parser = parse_timestamp)]
    pub start: Option<DateTime<Utc>>,

    /// New end as an RFC 3339 timestamp
    #[arg(long, value_parser = parse_timestamp)]
    pub end: Option<DateTime<Utc>>,

    /// New trainer id
    #[arg(long)]
    pub trainer: Option<String>,

    /// New course id
    #[arg(long)]
    pub course: Option<String>,

    /// New description
    #[arg(long)]
    pub description: Option<String>,
}

impl PatchArgs {
    /// Builds the engine patch.
    pub fn to_patch(&self) -> EventPatch {
        EventPatch {
            title: self.title.clone(),
            start: self.start,
            end: self.end,
            trainer_id: self.trainer.clone(),
            course_id: self.course.clone(),
            description: self.description.clone(),
            ..EventPatch::default()
        }
    }
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump the current configuration
    Dump,

    /// Validate the configuration
    Validate,

    /// Show the configuration file path
    Path,
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
    parse_calendar_date(input).map_err(|e| format!("invalid date '{input}': {e}"))
}

fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{input}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_occurrence_edit_one() {
        let cli = Cli::try_parse_from([
            "coursecal",
            "occurrence",
            "yoga",
            "2024-03-11",
            "edit-one",
            "--title",
            "Yoga (moved)",
            "--start",
            "2024-03-11T12:00:00Z",
        ])
        .unwrap();

        let Command::Occurrence {
            series_id,
            date,
            action,
        } = cli.command
        else {
            panic!("expected occurrence command");
        };
        assert_eq!(series_id, "yoga");
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert!(!action.force());

        let OccurrenceAction::EditOne(patch) = action.to_action() else {
            panic!("expected edit-one");
        };
        assert_eq!(patch.title.as_deref(), Some("Yoga (moved)"));
        assert_eq!(
            patch.start,
            Some(Utc.with_ymd_and_hms(2024, 3, 11, 12, 0, 0).unwrap())
        );
        assert_eq!(patch.end, None);
    }

    #[test]
    fn parses_negative_shift() {
        let cli =
            Cli::try_parse_from(["coursecal", "shift", "e1", "--minutes", "-30", "--force"]).unwrap();
        let Command::Shift {
            event_id,
            minutes,
            force,
        } = cli.command
        else {
            panic!("expected shift command");
        };
        assert_eq!(event_id, "e1");
        assert_eq!(minutes, -30);
        assert!(force);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["coursecal", "expand", "s1", "--json", "--locale", "en"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.locale, Some(Locale::English));
    }

    #[test]
    fn log_format_flag() {
        let cli = Cli::try_parse_from(["coursecal", "--log-format", "json", "agenda"]).unwrap();
        assert_eq!(cli.log_format, Some(LogFormat::Json));

        let err = Cli::try_parse_from(["coursecal", "--log-format", "xml", "agenda"]).unwrap_err();
        assert!(err.to_string().contains("unknown log format"));
    }

    #[test]
    fn rejects_bad_date() {
        let err = Cli::try_parse_from(["coursecal", "occurrence", "s1", "11/03/2024", "cancel-one"])
            .unwrap_err();
        assert!(err.to_string().contains("invalid date"));
    }
}
