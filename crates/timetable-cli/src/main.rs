//! `timetable` CLI: semester date arithmetic, slot expansion, holiday lookup
//! and conflict detection from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Date of week 3, Wednesday of a semester starting 2025-02-03
//! timetable date --start 2025-02-03 --week 3 --day 3
//!
//! # Which week and day a date falls on
//! timetable week --start 2025-02-03 --date 2025-03-05
//!
//! # Holiday status, using the tables listed in the config file
//! timetable --config timetable.toml holiday --date 2025-10-01
//!
//! # Expand time slots (JSON array) into dated occurrences
//! timetable expand --start 2025-09-01 -i slots.json
//!
//! # Replay a scenario and print the conflicts the candidate would create
//! timetable detect -i scenario.json
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the configured level.

mod settings;

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use timetable_engine::calendar::{date_for_week_and_day, week_and_day_for_date};
use timetable_engine::detector::rollup;
use timetable_engine::model::MAX_SEMESTER_WEEKS;
use timetable_engine::store::StoreTx;
use timetable_engine::timeslot::holiday_occurrences;
use timetable_engine::{
    expand_all, AssignmentInput, ClassAssignment, HolidayCalendar, InMemoryStore, Occurrence,
    ResourceKind, ScheduleStore, SchedulingService, Semester, TimeSlot,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "timetable",
    version,
    about = "Course timetable conflict detection and semester calendar tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./timetable.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the date of a semester week and weekday
    Date {
        /// Monday of week 1 (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Week number (1-based, may be zero or negative)
        #[arg(long, allow_negative_numbers = true)]
        week: i64,
        /// Day of week, 1 = Monday .. 7 = Sunday
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=7))]
        day: i64,
    },
    /// Print the semester week and weekday of a date
    Week {
        /// Monday of week 1 (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Date to locate (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },
    /// Show whether a date is a holiday, an adjusted workday or a weekend
    Holiday {
        /// Date to look up (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },
    /// Expand time slots into dated occurrences
    Expand {
        /// Monday of week 1 (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// JSON array of time slots (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Replay a scenario and report the candidate's conflicts
    Detect {
        /// Scenario JSON (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Group conflicts per assignment pair and type
        #[arg(long)]
        rollup: bool,
        /// Name recorded as the author of the write
        #[arg(long, default_value = "cli")]
        actor: String,
    },
}

/// A semester, the assignments already in it, and one to add.
#[derive(Debug, Deserialize)]
struct Scenario {
    semester: Semester,
    #[serde(default)]
    existing: Vec<ClassAssignment>,
    candidate: AssignmentInput,
}

#[derive(Debug, Serialize)]
struct ExpandedOccurrence {
    #[serde(flatten)]
    occurrence: Occurrence,
    #[serde(skip_serializing_if = "Option::is_none")]
    holiday: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .init();

    let settings = Settings::load(cli.config.as_deref())?;

    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| settings.logging.level.clone());
    match EnvFilter::try_new(&level) {
        Ok(filter) => {
            if let Err(e) = filter_handle.modify(|current| *current = filter) {
                tracing::warn!(error = %e, "Failed to update log filter");
            }
        }
        Err(_) => tracing::warn!(%level, "Invalid log level, keeping warn"),
    }
    tracing::debug!(settings = ?settings, "configuration loaded");

    match cli.command {
        Commands::Date { start, week, day } => {
            let date = date_for_week_and_day(start, week, day)
                .with_context(|| format!("Cannot place week {} day {}", week, day))?;
            println!("{}", date);
        }
        Commands::Week { start, date } => {
            let wd = week_and_day_for_date(start, date)
                .with_context(|| format!("Cannot place {} in a semester starting {}", date, start))?;
            println!("week {} day {}", wd.week, wd.day);
        }
        Commands::Holiday { date } => {
            let calendar = settings.holiday_calendar()?;
            if !calendar.covers_year(date.year()) {
                tracing::warn!(year = date.year(), "no holiday table loaded for year");
            }
            println!("{}", describe_day(&calendar, date));
        }
        Commands::Expand {
            start,
            input,
            output,
        } => {
            let json = read_input(input.as_deref())?;
            let slots: Vec<TimeSlot> =
                serde_json::from_str(&json).context("Failed to parse time slots")?;
            for (i, slot) in slots.iter().enumerate() {
                slot.validate(MAX_SEMESTER_WEEKS)
                    .with_context(|| format!("Invalid time slot #{}", i))?;
            }

            let calendar = settings.holiday_calendar()?;
            let occurrences = expand_all(&slots, start)?;
            let flagged = holiday_occurrences(&occurrences, &calendar);
            let expanded: Vec<ExpandedOccurrence> = occurrences
                .iter()
                .map(|occurrence| ExpandedOccurrence {
                    occurrence: *occurrence,
                    holiday: flagged
                        .iter()
                        .find(|(o, _)| o.date == occurrence.date)
                        .map(|(_, entry)| entry.name.clone()),
                })
                .collect();

            let pretty = serde_json::to_string_pretty(&expanded)?;
            write_output(output.as_deref(), &pretty)?;
        }
        Commands::Detect {
            input,
            output,
            rollup: summarize,
            actor,
        } => {
            let json = read_input(input.as_deref())?;
            let scenario: Scenario =
                serde_json::from_str(&json).context("Failed to parse scenario")?;

            let service =
                SchedulingService::with_options(replay(&scenario)?, settings.engine.clone());
            let outcome = service
                .create(scenario.candidate, &actor)
                .context("Failed to check candidate assignment")?;

            let pretty = if summarize {
                let keys: Vec<_> = outcome.conflicts.iter().map(|c| c.key()).collect();
                serde_json::to_string_pretty(&rollup(&keys))?
            } else {
                serde_json::to_string_pretty(&outcome.conflicts)?
            };
            write_output(output.as_deref(), &pretty)?;
        }
    }

    Ok(())
}

/// One-line status of a date against the holiday calendar.
fn describe_day(calendar: &HolidayCalendar, date: NaiveDate) -> String {
    match calendar.entry(date) {
        Some(entry) if entry.is_rest_day => format!("{} holiday: {}", date, entry.name),
        Some(entry) => format!("{} workday: {}", date, entry.name),
        None if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) => {
            format!("{} weekend", date)
        }
        None => format!("{} workday", date),
    }
}

/// Build an in-memory store holding the scenario's semester, every record the
/// scenario refers to, and the existing assignments once each passes
/// validation against the semester.
fn replay(scenario: &Scenario) -> Result<InMemoryStore> {
    let store = InMemoryStore::new();
    store
        .insert_semester(scenario.semester.clone())
        .context("Invalid semester")?;

    for (i, assignment) in scenario.existing.iter().enumerate() {
        assignment
            .validate(&scenario.semester)
            .with_context(|| format!("Invalid existing assignment #{}", i))?;
    }

    let candidate = scenario.candidate.clone().into_assignment(uuid::Uuid::nil());
    for assignment in scenario.existing.iter().chain(std::iter::once(&candidate)) {
        let references = [
            (ResourceKind::Course, assignment.course_uuid),
            (ResourceKind::Teacher, assignment.teacher_uuid),
            (ResourceKind::Classroom, assignment.classroom_uuid),
            (ResourceKind::TeachingClass, assignment.teaching_class_uuid),
        ]
        .into_iter()
        .chain(
            assignment
                .roster
                .administrative_classes()
                .iter()
                .map(|&uuid| (ResourceKind::AdministrativeClass, uuid)),
        );
        for (kind, uuid) in references {
            store.register(kind, uuid)?;
        }
    }

    store.write(|tx: &mut dyn StoreTx| {
        for assignment in &scenario.existing {
            tx.put_assignment(assignment.clone())?;
        }
        Ok(())
    })?;
    tracing::info!(
        semester = %scenario.semester.semester_uuid,
        existing = scenario.existing.len(),
        "scenario loaded"
    );
    Ok(store)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
