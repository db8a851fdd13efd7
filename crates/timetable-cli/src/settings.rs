//! Layered configuration: built-in defaults, an optional TOML file, then
//! `TIMETABLE__*` environment variables.
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [calendar]
//! holiday_tables = ["data/holidays/2025.json"]
//!
//! [engine]
//! max_page_size = 100
//! ```
//!
//! Relative holiday table paths are resolved against the config file's
//! directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use timetable_engine::{EngineOptions, HolidayCalendar, HolidayTable};

const ENV_PREFIX: &str = "TIMETABLE";
const DEFAULT_CONFIG_NAME: &str = "timetable";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub logging: LoggingConfig,
    pub calendar: CalendarConfig,
    pub engine: EngineOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub holiday_tables: Vec<PathBuf>,
}

impl Settings {
    /// Load settings from `path`, or from `./timetable.toml` when present.
    ///
    /// # Errors
    /// Returns an error if an explicit config file is missing, or if building
    /// or deserializing the configuration fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let mut settings = Config::builder()
            .set_default("logging.level", "warn")?
            .set_default("calendar.holiday_tables", Vec::<String>::new())?
            .set_default("engine.max_page_size", i64::from(EngineOptions::default().max_page_size))?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("calendar.holiday_tables")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?
            .try_deserialize::<Settings>()
            .context("Invalid configuration")?;

        if let Some(dir) = path.and_then(Path::parent) {
            for table in &mut settings.calendar.holiday_tables {
                if table.is_relative() {
                    *table = dir.join(&*table);
                }
            }
        }
        Ok(settings)
    }

    /// Read and merge every configured holiday table.
    ///
    /// # Errors
    /// Returns an error if a table cannot be read or parsed, or two tables
    /// cover the same year.
    pub fn holiday_calendar(&self) -> Result<HolidayCalendar> {
        let tables = self
            .calendar
            .holiday_tables
            .iter()
            .map(|path| {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read holiday table: {}", path.display()))?;
                HolidayTable::from_json(&json)
                    .with_context(|| format!("Invalid holiday table: {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        for table in &tables {
            tracing::debug!(year = table.year, version = %table.version, "holiday table loaded");
        }
        HolidayCalendar::from_tables(tables).context("Conflicting holiday tables")
    }
}
