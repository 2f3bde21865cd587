// Configuration loading and parsing (tournament.toml).

use chrono::{Duration, NaiveTime};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::schedule::SchedulingRules;
use crate::scoring::{ScoringFormat, ScoringRules};

/// Bundled copy of `defaults/tournament.toml`, written out when no defaults
/// directory is available next to the working directory.
const DEFAULT_TOURNAMENT_TOML: &str = include_str!("../defaults/tournament.toml");

const CONFIG_FILE: &str = "tournament.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub tournament: TournamentConfig,
    pub scoring: ScoringRules,
    pub schedule: ScheduleConfig,
    pub auto_advance_byes: bool,
    pub db_path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TournamentConfig {
    pub name: String,
    #[serde(default)]
    pub venue: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleConfig {
    pub courts: Vec<String>,
    pub day_start: NaiveTime,
    pub rules: SchedulingRules,
}

// ---------------------------------------------------------------------------
// tournament.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire tournament.toml file.
#[derive(Debug, Clone, Deserialize)]
struct TournamentFile {
    tournament: TournamentConfig,
    scoring: ScoringSection,
    schedule: ScheduleSection,
    #[serde(default)]
    draw: DrawSection,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct ScoringSection {
    format: ScoringFormat,
    best_of: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ScheduleSection {
    courts: Vec<String>,
    day_start: String,
    match_minutes: i64,
    rest_minutes: i64,
    round_buffer_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct DrawSection {
    auto_advance_byes: bool,
}

impl Default for DrawSection {
    fn default() -> Self {
        Self {
            auto_advance_byes: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/tournament.toml` relative to `base_dir`.
///
/// Does not create the file; see `load_config_at` for the variant that
/// initializes it from defaults first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    parse_config(&text, &path)
}

/// Parse and validate the text of a tournament.toml. `path` is only used in
/// error messages.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: TournamentFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&file)?;

    let day_start = parse_day_start(&file.schedule.day_start)?;
    Ok(Config {
        tournament: file.tournament,
        scoring: ScoringRules::new(file.scoring.format, file.scoring.best_of),
        schedule: ScheduleConfig {
            courts: file.schedule.courts,
            day_start,
            rules: SchedulingRules {
                match_duration: Duration::minutes(file.schedule.match_minutes),
                rest_buffer: Duration::minutes(file.schedule.rest_minutes),
                round_buffer: Duration::minutes(file.schedule.round_buffer_minutes),
            },
        },
        auto_advance_byes: file.draw.auto_advance_byes,
        db_path: file.database.path,
    })
}

/// Make sure `config/tournament.toml` exists under `base_dir`, copying it
/// from `defaults/` when present and from the bundled default otherwise.
/// Returns the path written, or `None` if the file was already there.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let config_dir = base_dir.join("config");
    let target = config_dir.join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE);
    let content = if source.is_file() {
        std::fs::read_to_string(&source).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read {}: {e}", source.display()),
        })?
    } else {
        DEFAULT_TOURNAMENT_TOML.to_string()
    };

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;
    std::fs::write(&target, content).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to write {}: {e}", target.display()),
    })?;
    Ok(Some(target))
}

/// Initialize `config/` under `base_dir` if needed, then load it.
pub fn load_config_at(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_file(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn parse_day_start(raw: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|e| ConfigError::ValidationError {
        field: "schedule.day_start".into(),
        message: format!("expected HH:MM, got {raw:?} ({e})"),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(file: &TournamentFile) -> Result<(), ConfigError> {
    if file.tournament.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "tournament.name".into(),
            message: "must not be empty".into(),
        });
    }

    if !matches!(file.scoring.best_of, 3 | 5) {
        return Err(ConfigError::ValidationError {
            field: "scoring.best_of".into(),
            message: format!("must be 3 or 5, got {}", file.scoring.best_of),
        });
    }

    let schedule = &file.schedule;
    if schedule.courts.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "schedule.courts".into(),
            message: "at least one court is required".into(),
        });
    }
    if let Some(blank) = schedule.courts.iter().position(|c| c.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: format!("schedule.courts[{blank}]"),
            message: "court name must not be empty".into(),
        });
    }

    if schedule.match_minutes <= 0 {
        return Err(ConfigError::ValidationError {
            field: "schedule.match_minutes".into(),
            message: format!("must be > 0, got {}", schedule.match_minutes),
        });
    }
    let non_negative: &[(&str, i64)] = &[
        ("schedule.rest_minutes", schedule.rest_minutes),
        ("schedule.round_buffer_minutes", schedule.round_buffer_minutes),
    ];
    for (name, val) in non_negative {
        if *val < 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be >= 0, got {val}"),
            });
        }
    }

    parse_day_start(&schedule.day_start)?;

    if file.database.path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
