// Command-line surface for the drawsheet binary.

use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use drawsheet_core::model::{GameScore, Side};
use drawsheet_core::scoring::Decision;

#[derive(Parser, Debug)]
#[command(author, version, about = "Knockout tournament draws, schedules and scoring")]
pub struct Cli {
    /// Directory holding config/ (and defaults/); the working directory if unset
    #[arg(long, global = true)]
    pub base_dir: Option<std::path::PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum Command {
    /// Manage entrants
    Entrant {
        #[clap(subcommand)]
        action: EntrantCommand,
    },
    /// Register an official for the referee rota
    Official {
        id: String,
        name: String,
        /// Accreditation level
        #[arg(long, default_value = "Club")]
        level: String,
        /// Keep the official off the rota
        #[arg(long)]
        inactive: bool,
    },
    /// Register a club
    Club {
        id: String,
        name: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        manager: String,
    },
    /// Generate the seeded main draw (replaces all matches)
    Draw,
    /// Generate the plate bracket from the main draw
    Plate,
    /// Generate a round-robin group stage
    Groups {
        /// Number of groups
        count: usize,
    },
    /// Give every unscheduled match a court and start time
    Schedule,
    /// Put one match on a court at a time
    Place {
        match_id: String,
        court: String,
        /// Start time, HH:MM
        #[arg(value_parser = parse_time)]
        time: NaiveTime,
        /// Place the match even if it conflicts
        #[arg(long)]
        force: bool,
    },
    /// Record a finished match from its game scores, e.g. "11-9,7-11,11-4,11-8"
    Result {
        match_id: String,
        #[arg(value_parser = parse_scores)]
        scores: Scores,
    },
    /// Score a match live, e.g. "1,1,2,stroke:1,let:2,undo"
    Score {
        match_id: String,
        #[arg(value_parser = parse_actions)]
        actions: Actions,
    },
    /// Award a walkover to side 1 or 2
    Walkover {
        match_id: String,
        #[arg(value_parser = parse_side)]
        side: Side,
    },
    /// Assign referees round-robin to matches without one
    Referees,
    /// List every match
    Show {
        /// Print the match collection as JSON
        #[arg(long)]
        json: bool,
    },
    /// Group tables (all groups if none given)
    Standings { group: Option<char> },
    /// Post-match statistics
    Report { match_id: String },
    /// Completed meetings between two entrants
    H2h { first: String, second: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum EntrantCommand {
    /// Add an entrant
    Add {
        id: String,
        name: String,
        /// Seeding rank, 1 is the top seed
        rank: u32,
        #[arg(long, default_value_t = 0.0)]
        points: f64,
        /// Doubles partner
        #[arg(long)]
        partner: Option<String>,
        #[arg(long)]
        club: Option<String>,
    },
    /// List entrants in seeding order
    List,
}

/// Game scores as given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Scores(pub Vec<GameScore>);

/// One live-scoring input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreAction {
    Point(Side),
    Decision(Decision, Side),
    Warning(Side),
    Swap,
    Undo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Actions(pub Vec<ScoreAction>);

pub fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| format!("expected HH:MM, got '{raw}'"))
}

pub fn parse_side(raw: &str) -> Result<Side, String> {
    match raw.trim() {
        "1" => Ok(Side::One),
        "2" => Ok(Side::Two),
        other => Err(format!("side must be 1 or 2, got '{other}'")),
    }
}

pub fn parse_scores(raw: &str) -> Result<Scores, String> {
    raw.split(',')
        .map(|game| {
            let (a, b) = game
                .trim()
                .split_once('-')
                .ok_or_else(|| format!("expected A-B, got '{game}'"))?;
            let a = a.trim().parse().map_err(|_| format!("bad points in '{game}'"))?;
            let b = b.trim().parse().map_err(|_| format!("bad points in '{game}'"))?;
            Ok(GameScore::new(a, b))
        })
        .collect::<Result<Vec<_>, String>>()
        .map(Scores)
}

pub fn parse_actions(raw: &str) -> Result<Actions, String> {
    raw.split(',')
        .map(|token| {
            let token = token.trim();
            match token.split_once(':') {
                None => match token {
                    "swap" => Ok(ScoreAction::Swap),
                    "undo" => Ok(ScoreAction::Undo),
                    side => parse_side(side).map(ScoreAction::Point),
                },
                Some((name, side)) => {
                    let side = parse_side(side)?;
                    match name {
                        "stroke" => Ok(ScoreAction::Decision(Decision::Stroke, side)),
                        "nolet" => Ok(ScoreAction::Decision(Decision::NoLet, side)),
                        "let" => Ok(ScoreAction::Decision(Decision::Let, side)),
                        "warn" => Ok(ScoreAction::Warning(side)),
                        other => Err(format!("unknown action '{other}'")),
                    }
                }
            }
        })
        .collect::<Result<Vec<_>, String>>()
        .map(Actions)
}
