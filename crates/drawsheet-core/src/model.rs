// Core records: entrants, matches, slots, and the reference collections
// (clubs, officials) that travel with a tournament.

use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scoring::event::ScoreEvent;

// ---------------------------------------------------------------------------
// Entrants
// ---------------------------------------------------------------------------

/// A player (or doubles pairing) entered into the tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entrant {
    /// Stable identifier, unique within the tournament.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Seeding rank. Lower is stronger.
    pub rank: u32,
    /// Ranking points / rating.
    #[serde(default)]
    pub points: f64,
    /// Doubles partner, if this entry is a pairing.
    #[serde(default)]
    pub partner_name: Option<String>,
    /// Home club name.
    #[serde(default)]
    pub club: Option<String>,
}

impl Entrant {
    pub fn new(id: impl Into<String>, name: impl Into<String>, rank: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rank,
            points: 0.0,
            partner_name: None,
            club: None,
        }
    }

    pub fn with_points(mut self, points: f64) -> Self {
        self.points = points;
        self
    }

    pub fn with_partner(mut self, partner: impl Into<String>) -> Self {
        self.partner_name = Some(partner.into());
        self
    }

    /// Name as shown on a draw sheet, including the partner for doubles.
    pub fn display_name(&self) -> String {
        match &self.partner_name {
            Some(partner) => format!("{} / {}", self.name, partner),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Club {
    pub id: String,
    pub name: String,
    pub location: String,
    pub manager: String,
}

/// A referee or technical official.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Official {
    pub id: String,
    pub name: String,
    /// Accreditation level, e.g. "National".
    pub level: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Sides and slots
// ---------------------------------------------------------------------------

/// One of the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    /// Zero-based index into per-side arrays.
    pub fn index(self) -> usize {
        match self {
            Side::One => 0,
            Side::Two => 1,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Side::One => 1,
            Side::Two => 2,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "side {}", self.number())
    }
}

/// What currently occupies one side of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Slot {
    /// No entrant will ever fill this slot (first-round padding).
    Bye,
    /// Waiting for progression to deliver an entrant.
    Pending { label: String },
    Entrant(Entrant),
}

impl Slot {
    pub fn tbd() -> Self {
        Slot::Pending {
            label: "TBD".to_string(),
        }
    }

    pub fn entrant(&self) -> Option<&Entrant> {
        match self {
            Slot::Entrant(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_bye(&self) -> bool {
        matches!(self, Slot::Bye)
    }

    pub fn label(&self) -> String {
        match self {
            Slot::Bye => "BYE".to_string(),
            Slot::Pending { label } => label.clone(),
            Slot::Entrant(e) => e.display_name(),
        }
    }
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

/// Final score of one completed game, oriented side one / side two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScore {
    pub side1: u32,
    pub side2: u32,
}

impl GameScore {
    pub fn new(side1: u32, side2: u32) -> Self {
        Self { side1, side2 }
    }

    /// Side that took the game, `None` for a level (invalid) score.
    pub fn winner(&self) -> Option<Side> {
        match self.side1.cmp(&self.side2) {
            std::cmp::Ordering::Greater => Some(Side::One),
            std::cmp::Ordering::Less => Some(Side::Two),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn swapped(&self) -> Self {
        Self {
            side1: self.side2,
            side2: self.side1,
        }
    }
}

impl fmt::Display for GameScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.side1, self.side2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Scheduled,
    InProgress,
    Completed,
    Walkover,
}

impl MatchStatus {
    /// Completed and Walkover are terminal; both carry a winner.
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Walkover)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BracketKind {
    Main,
    Plate,
    Group,
}

/// Court and start time attached to a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub court: String,
    pub start: NaiveTime,
}

impl Schedule {
    pub fn new(court: impl Into<String>, start: NaiveTime) -> Self {
        Self {
            court: court.into(),
            start,
        }
    }
}

/// Whole minutes since midnight.
pub fn minutes_since_midnight(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight() / 60)
}

/// A single match record, addressed by its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Identifier following the `R{size}-M{index}` family of grammars.
    pub id: String,
    pub kind: BracketKind,
    /// Human-readable round label, e.g. "Quarter Final".
    pub round_name: String,
    /// Matches in this round (1 = final). `None` for group matches.
    pub round_size: Option<u32>,
    /// Group letter for group-stage matches.
    #[serde(default)]
    pub group: Option<char>,
    pub side1: Slot,
    pub side2: Slot,
    /// Completed games in order.
    #[serde(default)]
    pub scores: Vec<GameScore>,
    pub status: MatchStatus,
    #[serde(default)]
    pub winner_id: Option<String>,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub referee: Option<String>,
    /// Append-only scoring log.
    #[serde(default)]
    pub events: Vec<ScoreEvent>,
    /// Bumped on every whole-record replace through the collection.
    #[serde(default)]
    pub revision: u64,
}

impl Match {
    /// A fresh, unscheduled match with both sides as given.
    pub fn new(
        id: impl Into<String>,
        kind: BracketKind,
        round_name: impl Into<String>,
        side1: Slot,
        side2: Slot,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            round_name: round_name.into(),
            round_size: None,
            group: None,
            side1,
            side2,
            scores: Vec::new(),
            status: MatchStatus::Scheduled,
            winner_id: None,
            schedule: None,
            referee: None,
            events: Vec::new(),
            revision: 0,
        }
    }

    pub fn slot(&self, side: Side) -> &Slot {
        match side {
            Side::One => &self.side1,
            Side::Two => &self.side2,
        }
    }

    pub fn slot_mut(&mut self, side: Side) -> &mut Slot {
        match side {
            Side::One => &mut self.side1,
            Side::Two => &mut self.side2,
        }
    }

    pub fn entrant(&self, side: Side) -> Option<&Entrant> {
        self.slot(side).entrant()
    }

    /// Identifiers of the entrants currently assigned to this match.
    pub fn participant_ids(&self) -> Vec<&str> {
        [Side::One, Side::Two]
            .into_iter()
            .filter_map(|s| self.entrant(s).map(|e| e.id.as_str()))
            .collect()
    }

    pub fn involves(&self, entrant_id: &str) -> bool {
        self.participant_ids().contains(&entrant_id)
    }

    /// Side whose entrant matches `winner_id`.
    pub fn winner_side(&self) -> Option<Side> {
        let winner = self.winner_id.as_deref()?;
        [Side::One, Side::Two]
            .into_iter()
            .find(|s| self.entrant(*s).is_some_and(|e| e.id == winner))
    }

    pub fn winner(&self) -> Option<&Entrant> {
        self.winner_side().and_then(|s| self.entrant(s))
    }

    pub fn loser(&self) -> Option<&Entrant> {
        self.winner_side().and_then(|s| self.entrant(s.opponent()))
    }

    /// Games won by each side according to the per-game history.
    pub fn games_won(&self) -> [u32; 2] {
        let mut games = [0, 0];
        for game in &self.scores {
            if let Some(side) = game.winner() {
                games[side.index()] += 1;
            }
        }
        games
    }

    /// Start and end of the scheduled booking in minutes since midnight, if
    /// scheduled. The end is not wrapped: a 23:30 start with 45 minutes ends
    /// at minute 1455.
    pub fn booked_minutes(&self, duration: Duration) -> Option<(i64, i64)> {
        self.schedule.as_ref().map(|s| {
            let start = minutes_since_midnight(s.start);
            (start, start + duration.num_minutes())
        })
    }

    /// Short "A vs B" label for logs and listings.
    pub fn title(&self) -> String {
        format!("{} vs {}", self.side1.label(), self.side2.label())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
