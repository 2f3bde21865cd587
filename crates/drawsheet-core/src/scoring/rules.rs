// Scoring formats: points per game and games needed for the match.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named point-a-rally / hand-in-hand-out game formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScoringFormat {
    Par11,
    Par15,
    Hiho9,
}

impl ScoringFormat {
    pub fn target_points(self) -> u32 {
        match self {
            ScoringFormat::Par11 => 11,
            ScoringFormat::Par15 => 15,
            ScoringFormat::Hiho9 => 9,
        }
    }
}

impl fmt::Display for ScoringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScoringFormat::Par11 => "PAR11",
            ScoringFormat::Par15 => "PAR15",
            ScoringFormat::Hiho9 => "HIHO9",
        };
        f.write_str(name)
    }
}

/// Per-match scoring configuration, fixed for the life of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRules {
    /// Points needed to take a game (win by two).
    pub target_points: u32,
    /// Games needed to take the match.
    pub games_to_win: u32,
}

impl ScoringRules {
    pub fn new(format: ScoringFormat, best_of: u32) -> Self {
        Self {
            target_points: format.target_points(),
            games_to_win: 3,
        }
        .best_of(best_of)
    }

    pub fn par11() -> Self {
        Self::new(ScoringFormat::Par11, 5)
    }

    pub fn par15() -> Self {
        Self::new(ScoringFormat::Par15, 5)
    }

    pub fn hiho9() -> Self {
        Self::new(ScoringFormat::Hiho9, 5)
    }

    /// Switch to a best-of-`n` match (3 -> first to 2, 5 -> first to 3).
    pub fn best_of(mut self, games: u32) -> Self {
        self.games_to_win = games / 2 + 1;
        self
    }

    /// Whether a game at `a`-`b` is over.
    pub fn game_over(&self, a: u32, b: u32) -> bool {
        a.max(b) >= self.target_points && a.abs_diff(b) >= 2
    }
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self::par11()
    }
}
