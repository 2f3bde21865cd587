// Match identifier grammar shared by every bracket:
//
//   main    R{roundSize}-M{index}
//   plate   PLATE-R{roundSize}-M{index}
//   group   G{letter}-{i}-{j}

use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;
use crate::model::{BracketKind, Side};

const PLATE_PREFIX: &str = "PLATE-";

/// Parsed form of a match identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchId {
    Main { round_size: u32, index: u32 },
    Plate { round_size: u32, index: u32 },
    Group { group: char, i: usize, j: usize },
}

impl MatchId {
    pub fn main(round_size: u32, index: u32) -> Self {
        MatchId::Main { round_size, index }
    }

    pub fn plate(round_size: u32, index: u32) -> Self {
        MatchId::Plate { round_size, index }
    }

    pub fn kind(&self) -> BracketKind {
        match self {
            MatchId::Main { .. } => BracketKind::Main,
            MatchId::Plate { .. } => BracketKind::Plate,
            MatchId::Group { .. } => BracketKind::Group,
        }
    }

    /// `(round_size, index)` for knockout identifiers.
    pub fn position(&self) -> Option<(u32, u32)> {
        match *self {
            MatchId::Main { round_size, index } | MatchId::Plate { round_size, index } => {
                Some((round_size, index))
            }
            MatchId::Group { .. } => None,
        }
    }

    /// The match the winner of this one moves into, in the same bracket.
    /// `None` for finals and group matches.
    pub fn next_round(&self) -> Option<MatchId> {
        match *self {
            MatchId::Main { round_size, index } if round_size > 1 => {
                Some(MatchId::main(round_size / 2, index.div_ceil(2)))
            }
            MatchId::Plate { round_size, index } if round_size > 1 => {
                Some(MatchId::plate(round_size / 2, index.div_ceil(2)))
            }
            _ => None,
        }
    }

    /// Plate match mirroring this main match's next round.
    pub fn plate_counterpart(&self) -> Option<MatchId> {
        match *self {
            MatchId::Main { round_size, index } if round_size > 1 => {
                Some(MatchId::plate(round_size / 2, index.div_ceil(2)))
            }
            _ => None,
        }
    }

    /// Which side of the downstream match this one feeds: odd indices fill
    /// side one, even indices side two.
    pub fn feeds_side(&self) -> Option<Side> {
        let (_, index) = self.position()?;
        Some(if index % 2 == 1 { Side::One } else { Side::Two })
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchId::Main { round_size, index } => write!(f, "R{round_size}-M{index}"),
            MatchId::Plate { round_size, index } => {
                write!(f, "{PLATE_PREFIX}R{round_size}-M{index}")
            }
            MatchId::Group { group, i, j } => write!(f, "G{group}-{i}-{j}"),
        }
    }
}

impl FromStr for MatchId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || EngineError::MalformedIdentifier { id: s.to_string() };

        if let Some(rest) = s.strip_prefix(PLATE_PREFIX) {
            let (round_size, index) = parse_knockout(rest).ok_or_else(malformed)?;
            return Ok(MatchId::Plate { round_size, index });
        }
        if s.starts_with('R') {
            let (round_size, index) = parse_knockout(s).ok_or_else(malformed)?;
            return Ok(MatchId::Main { round_size, index });
        }
        if let Some(rest) = s.strip_prefix('G') {
            return parse_group(rest).ok_or_else(malformed);
        }
        Err(malformed())
    }
}

/// Parses `R{size}-M{index}`; size must be a power of two and the index must
/// fall inside the round.
fn parse_knockout(s: &str) -> Option<(u32, u32)> {
    let (round, game) = s.split_once('-')?;
    let round_size: u32 = parse_digits(round.strip_prefix('R')?)?;
    let index: u32 = parse_digits(game.strip_prefix('M')?)?;
    if !round_size.is_power_of_two() || index == 0 || index > round_size {
        return None;
    }
    Some((round_size, index))
}

fn parse_group(s: &str) -> Option<MatchId> {
    let mut parts = s.splitn(3, '-');
    let letter = parts.next()?;
    let mut chars = letter.chars();
    let group = chars.next().filter(|c| c.is_ascii_uppercase())?;
    if chars.next().is_some() {
        return None;
    }
    let i = parse_digits(parts.next()?)?;
    let j = parse_digits(parts.next()?)?;
    if i >= j {
        return None;
    }
    Some(MatchId::Group { group, i, j })
}

/// Strict unsigned parse: ASCII digits only, no sign, no whitespace.
fn parse_digits<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
