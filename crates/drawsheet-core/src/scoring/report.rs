// Post-match statistics derived from the event log.

use serde::Serialize;
use std::fmt;

use super::event::EventDetail;
use crate::model::{GameScore, Match, Side};

/// Running point tally after each scored rally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MomentumPoint {
    /// 1-based rally number.
    pub rally: usize,
    pub side1: u32,
    pub side2: u32,
    /// side1 - side2
    pub lead: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    pub match_id: String,
    pub round_name: String,
    pub title: String,
    pub games: [u32; 2],
    pub scores: Vec<GameScore>,
    pub strokes: [u32; 2],
    pub lets: u32,
    pub warnings: [u32; 2],
    pub momentum: Vec<MomentumPoint>,
}

impl MatchReport {
    pub fn from_match(m: &Match) -> Self {
        let mut strokes = [0, 0];
        let mut warnings = [0, 0];
        let mut lets = 0;
        let mut running = [0u32, 0];
        let mut momentum = Vec::new();

        for event in &m.events {
            match (event.detail, event.side) {
                (EventDetail::Stroke, Some(side)) => strokes[side.index()] += 1,
                (EventDetail::ConductWarning, Some(side)) => warnings[side.index()] += 1,
                (EventDetail::Let, _) => lets += 1,
                _ => {}
            }
            if event.is_point() {
                let side = event.side.unwrap_or(Side::Two);
                running[side.index()] += 1;
                momentum.push(MomentumPoint {
                    rally: momentum.len() + 1,
                    side1: running[0],
                    side2: running[1],
                    lead: i64::from(running[0]) - i64::from(running[1]),
                });
            }
        }

        Self {
            match_id: m.id.clone(),
            round_name: m.round_name.clone(),
            title: m.title(),
            games: m.games_won(),
            scores: m.scores.clone(),
            strokes,
            lets,
            warnings,
            momentum,
        }
    }

    /// Largest lead either side held during the match, as (side, points).
    pub fn biggest_lead(&self) -> Option<(Side, u32)> {
        let point = self.momentum.iter().max_by_key(|p| p.lead.unsigned_abs())?;
        if point.lead == 0 {
            return None;
        }
        let side = if point.lead > 0 { Side::One } else { Side::Two };
        Some((side, point.lead.unsigned_abs() as u32))
    }
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}] {}", self.match_id, self.round_name, self.title)?;
        let games: Vec<String> = self.scores.iter().map(|g| g.to_string()).collect();
        writeln!(
            f,
            "  games {}-{} ({})",
            self.games[0],
            self.games[1],
            games.join(", ")
        )?;
        writeln!(f, "  strokes {}-{}, lets {}", self.strokes[0], self.strokes[1], self.lets)?;
        write!(f, "  conduct warnings {}-{}", self.warnings[0], self.warnings[1])?;
        if let Some((side, lead)) = self.biggest_lead() {
            write!(f, "\n  biggest lead {lead} ({side})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BracketKind, Entrant, Slot};
    use crate::scoring::rules::ScoringRules;
    use crate::scoring::scorer::{Decision, MatchScorer};

    fn played() -> Match {
        let m = Match::new(
            "R1-M1",
            BracketKind::Main,
            "Final",
            Slot::Entrant(Entrant::new("a", "Alice", 1)),
            Slot::Entrant(Entrant::new("b", "Bea", 2)),
        );
        let mut s = MatchScorer::new(m, ScoringRules::hiho9().best_of(3)).unwrap();
        s.start().unwrap();
        s.score(Side::One).unwrap();
        s.score(Side::One).unwrap();
        s.score(Side::One).unwrap();
        s.decision(Decision::Stroke, Side::Two).unwrap();
        s.decision(Decision::Let, Side::One).unwrap();
        s.decision(Decision::NoLet, Side::One).unwrap();
        s.conduct_warning(Side::Two).unwrap();
        s.conduct_warning(Side::Two).unwrap();
        s.into_record()
    }

    #[test]
    fn counts_decisions_per_side() {
        let report = MatchReport::from_match(&played());
        assert_eq!(report.strokes, [0, 1]);
        assert_eq!(report.lets, 1);
        assert_eq!(report.warnings, [0, 2]);
    }

    #[test]
    fn momentum_tracks_scored_rallies_only() {
        let report = MatchReport::from_match(&played());
        let leads: Vec<i64> = report.momentum.iter().map(|p| p.lead).collect();
        assert_eq!(leads, vec![1, 2, 3, 2, 1]);
        assert_eq!(report.momentum.last().unwrap().side2, 2);
        assert_eq!(report.biggest_lead(), Some((Side::One, 3)));
    }

    #[test]
    fn empty_log_gives_empty_report() {
        let m = Match::new("R2-M1", BracketKind::Main, "Semi Final", Slot::tbd(), Slot::tbd());
        let report = MatchReport::from_match(&m);
        assert!(report.momentum.is_empty());
        assert_eq!(report.biggest_lead(), None);
        assert!(report.to_string().contains("TBD vs TBD"));
    }
}
