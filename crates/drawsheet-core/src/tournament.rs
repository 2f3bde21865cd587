// Tournament state: entrants, matches and reference data, with the
// operations that move a tournament from draw to finals.

use anyhow::Context;
use chrono::{NaiveTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::bracket::{self, Group, Progression, Standing};
use crate::collection::MatchCollection;
use crate::config::Config;
use crate::db::TournamentStore;
use crate::error::{EngineError, EngineResult};
use crate::model::{BracketKind, Club, Entrant, GameScore, Match, MatchStatus, Official, Schedule, Side, Slot};
use crate::schedule::{self, Conflict, Placement, SchedulingRules};
use crate::scoring::{EventDetail, EventKind, MatchReport, MatchScorer, ScoreEvent, ScoringRules};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TournamentSettings {
    pub scoring: ScoringRules,
    pub scheduling: SchedulingRules,
    pub courts: Vec<String>,
    pub day_start: NaiveTime,
    /// Walk unopposed entrants through automatically.
    pub auto_advance_byes: bool,
}

impl Default for TournamentSettings {
    fn default() -> Self {
        Self {
            scoring: ScoringRules::default(),
            scheduling: SchedulingRules::default(),
            courts: vec!["Center".into(), "Court 1".into(), "Court 2".into()],
            day_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            auto_advance_byes: true,
        }
    }
}

impl From<&Config> for TournamentSettings {
    fn from(config: &Config) -> Self {
        Self {
            scoring: config.scoring,
            scheduling: config.schedule.rules,
            courts: config.schedule.courts.clone(),
            day_start: config.schedule.day_start,
            auto_advance_byes: config.auto_advance_byes,
        }
    }
}

/// Completed meetings between two entrants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadToHead {
    pub first: String,
    pub second: String,
    pub first_wins: u32,
    pub second_wins: u32,
    pub meetings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tournament
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Tournament {
    pub name: String,
    pub entrants: Vec<Entrant>,
    pub matches: MatchCollection,
    pub clubs: Vec<Club>,
    pub officials: Vec<Official>,
    pub settings: TournamentSettings,
}

impl Tournament {
    pub fn new(name: impl Into<String>, settings: TournamentSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            ..Self::default()
        }
    }

    /// Load every collection from `store`.
    pub fn load<S: TournamentStore + ?Sized>(
        store: &S,
        name: impl Into<String>,
        settings: TournamentSettings,
    ) -> anyhow::Result<Self> {
        let matches = MatchCollection::from_matches(store.load_matches()?)
            .context("stored matches are inconsistent")?;
        Ok(Self {
            name: name.into(),
            entrants: store.load_entrants()?,
            matches,
            clubs: store.load_clubs()?,
            officials: store.load_officials()?,
            settings,
        })
    }

    /// Replace every collection in `store` with this tournament's state in a
    /// single write.
    pub fn save<S: TournamentStore + ?Sized>(&self, store: &S) -> anyhow::Result<()> {
        store.replace_all(
            &self.entrants,
            self.matches.as_slice(),
            &self.clubs,
            &self.officials,
        )
    }

    // -- Entrants and reference data ---------------------------------------

    pub fn add_entrant(&mut self, entrant: Entrant) -> EngineResult<()> {
        if self.entrants.iter().any(|e| e.id == entrant.id) {
            return Err(EngineError::DuplicateEntrant(entrant.id));
        }
        info!("Entrant added: {} (rank {})", entrant.display_name(), entrant.rank);
        self.entrants.push(entrant);
        Ok(())
    }

    pub fn entrant(&self, id: &str) -> Option<&Entrant> {
        self.entrants.iter().find(|e| e.id == id)
    }

    pub fn add_official(&mut self, official: Official) {
        self.officials.push(official);
    }

    pub fn add_club(&mut self, club: Club) {
        self.clubs.push(club);
    }

    // -- Draws ---------------------------------------------------------------

    /// Replace the whole match collection with a fresh main draw. Returns the
    /// number of matches created.
    pub fn generate_draw(&mut self) -> usize {
        self.matches = bracket::generate_main_draw(&self.entrants);
        if self.settings.auto_advance_byes {
            self.advance_byes();
        }
        self.matches.len()
    }

    /// (Re)build the plate bracket. Main matches already finished feed their
    /// losers in straight away.
    pub fn generate_plate(&mut self) -> EngineResult<usize> {
        let plate = bracket::generate_plate(&self.matches)?;
        let count = plate.len();
        self.matches.retain(|m| m.kind != BracketKind::Plate);
        self.matches.extend(plate)?;

        let failures = bracket::advance_all(&mut self.matches);
        if !failures.is_empty() {
            warn!("{} matches could not be progressed into the plate", failures.len());
        }
        if self.settings.auto_advance_byes {
            self.advance_byes();
        }
        Ok(count)
    }

    /// (Re)build the group stage alongside any knockout matches.
    pub fn generate_groups(&mut self, group_count: usize) -> EngineResult<Vec<Group>> {
        let groups = bracket::generate_groups(&self.entrants, group_count)?;
        self.matches.retain(|m| m.kind != BracketKind::Group);
        self.matches
            .extend(groups.iter().flat_map(|g| g.matches.iter().cloned()))?;
        Ok(groups)
    }

    /// Give every unopposed entrant a walkover and progress it, repeating
    /// until no match is left facing a bye. Returns the matches resolved.
    pub fn advance_byes(&mut self) -> Vec<String> {
        let mut resolved = Vec::new();
        loop {
            let unopposed: Vec<String> = self
                .matches
                .iter()
                .filter(|m| !m.status.is_terminal() && m.kind != BracketKind::Group)
                .filter(|m| is_unopposed(m))
                .map(|m| m.id.clone())
                .collect();
            if unopposed.is_empty() {
                break;
            }

            for id in unopposed {
                if let Some(m) = self.matches.get_mut(&id) {
                    let side = [Side::One, Side::Two]
                        .into_iter()
                        .find(|s| m.entrant(*s).is_some());
                    m.status = MatchStatus::Walkover;
                    m.winner_id = side.and_then(|s| m.entrant(s)).map(|e| e.id.clone());
                    m.events.push(ScoreEvent {
                        timestamp: Utc::now(),
                        kind: EventKind::MatchEnd,
                        detail: EventDetail::GameWin,
                        side,
                        description: "Bye".into(),
                        score_snapshot: "0-0".into(),
                    });
                }
                if let Err(e) = bracket::advance(&mut self.matches, &id) {
                    warn!("Bye in {} could not be progressed: {}", id, e);
                }
                resolved.push(id);
            }
        }
        if !resolved.is_empty() {
            info!("Resolved {} byes", resolved.len());
        }
        resolved
    }

    // -- Results -------------------------------------------------------------

    /// Record a finished match from its per-game scores. The winner is the
    /// side with more games; level games or a level game count are rejected.
    /// Recording again overwrites the earlier result downstream.
    pub fn record_result(
        &mut self,
        match_id: &str,
        scores: Vec<GameScore>,
    ) -> EngineResult<Progression> {
        let current = self.matches.require(match_id)?;
        require_entrants(current)?;
        let winner = decide_winner(match_id, &scores)?;

        let mut updated = current.clone();
        updated.scores = scores;
        updated.status = MatchStatus::Completed;
        updated.winner_id = updated.entrant(winner).map(|e| e.id.clone());
        info!(
            "{}: {} beat {}",
            match_id,
            updated.slot(winner).label(),
            updated.slot(winner.opponent()).label()
        );
        self.matches.replace(updated)?;
        self.progress(match_id)
    }

    /// Finish a match without play; games already recorded are kept.
    pub fn walkover(&mut self, match_id: &str, winner: Side) -> EngineResult<Progression> {
        let current = self.matches.require(match_id)?;
        let entrant = current
            .entrant(winner)
            .ok_or_else(|| EngineError::MissingEntrant {
                match_id: match_id.to_string(),
                side: winner,
            })?;

        let mut updated = current.clone();
        updated.status = MatchStatus::Walkover;
        updated.winner_id = Some(entrant.id.clone());
        updated.events.push(ScoreEvent {
            timestamp: Utc::now(),
            kind: EventKind::MatchEnd,
            detail: EventDetail::GameWin,
            side: Some(winner),
            description: format!("Walkover to {}", entrant.display_name()),
            score_snapshot: "0-0".into(),
        });
        self.matches.replace(updated)?;
        self.progress(match_id)
    }

    /// A live scorer over a copy of the match.
    pub fn scorer(&self, match_id: &str) -> EngineResult<MatchScorer> {
        let m = self.matches.require(match_id)?.clone();
        MatchScorer::new(m, self.settings.scoring)
    }

    /// Write a scorer's record back. Fails with `StaleRevision` if the match
    /// was replaced after the scorer was opened.
    pub fn commit_scorer(&mut self, scorer: MatchScorer) -> EngineResult<Progression> {
        let record = scorer.into_record();
        let id = record.id.clone();
        let finished = record.status.is_terminal();
        self.matches.replace_if_current(record)?;
        if finished {
            self.progress(&id)
        } else {
            Ok(Progression::default())
        }
    }

    pub fn report(&self, match_id: &str) -> EngineResult<MatchReport> {
        Ok(MatchReport::from_match(self.matches.require(match_id)?))
    }

    fn progress(&mut self, match_id: &str) -> EngineResult<Progression> {
        let progression = match bracket::advance(&mut self.matches, match_id) {
            Ok(p) => p,
            // Already logged; the result itself stands.
            Err(EngineError::MalformedIdentifier { .. }) => Progression::default(),
            Err(e) => return Err(e),
        };
        if self.settings.auto_advance_byes {
            self.advance_byes();
        }
        Ok(progression)
    }

    // -- Scheduling ----------------------------------------------------------

    /// First conflict for putting `match_id` on `court` at `start`.
    pub fn check_placement(
        &self,
        match_id: &str,
        court: &str,
        start: NaiveTime,
    ) -> EngineResult<Option<Conflict>> {
        let m = self.matches.require(match_id)?;
        let placement = Placement::for_match(m, court, start);
        Ok(schedule::detect_conflict(
            &placement,
            &self.matches,
            &self.settings.scheduling,
        ))
    }

    /// Schedule a match. A conflict is returned as an error unless
    /// `override_conflict` is set, in which case the match is placed anyway
    /// and the overridden conflict is returned.
    pub fn place_match(
        &mut self,
        match_id: &str,
        court: &str,
        start: NaiveTime,
        override_conflict: bool,
    ) -> EngineResult<Option<Conflict>> {
        let conflict = self.check_placement(match_id, court, start)?;
        if let Some(c) = &conflict {
            if !override_conflict {
                return Err(EngineError::SchedulingConflict(c.clone()));
            }
            warn!("{} placed despite {}", match_id, c);
        }

        let mut updated = self.matches.require(match_id)?.clone();
        updated.schedule = Some(Schedule::new(court, start));
        self.matches.replace(updated)?;
        Ok(conflict)
    }

    pub fn auto_schedule(&mut self) -> usize {
        schedule::auto_schedule(
            &mut self.matches,
            &self.settings.courts,
            self.settings.day_start,
            &self.settings.scheduling,
        )
    }

    pub fn assign_referees(&mut self) -> EngineResult<usize> {
        schedule::assign_referees(&mut self.matches, &self.officials)
    }

    pub fn set_referee(&mut self, match_id: &str, referee: Option<String>) -> EngineResult<()> {
        let mut updated = self.matches.require(match_id)?.clone();
        updated.referee = referee;
        self.matches.replace(updated)
    }

    // -- Standings -----------------------------------------------------------

    pub fn group_letters(&self) -> Vec<char> {
        let mut letters: Vec<char> = self
            .matches
            .iter_kind(BracketKind::Group)
            .filter_map(|m| m.group)
            .collect();
        letters.sort_unstable();
        letters.dedup();
        letters
    }

    pub fn standings(&self, group: char) -> Vec<Standing> {
        bracket::standings(&self.matches, group)
    }

    /// Completed matches between `first` and `second`, in either orientation.
    pub fn head_to_head(&self, first: &str, second: &str) -> HeadToHead {
        let mut h2h = HeadToHead {
            first: first.to_string(),
            second: second.to_string(),
            first_wins: 0,
            second_wins: 0,
            meetings: Vec::new(),
        };
        for m in self.matches.iter() {
            if m.status != MatchStatus::Completed || !m.involves(first) || !m.involves(second) {
                continue;
            }
            match m.winner_id.as_deref() {
                Some(w) if w == first => h2h.first_wins += 1,
                Some(w) if w == second => h2h.second_wins += 1,
                _ => {}
            }
            h2h.meetings.push(m.id.clone());
        }
        h2h
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_unopposed(m: &Match) -> bool {
    matches!(
        (&m.side1, &m.side2),
        (Slot::Bye, Slot::Bye) | (Slot::Bye, Slot::Entrant(_)) | (Slot::Entrant(_), Slot::Bye)
    )
}

fn require_entrants(m: &Match) -> EngineResult<()> {
    for side in [Side::One, Side::Two] {
        if m.entrant(side).is_none() {
            return Err(EngineError::MissingEntrant {
                match_id: m.id.clone(),
                side,
            });
        }
    }
    Ok(())
}

fn decide_winner(match_id: &str, scores: &[GameScore]) -> EngineResult<Side> {
    let ambiguous = |reason: String| EngineError::AmbiguousWinner {
        match_id: match_id.to_string(),
        reason,
    };
    if scores.is_empty() {
        return Err(ambiguous("no games recorded".into()));
    }

    let mut games = [0u32; 2];
    for (i, game) in scores.iter().enumerate() {
        let side = game
            .winner()
            .ok_or_else(|| ambiguous(format!("game {} is level at {}", i + 1, game)))?;
        games[side.index()] += 1;
    }
    match games[0].cmp(&games[1]) {
        std::cmp::Ordering::Greater => Ok(Side::One),
        std::cmp::Ordering::Less => Ok(Side::Two),
        std::cmp::Ordering::Equal => Err(ambiguous(format!(
            "games are level at {}-{}",
            games[0], games[1]
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
