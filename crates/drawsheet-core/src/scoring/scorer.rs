// Live scoring state machine for one match.
//
// The scorer works on its own copy of the match record. Every mutating call
// pushes a full snapshot first, so undo is a plain pop-and-restore. The
// caller writes the finished record back to the collection.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::event::{EventDetail, EventKind, ScoreEvent};
use super::rules::ScoringRules;
use crate::error::{EngineError, EngineResult};
use crate::model::{GameScore, Match, MatchStatus, Side, Slot};

/// Referee ruling on an appeal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Point to the appellant.
    Stroke,
    /// Point to the appellant's opponent.
    NoLet,
    /// Rally replayed, no score change.
    Let,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallKind {
    Game,
    Match,
}

/// Advisory: `side` wins the game (or the match) with the next point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameBall {
    pub side: Side,
    pub kind: BallKind,
}

/// Live counters that are not part of the persisted match record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreState {
    pub points: [u32; 2],
    pub games: [u32; 2],
    pub server: Side,
}

/// Everything a mutation can touch, captured before it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoSnapshot {
    state: ScoreState,
    side1: Slot,
    side2: Slot,
    scores: Vec<GameScore>,
    status: MatchStatus,
    winner_id: Option<String>,
    events: Vec<ScoreEvent>,
}

#[derive(Debug, Clone)]
pub struct MatchScorer {
    record: Match,
    rules: ScoringRules,
    state: ScoreState,
    history: Vec<UndoSnapshot>,
    clock: fn() -> DateTime<Utc>,
}

impl MatchScorer {
    /// Start scoring `record`. Both sides must hold entrants and the match
    /// must not be finished. Games already in the record are carried over,
    /// and the current game's points and server are replayed from the log.
    pub fn new(record: Match, rules: ScoringRules) -> EngineResult<Self> {
        if record.status.is_terminal() {
            return Err(EngineError::MatchFinished(record.id));
        }
        for side in [Side::One, Side::Two] {
            if record.entrant(side).is_none() {
                return Err(EngineError::MissingEntrant {
                    match_id: record.id,
                    side,
                });
            }
        }
        let games = record.games_won();
        let (points, server) = resume_current_game(&record.events);
        Ok(Self {
            record,
            rules,
            state: ScoreState {
                points,
                games,
                server,
            },
            history: Vec::new(),
            clock: Utc::now,
        })
    }

    /// Replace the timestamp source used for new events.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    // -- Accessors --------------------------------------------------------

    pub fn record(&self) -> &Match {
        &self.record
    }

    pub fn into_record(self) -> Match {
        self.record
    }

    pub fn rules(&self) -> ScoringRules {
        self.rules
    }

    pub fn state(&self) -> ScoreState {
        self.state
    }

    pub fn points(&self) -> [u32; 2] {
        self.state.points
    }

    pub fn games(&self) -> [u32; 2] {
        self.state.games
    }

    pub fn server(&self) -> Side {
        self.state.server
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.record.status.is_terminal()
    }

    // -- Operations -------------------------------------------------------

    /// Move the match to InProgress and log the start.
    pub fn start(&mut self) -> EngineResult<()> {
        self.ensure_open()?;
        self.push_snapshot();
        self.record.status = MatchStatus::InProgress;
        self.log(EventKind::Info, EventDetail::Start, None, "Match Started".into());
        Ok(())
    }

    /// A normal rally won by `side`.
    pub fn score(&mut self, side: Side) -> EngineResult<()> {
        self.point(side, EventDetail::Normal, "Point")
    }

    /// Apply a referee ruling on an appeal by `appellant`.
    pub fn decision(&mut self, decision: Decision, appellant: Side) -> EngineResult<()> {
        match decision {
            Decision::Stroke => self.point(appellant, EventDetail::Stroke, "Stroke Awarded"),
            Decision::NoLet => {
                self.point(appellant.opponent(), EventDetail::NoLet, "No Let Awarded")
            }
            Decision::Let => {
                self.ensure_open()?;
                self.push_snapshot();
                self.log(
                    EventKind::Decision,
                    EventDetail::Let,
                    Some(appellant),
                    "Yes Let (Replay)".into(),
                );
                Ok(())
            }
        }
    }

    pub fn conduct_warning(&mut self, side: Side) -> EngineResult<()> {
        self.ensure_open()?;
        self.push_snapshot();
        self.log(
            EventKind::Decision,
            EventDetail::ConductWarning,
            Some(side),
            "Conduct Warning".into(),
        );
        Ok(())
    }

    /// Exchange ends: every per-side value changes places and the serve
    /// passes to the other side. The logged event carries the new server.
    pub fn swap_sides(&mut self) -> EngineResult<()> {
        self.ensure_open()?;
        self.push_snapshot();

        self.state.points.swap(0, 1);
        self.state.games.swap(0, 1);
        self.state.server = self.state.server.opponent();
        std::mem::swap(&mut self.record.side1, &mut self.record.side2);
        for game in &mut self.record.scores {
            *game = game.swapped();
        }

        let server = self.state.server;
        self.log(EventKind::Info, EventDetail::Start, Some(server), "Sides Swapped".into());
        Ok(())
    }

    /// Finish the match without play, `winner` advancing. Games already
    /// played stay in the record.
    pub fn walkover(&mut self, winner: Side) -> EngineResult<()> {
        self.ensure_open()?;
        let name = self.entrant_name(winner);
        self.push_snapshot();
        self.record.status = MatchStatus::Walkover;
        self.record.winner_id = self.record.entrant(winner).map(|e| e.id.clone());
        self.log(
            EventKind::MatchEnd,
            EventDetail::GameWin,
            Some(winner),
            format!("Walkover to {name}"),
        );
        info!("{}: walkover to {}", self.record.id, name);
        Ok(())
    }

    /// Restore the state from before the most recent mutation.
    pub fn undo(&mut self) -> EngineResult<()> {
        let snapshot = self.history.pop().ok_or(EngineError::NothingToUndo)?;
        self.state = snapshot.state;
        self.record.side1 = snapshot.side1;
        self.record.side2 = snapshot.side2;
        self.record.scores = snapshot.scores;
        self.record.status = snapshot.status;
        self.record.winner_id = snapshot.winner_id;
        self.record.events = snapshot.events;
        debug!("{}: undo ({} left)", self.record.id, self.history.len());
        Ok(())
    }

    /// Game ball / match ball for the side one point from taking the game.
    pub fn game_ball(&self) -> Option<GameBall> {
        if self.is_finished() {
            return None;
        }
        let target = self.rules.target_points;
        [Side::One, Side::Two].into_iter().find_map(|side| {
            let mine = self.state.points[side.index()];
            let theirs = self.state.points[side.opponent().index()];
            if mine + 1 < target || mine <= theirs {
                return None;
            }
            let kind = if self.state.games[side.index()] + 1 == self.rules.games_to_win {
                BallKind::Match
            } else {
                BallKind::Game
            };
            Some(GameBall { side, kind })
        })
    }

    // -- Internals --------------------------------------------------------

    fn point(&mut self, side: Side, detail: EventDetail, description: &str) -> EngineResult<()> {
        self.ensure_open()?;
        self.push_snapshot();

        if self.record.status == MatchStatus::Scheduled {
            self.record.status = MatchStatus::InProgress;
        }
        self.state.server = side;
        self.state.points[side.index()] += 1;
        self.log(EventKind::Score, detail, Some(side), description.into());

        self.close_game();
        Ok(())
    }

    fn close_game(&mut self) {
        let [a, b] = self.state.points;
        if !self.rules.game_over(a, b) {
            return;
        }
        let winner = if a > b { Side::One } else { Side::Two };
        self.state.games[winner.index()] += 1;
        self.record.scores.push(GameScore::new(a, b));
        let game_no = self.record.scores.len();
        self.log(
            EventKind::GameEnd,
            EventDetail::GameWin,
            Some(winner),
            format!("Game {game_no} Finished"),
        );

        if self.state.games[winner.index()] >= self.rules.games_to_win {
            let name = self.entrant_name(winner);
            self.record.status = MatchStatus::Completed;
            self.record.winner_id = self.record.entrant(winner).map(|e| e.id.clone());
            self.log(
                EventKind::MatchEnd,
                EventDetail::GameWin,
                Some(winner),
                format!("Match Won by {name}"),
            );
            info!(
                "{}: {} wins {}",
                self.record.id,
                name,
                self.record
                    .scores
                    .iter()
                    .map(|g| g.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        self.state.points = [0, 0];
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.is_finished() {
            return Err(EngineError::MatchFinished(self.record.id.clone()));
        }
        Ok(())
    }

    fn push_snapshot(&mut self) {
        self.history.push(UndoSnapshot {
            state: self.state,
            side1: self.record.side1.clone(),
            side2: self.record.side2.clone(),
            scores: self.record.scores.clone(),
            status: self.record.status,
            winner_id: self.record.winner_id.clone(),
            events: self.record.events.clone(),
        });
    }

    fn log(&mut self, kind: EventKind, detail: EventDetail, side: Option<Side>, description: String) {
        let [a, b] = self.state.points;
        self.record.events.push(ScoreEvent {
            timestamp: (self.clock)(),
            kind,
            detail,
            side,
            description,
            score_snapshot: format!("{a}-{b}"),
        });
    }

    fn entrant_name(&self, side: Side) -> String {
        self.record.slot(side).label()
    }
}

/// Points and server of the game in progress, rebuilt from the event log.
///
/// Game and match ends close the current game. A side swap mirrors the
/// running points and is logged with the server it leaves behind.
fn resume_current_game(events: &[ScoreEvent]) -> ([u32; 2], Side) {
    let mut points = [0, 0];
    let mut server = Side::One;
    for event in events {
        match (event.kind, event.side) {
            (EventKind::Score, Some(side)) => {
                points[side.index()] += 1;
                server = side;
            }
            (EventKind::GameEnd | EventKind::MatchEnd, _) => points = [0, 0],
            (EventKind::Info, Some(side)) => {
                points.swap(0, 1);
                server = side;
            }
            _ => {}
        }
    }
    (points, server)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BracketKind, Entrant};
    use chrono::TimeZone;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 4, 10, 0, 0).unwrap()
    }

    fn fresh_match() -> Match {
        Match::new(
            "R2-M1",
            BracketKind::Main,
            "Semi Final",
            Slot::Entrant(Entrant::new("a", "Alice", 1)),
            Slot::Entrant(Entrant::new("b", "Bea", 4)),
        )
    }

    fn scorer() -> MatchScorer {
        MatchScorer::new(fresh_match(), ScoringRules::par11())
            .unwrap()
            .with_clock(fixed_clock)
    }

    fn rally(s: &mut MatchScorer, side: Side, n: u32) {
        for _ in 0..n {
            s.score(side).unwrap();
        }
    }

    /// Play points alternately until the score reads `a`-`b`.
    fn play_to(s: &mut MatchScorer, a: u32, b: u32) {
        let common = a.min(b);
        for _ in 0..common {
            s.score(Side::One).unwrap();
            s.score(Side::Two).unwrap();
        }
        rally(s, Side::One, a - common);
        rally(s, Side::Two, b - common);
    }

    #[test]
    fn game_ends_at_eleven_nine() {
        let mut s = scorer();
        play_to(&mut s, 9, 9);
        rally(&mut s, Side::One, 2);
        assert_eq!(s.games(), [1, 0]);
        assert_eq!(s.points(), [0, 0]);
        assert_eq!(s.record().scores, vec![GameScore::new(11, 9)]);
    }

    #[test]
    fn deuce_game_needs_two_clear() {
        let mut s = scorer();
        play_to(&mut s, 10, 10);
        s.score(Side::One).unwrap();
        assert_eq!(s.points(), [11, 10]);
        assert_eq!(s.games(), [0, 0]);
        s.score(Side::Two).unwrap();
        rally(&mut s, Side::Two, 2);
        assert_eq!(s.record().scores, vec![GameScore::new(11, 13)]);
        assert_eq!(s.games(), [0, 1]);
    }

    #[test]
    fn twelve_ten_ends_the_game() {
        let mut s = scorer();
        play_to(&mut s, 10, 10);
        rally(&mut s, Side::One, 2);
        assert_eq!(s.record().scores, vec![GameScore::new(12, 10)]);
    }

    #[test]
    fn server_follows_the_scorer() {
        let mut s = scorer();
        assert_eq!(s.server(), Side::One);
        s.score(Side::Two).unwrap();
        assert_eq!(s.server(), Side::Two);
        assert_eq!(s.record().status, MatchStatus::InProgress);
    }

    #[test]
    fn best_of_three_completes_after_two_games() {
        let mut s = MatchScorer::new(fresh_match(), ScoringRules::par11().best_of(3)).unwrap();
        rally(&mut s, Side::Two, 11);
        rally(&mut s, Side::Two, 11);
        let record = s.record();
        assert_eq!(record.status, MatchStatus::Completed);
        assert_eq!(record.winner_id.as_deref(), Some("b"));
        let last = record.events.last().unwrap();
        assert_eq!(last.kind, EventKind::MatchEnd);
        assert_eq!(last.score_snapshot, "0-11");
        assert_eq!(s.score(Side::One), Err(EngineError::MatchFinished("R2-M1".into())));
    }

    #[test]
    fn decisions_map_to_points() {
        let mut s = scorer();
        s.decision(Decision::Stroke, Side::One).unwrap();
        s.decision(Decision::NoLet, Side::One).unwrap();
        s.decision(Decision::Let, Side::Two).unwrap();
        assert_eq!(s.points(), [1, 1]);

        let details: Vec<EventDetail> = s.record().events.iter().map(|e| e.detail).collect();
        assert_eq!(details, vec![EventDetail::Stroke, EventDetail::NoLet, EventDetail::Let]);
        let let_event = &s.record().events[2];
        assert_eq!(let_event.kind, EventKind::Decision);
        assert_eq!(let_event.side, Some(Side::Two));
        assert_eq!(let_event.score_snapshot, "1-1");
    }

    #[test]
    fn game_and_match_ball() {
        let mut s = scorer();
        play_to(&mut s, 9, 9);
        assert_eq!(s.game_ball(), None);
        s.score(Side::Two).unwrap();
        assert_eq!(
            s.game_ball(),
            Some(GameBall {
                side: Side::Two,
                kind: BallKind::Game
            })
        );

        let mut s = scorer();
        rally(&mut s, Side::One, 11);
        rally(&mut s, Side::One, 11);
        rally(&mut s, Side::One, 10);
        assert_eq!(
            s.game_ball(),
            Some(GameBall {
                side: Side::One,
                kind: BallKind::Match
            })
        );
    }

    #[test]
    fn swap_exchanges_every_per_side_value() {
        let mut s = scorer();
        rally(&mut s, Side::One, 11);
        play_to(&mut s, 3, 1);
        s.swap_sides().unwrap();

        assert_eq!(s.points(), [1, 3]);
        assert_eq!(s.games(), [0, 1]);
        assert_eq!(s.server(), Side::Two);
        assert_eq!(s.record().side1.label(), "Bea");
        assert_eq!(s.record().scores, vec![GameScore::new(0, 11)]);
        let last = s.record().events.last().unwrap();
        assert_eq!((last.kind, last.description.as_str()), (EventKind::Info, "Sides Swapped"));
    }

    #[test]
    fn undo_restores_previous_state() {
        let mut s = scorer();
        rally(&mut s, Side::One, 10);
        let before = (s.state(), s.record().clone());
        s.score(Side::One).unwrap();
        assert_eq!(s.games(), [1, 0]);

        s.undo().unwrap();
        assert_eq!((s.state(), s.record().clone()), before);
    }

    #[test]
    fn undo_reopens_a_completed_match() {
        let mut s = scorer();
        s.walkover(Side::Two).unwrap();
        assert!(s.is_finished());
        s.undo().unwrap();
        assert!(!s.is_finished());
        assert_eq!(s.record().winner_id, None);
    }

    #[test]
    fn undo_on_empty_history() {
        let mut s = scorer();
        assert!(!s.can_undo());
        assert_eq!(s.undo(), Err(EngineError::NothingToUndo));
    }

    #[test]
    fn walkover_keeps_played_games() {
        let mut s = scorer();
        rally(&mut s, Side::One, 11);
        s.walkover(Side::Two).unwrap();
        let record = s.into_record();
        assert_eq!(record.status, MatchStatus::Walkover);
        assert_eq!(record.winner_id.as_deref(), Some("b"));
        assert_eq!(record.scores, vec![GameScore::new(11, 0)]);
    }

    #[test]
    fn conduct_warning_is_logged_without_score_change() {
        let mut s = scorer();
        s.conduct_warning(Side::One).unwrap();
        assert_eq!(s.points(), [0, 0]);
        let e = &s.record().events[0];
        assert_eq!((e.kind, e.detail), (EventKind::Decision, EventDetail::ConductWarning));
    }

    #[test]
    fn needs_two_entrants() {
        let mut m = fresh_match();
        m.side2 = Slot::tbd();
        assert!(matches!(
            MatchScorer::new(m, ScoringRules::default()),
            Err(EngineError::MissingEntrant { side: Side::Two, .. })
        ));
    }

    #[test]
    fn reopening_resumes_the_game_in_progress() {
        let mut s = scorer();
        rally(&mut s, Side::One, 11);
        play_to(&mut s, 4, 2);
        let live = s.state();

        let reopened = MatchScorer::new(s.into_record(), ScoringRules::par11()).unwrap();
        assert_eq!(reopened.state(), live);
        assert_eq!(reopened.points(), [4, 2]);
        assert_eq!(reopened.games(), [1, 0]);
    }

    #[test]
    fn reopening_after_a_swap_keeps_orientation() {
        let mut s = scorer();
        play_to(&mut s, 5, 3);
        s.swap_sides().unwrap();
        s.score(Side::One).unwrap();
        s.swap_sides().unwrap();
        let live = s.state();
        assert_eq!(live.points, [5, 4]);

        let reopened = MatchScorer::new(s.into_record(), ScoringRules::par11()).unwrap();
        assert_eq!(reopened.state(), live);
    }

    #[test]
    fn resumes_game_count_from_record() {
        let mut m = fresh_match();
        m.scores = vec![GameScore::new(11, 5), GameScore::new(7, 11)];
        let s = MatchScorer::new(m, ScoringRules::default()).unwrap();
        assert_eq!(s.games(), [1, 1]);
    }
}
