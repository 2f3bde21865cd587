// Engine error taxonomy.

use thiserror::Error;

use crate::model::Side;
use crate::schedule::conflict::Conflict;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A match identifier does not follow any of the bracket grammars.
    #[error("malformed match identifier: {id}")]
    MalformedIdentifier { id: String },

    /// A completed transition was requested but no side can be named winner.
    #[error("cannot determine a winner for {match_id}: {reason}")]
    AmbiguousWinner { match_id: String, reason: String },

    #[error("scheduling conflict: {0}")]
    SchedulingConflict(#[from] Conflict),

    #[error("match not found: {0}")]
    MatchNotFound(String),

    #[error("duplicate match identifier: {0}")]
    DuplicateMatch(String),

    #[error("duplicate entrant identifier: {0}")]
    DuplicateEntrant(String),

    /// Scoring was attempted on a match already in a terminal state.
    #[error("match {0} is already finished")]
    MatchFinished(String),

    #[error("match {match_id} has no entrant on {side}")]
    MissingEntrant { match_id: String, side: Side },

    #[error("nothing to undo")]
    NothingToUndo,

    /// A plate needs a main bracket deeper than a lone final.
    #[error("a plate bracket needs a main draw with more than one round")]
    PlateUnavailable,

    #[error("invalid group count {count} for {entrants} entrants")]
    InvalidGroupCount { count: usize, entrants: usize },

    #[error("no active officials available")]
    NoOfficials,

    /// Optimistic-concurrency check failed on a whole-record replace.
    #[error("stale write to {match_id}: expected revision {expected}, found {actual}")]
    StaleRevision {
        match_id: String,
        expected: u64,
        actual: u64,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
