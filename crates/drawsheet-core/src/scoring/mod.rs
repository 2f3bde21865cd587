pub mod event;
pub mod report;
pub mod rules;
pub mod scorer;

pub use event::{EventDetail, EventKind, ScoreEvent};
pub use report::{MatchReport, MomentumPoint};
pub use rules::{ScoringFormat, ScoringRules};
pub use scorer::{BallKind, Decision, GameBall, MatchScorer, ScoreState, UndoSnapshot};
