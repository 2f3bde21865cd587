// Append-only per-match event log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Score,
    Decision,
    GameEnd,
    MatchEnd,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventDetail {
    Normal,
    Stroke,
    NoLet,
    Let,
    ConductWarning,
    GameWin,
    Start,
}

/// One entry in a match's scoring log. Never edited once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub detail: EventDetail,
    /// Side that benefited or was involved, if any.
    pub side: Option<Side>,
    pub description: String,
    /// Current-game score after the event, e.g. "10-8".
    pub score_snapshot: String,
}

impl ScoreEvent {
    pub fn is_point(&self) -> bool {
        self.kind == EventKind::Score
    }
}
