// Court / participant / rest conflict detection over a match snapshot.
//
// Advisory only: nothing here blocks a write. Callers decide whether to honour
// a reported conflict or override it.

use std::fmt;

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collection::MatchCollection;
use crate::model::{minutes_since_midnight, Match};

pub const MATCH_DURATION_MINUTES: i64 = 45;
pub const REST_BUFFER_MINUTES: i64 = 30;
pub const ROUND_BUFFER_MINUTES: i64 = 15;

/// Timing constants shared by the conflict detector and the auto-scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingRules {
    /// Length of a court booking.
    pub match_duration: Duration,
    /// Minimum gap between two matches sharing a participant.
    pub rest_buffer: Duration,
    /// Extra gap the auto-scheduler leaves between rounds.
    pub round_buffer: Duration,
}

impl Default for SchedulingRules {
    fn default() -> Self {
        Self {
            match_duration: Duration::minutes(MATCH_DURATION_MINUTES),
            rest_buffer: Duration::minutes(REST_BUFFER_MINUTES),
            round_buffer: Duration::minutes(ROUND_BUFFER_MINUTES),
        }
    }
}

/// A proposed court/time for one match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// The match being placed; its own current booking is ignored.
    pub match_id: String,
    pub court: String,
    pub start: NaiveTime,
    /// Entrant ids playing in the match.
    pub participants: Vec<String>,
}

impl Placement {
    /// Placement for an existing match at a new court/time.
    pub fn for_match(m: &Match, court: impl Into<String>, start: NaiveTime) -> Self {
        Self {
            match_id: m.id.clone(),
            court: court.into(),
            start,
            participants: m.participant_ids().into_iter().map(String::from).collect(),
        }
    }
}

/// Whether the other match is before or after the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestDirection {
    After,
    Before,
}

impl fmt::Display for RestDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestDirection::After => f.write_str("after"),
            RestDirection::Before => f.write_str("before"),
        }
    }
}

/// First conflict found for a placement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("court conflict: {court} is booked at {} by {match_id}", .start.format("%H:%M"))]
    Court {
        court: String,
        match_id: String,
        start: NaiveTime,
    },

    #[error("player conflict: {participant} is playing {match_id} at {}", .start.format("%H:%M"))]
    Player {
        participant: String,
        match_id: String,
        start: NaiveTime,
    },

    #[error(
        "rest conflict: {participant} gets only {gap_minutes} min rest {direction} match {match_id} at {}",
        .start.format("%H:%M")
    )]
    Rest {
        participant: String,
        match_id: String,
        start: NaiveTime,
        gap_minutes: i64,
        direction: RestDirection,
    },
}

impl Conflict {
    /// Identifier of the match already holding the contested resource.
    pub fn other_match(&self) -> &str {
        match self {
            Conflict::Court { match_id, .. }
            | Conflict::Player { match_id, .. }
            | Conflict::Rest { match_id, .. } => match_id,
        }
    }
}

/// Check a placement against every other scheduled match.
///
/// Classes are checked in order across the whole collection: court
/// double-booking first, then a participant playing two overlapping matches,
/// then a participant with less than the rest buffer between matches.
pub fn detect_conflict(
    placement: &Placement,
    matches: &MatchCollection,
    rules: &SchedulingRules,
) -> Option<Conflict> {
    // Minutes since midnight, unwrapped, so late bookings still overlap.
    let duration = rules.match_duration.num_minutes();
    let start = minutes_since_midnight(placement.start);
    let end = start + duration;

    let others: Vec<(&Match, NaiveTime, i64, i64)> = matches
        .iter()
        .filter(|m| m.id != placement.match_id)
        .filter_map(|m| {
            let (s, e) = m.booked_minutes(rules.match_duration)?;
            let booked_at = m.schedule.as_ref()?.start;
            Some((m, booked_at, s, e))
        })
        .collect();

    let overlaps = |s: i64, e: i64| start < e && end > s;

    for (m, booked_at, s, e) in &others {
        let same_court = m.schedule.as_ref().is_some_and(|sch| sch.court == placement.court);
        if same_court && overlaps(*s, *e) {
            return Some(Conflict::Court {
                court: placement.court.clone(),
                match_id: m.id.clone(),
                start: *booked_at,
            });
        }
    }

    for (m, booked_at, s, e) in &others {
        if let Some(participant) = shared_participant(placement, m) {
            if overlaps(*s, *e) {
                return Some(Conflict::Player {
                    participant,
                    match_id: m.id.clone(),
                    start: *booked_at,
                });
            }
        }
    }

    let rest = rules.rest_buffer.num_minutes();
    for (m, booked_at, s, e) in &others {
        let Some(participant) = shared_participant(placement, m) else {
            continue;
        };
        let (gap, direction) = if *e <= start {
            (start - *e, RestDirection::After)
        } else if end <= *s {
            (*s - end, RestDirection::Before)
        } else {
            continue;
        };
        if gap < rest {
            return Some(Conflict::Rest {
                participant,
                match_id: m.id.clone(),
                start: *booked_at,
                gap_minutes: gap,
                direction,
            });
        }
    }

    None
}

/// `Ok(())` when the placement is clear, otherwise the first conflict.
pub fn check(
    placement: &Placement,
    matches: &MatchCollection,
    rules: &SchedulingRules,
) -> Result<(), Conflict> {
    match detect_conflict(placement, matches, rules) {
        Some(conflict) => Err(conflict),
        None => Ok(()),
    }
}

/// Display name of the first candidate participant also playing in `other`.
fn shared_participant(placement: &Placement, other: &Match) -> Option<String> {
    [other.side1.entrant(), other.side2.entrant()]
        .into_iter()
        .flatten()
        .find(|e| placement.participants.iter().any(|p| *p == e.id))
        .map(|e| e.display_name())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BracketKind, Entrant, Schedule, Slot};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn booked(id: &str, a: &str, b: &str, court: &str, start: NaiveTime) -> Match {
        let mut m = Match::new(
            id,
            BracketKind::Main,
            "Round",
            Slot::Entrant(Entrant::new(a, a.to_uppercase(), 1)),
            Slot::Entrant(Entrant::new(b, b.to_uppercase(), 2)),
        );
        m.schedule = Some(Schedule::new(court, start));
        m
    }

    fn placement(id: &str, court: &str, start: NaiveTime, who: &[&str]) -> Placement {
        Placement {
            match_id: id.into(),
            court: court.into(),
            start,
            participants: who.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn collection(matches: Vec<Match>) -> MatchCollection {
        MatchCollection::from_matches(matches).unwrap()
    }

    #[test]
    fn overlapping_booking_on_same_court() {
        let matches = collection(vec![booked("R4-M2", "c", "d", "Court 1", at(10, 20))]);
        let p = placement("R4-M1", "Court 1", at(10, 0), &["a", "b"]);
        let conflict = detect_conflict(&p, &matches, &SchedulingRules::default()).unwrap();
        assert_eq!(
            conflict,
            Conflict::Court {
                court: "Court 1".into(),
                match_id: "R4-M2".into(),
                start: at(10, 20),
            }
        );
        assert!(conflict.to_string().contains("Court 1"));
        assert!(conflict.to_string().contains("10:20"));
    }

    #[test]
    fn back_to_back_on_same_court_is_fine() {
        let matches = collection(vec![booked("R4-M2", "c", "d", "Court 1", at(10, 45))]);
        let p = placement("R4-M1", "Court 1", at(10, 0), &["a", "b"]);
        assert_eq!(check(&p, &matches, &SchedulingRules::default()), Ok(()));
    }

    #[test]
    fn same_player_on_another_court_at_the_same_time() {
        let matches = collection(vec![booked("R4-M2", "a", "d", "Court 2", at(10, 30))]);
        let p = placement("R4-M1", "Court 1", at(10, 0), &["a", "b"]);
        let conflict = detect_conflict(&p, &matches, &SchedulingRules::default()).unwrap();
        assert!(matches!(conflict, Conflict::Player { ref participant, .. } if participant == "A"));
    }

    #[test]
    fn insufficient_rest_after_previous_match() {
        let matches = collection(vec![booked("R4-M1", "a", "b", "Court 1", at(10, 0))]);
        let p = placement("R2-M1", "Court 2", at(10, 50), &["a", "c"]);
        let conflict = detect_conflict(&p, &matches, &SchedulingRules::default()).unwrap();
        assert_eq!(
            conflict,
            Conflict::Rest {
                participant: "A".into(),
                match_id: "R4-M1".into(),
                start: at(10, 0),
                gap_minutes: 5,
                direction: RestDirection::After,
            }
        );
        assert!(conflict.to_string().contains("5 min"));
    }

    #[test]
    fn insufficient_rest_before_next_match() {
        let matches = collection(vec![booked("R2-M1", "a", "c", "Court 1", at(11, 0))]);
        let p = placement("R4-M1", "Court 2", at(10, 0), &["a", "b"]);
        let conflict = detect_conflict(&p, &matches, &SchedulingRules::default()).unwrap();
        assert!(matches!(
            conflict,
            Conflict::Rest {
                gap_minutes: 15,
                direction: RestDirection::Before,
                ..
            }
        ));
    }

    #[test]
    fn enough_rest_is_clear() {
        let matches = collection(vec![booked("R4-M1", "a", "b", "Court 1", at(10, 0))]);
        let p = placement("R2-M1", "Court 1", at(11, 15), &["a", "c"]);
        assert!(detect_conflict(&p, &matches, &SchedulingRules::default()).is_none());
    }

    #[test]
    fn own_booking_is_ignored() {
        let matches = collection(vec![booked("R4-M1", "a", "b", "Court 1", at(10, 0))]);
        let p = placement("R4-M1", "Court 1", at(10, 15), &["a", "b"]);
        assert!(detect_conflict(&p, &matches, &SchedulingRules::default()).is_none());
    }

    #[test]
    fn unscheduled_matches_never_conflict() {
        let mut m = booked("R4-M1", "a", "b", "Court 1", at(10, 0));
        m.schedule = None;
        let matches = collection(vec![m]);
        let p = placement("R2-M1", "Court 1", at(10, 0), &["a"]);
        assert!(detect_conflict(&p, &matches, &SchedulingRules::default()).is_none());
    }

    #[test]
    fn late_evening_bookings_still_overlap() {
        let matches = collection(vec![booked("R4-M2", "c", "d", "Court 1", at(23, 30))]);
        let p = placement("R4-M1", "Court 1", at(23, 45), &["a", "b"]);
        let conflict = detect_conflict(&p, &matches, &SchedulingRules::default()).unwrap();
        assert!(matches!(conflict, Conflict::Court { ref match_id, .. } if match_id == "R4-M2"));

        let p = placement("R2-M1", "Court 2", at(23, 50), &["c"]);
        let conflict = detect_conflict(&p, &matches, &SchedulingRules::default()).unwrap();
        assert!(matches!(conflict, Conflict::Player { ref participant, .. } if participant == "c"));
    }

    #[test]
    fn court_conflict_reported_before_player_conflict() {
        let matches = collection(vec![
            booked("GA-0-1", "a", "x", "Court 2", at(10, 0)),
            booked("GA-2-3", "y", "z", "Court 1", at(10, 30)),
        ]);
        let p = placement("GA-0-2", "Court 1", at(10, 0), &["a", "b"]);
        let conflict = detect_conflict(&p, &matches, &SchedulingRules::default()).unwrap();
        assert_eq!(conflict.other_match(), "GA-2-3");
    }
}
