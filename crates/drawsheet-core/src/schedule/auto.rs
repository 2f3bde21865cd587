// Round-by-round auto-scheduler.
//
// Rounds run in tournament order: group stage, then descending round size
// down to the finals. Main and plate matches with the same round size share a
// round. Within a round the court pointer and time cursor advance together;
// each full cycle of courts moves the cursor on by one match duration. The
// day ends at midnight: a match that would finish after it stays unscheduled.

use std::cmp::Reverse;

use chrono::NaiveTime;
use tracing::{debug, info, warn};

use super::conflict::SchedulingRules;
use crate::collection::MatchCollection;
use crate::model::{minutes_since_midnight, Schedule};

const DAY_MINUTES: i64 = 24 * 60;

/// Give every unscheduled match a court and start time. Returns the number of
/// matches placed. Matches that already carry a schedule are left alone and do
/// not use up a court slot.
///
/// No conflict checking is done here: the construction is conflict-free as
/// long as the placed matches were unscheduled to begin with.
pub fn auto_schedule(
    matches: &mut MatchCollection,
    courts: &[String],
    day_start: NaiveTime,
    rules: &SchedulingRules,
) -> usize {
    if courts.is_empty() {
        warn!("Auto-schedule skipped: no courts configured");
        return 0;
    }

    let rounds = ordered_rounds(matches);
    // The cursor becomes `None` once a round runs out of day.
    let (cursor, placed) = rounds.iter().fold(
        (Some(minutes_since_midnight(day_start)), 0),
        |(round_start, placed), round| {
            let Some(start) = round_start else {
                return (None, placed);
            };
            let outcome = schedule_round(matches, round, courts, start, rules);
            let next = (!outcome.out_of_day).then(|| {
                outcome.cursor + rules.match_duration.num_minutes() + rules.round_buffer.num_minutes()
            });
            (next, placed + outcome.placed)
        },
    );
    if cursor.is_none() {
        warn!(
            "Auto-schedule stopped at midnight; {} matches left unscheduled",
            matches.iter().filter(|m| m.schedule.is_none()).count()
        );
    }

    info!(
        "Auto-scheduled {} matches across {} rounds on {} courts",
        placed,
        rounds.len(),
        courts.len()
    );
    placed
}

/// Match identifiers bucketed by round, in playing order.
fn ordered_rounds(matches: &MatchCollection) -> Vec<Vec<String>> {
    let mut buckets: Vec<(Option<u32>, Vec<String>)> = Vec::new();
    for m in matches.iter() {
        match buckets.iter_mut().find(|(key, _)| *key == m.round_size) {
            Some((_, ids)) => ids.push(m.id.clone()),
            None => buckets.push((m.round_size, vec![m.id.clone()])),
        }
    }
    // Unsized (group) rounds first, then largest round size first.
    buckets.sort_by_key(|(key, _)| (key.is_some(), Reverse(*key)));
    buckets.into_iter().map(|(_, ids)| ids).collect()
}

struct RoundOutcome {
    /// Minutes since midnight after the round's last court cycle.
    cursor: i64,
    placed: usize,
    out_of_day: bool,
}

/// Place one round starting `start` minutes after midnight.
fn schedule_round(
    matches: &mut MatchCollection,
    round: &[String],
    courts: &[String],
    start: i64,
    rules: &SchedulingRules,
) -> RoundOutcome {
    let duration = rules.match_duration.num_minutes();
    let mut outcome = RoundOutcome {
        cursor: start,
        placed: 0,
        out_of_day: false,
    };
    let mut court = 0;

    for id in round {
        let Some(m) = matches.get_mut(id) else {
            continue;
        };
        if m.schedule.is_some() {
            continue;
        }
        let Some(time) = time_of_day(outcome.cursor, duration) else {
            outcome.out_of_day = true;
            break;
        };
        m.schedule = Some(Schedule::new(courts[court].clone(), time));
        debug!("{} -> {} at {}", m.id, courts[court], time.format("%H:%M"));
        outcome.placed += 1;

        court += 1;
        if court == courts.len() {
            court = 0;
            outcome.cursor += duration;
        }
    }
    outcome
}

/// Start time for a match at `minutes`, if it finishes by midnight.
fn time_of_day(minutes: i64, duration: i64) -> Option<NaiveTime> {
    if minutes + duration > DAY_MINUTES {
        return None;
    }
    let seconds = u32::try_from(minutes * 60).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
