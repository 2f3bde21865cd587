// Winner/loser progression across the main and plate brackets.
//
// Every downstream slot is found by identifier arithmetic: the winner of
// R{n}-M{i} moves to R{n/2}-M{ceil(i/2)}, side one for odd i and side two for
// even i. A main-bracket loser goes to PLATE-R{n/2}-M{ceil(i/2)} whenever that
// plate match exists.

use tracing::{debug, warn};

use super::id::MatchId;
use crate::collection::MatchCollection;
use crate::error::{EngineError, EngineResult};
use crate::model::{BracketKind, Side, Slot};

/// Where a progression run placed the winner and loser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progression {
    pub winner_to: Option<(String, Side)>,
    pub loser_to: Option<(String, Side)>,
}

impl Progression {
    pub fn is_empty(&self) -> bool {
        self.winner_to.is_none() && self.loser_to.is_none()
    }
}

/// Place the winner (and, for main matches with a plate counterpart, the
/// loser) of a finished match into their downstream slots.
///
/// Unfinished and group matches are a no-op. Re-running after a corrected
/// result overwrites the slots written previously. A missing plate match is
/// a silent no-op.
pub fn advance(matches: &mut MatchCollection, match_id: &str) -> EngineResult<Progression> {
    let finished = matches.require(match_id)?;
    if !finished.status.is_terminal() {
        return Ok(Progression::default());
    }

    let id: MatchId = match match_id.parse() {
        Ok(id) => id,
        Err(e) => {
            warn!("Skipping progression for {}: {}", match_id, e);
            return Err(e);
        }
    };
    if id.kind() == BracketKind::Group {
        return Ok(Progression::default());
    }

    let winner_side = match finished.winner_side() {
        Some(side) => side,
        // Nobody on either line: the bye itself moves on.
        None if finished.side1.is_bye() && finished.side2.is_bye() => Side::One,
        None => {
            return Err(EngineError::AmbiguousWinner {
                match_id: match_id.to_string(),
                reason: "winner is not one of the assigned entrants".to_string(),
            })
        }
    };
    let winner = finished.slot(winner_side).clone();
    let loser = finished.slot(winner_side.opponent()).clone();

    let Some(side) = id.feeds_side() else {
        return Ok(Progression::default());
    };

    let mut progression = Progression::default();

    if let Some(next) = id.next_round() {
        let next_id = next.to_string();
        match matches.get_mut(&next_id) {
            Some(target) => {
                *target.slot_mut(side) = winner;
                debug!("{} winner -> {} {}", match_id, next_id, side);
                progression.winner_to = Some((next_id, side));
            }
            None => warn!("{} has no downstream match {}", match_id, next_id),
        }
    }

    if let Some(plate) = plate_target(matches, &id) {
        let loser_slot = match loser {
            Slot::Entrant(_) => Some(loser),
            // An unopposed winner leaves nobody to drop; the plate slot
            // becomes a bye so its match can still resolve.
            Slot::Bye => Some(Slot::Bye),
            Slot::Pending { .. } => None,
        };
        if let (Some(slot), Some(target)) = (loser_slot, matches.get_mut(&plate)) {
            *target.slot_mut(side) = slot;
            debug!("{} loser -> {} {}", match_id, plate, side);
            progression.loser_to = Some((plate, side));
        }
    }

    Ok(progression)
}

/// Plate match mirroring this main match's next round, if it exists.
fn plate_target(matches: &MatchCollection, id: &MatchId) -> Option<String> {
    let plate_id = id.plate_counterpart()?.to_string();
    matches.contains(&plate_id).then_some(plate_id)
}

/// Run progression for every finished match, in collection order.
///
/// Failures are recovered locally: each one is logged and returned, and the
/// remaining matches still advance.
pub fn advance_all(matches: &mut MatchCollection) -> Vec<EngineError> {
    let finished: Vec<String> = matches
        .iter()
        .filter(|m| m.status.is_terminal())
        .map(|m| m.id.clone())
        .collect();

    let mut errors = Vec::new();
    for id in finished {
        if let Err(e) = advance(matches, &id) {
            warn!("Progression failed for {}: {}", id, e);
            errors.push(e);
        }
    }
    errors
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::draw::generate_main_draw;
    use crate::bracket::plate::generate_plate;
    use crate::model::{Entrant, Match, MatchStatus};

    fn entrants(n: usize) -> Vec<Entrant> {
        (1..=n)
            .map(|i| Entrant::new(format!("p{i}"), format!("P{i}"), i as u32))
            .collect()
    }

    fn with_plate(n: usize) -> MatchCollection {
        let mut matches = generate_main_draw(&entrants(n));
        let plate = generate_plate(&matches).unwrap();
        matches.extend(plate).unwrap();
        matches
    }

    fn finish(matches: &mut MatchCollection, id: &str, winner: Side) {
        let m = matches.get_mut(id).unwrap();
        m.status = MatchStatus::Completed;
        m.winner_id = m.entrant(winner).map(|e| e.id.clone());
    }

    fn name(matches: &MatchCollection, id: &str, side: Side) -> String {
        matches.get(id).unwrap().slot(side).label()
    }

    #[test]
    fn quarter_final_feeds_semi_and_plate() {
        let mut matches = with_plate(8);
        finish(&mut matches, "R4-M1", Side::One);

        let p = advance(&mut matches, "R4-M1").unwrap();
        assert_eq!(p.winner_to, Some(("R2-M1".into(), Side::One)));
        assert_eq!(p.loser_to, Some(("PLATE-R2-M1".into(), Side::One)));
        assert_eq!(name(&matches, "R2-M1", Side::One), "P1");
        assert_eq!(name(&matches, "PLATE-R2-M1", Side::One), "P8");
    }

    #[test]
    fn even_index_fills_side_two() {
        let mut matches = with_plate(8);
        finish(&mut matches, "R4-M4", Side::Two);
        advance(&mut matches, "R4-M4").unwrap();
        assert_eq!(name(&matches, "R2-M2", Side::Two), "P6");
        assert_eq!(name(&matches, "PLATE-R2-M2", Side::Two), "P3");
    }

    #[test]
    fn missing_plate_is_a_silent_no_op() {
        let mut matches = generate_main_draw(&entrants(8));
        finish(&mut matches, "R4-M2", Side::One);
        let p = advance(&mut matches, "R4-M2").unwrap();
        assert_eq!(p.winner_to, Some(("R2-M1".into(), Side::Two)));
        assert_eq!(p.loser_to, None);
    }

    #[test]
    fn second_round_loser_feeds_existing_plate_match() {
        let mut matches = with_plate(16);
        for i in 1..=2 {
            finish(&mut matches, &format!("R8-M{i}"), Side::One);
            advance(&mut matches, &format!("R8-M{i}")).unwrap();
        }
        finish(&mut matches, "R4-M1", Side::One);
        let p = advance(&mut matches, "R4-M1").unwrap();
        assert_eq!(p.winner_to, Some(("R2-M1".into(), Side::One)));
        assert_eq!(p.loser_to, Some(("PLATE-R2-M1".into(), Side::One)));
        assert_eq!(name(&matches, "PLATE-R2-M1", Side::One), "P8");
    }

    #[test]
    fn semi_final_loser_goes_to_plate_final() {
        let mut matches = with_plate(4);
        for i in 1..=2 {
            finish(&mut matches, &format!("R2-M{i}"), Side::One);
            advance(&mut matches, &format!("R2-M{i}")).unwrap();
        }
        assert_eq!(name(&matches, "PLATE-R1-M1", Side::Two), "P3");
    }

    #[test]
    fn corrected_result_overwrites_downstream_slot() {
        let mut matches = with_plate(8);
        finish(&mut matches, "R4-M2", Side::One);
        advance(&mut matches, "R4-M2").unwrap();
        assert_eq!(name(&matches, "R2-M1", Side::Two), "P4");

        finish(&mut matches, "R4-M2", Side::Two);
        advance(&mut matches, "R4-M2").unwrap();
        assert_eq!(name(&matches, "R2-M1", Side::Two), "P5");
        assert_eq!(name(&matches, "PLATE-R2-M1", Side::Two), "P4");
    }

    #[test]
    fn plate_winner_moves_through_plate() {
        let mut matches = with_plate(8);
        for i in 1..=2 {
            finish(&mut matches, &format!("R4-M{i}"), Side::One);
            advance(&mut matches, &format!("R4-M{i}")).unwrap();
        }
        finish(&mut matches, "PLATE-R2-M1", Side::Two);
        let p = advance(&mut matches, "PLATE-R2-M1").unwrap();
        assert_eq!(p.winner_to, Some(("PLATE-R1-M1".into(), Side::One)));
        assert_eq!(p.loser_to, None);
        assert_eq!(name(&matches, "PLATE-R1-M1", Side::One), "P5");
    }

    #[test]
    fn final_has_nowhere_to_go() {
        let mut matches = generate_main_draw(&entrants(2));
        finish(&mut matches, "R1-M1", Side::Two);
        assert!(advance(&mut matches, "R1-M1").unwrap().is_empty());
    }

    #[test]
    fn unfinished_match_is_not_advanced() {
        let mut matches = generate_main_draw(&entrants(4));
        assert!(advance(&mut matches, "R2-M1").unwrap().is_empty());
        assert_eq!(name(&matches, "R1-M1", Side::One), "TBD");
    }

    #[test]
    fn malformed_identifier_is_reported_and_isolated() {
        let mut matches = generate_main_draw(&entrants(4));
        let mut rogue = Match::new(
            "LIVE-001",
            BracketKind::Main,
            "Friendly",
            Slot::Entrant(Entrant::new("x", "X", 9)),
            Slot::Entrant(Entrant::new("y", "Y", 10)),
        );
        rogue.status = MatchStatus::Completed;
        rogue.winner_id = Some("x".into());
        matches.insert(rogue).unwrap();
        finish(&mut matches, "R2-M2", Side::One);

        let errors = advance_all(&mut matches);
        assert_eq!(
            errors,
            vec![EngineError::MalformedIdentifier {
                id: "LIVE-001".into()
            }]
        );
        assert_eq!(name(&matches, "R1-M1", Side::Two), "P2");
    }

    #[test]
    fn empty_match_passes_its_bye_on() {
        let mut matches = with_plate(8);
        let plate = matches.get_mut("PLATE-R2-M2").unwrap();
        plate.side1 = Slot::Bye;
        plate.side2 = Slot::Bye;
        plate.status = MatchStatus::Walkover;

        let p = advance(&mut matches, "PLATE-R2-M2").unwrap();
        assert_eq!(p.winner_to, Some(("PLATE-R1-M1".into(), Side::Two)));
        assert!(matches.get("PLATE-R1-M1").unwrap().side2.is_bye());
    }

    #[test]
    fn completed_without_winner_is_ambiguous() {
        let mut matches = generate_main_draw(&entrants(4));
        matches.get_mut("R2-M1").unwrap().status = MatchStatus::Completed;
        assert!(matches!(
            advance(&mut matches, "R2-M1"),
            Err(EngineError::AmbiguousWinner { .. })
        ));
    }

    #[test]
    fn bye_winner_leaves_plate_bye() {
        let mut matches = generate_main_draw(&entrants(5));
        let plate = generate_plate(&matches).unwrap();
        matches.extend(plate).unwrap();
        finish(&mut matches, "R4-M1", Side::One);
        advance(&mut matches, "R4-M1").unwrap();
        assert!(matches.get("PLATE-R2-M1").unwrap().side1.is_bye());
    }
}
