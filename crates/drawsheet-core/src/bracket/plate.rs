// Plate (consolation) bracket, fed by losers of the main draw's first round.

use tracing::info;

use super::id::MatchId;
use crate::collection::MatchCollection;
use crate::error::{EngineError, EngineResult};
use crate::model::{BracketKind, Match, Slot};

pub fn plate_round_name(round_size: u32) -> String {
    format!("Plate {}", super::draw::round_name(round_size))
}

/// Plate round that receives first-round losers: half the size of the
/// deepest main round.
pub fn plate_entry_round(matches: &MatchCollection) -> Option<u32> {
    matches
        .max_round_size(BracketKind::Main)
        .filter(|&size| size > 1)
        .map(|size| size / 2)
}

/// Build plate matches mirroring the main draw below its first round.
///
/// Entry-round slots are labelled with the main match whose loser will fill
/// them; deeper rounds are plain TBD. Slots are only ever filled by
/// progression.
pub fn generate_plate(matches: &MatchCollection) -> EngineResult<Vec<Match>> {
    let entry = plate_entry_round(matches).ok_or(EngineError::PlateUnavailable)?;
    let feeder_round = entry * 2;

    let mut plate = Vec::new();
    let mut round_size = entry;
    while round_size >= 1 {
        for index in 1..=round_size {
            let (side1, side2) = if round_size == entry {
                (
                    loser_of(MatchId::main(feeder_round, index * 2 - 1)),
                    loser_of(MatchId::main(feeder_round, index * 2)),
                )
            } else {
                (Slot::tbd(), Slot::tbd())
            };
            let mut m = Match::new(
                MatchId::plate(round_size, index).to_string(),
                BracketKind::Plate,
                plate_round_name(round_size),
                side1,
                side2,
            );
            m.round_size = Some(round_size);
            plate.push(m);
        }
        round_size /= 2;
    }

    info!(
        "Generated plate bracket: entry round {}, {} matches",
        entry,
        plate.len()
    );
    Ok(plate)
}

fn loser_of(feeder: MatchId) -> Slot {
    Slot::Pending {
        label: format!("Loser of {feeder}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
