// Seeded single-elimination main draw.

use tracing::info;

use super::id::MatchId;
use crate::collection::MatchCollection;
use crate::model::{BracketKind, Entrant, Match, Slot};

/// Draw size for `entrants` players: the smallest power of two that holds
/// them, never less than two so a single entrant still gets a final.
pub fn bracket_size(entrants: usize) -> usize {
    if entrants == 0 {
        0
    } else {
        entrants.next_power_of_two().max(2)
    }
}

/// Seed index placed at each draw line, built by recursive doubling:
/// `[0, 1]` for two lines, then each `p` becomes `p, n - 1 - p`.
///
/// The top two seeds land in opposite halves, the top four in different
/// quarters, and so on.
pub fn seed_positions(size: usize) -> Vec<usize> {
    if size <= 1 {
        return vec![0; size];
    }
    let mut positions = vec![0, 1];
    let mut n = 2;
    while n < size {
        n *= 2;
        positions = positions.iter().flat_map(|&p| [p, n - 1 - p]).collect();
    }
    positions
}

/// Label for a round holding `round_size` matches.
pub fn round_name(round_size: u32) -> String {
    match round_size {
        1 => "Final".to_string(),
        2 => "Semi Final".to_string(),
        4 => "Quarter Final".to_string(),
        n => format!("Round of {}", n * 2),
    }
}

/// Build the main draw: seeded first round, then empty rounds down to the
/// final. Zero entrants give an empty collection.
pub fn generate_main_draw(entrants: &[Entrant]) -> MatchCollection {
    let mut collection = MatchCollection::new();
    let size = bracket_size(entrants.len());
    if size == 0 {
        return collection;
    }

    let mut seeded: Vec<&Entrant> = entrants.iter().collect();
    seeded.sort_by_key(|e| e.rank);

    let line = |seed: usize| -> Slot {
        seeded
            .get(seed)
            .map(|e| Slot::Entrant((*e).clone()))
            .unwrap_or(Slot::Bye)
    };

    let positions = seed_positions(size);
    let first_round = (size / 2) as u32;

    for (i, pair) in positions.chunks(2).enumerate() {
        let id = MatchId::main(first_round, i as u32 + 1);
        let mut m = Match::new(
            id.to_string(),
            BracketKind::Main,
            round_name(first_round),
            line(pair[0]),
            line(pair[1]),
        );
        m.round_size = Some(first_round);
        push(&mut collection, m);
    }

    let mut round_size = first_round / 2;
    while round_size >= 1 {
        for index in 1..=round_size {
            let mut m = Match::new(
                MatchId::main(round_size, index).to_string(),
                BracketKind::Main,
                round_name(round_size),
                Slot::tbd(),
                Slot::tbd(),
            );
            m.round_size = Some(round_size);
            push(&mut collection, m);
        }
        round_size /= 2;
    }

    info!(
        "Generated main draw: {} entrants, size {}, {} byes, {} matches",
        entrants.len(),
        size,
        size - entrants.len(),
        collection.len()
    );
    collection
}

// Identifiers produced above are unique by construction.
fn push(collection: &mut MatchCollection, m: Match) {
    if let Err(e) = collection.insert(m) {
        tracing::error!("draw generation produced {e}");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
