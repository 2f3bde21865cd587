// Round-robin referee assignment.

use tracing::info;

use crate::collection::MatchCollection;
use crate::error::{EngineError, EngineResult};
use crate::model::Official;

/// Hand out active officials in turn to every match without a referee.
/// Matches that already have one are skipped and do not advance the rota.
/// Returns the number of matches assigned.
pub fn assign_referees(matches: &mut MatchCollection, officials: &[Official]) -> EngineResult<usize> {
    let rota: Vec<&Official> = officials.iter().filter(|o| o.active).collect();
    if rota.is_empty() {
        return Err(EngineError::NoOfficials);
    }

    let mut assigned = 0;
    for m in matches.iter_mut().filter(|m| m.referee.is_none()) {
        m.referee = Some(rota[assigned % rota.len()].name.clone());
        assigned += 1;
    }

    info!("Assigned referees to {} matches from {} officials", assigned, rota.len());
    Ok(assigned)
}
