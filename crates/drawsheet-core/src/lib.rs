// Library root: knockout tournament engine (draws, plate, progression,
// scheduling, live scoring) plus config and persistence.

pub mod bracket;
pub mod collection;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod schedule;
pub mod scoring;
pub mod tournament;

pub use collection::MatchCollection;
pub use error::{EngineError, EngineResult};
pub use tournament::{HeadToHead, Tournament, TournamentSettings};
