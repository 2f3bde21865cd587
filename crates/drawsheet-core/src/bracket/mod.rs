// Bracket construction and progression.

pub mod draw;
pub mod group;
pub mod id;
pub mod plate;
pub mod progression;

pub use draw::{bracket_size, generate_main_draw, round_name, seed_positions};
pub use group::{generate_groups, standings, Group, Standing};
pub use id::MatchId;
pub use plate::generate_plate;
pub use progression::{advance, advance_all, Progression};
