pub mod auto;
pub mod conflict;
pub mod referee;

pub use auto::auto_schedule;
pub use conflict::{check, detect_conflict, Conflict, Placement, RestDirection, SchedulingRules};
pub use referee::assign_referees;
