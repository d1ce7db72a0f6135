//! Round logic: the room state machine and the algorithms it runs

mod roles;
mod room;
mod tally;

pub use roles::{choose_impostors, impostor_quota};
pub use room::{Admission, Departure, Phase, Room};
pub use tally::{tally, Outcome, Tally};
