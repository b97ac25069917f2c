//! Fleet simulation for exercising a running server.

mod fleet;
mod track;

pub use fleet::{random_fleet, FleetArea};
pub use track::StraightTrack;
