//! Background loops for continuous processing.

pub mod ais_feed_loop;
pub mod position_persist_loop;
