//! Library surface of the Seaway server, shared by the binary and tests.

pub mod api;
pub mod backoff;
pub mod config;
pub mod land;
pub mod loops;
pub mod persistence;
pub mod route_planner;
pub mod state;
