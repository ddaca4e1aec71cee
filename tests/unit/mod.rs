//! Unit tests for dreamline modules
//!
//! These run against the public API with tokio's paused clock, so every
//! timing assertion is exact and no test sleeps in real time.

mod test_config;
mod test_plan_file;
mod test_player;
