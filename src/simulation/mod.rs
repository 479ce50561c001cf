//! Game simulation with the optimal policy read from a database.
//!
//! - [`engine`]: play one game or a seeded parallel batch, with score statistics

pub mod engine;

pub use engine::{simulate_batch, simulate_game, GameRecord, SimulationSummary, TurnRecord};
