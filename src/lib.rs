//! # Yahtzee: optimal single-player strategy
//!
//! Computes the expected final score and the optimal action for every
//! reachable game state and every dice configuration of standard Yahtzee,
//! persists the result as a memory-mappable database and answers queries
//! against it in constant time.
//!
//! ## Pipeline
//!
//! | Step | Module | Description |
//! |------|--------|-------------|
//! | Codecs | [`dice_mechanics`], [`state_codec`] | Rolls as base-7 codes (252 valid), states as 20-bit codes, dense reachable-state index |
//! | Rules | [`game_mechanics`] | Category scores, forced joker rule, upper bonus (35) and Yahtzee bonus (100) |
//! | Tables | [`phase0_tables`] | Roll enumeration, reroll distributions, keep-multiset transition table; built once per process |
//! | Solve | [`state_computation`], [`widget_solver`] | Backward induction by rank, three roll stages per state |
//! | Persist | [`storage`] | `YZDB` v1 file: header, f64 state values, 5-byte records |
//! | Query | [`api_computations`] | `lookup`, `best_action`, `keep_first`, `keep_second` |
//! | Advise | [`advisor`] | Turn-by-turn session over score cards: keep advice, ranked categories, multiplayer |
//! | Boundary | [`boundary`] | Tagged results with error codes, handle table, one-time init |
//!
//! ## State representation
//!
//! A turn-start state is (used categories, capped upper total, Yahtzee bonus
//! flag). The upper bonus is paid by the action that crosses 63, so the
//! terminal state is always worth 0 and the upper total never needs to exceed
//! the cap.
//!
//! All values are accumulated in f64 in increasing roll index; solving the
//! same root twice gives byte-identical databases.

#![allow(clippy::needless_range_loop)]

pub mod advisor;
pub mod api_computations;
pub mod boundary;
pub mod constants;
pub mod dice_mechanics;
pub mod env_config;
pub mod error;
pub mod game_mechanics;
pub mod phase0_tables;
pub mod simulation;
pub mod state_codec;
pub mod state_computation;
pub mod storage;
pub mod types;
pub mod widget_solver;

pub use api_computations::QueryEngine;
pub use dice_mechanics::Roll;
pub use error::{Error, ErrorKind, Result};
pub use state_codec::GameState;
pub use storage::Database;
