//! Monte Carlo play against the strategy database.
//!
//! Each turn rolls five dice, keeps per `keep_first`, rerolls the rest, keeps
//! per `keep_second`, rerolls again and scores per `best_action`. Games start
//! at the database root, so the mean score converges to `lookup(root)`.

use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::api_computations::QueryEngine;
use crate::constants::*;
use crate::dice_mechanics::Roll;
use crate::error::Result;
use crate::game_mechanics::apply_category;
use crate::state_codec::GameState;

/// Roll fresh dice to fill the kept ones up to five.
#[inline(always)]
fn roll_dice<R: Rng>(kept: &[u8], rng: &mut R) -> Vec<u8> {
    let mut dice = kept.to_vec();
    while dice.len() < DICE_COUNT {
        dice.push(rng.random_range(1..=FACE_COUNT as u8));
    }
    dice.sort_unstable();
    dice
}

/// One turn of a recorded game.
#[derive(Clone, Debug, Serialize)]
pub struct TurnRecord {
    pub state: u32,
    pub first_roll: Vec<u8>,
    pub first_keep: Vec<u8>,
    pub second_roll: Vec<u8>,
    pub second_keep: Vec<u8>,
    pub final_roll: Vec<u8>,
    pub category: usize,
    pub points: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct GameRecord {
    pub turns: Vec<TurnRecord>,
    pub total: u32,
}

fn play_turn<R: Rng>(
    engine: &QueryEngine<'_>,
    state: &GameState,
    rng: &mut R,
) -> Result<(TurnRecord, GameState)> {
    let code = state.encode();
    let first_roll = roll_dice(&[], rng);
    let first_keep = engine.keep_first(code, &first_roll)?;
    let second_roll = roll_dice(&first_keep, rng);
    let second_keep = engine.keep_second(code, &second_roll)?;
    let final_roll = roll_dice(&second_keep, rng);
    let category = engine.best_action(code, &final_roll)?;
    let (points, next) = apply_category(state, &Roll::from_dice(&final_roll)?, category)?;
    let turn = TurnRecord {
        state: code,
        first_roll,
        first_keep,
        second_roll,
        second_keep,
        final_roll,
        category,
        points,
    };
    Ok((turn, next))
}

/// Play from the database root to the end, recording every decision.
pub fn simulate_game_with_recording<R: Rng>(
    engine: &QueryEngine<'_>,
    rng: &mut R,
) -> Result<GameRecord> {
    let mut state = GameState::decode(engine.root())?;
    let mut turns = Vec::with_capacity(CATEGORY_COUNT);
    let mut total = 0;
    while !state.is_terminal() {
        let (turn, next) = play_turn(engine, &state, rng)?;
        total += turn.points;
        turns.push(turn);
        state = next;
    }
    Ok(GameRecord { turns, total })
}

/// Play from the database root to the end; returns the points scored.
pub fn simulate_game<R: Rng>(engine: &QueryEngine<'_>, rng: &mut R) -> Result<u32> {
    let mut state = GameState::decode(engine.root())?;
    let mut total = 0;
    while !state.is_terminal() {
        let (turn, next) = play_turn(engine, &state, rng)?;
        total += turn.points;
        state = next;
    }
    Ok(total)
}

/// Score statistics of a simulated batch.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationSummary {
    pub games: usize,
    pub seed: u64,
    pub root: u32,
    pub expected: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub min: u32,
    pub max: u32,
    pub median: u32,
    pub elapsed_secs: f64,
    #[serde(skip)]
    pub scores: Vec<u32>,
}

/// Play `games` games in parallel. Game `i` uses `SmallRng` seeded with
/// `seed + i`, so a batch is reproducible regardless of thread count.
pub fn simulate_batch(
    engine: &QueryEngine<'_>,
    games: usize,
    seed: u64,
) -> Result<SimulationSummary> {
    let start = Instant::now();

    let mut scores = (0..games)
        .into_par_iter()
        .map(|i| {
            let mut rng = SmallRng::seed_from_u64(seed.wrapping_add(i as u64));
            simulate_game(engine, &mut rng)
        })
        .collect::<Result<Vec<u32>>>()?;

    let elapsed = start.elapsed();

    let n = games.max(1) as f64;
    let mean = scores.iter().map(|&s| s as f64).sum::<f64>() / n;
    let variance = scores
        .iter()
        .map(|&s| (s as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    let min = scores.iter().copied().min().unwrap_or(0);
    let max = scores.iter().copied().max().unwrap_or(0);
    scores.sort_unstable();
    let median = scores.get(games / 2).copied().unwrap_or(0);
    let expected = engine.lookup(engine.root())?;

    info!(
        games,
        seed,
        mean,
        std_dev = variance.sqrt(),
        expected,
        secs = elapsed.as_secs_f64(),
        "simulation finished"
    );

    Ok(SimulationSummary {
        games,
        seed,
        root: engine.root(),
        expected,
        mean,
        std_dev: variance.sqrt(),
        min,
        max,
        median,
        elapsed_secs: elapsed.as_secs_f64(),
        scores,
    })
}
