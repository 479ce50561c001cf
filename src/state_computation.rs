//! Backward induction over every state reachable from a root.
//!
//! Ranks (number of used categories) are solved from 13 down to the root's
//! rank. Within a rank, states are independent: each worker owns one state's
//! value slot and record block, and reads only the values of higher ranks,
//! which sit after the rank in reachable-index order. `split_at_mut` at the end
//! of the rank hands out exactly those two views, so no unsafe sharing is needed.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use tracing::info;

use crate::constants::*;
use crate::error::Result;
use crate::phase0_tables::tables;
use crate::state_codec::{GameState, Reachability};
use crate::types::ValueTable;
use crate::widget_solver::{solve_state, SuccessorValues};

struct ComputeProgress {
    total_states: usize,
    completed_states: usize,
    start_time: Instant,
    states_per_level: [usize; CATEGORY_COUNT + 1],
    time_per_level: [f64; CATEGORY_COUNT + 1],
}

impl ComputeProgress {
    fn new(reach: &Reachability) -> Self {
        let mut states_per_level = [0usize; CATEGORY_COUNT + 1];
        for (rank, n) in states_per_level.iter_mut().enumerate() {
            *n = reach.rank_range(rank).len();
        }
        Self {
            total_states: reach.len(),
            completed_states: 0,
            start_time: Instant::now(),
            states_per_level,
            time_per_level: [0.0; CATEGORY_COUNT + 1],
        }
    }

    fn finish_level(&mut self, level: usize, seconds: f64) {
        self.completed_states += self.states_per_level[level];
        self.time_per_level[level] = seconds;
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let rate = self.completed_states as f64 / elapsed.max(1e-9);
        info!(
            level,
            states = self.states_per_level[level],
            level_secs = seconds,
            completed = self.completed_states,
            total = self.total_states,
            rate = rate.round(),
            "level solved"
        );
    }

    fn report(&self) {
        for level in 0..=CATEGORY_COUNT {
            if self.states_per_level[level] > 0 {
                info!(
                    level,
                    states = self.states_per_level[level],
                    secs = self.time_per_level[level],
                    "level timing"
                );
            }
        }
        info!(
            states = self.total_states,
            secs = self.start_time.elapsed().as_secs_f64(),
            "state value computation complete"
        );
    }
}

/// Offline solver for the sub-game rooted at one state.
pub struct ValueSolver {
    reach: Reachability,
}

impl ValueSolver {
    /// Enumerate the states reachable from `root_code` (RangeError if the root is
    /// malformed or not reachable from the empty scorecard).
    pub fn new(root_code: u32) -> Result<Self> {
        let reach = Reachability::from_root(root_code)?;
        info!(
            root = format_args!("{:#x}", root_code),
            reachable = reach.len(),
            "reachable states enumerated"
        );
        Ok(Self { reach })
    }

    pub fn reachability(&self) -> &Reachability {
        &self.reach
    }

    /// Solve every reachable state.
    ///
    /// Panics if the reachable index is not a bijection, if some state is not
    /// solved exactly once, or if a value exceeds the points still obtainable.
    pub fn solve(self) -> ValueTable {
        let tables = tables();
        let reach = self.reach;
        check_index_bijection(&reach);

        let n = reach.len();
        let mut state_values = vec![0.0f64; n];
        let mut record_values = vec![0.0f32; n * RECORDS_PER_STATE];
        let mut record_actions = vec![0u8; n * RECORDS_PER_STATE];
        let visited = AtomicUsize::new(0);

        let mut progress = ComputeProgress::new(&reach);
        info!(
            total = progress.total_states,
            "starting state value computation"
        );

        let root_rank = reach.root().used_count();
        for level in (root_rank..=CATEGORY_COUNT).rev() {
            let range = reach.rank_range(level);
            if range.is_empty() {
                continue;
            }
            let level_start = Instant::now();

            let (head, solved) = state_values.split_at_mut(range.end);
            let successors = SuccessorValues {
                reach: &reach,
                values: solved,
                offset: range.end,
            };
            let rec_lo = range.start * RECORDS_PER_STATE;
            let rec_hi = range.end * RECORDS_PER_STATE;

            head[range.start..]
                .par_iter_mut()
                .zip(record_values[rec_lo..rec_hi].par_chunks_mut(RECORDS_PER_STATE))
                .zip(record_actions[rec_lo..rec_hi].par_chunks_mut(RECORDS_PER_STATE))
                .enumerate()
                .for_each(|(i, ((value, rec_vals), rec_acts))| {
                    let state = reach.state_at(range.start + i);
                    let v = solve_state(tables, &state, &successors, rec_vals, rec_acts);
                    check_bound(&state, v);
                    *value = v;
                    visited.fetch_add(1, Ordering::Relaxed);
                });

            progress.finish_level(level, level_start.elapsed().as_secs_f64());
        }

        let solved = visited.load(Ordering::Relaxed);
        assert_eq!(
            solved, n,
            "solved {} states but {} are reachable",
            solved, n
        );
        progress.report();
        info!(root_value = state_values[0], "root state value");

        ValueTable {
            reach,
            state_values,
            record_values,
            record_actions,
        }
    }
}

/// Convenience: enumerate and solve in one call.
pub fn solve_from(root_code: u32) -> Result<ValueTable> {
    Ok(ValueSolver::new(root_code)?.solve())
}

fn check_index_bijection(reach: &Reachability) {
    for i in 0..reach.len() {
        let code = reach.code_at(i);
        let state = match GameState::decode(code) {
            Ok(s) => s,
            Err(e) => panic!("reachable code {:#x} does not decode: {}", code, e),
        };
        assert_eq!(state.encode(), code, "state code {:#x} does not round-trip", code);
        assert_eq!(
            reach.index_of(code),
            Some(i),
            "reachable index of {:#x} is not {}",
            code,
            i
        );
    }
}

#[inline]
fn check_bound(state: &GameState, value: f64) {
    let bound = state.upper_bound_points();
    assert!(
        value <= bound + 1e-9,
        "state {:#x} ({}) has value {} above its bound {}",
        state.encode(),
        state,
        value,
        bound
    );
}
