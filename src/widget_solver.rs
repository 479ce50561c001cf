//! Per-state solve: all three roll stages of one turn-start state.
//!
//! For a state S with successors already solved:
//!   1. Stage 2: E2[r] = max over legal c of points(S, r, c) + V(next(S, r, c))
//!   2. Stage 1: E1[r] = max over keeps K of r of sum P(K -> r') * E2[r']
//!   3. Stage 0: E0[r] = same as stage 1, reading E1
//!   4. V(S) = sum P(fresh -> r) * E0[r]
//!
//! Keep expectations are evaluated once per keep-multiset row and shared by
//! every roll containing that keep. All sums run in increasing roll index.

use crate::constants::*;
use crate::game_mechanics::for_each_action;
use crate::state_codec::{GameState, Reachability};
use crate::types::{KeepTable, RollStage, Tables};

/// Read access to the solved values of higher ranks.
pub struct SuccessorValues<'a> {
    pub reach: &'a Reachability,
    /// Values of reachable indices `offset..`.
    pub values: &'a [f64],
    pub offset: usize,
}

impl SuccessorValues<'_> {
    #[inline(always)]
    fn get(&self, state: &GameState) -> f64 {
        match self.reach.index_of(state.encode()) {
            Some(i) if i >= self.offset => self.values[i - self.offset],
            _ => panic!(
                "successor {:#x} ({}) is not in a solved rank",
                state.encode(),
                state
            ),
        }
    }
}

/// Stage-2 values and optimal categories for every roll.
pub fn compute_best_scoring_values(
    tables: &Tables,
    state: &GameState,
    successors: &SuccessorValues<'_>,
    e_final: &mut [f64; NUM_DICE_SETS],
    best_category: &mut [u8; NUM_DICE_SETS],
) {
    for (ds_i, roll) in tables.rolls.iter().enumerate() {
        let mut best_val = f64::NEG_INFINITY;
        let mut best_cat = NO_ACTION;
        for_each_action(state, roll, &tables.scores[ds_i], |cat, points, next| {
            let val = points as f64 + successors.get(&next);
            if val > best_val {
                best_val = val;
                best_cat = cat as u8;
            }
        });
        e_final[ds_i] = best_val;
        best_category[ds_i] = best_cat;
    }
}

/// Expected value of every keep-multiset against the values of the next stage.
#[inline]
fn compute_keep_expectations(kt: &KeepTable, e_next: &[f64; NUM_DICE_SETS], keep_ev: &mut [f64]) {
    for (k, ev_out) in keep_ev.iter_mut().enumerate() {
        let start = kt.row_start[k] as usize;
        let end = kt.row_start[k + 1] as usize;
        let mut ev = 0.0;
        for i in start..end {
            ev += kt.vals[i] * e_next[kt.cols[i] as usize];
        }
        *ev_out = ev;
    }
}

/// One reroll stage: best keep per roll, given the values after the reroll.
pub fn compute_max_ev_for_reroll(
    tables: &Tables,
    e_next: &[f64; NUM_DICE_SETS],
    e_current: &mut [f64; NUM_DICE_SETS],
    best_mask: &mut [u8; NUM_DICE_SETS],
) {
    let kt = &tables.keep_table;
    let mut keep_ev = [0.0f64; NUM_KEEP_MULTISETS];
    compute_keep_expectations(kt, e_next, &mut keep_ev);

    for ds_i in 0..NUM_DICE_SETS {
        let mut best_val = f64::NEG_INFINITY;
        let mut mask = 0u8;
        for opt in &kt.roll_keeps[ds_i] {
            let ev = keep_ev[opt.keep_id as usize];
            if ev > best_val {
                best_val = ev;
                mask = opt.mask;
            }
        }
        e_current[ds_i] = best_val;
        best_mask[ds_i] = mask;
    }
}

/// SOLVE_WIDGET(S): fill the 756 records of one state and return V(S).
///
/// `values` and `actions` are the state's record block, laid out as
/// `stage * 252 + roll`.
pub fn solve_state(
    tables: &Tables,
    state: &GameState,
    successors: &SuccessorValues<'_>,
    values: &mut [f32],
    actions: &mut [u8],
) -> f64 {
    debug_assert_eq!(values.len(), RECORDS_PER_STATE);
    debug_assert_eq!(actions.len(), RECORDS_PER_STATE);

    if state.is_terminal() {
        values.fill(0.0);
        actions.fill(NO_ACTION);
        return 0.0;
    }

    let mut e = [[0.0f64; NUM_DICE_SETS]; NUM_ROLL_STAGES];
    let mut a = [[0u8; NUM_DICE_SETS]; NUM_ROLL_STAGES];

    let [e0, e1, e2] = &mut e;
    let [a0, a1, a2] = &mut a;
    compute_best_scoring_values(tables, state, successors, e2, a2);
    compute_max_ev_for_reroll(tables, e2, e1, a1);
    compute_max_ev_for_reroll(tables, e1, e0, a0);

    let mut e_s = 0.0;
    for ds_i in 0..NUM_DICE_SETS {
        e_s += tables.fresh_roll_probabilities[ds_i] * e0[ds_i];
    }

    for stage in [RollStage::First, RollStage::Second, RollStage::Final] {
        let s = stage as usize;
        let base = s * NUM_DICE_SETS;
        for ds_i in 0..NUM_DICE_SETS {
            values[base + ds_i] = e[s][ds_i] as f32;
            actions[base + ds_i] = a[s][ds_i];
        }
    }

    e_s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice_mechanics::Roll;
    use crate::phase0_tables::tables;

    /// Solve a state whose successors are all terminal (one category left).
    fn solve_last_turn(open: usize) -> (f64, Vec<f32>, Vec<u8>) {
        let root = GameState::new(ALL_CATEGORIES_MASK ^ (1 << open), 0, false).unwrap();
        let reach = Reachability::from_root(root.encode()).unwrap();
        let higher = reach.rank_range(CATEGORY_COUNT);
        let zeros = vec![0.0f64; higher.len()];
        let successors = SuccessorValues {
            reach: &reach,
            values: &zeros,
            offset: higher.start,
        };
        let mut values = vec![0.0f32; RECORDS_PER_STATE];
        let mut actions = vec![0u8; RECORDS_PER_STATE];
        let v = solve_state(tables(), &root, &successors, &mut values, &mut actions);
        (v, values, actions)
    }

    #[test]
    fn test_chance_only() {
        let (v, values, actions) = solve_last_turn(CATEGORY_CHANCE);
        assert!((v - 23.333333333333336).abs() < 1e-9, "got {}", v);

        let t = tables();
        let roll = Roll::from_dice(&[1, 2, 3, 4, 6]).unwrap();
        let r = t.index_of_roll(&roll);
        assert_eq!(roll.kept_dice(actions[r]), vec![6]);
        assert_eq!(roll.kept_dice(actions[NUM_DICE_SETS + r]), vec![4, 6]);
        assert_eq!(actions[2 * NUM_DICE_SETS + r], CATEGORY_CHANCE as u8);
        assert_eq!(values[2 * NUM_DICE_SETS + r], 16.0);
        assert!((values[NUM_DICE_SETS + r] as f64 - 20.5).abs() < 1e-5);
        assert!((values[r] as f64 - 23.0).abs() < 1e-5);
    }

    #[test]
    fn test_yahtzee_only() {
        let (v, _, _) = solve_last_turn(CATEGORY_YAHTZEE);
        assert!((v - 2.3014321262849475).abs() < 1e-9, "got {}", v);
    }

    #[test]
    fn test_terminal_records() {
        let terminal = GameState::new(ALL_CATEGORIES_MASK, 0, false).unwrap();
        let reach = Reachability::from_root(
            GameState::new(ALL_CATEGORIES_MASK ^ 1, 0, false).unwrap().encode(),
        )
        .unwrap();
        let successors = SuccessorValues {
            reach: &reach,
            values: &[],
            offset: reach.len(),
        };
        let mut values = vec![1.0f32; RECORDS_PER_STATE];
        let mut actions = vec![0u8; RECORDS_PER_STATE];
        let v = solve_state(tables(), &terminal, &successors, &mut values, &mut actions);
        assert_eq!(v, 0.0);
        assert!(values.iter().all(|&x| x == 0.0));
        assert!(actions.iter().all(|&x| x == NO_ACTION));
    }

    #[test]
    fn test_keep_all_for_sure_points() {
        let (_, _, actions) = solve_last_turn(CATEGORY_LARGE_STRAIGHT);
        let t = tables();
        let roll = Roll::from_dice(&[2, 3, 4, 5, 6]).unwrap();
        let r = t.index_of_roll(&roll);
        assert_eq!(actions[r], 0x1F);
        assert_eq!(actions[NUM_DICE_SETS + r], 0x1F);
    }
}
