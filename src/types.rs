use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::dice_mechanics::Roll;
use crate::error::{Error, Result};
use crate::state_codec::Reachability;

/// Position within a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RollStage {
    /// First roll, two rerolls left.
    First = 0,
    /// After the first reroll, one left.
    Second = 1,
    /// After the second reroll: a category must be scored.
    Final = 2,
}

impl TryFrom<u8> for RollStage {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0 => Ok(RollStage::First),
            1 => Ok(RollStage::Second),
            2 => Ok(RollStage::Final),
            _ => Err(Error::range(format!("roll stage {} outside 0..3", v))),
        }
    }
}

/// One distinct keep choice for a roll.
#[derive(Clone, Copy, Debug)]
pub struct KeepOption {
    /// Row of the keep-multiset in [`KeepTable`].
    pub keep_id: u16,
    /// Canonical keep mask over the sorted dice.
    pub mask: u8,
}

/// Keep-multiset transition table with sparse per-row storage.
pub struct KeepTable {
    /// Histograms of the 462 keep-multisets.
    pub keeps: Vec<[u8; FACE_COUNT]>,
    /// Sparse probability values P(keep -> roll).
    pub vals: Vec<f64>,
    /// Roll indices for vals entries, increasing within a row.
    pub cols: Vec<u16>,
    /// Row boundaries: row_start[k]..row_start[k+1] gives the range in vals/cols.
    pub row_start: Vec<u32>,
    /// Keep choices for each roll, ordered by sorted kept dice (lexicographic).
    pub roll_keeps: Vec<Vec<KeepOption>>,
}

/// Process-wide lookup tables, built once by [`crate::phase0_tables::tables`].
pub struct Tables {
    /// All 252 rolls in roll-index order.
    pub rolls: Vec<Roll>,
    /// Roll code -> roll index (`u16::MAX` for invalid codes).
    pub roll_index: Vec<u16>,
    /// Raw category scores per roll index.
    pub scores: Vec<[u32; CATEGORY_COUNT]>,
    /// reroll_distributions[k]: (histogram of k rerolled dice, probability),
    /// by increasing histogram code. Index 0 is the certain empty reroll.
    pub reroll_distributions: Vec<Vec<([u8; FACE_COUNT], f64)>>,
    /// P(roll) for five fresh dice, per roll index.
    pub fresh_roll_probabilities: Vec<f64>,
    pub keep_table: KeepTable,
    /// Achievable upper totals per subset of upper categories.
    pub upper_sums: [u128; 64],
}

impl Tables {
    /// Roll index of a roll.
    #[inline(always)]
    pub fn index_of_roll(&self, roll: &Roll) -> usize {
        self.roll_index[roll.encode() as usize] as usize
    }
}

/// Solved table for every state reachable from one root.
pub struct ValueTable {
    pub reach: Reachability,
    /// Stage-0 expected value per reachable index.
    pub state_values: Vec<f64>,
    /// Record values, indexed by ((state * 3 + stage) * 252 + roll).
    pub record_values: Vec<f32>,
    pub record_actions: Vec<u8>,
}

/// Flat record index.
#[inline(always)]
pub fn record_index(state_idx: usize, stage: RollStage, roll_idx: usize) -> usize {
    (state_idx * NUM_ROLL_STAGES + stage as usize) * NUM_DICE_SETS + roll_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_stage_conversion() {
        assert_eq!(RollStage::try_from(0).unwrap(), RollStage::First);
        assert_eq!(RollStage::try_from(2).unwrap(), RollStage::Final);
        assert!(RollStage::try_from(3).is_err());
    }

    #[test]
    fn test_record_index() {
        assert_eq!(record_index(0, RollStage::First, 0), 0);
        assert_eq!(record_index(0, RollStage::Final, 251), RECORDS_PER_STATE - 1);
        assert_eq!(record_index(2, RollStage::Second, 7), 2 * RECORDS_PER_STATE + 252 + 7);
    }
}
