//! QueryEngine: constant-time reads against an open [`Database`].
//!
//! Every query validates in the same order: the state code (RangeError if
//! malformed or not reachable from the database root), then the dice
//! (RangeError), then the terminal check (GameOver). Queries never mutate.
//! A stored action outside the range of its stage is reported as an IOError
//! instead of being used as an index.

use serde::Serialize;

use crate::constants::*;
use crate::dice_mechanics::Roll;
use crate::error::{Error, Result};
use crate::game_mechanics::for_each_action;
use crate::phase0_tables::tables;
use crate::state_codec::GameState;
use crate::storage::Database;
use crate::types::{record_index, RollStage};

/// One legal category for a roll, as shown to a player.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryValue {
    pub category: usize,
    pub name: &'static str,
    /// Points scored now, bonuses included.
    pub points: u32,
    /// Points now plus the expected points of the successor state.
    pub expected_total: f64,
}

pub struct QueryEngine<'db> {
    db: &'db Database,
}

impl<'db> QueryEngine<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    pub fn root(&self) -> u32 {
        self.db.root()
    }

    pub fn reachable_states(&self) -> usize {
        self.db.len()
    }

    /// Expected points still to be scored from the start of a turn in `state`.
    /// The terminal state is worth exactly 0.
    pub fn lookup(&self, state: u32) -> Result<f64> {
        let (_, idx) = self.db.reachability().resolve(state)?;
        Ok(self.db.state_value(idx))
    }

    /// Optimal category to score after the last reroll.
    pub fn best_action(&self, state: u32, dice: &[u8]) -> Result<usize> {
        let (_, action) = self.decision(state, RollStage::Final, dice)?;
        Ok(action as usize)
    }

    /// Dice to keep after the first roll (sorted).
    pub fn keep_first(&self, state: u32, dice: &[u8]) -> Result<Vec<u8>> {
        self.keep(state, RollStage::First, dice)
    }

    /// Dice to keep after the first reroll (sorted).
    pub fn keep_second(&self, state: u32, dice: &[u8]) -> Result<Vec<u8>> {
        self.keep(state, RollStage::Second, dice)
    }

    /// Expected points still to be scored with this roll at this stage, under
    /// optimal play.
    pub fn expected_value(&self, state: u32, stage: RollStage, dice: &[u8]) -> Result<f64> {
        let (gs, idx) = self.db.reachability().resolve(state)?;
        let roll = Roll::from_dice(dice)?;
        if gs.is_terminal() {
            return Ok(0.0);
        }
        let r = tables().index_of_roll(&roll);
        Ok(self.db.record(record_index(idx, stage, r)).0 as f64)
    }

    /// Every legal category for a final roll with its points and expected total,
    /// in category order.
    pub fn category_values(&self, state: u32, dice: &[u8]) -> Result<Vec<CategoryValue>> {
        let (gs, _) = self.db.reachability().resolve(state)?;
        let roll = Roll::from_dice(dice)?;
        if gs.is_terminal() {
            return Err(Error::GameOver(state));
        }
        let t = tables();
        let reach = self.db.reachability();
        let mut out = Vec::new();
        let mut missing = None;
        for_each_action(&gs, &roll, &t.scores[t.index_of_roll(&roll)], |cat, points, next| {
            match reach.index_of(next.encode()) {
                Some(i) => out.push(CategoryValue {
                    category: cat,
                    name: CATEGORY_NAMES[cat],
                    points,
                    expected_total: points as f64 + self.db.state_value(i),
                }),
                None => missing = Some(next),
            }
        });
        if let Some(next) = missing {
            return Err(Error::range(format!(
                "successor {} is missing from the database",
                next
            )));
        }
        Ok(out)
    }

    fn keep(&self, state: u32, stage: RollStage, dice: &[u8]) -> Result<Vec<u8>> {
        let (roll, mask) = self.decision(state, stage, dice)?;
        Ok(roll.kept_dice(mask))
    }

    fn decision(&self, state: u32, stage: RollStage, dice: &[u8]) -> Result<(Roll, u8)> {
        let (gs, idx) = self.db.reachability().resolve(state)?;
        let roll = Roll::from_dice(dice)?;
        if gs.is_terminal() {
            return Err(Error::GameOver(state));
        }
        let rec = record_index(idx, stage, tables().index_of_roll(&roll));
        let (_, action) = self.db.record(rec);
        let in_range = match stage {
            RollStage::Final => (action as usize) < CATEGORY_COUNT,
            RollStage::First | RollStage::Second => action <= KEEP_ALL_MASK,
        };
        if !in_range {
            return Err(Error::Format(format!(
                "record {} holds action {:#04x}, invalid for stage {:?}",
                rec, action, stage
            )));
        }
        Ok((roll, action))
    }
}

/// Parse a state argument; shared by the command-line tools.
pub fn parse_state_code(s: &str) -> Result<u32> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    let code = parsed.map_err(|e| Error::range(format!("invalid state code {:?}: {}", s, e)))?;
    GameState::decode(code)?;
    Ok(code)
}

/// Parse dice written as digits ("13366") or separated ("1,3,3,6,6").
pub fn parse_dice(s: &str) -> Result<Vec<u8>> {
    s.chars()
        .filter(|c| !matches!(c, ',' | ' ' | '[' | ']'))
        .map(|c| {
            c.to_digit(10)
                .map(|d| d as u8)
                .ok_or_else(|| Error::range(format!("invalid die {:?} in {:?}", c, s)))
        })
        .collect()
}
