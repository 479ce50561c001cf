//! StateCodec: scorecard progress as a 20-bit integer, and the enumeration of
//! every state reachable from a root.
//!
//! ```text
//! bit  0..=12  used-category mask (bit c = category c scored)
//! bit 13..=18  upper-section score, capped at 63
//! bit 19       Yahtzee bonus flag (Yahtzee box holds 50)
//! ```
//!
//! Reachable states are indexed densely by (used count, code) so that every
//! rank occupies one contiguous block and the root sits at index 0.

use std::fmt;
use std::ops::Range;

use crate::constants::*;
use crate::error::{Error, Result};
use crate::phase0_tables::tables;

/// Turn-start state: which categories are used, the capped upper total and the
/// Yahtzee bonus flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GameState {
    used: u16,
    upper_score: u8,
    yahtzee_bonus: bool,
}

impl GameState {
    pub const INITIAL: GameState = GameState {
        used: 0,
        upper_score: 0,
        yahtzee_bonus: false,
    };

    pub fn new(used: u16, upper_score: u8, yahtzee_bonus: bool) -> Result<Self> {
        if used > ALL_CATEGORIES_MASK {
            return Err(Error::range(format!("used mask {:#x} has unknown categories", used)));
        }
        if upper_score as u32 > UPPER_SCORE_CAP {
            return Err(Error::range(format!(
                "upper score {} above cap {}",
                upper_score, UPPER_SCORE_CAP
            )));
        }
        if yahtzee_bonus && !is_category_used(used, CATEGORY_YAHTZEE) {
            return Err(Error::range("Yahtzee bonus flag set while Yahtzee is open"));
        }
        Ok(Self {
            used,
            upper_score,
            yahtzee_bonus,
        })
    }

    /// Field-level constructor for values derived from an already valid state.
    #[inline(always)]
    pub(crate) fn from_parts(used: u16, upper_score: u8, yahtzee_bonus: bool) -> Self {
        Self {
            used,
            upper_score,
            yahtzee_bonus,
        }
    }

    #[inline(always)]
    pub fn encode(&self) -> u32 {
        self.used as u32
            | (self.upper_score as u32) << UPPER_SCORE_SHIFT
            | (self.yahtzee_bonus as u32) << YAHTZEE_FLAG_SHIFT
    }

    pub fn decode(code: u32) -> Result<Self> {
        if code as usize >= NUM_STATE_CODES {
            return Err(Error::range(format!(
                "state code {:#x} outside [0, {:#x})",
                code, NUM_STATE_CODES
            )));
        }
        let s = Self::unpack(code);
        Self::new(s.used, s.upper_score, s.yahtzee_bonus)
    }

    /// Split a code below `NUM_STATE_CODES` into its fields without validation.
    #[inline(always)]
    fn unpack(code: u32) -> Self {
        Self {
            used: (code & ALL_CATEGORIES_MASK as u32) as u16,
            upper_score: ((code >> UPPER_SCORE_SHIFT) & UPPER_SCORE_MASK) as u8,
            yahtzee_bonus: (code >> YAHTZEE_FLAG_SHIFT) & 1 == 1,
        }
    }

    /// Bonus flag only with the Yahtzee box used; the other fields always fit.
    #[inline(always)]
    fn is_well_formed(&self) -> bool {
        !self.yahtzee_bonus || self.is_used(CATEGORY_YAHTZEE)
    }

    #[inline(always)]
    pub fn used(&self) -> u16 {
        self.used
    }

    #[inline(always)]
    pub fn upper_score(&self) -> u8 {
        self.upper_score
    }

    #[inline(always)]
    pub fn yahtzee_bonus(&self) -> bool {
        self.yahtzee_bonus
    }

    #[inline(always)]
    pub fn is_used(&self, cat: usize) -> bool {
        is_category_used(self.used, cat)
    }

    #[inline(always)]
    pub fn used_count(&self) -> usize {
        self.used.count_ones() as usize
    }

    /// Mark `cat` used without touching the scores.
    pub fn with_used(&self, cat: usize) -> Self {
        Self {
            used: self.used | (1 << cat),
            ..*self
        }
    }

    /// Open categories in ascending id order.
    pub fn remaining(&self) -> impl Iterator<Item = usize> + '_ {
        (0..CATEGORY_COUNT).filter(move |&c| !self.is_used(c))
    }

    #[inline(always)]
    pub fn is_terminal(&self) -> bool {
        self.used == ALL_CATEGORIES_MASK
    }

    /// Upper bound on the points still obtainable from this state.
    pub fn upper_bound_points(&self) -> f64 {
        let bonus_possible = self.yahtzee_bonus || !self.is_used(CATEGORY_YAHTZEE);
        let mut bound = 0u32;
        let mut upper_open = false;
        for cat in self.remaining() {
            bound += match cat {
                c if is_upper_category(c) => {
                    upper_open = true;
                    (c as u32 + 1) * DICE_COUNT as u32
                }
                CATEGORY_FULL_HOUSE => FULL_HOUSE_SCORE,
                CATEGORY_SMALL_STRAIGHT => SMALL_STRAIGHT_SCORE,
                CATEGORY_LARGE_STRAIGHT => LARGE_STRAIGHT_SCORE,
                CATEGORY_YAHTZEE => YAHTZEE_SCORE,
                _ => (FACE_COUNT * DICE_COUNT) as u32,
            };
            if bonus_possible && cat != CATEGORY_YAHTZEE {
                bound += YAHTZEE_BONUS;
            }
        }
        if upper_open && (self.upper_score as u32) < UPPER_SCORE_CAP {
            bound += UPPER_BONUS;
        }
        bound as f64
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (c, sym) in CATEGORY_SYMBOLS.iter().enumerate() {
            write!(f, "{}", if self.is_used(c) { *sym } else { '.' })?;
        }
        write!(f, " up={}", self.upper_score)?;
        if self.yahtzee_bonus {
            write!(f, " +Y")?;
        }
        Ok(())
    }
}

/// Achievable upper-section totals for each subset of the six upper categories.
///
/// Bit `n` of `sums[subset]` is set when scoring exactly the faces in `subset`
/// (0-5 dice each) can total `n`. Totals go up to 105, so a `u128` holds them.
pub fn upper_sum_sets() -> [u128; 64] {
    let mut sums = [0u128; 64];
    sums[0] = 1;
    for subset in 1..64usize {
        let face = subset.trailing_zeros() as usize;
        let prev = sums[subset & (subset - 1)];
        let mut acc = 0u128;
        for k in 0..=DICE_COUNT {
            acc |= prev << (k * (face + 1));
        }
        sums[subset] = acc;
    }
    sums
}

/// Whether `target` can be reached from `root` by legal play.
pub fn is_reachable_from(root: &GameState, target: &GameState, upper_sums: &[u128; 64]) -> bool {
    if target.used & root.used != root.used {
        return false;
    }
    let added = (target.used & !root.used) & UPPER_CATEGORIES_MASK;
    let sums = upper_sums[added as usize];
    let (r_up, t_up) = (root.upper_score as u32, target.upper_score as u32);
    let upper_ok = if r_up == UPPER_SCORE_CAP {
        t_up == UPPER_SCORE_CAP
    } else if t_up == UPPER_SCORE_CAP {
        sums >> (UPPER_SCORE_CAP - r_up) != 0
    } else {
        t_up >= r_up && sums & (1u128 << (t_up - r_up)) != 0
    };
    if !upper_ok {
        return false;
    }
    if root.is_used(CATEGORY_YAHTZEE) {
        target.yahtzee_bonus == root.yahtzee_bonus
    } else if target.is_used(CATEGORY_YAHTZEE) {
        true
    } else {
        !target.yahtzee_bonus
    }
}

const UNREACHABLE: u32 = u32::MAX;

/// Dense index over the states reachable from a root.
pub struct Reachability {
    root: GameState,
    codes: Vec<u32>,
    index: Vec<u32>,
    rank_start: [usize; CATEGORY_COUNT + 2],
}

impl Reachability {
    /// Enumerate every state reachable from `root_code`. The root itself must be
    /// reachable from the empty scorecard.
    pub fn from_root(root_code: u32) -> Result<Self> {
        let root = GameState::decode(root_code)?;
        let upper_sums = &tables().upper_sums;
        if !is_reachable_from(&GameState::INITIAL, &root, upper_sums) {
            return Err(Error::range(format!(
                "root state {:#x} ({}) is not reachable from the initial state",
                root_code, root
            )));
        }

        let mut by_rank: Vec<Vec<u32>> = vec![Vec::new(); CATEGORY_COUNT + 1];
        for code in 0..NUM_STATE_CODES as u32 {
            let state = GameState::unpack(code);
            if state.is_well_formed() && is_reachable_from(&root, &state, upper_sums) {
                by_rank[state.used_count()].push(code);
            }
        }

        let mut codes = Vec::with_capacity(by_rank.iter().map(Vec::len).sum());
        let mut rank_start = [0usize; CATEGORY_COUNT + 2];
        for (rank, block) in by_rank.iter().enumerate() {
            rank_start[rank] = codes.len();
            codes.extend_from_slice(block);
        }
        rank_start[CATEGORY_COUNT + 1] = codes.len();

        let mut index = vec![UNREACHABLE; NUM_STATE_CODES];
        for (i, &code) in codes.iter().enumerate() {
            index[code as usize] = i as u32;
        }

        Ok(Self {
            root,
            codes,
            index,
            rank_start,
        })
    }

    pub fn root(&self) -> GameState {
        self.root
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Reachable index of a state code, or `None` if it is malformed or not
    /// reachable from the root.
    #[inline(always)]
    pub fn index_of(&self, code: u32) -> Option<usize> {
        match self.index.get(code as usize) {
            Some(&i) if i != UNREACHABLE => Some(i as usize),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn code_at(&self, index: usize) -> u32 {
        self.codes[index]
    }

    /// State at a reachable index. Codes stored here were validated on insert.
    #[inline]
    pub fn state_at(&self, index: usize) -> GameState {
        GameState::unpack(self.codes[index])
    }

    /// Index range of the states with exactly `rank` used categories.
    pub fn rank_range(&self, rank: usize) -> Range<usize> {
        self.rank_start[rank]..self.rank_start[rank + 1]
    }

    /// Resolve an external state code: malformed or unreachable is a RangeError.
    pub fn resolve(&self, code: u32) -> Result<(GameState, usize)> {
        let state = GameState::decode(code)?;
        match self.index_of(code) {
            Some(i) => Ok((state, i)),
            None => Err(Error::range(format!(
                "state {:#x} ({}) is not reachable from root {:#x}",
                code,
                state,
                self.root.encode()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let s = GameState::new(0b1_0000_0000_0001, 12, false).unwrap();
        assert_eq!(s.encode(), 0x1001 | 12 << 13);
        let s = GameState::new(1 << CATEGORY_YAHTZEE, 0, true).unwrap();
        assert_eq!(s.encode(), 0x800 | 1 << 19);
        assert_eq!(GameState::decode(s.encode()).unwrap(), s);
        assert_eq!(GameState::INITIAL.encode(), INITIAL_STATE);
    }

    #[test]
    fn test_malformed_codes() {
        assert!(GameState::decode(NUM_STATE_CODES as u32).is_err());
        assert!(GameState::decode(1 << 19).is_err());
        assert!(GameState::decode(64 << 13).is_err());
        assert!(GameState::new(0, 64, false).is_err());
        assert!(GameState::new(0x2000, 0, false).is_err());
    }

    #[test]
    fn test_remaining_and_terminal() {
        let s = GameState::new(ALL_CATEGORIES_MASK ^ (1 << 3 | 1 << 12), 0, false).unwrap();
        assert_eq!(s.remaining().collect::<Vec<_>>(), vec![3, 12]);
        assert!(!s.is_terminal());
        assert!(s.with_used(3).with_used(12).is_terminal());
        assert_eq!(s.used_count(), 11);
    }

    #[test]
    fn test_upper_bound_points() {
        let used = ALL_CATEGORIES_MASK ^ (1 << CATEGORY_CHANCE);
        let chance = GameState::new(used, 0, false).unwrap();
        assert_eq!(chance.upper_bound_points(), 30.0);
        let terminal = GameState::new(ALL_CATEGORIES_MASK, 63, true).unwrap();
        assert_eq!(terminal.upper_bound_points(), 0.0);
        assert!(GameState::INITIAL.upper_bound_points() > 1500.0);
    }

    #[test]
    fn test_upper_sum_sets() {
        let sums = upper_sum_sets();
        assert_eq!(sums[0], 1);
        // Ones only: 0..=5
        assert_eq!(sums[1], 0b11_1111);
        // Sixes only: multiples of 6 up to 30
        for n in 0..=30 {
            assert_eq!(sums[1 << 5] >> n & 1 == 1, n % 6 == 0);
        }
        assert!(sums[63] >> 105 & 1 == 1);
        assert!(sums[63] >> 106 == 0);
    }

    #[test]
    fn test_reachability_rules() {
        let sums = upper_sum_sets();
        let init = GameState::INITIAL;
        let sixes_12 = GameState::new(1 << CATEGORY_SIXES, 12, false).unwrap();
        let sixes_13 = GameState::new(1 << CATEGORY_SIXES, 13, false).unwrap();
        assert!(is_reachable_from(&init, &sixes_12, &sums));
        assert!(!is_reachable_from(&init, &sixes_13, &sums));

        let lower = GameState::new(1 << CATEGORY_CHANCE, 5, false).unwrap();
        assert!(!is_reachable_from(&init, &lower, &sums));

        let flagged = GameState::new(1 << CATEGORY_YAHTZEE, 0, true).unwrap();
        assert!(is_reachable_from(&init, &flagged, &sums));
        let unflagged = GameState::new(1 << CATEGORY_YAHTZEE | 1, 0, false).unwrap();
        let flagged_later = GameState::new(1 << CATEGORY_YAHTZEE | 1, 0, true).unwrap();
        assert!(!is_reachable_from(&unflagged.with_used(1), &flagged_later.with_used(1), &sums));
        assert!(!is_reachable_from(&sixes_12, &init, &sums));
    }

    #[test]
    fn test_reachability_from_small_root() {
        let used = ALL_CATEGORIES_MASK ^ (1 << CATEGORY_YAHTZEE | 1 << CATEGORY_CHANCE);
        let root = GameState::new(used, 0, false).unwrap();
        let reach = Reachability::from_root(root.encode()).unwrap();
        // root, +Y (flag 0/1), +C, terminal (flag 0/1)
        assert_eq!(reach.len(), 6);
        assert_eq!(reach.code_at(0), root.encode());
        assert_eq!(reach.rank_range(11), 0..1);
        assert_eq!(reach.rank_range(12).len(), 3);
        assert_eq!(reach.rank_range(13).len(), 2);
        for i in 0..reach.len() {
            assert_eq!(reach.index_of(reach.code_at(i)), Some(i));
            assert_eq!(reach.state_at(i).encode(), reach.code_at(i));
        }
        assert!(reach.resolve(GameState::INITIAL.encode()).is_err());
    }

    #[test]
    fn test_unreachable_root_rejected() {
        let root = GameState::new(1 << CATEGORY_ONES, 7, false).unwrap();
        assert!(Reachability::from_root(root.encode()).is_err());
    }
}
