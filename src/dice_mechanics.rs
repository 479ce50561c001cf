//! RollCodec: five-die multisets and their base-7 integer codes.
//!
//! A roll is stored as its face histogram. Digit `i` of the code (base 7) is the
//! count of face `i + 1`, so equal multisets always share a code and the code
//! space is `[0, 7^6)` with 252 valid entries.

use std::fmt;

use crate::constants::*;
use crate::error::{Error, Result};

/// Fold a face histogram (counts for faces 1..=6) into base-7 digits.
///
/// Also used for keep-multisets, whose counts sum to at most 5.
#[inline(always)]
pub fn encode_counts(counts: &[u8; FACE_COUNT]) -> u32 {
    let mut code = 0u32;
    for i in (0..FACE_COUNT).rev() {
        code = code * ROLL_CODE_RADIX + counts[i] as u32;
    }
    code
}

#[inline(always)]
fn decode_counts(mut code: u32) -> [u8; FACE_COUNT] {
    let mut counts = [0u8; FACE_COUNT];
    for c in counts.iter_mut() {
        *c = (code % ROLL_CODE_RADIX) as u8;
        code /= ROLL_CODE_RADIX;
    }
    counts
}

/// An unordered multiset of five die faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Roll {
    counts: [u8; FACE_COUNT],
}

impl Roll {
    /// Build a roll from five faces in any order.
    pub fn from_dice(dice: &[u8]) -> Result<Self> {
        if dice.len() != DICE_COUNT {
            return Err(Error::range(format!(
                "expected {} dice, got {}",
                DICE_COUNT,
                dice.len()
            )));
        }
        let mut counts = [0u8; FACE_COUNT];
        for &d in dice {
            if !(1..=FACE_COUNT as u8).contains(&d) {
                return Err(Error::range(format!("die face {} outside 1..=6", d)));
            }
            counts[(d - 1) as usize] += 1;
        }
        Ok(Self { counts })
    }

    /// Build a roll from a histogram whose counts must sum to five.
    pub fn from_histogram(counts: [u8; FACE_COUNT]) -> Result<Self> {
        let total: u32 = counts.iter().map(|&c| c as u32).sum();
        if total != DICE_COUNT as u32 {
            return Err(Error::range(format!(
                "histogram {:?} sums to {}, expected {}",
                counts, total, DICE_COUNT
            )));
        }
        Ok(Self { counts })
    }

    #[inline(always)]
    pub fn encode(&self) -> u32 {
        encode_counts(&self.counts)
    }

    /// Decode an externally supplied roll code.
    pub fn decode(code: u32) -> Result<Self> {
        if code as usize >= ROLL_CODE_SPACE {
            return Err(Error::range(format!(
                "roll code {} outside [0, {})",
                code, ROLL_CODE_SPACE
            )));
        }
        Self::from_histogram(decode_counts(code))
    }

    #[inline(always)]
    pub fn counts(&self) -> [u8; FACE_COUNT] {
        self.counts
    }

    /// Faces in ascending order.
    pub fn dice(&self) -> [u8; DICE_COUNT] {
        let mut dice = [0u8; DICE_COUNT];
        let mut d = 0;
        for (face, &n) in self.counts.iter().enumerate() {
            for _ in 0..n {
                dice[d] = face as u8 + 1;
                d += 1;
            }
        }
        dice
    }

    pub fn sum(&self) -> u32 {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &n)| (i as u32 + 1) * n as u32)
            .sum()
    }

    /// The face shown by all five dice, if the roll is a Yahtzee.
    #[inline]
    pub fn yahtzee_face(&self) -> Option<usize> {
        self.counts
            .iter()
            .position(|&n| n as usize == DICE_COUNT)
            .map(|i| i + 1)
    }

    /// Sorted dice selected by a keep mask (bit i keeps the i-th smallest die).
    pub fn kept_dice(&self, mask: u8) -> Vec<u8> {
        self.dice()
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, &d)| d)
            .collect()
    }

    /// Canonical keep mask for a kept sub-multiset: for each face, the leftmost
    /// dice of that face in sorted order.
    pub fn keep_mask(&self, kept: &[u8; FACE_COUNT]) -> u8 {
        let mut taken = [0u8; FACE_COUNT];
        let mut mask = 0u8;
        for (i, &d) in self.dice().iter().enumerate() {
            let f = (d - 1) as usize;
            if taken[f] < kept[f] {
                taken[f] += 1;
                mask |= 1 << i;
            }
        }
        mask
    }
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in self.dice() {
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

/// Count occurrences of each face in a dice slice; index 0 holds face 1.
pub fn count_faces(dice: &[u8]) -> [u8; FACE_COUNT] {
    let mut counts = [0u8; FACE_COUNT];
    for &d in dice {
        counts[(d - 1) as usize] += 1;
    }
    counts
}

/// All 252 rolls in increasing code order (the roll-index order).
pub fn all_rolls() -> Vec<Roll> {
    let mut rolls = Vec::with_capacity(NUM_DICE_SETS);
    for a in 1..=6u8 {
        for b in a..=6 {
            for c in b..=6 {
                for d in c..=6 {
                    for e in d..=6 {
                        rolls.push(Roll {
                            counts: count_faces(&[a, b, c, d, e]),
                        });
                    }
                }
            }
        }
    }
    rolls.sort_by_key(Roll::encode);
    rolls
}

/// Every sub-multiset of `counts` (including empty and full), as histograms.
pub fn sub_multisets(counts: &[u8; FACE_COUNT]) -> Vec<[u8; FACE_COUNT]> {
    let mut out = vec![[0u8; FACE_COUNT]];
    for face in 0..FACE_COUNT {
        let mut next = Vec::with_capacity(out.len() * (counts[face] as usize + 1));
        for partial in &out {
            for k in 0..=counts[face] {
                let mut sub = *partial;
                sub[face] = k;
                next.push(sub);
            }
        }
        out = next;
    }
    out
}

/// Sorted face list of a histogram (any total).
pub fn histogram_dice(counts: &[u8; FACE_COUNT]) -> Vec<u8> {
    counts
        .iter()
        .enumerate()
        .flat_map(|(i, &n)| std::iter::repeat(i as u8 + 1).take(n as usize))
        .collect()
}
