//! Static lookup tables shared by the solver, the query engine and the codecs.
//!
//! [`build_tables`] runs the sub-steps in dependency order:
//!
//! 1. **Rolls**: the 252 sorted 5-dice multisets in roll-code order, plus the
//!    code -> roll-index map
//! 2. **Category scores**: raw score for every (roll, category)
//! 3. **Reroll distributions**: for k = 1..=5 rerolled dice, all 6^k ordered
//!    outcomes folded into multiset probabilities
//! 4. **Fresh roll probabilities**: P(roll) for five fresh dice (k = 5)
//! 5. **Keep-multiset table**: sparse CSR matrix P(keep -> roll) over the 462
//!    keeps, with the per-roll keep choices in lexicographic order
//! 6. **Upper sums**: achievable upper totals per subset of upper categories
//!
//! The tables never change, so they are built once per process behind a
//! `OnceLock` ([`tables`]).

use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::time::Instant;

use tracing::{debug, info};

use crate::constants::*;
use crate::dice_mechanics::{all_rolls, encode_counts, histogram_dice, sub_multisets, Roll};
use crate::game_mechanics::calculate_category_score;
use crate::state_codec::upper_sum_sets;
use crate::types::{KeepOption, KeepTable, Tables};

static TABLES: OnceLock<Tables> = OnceLock::new();

/// The process-wide tables, built on first use.
pub fn tables() -> &'static Tables {
    TABLES.get_or_init(build_tables)
}

/// Roll code -> roll index map; invalid codes hold `u16::MAX`.
pub fn build_roll_index(rolls: &[Roll]) -> Vec<u16> {
    let mut index = vec![u16::MAX; ROLL_CODE_SPACE];
    for (i, r) in rolls.iter().enumerate() {
        index[r.encode() as usize] = i as u16;
    }
    index
}

/// Distribution of the multiset obtained by rolling `k` dice.
///
/// Enumerates the 6^k ordered outcomes and counts how many give each multiset;
/// entries are ordered by increasing histogram code.
pub fn reroll_distribution(k: usize) -> Vec<([u8; FACE_COUNT], f64)> {
    let total = FACE_COUNT.pow(k as u32);
    let mut hits: BTreeMap<u32, ([u8; FACE_COUNT], u32)> = BTreeMap::new();
    for outcome in 0..total {
        let mut counts = [0u8; FACE_COUNT];
        let mut rest = outcome;
        for _ in 0..k {
            counts[rest % FACE_COUNT] += 1;
            rest /= FACE_COUNT;
        }
        hits.entry(encode_counts(&counts)).or_insert((counts, 0)).1 += 1;
    }
    hits.into_values()
        .map(|(counts, n)| (counts, n as f64 / total as f64))
        .collect()
}

/// Build the keep-multiset transition table.
///
/// Row `k` holds P(keep k -> roll) for every roll reachable by rerolling the
/// `5 - |k|` free dice, in increasing roll index. Each roll also gets its list
/// of distinct keep choices (keep-none and keep-all included), sorted by the
/// kept dice so that scanning with a strict `>` yields the lexicographically
/// smallest optimum.
pub fn precompute_keep_table(
    rolls: &[Roll],
    roll_index: &[u16],
    distributions: &[Vec<([u8; FACE_COUNT], f64)>],
) -> KeepTable {
    let mut keeps: Vec<[u8; FACE_COUNT]> = Vec::with_capacity(NUM_KEEP_MULTISETS);
    let mut keep_lookup = vec![u16::MAX; ROLL_CODE_SPACE];
    for size in 0..=DICE_COUNT {
        for (counts, _) in &distributions[size] {
            keep_lookup[encode_counts(counts) as usize] = keeps.len() as u16;
            keeps.push(*counts);
        }
    }

    let mut vals = Vec::new();
    let mut cols = Vec::new();
    let mut row_start = Vec::with_capacity(keeps.len() + 1);
    for keep in &keeps {
        row_start.push(vals.len() as u32);
        let free = DICE_COUNT - keep.iter().map(|&n| n as usize).sum::<usize>();
        let mut row = [0.0f64; NUM_DICE_SETS];
        for (rerolled, p) in &distributions[free] {
            let mut target = *keep;
            for f in 0..FACE_COUNT {
                target[f] += rerolled[f];
            }
            row[roll_index[encode_counts(&target) as usize] as usize] += p;
        }
        for (ti, &p) in row.iter().enumerate() {
            if p > 0.0 {
                vals.push(p);
                cols.push(ti as u16);
            }
        }
    }
    row_start.push(vals.len() as u32);

    let roll_keeps = rolls
        .iter()
        .map(|roll| {
            let mut subs = sub_multisets(&roll.counts());
            subs.sort_by_key(histogram_dice);
            subs.iter()
                .map(|kept| KeepOption {
                    keep_id: keep_lookup[encode_counts(kept) as usize],
                    mask: roll.keep_mask(kept),
                })
                .collect()
        })
        .collect::<Vec<Vec<KeepOption>>>();

    let total_choices: usize = roll_keeps.iter().map(Vec::len).sum();
    debug!(
        keeps = keeps.len(),
        nnz = vals.len(),
        avg_choices = total_choices as f64 / NUM_DICE_SETS as f64,
        "keep-multiset table"
    );

    KeepTable {
        keeps,
        vals,
        cols,
        row_start,
        roll_keeps,
    }
}

/// Build every table in dependency order, logging per-step timings.
pub fn build_tables() -> Tables {
    let start = Instant::now();

    macro_rules! timed {
        ($label:expr, $body:expr) => {{
            let t0 = Instant::now();
            let out = $body;
            debug!(
                step = $label,
                ms = t0.elapsed().as_secs_f64() * 1000.0,
                "lookup table built"
            );
            out
        }};
    }

    let rolls = timed!("rolls", all_rolls());
    let roll_index = timed!("roll index", build_roll_index(&rolls));
    let scores = timed!(
        "category scores",
        rolls
            .iter()
            .map(|r| {
                let mut s = [0u32; CATEGORY_COUNT];
                for (c, v) in s.iter_mut().enumerate() {
                    *v = calculate_category_score(r, c);
                }
                s
            })
            .collect::<Vec<_>>()
    );
    let reroll_distributions = timed!(
        "reroll distributions",
        (0..=DICE_COUNT).map(reroll_distribution).collect::<Vec<_>>()
    );
    let fresh_roll_probabilities = timed!("fresh roll probabilities", {
        let mut p = vec![0.0f64; NUM_DICE_SETS];
        for (counts, prob) in &reroll_distributions[DICE_COUNT] {
            p[roll_index[encode_counts(counts) as usize] as usize] = *prob;
        }
        p
    });
    let keep_table = timed!(
        "keep-multiset table",
        precompute_keep_table(&rolls, &roll_index, &reroll_distributions)
    );
    let upper_sums = timed!("upper sums", upper_sum_sets());

    info!(
        ms = start.elapsed().as_secs_f64() * 1000.0,
        "lookup tables ready"
    );

    Tables {
        rolls,
        roll_index,
        scores,
        reroll_distributions,
        fresh_roll_probabilities,
        keep_table,
        upper_sums,
    }
}
