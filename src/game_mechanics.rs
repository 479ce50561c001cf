//! Yahtzee scoring rules: raw category scores, the forced joker rule, both
//! bonuses and the successor state reached by scoring a category.

use crate::constants::*;
use crate::dice_mechanics::Roll;
use crate::error::{Error, Result};
use crate::state_codec::GameState;

/// Raw score for placing a roll in a category, ignoring joker and bonuses.
pub fn calculate_category_score(roll: &Roll, category: usize) -> u32 {
    let face_count = roll.counts();
    let sum_all = roll.sum();

    match category {
        CATEGORY_ONES | CATEGORY_TWOS | CATEGORY_THREES | CATEGORY_FOURS | CATEGORY_FIVES
        | CATEGORY_SIXES => (category as u32 + 1) * face_count[category] as u32,
        CATEGORY_THREE_OF_A_KIND => n_of_a_kind_score(&face_count, 3, sum_all),
        CATEGORY_FOUR_OF_A_KIND => n_of_a_kind_score(&face_count, 4, sum_all),
        CATEGORY_FULL_HOUSE => {
            let has_three = face_count.contains(&3);
            let has_pair = face_count.contains(&2);
            if has_three && has_pair {
                FULL_HOUSE_SCORE
            } else {
                0
            }
        }
        CATEGORY_SMALL_STRAIGHT => {
            let runs = [[0, 1, 2, 3], [1, 2, 3, 4], [2, 3, 4, 5]];
            if runs.iter().any(|run| run.iter().all(|&f| face_count[f] >= 1)) {
                SMALL_STRAIGHT_SCORE
            } else {
                0
            }
        }
        CATEGORY_LARGE_STRAIGHT => {
            let middle = face_count[1..5].iter().all(|&n| n == 1);
            if middle && (face_count[0] == 1 || face_count[5] == 1) {
                LARGE_STRAIGHT_SCORE
            } else {
                0
            }
        }
        CATEGORY_YAHTZEE => {
            if roll.yahtzee_face().is_some() {
                YAHTZEE_SCORE
            } else {
                0
            }
        }
        CATEGORY_CHANCE => sum_all,
        _ => 0,
    }
}

fn n_of_a_kind_score(face_count: &[u8; FACE_COUNT], n: u8, sum_all: u32) -> u32 {
    if face_count.iter().any(|&c| c >= n) {
        sum_all
    } else {
        0
    }
}

/// Upper total after scoring `score` in `category`, capped at 63.
#[inline(always)]
pub fn update_upper_score(upper_score: u8, category: usize, score: u32) -> u8 {
    if is_upper_category(category) {
        (upper_score as u32 + score).min(UPPER_SCORE_CAP) as u8
    } else {
        upper_score
    }
}

/// Whether the joker rule governs this roll: a Yahtzee with the Yahtzee box used.
#[inline(always)]
pub fn joker_active(state: &GameState, roll: &Roll) -> bool {
    roll.yahtzee_face().is_some() && state.is_used(CATEGORY_YAHTZEE)
}

/// Mask of the categories that may be scored with this roll.
///
/// Under the joker rule the matching upper box is forced when open; otherwise
/// any open lower box; only when both are exhausted any open upper box.
pub fn legal_categories(state: &GameState, roll: &Roll) -> u16 {
    let open = !state.used() & ALL_CATEGORIES_MASK;
    if let Some(face) = roll.yahtzee_face() {
        if state.is_used(CATEGORY_YAHTZEE) {
            let upper = 1u16 << (face - 1);
            if open & upper != 0 {
                return upper;
            }
            if open & LOWER_JOKER_MASK != 0 {
                return open & LOWER_JOKER_MASK;
            }
        }
    }
    open
}

/// Points awarded and successor state for scoring `category`, given its raw
/// score. The caller guarantees the category is legal.
#[inline]
pub fn score_category(
    state: &GameState,
    roll: &Roll,
    category: usize,
    raw: u32,
) -> (u32, GameState) {
    let joker = joker_active(state, roll);
    let mut points = if joker {
        match category {
            CATEGORY_FULL_HOUSE => FULL_HOUSE_SCORE,
            CATEGORY_SMALL_STRAIGHT => SMALL_STRAIGHT_SCORE,
            CATEGORY_LARGE_STRAIGHT => LARGE_STRAIGHT_SCORE,
            _ => raw,
        }
    } else {
        raw
    };
    if joker && state.yahtzee_bonus() {
        points += YAHTZEE_BONUS;
    }

    let old_up = state.upper_score();
    let new_up = update_upper_score(old_up, category, raw);
    if (old_up as u32) < UPPER_SCORE_CAP && new_up as u32 >= UPPER_SCORE_CAP {
        points += UPPER_BONUS;
    }

    let flag = state.yahtzee_bonus() || (category == CATEGORY_YAHTZEE && raw == YAHTZEE_SCORE);
    let next = GameState::from_parts(state.used() | (1 << category), new_up, flag);
    (points, next)
}

/// Call `f(category, points, successor)` for every legal category, ascending.
#[inline]
pub fn for_each_action(
    state: &GameState,
    roll: &Roll,
    raw_scores: &[u32; CATEGORY_COUNT],
    mut f: impl FnMut(usize, u32, GameState),
) {
    let legal = legal_categories(state, roll);
    for cat in 0..CATEGORY_COUNT {
        if legal & (1 << cat) != 0 {
            let (points, next) = score_category(state, roll, cat, raw_scores[cat]);
            f(cat, points, next);
        }
    }
}

/// Checked scoring for callers outside the solver.
pub fn apply_category(state: &GameState, roll: &Roll, category: usize) -> Result<(u32, GameState)> {
    if state.is_terminal() {
        return Err(Error::GameOver(state.encode()));
    }
    if category >= CATEGORY_COUNT {
        return Err(Error::range(format!("category {} outside 0..{}", category, CATEGORY_COUNT)));
    }
    if legal_categories(state, roll) & (1 << category) == 0 {
        return Err(Error::range(format!(
            "category {} is not legal for roll {} in state {}",
            CATEGORY_NAMES[category], roll, state
        )));
    }
    Ok(score_category(
        state,
        roll,
        category,
        calculate_category_score(roll, category),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roll(dice: [u8; 5]) -> Roll {
        Roll::from_dice(&dice).unwrap()
    }

    fn state(used: u16, up: u8, flag: bool) -> GameState {
        GameState::new(used, up, flag).unwrap()
    }

    #[test]
    fn test_upper_section() {
        let r = roll([1, 1, 3, 3, 6]);
        assert_eq!(calculate_category_score(&r, CATEGORY_ONES), 2);
        assert_eq!(calculate_category_score(&r, CATEGORY_TWOS), 0);
        assert_eq!(calculate_category_score(&r, CATEGORY_THREES), 6);
        assert_eq!(calculate_category_score(&r, CATEGORY_SIXES), 6);
    }

    #[test]
    fn test_n_of_a_kind() {
        assert_eq!(calculate_category_score(&roll([2, 2, 2, 5, 6]), CATEGORY_THREE_OF_A_KIND), 17);
        assert_eq!(calculate_category_score(&roll([2, 2, 3, 5, 6]), CATEGORY_THREE_OF_A_KIND), 0);
        assert_eq!(calculate_category_score(&roll([4, 4, 4, 4, 1]), CATEGORY_FOUR_OF_A_KIND), 17);
        assert_eq!(calculate_category_score(&roll([4, 4, 4, 1, 1]), CATEGORY_FOUR_OF_A_KIND), 0);
        assert_eq!(calculate_category_score(&roll([5, 5, 5, 5, 5]), CATEGORY_FOUR_OF_A_KIND), 25);
    }

    #[test]
    fn test_full_house() {
        assert_eq!(calculate_category_score(&roll([2, 2, 3, 3, 3]), CATEGORY_FULL_HOUSE), 25);
        assert_eq!(calculate_category_score(&roll([2, 2, 3, 3, 4]), CATEGORY_FULL_HOUSE), 0);
        assert_eq!(calculate_category_score(&roll([3, 3, 3, 3, 3]), CATEGORY_FULL_HOUSE), 0);
    }

    #[test]
    fn test_straights() {
        assert_eq!(calculate_category_score(&roll([1, 2, 3, 4, 6]), CATEGORY_SMALL_STRAIGHT), 30);
        assert_eq!(calculate_category_score(&roll([3, 4, 5, 6, 6]), CATEGORY_SMALL_STRAIGHT), 30);
        assert_eq!(calculate_category_score(&roll([1, 2, 3, 5, 6]), CATEGORY_SMALL_STRAIGHT), 0);
        assert_eq!(calculate_category_score(&roll([1, 2, 3, 4, 5]), CATEGORY_LARGE_STRAIGHT), 40);
        assert_eq!(calculate_category_score(&roll([2, 3, 4, 5, 6]), CATEGORY_LARGE_STRAIGHT), 40);
        assert_eq!(calculate_category_score(&roll([1, 2, 3, 4, 6]), CATEGORY_LARGE_STRAIGHT), 0);
        assert_eq!(calculate_category_score(&roll([1, 2, 3, 4, 5]), CATEGORY_SMALL_STRAIGHT), 30);
    }

    #[test]
    fn test_yahtzee_and_chance() {
        assert_eq!(calculate_category_score(&roll([6, 6, 6, 6, 6]), CATEGORY_YAHTZEE), 50);
        assert_eq!(calculate_category_score(&roll([6, 6, 6, 6, 5]), CATEGORY_YAHTZEE), 0);
        assert_eq!(calculate_category_score(&roll([6, 6, 6, 6, 5]), CATEGORY_CHANCE), 29);
    }

    #[test]
    fn test_update_upper_score() {
        assert_eq!(update_upper_score(10, CATEGORY_FIVES, 15), 25);
        assert_eq!(update_upper_score(60, CATEGORY_SIXES, 18), 63);
        assert_eq!(update_upper_score(60, CATEGORY_CHANCE, 18), 60);
    }

    #[test]
    fn test_upper_bonus_paid_on_crossing() {
        let s = state(0b01_1111, 55, false);
        let (points, next) = score_category(&s, &roll([6, 6, 6, 1, 2]), CATEGORY_SIXES, 18);
        assert_eq!(points, 18 + 35);
        assert_eq!(next.upper_score(), 63);

        let s = state(0b01_1110, 63, false);
        let (points, _) = score_category(&s, &roll([1, 1, 1, 1, 2]), CATEGORY_ONES, 4);
        assert_eq!(points, 4);
    }

    #[test]
    fn test_yahtzee_sets_flag() {
        let r = roll([4, 4, 4, 4, 4]);
        let (points, next) = apply_category(&GameState::INITIAL, &r, CATEGORY_YAHTZEE).unwrap();
        assert_eq!(points, 50);
        assert!(next.yahtzee_bonus());

        let r = roll([4, 4, 4, 4, 1]);
        let (points, next) = apply_category(&GameState::INITIAL, &r, CATEGORY_YAHTZEE).unwrap();
        assert_eq!(points, 0);
        assert!(!next.yahtzee_bonus());
    }

    #[test]
    fn test_joker_forces_upper_box() {
        let s = state(1 << CATEGORY_YAHTZEE, 0, true);
        let r = roll([3, 3, 3, 3, 3]);
        assert_eq!(legal_categories(&s, &r), 1 << CATEGORY_THREES);
        let (points, next) = apply_category(&s, &r, CATEGORY_THREES).unwrap();
        assert_eq!(points, 15 + 100);
        assert_eq!(next.upper_score(), 15);
        assert!(apply_category(&s, &r, CATEGORY_CHANCE).is_err());
    }

    #[test]
    fn test_joker_lower_boxes() {
        let s = state(1 << CATEGORY_YAHTZEE | 1 << CATEGORY_THREES, 9, false);
        let r = roll([3, 3, 3, 3, 3]);
        assert_eq!(legal_categories(&s, &r), LOWER_JOKER_MASK);
        assert_eq!(apply_category(&s, &r, CATEGORY_FULL_HOUSE).unwrap().0, 25);
        assert_eq!(apply_category(&s, &r, CATEGORY_SMALL_STRAIGHT).unwrap().0, 30);
        assert_eq!(apply_category(&s, &r, CATEGORY_LARGE_STRAIGHT).unwrap().0, 40);
        assert_eq!(apply_category(&s, &r, CATEGORY_CHANCE).unwrap().0, 15);
        assert_eq!(apply_category(&s, &r, CATEGORY_FOUR_OF_A_KIND).unwrap().0, 15);
    }

    #[test]
    fn test_joker_upper_zero() {
        let used = ALL_CATEGORIES_MASK & !(1 << CATEGORY_ONES);
        let s = state(used, 0, true);
        let r = roll([6, 6, 6, 6, 6]);
        assert_eq!(legal_categories(&s, &r), 1 << CATEGORY_ONES);
        let (points, next) = apply_category(&s, &r, CATEGORY_ONES).unwrap();
        assert_eq!(points, 100);
        assert!(next.is_terminal());
    }

    #[test]
    fn test_open_yahtzee_box_is_not_joker() {
        let r = roll([2, 2, 2, 2, 2]);
        assert_eq!(legal_categories(&GameState::INITIAL, &r), ALL_CATEGORIES_MASK);
        let (points, _) = apply_category(&GameState::INITIAL, &r, CATEGORY_FULL_HOUSE).unwrap();
        assert_eq!(points, 0);
    }

    #[test]
    fn test_for_each_action_order() {
        let s = state(ALL_CATEGORIES_MASK ^ (1 << CATEGORY_SIXES | 1 << CATEGORY_CHANCE), 0, false);
        let r = roll([1, 1, 6, 6, 6]);
        let mut raw = [0u32; CATEGORY_COUNT];
        for c in 0..CATEGORY_COUNT {
            raw[c] = calculate_category_score(&r, c);
        }
        let mut seen = Vec::new();
        for_each_action(&s, &r, &raw, |c, p, _| seen.push((c, p)));
        assert_eq!(seen, vec![(CATEGORY_SIXES, 18), (CATEGORY_CHANCE, 20)]);
    }

    #[test]
    fn test_terminal_is_game_over() {
        let s = state(ALL_CATEGORIES_MASK, 0, false);
        let err = apply_category(&s, &roll([1, 2, 3, 4, 5]), CATEGORY_CHANCE).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::GameOver);
    }
}
