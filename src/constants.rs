//! Game constants, index-space dimensions and database format constants.
//!
//! - |categories| = [`CATEGORY_COUNT`] = 13 (standard Yahtzee)
//! - |rolls| = [`NUM_DICE_SETS`] = 252 sorted 5-dice multisets
//! - |keeps| = [`NUM_KEEP_MULTISETS`] = 462 multisets of 0-5 dice
//! - |state codes| = [`NUM_STATE_CODES`] = 2^13 used-masks * 64 upper scores * 2 bonus flags

/// Number of scoring categories (Ones through Chance).
pub const CATEGORY_COUNT: usize = 13;

/// Dice per roll.
pub const DICE_COUNT: usize = 5;

/// Faces per die.
pub const FACE_COUNT: usize = 6;

/// Radix of the roll code. Each digit holds the count (0-5) of one face.
pub const ROLL_CODE_RADIX: u32 = 7;

/// Size of the sparse roll-code space: 7^6.
pub const ROLL_CODE_SPACE: usize = (ROLL_CODE_RADIX as usize).pow(FACE_COUNT as u32);

/// Number of distinct sorted 5-dice multisets from {1..6}: C(10,5) = 252.
pub const NUM_DICE_SETS: usize = 252;

/// Number of keep-multisets of 0-5 dice from {1..6}: 1+6+21+56+126+252 = 462.
pub const NUM_KEEP_MULTISETS: usize = 462;

/// Roll stages per turn: first roll, after first reroll, after second reroll.
pub const NUM_ROLL_STAGES: usize = 3;

/// Upper-section total needed for the bonus; also the cap of the tracked upper score.
pub const UPPER_SCORE_CAP: u32 = 63;

/// Upper-section bonus, paid by the scoring action that reaches the cap.
pub const UPPER_BONUS: u32 = 35;

pub const FULL_HOUSE_SCORE: u32 = 25;
pub const SMALL_STRAIGHT_SCORE: u32 = 30;
pub const LARGE_STRAIGHT_SCORE: u32 = 40;
pub const YAHTZEE_SCORE: u32 = 50;

/// Paid for every further Yahtzee once the Yahtzee category holds 50.
pub const YAHTZEE_BONUS: u32 = 100;

/// Category indices, used as bit positions in the used-category mask.
pub const CATEGORY_ONES: usize = 0;
pub const CATEGORY_TWOS: usize = 1;
pub const CATEGORY_THREES: usize = 2;
pub const CATEGORY_FOURS: usize = 3;
pub const CATEGORY_FIVES: usize = 4;
pub const CATEGORY_SIXES: usize = 5;
pub const CATEGORY_THREE_OF_A_KIND: usize = 6;
pub const CATEGORY_FOUR_OF_A_KIND: usize = 7;
pub const CATEGORY_FULL_HOUSE: usize = 8;
pub const CATEGORY_SMALL_STRAIGHT: usize = 9;
pub const CATEGORY_LARGE_STRAIGHT: usize = 10;
pub const CATEGORY_YAHTZEE: usize = 11;
pub const CATEGORY_CHANCE: usize = 12;

/// Human-readable category names.
pub const CATEGORY_NAMES: [&str; CATEGORY_COUNT] = [
    "Ones",
    "Twos",
    "Threes",
    "Fours",
    "Fives",
    "Sixes",
    "Three of a Kind",
    "Four of a Kind",
    "Full House",
    "Small Straight",
    "Large Straight",
    "Yahtzee",
    "Chance",
];

/// One-letter symbols used when printing a scorecard.
pub const CATEGORY_SYMBOLS: [char; CATEGORY_COUNT] = [
    '1', '2', '3', '4', '5', '6', 'T', 'Q', 'F', 's', 'S', 'Y', 'C',
];

/// Mask with every category bit set (terminal scorecard).
pub const ALL_CATEGORIES_MASK: u16 = (1 << CATEGORY_COUNT) - 1;

/// Mask of the six upper-section categories.
pub const UPPER_CATEGORIES_MASK: u16 = 0x3F;

/// Mask of the lower-section categories other than Yahtzee.
pub const LOWER_JOKER_MASK: u16 =
    ALL_CATEGORIES_MASK & !UPPER_CATEGORIES_MASK & !(1 << CATEGORY_YAHTZEE);

/// State code layout: used mask in bits 0-12, upper score in bits 13-18, bonus flag in bit 19.
pub const UPPER_SCORE_SHIFT: u32 = CATEGORY_COUNT as u32;
pub const UPPER_SCORE_MASK: u32 = 0x3F;
pub const YAHTZEE_FLAG_SHIFT: u32 = UPPER_SCORE_SHIFT + 6;

/// Size of the dense state-code space: 2^20.
pub const NUM_STATE_CODES: usize = 1 << (YAHTZEE_FLAG_SHIFT + 1);

/// State code of the empty scorecard.
pub const INITIAL_STATE: u32 = 0;

/// Database magic number: "YZDB" read as a little-endian u32.
pub const DATABASE_MAGIC: u32 = 0x4244_5A59;

/// Database format version.
pub const DATABASE_VERSION: u32 = 1;

/// Header: magic, version, categories, rolls, stages, root, reachable count, reserved.
pub const DATABASE_HEADER_SIZE: usize = 32;

/// Bytes per persisted state value (f64).
pub const STATE_VALUE_SIZE: usize = 8;

/// Bytes per record: f32 value + u8 action.
pub const RECORD_SIZE: usize = 5;

/// Records per state: every stage for every roll.
pub const RECORDS_PER_STATE: usize = NUM_ROLL_STAGES * NUM_DICE_SETS;

/// Keep mask selecting all five dice.
pub const KEEP_ALL_MASK: u8 = (1 << DICE_COUNT) - 1;

/// Action byte stored for states that have no action (terminal scorecard).
pub const NO_ACTION: u8 = 0xFF;

/// Test whether category `cat` is used (bit `cat` is set).
#[inline(always)]
pub fn is_category_used(used: u16, cat: usize) -> bool {
    (used & (1 << cat)) != 0
}

/// Categories 0-5 feed the upper-section total.
#[inline(always)]
pub fn is_upper_category(cat: usize) -> bool {
    cat < FACE_COUNT
}
