//! Turn-by-turn advisor for games played with real dice.
//!
//! Keeps one score card per player, reads rolls and commands, and answers with
//! the optimal keep after the first and second roll and the ranked categories
//! after the final roll. Every card starts at the database root.

use std::fmt;

use crate::api_computations::{parse_dice, CategoryValue, QueryEngine};
use crate::constants::*;
use crate::dice_mechanics::Roll;
use crate::error::{Error, Result};
use crate::game_mechanics::apply_category;
use crate::state_codec::GameState;
use crate::storage::Database;
use crate::types::RollStage;

pub const HELP: &str = "\
Commands:
  <dice>      enter a roll, e.g. 13366
  <symbol>    score the final roll: 1-6 T(3 of a kind) Q(4 of a kind)
              F(full house) s(small straight) S(large straight) Y C(chance)
  players N   set the number of players to N
  player N    switch the turn to player N
  bonus N     add N points that count towards the upper bonus
  score N     add N points that do not count towards the upper bonus
  help        this text
  quit        leave";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Roll(Vec<u8>),
    Choose(usize),
    Players(usize),
    Player(usize),
    Bonus(i32),
    Score(i32),
    Help,
    Quit,
}

fn number<T: std::str::FromStr>(word: Option<&str>, command: &str) -> Result<T> {
    word.and_then(|w| w.parse().ok())
        .ok_or_else(|| Error::range(format!("'{}' needs a number", command)))
}

/// Parse one input line into commands. Words that take an argument consume
/// the next word.
pub fn parse_line(line: &str) -> Result<Vec<Command>> {
    let mut words = line.split_whitespace();
    let mut commands = Vec::new();
    while let Some(word) = words.next() {
        let cmd = match word {
            "players" => Command::Players(number(words.next(), word)?),
            "player" => Command::Player(number(words.next(), word)?),
            "bonus" => Command::Bonus(number(words.next(), word)?),
            "score" => Command::Score(number(words.next(), word)?),
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            w if w.len() == DICE_COUNT => Command::Roll(parse_dice(w)?),
            w => {
                let mut chars = w.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => match CATEGORY_SYMBOLS.iter().position(|&s| s == c) {
                        Some(cat) => Command::Choose(cat),
                        None => return Err(Error::range(format!("unknown category '{}'", c))),
                    },
                    _ => return Err(Error::range(format!("unknown command '{}'", w))),
                }
            }
        };
        commands.push(cmd);
    }
    Ok(commands)
}

/// One player's progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerCard {
    pub state: GameState,
    pub points: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// Keep advice for the first or second roll.
    Keep {
        stage: RollStage,
        kept: Vec<u8>,
        expected_total: f64,
    },
    /// Legal categories for the final roll, best first. `base_points` is the
    /// card total before this turn.
    Choices {
        options: Vec<CategoryValue>,
        base_points: u32,
    },
    Scored {
        player: usize,
        category: usize,
        points: u32,
        total: u32,
        game_over: bool,
    },
    Players(usize),
    Turn(usize),
    Adjusted {
        points: u32,
        upper_score: u8,
    },
    Help,
    Quit,
}

fn format_dice(dice: &[u8]) -> String {
    if dice.is_empty() {
        return "nothing".to_string();
    }
    dice.iter().map(|d| char::from(b'0' + d)).collect()
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Keep {
                kept,
                expected_total,
                ..
            } => write!(
                f,
                "I would keep {} (expected final score {:.1}).",
                format_dice(kept),
                expected_total
            ),
            Reply::Choices {
                options,
                base_points,
            } => {
                if let Some(best) = options.first() {
                    writeln!(
                        f,
                        "I would score {} for {} points (E={:.1}). All options:",
                        best.name,
                        best.points,
                        *base_points as f64 + best.expected_total
                    )?;
                }
                for (i, cv) in options.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(
                        f,
                        "  {}  {:<16} {:>4} pts  (E={:.1})",
                        CATEGORY_SYMBOLS[cv.category],
                        cv.name,
                        cv.points,
                        *base_points as f64 + cv.expected_total
                    )?;
                }
                Ok(())
            }
            Reply::Scored {
                player,
                category,
                points,
                total,
                game_over,
            } => {
                write!(
                    f,
                    "P{} scored {} points in {}, total {}.",
                    player + 1,
                    points,
                    CATEGORY_NAMES[*category],
                    total
                )?;
                if *game_over {
                    write!(f, " Card complete.")?;
                }
                Ok(())
            }
            Reply::Players(n) => write!(f, "{} players.", n),
            Reply::Turn(i) => write!(f, "Turn of P{}.", i + 1),
            Reply::Adjusted {
                points,
                upper_score,
            } => write!(f, "Total {}, upper section {}.", points, upper_score),
            Reply::Help => write!(f, "{}", HELP),
            Reply::Quit => write!(f, "Bye."),
        }
    }
}

/// Interactive session state over one database.
pub struct Advisor<'db> {
    engine: QueryEngine<'db>,
    start: GameState,
    players: Vec<PlayerCard>,
    current: usize,
    stage: RollStage,
    final_roll: Option<Vec<u8>>,
}

impl<'db> Advisor<'db> {
    pub fn new(db: &'db Database) -> Result<Self> {
        let engine = QueryEngine::new(db);
        let start = GameState::decode(engine.root())?;
        Ok(Self {
            engine,
            start,
            players: vec![PlayerCard {
                state: start,
                points: 0,
            }],
            current: 0,
            stage: RollStage::First,
            final_roll: None,
        })
    }

    pub fn players(&self) -> &[PlayerCard] {
        &self.players
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn stage(&self) -> RollStage {
        self.stage
    }

    pub fn prompt(&self) -> String {
        let card = &self.players[self.current];
        let who = if self.players.len() > 1 {
            format!("P{} ", self.current + 1)
        } else {
            String::new()
        };
        let ask = match (self.stage, &self.final_roll) {
            (RollStage::First, _) => "Input roll or command or 'help':",
            (_, Some(_)) => "Which category do you choose?",
            _ => "Input roll:",
        };
        format!("{}{:3} {} {}", who, card.points, card.state, ask)
    }

    fn reset_turn(&mut self) {
        self.stage = RollStage::First;
        self.final_roll = None;
    }

    pub fn execute(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::Roll(dice) => self.roll(dice),
            Command::Choose(category) => self.choose(category),
            Command::Players(n) => {
                if n == 0 {
                    return Err(Error::range("at least one player is needed"));
                }
                let start = self.start;
                self.players.resize(n, PlayerCard { state: start, points: 0 });
                if self.current >= n {
                    self.current = 0;
                }
                self.reset_turn();
                Ok(Reply::Players(n))
            }
            Command::Player(i) => {
                if i == 0 || i > self.players.len() {
                    return Err(Error::range(format!(
                        "player {} outside 1..={}",
                        i,
                        self.players.len()
                    )));
                }
                self.current = i - 1;
                self.reset_turn();
                Ok(Reply::Turn(self.current))
            }
            Command::Score(n) => {
                let card = &mut self.players[self.current];
                card.points = card.points.saturating_add_signed(n);
                Ok(Reply::Adjusted {
                    points: card.points,
                    upper_score: card.state.upper_score(),
                })
            }
            Command::Bonus(n) => self.adjust_upper(n),
            Command::Help => Ok(Reply::Help),
            Command::Quit => Ok(Reply::Quit),
        }
    }

    fn roll(&mut self, dice: Vec<u8>) -> Result<Reply> {
        let card = self.players[self.current];
        let code = card.state.encode();
        let (kept, next_stage) = match self.stage {
            RollStage::First => (self.engine.keep_first(code, &dice)?, RollStage::Second),
            RollStage::Second => (self.engine.keep_second(code, &dice)?, RollStage::Final),
            RollStage::Final => {
                let mut options = self.engine.category_values(code, &dice)?;
                options.sort_by(|a, b| b.expected_total.total_cmp(&a.expected_total));
                self.final_roll = Some(dice);
                return Ok(Reply::Choices {
                    options,
                    base_points: card.points,
                });
            }
        };
        let expected = self.engine.expected_value(code, self.stage, &dice)?;
        let reply = Reply::Keep {
            stage: self.stage,
            kept,
            expected_total: card.points as f64 + expected,
        };
        self.stage = next_stage;
        Ok(reply)
    }

    fn choose(&mut self, category: usize) -> Result<Reply> {
        let dice = self
            .final_roll
            .as_deref()
            .ok_or_else(|| Error::range("enter the final roll before choosing a category"))?;
        let roll = Roll::from_dice(dice)?;
        let player = self.current;
        let card = &mut self.players[player];
        let (points, next) = apply_category(&card.state, &roll, category)?;
        card.state = next;
        card.points += points;
        let reply = Reply::Scored {
            player,
            category,
            points,
            total: card.points,
            game_over: next.is_terminal(),
        };
        self.current = (self.current + 1) % self.players.len();
        self.reset_turn();
        Ok(reply)
    }

    /// Add points that count towards the upper section. The tracked upper
    /// total is capped at 63; crossing the cap in either direction moves the
    /// 35-point bonus with it.
    fn adjust_upper(&mut self, n: i32) -> Result<Reply> {
        let card = &mut self.players[self.current];
        let old_up = card.state.upper_score() as u32;
        let new_up = old_up.saturating_add_signed(n).min(UPPER_SCORE_CAP);
        let mut points = card.points.saturating_add_signed(n);
        if old_up < UPPER_SCORE_CAP && new_up == UPPER_SCORE_CAP {
            points += UPPER_BONUS;
        } else if old_up == UPPER_SCORE_CAP && new_up < UPPER_SCORE_CAP {
            points = points.saturating_sub(UPPER_BONUS);
        }
        card.state = GameState::new(card.state.used(), new_up as u8, card.state.yahtzee_bonus())?;
        card.points = points;
        Ok(Reply::Adjusted {
            points,
            upper_score: new_up as u8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::state_computation::solve_from;

    fn yahtzee_chance_db() -> Database {
        let used = ALL_CATEGORIES_MASK ^ (1 << CATEGORY_YAHTZEE | 1 << CATEGORY_CHANCE);
        let root = GameState::new(used, 0, false).unwrap().encode();
        Database::from_table(solve_from(root).unwrap())
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(
            parse_line("13366 Y players 2").unwrap(),
            vec![
                Command::Roll(vec![1, 3, 3, 6, 6]),
                Command::Choose(CATEGORY_YAHTZEE),
                Command::Players(2),
            ]
        );
        assert_eq!(
            parse_line("6 s").unwrap(),
            vec![
                Command::Choose(CATEGORY_SIXES),
                Command::Choose(CATEGORY_SMALL_STRAIGHT),
            ]
        );
        assert_eq!(parse_line("bonus -5").unwrap(), vec![Command::Bonus(-5)]);
        assert!(parse_line("players").is_err());
        assert!(parse_line("bogus").is_err());
        assert!(parse_line("X").is_err());
        assert!(parse_line("1336a").is_err());
        assert!(parse_line("   ").unwrap().is_empty());
    }

    #[test]
    fn test_full_turn() {
        let db = yahtzee_chance_db();
        let mut advisor = Advisor::new(&db).unwrap();
        let dice = vec![2, 3, 3, 5, 5];

        match advisor.execute(Command::Roll(dice.clone())).unwrap() {
            Reply::Keep { stage, kept, .. } => {
                assert_eq!(stage, RollStage::First);
                assert_eq!(kept, vec![5, 5]);
            }
            other => panic!("unexpected reply {:?}", other),
        }
        assert_eq!(advisor.stage(), RollStage::Second);
        advisor.execute(Command::Roll(dice.clone())).unwrap();
        assert_eq!(advisor.stage(), RollStage::Final);

        match advisor.execute(Command::Roll(dice)).unwrap() {
            Reply::Choices { options, .. } => {
                assert_eq!(options.len(), 2);
                assert_eq!(options[0].category, CATEGORY_YAHTZEE);
                assert!((options[0].expected_total - 23.333333333333336).abs() < 1e-9);
                assert_eq!(options[1].category, CATEGORY_CHANCE);
            }
            other => panic!("unexpected reply {:?}", other),
        }

        match advisor.execute(Command::Choose(CATEGORY_YAHTZEE)).unwrap() {
            Reply::Scored {
                points, game_over, ..
            } => {
                assert_eq!(points, 0);
                assert!(!game_over);
            }
            other => panic!("unexpected reply {:?}", other),
        }
        assert_eq!(advisor.stage(), RollStage::First);
        assert!(advisor.players()[0].state.is_used(CATEGORY_YAHTZEE));
    }

    #[test]
    fn test_choose_needs_final_roll() {
        let db = yahtzee_chance_db();
        let mut advisor = Advisor::new(&db).unwrap();
        let err = advisor.execute(Command::Choose(CATEGORY_CHANCE)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        // A bad roll leaves the turn where it was.
        assert!(advisor.execute(Command::Roll(vec![1, 2, 3])).is_err());
        assert_eq!(advisor.stage(), RollStage::First);
    }

    #[test]
    fn test_players_take_turns() {
        let db = yahtzee_chance_db();
        let mut advisor = Advisor::new(&db).unwrap();
        advisor.execute(Command::Players(2)).unwrap();
        assert_eq!(advisor.players().len(), 2);
        for _ in 0..3 {
            advisor.execute(Command::Roll(vec![6, 6, 6, 6, 6])).unwrap();
        }
        advisor.execute(Command::Choose(CATEGORY_YAHTZEE)).unwrap();
        assert_eq!(advisor.current(), 1);
        assert_eq!(advisor.players()[0].points, 50);
        assert_eq!(advisor.players()[1].points, 0);
        assert!(advisor.prompt().starts_with("P2 "));

        advisor.execute(Command::Player(1)).unwrap();
        assert_eq!(advisor.current(), 0);
        assert!(advisor.execute(Command::Player(3)).is_err());
        assert!(advisor.execute(Command::Players(0)).is_err());
    }

    #[test]
    fn test_finished_card_is_game_over() {
        let db = yahtzee_chance_db();
        let mut advisor = Advisor::new(&db).unwrap();
        for cat in [CATEGORY_CHANCE, CATEGORY_YAHTZEE] {
            for _ in 0..3 {
                advisor.execute(Command::Roll(vec![1, 2, 3, 4, 6])).unwrap();
            }
            advisor.execute(Command::Choose(cat)).unwrap();
        }
        assert_eq!(advisor.players()[0].points, 16);
        assert!(advisor.players()[0].state.is_terminal());
        let err = advisor.execute(Command::Roll(vec![1, 2, 3, 4, 6])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GameOver);
    }

    #[test]
    fn test_adjustments() {
        let db = yahtzee_chance_db();
        let mut advisor = Advisor::new(&db).unwrap();
        assert_eq!(
            advisor.execute(Command::Score(10)).unwrap(),
            Reply::Adjusted {
                points: 10,
                upper_score: 0
            }
        );
        assert_eq!(
            advisor.execute(Command::Bonus(63)).unwrap(),
            Reply::Adjusted {
                points: 10 + 63 + 35,
                upper_score: 63
            }
        );
        assert_eq!(
            advisor.execute(Command::Bonus(-1)).unwrap(),
            Reply::Adjusted {
                points: 10 + 62,
                upper_score: 62
            }
        );
        assert_eq!(
            advisor.execute(Command::Score(-500)).unwrap(),
            Reply::Adjusted {
                points: 0,
                upper_score: 62
            }
        );
    }

    #[test]
    fn test_reply_text() {
        let keep = Reply::Keep {
            stage: RollStage::First,
            kept: vec![],
            expected_total: 12.34,
        };
        assert_eq!(keep.to_string(), "I would keep nothing (expected final score 12.3).");
        let keep = Reply::Keep {
            stage: RollStage::Second,
            kept: vec![5, 5],
            expected_total: 1.0,
        };
        assert!(keep.to_string().starts_with("I would keep 55 "));
    }
}
