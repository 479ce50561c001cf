//! Print the optimal decisions for one state and roll.

use std::path::PathBuf;

use clap::Parser;
use tracing::error;

use yahtzee::api_computations::{parse_dice, parse_state_code, QueryEngine};
use yahtzee::constants::CATEGORY_NAMES;
use yahtzee::env_config::{db_path, init_base_path, init_logging};
use yahtzee::{Database, GameState};

#[derive(Parser, Debug)]
#[command(name = "yahtzee-lookup", about = "Query the strategy database")]
struct Args {
    /// Database path (default: $YAHTZEE_DB_PATH or data/yahtzee.db).
    db: Option<PathBuf>,

    /// State code, decimal or 0x-prefixed hex (default: database root).
    #[arg(long)]
    state: Option<String>,

    /// Dice, e.g. 66666 or 1,3,3,6,6.
    #[arg(long)]
    roll: Option<String>,
}

fn main() {
    let args = Args::parse();
    init_logging();
    init_base_path();

    if let Err(e) = run(args) {
        error!(error = %e, code = e.kind().code(), "lookup failed");
        std::process::exit(1);
    }
}

fn run(args: Args) -> yahtzee::Result<()> {
    let db = Database::open(db_path(args.db))?;
    {
        let q = QueryEngine::new(&db);
        let state = match args.state.as_deref() {
            Some(s) => parse_state_code(s)?,
            None => q.root(),
        };
        println!("State {:#07x}  {}", state, GameState::decode(state)?);
        println!("Expected points from turn start: {:.4}", q.lookup(state)?);

        if let Some(roll) = args.roll.as_deref() {
            let dice = parse_dice(roll)?;
            println!("Roll {:?}", dice);
            println!("  keep after first roll:  {:?}", q.keep_first(state, &dice)?);
            println!("  keep after second roll: {:?}", q.keep_second(state, &dice)?);
            let best = q.best_action(state, &dice)?;
            println!("  score in: {} ({})", CATEGORY_NAMES[best], best);
            for cv in q.category_values(state, &dice)? {
                let marker = if cv.category == best { '*' } else { ' ' };
                println!(
                    "   {} {:<16} {:>4} pts  {:>9.4} expected",
                    marker, cv.name, cv.points, cv.expected_total
                );
            }
        }
    }
    db.close();
    Ok(())
}
