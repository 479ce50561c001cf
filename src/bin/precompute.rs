//! Solve every state reachable from a root and write the strategy database.

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info};

use yahtzee::api_computations::parse_state_code;
use yahtzee::constants::INITIAL_STATE;
use yahtzee::env_config::{db_path, init_base_path, init_logging, init_rayon_threads};
use yahtzee::phase0_tables::tables;
use yahtzee::state_computation::ValueSolver;
use yahtzee::storage::save;

#[derive(Parser, Debug)]
#[command(name = "yahtzee-precompute", about = "Solve Yahtzee and write the strategy database")]
struct Args {
    /// Output path (default: $YAHTZEE_DB_PATH or data/yahtzee.db).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Root state code, decimal or 0x-prefixed hex (default: empty scorecard).
    #[arg(long)]
    root: Option<String>,
}

fn main() {
    let args = Args::parse();
    init_logging();
    init_base_path();
    init_rayon_threads();

    if let Err(e) = run(args) {
        error!(error = %e, "precompute failed");
        std::process::exit(1);
    }
}

fn run(args: Args) -> yahtzee::Result<()> {
    let root = match args.root.as_deref() {
        Some(s) => parse_state_code(s)?,
        None => INITIAL_STATE,
    };
    let output = db_path(args.output);
    let start = Instant::now();

    tables();
    let table = ValueSolver::new(root)?.solve();
    save(&table, &output)?;

    info!(
        root = format_args!("{:#x}", root),
        expected = table.state_values[0],
        output = %output.display(),
        secs = start.elapsed().as_secs_f64(),
        "precompute complete"
    );
    Ok(())
}
