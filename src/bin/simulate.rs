//! Play games with the optimal policy and report score statistics.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use yahtzee::api_computations::QueryEngine;
use yahtzee::env_config::{db_path, init_base_path, init_logging, init_rayon_threads};
use yahtzee::simulation::simulate_batch;
use yahtzee::{Database, Error};

#[derive(Parser, Debug)]
#[command(name = "yahtzee-simulate", about = "Simulate games with the optimal strategy")]
struct Args {
    /// Database path (default: $YAHTZEE_DB_PATH or data/yahtzee.db).
    db: Option<PathBuf>,

    #[arg(short, long, default_value_t = 100_000)]
    games: usize,

    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Write the summary as JSON.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    init_logging();
    init_base_path();
    init_rayon_threads();

    if let Err(e) = run(args) {
        error!(error = %e, "simulation failed");
        std::process::exit(1);
    }
}

fn run(args: Args) -> yahtzee::Result<()> {
    let db = Database::open(db_path(args.db))?;
    let summary = simulate_batch(&QueryEngine::new(&db), args.games, args.seed)?;

    println!("Games:    {}", summary.games);
    println!("Expected: {:.4}", summary.expected);
    println!("Mean:     {:.4}", summary.mean);
    println!("Std dev:  {:.4}", summary.std_dev);
    println!("Min:      {}", summary.min);
    println!("Median:   {}", summary.median);
    println!("Max:      {}", summary.max);

    if let Some(path) = args.output {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        std::fs::write(&path, json)?;
        info!(path = %path.display(), "summary written");
    }
    db.close();
    Ok(())
}
