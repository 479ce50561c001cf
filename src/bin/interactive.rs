//! Play along with a real game: enter rolls, get keeps and category advice.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::error;

use yahtzee::advisor::{parse_line, Advisor, Command, Reply};
use yahtzee::env_config::{db_path, init_base_path, init_logging};
use yahtzee::Database;

#[derive(Parser, Debug)]
#[command(name = "yahtzee-interactive", about = "Turn-by-turn advice from the strategy database")]
struct Args {
    /// Database path (default: $YAHTZEE_DB_PATH or data/yahtzee.db).
    db: Option<PathBuf>,

    /// Number of score cards to track.
    #[arg(short, long, default_value_t = 1)]
    players: usize,
}

fn main() {
    let args = Args::parse();
    init_logging();
    init_base_path();

    if let Err(e) = run(args) {
        error!(error = %e, code = e.kind().code(), "interactive session failed");
        std::process::exit(1);
    }
}

fn run(args: Args) -> yahtzee::Result<()> {
    let db = Database::open(db_path(args.db))?;
    {
        let mut advisor = Advisor::new(&db)?;
        if args.players > 1 {
            advisor.execute(Command::Players(args.players))?;
        }
        let mut out = io::stdout().lock();
        write!(out, "{} ", advisor.prompt())?;
        out.flush()?;
        'session: for line in io::stdin().lock().lines() {
            let line = line?;
            match parse_line(&line) {
                Ok(commands) => {
                    for cmd in commands {
                        match advisor.execute(cmd) {
                            Ok(Reply::Quit) => break 'session,
                            Ok(reply) => writeln!(out, "{}", reply)?,
                            Err(e) => writeln!(out, "{}", e)?,
                        }
                    }
                }
                Err(e) => writeln!(out, "{}", e)?,
            }
            write!(out, "{} ", advisor.prompt())?;
            out.flush()?;
        }
        writeln!(out)?;
    }
    db.close();
    Ok(())
}
