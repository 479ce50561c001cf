//! Shared environment configuration for the Yahtzee binaries.
//!
//! Consolidates the `YAHTZEE_BASE_PATH`, `YAHTZEE_DB_PATH`, `YAHTZEE_LOG` and
//! `RAYON_NUM_THREADS` reads.

use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;

/// Default database location, relative to the base path.
pub const DEFAULT_DB_PATH: &str = "data/yahtzee.db";

/// Install the fmt subscriber at the level named by `YAHTZEE_LOG` (default `info`).
pub fn init_logging() {
    let level = std::env::var("YAHTZEE_LOG")
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

/// Read `YAHTZEE_BASE_PATH` (default `"."`) and chdir into it. Exits on failure.
pub fn init_base_path() -> PathBuf {
    let base_path = std::env::var("YAHTZEE_BASE_PATH").unwrap_or_else(|_| ".".to_string());
    let path = PathBuf::from(&base_path);
    if let Err(e) = std::env::set_current_dir(&path) {
        error!(path = %base_path, error = %e, "failed to change directory");
        std::process::exit(1);
    }
    if let Ok(cwd) = std::env::current_dir() {
        info!(cwd = %cwd.display(), "working directory");
    }
    path
}

/// Database path: the explicit argument, else `YAHTZEE_DB_PATH`, else the default.
pub fn db_path(arg: Option<PathBuf>) -> PathBuf {
    arg.or_else(|| std::env::var_os("YAHTZEE_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
}

/// Read `RAYON_NUM_THREADS` (fallback `OMP_NUM_THREADS`, default 8) and build
/// the global pool. An already initialised pool is kept. Returns the count.
pub fn init_rayon_threads() -> usize {
    let num_threads = std::env::var("RAYON_NUM_THREADS")
        .or_else(|_| std::env::var("OMP_NUM_THREADS"))
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8);
    if rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .is_err()
    {
        info!("rayon pool already initialised");
    }
    info!(threads = num_threads, "rayon threads");
    num_threads
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_db_path_wins() {
        let p = db_path(Some(PathBuf::from("/tmp/other.db")));
        assert_eq!(p, PathBuf::from("/tmp/other.db"));
    }
}
