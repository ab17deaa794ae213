use std::path::PathBuf;

use anyhow::{Context, Result};

use gridline_terminal::config::{self, AppConfig};
use gridline_terminal::dataset;
use gridline_terminal::train;

const DEFAULT_BOOST_RESTARTS: usize = 25;

fn main() -> Result<()> {
    config::load_dotenv();
    let mut cfg = AppConfig::from_env();
    if let Some(db) = parse_path_arg("--db") {
        cfg.db_path = db;
    }
    if let Some(dir) = parse_path_arg("--models-dir") {
        cfg.models_dir = dir;
    }
    let restarts = parse_value_arg("--restarts")
        .map(|raw| {
            raw.trim()
                .parse::<usize>()
                .with_context(|| format!("invalid --restarts {raw}"))
        })
        .transpose()?
        .unwrap_or(DEFAULT_BOOST_RESTARTS)
        .clamp(1, 200);

    let conn = dataset::open_db(&cfg.db_path)?;
    let rows = dataset::load_features_all(&conn)?;
    println!(
        "Training on {} feature rows from {}",
        rows.len(),
        cfg.db_path.display()
    );

    let outcomes = train::train_all(&rows, &cfg.models_dir, restarts)?;

    println!("Models written to {}", cfg.models_dir.display());
    for outcome in &outcomes {
        println!(
            "{:>6} {:<9} rows={} accuracy={:.1}% log_loss={:.3}",
            outcome.family.label(),
            outcome.market.slug(),
            outcome.rows_used,
            outcome.holdout_accuracy * 100.0,
            outcome.holdout_log_loss
        );
    }

    Ok(())
}

fn parse_value_arg(flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    parse_value_arg(flag).map(PathBuf::from)
}
