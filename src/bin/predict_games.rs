use std::path::PathBuf;

use anyhow::Result;

use gridline_terminal::config::{self, AppConfig};
use gridline_terminal::dataset;
use gridline_terminal::predict::ModelSet;

fn main() -> Result<()> {
    config::load_dotenv();
    let mut cfg = AppConfig::from_env();
    if let Some(db) = parse_path_arg("--db") {
        cfg.db_path = db;
    }
    if let Some(dir) = parse_path_arg("--models-dir") {
        cfg.models_dir = dir;
    }

    let conn = dataset::open_db(&cfg.db_path)?;
    let games = dataset::load_todays_games(&conn)?;
    if games.is_empty() {
        println!("No games in todays_games — run build_dataset first.");
        return Ok(());
    }

    let models = ModelSet::load(&cfg);
    for warning in &models.warnings {
        eprintln!("[WARN] {warning}");
    }
    if models.is_empty() {
        println!("No model artifacts in {} — run train_models first.", cfg.models_dir.display());
        return Ok(());
    }

    for prediction in models.predict(&games) {
        let g = &prediction.game;
        println!("{} @ {} ({})", g.away_team, g.home_team, g.gameday);
        for (name, prob) in &prediction.columns {
            println!("   {name}: {:.2}", prob);
        }
        println!("{}", "-".repeat(55));
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
