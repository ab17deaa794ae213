use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};

use gridline_terminal::config::{self, AppConfig};
use gridline_terminal::dataset;
use gridline_terminal::features;
use gridline_terminal::provider::Provider;

fn main() -> Result<()> {
    config::load_dotenv();
    let mut cfg = AppConfig::from_env();
    if let Some(db) = parse_path_arg("--db") {
        cfg.db_path = db;
    }
    if let Some(seasons) = parse_value_arg("--seasons").and_then(|raw| config::parse_seasons(&raw))
    {
        cfg.seasons = seasons;
    }
    let target_date = parse_value_arg("--date")
        .map(|raw| {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .with_context(|| format!("invalid --date {raw}; expected YYYY-MM-DD"))
        })
        .transpose()?
        .unwrap_or_else(|| Local::now().date_naive());

    let provider = Provider::new(&cfg);
    let mut conn = dataset::open_db(&cfg.db_path)?;

    println!(
        "Building dataset for seasons {}..{} into {}",
        cfg.seasons.first().copied().unwrap_or_default(),
        cfg.seasons.last().copied().unwrap_or_default(),
        cfg.db_path.display()
    );

    let schedules = provider.fetch_schedules(&cfg.seasons)?;
    let lines = provider.fetch_lines(&cfg.seasons)?;
    let stats = provider.fetch_team_stats(&cfg.seasons)?;

    if schedules.dropped_unknown_team > 0 || schedules.dropped_malformed > 0 {
        eprintln!(
            "[WARN] schedules: dropped {} unknown-team rows, {} malformed rows",
            schedules.dropped_unknown_team, schedules.dropped_malformed
        );
    }
    if lines.dropped_malformed > 0 {
        eprintln!(
            "[WARN] lines ({}): dropped {} malformed rows",
            lines.endpoint, lines.dropped_malformed
        );
    }
    if stats.dropped_unknown_team > 0 {
        eprintln!(
            "[WARN] team stats: dropped {} unknown-team rows",
            stats.dropped_unknown_team
        );
    }

    let historical = features::build_historical(&schedules.rows, &lines.rows, &stats.rows);
    if historical.dropped_missing_fields > 0 {
        eprintln!(
            "[WARN] features_all: dropped {} rows with missing fields ({} unlabeled games skipped)",
            historical.dropped_missing_fields, historical.dropped_no_label
        );
    }
    dataset::replace_features_all(&mut conn, &historical.rows)?;
    println!(
        "features_all: {} rows (lines endpoint: {})",
        historical.rows.len(),
        lines.endpoint
    );

    // Today's slate may belong to a season outside the historical range.
    let today_season = features::season_for_date(target_date);
    let (sched_rows, line_rows, stat_rows);
    if cfg.seasons.contains(&today_season) {
        sched_rows = schedules.rows;
        line_rows = lines.rows;
        stat_rows = stats.rows;
    } else {
        sched_rows = provider.fetch_schedules(&[today_season])?.rows;
        line_rows = provider.fetch_lines(&[today_season])?.rows;
        stat_rows = provider.fetch_team_stats(&[today_season])?.rows;
    }

    let today = features::build_today(&sched_rows, &line_rows, &stat_rows, target_date);
    if today.dropped_missing_fields > 0 {
        eprintln!(
            "[WARN] todays_games: dropped {} rows with missing fields",
            today.dropped_missing_fields
        );
    }
    dataset::replace_todays_games(&mut conn, &today.rows)?;
    if today.rows.is_empty() {
        println!("No NFL games found for {target_date}");
    } else {
        println!("todays_games: {} rows for {target_date}", today.rows.len());
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
