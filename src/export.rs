//! Workbook export of today's slate and a per-season summary of the
//! historical feature table.

use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::features::FeatureRow;
use crate::predict::GamePrediction;

pub struct ExportReport {
    pub games: usize,
    pub prediction_columns: usize,
    pub feature_seasons: usize,
}

pub fn export_workbook(
    path: &Path,
    predictions: &[GamePrediction],
    features: &[FeatureRow],
) -> Result<ExportReport> {
    let prediction_columns = column_names(predictions);

    let mut games_rows = vec![{
        let mut header = vec![
            "Gameday".to_string(),
            "Away".to_string(),
            "Home".to_string(),
            "Spread".to_string(),
            "Total".to_string(),
            "Home ML".to_string(),
            "Away ML".to_string(),
        ];
        header.extend(prediction_columns.iter().cloned());
        header
    }];

    for prediction in predictions {
        let g = &prediction.game;
        let mut row = vec![
            g.gameday.format("%Y-%m-%d").to_string(),
            g.away_team.clone(),
            g.home_team.clone(),
            format!("{:+.1}", g.spread_line),
            format!("{:.1}", g.total_line),
            format!("{:+.0}", g.home_moneyline),
            format!("{:+.0}", g.away_moneyline),
        ];
        for name in &prediction_columns {
            let cell = prediction
                .columns
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, p)| format!("{:.1}%", p * 100.0))
                .unwrap_or_default();
            row.push(cell);
        }
        games_rows.push(row);
    }

    let summary_rows = features_summary_rows(features);
    let feature_seasons = summary_rows.len().saturating_sub(1);

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("TodaysGames")?;
        write_rows(sheet, &games_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("FeaturesSummary")?;
        write_rows(sheet, &summary_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        games: predictions.len(),
        prediction_columns: prediction_columns.len(),
        feature_seasons,
    })
}

fn column_names(predictions: &[GamePrediction]) -> Vec<String> {
    let mut names = Vec::new();
    for prediction in predictions {
        for (name, _) in &prediction.columns {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}

fn features_summary_rows(features: &[FeatureRow]) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Season".to_string(),
        "Games".to_string(),
        "Home Win Rate".to_string(),
        "Over Rate".to_string(),
        "Pushes".to_string(),
    ]];

    let mut seasons = features.iter().map(|r| r.game.season).collect::<Vec<_>>();
    seasons.sort_unstable();
    seasons.dedup();

    for season in seasons {
        let mut games = 0usize;
        let mut home_wins = 0usize;
        let mut overs = 0usize;
        let mut pushes = 0usize;
        for row in features.iter().filter(|r| r.game.season == season) {
            games += 1;
            if row.home_win == 1 {
                home_wins += 1;
            }
            match row.ou_cover {
                1 => overs += 1,
                -1 => pushes += 1,
                _ => {}
            }
        }
        let decided = games.saturating_sub(pushes).max(1);
        rows.push(vec![
            season.to_string(),
            games.to_string(),
            format!("{:.1}%", home_wins as f64 / games.max(1) as f64 * 100.0),
            format!("{:.1}%", overs as f64 / decided as f64 * 100.0),
            pushes.to_string(),
        ]);
    }
    rows
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
