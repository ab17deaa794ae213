//! Feature builder: joins schedules, betting lines, and team stats into the
//! flat rows the model pipeline trains and scores on.
//!
//! Joins are strict about output completeness: a row only makes it into a
//! table when every projected field resolved, and the build report counts
//! what fell out so callers can log it.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::provider::{LineRow, ScheduleRow, TeamStatRow};

/// Numeric projection shared by trainers and the prediction runner, in
/// artifact order. Serialized models depend on this order; changing it
/// invalidates every artifact trained against the old layout.
pub const FEATURE_COLUMNS: [&str; 13] = [
    "spread_line",
    "total_line",
    "home_moneyline",
    "away_moneyline",
    "home_epa",
    "away_epa",
    "home_ppg",
    "away_ppg",
    "epa_diff",
    "ppg_diff",
    "spread_vs_epa",
    "home_implied_prob",
    "away_implied_prob",
];

#[derive(Debug, Clone, PartialEq)]
pub struct TodaysGameRow {
    pub season: u16,
    pub week: u32,
    pub gameday: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub spread_line: f64,
    pub total_line: f64,
    pub home_moneyline: f64,
    pub away_moneyline: f64,
    pub home_epa: f64,
    pub away_epa: f64,
    pub home_ppg: f64,
    pub away_ppg: f64,
    pub epa_diff: f64,
    pub ppg_diff: f64,
    pub spread_vs_epa: f64,
    pub home_implied_prob: f64,
    pub away_implied_prob: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub game: TodaysGameRow,
    pub home_win: i64,
    /// 1 over, 0 under, -1 exact push.
    pub ou_cover: i64,
}

impl TodaysGameRow {
    /// Values in [`FEATURE_COLUMNS`] order.
    pub fn feature_vec(&self) -> Vec<f64> {
        vec![
            self.spread_line,
            self.total_line,
            self.home_moneyline,
            self.away_moneyline,
            self.home_epa,
            self.away_epa,
            self.home_ppg,
            self.away_ppg,
            self.epa_diff,
            self.ppg_diff,
            self.spread_vs_epa,
            self.home_implied_prob,
            self.away_implied_prob,
        ]
    }
}

#[derive(Debug, Default)]
pub struct HistoricalBuild {
    pub rows: Vec<FeatureRow>,
    /// Schedule rows without a final score (future or abandoned games).
    pub dropped_no_label: usize,
    /// Rows where a join key or required field failed to resolve.
    pub dropped_missing_fields: usize,
}

#[derive(Debug, Default)]
pub struct TodayBuild {
    pub rows: Vec<TodaysGameRow>,
    pub dropped_missing_fields: usize,
}

/// Season a calendar date belongs to: the NFL year rolls over in August.
pub fn season_for_date(date: NaiveDate) -> u16 {
    let year = date.year();
    let season = if date.month() >= 8 { year } else { year - 1 };
    season.clamp(1920, i32::from(u16::MAX)) as u16
}

/// Vegas implied win probability from an American moneyline. The home and
/// away probabilities are computed independently and intentionally NOT
/// normalized to sum to one (no de-vigging).
pub fn implied_prob(moneyline: Option<f64>) -> Option<f64> {
    let ml = moneyline?;
    if ml > 0.0 {
        Some(100.0 / (ml + 100.0))
    } else {
        Some(ml.abs() / (ml.abs() + 100.0))
    }
}

/// 1 if the total went over the line, 0 under, -1 on an exact push.
pub fn ou_cover(total_points: f64, total_line: f64) -> i64 {
    if total_points > total_line {
        1
    } else if total_points < total_line {
        0
    } else {
        -1
    }
}

pub fn build_historical(
    schedules: &[ScheduleRow],
    lines: &[LineRow],
    stats: &[TeamStatRow],
) -> HistoricalBuild {
    let lines_by_game = index_lines(lines);
    let stats_by_key = index_stats(stats);

    let mut build = HistoricalBuild::default();
    for sched in schedules {
        let (Some(home_score), Some(away_score)) = (sched.home_score, sched.away_score) else {
            build.dropped_no_label += 1;
            continue;
        };
        let Some(game) = assemble_game(sched, &lines_by_game, &stats_by_key) else {
            build.dropped_missing_fields += 1;
            continue;
        };

        let total_points = f64::from(home_score) + f64::from(away_score);
        build.rows.push(FeatureRow {
            home_win: i64::from(home_score > away_score),
            ou_cover: ou_cover(total_points, game.total_line),
            game,
        });
    }
    build
}

/// Same joins as the historical build, restricted to games on `date` and
/// without label computation (scores do not exist yet). Zero matching games
/// is an empty build, not an error.
pub fn build_today(
    schedules: &[ScheduleRow],
    lines: &[LineRow],
    stats: &[TeamStatRow],
    date: NaiveDate,
) -> TodayBuild {
    let lines_by_game = index_lines(lines);
    let stats_by_key = index_stats(stats);

    let mut build = TodayBuild::default();
    for sched in schedules {
        if sched.gameday != date {
            continue;
        }
        match assemble_game(sched, &lines_by_game, &stats_by_key) {
            Some(game) => build.rows.push(game),
            None => build.dropped_missing_fields += 1,
        }
    }
    build
}

/// Left join onto lines (a schedule row with no line keeps nulls, which the
/// strict projection then drops), two stat joins keyed by (season, team),
/// derived fields afterwards. Returns `None` when any projected field is
/// missing.
fn assemble_game(
    sched: &ScheduleRow,
    lines_by_game: &HashMap<&str, &LineRow>,
    stats_by_key: &HashMap<(u16, &str), &TeamStatRow>,
) -> Option<TodaysGameRow> {
    let line = lines_by_game.get(sched.game_id.as_str());

    let spread_line = line.and_then(|l| l.spread_line)?;
    let total_line = line.and_then(|l| l.total_line)?;
    let home_moneyline = line.and_then(|l| l.home_moneyline)?;
    let away_moneyline = line.and_then(|l| l.away_moneyline)?;

    let home_stats = stats_by_key.get(&(sched.season, sched.home_team.as_str()))?;
    let away_stats = stats_by_key.get(&(sched.season, sched.away_team.as_str()))?;

    let epa_diff = home_stats.epa_per_play - away_stats.epa_per_play;
    let ppg_diff = home_stats.points_per_game - away_stats.points_per_game;

    Some(TodaysGameRow {
        season: sched.season,
        week: sched.week,
        gameday: sched.gameday,
        home_team: sched.home_team.clone(),
        away_team: sched.away_team.clone(),
        spread_line,
        total_line,
        home_moneyline,
        away_moneyline,
        home_epa: home_stats.epa_per_play,
        away_epa: away_stats.epa_per_play,
        home_ppg: home_stats.points_per_game,
        away_ppg: away_stats.points_per_game,
        epa_diff,
        ppg_diff,
        spread_vs_epa: spread_line - epa_diff,
        home_implied_prob: implied_prob(Some(home_moneyline))?,
        away_implied_prob: implied_prob(Some(away_moneyline))?,
    })
}

fn index_lines(lines: &[LineRow]) -> HashMap<&str, &LineRow> {
    // Unmatched betting rows are discarded implicitly: nothing looks them up.
    let mut map = HashMap::with_capacity(lines.len());
    for line in lines {
        map.entry(line.game_id.as_str()).or_insert(line);
    }
    map
}

fn index_stats(stats: &[TeamStatRow]) -> HashMap<(u16, &str), &TeamStatRow> {
    let mut map = HashMap::with_capacity(stats.len());
    for stat in stats {
        map.entry((stat.season, stat.team.as_str())).or_insert(stat);
    }
    map
}
