use chrono::NaiveDate;

use gridline_terminal::features::{build_historical, build_today};
use gridline_terminal::provider::{LineRow, ScheduleRow, TeamStatRow};

fn schedule(
    game_id: &str,
    gameday: &str,
    home: &str,
    away: &str,
    score: Option<(i32, i32)>,
) -> ScheduleRow {
    ScheduleRow {
        game_id: game_id.to_string(),
        season: 2023,
        week: 1,
        gameday: NaiveDate::parse_from_str(gameday, "%Y-%m-%d").unwrap(),
        home_team: home.to_string(),
        away_team: away.to_string(),
        home_score: score.map(|(h, _)| h),
        away_score: score.map(|(_, a)| a),
    }
}

fn line(game_id: &str, spread: f64, total: f64, home_ml: f64, away_ml: f64) -> LineRow {
    LineRow {
        game_id: game_id.to_string(),
        spread_line: Some(spread),
        total_line: Some(total),
        home_moneyline: Some(home_ml),
        away_moneyline: Some(away_ml),
    }
}

fn stat(team: &str, epa: f64, ppg: f64) -> TeamStatRow {
    TeamStatRow {
        season: 2023,
        team: team.to_string(),
        epa_per_play: epa,
        points_per_game: ppg,
    }
}

#[test]
fn single_game_scenario_labels_and_derived_fields() {
    // 27-24 home win over a 48.5 total.
    let schedules = vec![schedule(
        "2023_01_A",
        "2023-09-10",
        "KC",
        "CIN",
        Some((27, 24)),
    )];
    let lines = vec![line("2023_01_A", -3.0, 48.5, -150.0, 130.0)];
    let stats = vec![stat("KC", 5.0, 28.0), stat("CIN", 2.0, 24.0)];

    let build = build_historical(&schedules, &lines, &stats);
    assert_eq!(build.rows.len(), 1);

    let row = &build.rows[0];
    assert_eq!(row.home_win, 1);
    assert_eq!(row.ou_cover, 1); // 51 > 48.5
    assert_eq!(row.game.epa_diff, 3.0);
    assert_eq!(row.game.ppg_diff, 4.0);
    assert_eq!(row.game.spread_vs_epa, -3.0 - 3.0);
    assert!((row.game.home_implied_prob - 0.6).abs() < 1e-9);
    assert!((row.game.away_implied_prob - 100.0 / 230.0).abs() < 1e-9);
}

#[test]
fn merged_stats_match_source_values_for_both_sides() {
    let schedules = vec![
        schedule("g1", "2023-09-10", "KC", "CIN", Some((27, 24))),
        schedule("g2", "2023-09-10", "CIN", "KC", Some((17, 20))),
    ];
    let lines = vec![
        line("g1", -3.0, 48.5, -150.0, 130.0),
        line("g2", 1.5, 44.0, 105.0, -125.0),
    ];
    let stats = vec![stat("KC", 0.12, 27.5), stat("CIN", 0.04, 23.0)];

    let build = build_historical(&schedules, &lines, &stats);
    assert_eq!(build.rows.len(), 2);

    // The same (season, team) stat lands on whichever side the team plays.
    let g1 = build.rows.iter().find(|r| r.game.home_team == "KC").unwrap();
    assert_eq!(g1.game.home_epa, 0.12);
    assert_eq!(g1.game.away_epa, 0.04);
    let g2 = build.rows.iter().find(|r| r.game.home_team == "CIN").unwrap();
    assert_eq!(g2.game.home_epa, 0.04);
    assert_eq!(g2.game.away_ppg, 27.5);

    // Sign flips when the sides swap.
    assert_eq!(g1.game.epa_diff, -g2.game.epa_diff);
}

#[test]
fn rows_with_unmatched_joins_are_dropped_and_counted() {
    let schedules = vec![
        schedule("g1", "2023-09-10", "KC", "CIN", Some((27, 24))),
        // No betting line for this one: its null line fields fail the
        // strict projection.
        schedule("g2", "2023-09-10", "BUF", "MIA", Some((31, 10))),
        // No team stats for DAL.
        schedule("g3", "2023-09-10", "DAL", "NYG", Some((40, 0))),
    ];
    let lines = vec![
        line("g1", -3.0, 48.5, -150.0, 130.0),
        line("g3", -7.0, 45.5, -320.0, 260.0),
        // A betting row with no schedule match is discarded silently.
        line("orphan", -2.0, 44.0, -110.0, -110.0),
    ];
    let stats = vec![
        stat("KC", 0.1, 27.0),
        stat("CIN", 0.0, 22.0),
        stat("NYG", -0.1, 15.0),
    ];

    let build = build_historical(&schedules, &lines, &stats);
    assert_eq!(build.rows.len(), 1);
    assert_eq!(build.rows[0].game.home_team, "KC");
    assert_eq!(build.dropped_missing_fields, 2);
}

#[test]
fn unlabeled_games_are_skipped_in_historical_builds() {
    let schedules = vec![
        schedule("g1", "2023-09-10", "KC", "CIN", Some((27, 24))),
        schedule("g2", "2024-01-07", "MIA", "BUF", None),
    ];
    let lines = vec![
        line("g1", -3.0, 48.5, -150.0, 130.0),
        line("g2", 2.5, 50.0, 110.0, -130.0),
    ];
    let stats = vec![
        stat("KC", 0.1, 27.0),
        stat("CIN", 0.0, 22.0),
        stat("MIA", 0.05, 29.0),
        stat("BUF", 0.09, 26.0),
    ];

    let build = build_historical(&schedules, &lines, &stats);
    assert_eq!(build.rows.len(), 1);
    assert_eq!(build.dropped_no_label, 1);
}

#[test]
fn rebuild_is_idempotent_for_stable_inputs() {
    let schedules = vec![
        schedule("g1", "2023-09-10", "KC", "CIN", Some((27, 24))),
        schedule("g2", "2023-09-11", "BUF", "NYJ", Some((16, 22))),
    ];
    let lines = vec![
        line("g1", -3.0, 48.5, -150.0, 130.0),
        line("g2", -2.5, 45.0, -140.0, 120.0),
    ];
    let stats = vec![
        stat("KC", 0.1, 27.0),
        stat("CIN", 0.0, 22.0),
        stat("BUF", 0.09, 26.0),
        stat("NYJ", -0.05, 18.0),
    ];

    let first = build_historical(&schedules, &lines, &stats);
    let second = build_historical(&schedules, &lines, &stats);
    assert_eq!(first.rows.len(), second.rows.len());
    assert_eq!(first.rows, second.rows);
}

#[test]
fn today_build_filters_to_exact_date_and_skips_labels() {
    let schedules = vec![
        schedule("g1", "2024-10-06", "GB", "LA", None),
        schedule("g2", "2024-10-07", "KC", "NO", None),
    ];
    let lines = vec![
        line("g1", -3.0, 48.5, -155.0, 130.0),
        line("g2", -5.5, 43.5, -250.0, 205.0),
    ];
    let stats = vec![
        stat("GB", 0.07, 27.0),
        stat("LA", 0.01, 21.0),
        stat("KC", 0.1, 26.0),
        stat("NO", 0.02, 24.0),
    ];
    let date = NaiveDate::from_ymd_opt(2024, 10, 6).unwrap();
    let build = build_today(&schedules, &lines, &stats, date);
    assert_eq!(build.rows.len(), 1);
    assert_eq!(build.rows[0].home_team, "GB");
}

#[test]
fn empty_date_yields_empty_table_not_error() {
    let schedules = vec![schedule("g1", "2024-10-06", "GB", "LA", None)];
    let lines = vec![line("g1", -3.0, 48.5, -155.0, 130.0)];
    let stats = vec![stat("GB", 0.07, 27.0), stat("LA", 0.01, 21.0)];

    let date = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
    let build = build_today(&schedules, &lines, &stats, date);
    assert!(build.rows.is_empty());
    assert_eq!(build.dropped_missing_fields, 0);
}
