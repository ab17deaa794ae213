use chrono::NaiveDate;
use rusqlite::Connection;

use gridline_terminal::dataset::{
    init_schema, load_features_all, load_todays_games, replace_features_all, replace_todays_games,
};
use gridline_terminal::features::{FeatureRow, TodaysGameRow};

fn game(season: u16, gameday: &str, home: &str, away: &str) -> TodaysGameRow {
    TodaysGameRow {
        season,
        week: 1,
        gameday: NaiveDate::parse_from_str(gameday, "%Y-%m-%d").unwrap(),
        home_team: home.to_string(),
        away_team: away.to_string(),
        spread_line: -3.0,
        total_line: 48.5,
        home_moneyline: -150.0,
        away_moneyline: 130.0,
        home_epa: 0.1,
        away_epa: 0.02,
        home_ppg: 27.0,
        away_ppg: 22.0,
        epa_diff: 0.08,
        ppg_diff: 5.0,
        spread_vs_epa: -3.08,
        home_implied_prob: 0.6,
        away_implied_prob: 100.0 / 230.0,
    }
}

fn feature(season: u16, gameday: &str, home: &str, away: &str) -> FeatureRow {
    FeatureRow {
        game: game(season, gameday, home, away),
        home_win: 1,
        ou_cover: -1,
    }
}

fn memory_db() -> Connection {
    let conn = Connection::open_in_memory().expect("in-memory sqlite");
    init_schema(&conn).expect("schema");
    conn
}

#[test]
fn fresh_db_loads_empty_tables() {
    let conn = memory_db();
    assert!(load_features_all(&conn).unwrap().is_empty());
    assert!(load_todays_games(&conn).unwrap().is_empty());
}

#[test]
fn features_roundtrip_preserves_values() {
    let mut conn = memory_db();
    let rows = vec![
        feature(2023, "2023-09-10", "KC", "CIN"),
        feature(2023, "2023-09-11", "BUF", "NYJ"),
    ];
    replace_features_all(&mut conn, &rows).unwrap();

    let loaded = load_features_all(&conn).unwrap();
    assert_eq!(loaded.len(), 2);
    // Load order is deterministic (season, gameday, home_team).
    assert_eq!(loaded[0].game.home_team, "KC");
    assert_eq!(loaded[0].ou_cover, -1);
    assert_eq!(loaded[0].game.gameday.to_string(), "2023-09-10");
    assert_eq!(loaded[0], rows[0]);
}

#[test]
fn replace_is_whole_table_not_merge() {
    let mut conn = memory_db();
    replace_features_all(
        &mut conn,
        &[
            feature(2022, "2022-09-11", "KC", "LAC"),
            feature(2022, "2022-09-12", "SEA", "DEN"),
        ],
    )
    .unwrap();
    replace_features_all(&mut conn, &[feature(2023, "2023-09-10", "KC", "CIN")]).unwrap();

    let loaded = load_features_all(&conn).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].game.season, 2023);
}

#[test]
fn rebuilding_twice_yields_identical_contents() {
    let mut conn = memory_db();
    let rows = vec![
        feature(2023, "2023-09-10", "KC", "CIN"),
        feature(2023, "2023-09-11", "BUF", "NYJ"),
    ];
    replace_features_all(&mut conn, &rows).unwrap();
    let first = load_features_all(&conn).unwrap();
    replace_features_all(&mut conn, &rows).unwrap();
    let second = load_features_all(&conn).unwrap();
    assert_eq!(first, second);
}

#[test]
fn todays_games_roundtrip_and_independence() {
    let mut conn = memory_db();
    replace_todays_games(&mut conn, &[game(2024, "2024-10-06", "GB", "LA")]).unwrap();

    let games = load_todays_games(&conn).unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].home_team, "GB");

    // The two tables are independent: replacing one leaves the other alone.
    assert!(load_features_all(&conn).unwrap().is_empty());
    replace_features_all(&mut conn, &[feature(2023, "2023-09-10", "KC", "CIN")]).unwrap();
    assert_eq!(load_todays_games(&conn).unwrap().len(), 1);
}

#[test]
fn replace_with_empty_slate_clears_the_table() {
    let mut conn = memory_db();
    replace_todays_games(&mut conn, &[game(2024, "2024-10-06", "GB", "LA")]).unwrap();
    replace_todays_games(&mut conn, &[]).unwrap();
    assert!(load_todays_games(&conn).unwrap().is_empty());
}
