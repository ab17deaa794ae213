use std::fs;
use std::path::PathBuf;

use gridline_terminal::provider::{
    SchedulePull, lines_endpoint, parse_lines_json, parse_schedules_json,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_schedules_fixture() {
    let raw = read_fixture("schedules_2023.json");
    let mut pull = SchedulePull::default();
    parse_schedules_json(&raw, 2023, &mut pull).expect("fixture should parse");

    // Five objects: one clean, one mixed-case, one unknown team, one
    // missing week, one future game with null scores.
    assert_eq!(pull.rows.len(), 3);
    assert_eq!(pull.dropped_unknown_team, 1);
    assert_eq!(pull.dropped_malformed, 1);

    let kc = pull
        .rows
        .iter()
        .find(|r| r.game_id == "2023_01_DET_KC")
        .expect("KC opener present");
    assert_eq!(kc.week, 1);
    assert_eq!(kc.home_score, Some(20));
    assert_eq!(kc.away_score, Some(21));

    // Mixed-case keys normalize, and LAR folds to the canonical LA.
    let sea = pull
        .rows
        .iter()
        .find(|r| r.game_id == "2023_01_LAR_SEA")
        .expect("SEA game present");
    assert_eq!(sea.away_team, "LA");

    // Null scores survive as None rather than dropping the row.
    let buf = pull
        .rows
        .iter()
        .find(|r| r.game_id == "2023_05_JAC_BUF")
        .expect("BUF game present");
    assert_eq!(buf.home_score, None);
    assert_eq!(buf.away_team, "JAX");
}

#[test]
fn parses_current_lines_endpoint() {
    let raw = read_fixture("lines_betting_data.json");
    let endpoint = lines_endpoint("betting-data").expect("endpoint registered");
    let pull = parse_lines_json(&raw, endpoint).expect("fixture should parse");

    assert_eq!(pull.endpoint, "betting-data");
    assert_eq!(pull.rows.len(), 2);
    assert_eq!(pull.dropped_malformed, 1); // the row with no game_id

    let kc = &pull.rows[0];
    assert_eq!(kc.game_id, "2023_01_DET_KC");
    assert_eq!(kc.spread_line, Some(-4.0));
    assert_eq!(kc.home_moneyline, Some(-205.0));

    // Stringly-typed numbers still parse.
    assert_eq!(pull.rows[1].spread_line, Some(5.5));
}

#[test]
fn legacy_lines_endpoint_normalizes_synonyms_and_backfills() {
    let raw = read_fixture("lines_legacy.json");
    let endpoint = lines_endpoint("lines").expect("endpoint registered");
    let pull = parse_lines_json(&raw, endpoint).expect("fixture should parse");

    assert_eq!(pull.rows.len(), 2);
    let kc = &pull.rows[0];
    assert_eq!(kc.spread_line, Some(-4.0));
    assert_eq!(kc.total_line, Some(53.0));
    // The legacy revision never carried moneylines: backfilled, not faked.
    assert_eq!(kc.home_moneyline, None);
    assert_eq!(kc.away_moneyline, None);

    // Upper-cased legacy keys normalize the same way.
    assert_eq!(pull.rows[1].total_line, Some(46.5));
}

#[test]
fn null_payloads_are_empty_not_errors() {
    let mut pull = SchedulePull::default();
    parse_schedules_json("null", 2023, &mut pull).expect("null should parse");
    assert!(pull.rows.is_empty());

    let endpoint = lines_endpoint("betting-data").expect("endpoint registered");
    let lines = parse_lines_json("null", endpoint).expect("null should parse");
    assert!(lines.rows.is_empty());
}
