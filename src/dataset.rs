//! SQLite persistence for the two pipeline tables.
//!
//! Both tables use replace-table semantics: a save deletes and reinserts
//! inside one transaction, so a reader sees the old rows or the new rows,
//! never a torn table. Nothing spans the two tables; `features_all` and
//! `todays_games` saves are independent and a reader may observe one
//! updated before the other.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, params};

use crate::features::{FeatureRow, TodaysGameRow};

pub const FEATURES_TABLE: &str = "features_all";
pub const TODAYS_GAMES_TABLE: &str = "todays_games";

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn =
        Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS features_all (
            season INTEGER NOT NULL,
            week INTEGER NOT NULL,
            gameday TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            spread_line REAL NOT NULL,
            total_line REAL NOT NULL,
            home_moneyline REAL NOT NULL,
            away_moneyline REAL NOT NULL,
            home_epa REAL NOT NULL,
            away_epa REAL NOT NULL,
            home_ppg REAL NOT NULL,
            away_ppg REAL NOT NULL,
            epa_diff REAL NOT NULL,
            ppg_diff REAL NOT NULL,
            spread_vs_epa REAL NOT NULL,
            home_implied_prob REAL NOT NULL,
            away_implied_prob REAL NOT NULL,
            home_win INTEGER NOT NULL,
            ou_cover INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_features_all_season ON features_all(season);

        CREATE TABLE IF NOT EXISTS todays_games (
            season INTEGER NOT NULL,
            week INTEGER NOT NULL,
            gameday TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            spread_line REAL NOT NULL,
            total_line REAL NOT NULL,
            home_moneyline REAL NOT NULL,
            away_moneyline REAL NOT NULL,
            home_epa REAL NOT NULL,
            away_epa REAL NOT NULL,
            home_ppg REAL NOT NULL,
            away_ppg REAL NOT NULL,
            epa_diff REAL NOT NULL,
            ppg_diff REAL NOT NULL,
            spread_vs_epa REAL NOT NULL,
            home_implied_prob REAL NOT NULL,
            away_implied_prob REAL NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

pub fn replace_features_all(conn: &mut Connection, rows: &[FeatureRow]) -> Result<()> {
    let tx = conn.transaction().context("begin features_all replace")?;
    tx.execute("DELETE FROM features_all", [])
        .context("clear features_all")?;
    {
        let mut stmt = tx
            .prepare(
                r#"
                INSERT INTO features_all (
                    season, week, gameday, home_team, away_team,
                    spread_line, total_line, home_moneyline, away_moneyline,
                    home_epa, away_epa, home_ppg, away_ppg,
                    epa_diff, ppg_diff, spread_vs_epa,
                    home_implied_prob, away_implied_prob,
                    home_win, ou_cover
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5,
                    ?6, ?7, ?8, ?9,
                    ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16,
                    ?17, ?18,
                    ?19, ?20
                )
                "#,
            )
            .context("prepare features_all insert")?;
        for row in rows {
            let g = &row.game;
            stmt.execute(params![
                i64::from(g.season),
                i64::from(g.week),
                g.gameday.format("%Y-%m-%d").to_string(),
                g.home_team,
                g.away_team,
                g.spread_line,
                g.total_line,
                g.home_moneyline,
                g.away_moneyline,
                g.home_epa,
                g.away_epa,
                g.home_ppg,
                g.away_ppg,
                g.epa_diff,
                g.ppg_diff,
                g.spread_vs_epa,
                g.home_implied_prob,
                g.away_implied_prob,
                row.home_win,
                row.ou_cover,
            ])
            .context("insert features_all row")?;
        }
    }
    tx.commit().context("commit features_all replace")?;
    Ok(())
}

pub fn replace_todays_games(conn: &mut Connection, rows: &[TodaysGameRow]) -> Result<()> {
    let tx = conn.transaction().context("begin todays_games replace")?;
    tx.execute("DELETE FROM todays_games", [])
        .context("clear todays_games")?;
    {
        let mut stmt = tx
            .prepare(
                r#"
                INSERT INTO todays_games (
                    season, week, gameday, home_team, away_team,
                    spread_line, total_line, home_moneyline, away_moneyline,
                    home_epa, away_epa, home_ppg, away_ppg,
                    epa_diff, ppg_diff, spread_vs_epa,
                    home_implied_prob, away_implied_prob
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5,
                    ?6, ?7, ?8, ?9,
                    ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16,
                    ?17, ?18
                )
                "#,
            )
            .context("prepare todays_games insert")?;
        for g in rows {
            stmt.execute(params![
                i64::from(g.season),
                i64::from(g.week),
                g.gameday.format("%Y-%m-%d").to_string(),
                g.home_team,
                g.away_team,
                g.spread_line,
                g.total_line,
                g.home_moneyline,
                g.away_moneyline,
                g.home_epa,
                g.away_epa,
                g.home_ppg,
                g.away_ppg,
                g.epa_diff,
                g.ppg_diff,
                g.spread_vs_epa,
                g.home_implied_prob,
                g.away_implied_prob,
            ])
            .context("insert todays_games row")?;
        }
    }
    tx.commit().context("commit todays_games replace")?;
    Ok(())
}

pub fn load_features_all(conn: &Connection) -> Result<Vec<FeatureRow>> {
    if !table_exists(conn, FEATURES_TABLE)? {
        return Ok(Vec::new());
    }
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                season, week, gameday, home_team, away_team,
                spread_line, total_line, home_moneyline, away_moneyline,
                home_epa, away_epa, home_ppg, away_ppg,
                epa_diff, ppg_diff, spread_vs_epa,
                home_implied_prob, away_implied_prob,
                home_win, ou_cover
            FROM features_all
            ORDER BY season ASC, gameday ASC, home_team ASC
            "#,
        )
        .context("prepare features_all query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(FeatureRow {
                game: game_from_row(row)?,
                home_win: row.get(18)?,
                ou_cover: row.get(19)?,
            })
        })
        .context("query features_all")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode features_all row")?);
    }
    Ok(out)
}

pub fn load_todays_games(conn: &Connection) -> Result<Vec<TodaysGameRow>> {
    if !table_exists(conn, TODAYS_GAMES_TABLE)? {
        return Ok(Vec::new());
    }
    let mut stmt = conn
        .prepare(
            r#"
            SELECT
                season, week, gameday, home_team, away_team,
                spread_line, total_line, home_moneyline, away_moneyline,
                home_epa, away_epa, home_ppg, away_ppg,
                epa_diff, ppg_diff, spread_vs_epa,
                home_implied_prob, away_implied_prob
            FROM todays_games
            ORDER BY gameday ASC, home_team ASC
            "#,
        )
        .context("prepare todays_games query")?;

    let rows = stmt
        .query_map([], game_from_row)
        .context("query todays_games")?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.context("decode todays_games row")?);
    }
    Ok(out)
}

fn game_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TodaysGameRow> {
    let gameday_raw: String = row.get(2)?;
    let gameday = NaiveDate::parse_from_str(&gameday_raw, "%Y-%m-%d").map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(err))
    })?;
    Ok(TodaysGameRow {
        season: row.get::<_, i64>(0)? as u16,
        week: row.get::<_, i64>(1)? as u32,
        gameday,
        home_team: row.get(3)?,
        away_team: row.get(4)?,
        spread_line: row.get(5)?,
        total_line: row.get(6)?,
        home_moneyline: row.get(7)?,
        away_moneyline: row.get(8)?,
        home_epa: row.get(9)?,
        away_epa: row.get(10)?,
        home_ppg: row.get(11)?,
        away_ppg: row.get(12)?,
        epa_diff: row.get(13)?,
        ppg_diff: row.get(14)?,
        spread_vs_epa: row.get(15)?,
        home_implied_prob: row.get(16)?,
        away_implied_prob: row.get(17)?,
    })
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get(0),
        )
        .context("check table existence")?;
    Ok(count > 0)
}
