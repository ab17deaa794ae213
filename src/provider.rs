//! Data source adapter for the NFL data mirror.
//!
//! Three pulls with one stable column contract each: schedules and betting
//! lines come from JSON endpoints (conditional-GET cached), team efficiency
//! stats from per-season parquet release assets. The mirror has renamed its
//! betting-lines endpoint across API revisions; [`LINES_ENDPOINTS`] is the
//! prioritized capability table that hides this from everything downstream.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::{Field, Row};
use serde_json::Value;

use crate::config::AppConfig;
use crate::http_cache::{fetch_json_cached, fetch_json_cached_opt};
use crate::http_client::http_client;
use crate::teams;

#[derive(Debug, Clone)]
pub struct ScheduleRow {
    pub game_id: String,
    pub season: u16,
    pub week: u32,
    pub gameday: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct LineRow {
    pub game_id: String,
    pub spread_line: Option<f64>,
    pub total_line: Option<f64>,
    pub home_moneyline: Option<f64>,
    pub away_moneyline: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TeamStatRow {
    pub season: u16,
    pub team: String,
    pub epa_per_play: f64,
    pub points_per_game: f64,
}

#[derive(Debug, Default)]
pub struct SchedulePull {
    pub rows: Vec<ScheduleRow>,
    pub dropped_unknown_team: usize,
    pub dropped_malformed: usize,
}

#[derive(Debug)]
pub struct LinesPull {
    /// Name of the endpoint revision that answered.
    pub endpoint: &'static str,
    pub rows: Vec<LineRow>,
    pub dropped_malformed: usize,
}

#[derive(Debug, Default)]
pub struct TeamStatsPull {
    pub rows: Vec<TeamStatRow>,
    pub dropped_unknown_team: usize,
}

/// One revision of the mirror's betting-lines API. Candidates are probed in
/// order; the first endpoint that exists wins and its column synonyms are
/// folded into the canonical names immediately, so nothing downstream ever
/// branches on mirror version.
pub struct LinesEndpoint {
    pub name: &'static str,
    path: &'static str,
    note: &'static str,
    renames: &'static [(&'static str, &'static str)],
}

const LINES_ENDPOINTS: &[LinesEndpoint] = &[
    LinesEndpoint {
        name: "betting-data",
        path: "betting-data",
        note: "current betting data endpoint",
        renames: &[],
    },
    LinesEndpoint {
        name: "betting-lines",
        path: "betting-lines",
        note: "2023 betting lines endpoint",
        renames: &[
            ("spread", "spread_line"),
            ("total", "total_line"),
            ("moneyline_home", "home_moneyline"),
            ("moneyline_away", "away_moneyline"),
        ],
    },
    LinesEndpoint {
        name: "lines",
        path: "lines",
        note: "legacy lines endpoint",
        renames: &[
            ("team_home", "home_team"),
            ("team_away", "away_team"),
            ("spread", "spread_line"),
            ("over_under", "total_line"),
        ],
    },
];

pub struct Provider {
    base_url: String,
    stats_parquet_template: String,
}

impl Provider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_url: config.data_base_url.trim_end_matches('/').to_string(),
            stats_parquet_template: config.stats_parquet_template.clone(),
        }
    }

    pub fn fetch_schedules(&self, seasons: &[u16]) -> Result<SchedulePull> {
        let client = http_client()?;
        let mut pull = SchedulePull::default();
        for &season in seasons {
            let url = format!("{}/schedules?season={season}", self.base_url);
            let body = fetch_json_cached(client, &url)
                .with_context(|| format!("fetch schedules for season {season}"))?;
            parse_schedules_json(&body, season, &mut pull)
                .with_context(|| format!("parse schedules for season {season}"))?;
        }
        Ok(pull)
    }

    /// Probes the candidate betting-lines endpoints in priority order. A
    /// missing endpoint (404) means "try the next revision"; any other
    /// failure is terminal for this invocation — no automatic retry.
    pub fn fetch_lines(&self, seasons: &[u16]) -> Result<LinesPull> {
        let client = http_client()?;
        let season_list = seasons
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",");

        for endpoint in LINES_ENDPOINTS {
            let url = format!(
                "{}/{}?seasons={season_list}",
                self.base_url, endpoint.path
            );
            let Some(body) = fetch_json_cached_opt(client, &url)
                .with_context(|| format!("fetch lines via {} ({})", endpoint.name, endpoint.note))?
            else {
                continue;
            };
            return parse_lines_json(&body, endpoint)
                .with_context(|| format!("parse lines from {}", endpoint.name));
        }

        let tried = LINES_ENDPOINTS
            .iter()
            .map(|e| e.name)
            .collect::<Vec<_>>()
            .join(", ");
        Err(anyhow!(
            "no compatible betting lines endpoint on {}: tried {tried}; \
             point GRIDLINE_DATA_BASE_URL at a newer data mirror",
            self.base_url
        ))
    }

    pub fn fetch_team_stats(&self, seasons: &[u16]) -> Result<TeamStatsPull> {
        let tmp_dir = std::env::temp_dir().join("gridline_team_stats");
        fs::create_dir_all(&tmp_dir).context("create temp directory")?;

        let mut pull = TeamStatsPull::default();
        for &season in seasons {
            let url = self
                .stats_parquet_template
                .replace("{season}", &season.to_string());
            let path = download_file(&url, &tmp_dir.join(format!("stats_{season}.parquet")))
                .with_context(|| format!("download team stats for season {season}"))?;
            read_team_stats_parquet(&path, season, &mut pull)
                .with_context(|| format!("read team stats for season {season}"))?;
        }
        Ok(pull)
    }
}

pub fn parse_schedules_json(raw: &str, season: u16, pull: &mut SchedulePull) -> Result<()> {
    let value: Value = serde_json::from_str(raw.trim()).context("invalid schedules json")?;
    let Some(items) = value.as_array() else {
        // An empty or null payload is a valid "no games" answer.
        if value.is_null() {
            return Ok(());
        }
        return Err(anyhow!("schedules payload is not an array"));
    };

    for item in items {
        let Some(obj) = normalized_object(item, &[]) else {
            pull.dropped_malformed += 1;
            continue;
        };
        match parse_schedule_row(&obj, season) {
            Some(ParsedSchedule::Row(row)) => pull.rows.push(row),
            Some(ParsedSchedule::UnknownTeam) => pull.dropped_unknown_team += 1,
            None => pull.dropped_malformed += 1,
        }
    }
    Ok(())
}

enum ParsedSchedule {
    Row(ScheduleRow),
    UnknownTeam,
}

fn parse_schedule_row(obj: &HashMap<String, Value>, default_season: u16) -> Option<ParsedSchedule> {
    let game_id = obj.get("game_id").and_then(as_string_any)?;
    let season = obj
        .get("season")
        .and_then(as_u64_any)
        .and_then(|s| u16::try_from(s).ok())
        .unwrap_or(default_season);
    let week = obj
        .get("week")
        .and_then(as_u64_any)
        .and_then(|w| u32::try_from(w).ok())?;
    let gameday = obj
        .get("gameday")
        .and_then(as_string_any)
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())?;

    let home_raw = obj.get("home_team").and_then(as_string_any)?;
    let away_raw = obj.get("away_team").and_then(as_string_any)?;
    let (Some(home_team), Some(away_team)) = (
        teams::resolve_team(season, &home_raw),
        teams::resolve_team(season, &away_raw),
    ) else {
        return Some(ParsedSchedule::UnknownTeam);
    };

    let home_score = obj
        .get("home_score")
        .and_then(as_i64_any)
        .and_then(|v| i32::try_from(v).ok());
    let away_score = obj
        .get("away_score")
        .and_then(as_i64_any)
        .and_then(|v| i32::try_from(v).ok());

    Some(ParsedSchedule::Row(ScheduleRow {
        game_id,
        season,
        week,
        gameday,
        home_team: home_team.to_string(),
        away_team: away_team.to_string(),
        home_score,
        away_score,
    }))
}

pub fn parse_lines_json(raw: &str, endpoint: &LinesEndpoint) -> Result<LinesPull> {
    let value: Value = serde_json::from_str(raw.trim()).context("invalid lines json")?;
    let mut pull = LinesPull {
        endpoint: endpoint.name,
        rows: Vec::new(),
        dropped_malformed: 0,
    };
    let Some(items) = value.as_array() else {
        if value.is_null() {
            return Ok(pull);
        }
        return Err(anyhow!("lines payload is not an array"));
    };

    for item in items {
        let Some(obj) = normalized_object(item, endpoint.renames) else {
            pull.dropped_malformed += 1;
            continue;
        };
        let Some(game_id) = obj.get("game_id").and_then(as_string_any) else {
            pull.dropped_malformed += 1;
            continue;
        };
        // Required-but-absent columns come through as None, never a failure.
        pull.rows.push(LineRow {
            game_id,
            spread_line: obj.get("spread_line").and_then(as_f64_any),
            total_line: obj.get("total_line").and_then(as_f64_any),
            home_moneyline: obj.get("home_moneyline").and_then(as_f64_any),
            away_moneyline: obj.get("away_moneyline").and_then(as_f64_any),
        });
    }
    Ok(pull)
}

/// Lower-cases every key and applies the endpoint's synonym map. A rename
/// only fills a hole: it never clobbers a canonical column the payload
/// already carries.
fn normalized_object(item: &Value, renames: &[(&str, &str)]) -> Option<HashMap<String, Value>> {
    let obj = item.as_object()?;
    let mut out = HashMap::with_capacity(obj.len());
    for (key, val) in obj {
        out.insert(key.trim().to_ascii_lowercase(), val.clone());
    }
    for (from, to) in renames {
        if out.contains_key(*to) {
            continue;
        }
        if let Some(val) = out.remove(*from) {
            out.insert((*to).to_string(), val);
        }
    }
    Some(out)
}

fn read_team_stats_parquet(path: &Path, season: u16, pull: &mut TeamStatsPull) -> Result<()> {
    let file = fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = SerializedFileReader::new(file).context("open parquet reader")?;
    let iter = reader.get_row_iter(None).context("iterate stat rows")?;

    for row in iter {
        let Ok(row) = row else {
            continue;
        };
        let Some(team_raw) = row_string(&row, &["team", "team_abbr", "recent_team"]) else {
            continue;
        };
        let row_season = row_f64(&row, &["season"])
            .and_then(|s| u16::try_from(s as i64).ok())
            .unwrap_or(season);
        let Some(team) = teams::resolve_team(row_season, &team_raw) else {
            pull.dropped_unknown_team += 1;
            continue;
        };
        let Some(epa_per_play) = row_f64(&row, &["epa_per_play", "offense_epa_per_play"]) else {
            continue;
        };
        let Some(points_per_game) = row_f64(&row, &["points_per_game", "points_avg"]) else {
            continue;
        };
        pull.rows.push(TeamStatRow {
            season: row_season,
            team: team.to_string(),
            epa_per_play,
            points_per_game,
        });
    }
    Ok(())
}

fn row_field<'a>(row: &'a Row, names: &[&str]) -> Option<&'a Field> {
    row.get_column_iter()
        .find(|(name, _)| names.iter().any(|n| name.as_str() == *n))
        .map(|(_, field)| field)
}

fn row_f64(row: &Row, names: &[&str]) -> Option<f64> {
    match row_field(row, names)? {
        Field::Double(v) => Some(*v),
        Field::Float(v) => Some(f64::from(*v)),
        Field::Int(v) => Some(f64::from(*v)),
        Field::Long(v) => Some(*v as f64),
        _ => None,
    }
}

fn row_string(row: &Row, names: &[&str]) -> Option<String> {
    match row_field(row, names)? {
        Field::Str(s) => Some(s.clone()),
        _ => None,
    }
}

fn download_file(url: &str, path: &Path) -> Result<PathBuf> {
    let client = http_client()?;
    let mut last_err: Option<anyhow::Error> = None;
    for _attempt in 1..=3 {
        let fetched = client
            .get(url)
            .send()
            .with_context(|| format!("request {url}"))
            .and_then(|res| {
                res.error_for_status()
                    .with_context(|| format!("status for {url}"))
            })
            .and_then(|res| res.bytes().with_context(|| format!("read body {url}")));
        match fetched {
            Ok(bytes) => {
                fs::write(path, &bytes).with_context(|| format!("write {}", path.display()))?;
                return Ok(path.to_path_buf());
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow!("download failed: {url}")))
}

fn as_string_any(v: &Value) -> Option<String> {
    if let Some(s) = v.as_str() {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        return Some(s.to_string());
    }
    if let Some(n) = v.as_i64() {
        return Some(n.to_string());
    }
    None
}

fn as_f64_any(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<f64>().ok()
}

fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

fn as_u64_any(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<u64>().ok()
}

/// Exposes the candidate table for tests: the fixture files exercise each
/// revision's synonym map without a live mirror.
pub fn lines_endpoint(name: &str) -> Option<&'static LinesEndpoint> {
    LINES_ENDPOINTS.iter().find(|e| e.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_f64_any_accepts_numbers_and_strings() {
        assert_eq!(as_f64_any(&Value::from(-3.5)), Some(-3.5));
        assert_eq!(as_f64_any(&Value::from("47.5")), Some(47.5));
        assert_eq!(as_f64_any(&Value::from("n/a")), None);
    }

    #[test]
    fn rename_does_not_clobber_canonical_column() {
        let item: Value = serde_json::json!({"spread": 1.0, "spread_line": -2.5});
        let obj = normalized_object(&item, &[("spread", "spread_line")]).unwrap();
        assert_eq!(obj.get("spread_line").and_then(as_f64_any), Some(-2.5));
    }

    #[test]
    fn normalized_object_lowercases_keys() {
        let item: Value = serde_json::json!({"Game_ID": "x", "SPREAD": 3.0});
        let obj = normalized_object(&item, &[("spread", "spread_line")]).unwrap();
        assert_eq!(obj.get("game_id").and_then(as_string_any).as_deref(), Some("x"));
        assert_eq!(obj.get("spread_line").and_then(as_f64_any), Some(3.0));
    }
}
