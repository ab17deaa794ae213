use std::env;
use std::path::PathBuf;

use crate::http_cache::app_cache_dir;

pub const DEFAULT_DATA_BASE_URL: &str = "https://data.nflmirror.app/v1";
pub const DEFAULT_STATS_PARQUET_TEMPLATE: &str =
    "https://github.com/nflverse/nflverse-data/releases/download/stats_team/stats_team_reg_{season}.parquet";

const DEFAULT_FIRST_SEASON: u16 = 2012;
const DEFAULT_LAST_SEASON: u16 = 2024;

/// Resolved once at process start and passed explicitly into the provider,
/// builders, and persistence. No module reads the environment after this.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub models_dir: PathBuf,
    pub seasons: Vec<u16>,
    pub data_base_url: String,
    pub stats_parquet_template: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let cache_dir = app_cache_dir().unwrap_or_else(|| PathBuf::from(".gridline"));

        let db_path = env_path("GRIDLINE_DB_PATH")
            .unwrap_or_else(|| cache_dir.join("dataset.sqlite"));
        let models_dir =
            env_path("GRIDLINE_MODELS_DIR").unwrap_or_else(|| cache_dir.join("models"));

        let seasons = env::var("GRIDLINE_SEASONS")
            .ok()
            .and_then(|raw| parse_seasons(&raw))
            .unwrap_or_else(|| (DEFAULT_FIRST_SEASON..=DEFAULT_LAST_SEASON).collect());

        let data_base_url = env_trimmed("GRIDLINE_DATA_BASE_URL")
            .unwrap_or_else(|| DEFAULT_DATA_BASE_URL.to_string());
        let stats_parquet_template = env_trimmed("GRIDLINE_STATS_PARQUET_URL")
            .unwrap_or_else(|| DEFAULT_STATS_PARQUET_TEMPLATE.to_string());

        Self {
            db_path,
            models_dir,
            seasons,
            data_base_url,
            stats_parquet_template,
        }
    }
}

/// Loads `.env.local` then `.env`, ignoring missing files. Entry points call
/// this before `AppConfig::from_env`.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

/// Accepts `2012-2024`, `2023,2024`, or a mix (`2012-2015,2023`).
pub fn parse_seasons(raw: &str) -> Option<Vec<u16>> {
    let mut out = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((lo, hi)) = part.split_once('-') {
            let lo = lo.trim().parse::<u16>().ok()?;
            let hi = hi.trim().parse::<u16>().ok()?;
            if lo > hi {
                return None;
            }
            out.extend(lo..=hi);
        } else {
            out.push(part.parse::<u16>().ok()?);
        }
    }
    out.sort_unstable();
    out.dedup();
    if out.is_empty() { None } else { Some(out) }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env_trimmed(key).map(PathBuf::from)
}

fn env_trimmed(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
