//! Training orchestration: label extraction per market, shuffled holdout
//! split, holdout metrics, and JSON artifact writing for all three model
//! families.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::boost::{self, BoostConfig};
use crate::features::{FEATURE_COLUMNS, FeatureRow};
use crate::logistic::{self, LogisticConfig};
use crate::net::{self, NetConfig};

const SPLIT_SEED: u64 = 20_120_905;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    HomeWin,
    OverUnder,
}

impl Market {
    pub const ALL: [Market; 2] = [Market::HomeWin, Market::OverUnder];

    pub fn slug(self) -> &'static str {
        match self {
            Market::HomeWin => "home_win",
            Market::OverUnder => "ou_cover",
        }
    }

    /// Human label used in prediction column names.
    pub fn column_label(self) -> &'static str {
        match self {
            Market::HomeWin => "Home Win",
            Market::OverUnder => "Over",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    LogReg,
    Gbdt,
    Net,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::LogReg, Family::Gbdt, Family::Net];

    pub fn label(self) -> &'static str {
        match self {
            Family::LogReg => "LogReg",
            Family::Gbdt => "GBDT",
            Family::Net => "Net",
        }
    }

    fn slug(self) -> &'static str {
        match self {
            Family::LogReg => "logistic",
            Family::Gbdt => "boost",
            Family::Net => "net",
        }
    }
}

/// On-disk envelope around a serialized model. `feature_columns` is the
/// schema contract: a loader must refuse an artifact whose column layout
/// does not match the current build.
#[derive(Debug, Serialize, Deserialize)]
pub struct Artifact<M> {
    pub family: String,
    pub market: String,
    pub feature_columns: Vec<String>,
    pub model: M,
}

#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub family: Family,
    pub market: Market,
    pub rows_used: usize,
    pub holdout_accuracy: f64,
    pub holdout_log_loss: f64,
    pub artifact_path: PathBuf,
}

/// Numeric matrix and labels for one market. Push rows (`ou_cover == -1`)
/// are excluded from over/under training; they stay in the stored table.
pub fn extract_labeled(rows: &[FeatureRow], market: Market) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut x = Vec::with_capacity(rows.len());
    let mut y = Vec::with_capacity(rows.len());
    for row in rows {
        let label = match market {
            Market::HomeWin => row.home_win,
            Market::OverUnder => {
                if row.ou_cover < 0 {
                    continue;
                }
                row.ou_cover
            }
        };
        x.push(row.game.feature_vec());
        y.push(label as f64);
    }
    (x, y)
}

pub fn train_all(
    rows: &[FeatureRow],
    models_dir: &Path,
    boost_restarts: usize,
) -> Result<Vec<TrainOutcome>> {
    if rows.is_empty() {
        return Err(anyhow!(
            "features_all is empty; run build_dataset before training"
        ));
    }
    fs::create_dir_all(models_dir)
        .with_context(|| format!("create models dir {}", models_dir.display()))?;

    let mut outcomes = Vec::new();
    for market in Market::ALL {
        let (x, y) = extract_labeled(rows, market);
        if x.len() < 50 {
            return Err(anyhow!(
                "only {} labeled rows for {}; not enough to train",
                x.len(),
                market.slug()
            ));
        }
        let split = holdout_split(x.len());

        for family in Family::ALL {
            let outcome = match family {
                Family::LogReg => {
                    let model = logistic::train(
                        &gather(&x, &split.train),
                        &gather_y(&y, &split.train),
                        &LogisticConfig::default(),
                    );
                    let path = write_artifact(models_dir, family, market, &model)?;
                    finish(family, market, &x, &y, &split, path, |row| {
                        model.predict_proba(row)
                    })
                }
                Family::Gbdt => {
                    let (model, _) = boost::train_best_of(
                        &gather(&x, &split.train),
                        &gather_y(&y, &split.train),
                        &BoostConfig::default(),
                        boost_restarts,
                        SPLIT_SEED,
                    );
                    let path = write_artifact(models_dir, family, market, &model)?;
                    finish(family, market, &x, &y, &split, path, |row| {
                        model.predict_proba(row)
                    })
                }
                Family::Net => {
                    let model = net::train(
                        &gather(&x, &split.train),
                        &gather_y(&y, &split.train),
                        &NetConfig::default(),
                        SPLIT_SEED,
                    );
                    let path = write_artifact(models_dir, family, market, &model)?;
                    finish(family, market, &x, &y, &split, path, |row| {
                        model.predict_proba(row)
                    })
                }
            };
            outcomes.push(outcome);
        }
    }
    Ok(outcomes)
}

pub fn artifact_path(models_dir: &Path, family: Family, market: Market) -> PathBuf {
    models_dir.join(format!("{}_{}.json", family.slug(), market.slug()))
}

pub fn write_artifact<M: Serialize>(
    models_dir: &Path,
    family: Family,
    market: Market,
    model: &M,
) -> Result<PathBuf> {
    let artifact = Artifact {
        family: family.label().to_string(),
        market: market.slug().to_string(),
        feature_columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        model,
    };
    let path = artifact_path(models_dir, family, market);
    let raw = serde_json::to_string_pretty(&artifact).context("serialize artifact")?;
    fs::write(&path, raw).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Loads an artifact, or `Ok(None)` when the file is absent. A present
/// artifact with a mismatched column layout is an error: it was trained
/// against a different schema and its probabilities would be garbage.
pub fn load_artifact<M: DeserializeOwned>(
    models_dir: &Path,
    family: Family,
    market: Market,
) -> Result<Option<M>> {
    let path = artifact_path(models_dir, family, market);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    let artifact: Artifact<M> = serde_json::from_str(&raw)
        .with_context(|| format!("parse artifact {}", path.display()))?;
    if artifact.feature_columns != FEATURE_COLUMNS {
        return Err(anyhow!(
            "artifact {} was trained against a different feature layout; retrain models",
            path.display()
        ));
    }
    Ok(Some(artifact.model))
}

struct HoldoutSplit {
    train: Vec<usize>,
    test: Vec<usize>,
}

fn holdout_split(n: usize) -> HoldoutSplit {
    let mut indices = (0..n).collect::<Vec<_>>();
    let mut rng = StdRng::seed_from_u64(SPLIT_SEED);
    indices.shuffle(&mut rng);
    let holdout = (n / 10).max(1);
    let (test, train) = indices.split_at(holdout);
    HoldoutSplit {
        train: train.to_vec(),
        test: test.to_vec(),
    }
}

fn gather(x: &[Vec<f64>], indices: &[usize]) -> Vec<Vec<f64>> {
    indices.iter().map(|&i| x[i].clone()).collect()
}

fn gather_y(y: &[f64], indices: &[usize]) -> Vec<f64> {
    indices.iter().map(|&i| y[i]).collect()
}

fn finish(
    family: Family,
    market: Market,
    x: &[Vec<f64>],
    y: &[f64],
    split: &HoldoutSplit,
    artifact_path: PathBuf,
    predict: impl Fn(&[f64]) -> f64,
) -> TrainOutcome {
    let mut correct = 0usize;
    let mut log_loss_sum = 0.0;
    for &i in &split.test {
        let p = predict(&x[i]).clamp(1e-12, 1.0 - 1e-12);
        if (p > 0.5) == (y[i] > 0.5) {
            correct += 1;
        }
        log_loss_sum += if y[i] > 0.5 { -p.ln() } else { -(1.0 - p).ln() };
    }
    let n = split.test.len().max(1) as f64;
    TrainOutcome {
        family,
        market,
        rows_used: x.len(),
        holdout_accuracy: correct as f64 / n,
        holdout_log_loss: log_loss_sum / n,
        artifact_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::TodaysGameRow;
    use chrono::NaiveDate;

    fn feature_row(home_win: i64, ou_cover: i64) -> FeatureRow {
        FeatureRow {
            game: TodaysGameRow {
                season: 2023,
                week: 1,
                gameday: NaiveDate::from_ymd_opt(2023, 9, 10).unwrap(),
                home_team: "KC".to_string(),
                away_team: "DET".to_string(),
                spread_line: -4.0,
                total_line: 53.0,
                home_moneyline: -200.0,
                away_moneyline: 170.0,
                home_epa: 0.1,
                away_epa: 0.05,
                home_ppg: 28.0,
                away_ppg: 24.0,
                epa_diff: 0.05,
                ppg_diff: 4.0,
                spread_vs_epa: -4.05,
                home_implied_prob: 2.0 / 3.0,
                away_implied_prob: 100.0 / 270.0,
            },
            home_win,
            ou_cover,
        }
    }

    #[test]
    fn push_rows_are_excluded_from_over_under_training() {
        let rows = vec![feature_row(1, 1), feature_row(0, -1), feature_row(1, 0)];
        let (x, y) = extract_labeled(&rows, Market::OverUnder);
        assert_eq!(x.len(), 2);
        assert_eq!(y, vec![1.0, 0.0]);
        // The moneyline market keeps all three.
        let (x_ml, _) = extract_labeled(&rows, Market::HomeWin);
        assert_eq!(x_ml.len(), 3);
    }

    #[test]
    fn feature_vec_matches_column_contract() {
        let row = feature_row(1, 1);
        assert_eq!(row.game.feature_vec().len(), FEATURE_COLUMNS.len());
    }
}
