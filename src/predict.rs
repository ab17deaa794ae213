//! Prediction runner: loads whatever model artifacts exist and scores the
//! `todays_games` feature matrix. Missing artifacts skip a family; a family
//! whose artifact fails to load is reported as a warning, never a fault —
//! the front ends still render whatever probabilities are available.

use anyhow::Result;

use crate::boost::BoostModel;
use crate::config::AppConfig;
use crate::features::TodaysGameRow;
use crate::logistic::LogisticModel;
use crate::net::NetModel;
use crate::train::{Family, Market, load_artifact};

#[derive(Debug, Default)]
pub struct ModelSet {
    pub log_ml: Option<LogisticModel>,
    pub log_ou: Option<LogisticModel>,
    pub boost_ml: Option<BoostModel>,
    pub boost_ou: Option<BoostModel>,
    pub net_ml: Option<NetModel>,
    pub net_ou: Option<NetModel>,
    /// Load problems worth surfacing (stale schema, unreadable file).
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GamePrediction {
    pub game: TodaysGameRow,
    /// `("Home Win (LogReg)", 0.62)` style pairs, in family order.
    pub columns: Vec<(String, f64)>,
}

impl ModelSet {
    pub fn load(config: &AppConfig) -> Self {
        let dir = &config.models_dir;
        let mut set = ModelSet::default();

        set.log_ml = take(load_artifact(dir, Family::LogReg, Market::HomeWin), &mut set.warnings);
        set.log_ou = take(load_artifact(dir, Family::LogReg, Market::OverUnder), &mut set.warnings);
        set.boost_ml = take(load_artifact(dir, Family::Gbdt, Market::HomeWin), &mut set.warnings);
        set.boost_ou = take(load_artifact(dir, Family::Gbdt, Market::OverUnder), &mut set.warnings);
        set.net_ml = take(load_artifact(dir, Family::Net, Market::HomeWin), &mut set.warnings);
        set.net_ou = take(load_artifact(dir, Family::Net, Market::OverUnder), &mut set.warnings);
        set
    }

    pub fn loaded_count(&self) -> usize {
        usize::from(self.log_ml.is_some())
            + usize::from(self.log_ou.is_some())
            + usize::from(self.boost_ml.is_some())
            + usize::from(self.boost_ou.is_some())
            + usize::from(self.net_ml.is_some())
            + usize::from(self.net_ou.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.loaded_count() == 0
    }

    pub fn predict(&self, rows: &[TodaysGameRow]) -> Vec<GamePrediction> {
        rows.iter()
            .map(|game| {
                let x = game.feature_vec();
                let mut columns = Vec::new();

                push_column(&mut columns, Family::LogReg, Market::HomeWin,
                    self.log_ml.as_ref().map(|m| m.predict_proba(&x)));
                push_column(&mut columns, Family::LogReg, Market::OverUnder,
                    self.log_ou.as_ref().map(|m| m.predict_proba(&x)));
                push_column(&mut columns, Family::Gbdt, Market::HomeWin,
                    self.boost_ml.as_ref().map(|m| m.predict_proba(&x)));
                push_column(&mut columns, Family::Gbdt, Market::OverUnder,
                    self.boost_ou.as_ref().map(|m| m.predict_proba(&x)));
                push_column(&mut columns, Family::Net, Market::HomeWin,
                    self.net_ml.as_ref().map(|m| m.predict_proba(&x)));
                push_column(&mut columns, Family::Net, Market::OverUnder,
                    self.net_ou.as_ref().map(|m| m.predict_proba(&x)));

                GamePrediction {
                    game: game.clone(),
                    columns,
                }
            })
            .collect()
    }
}

pub fn column_name(market: Market, family: Family) -> String {
    format!("{} ({})", market.column_label(), family.label())
}

fn push_column(
    columns: &mut Vec<(String, f64)>,
    family: Family,
    market: Market,
    prob: Option<f64>,
) {
    if let Some(p) = prob {
        columns.push((column_name(market, family), p.clamp(0.0, 1.0)));
    }
}

fn take<M>(loaded: Result<Option<M>>, warnings: &mut Vec<String>) -> Option<M> {
    match loaded {
        Ok(model) => model,
        Err(err) => {
            warnings.push(format!("{err:#}"));
            None
        }
    }
}
