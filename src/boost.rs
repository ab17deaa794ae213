//! Gradient-boosted regression trees on the logistic loss.
//!
//! Second-order boosting in the usual style: per-round gradients
//! `g = p - y` and hessians `h = p (1 - p)`, exact greedy splits on sorted
//! feature values, leaf weights `-G / (H + lambda)`. The training entry
//! point fits many candidates on independent shuffled splits and keeps the
//! best holdout performer; restarts run in parallel and are seeded, so a
//! rebuild reproduces the same model.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::logistic::sigmoid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn eval(&self, row: &[f64]) -> f64 {
        match self {
            Node::Leaf { value } => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let v = row.get(*feature).copied().unwrap_or(0.0);
                if v <= *threshold {
                    left.eval(row)
                } else {
                    right.eval(row)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostModel {
    /// Log-odds prior; trees carry learning-rate-scaled leaf values on top.
    pub base_score: f64,
    pub trees: Vec<Node>,
}

impl BoostModel {
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let margin = self.base_score + self.trees.iter().map(|t| t.eval(row)).sum::<f64>();
        sigmoid(margin)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BoostConfig {
    pub rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub lambda: f64,
    pub min_leaf: usize,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            rounds: 200,
            learning_rate: 0.05,
            max_depth: 3,
            lambda: 1.0,
            min_leaf: 20,
        }
    }
}

pub fn train(x: &[Vec<f64>], y: &[f64], cfg: &BoostConfig) -> BoostModel {
    let n = x.len();
    if n == 0 {
        return BoostModel {
            base_score: 0.0,
            trees: Vec::new(),
        };
    }

    let prior = (y.iter().sum::<f64>() / n as f64).clamp(1e-6, 1.0 - 1e-6);
    let base_score = (prior / (1.0 - prior)).ln();

    let mut margins = vec![base_score; n];
    let mut trees = Vec::with_capacity(cfg.rounds);
    let all_indices = (0..n).collect::<Vec<_>>();

    for _ in 0..cfg.rounds {
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        for i in 0..n {
            let p = sigmoid(margins[i]);
            grad[i] = p - y[i];
            hess[i] = (p * (1.0 - p)).max(1e-12);
        }

        let tree = build_tree(x, &grad, &hess, &all_indices, cfg.max_depth, cfg);
        for (i, margin) in margins.iter_mut().enumerate() {
            *margin += tree.eval(&x[i]);
        }
        trees.push(tree);
    }

    BoostModel { base_score, trees }
}

/// Trains `restarts` candidates on independent shuffled 90/10 splits and
/// keeps the one with the best holdout accuracy. Deterministic for a given
/// `base_seed`.
pub fn train_best_of(
    x: &[Vec<f64>],
    y: &[f64],
    cfg: &BoostConfig,
    restarts: usize,
    base_seed: u64,
) -> (BoostModel, f64) {
    let restarts = restarts.max(1);
    let candidates = (0..restarts)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(i as u64));
            let mut indices = (0..x.len()).collect::<Vec<_>>();
            indices.shuffle(&mut rng);

            let holdout = (indices.len() / 10).max(1).min(indices.len());
            let (test_idx, train_idx) = indices.split_at(holdout);

            let train_x = train_idx.iter().map(|&i| x[i].clone()).collect::<Vec<_>>();
            let train_y = train_idx.iter().map(|&i| y[i]).collect::<Vec<_>>();
            let model = train(&train_x, &train_y, cfg);

            let mut correct = 0usize;
            for &i in test_idx {
                let predicted = model.predict_proba(&x[i]) > 0.5;
                if predicted == (y[i] > 0.5) {
                    correct += 1;
                }
            }
            let accuracy = correct as f64 / test_idx.len().max(1) as f64;
            (i, accuracy, model)
        })
        .collect::<Vec<_>>();

    candidates
        .into_iter()
        .min_by(|(ai, aa, _), (bi, ba, _)| {
            // Highest accuracy wins; ties break on restart index so the
            // result does not depend on rayon's completion order.
            ba.partial_cmp(aa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(ai.cmp(bi))
        })
        .map(|(_, accuracy, model)| (model, accuracy))
        .expect("at least one restart")
}

fn build_tree(
    x: &[Vec<f64>],
    grad: &[f64],
    hess: &[f64],
    indices: &[usize],
    depth: usize,
    cfg: &BoostConfig,
) -> Node {
    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();

    if depth == 0 || indices.len() < 2 * cfg.min_leaf {
        return leaf(g_sum, h_sum, cfg);
    }

    let Some(split) = best_split(x, grad, hess, indices, g_sum, h_sum, cfg) else {
        return leaf(g_sum, h_sum, cfg);
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| x[i][split.feature] <= split.threshold);

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(build_tree(x, grad, hess, &left_idx, depth - 1, cfg)),
        right: Box::new(build_tree(x, grad, hess, &right_idx, depth - 1, cfg)),
    }
}

fn leaf(g_sum: f64, h_sum: f64, cfg: &BoostConfig) -> Node {
    Node::Leaf {
        value: cfg.learning_rate * (-g_sum / (h_sum + cfg.lambda)),
    }
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn best_split(
    x: &[Vec<f64>],
    grad: &[f64],
    hess: &[f64],
    indices: &[usize],
    g_sum: f64,
    h_sum: f64,
    cfg: &BoostConfig,
) -> Option<SplitChoice> {
    let dims = x.first().map(Vec::len).unwrap_or(0);
    let parent_score = g_sum * g_sum / (h_sum + cfg.lambda);
    let mut best: Option<SplitChoice> = None;

    for feature in 0..dims {
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| {
            x[a][feature]
                .partial_cmp(&x[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut g_left = 0.0;
        let mut h_left = 0.0;
        for pos in 0..sorted.len().saturating_sub(1) {
            let i = sorted[pos];
            g_left += grad[i];
            h_left += hess[i];

            let here = x[i][feature];
            let next = x[sorted[pos + 1]][feature];
            if here == next {
                continue;
            }
            let n_left = pos + 1;
            let n_right = sorted.len() - n_left;
            if n_left < cfg.min_leaf || n_right < cfg.min_leaf {
                continue;
            }

            let g_right = g_sum - g_left;
            let h_right = h_sum - h_left;
            let gain = 0.5
                * (g_left * g_left / (h_left + cfg.lambda)
                    + g_right * g_right / (h_right + cfg.lambda)
                    - parent_score);
            if gain <= 0.0 {
                continue;
            }
            if best.as_ref().is_none_or(|b| gain > b.gain) {
                best = Some(SplitChoice {
                    feature,
                    threshold: (here + next) / 2.0,
                    gain,
                });
            }
        }
    }
    best
}
