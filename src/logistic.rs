//! Logistic regression by batch gradient descent on standardized features.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: Vec<f64>,
    pub bias: f64,
    pub feature_means: Vec<f64>,
    pub feature_stds: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct LogisticConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            epochs: 500,
            learning_rate: 0.1,
            l2: 1e-4,
        }
    }
}

pub fn train(x: &[Vec<f64>], y: &[f64], cfg: &LogisticConfig) -> LogisticModel {
    let n = x.len();
    let dims = x.first().map(Vec::len).unwrap_or(0);
    let (means, stds) = standardization_params(x, dims);

    let standardized = x
        .iter()
        .map(|row| standardize(row, &means, &stds))
        .collect::<Vec<_>>();

    let mut weights = vec![0.0; dims];
    let mut bias = 0.0;

    for _ in 0..cfg.epochs {
        let mut grad_w = vec![0.0; dims];
        let mut grad_b = 0.0;
        for (row, &label) in standardized.iter().zip(y) {
            let p = sigmoid(dot(&weights, row) + bias);
            let residual = p - label;
            for (g, &v) in grad_w.iter_mut().zip(row) {
                *g += residual * v;
            }
            grad_b += residual;
        }
        let scale = 1.0 / n.max(1) as f64;
        for (w, g) in weights.iter_mut().zip(&grad_w) {
            *w -= cfg.learning_rate * (g * scale + cfg.l2 * *w);
        }
        bias -= cfg.learning_rate * grad_b * scale;
    }

    LogisticModel {
        weights,
        bias,
        feature_means: means,
        feature_stds: stds,
    }
}

impl LogisticModel {
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let standardized = standardize(row, &self.feature_means, &self.feature_stds);
        sigmoid(dot(&self.weights, &standardized) + self.bias)
    }
}

fn standardization_params(x: &[Vec<f64>], dims: usize) -> (Vec<f64>, Vec<f64>) {
    let n = x.len().max(1) as f64;
    let mut means = vec![0.0; dims];
    for row in x {
        for (m, &v) in means.iter_mut().zip(row) {
            *m += v;
        }
    }
    for m in &mut means {
        *m /= n;
    }

    let mut stds = vec![0.0; dims];
    for row in x {
        for ((s, &v), &m) in stds.iter_mut().zip(row).zip(&means) {
            *s += (v - m).powi(2);
        }
    }
    for s in &mut stds {
        *s = (*s / n).sqrt();
        // Constant columns standardize to zero, not NaN.
        if *s < 1e-12 {
            *s = 1.0;
        }
    }
    (means, stds)
}

fn standardize(row: &[f64], means: &[f64], stds: &[f64]) -> Vec<f64> {
    row.iter()
        .zip(means)
        .zip(stds)
        .map(|((&v, &m), &s)| (v - m) / s)
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learns_a_separable_threshold() {
        let x = (0..40)
            .map(|i| vec![f64::from(i), 1.0])
            .collect::<Vec<_>>();
        let y = (0..40)
            .map(|i| if i >= 20 { 1.0 } else { 0.0 })
            .collect::<Vec<_>>();
        let model = train(&x, &y, &LogisticConfig::default());
        assert!(model.predict_proba(&[35.0, 1.0]) > 0.9);
        assert!(model.predict_proba(&[5.0, 1.0]) < 0.1);
    }

    #[test]
    fn probabilities_stay_in_unit_interval() {
        let model = LogisticModel {
            weights: vec![100.0],
            bias: 0.0,
            feature_means: vec![0.0],
            feature_stds: vec![1.0],
        };
        let hi = model.predict_proba(&[1000.0]);
        let lo = model.predict_proba(&[-1000.0]);
        assert!(hi > 0.0 && hi <= 1.0);
        assert!(lo >= 0.0 && lo < 1.0);
    }

    #[test]
    fn constant_column_does_not_produce_nan() {
        let x = vec![vec![3.0, 1.0], vec![3.0, 2.0], vec![3.0, 3.0]];
        let y = vec![0.0, 1.0, 1.0];
        let model = train(&x, &y, &LogisticConfig::default());
        assert!(model.predict_proba(&[3.0, 2.0]).is_finite());
    }
}
