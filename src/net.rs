//! Small feed-forward network for binary outcomes: two relu hidden layers,
//! sigmoid output, SGD with early stopping on a validation split. Inputs
//! are row-wise L2-normalized before they reach the network.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::logistic::sigmoid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    /// `weights[out][in]`.
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetModel {
    pub layers: Vec<Layer>,
}

#[derive(Debug, Clone)]
pub struct NetConfig {
    pub hidden_sizes: Vec<usize>,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub val_split: f64,
    pub patience: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            hidden_sizes: vec![128, 64],
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.01,
            val_split: 0.1,
            patience: 10,
        }
    }
}

impl NetModel {
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let input = l2_normalize(row);
        let (activations, _) = self.forward(&input);
        activations.last().and_then(|out| out.first()).copied().unwrap_or(0.5)
    }

    /// Returns per-layer activations (input included) and pre-activations.
    fn forward(&self, input: &[f64]) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let mut activations = vec![input.to_vec()];
        let mut pre_activations = Vec::with_capacity(self.layers.len());

        for (idx, layer) in self.layers.iter().enumerate() {
            let prev = activations.last().expect("input activation present");
            let z = layer
                .weights
                .iter()
                .zip(&layer.biases)
                .map(|(w, b)| w.iter().zip(prev).map(|(wi, ai)| wi * ai).sum::<f64>() + b)
                .collect::<Vec<_>>();
            let last = idx == self.layers.len() - 1;
            let a = z
                .iter()
                .map(|&v| if last { sigmoid(v) } else { v.max(0.0) })
                .collect::<Vec<_>>();
            pre_activations.push(z);
            activations.push(a);
        }
        (activations, pre_activations)
    }
}

pub fn train(x: &[Vec<f64>], y: &[f64], cfg: &NetConfig, seed: u64) -> NetModel {
    let dims = x.first().map(Vec::len).unwrap_or(0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut model = init_model(dims, &cfg.hidden_sizes, &mut rng);
    if x.is_empty() || dims == 0 {
        return model;
    }

    let normalized = x.iter().map(|row| l2_normalize(row)).collect::<Vec<_>>();

    let mut indices = (0..normalized.len()).collect::<Vec<_>>();
    indices.shuffle(&mut rng);
    let val_len = ((normalized.len() as f64 * cfg.val_split) as usize)
        .clamp(1, normalized.len().saturating_sub(1).max(1));
    let (val_idx, train_idx) = indices.split_at(val_len.min(indices.len()));

    let mut best = model.clone();
    let mut best_loss = f64::INFINITY;
    let mut patience_left = cfg.patience;
    let mut order = train_idx.to_vec();

    for _ in 0..cfg.epochs {
        order.shuffle(&mut rng);
        for batch in order.chunks(cfg.batch_size.max(1)) {
            sgd_step(&mut model, &normalized, y, batch, cfg.learning_rate);
        }

        let val_loss = mean_bce(&model, &normalized, y, val_idx);
        if val_loss + 1e-9 < best_loss {
            best_loss = val_loss;
            best = model.clone();
            patience_left = cfg.patience;
        } else {
            if patience_left == 0 {
                break;
            }
            patience_left -= 1;
        }
    }
    best
}

fn init_model(input_dim: usize, hidden_sizes: &[usize], rng: &mut StdRng) -> NetModel {
    let mut sizes = vec![input_dim];
    sizes.extend_from_slice(hidden_sizes);
    sizes.push(1);

    let layers = sizes
        .windows(2)
        .map(|pair| {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let limit = (6.0 / (fan_in + fan_out).max(1) as f64).sqrt();
            Layer {
                weights: (0..fan_out)
                    .map(|_| (0..fan_in).map(|_| rng.gen_range(-limit..=limit)).collect())
                    .collect(),
                biases: vec![0.0; fan_out],
            }
        })
        .collect();
    NetModel { layers }
}

fn sgd_step(model: &mut NetModel, x: &[Vec<f64>], y: &[f64], batch: &[usize], lr: f64) {
    if batch.is_empty() {
        return;
    }
    let mut grad_w = model
        .layers
        .iter()
        .map(|l| vec![vec![0.0; l.weights[0].len()]; l.weights.len()])
        .collect::<Vec<_>>();
    let mut grad_b = model
        .layers
        .iter()
        .map(|l| vec![0.0; l.biases.len()])
        .collect::<Vec<_>>();

    for &i in batch {
        let (activations, pre_activations) = model.forward(&x[i]);
        // Sigmoid + binary cross-entropy collapses the output delta to p - y.
        let p = activations.last().expect("output layer")[0];
        let mut delta = vec![p - y[i]];

        for layer_idx in (0..model.layers.len()).rev() {
            let input = &activations[layer_idx];
            for (out_idx, &d) in delta.iter().enumerate() {
                for (in_idx, &a) in input.iter().enumerate() {
                    grad_w[layer_idx][out_idx][in_idx] += d * a;
                }
                grad_b[layer_idx][out_idx] += d;
            }
            if layer_idx == 0 {
                break;
            }
            let layer = &model.layers[layer_idx];
            let prev_z = &pre_activations[layer_idx - 1];
            delta = (0..layer.weights[0].len())
                .map(|in_idx| {
                    if prev_z[in_idx] <= 0.0 {
                        return 0.0;
                    }
                    delta
                        .iter()
                        .enumerate()
                        .map(|(out_idx, &d)| d * layer.weights[out_idx][in_idx])
                        .sum()
                })
                .collect();
        }
    }

    let scale = lr / batch.len() as f64;
    for (layer, (gw, gb)) in model.layers.iter_mut().zip(grad_w.iter().zip(&grad_b)) {
        for (w_row, g_row) in layer.weights.iter_mut().zip(gw) {
            for (w, g) in w_row.iter_mut().zip(g_row) {
                *w -= scale * g;
            }
        }
        for (b, g) in layer.biases.iter_mut().zip(gb) {
            *b -= scale * g;
        }
    }
}

fn mean_bce(model: &NetModel, x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    let mut sum = 0.0;
    for &i in indices {
        let (activations, _) = model.forward(&x[i]);
        let p = activations.last().expect("output layer")[0].clamp(1e-12, 1.0 - 1e-12);
        sum += if y[i] > 0.5 { -p.ln() } else { -(1.0 - p).ln() };
    }
    sum / indices.len() as f64
}

pub fn l2_normalize(row: &[f64]) -> Vec<f64> {
    let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm < 1e-12 {
        return row.to_vec();
    }
    row.iter().map(|v| v / norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_unit_norm() {
        let v = l2_normalize(&[3.0, 4.0]);
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9);
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn output_is_a_probability() {
        let mut rng = StdRng::seed_from_u64(1);
        let model = init_model(4, &[8, 4], &mut rng);
        let p = model.predict_proba(&[1.0, -2.0, 3.0, 0.5]);
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn learns_direction_of_a_simple_signal() {
        // Label follows the sign of the first coordinate.
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..120 {
            let v = if i % 2 == 0 { 1.0 } else { -1.0 };
            x.push(vec![v, 0.3]);
            y.push(if v > 0.0 { 1.0 } else { 0.0 });
        }
        let cfg = NetConfig {
            hidden_sizes: vec![8],
            epochs: 200,
            learning_rate: 0.5,
            ..NetConfig::default()
        };
        let model = train(&x, &y, &cfg, 42);
        assert!(model.predict_proba(&[1.0, 0.3]) > 0.6);
        assert!(model.predict_proba(&[-1.0, 0.3]) < 0.4);
    }
}
