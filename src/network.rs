/* src/network.rs */
//! # Squiggle Network
//!
//! Inference-only network mapping encoded bases to per-position signal
//! parameters. Every layer is built from the padded-matrix kernels:
//!
//! ```text
//! bases [1, n]
//!   -> one-hot context window        [4 * window, n]
//!   -> affine_map + tanh             [hidden, n]
//!   -> forward / backward smoothing  2 x [hidden, n]
//!   -> affine_map2 + tanh            [hidden, n]
//!   -> affine_map                    [3, n]   (current level, spread, dwell)
//! ```
//!
//! Weight tables are external data. [`ModelWeights`] reads and writes them as
//! JSON or YAML; [`ModelWeights::seeded`] produces a deterministic placeholder
//! table with the right shapes.
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wide::f32x4;

use crate::config::is_yaml;
use crate::convert::{from_flat_array, to_flat_array};
use crate::error::{Result, SquiggleError};
use crate::gemm::{FaerGemm, Gemm};
use crate::linalg::{affine_map2_with, affine_map_with, tanh_activation};
use crate::matrix::{IMatrix, Matrix};
use crate::{validate_ivector, validate_matrix, validate_vector};

/// Size of the base alphabet.
pub const NBASE: usize = 4;

/// Signal parameters predicted per position.
pub const NPARAM: usize = 3;

fn weights_error(message: impl Into<String>) -> SquiggleError {
    SquiggleError::Weights {
        message: message.into(),
    }
}

// =====================================================================================
// WEIGHT TABLES
// =====================================================================================

/// Serializable weight tables. Matrices are flat column-major vectors, shaped
/// `[inputs, outputs]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    /// Context window width in bases (odd)
    pub window: usize,
    /// Hidden units per layer
    pub hidden: usize,
    /// `[4 * window, hidden]`
    pub embed_weights: Vec<f32>,
    /// `[hidden]`
    pub embed_bias: Vec<f32>,
    /// Per-unit decay of the forward smoothing, each in `[0, 1)`
    pub forward_decay: Vec<f32>,
    /// Per-unit decay of the backward smoothing, each in `[0, 1)`
    pub backward_decay: Vec<f32>,
    /// `[hidden, hidden]`
    pub forward_weights: Vec<f32>,
    /// `[hidden, hidden]`
    pub backward_weights: Vec<f32>,
    /// `[hidden]`
    pub context_bias: Vec<f32>,
    /// `[hidden, 3]`
    pub output_weights: Vec<f32>,
    /// `[3]`
    pub output_bias: Vec<f32>,
}

/// `rows * cols` samples from `N(0, 1 / rows)`.
fn gaussian_table(rng: &mut StdRng, rows: usize, cols: usize) -> Result<Vec<f32>> {
    let normal = Normal::new(0.0f32, 1.0 / (rows as f32).sqrt())
        .map_err(|e| weights_error(e.to_string()))?;
    Ok((0..rows * cols).map(|_| normal.sample(&mut *rng)).collect())
}

impl ModelWeights {
    /// Deterministic placeholder weights for a `window` / `hidden` topology.
    pub fn seeded(window: usize, hidden: usize, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let inputs = NBASE * window;

        let weights = Self {
            window,
            hidden,
            embed_weights: gaussian_table(&mut rng, inputs, hidden)?,
            embed_bias: vec![0.0; hidden],
            forward_decay: (0..hidden).map(|_| rng.random_range(0.5f32..0.95)).collect(),
            backward_decay: (0..hidden).map(|_| rng.random_range(0.5f32..0.95)).collect(),
            forward_weights: gaussian_table(&mut rng, hidden, hidden)?,
            backward_weights: gaussian_table(&mut rng, hidden, hidden)?,
            context_bias: vec![0.0; hidden],
            output_weights: gaussian_table(&mut rng, hidden, NPARAM)?,
            output_bias: vec![0.0; NPARAM],
        };
        weights.check()?;
        Ok(weights)
    }

    /// Verifies topology, table sizes, finiteness and decay ranges.
    pub fn check(&self) -> Result<()> {
        if self.window == 0 || self.window % 2 == 0 {
            return Err(weights_error(format!(
                "context window must be a positive odd number, got {}",
                self.window
            )));
        }
        if self.hidden == 0 {
            return Err(weights_error("hidden layer must have at least one unit"));
        }

        let (inputs, hidden) = (NBASE * self.window, self.hidden);
        let tables: [(&str, &[f32], usize); 9] = [
            ("embed_weights", &self.embed_weights, inputs * hidden),
            ("embed_bias", &self.embed_bias, hidden),
            ("forward_decay", &self.forward_decay, hidden),
            ("backward_decay", &self.backward_decay, hidden),
            ("forward_weights", &self.forward_weights, hidden * hidden),
            ("backward_weights", &self.backward_weights, hidden * hidden),
            ("context_bias", &self.context_bias, hidden),
            ("output_weights", &self.output_weights, hidden * NPARAM),
            ("output_bias", &self.output_bias, NPARAM),
        ];
        for (name, table, expected) in tables {
            if table.len() != expected {
                return Err(weights_error(format!(
                    "{name} holds {} values, expected {expected}",
                    table.len()
                )));
            }
            if let Some(index) = table.iter().position(|v| !v.is_finite()) {
                return Err(weights_error(format!("{name}[{index}] is not finite")));
            }
        }

        for (name, decay) in [("forward_decay", &self.forward_decay), ("backward_decay", &self.backward_decay)] {
            if let Some(index) = decay.iter().position(|d| !(0.0..1.0).contains(d)) {
                return Err(weights_error(format!("{name}[{index}] = {} lies outside [0, 1)", decay[index])));
            }
        }
        Ok(())
    }

    /// Reads a weight table; `.yaml`/`.yml` files are YAML, anything else JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let weights: Self = if is_yaml(path) {
            serde_yaml::from_str(&content).map_err(|e| weights_error(format!("{}: {e}", path.display())))?
        } else {
            serde_json::from_str(&content).map_err(|e| weights_error(format!("{}: {e}", path.display())))?
        };
        weights.check()?;
        info!(path = %path.display(), window = weights.window, hidden = weights.hidden, "Loaded weight table");
        Ok(weights)
    }

    /// Writes the table in the format implied by the extension of `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if is_yaml(path) {
            serde_yaml::to_string(self).map_err(|e| weights_error(e.to_string()))?
        } else {
            serde_json::to_string_pretty(self).map_err(|e| weights_error(e.to_string()))?
        };
        fs::write(path, content)?;
        Ok(())
    }
}

// =====================================================================================
// NETWORK
// =====================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// Exponential smoothing along positions: `s_t = d * s_{t-1} + (1 - d) * h_t`,
/// run from the first column (forward) or the last (backward), one lane group
/// at a time. Zero padding in `h` and `decay` stays zero.
fn smooth(h: &Matrix, decay: &Matrix, direction: Direction) -> Result<Matrix> {
    let mut out = Matrix::new(h.nr(), h.nc())?;
    let keep = decay.column_lanes(0);
    let take: Vec<f32x4> = keep.iter().map(|&d| f32x4::splat(1.0) - d).collect();
    let mut state = vec![f32x4::splat(0.0); h.nrq()];

    let nc = h.nc();
    for step in 0..nc {
        let col = match direction {
            Direction::Forward => step,
            Direction::Backward => nc - 1 - step,
        };
        let input = h.column_lanes(col);
        for (q, s) in state.iter_mut().enumerate() {
            *s = keep[q] * *s + take[q] * input[q];
        }
        out.column_lanes_mut(col).copy_from_slice(&state);
    }
    Ok(out)
}

/// Row 1 becomes `exp(row 1)` and row 2 becomes `exp(-row 2)`; row 0 is kept.
fn rescale_parameters(out: &mut Matrix) {
    for col in 0..out.nc() {
        let column = out.column_mut(col);
        column[1] = column[1].exp();
        column[2] = (-column[2]).exp();
    }
}

/// Squiggle predictor holding padded weight matrices and a multiply backend.
#[derive(Debug)]
pub struct SquiggleModel<G: Gemm = FaerGemm> {
    window: usize,
    embed_weights: Matrix,
    embed_bias: Matrix,
    forward_decay: Matrix,
    backward_decay: Matrix,
    forward_weights: Matrix,
    backward_weights: Matrix,
    context_bias: Matrix,
    output_weights: Matrix,
    output_bias: Matrix,
    gemm: G,
}

impl SquiggleModel<FaerGemm> {
    /// Builds a model using a sequential `faer` multiply.
    pub fn from_weights(weights: &ModelWeights) -> Result<Self> {
        Self::with_gemm(weights, FaerGemm::sequential())
    }
}

impl<G: Gemm> SquiggleModel<G> {
    /// Builds a model that multiplies through `gemm`.
    pub fn with_gemm(weights: &ModelWeights, gemm: G) -> Result<Self> {
        weights.check()?;
        debug_assert!(validate_vector!(Some(&weights.forward_decay[..]), Some(0.0), Some(1.0)));
        debug_assert!(validate_vector!(Some(&weights.backward_decay[..]), Some(0.0), Some(1.0)));

        let (inputs, hidden) = (NBASE * weights.window, weights.hidden);
        let model = Self {
            window: weights.window,
            embed_weights: from_flat_array(&weights.embed_weights, inputs, hidden)?,
            embed_bias: from_flat_array(&weights.embed_bias, hidden, 1)?,
            forward_decay: from_flat_array(&weights.forward_decay, hidden, 1)?,
            backward_decay: from_flat_array(&weights.backward_decay, hidden, 1)?,
            forward_weights: from_flat_array(&weights.forward_weights, hidden, hidden)?,
            backward_weights: from_flat_array(&weights.backward_weights, hidden, hidden)?,
            context_bias: from_flat_array(&weights.context_bias, hidden, 1)?,
            output_weights: from_flat_array(&weights.output_weights, hidden, NPARAM)?,
            output_bias: from_flat_array(&weights.output_bias, NPARAM, 1)?,
            gemm,
        };
        debug!(window = model.window, hidden, "Built squiggle model");
        Ok(model)
    }

    /// Context window width in bases.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Hidden units per layer.
    pub fn hidden(&self) -> usize {
        self.embed_weights.nc()
    }

    /// One-hot context window: row `4 * o + base` of column `t` is set when the
    /// base at `t + o - window / 2` exists. Codes outside `0..4` contribute nothing.
    fn embed(&self, bases: &IMatrix) -> Result<Matrix> {
        debug_assert_eq!(bases.nr(), 1, "encoded bases must be a single row");
        let seq = to_flat_array(bases)?;
        debug_assert!(validate_ivector!(Some(&seq[..]), 0, NBASE as i32 - 1));

        let n = seq.len();
        let half = self.window / 2;
        let mut x = Matrix::new(NBASE * self.window, n)?;
        for t in 0..n {
            for o in 0..self.window {
                let Some(j) = (t + o).checked_sub(half).filter(|&j| j < n) else {
                    continue;
                };
                if let Some(base) = usize::try_from(seq[j]).ok().filter(|&b| b < NBASE) {
                    x.set(NBASE * o + base, t, 1.0);
                }
            }
        }
        Ok(x)
    }

    /// Predicts `[3, n]` signal parameters for `n` encoded bases.
    ///
    /// With `rescale`, the spread row is exponentiated and the dwell row mapped
    /// through `exp(-x)`.
    pub fn forward(&self, bases: &IMatrix, rescale: bool) -> Result<Matrix> {
        let x = self.embed(bases)?;

        let mut h = affine_map_with(&self.gemm, &x, &self.embed_weights, &self.embed_bias, None)?;
        tanh_activation(&mut h);
        debug_assert!(validate_matrix!(Some(&h), Some(-1.0), Some(1.0), Some(0.0), true));

        let forward = smooth(&h, &self.forward_decay, Direction::Forward)?;
        let backward = smooth(&h, &self.backward_decay, Direction::Backward)?;
        // the embedding output is no longer needed; reuse it for the context layer
        let mut context = affine_map2_with(
            &self.gemm,
            &forward,
            &backward,
            &self.forward_weights,
            &self.backward_weights,
            &self.context_bias,
            Some(h),
        )?;
        tanh_activation(&mut context);
        debug_assert!(validate_matrix!(Some(&context), Some(-1.0), Some(1.0), Some(0.0), true));

        let mut out = affine_map_with(&self.gemm, &context, &self.output_weights, &self.output_bias, None)?;
        if rescale {
            rescale_parameters(&mut out);
        }
        debug_assert!(validate_matrix!(Some(&out), None, None, Some(0.0), false));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemm::tests::NaiveGemm;
    use crate::reduce::equality;

    fn bases(codes: &[i32]) -> IMatrix {
        from_flat_array(codes, 1, codes.len()).unwrap()
    }

    fn small_weights() -> ModelWeights {
        ModelWeights::seeded(3, 6, 11).unwrap()
    }

    #[test]
    fn test_seeded_weights_are_deterministic() {
        let a = ModelWeights::seeded(5, 8, 42).unwrap();
        let b = ModelWeights::seeded(5, 8, 42).unwrap();
        let c = ModelWeights::seeded(5, 8, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.embed_weights, c.embed_weights);
        assert_eq!(a.embed_weights.len(), 4 * 5 * 8);
        assert!(a.forward_decay.iter().all(|d| (0.5..0.95).contains(d)));
    }

    #[test]
    fn test_check_rejects_bad_topology() {
        assert!(matches!(ModelWeights::seeded(4, 8, 0), Err(SquiggleError::Weights { .. })));
        assert!(matches!(ModelWeights::seeded(0, 8, 0), Err(SquiggleError::Weights { .. })));
        assert!(matches!(ModelWeights::seeded(3, 0, 0), Err(SquiggleError::Weights { .. })));
    }

    #[test]
    fn test_check_rejects_bad_tables() {
        let mut w = small_weights();
        w.output_bias.push(0.0);
        assert!(matches!(w.check(), Err(SquiggleError::Weights { .. })));

        let mut w = small_weights();
        w.forward_decay[2] = 1.0;
        assert!(w.check().is_err());

        let mut w = small_weights();
        w.embed_weights[0] = f32::NAN;
        assert!(w.check().is_err());
        assert!(SquiggleModel::from_weights(&w).is_err());
    }

    #[test]
    fn test_embedding_one_hot_window() {
        let model = SquiggleModel::from_weights(&small_weights()).unwrap();
        let x = model.embed(&bases(&[0, 3])).unwrap();
        assert_eq!(x.shape(), (12, 2));

        let hot = |col: usize| -> Vec<usize> {
            x.column(col).iter().enumerate().filter(|&(_, &v)| v == 1.0).map(|(i, _)| i).collect()
        };
        // column 0: centre A, right neighbour T
        assert_eq!(hot(0), vec![4, 11]);
        // column 1: left neighbour A, centre T
        assert_eq!(hot(1), vec![0, 7]);
        assert_eq!(x.as_slice().iter().filter(|&&v| v != 0.0).count(), 4);
    }

    #[test]
    fn test_smoothing_directions() {
        let h: Matrix = from_flat_array(&[1.0, 0.0, 0.0], 1, 3).unwrap();
        let decay: Matrix = from_flat_array(&[0.5], 1, 1).unwrap();

        let f = smooth(&h, &decay, Direction::Forward).unwrap();
        assert_eq!(to_flat_array(&f).unwrap(), vec![0.5, 0.25, 0.125]);

        let b = smooth(&h, &decay, Direction::Backward).unwrap();
        assert_eq!(to_flat_array(&b).unwrap(), vec![0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_smoothing_keeps_padding_zero() {
        let h: Matrix = from_flat_array(&[0.3, -0.2, 0.9, 0.1, 0.4, -0.8], 3, 2).unwrap();
        let decay: Matrix = from_flat_array(&[0.1, 0.5, 0.9], 3, 1).unwrap();
        let s = smooth(&h, &decay, Direction::Backward).unwrap();
        assert_eq!(s.as_slice()[3], 0.0);
        assert_eq!(s.as_slice()[7], 0.0);
    }

    #[test]
    fn test_forward_shapes_and_rescale() {
        let model = SquiggleModel::from_weights(&small_weights()).unwrap();
        let input = bases(&[0, 1, 2, 3, 3, 1, 0]);

        let raw = model.forward(&input, false).unwrap();
        assert_eq!(raw.shape(), (NPARAM, 7));
        assert_eq!(raw.padding(), 1);
        assert!(raw.columns().flatten().all(|v| v.is_finite()));

        let scaled = model.forward(&input, true).unwrap();
        for (r, s) in raw.columns().zip(scaled.columns()) {
            assert_eq!(r[0], s[0]);
            assert!((s[1] - r[1].exp()).abs() <= 1.0e-6 * s[1].max(1.0));
            assert!((s[2] - (-r[2]).exp()).abs() <= 1.0e-6 * s[2].max(1.0));
            assert!(s[1] > 0.0 && s[2] > 0.0);
        }
    }

    #[test]
    fn test_single_base_sequence() {
        let model = SquiggleModel::from_weights(&small_weights()).unwrap();
        let out = model.forward(&bases(&[2]), true).unwrap();
        assert_eq!(out.shape(), (NPARAM, 1));
    }

    #[test]
    fn test_backends_agree() {
        let weights = small_weights();
        let faer = SquiggleModel::from_weights(&weights).unwrap();
        let naive = SquiggleModel::with_gemm(&weights, NaiveGemm).unwrap();
        let input = bases(&[3, 3, 0, 1, 2, 2, 1, 0, 3]);
        let a = faer.forward(&input, true).unwrap();
        let b = naive.forward(&input, true).unwrap();
        assert!(equality(Some(&a), Some(&b), 1.0e-4));
    }

    #[test]
    fn test_accessors() {
        let model = SquiggleModel::from_weights(&ModelWeights::seeded(7, 16, 1).unwrap()).unwrap();
        assert_eq!(model.window(), 7);
        assert_eq!(model.hidden(), 16);
    }

    fn assert_tables_close(a: &ModelWeights, b: &ModelWeights) {
        assert_eq!((a.window, a.hidden), (b.window, b.hidden));
        let pairs = [
            (&a.embed_weights, &b.embed_weights),
            (&a.forward_decay, &b.forward_decay),
            (&a.backward_weights, &b.backward_weights),
            (&a.output_weights, &b.output_weights),
        ];
        for (x, y) in pairs {
            assert_eq!(x.len(), y.len());
            assert!(x.iter().zip(y).all(|(p, q)| (p - q).abs() <= 1.0e-6));
        }
    }

    #[test]
    fn test_save_and_load_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let weights = small_weights();
        for name in ["weights.json", "weights.yaml"] {
            let path = dir.path().join(name);
            weights.save(&path).unwrap();
            let loaded = ModelWeights::load(&path).unwrap();
            assert_tables_close(&weights, &loaded);
        }
    }

    #[test]
    fn test_load_rejects_inconsistent_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        let mut weights = small_weights();
        weights.hidden = 5;
        weights.save(&path).unwrap();
        assert!(matches!(ModelWeights::load(&path), Err(SquiggleError::Weights { .. })));

        fs::write(&path, "[]").unwrap();
        assert!(matches!(ModelWeights::load(&path), Err(SquiggleError::Weights { .. })));
    }
}
