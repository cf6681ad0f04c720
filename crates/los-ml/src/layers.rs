// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Layers
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Dense building blocks: linear map, dropout, layer normalisation.

use los_math::norm::layer_norm_rows;
use los_types::constants::NORM_EPS;
use los_types::error::{LosError, LosResult};
use ndarray::{Array, Array1, Array2, Dimension};
use rand::rngs::StdRng;
use rand::Rng;

/// Affine map `x W + b` applied to each row.
#[derive(Debug, Clone)]
pub struct Linear {
    weight: Array2<f64>, // (in_features, out_features)
    bias: Array1<f64>,   // (out_features,)
}

impl Linear {
    /// Uniform init in ±1/sqrt(fan_in) for weights and bias.
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = if in_features > 0 {
            1.0 / (in_features as f64).sqrt()
        } else {
            0.0
        };
        Linear {
            weight: Array2::from_shape_fn((in_features, out_features), |_| {
                (rng.gen::<f64>() - 0.5) * 2.0 * bound
            }),
            bias: Array1::from_shape_fn(out_features, |_| (rng.gen::<f64>() - 0.5) * 2.0 * bound),
        }
    }

    /// Build from explicit parameters.
    #[cfg(test)]
    pub(crate) fn from_parts(weight: Array2<f64>, bias: Array1<f64>) -> LosResult<Self> {
        if weight.ncols() != bias.len() {
            return Err(LosError::ShapeMismatch(format!(
                "linear weight has {} outputs but bias has {}",
                weight.ncols(),
                bias.len()
            )));
        }
        Ok(Linear { weight, bias })
    }

    pub fn in_features(&self) -> usize {
        self.weight.nrows()
    }

    /// Forward: (n, in_features) → (n, out_features).
    pub fn forward(&self, x: &Array2<f64>) -> LosResult<Array2<f64>> {
        if x.ncols() != self.in_features() {
            return Err(LosError::ShapeMismatch(format!(
                "linear layer expects {} input features, got {}",
                self.in_features(),
                x.ncols()
            )));
        }
        Ok(x.dot(&self.weight) + &self.bias)
    }
}

/// Inverted dropout. Inactive when no RNG is supplied (evaluation mode).
#[derive(Debug, Clone, Copy)]
pub struct Dropout {
    p: f64,
}

impl Dropout {
    pub fn new(p: f64) -> Self {
        Dropout { p }
    }

    pub fn apply<D: Dimension>(&self, x: Array<f64, D>, rng: Option<&mut StdRng>) -> Array<f64, D> {
        match rng {
            Some(rng) if self.p > 0.0 => {
                let keep = 1.0 - self.p;
                x.mapv_into(|v| if rng.gen::<f64>() < keep { v / keep } else { 0.0 })
            }
            _ => x,
        }
    }
}

/// Layer normalisation with learned gain and bias.
#[derive(Debug, Clone)]
pub struct LayerNorm {
    gamma: Array1<f64>,
    beta: Array1<f64>,
}

impl LayerNorm {
    pub fn new(width: usize) -> Self {
        LayerNorm {
            gamma: Array1::ones(width),
            beta: Array1::zeros(width),
        }
    }

    pub fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        layer_norm_rows(x, &self.gamma, &self.beta, NORM_EPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    #[test]
    fn test_linear_forward_known_weights() {
        let lin = Linear::from_parts(array![[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]], array![0.5, -0.5])
            .unwrap();
        let out = lin.forward(&array![[1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(out, array![[4.5, 6.5]]);
    }

    #[test]
    fn test_linear_rejects_wrong_width() {
        let mut rng = StdRng::seed_from_u64(7);
        let lin = Linear::new(4, 3, &mut rng);
        let err = lin.forward(&Array2::zeros((2, 5))).unwrap_err();
        assert!(matches!(err, LosError::ShapeMismatch(_)));
    }

    #[test]
    fn test_linear_init_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let lin = Linear::new(16, 8, &mut rng);
        let bound = 0.25;
        assert!(lin.weight.iter().all(|w| w.abs() <= bound));
        assert!(lin.bias.iter().all(|b| b.abs() <= bound));
    }

    #[test]
    fn test_from_parts_rejects_bias_mismatch() {
        assert!(Linear::from_parts(Array2::zeros((2, 3)), Array1::zeros(2)).is_err());
    }

    #[test]
    fn test_dropout_eval_is_identity() {
        let drop = Dropout::new(0.9);
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(drop.apply(x.clone(), None), x);
    }

    #[test]
    fn test_dropout_train_scales_survivors() {
        let drop = Dropout::new(0.5);
        let mut rng = StdRng::seed_from_u64(3);
        let out = drop.apply(Array1::from_elem(1000, 1.0), Some(&mut rng));
        assert!(out.iter().all(|&v| v == 0.0 || v == 2.0));
        let kept = out.iter().filter(|&&v| v > 0.0).count();
        assert!(kept > 400 && kept < 600, "kept {kept}");
    }

    #[test]
    fn test_layer_norm_initial_identity_affine() {
        let ln = LayerNorm::new(3);
        let out = ln.forward(&array![[1.0, 2.0, 3.0]]);
        assert!(out.row(0).sum().abs() < 1e-12);
    }
}
