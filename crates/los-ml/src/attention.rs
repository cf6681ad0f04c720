// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Causal Attention
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Causally-masked multi-head self-attention over one sequence.

use los_math::softmax::softmax_rows;
use los_types::error::{LosError, LosResult};
use ndarray::{s, Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;

use crate::layers::{Dropout, Linear};

/// Additive (T, T) mask: 0 where key j ≤ query i, -inf otherwise.
pub fn causal_mask(t: usize) -> Array2<f64> {
    Array2::from_shape_fn((t, t), |(i, j)| if j <= i { 0.0 } else { f64::NEG_INFINITY })
}

/// Multi-head self-attention layer with biased in/out projections.
#[derive(Debug, Clone)]
pub struct MultiHeadAttention {
    w_q: Linear,
    w_k: Linear,
    w_v: Linear,
    w_o: Linear,
    n_heads: usize,
    d_head: usize,
    dropout: Dropout,
}

impl MultiHeadAttention {
    pub fn new<R: Rng + ?Sized>(
        d_model: usize,
        n_heads: usize,
        dropout: f64,
        rng: &mut R,
    ) -> LosResult<Self> {
        if n_heads == 0 || d_model % n_heads != 0 {
            return Err(LosError::ConfigError(format!(
                "d_model ({d_model}) must be divisible by n_heads ({n_heads})"
            )));
        }
        Ok(MultiHeadAttention {
            w_q: Linear::new(d_model, d_model, rng),
            w_k: Linear::new(d_model, d_model, rng),
            w_v: Linear::new(d_model, d_model, rng),
            w_o: Linear::new(d_model, d_model, rng),
            n_heads,
            d_head: d_model / n_heads,
            dropout: Dropout::new(dropout),
        })
    }

    /// Attention probabilities per head, each (T, T), evaluation mode.
    pub fn probabilities(&self, x: &Array2<f64>, mask: &Array2<f64>) -> LosResult<Vec<Array2<f64>>> {
        let q_all = self.w_q.forward(x)?;
        let k_all = self.w_k.forward(x)?;
        (0..self.n_heads)
            .map(|h| self.head_probabilities(&q_all, &k_all, h, mask))
            .collect()
    }

    /// Forward: x (T, d_model) → (T, d_model).
    pub fn forward(
        &self,
        x: &Array2<f64>,
        mask: &Array2<f64>,
        mut rng: Option<&mut StdRng>,
    ) -> LosResult<Array2<f64>> {
        let q_all = self.w_q.forward(x)?;
        let k_all = self.w_k.forward(x)?;
        let v_all = self.w_v.forward(x)?;

        let mut heads_out = Array2::zeros(q_all.raw_dim());
        for h in 0..self.n_heads {
            let probs = self.head_probabilities(&q_all, &k_all, h, mask)?;
            let probs = self.dropout.apply(probs, rng.as_deref_mut());
            let (start, end) = self.head_range(h);
            let head = probs.dot(&v_all.slice(s![.., start..end]));
            heads_out.slice_mut(s![.., start..end]).assign(&head);
        }

        self.w_o.forward(&heads_out)
    }

    fn head_range(&self, h: usize) -> (usize, usize) {
        let start = h * self.d_head;
        (start, start + self.d_head)
    }

    /// softmax(Q_h K_hᵀ / sqrt(d_head) + mask).
    fn head_probabilities(
        &self,
        q_all: &Array2<f64>,
        k_all: &Array2<f64>,
        h: usize,
        mask: &Array2<f64>,
    ) -> LosResult<Array2<f64>> {
        let t = q_all.len_of(Axis(0));
        if mask.dim() != (t, t) {
            return Err(LosError::ShapeMismatch(format!(
                "attention mask is {:?}, expected ({t}, {t})",
                mask.dim()
            )));
        }
        let (start, end) = self.head_range(h);
        let scale = 1.0 / (self.d_head as f64).sqrt();
        let q = q_all.slice(s![.., start..end]);
        let k = k_all.slice(s![.., start..end]);
        let scores = q.dot(&k.t()) * scale + mask;
        Ok(softmax_rows(&scores))
    }
}
