// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Causal Sequence Encoder
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Transformer encoder over the irregular time series.
//!
//! Input (B, 2F + 2, T) is embedded per timestep (a width-1 convolution),
//! scaled by sqrt(d_model), shifted by the positional signal and passed
//! through N post-norm encoder layers with a causal attention mask, so the
//! output at time t only depends on inputs at times 0..=t.

use los_math::activation::relu_array;
use los_types::config::ModelConfig;
use los_types::error::{LosError, LosResult};
use ndarray::{Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::attention::{causal_mask, MultiHeadAttention};
use crate::layers::{Dropout, LayerNorm, Linear};
use crate::positional::PositionalEncoder;

/// Single encoder layer: attention and feed-forward sublayers, each with
/// dropout, a residual connection and layer norm.
#[derive(Debug, Clone)]
pub struct EncoderLayer {
    attn: MultiHeadAttention,
    linear1: Linear,
    linear2: Linear,
    norm1: LayerNorm,
    norm2: LayerNorm,
    dropout: Dropout,
}

impl EncoderLayer {
    pub fn new<R: Rng + ?Sized>(
        d_model: usize,
        n_heads: usize,
        feedforward_size: usize,
        dropout: f64,
        rng: &mut R,
    ) -> LosResult<Self> {
        Ok(EncoderLayer {
            attn: MultiHeadAttention::new(d_model, n_heads, dropout, rng)?,
            linear1: Linear::new(d_model, feedforward_size, rng),
            linear2: Linear::new(feedforward_size, d_model, rng),
            norm1: LayerNorm::new(d_model),
            norm2: LayerNorm::new(d_model),
            dropout: Dropout::new(dropout),
        })
    }

    /// Forward: (T, d_model) → (T, d_model).
    pub fn forward(
        &self,
        x: &Array2<f64>,
        mask: &Array2<f64>,
        mut rng: Option<&mut StdRng>,
    ) -> LosResult<Array2<f64>> {
        let attn_out = self.attn.forward(x, mask, rng.as_deref_mut())?;
        let attn_out = self.dropout.apply(attn_out, rng.as_deref_mut());
        let post_attn = self.norm1.forward(&(x + &attn_out));

        let hidden = relu_array(self.linear1.forward(&post_attn)?);
        let hidden = self.dropout.apply(hidden, rng.as_deref_mut());
        let ff_out = self.linear2.forward(&hidden)?;
        let ff_out = self.dropout.apply(ff_out, rng.as_deref_mut());
        Ok(self.norm2.forward(&(&post_attn + &ff_out)))
    }
}

#[derive(Debug, Clone)]
pub struct CausalSequenceEncoder {
    input_embedding: Linear,
    positional: PositionalEncoder,
    layers: Vec<EncoderLayer>,
    d_model: usize,
}

impl CausalSequenceEncoder {
    pub fn new<R: Rng + ?Sized>(
        input_channels: usize,
        config: &ModelConfig,
        rng: &mut R,
    ) -> LosResult<Self> {
        let input_embedding = Linear::new(input_channels, config.d_model, rng);
        let layers = (0..config.n_layers)
            .map(|_| {
                EncoderLayer::new(
                    config.d_model,
                    config.n_heads,
                    config.feedforward_size,
                    config.trans_dropout_rate,
                    rng,
                )
            })
            .collect::<LosResult<Vec<_>>>()?;

        Ok(CausalSequenceEncoder {
            input_embedding,
            positional: PositionalEncoder::new(config.d_model, config.max_len),
            layers,
            d_model: config.d_model,
        })
    }

    fn max_len(&self) -> usize {
        self.positional.max_len()
    }

    /// Evaluation-mode encode: X (B, 2F + 2, T) → (B, d_model, T).
    pub fn encode(&self, x: &Array3<f64>, t: usize) -> LosResult<Array3<f64>> {
        let seeds = vec![None; x.len_of(Axis(0))];
        self.encode_with(x, t, seeds)
    }

    /// Training-mode encode: dropout active, one RNG stream per sequence.
    pub fn encode_train(&self, x: &Array3<f64>, t: usize, rng: &mut StdRng) -> LosResult<Array3<f64>> {
        let seeds = (0..x.len_of(Axis(0))).map(|_| Some(rng.gen::<u64>())).collect();
        self.encode_with(x, t, seeds)
    }

    /// Per-layer, per-head (T, T) attention probabilities for one sequence
    /// given as (2F + 2, T), evaluation mode.
    pub fn attention_probabilities(&self, x: &Array2<f64>) -> LosResult<Vec<Vec<Array2<f64>>>> {
        let mask = causal_mask(x.ncols());
        let embedded = self.embed(&x.view().insert_axis(Axis(0)).to_owned())?;
        let mut h = embedded.index_axis(Axis(0), 0).t().to_owned();
        let mut maps = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            maps.push(layer.attn.probabilities(&h, &mask)?);
            h = layer.forward(&h, &mask, None)?;
        }
        Ok(maps)
    }

    fn encode_with(&self, x: &Array3<f64>, t: usize, seeds: Vec<Option<u64>>) -> LosResult<Array3<f64>> {
        let (b, _, steps) = x.dim();
        if steps != t {
            return Err(LosError::ShapeMismatch(format!(
                "time series has {steps} timesteps, caller declared {t}"
            )));
        }
        if t > self.max_len() {
            return Err(LosError::SequenceTooLong {
                len: t,
                max_len: self.max_len(),
            });
        }

        let mask = causal_mask(t);
        let embedded = self.embed(x)?;
        let encoded = seeds
            .into_par_iter()
            .enumerate()
            .map(|(i, seed)| {
                let mut rng = seed.map(StdRng::seed_from_u64);
                let rows = embedded.index_axis(Axis(0), i).t().to_owned();
                self.encode_sequence(rows, &mask, rng.as_mut())
            })
            .collect::<LosResult<Vec<_>>>()?;

        let mut out = Array3::zeros((b, self.d_model, t));
        for (mut slot, seq) in out.outer_iter_mut().zip(encoded.iter()) {
            slot.assign(&seq.t());
        }
        Ok(out)
    }

    /// Channel projection, sqrt(d_model) scaling and positional signal:
    /// (B, C, T) → (B, d_model, T).
    fn embed(&self, x: &Array3<f64>) -> LosResult<Array3<f64>> {
        let (b, _, t) = x.dim();
        let scale = (self.d_model as f64).sqrt();
        let mut projected = Array3::zeros((b, self.d_model, t));
        for (mut slot, seq) in projected.outer_iter_mut().zip(x.outer_iter()) {
            let rows = self.input_embedding.forward(&seq.t().to_owned())?;
            slot.assign(&(rows * scale).t());
        }
        self.positional.add(&projected)
    }

    fn encode_sequence(
        &self,
        mut h: Array2<f64>,
        mask: &Array2<f64>,
        mut rng: Option<&mut StdRng>,
    ) -> LosResult<Array2<f64>> {
        for (depth, layer) in self.layers.iter().enumerate() {
            h = layer.forward(&h, mask, rng.as_deref_mut())?;
            tracing::trace!(depth, steps = h.nrows(), "encoder layer done");
        }
        Ok(h)
    }
}
