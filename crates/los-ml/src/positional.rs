// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Positional Encoding
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Fixed sinusoidal position signal (Vaswani et al. 2017, section 3.5).
//!
//! Channel c at position pos holds sin(pos / 10000^(2i/d_model)) for even c
//! and cos of the same argument for odd c, with i = c / 2.

use los_types::constants::POSITIONAL_BASE;
use los_types::error::{LosError, LosResult};
use ndarray::{s, Array2, Array3, ArrayView2};

/// Precomputed table, stored as (d_model, max_len) and broadcast over batch.
#[derive(Debug, Clone)]
pub struct PositionalEncoder {
    table: Array2<f64>,
}

impl PositionalEncoder {
    pub fn new(d_model: usize, max_len: usize) -> Self {
        let log_base = POSITIONAL_BASE.ln();
        let table = Array2::from_shape_fn((d_model, max_len), |(c, pos)| {
            let two_i = (c - c % 2) as f64;
            let angle = pos as f64 * (-two_i * log_base / d_model as f64).exp();
            if c % 2 == 0 {
                angle.sin()
            } else {
                angle.cos()
            }
        });
        PositionalEncoder { table }
    }

    pub fn d_model(&self) -> usize {
        self.table.nrows()
    }

    pub fn max_len(&self) -> usize {
        self.table.ncols()
    }

    /// The first `t` columns of the table.
    pub fn signal(&self, t: usize) -> LosResult<ArrayView2<'_, f64>> {
        self.check_len(t)?;
        Ok(self.table.slice(s![.., ..t]))
    }

    /// X (B, d_model, T) → X + table[:, :T], broadcast over B.
    pub fn add(&self, x: &Array3<f64>) -> LosResult<Array3<f64>> {
        let (_, d, t) = x.dim();
        self.check_width(d)?;
        Ok(x + &self.signal(t)?)
    }

    fn check_len(&self, t: usize) -> LosResult<()> {
        if t > self.max_len() {
            return Err(LosError::SequenceTooLong {
                len: t,
                max_len: self.max_len(),
            });
        }
        Ok(())
    }

    fn check_width(&self, d: usize) -> LosResult<()> {
        if d != self.d_model() {
            return Err(LosError::ShapeMismatch(format!(
                "positional encoder has width {}, input has {d} channels",
                self.d_model()
            )));
        }
        Ok(())
    }
}
