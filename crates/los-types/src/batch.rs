// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Batch
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use ndarray::{s, Array2, Array3, ArrayView2};

use crate::constants::{EXTRA_TIME_CHANNELS, VALIDITY_WINDOW};
use crate::error::{LosError, LosResult};

/// One padded batch of admissions as produced by the data pipeline.
#[derive(Debug, Clone)]
pub struct Batch {
    pub timeseries: Array3<f64>, // [B, 2F + 2, T]
    pub diagnoses: Array2<f64>,  // [B, D]
    pub flat: Array2<f64>,       // [B, S]
    pub labels: Array2<f64>,     // [B, T] remaining LOS in days
    pub mask: Array2<bool>,      // [B, T] true on real timesteps
    pub seq_lengths: Vec<usize>, // [B]
}

impl Batch {
    pub fn batch_size(&self) -> usize {
        self.timeseries.dim().0
    }

    pub fn timesteps(&self) -> usize {
        self.timeseries.dim().2
    }

    /// F, the number of measured features (each paired with a presence mask).
    pub fn feature_count(&self) -> usize {
        self.timeseries.dim().1.saturating_sub(EXTRA_TIME_CHANNELS) / 2
    }

    /// Check that every tensor agrees on B and T.
    pub fn validate(&self) -> LosResult<()> {
        let (b, t) = (self.batch_size(), self.timesteps());
        let c = self.timeseries.dim().1;
        if c < EXTRA_TIME_CHANNELS || (c - EXTRA_TIME_CHANNELS) % 2 != 0 {
            return Err(LosError::ShapeMismatch(format!(
                "time series has {c} channels, expected 2F + {EXTRA_TIME_CHANNELS}"
            )));
        }
        let rows = [
            ("diagnoses", self.diagnoses.nrows()),
            ("flat", self.flat.nrows()),
            ("labels", self.labels.nrows()),
            ("mask", self.mask.nrows()),
            ("seq_lengths", self.seq_lengths.len()),
        ];
        for (name, n) in rows {
            if n != b {
                return Err(LosError::ShapeMismatch(format!(
                    "{name} has batch size {n}, time series has {b}"
                )));
            }
        }
        if self.labels.ncols() != t || self.mask.ncols() != t {
            return Err(LosError::ShapeMismatch(format!(
                "labels/mask have {}/{} timesteps, time series has {t}",
                self.labels.ncols(),
                self.mask.ncols()
            )));
        }
        if let Some(&len) = self.seq_lengths.iter().find(|&&len| len > t) {
            return Err(LosError::ShapeMismatch(format!(
                "sequence length {len} exceeds padded length {t}"
            )));
        }
        Ok(())
    }

    /// Targets aligned with the model's predictions: `labels[:, 5..]`.
    pub fn prediction_targets(&self) -> ArrayView2<'_, f64> {
        let start = VALIDITY_WINDOW.min(self.labels.ncols());
        self.labels.slice(s![.., start..])
    }

    /// Validity mask aligned with the model's predictions: `mask[:, 5..]`.
    pub fn prediction_mask(&self) -> ArrayView2<'_, bool> {
        let start = VALIDITY_WINDOW.min(self.mask.ncols());
        self.mask.slice(s![.., start..])
    }

    /// Per-sequence count of timesteps that carry a prediction.
    pub fn prediction_lengths(&self) -> Vec<usize> {
        self.seq_lengths
            .iter()
            .map(|len| len.saturating_sub(VALIDITY_WINDOW))
            .collect()
    }
}
