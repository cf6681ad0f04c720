// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Batch Normalisation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Fusion-head normalisation stages.
//!
//! A stage is either the identity or a 1D batch norm over the rows of a
//! (N, C) matrix. The batch norm comes in two flavours: the standard one
//! switches to running statistics in evaluation, the batch-statistics one
//! always normalises with the current batch.

use los_math::norm::{column_moments, ColumnMoments};
use los_types::config::NormKind;
use los_types::constants::NORM_EPS;
use los_types::error::{LosError, LosResult};
use ndarray::{Array1, Array2};

#[derive(Debug, Clone)]
pub struct BatchNorm1d {
    gamma: Array1<f64>,
    beta: Array1<f64>,
    running_mean: Array1<f64>,
    running_var: Array1<f64>,
    momentum: f64,
    batch_stats_in_eval: bool,
}

impl BatchNorm1d {
    pub fn new(width: usize, momentum: f64, batch_stats_in_eval: bool) -> Self {
        BatchNorm1d {
            gamma: Array1::ones(width),
            beta: Array1::zeros(width),
            running_mean: Array1::zeros(width),
            running_var: Array1::ones(width),
            momentum,
            batch_stats_in_eval,
        }
    }

    #[cfg(test)]
    pub(crate) fn running_mean(&self) -> &Array1<f64> {
        &self.running_mean
    }

    #[cfg(test)]
    pub(crate) fn running_var(&self) -> &Array1<f64> {
        &self.running_var
    }

    /// Normalise `x`. In training the batch moments are returned so the
    /// caller can fold them into the running statistics afterwards.
    pub fn forward(
        &self,
        x: Array2<f64>,
        training: bool,
    ) -> LosResult<(Array2<f64>, Option<ColumnMoments>)> {
        if x.ncols() != self.gamma.len() {
            return Err(LosError::ShapeMismatch(format!(
                "batch norm expects {} features, got {}",
                self.gamma.len(),
                x.ncols()
            )));
        }
        if !training && !self.batch_stats_in_eval {
            let out = self.normalise(x, &self.running_mean, &self.running_var);
            return Ok((out, None));
        }
        let moments = column_moments(&x)
            .ok_or_else(|| LosError::ShapeMismatch("batch norm over an empty batch".to_string()))?;
        let out = self.normalise(x, &moments.mean, &moments.var);
        Ok((out, training.then_some(moments)))
    }

    /// Exponential moving average of the batch moments (unbiased variance).
    pub fn update_running(&mut self, moments: &ColumnMoments) {
        let m = self.momentum;
        self.running_mean = &self.running_mean * (1.0 - m) + &moments.mean * m;
        self.running_var = &self.running_var * (1.0 - m) + &moments.unbiased_var * m;
    }

    fn normalise(&self, x: Array2<f64>, mean: &Array1<f64>, var: &Array1<f64>) -> Array2<f64> {
        let scale = &self.gamma / &var.mapv(|v| (v + NORM_EPS).sqrt());
        (x - mean) * &scale + &self.beta
    }
}

/// Closed set of normalisation stages.
#[derive(Debug, Clone)]
pub enum NormStage {
    Identity,
    Batch(BatchNorm1d),
}

impl NormStage {
    pub fn new(kind: NormKind, width: usize, momentum: f64) -> Self {
        match kind {
            NormKind::Identity => NormStage::Identity,
            NormKind::Standard => NormStage::Batch(BatchNorm1d::new(width, momentum, false)),
            NormKind::BatchStatistics => NormStage::Batch(BatchNorm1d::new(width, momentum, true)),
        }
    }

    pub fn forward(
        &self,
        x: Array2<f64>,
        training: bool,
    ) -> LosResult<(Array2<f64>, Option<ColumnMoments>)> {
        match self {
            NormStage::Identity => Ok((x, None)),
            NormStage::Batch(bn) => bn.forward(x, training),
        }
    }

    pub fn update_running(&mut self, moments: &ColumnMoments) {
        if let NormStage::Batch(bn) = self {
            bn.update_running(moments);
        }
    }

    #[cfg(test)]
    pub(crate) fn is_identity(&self) -> bool {
        matches!(self, NormStage::Identity)
    }
}
