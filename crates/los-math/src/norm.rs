// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Normalisation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Layer normalisation and per-column moments for batch normalisation.

use ndarray::{Array1, Array2, Axis};

/// Layer normalisation over the last dimension of each row, followed by
/// the affine `gamma * x_hat + beta`.
pub fn layer_norm_rows(
    x: &Array2<f64>,
    gamma: &Array1<f64>,
    beta: &Array1<f64>,
    eps: f64,
) -> Array2<f64> {
    let mut out = x.clone();
    for mut row in out.rows_mut() {
        let n = row.len() as f64;
        let mean = row.sum() / n;
        let var = row.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = (var + eps).sqrt();
        row.mapv_inplace(|v| (v - mean) / std);
        row *= gamma;
        row += beta;
    }
    out
}

/// Mean and variance of each column over the rows of a batch.
#[derive(Debug, Clone)]
pub struct ColumnMoments {
    pub mean: Array1<f64>,
    /// Biased (1/n) variance, used to normalise.
    pub var: Array1<f64>,
    /// Unbiased (1/(n-1)) variance, used for running statistics.
    pub unbiased_var: Array1<f64>,
}

/// Returns `None` for an empty batch.
pub fn column_moments(x: &Array2<f64>) -> Option<ColumnMoments> {
    let n = x.nrows();
    let mean = x.mean_axis(Axis(0))?;
    let centered = x - &mean;
    let sq_sum = centered.mapv(|v| v * v).sum_axis(Axis(0));
    let var = &sq_sum / n as f64;
    let unbiased_var = if n > 1 {
        &sq_sum / (n - 1) as f64
    } else {
        var.clone()
    };
    Some(ColumnMoments {
        mean,
        var,
        unbiased_var,
    })
}
