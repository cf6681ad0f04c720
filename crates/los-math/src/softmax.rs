// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Softmax
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Row-wise softmax tolerant of `-inf` (masked) entries.

use ndarray::{Array2, Zip};

/// Softmax per row. Entries equal to `-inf` receive exactly zero probability.
/// A row with no finite entry becomes all zeros instead of NaN.
pub fn softmax_rows(scores: &Array2<f64>) -> Array2<f64> {
    let mut attn = Array2::zeros(scores.raw_dim());
    Zip::from(attn.rows_mut())
        .and(scores.rows())
        .for_each(|mut out, row| {
            let max_val = row.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
            if max_val == f64::NEG_INFINITY {
                return;
            }
            out.assign(&row.mapv(|v| (v - max_val).exp()));
            let sum = out.sum();
            out /= sum;
        });
    attn
}
