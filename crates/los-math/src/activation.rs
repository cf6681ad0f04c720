// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Activations
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Element-wise activations.

use ndarray::{Array, Dimension};

pub fn relu(x: f64) -> f64 {
    x.max(0.0)
}

/// ReLU over a whole array, consuming it.
pub fn relu_array<D: Dimension>(x: Array<f64, D>) -> Array<f64, D> {
    x.mapv_into(relu)
}

/// Hard floor/ceiling. NaN maps to the floor so the result is always in `[lo, hi]`.
pub fn hard_clamp(x: f64, lo: f64, hi: f64) -> f64 {
    if x.is_nan() {
        lo
    } else {
        x.clamp(lo, hi)
    }
}
