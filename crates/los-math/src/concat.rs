// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Concatenation
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use ndarray::{concatenate, Array2, ArrayView2, Axis};

/// Concatenate along columns the blocks that are present, keeping their order.
///
/// Returns `None` when no block is present or the row counts disagree.
pub fn concat_present(blocks: &[Option<ArrayView2<'_, f64>>]) -> Option<Array2<f64>> {
    let present: Vec<ArrayView2<'_, f64>> = blocks.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    concatenate(Axis(1), &present).ok()
}
