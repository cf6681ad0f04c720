// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Masked Sequence Loss
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! MSE / MSLE over ragged, padded sequences.
//!
//! Two reductions: `sum_losses = true` averages over every valid element of
//! the batch; `sum_losses = false` averages each sequence over its own valid
//! length first, then averages the sequences, so short and long stays weigh
//! the same.

use los_types::config::LossKind;
use los_types::error::{LosError, LosResult};
use ndarray::{ArrayView2, Zip};

/// Error of one (prediction, target) pair.
pub fn element_error(kind: LossKind, y_hat: f64, y: f64) -> LosResult<f64> {
    match kind {
        LossKind::Mse => Ok((y_hat - y).powi(2)),
        LossKind::Msle => {
            if !(y_hat > 0.0 && y > 0.0) {
                return Err(LosError::NumericDomain(format!(
                    "msle needs positive values, got prediction {y_hat} and target {y}"
                )));
            }
            Ok((y_hat.ln() - y.ln()).powi(2))
        }
    }
}

/// Scalar loss over (B, T') predictions and targets.
pub fn masked_sequence_loss(
    y_hat: ArrayView2<'_, f64>,
    y: ArrayView2<'_, f64>,
    mask: ArrayView2<'_, bool>,
    seq_lengths: &[usize],
    sum_losses: bool,
    kind: LossKind,
) -> LosResult<f64> {
    if y_hat.dim() != y.dim() || y_hat.dim() != mask.dim() {
        return Err(LosError::ShapeMismatch(format!(
            "predictions {:?}, targets {:?} and mask {:?} must agree",
            y_hat.dim(),
            y.dim(),
            mask.dim()
        )));
    }
    let b = y_hat.nrows();
    if seq_lengths.len() != b {
        return Err(LosError::ShapeMismatch(format!(
            "{} sequence lengths for a batch of {b}",
            seq_lengths.len()
        )));
    }
    if b == 0 {
        return Ok(0.0);
    }

    let mut per_sequence = Vec::with_capacity(b);
    let mut valid_count = 0usize;
    for ((pred_row, target_row), mask_row) in y_hat.rows().into_iter().zip(y.rows()).zip(mask.rows()) {
        let mut total = 0.0;
        let mut first_err = None;
        Zip::from(&pred_row)
            .and(&target_row)
            .and(&mask_row)
            .for_each(|&p, &t, &m| {
                if !m || first_err.is_some() {
                    return;
                }
                match element_error(kind, p, t) {
                    Ok(e) => {
                        total += e;
                        valid_count += 1;
                    }
                    Err(err) => first_err = Some(err),
                }
            });
        if let Some(err) = first_err {
            return Err(err);
        }
        per_sequence.push(total);
    }

    let loss = if sum_losses {
        if valid_count == 0 {
            0.0
        } else {
            per_sequence.iter().sum::<f64>() / valid_count as f64
        }
    } else {
        per_sequence
            .iter()
            .zip(seq_lengths)
            .map(|(total, &len)| total / len.max(1) as f64)
            .sum::<f64>()
            / b as f64
    };

    tracing::debug!(
        batch = b,
        valid = valid_count,
        sum_losses,
        kind = kind.as_str(),
        loss,
        "masked sequence loss"
    );
    Ok(loss)
}
