// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Feature Fusion Head
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-timestep fusion of encoder features with static and diagnosis inputs.
//!
//! Encoder output is trimmed to the prediction window and folded into the
//! batch dimension; every retained timestep is concatenated with its
//! sequence's static features and diagnosis encoding, then projected to a
//! single raw score.

use los_math::activation::relu_array;
use los_math::concat::concat_present;
use los_math::norm::ColumnMoments;
use los_types::config::{InputDims, ModelConfig};
use los_types::constants::VALIDITY_WINDOW;
use los_types::error::{LosError, LosResult};
use ndarray::{Array2, Array3, ArrayView2};
use rand::rngs::StdRng;
use rand::Rng;

use crate::batchnorm::NormStage;
use crate::layers::{Dropout, Linear};

/// Raw scores plus the batch moments seen by each normalisation stage
/// (present only in training).
#[derive(Debug, Clone)]
pub struct FusionOutput {
    /// ((B·(T−5)), 1), sequence-major.
    pub raw: Array2<f64>,
    pub diagnosis_moments: Option<ColumnMoments>,
    pub point_moments: Option<ColumnMoments>,
}

#[derive(Debug, Clone)]
pub struct FeatureFusionHead {
    /// Absent when the dataset has no diagnosis columns.
    diagnosis_encoder: Option<Linear>,
    bn_diagnosis: NormStage,
    point: Linear,
    bn_point: NormStage,
    point_final: Linear,
    trans_dropout: Dropout,
    main_dropout: Dropout,
    flat_width: usize,
}

impl FeatureFusionHead {
    pub fn new<R: Rng + ?Sized>(config: &ModelConfig, dims: &InputDims, rng: &mut R) -> Self {
        let momentum = config.batchnorm.momentum();
        let (diagnosis_encoder, diagnosis_width) = if dims.diagnoses > 0 {
            (
                Some(Linear::new(dims.diagnoses, config.diagnosis_size, rng)),
                config.diagnosis_size,
            )
        } else {
            (None, 0)
        };
        let bn_diagnosis = if diagnosis_encoder.is_some() {
            NormStage::new(config.batchnorm.diagnosis_stage(), config.diagnosis_size, momentum)
        } else {
            NormStage::Identity
        };

        let point_in = dims.flat + diagnosis_width + config.d_model;
        FeatureFusionHead {
            diagnosis_encoder,
            bn_diagnosis,
            point: Linear::new(point_in, config.last_linear_size, rng),
            bn_point: NormStage::new(config.batchnorm.point_stage(), config.last_linear_size, momentum),
            point_final: Linear::new(config.last_linear_size, 1, rng),
            trans_dropout: Dropout::new(config.trans_dropout_rate),
            main_dropout: Dropout::new(config.main_dropout_rate),
            flat_width: dims.flat,
        }
    }

    #[cfg(test)]
    pub(crate) fn diagnosis_norm(&self) -> &NormStage {
        &self.bn_diagnosis
    }

    #[cfg(test)]
    pub(crate) fn point_norm(&self) -> &NormStage {
        &self.bn_point
    }

    /// trans_output (B, d_model, T), diagnoses (B, D), flat (B, S)
    /// → raw scores ((B·(T−5)), 1). Training mode when `rng` is given.
    pub fn fuse(
        &self,
        trans_output: &Array3<f64>,
        diagnoses: &Array2<f64>,
        flat: &Array2<f64>,
        mut rng: Option<&mut StdRng>,
    ) -> LosResult<FusionOutput> {
        let training = rng.is_some();
        let (b, d_model, t) = trans_output.dim();
        if t <= VALIDITY_WINDOW {
            return Err(LosError::SequenceTooShort {
                len: t,
                min: VALIDITY_WINDOW,
            });
        }
        if diagnoses.nrows() != b || flat.nrows() != b {
            return Err(LosError::ShapeMismatch(format!(
                "batch of {b} sequences but {} diagnosis rows and {} flat rows",
                diagnoses.nrows(),
                flat.nrows()
            )));
        }
        if flat.ncols() != self.flat_width {
            return Err(LosError::ShapeMismatch(format!(
                "expected {} flat features, got {}",
                self.flat_width,
                flat.ncols()
            )));
        }
        let kept = t - VALIDITY_WINDOW;

        let x_final = relu_array(self.trans_dropout.apply(trans_output.to_owned(), rng.as_deref_mut()));

        let (diagnoses_enc, diagnosis_moments) = match &self.diagnosis_encoder {
            Some(encoder) => {
                let z = encoder.forward(diagnoses)?;
                let (z, moments) = self.bn_diagnosis.forward(z, training)?;
                let z = relu_array(self.main_dropout.apply(z, rng.as_deref_mut()));
                (Some(z), moments)
            }
            None if diagnoses.ncols() > 0 => {
                return Err(LosError::ShapeMismatch(format!(
                    "model built without diagnoses, got {} diagnosis columns",
                    diagnoses.ncols()
                )));
            }
            None => (None, None),
        };

        // ((B·kept), d_model), row r = (sequence r / kept, timestep 5 + r % kept)
        let trimmed = Array2::from_shape_fn((b * kept, d_model), |(r, c)| {
            x_final[[r / kept, c, VALIDITY_WINDOW + r % kept]]
        });
        let flat_rep = repeat_interleave(flat.view(), kept);
        let diagnoses_rep = diagnoses_enc.as_ref().map(|d| repeat_interleave(d.view(), kept));

        let combined = concat_present(&[
            Some(flat_rep.view()),
            diagnoses_rep.as_ref().map(|d| d.view()),
            Some(trimmed.view()),
        ])
        .ok_or_else(|| LosError::ShapeMismatch("fusion blocks disagree on row count".to_string()))?;

        let z = self.point.forward(&combined)?;
        let (z, point_moments) = self.bn_point.forward(z, training)?;
        let last_point = relu_array(self.main_dropout.apply(z, rng.as_deref_mut()));
        let raw = self.point_final.forward(&last_point)?;

        Ok(FusionOutput {
            raw,
            diagnosis_moments,
            point_moments,
        })
    }

    /// Fold the batch moments of a training pass into the running statistics.
    pub fn update_running_stats(&mut self, output: &FusionOutput) {
        if let Some(m) = &output.diagnosis_moments {
            self.bn_diagnosis.update_running(m);
        }
        if let Some(m) = &output.point_moments {
            self.bn_point.update_running(m);
        }
    }
}

/// Repeat each row `times` times, consecutively.
fn repeat_interleave(x: ArrayView2<'_, f64>, times: usize) -> Array2<f64> {
    Array2::from_shape_fn((x.nrows() * times, x.ncols()), |(r, c)| x[[r / times, c]])
}
