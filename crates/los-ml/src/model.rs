// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Model
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Length-of-stay transformer: encoder → fusion head → output transform.

use los_types::batch::Batch;
use los_types::config::{InputDims, LossKind, ModelConfig};
use los_types::constants::VALIDITY_WINDOW;
use los_types::error::{LosError, LosResult};
use ndarray::{Array2, Array3, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::encoder::CausalSequenceEncoder;
use crate::fusion_head::FeatureFusionHead;
use crate::loss::masked_sequence_loss;
use crate::output::OutputTransform;

#[derive(Debug, Clone)]
pub struct LosTransformer {
    config: ModelConfig,
    dims: InputDims,
    encoder: CausalSequenceEncoder,
    head: FeatureFusionHead,
    output: OutputTransform,
}

impl LosTransformer {
    /// Validate the configuration and draw initial weights from `rng`.
    pub fn new<R: Rng + ?Sized>(config: ModelConfig, dims: InputDims, rng: &mut R) -> LosResult<Self> {
        config.validate()?;
        let encoder = CausalSequenceEncoder::new(dims.channels(), &config, rng)?;
        let head = FeatureFusionHead::new(&config, &dims, rng);
        let output = OutputTransform::new(config.no_exp);
        Ok(LosTransformer {
            config,
            dims,
            encoder,
            head,
            output,
        })
    }

    /// Deterministic initialisation from a seed.
    pub fn seeded(config: ModelConfig, dims: InputDims, seed: u64) -> LosResult<Self> {
        Self::new(config, dims, &mut StdRng::seed_from_u64(seed))
    }

    /// Evaluation-mode forward: x (B, 2F + 2, T), diagnoses (B, D),
    /// flat (B, S) → predictions (B, T − 5) in days. Never mutates the model.
    pub fn forward(
        &self,
        x: &Array3<f64>,
        diagnoses: &Array2<f64>,
        flat: &Array2<f64>,
    ) -> LosResult<Array2<f64>> {
        let (b, _, t) = x.dim();
        tracing::debug!(batch = b, steps = t, mode = "eval", "los transformer forward");
        let trans_output = self.encoder.encode(x, t)?;
        let fused = self.head.fuse(&trans_output, diagnoses, flat, None)?;
        self.finish(fused.raw, b, t)
    }

    /// Training-mode forward: dropout active, batch-norm stages use batch
    /// statistics and fold them into their running statistics afterwards.
    pub fn forward_train<R: Rng + ?Sized>(
        &mut self,
        x: &Array3<f64>,
        diagnoses: &Array2<f64>,
        flat: &Array2<f64>,
        rng: &mut R,
    ) -> LosResult<Array2<f64>> {
        let (b, _, t) = x.dim();
        tracing::debug!(batch = b, steps = t, mode = "train", "los transformer forward");
        let mut pass_rng = StdRng::seed_from_u64(rng.gen());
        let trans_output = self.encoder.encode_train(x, t, &mut pass_rng)?;
        let fused = self
            .head
            .fuse(&trans_output, diagnoses, flat, Some(&mut pass_rng))?;
        self.head.update_running_stats(&fused);
        self.finish(fused.raw, b, t)
    }

    /// Evaluation-mode forward over a pipeline batch.
    pub fn forward_batch(&self, batch: &Batch) -> LosResult<Array2<f64>> {
        batch.validate()?;
        if batch.feature_count() != self.dims.features {
            return Err(LosError::ShapeMismatch(format!(
                "model expects {} time series features, batch has {}",
                self.dims.features,
                batch.feature_count()
            )));
        }
        self.forward(&batch.timeseries, &batch.diagnoses, &batch.flat)
    }

    /// Masked loss between predictions and targets, both (B, T − 5).
    pub fn loss(
        &self,
        y_hat: ArrayView2<'_, f64>,
        y: ArrayView2<'_, f64>,
        mask: ArrayView2<'_, bool>,
        seq_lengths: &[usize],
        sum_losses: bool,
        kind: LossKind,
    ) -> LosResult<f64> {
        masked_sequence_loss(y_hat, y, mask, seq_lengths, sum_losses, kind)
    }

    /// Loss against a batch's trimmed targets, using the configured kind
    /// and reduction.
    pub fn configured_loss(&self, y_hat: ArrayView2<'_, f64>, batch: &Batch) -> LosResult<f64> {
        let lengths = batch.prediction_lengths();
        self.loss(
            y_hat,
            batch.prediction_targets(),
            batch.prediction_mask(),
            &lengths,
            self.config.sum_losses,
            self.config.loss,
        )
    }

    fn finish(&self, raw: Array2<f64>, b: usize, t: usize) -> LosResult<Array2<f64>> {
        let raw = raw
            .into_shape((b, t - VALIDITY_WINDOW))
            .map_err(|e| LosError::ShapeMismatch(format!("cannot reshape raw scores: {e}")))?;
        Ok(self.output.transform(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use los_types::config::BatchNormMode;
    use los_types::constants::{MAX_LOS_DAYS, MIN_LOS_DAYS};

    fn small_config() -> ModelConfig {
        ModelConfig {
            d_model: 8,
            n_layers: 1,
            n_heads: 2,
            feedforward_size: 16,
            diagnosis_size: 6,
            last_linear_size: 5,
            ..ModelConfig::default()
        }
    }

    fn dims() -> InputDims {
        InputDims {
            features: 3,
            diagnoses: 5,
            flat: 4,
        }
    }

    fn inputs(b: usize, t: usize) -> (Array3<f64>, Array2<f64>, Array2<f64>) {
        (
            Array3::from_shape_fn((b, 8, t), |(i, c, k)| ((i * 5 + c * 2 + k) as f64 * 0.21).sin()),
            Array2::from_shape_fn((b, 5), |(i, j)| ((i + j) % 3 == 0) as u8 as f64),
            Array2::from_shape_fn((b, 4), |(i, j)| (i as f64 - j as f64) * 0.25),
        )
    }

    #[test]
    fn test_end_to_end_shape() {
        let model = LosTransformer::seeded(small_config(), dims(), 0).unwrap();
        let (x, d, f) = inputs(2, 7);
        let preds = model.forward(&x, &d, &f).unwrap();
        assert_eq!(preds.dim(), (2, 2));
        assert!(preds
            .iter()
            .all(|p| (MIN_LOS_DAYS..=MAX_LOS_DAYS).contains(p)));
    }

    #[test]
    fn test_forward_is_deterministic() {
        let model = LosTransformer::seeded(small_config(), dims(), 1).unwrap();
        let (x, d, f) = inputs(3, 12);
        assert_eq!(model.forward(&x, &d, &f).unwrap(), model.forward(&x, &d, &f).unwrap());
    }

    #[test]
    fn test_seeded_construction_reproducible() {
        let a = LosTransformer::seeded(small_config(), dims(), 9).unwrap();
        let b = LosTransformer::seeded(small_config(), dims(), 9).unwrap();
        let (x, d, f) = inputs(2, 8);
        assert_eq!(a.forward(&x, &d, &f).unwrap(), b.forward(&x, &d, &f).unwrap());
    }

    #[test]
    fn test_train_updates_default_batchnorm_only_in_train() {
        let config = ModelConfig {
            batchnorm: BatchNormMode::Default,
            ..small_config()
        };
        let mut model = LosTransformer::seeded(config, dims(), 2).unwrap();
        let (x, d, f) = inputs(4, 10);
        let before = model.forward(&x, &d, &f).unwrap();
        assert_eq!(before, model.forward(&x, &d, &f).unwrap());

        let mut rng = StdRng::seed_from_u64(17);
        let trained = model.forward_train(&x, &d, &f, &mut rng).unwrap();
        assert_eq!(trained.dim(), (4, 5));

        let after = model.forward(&x, &d, &f).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_forward_train_reproducible_for_seed() {
        let model = LosTransformer::seeded(small_config(), dims(), 3).unwrap();
        let (x, d, f) = inputs(2, 9);
        let mut m1 = model.clone();
        let mut m2 = model;
        let a = m1.forward_train(&x, &d, &f, &mut StdRng::seed_from_u64(4)).unwrap();
        let b = m2.forward_train(&x, &d, &f, &mut StdRng::seed_from_u64(4)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_exp_bounds() {
        let config = ModelConfig {
            no_exp: true,
            ..small_config()
        };
        let model = LosTransformer::seeded(config, dims(), 5).unwrap();
        let (x, d, f) = inputs(2, 10);
        let preds = model.forward(&x, &d, &f).unwrap();
        assert!(preds
            .iter()
            .all(|p| (MIN_LOS_DAYS..=MAX_LOS_DAYS).contains(p)));
    }

    fn perturb_last_step(x: &Array3<f64>) -> Array3<f64> {
        let mut y = x.clone();
        let last = y.dim().2 - 1;
        for c in 0..y.dim().1 {
            y[[0, c, last]] += 3.0;
        }
        y
    }

    #[test]
    fn test_predictions_are_causal() {
        for mode in [BatchNormMode::None, BatchNormMode::Default] {
            let config = ModelConfig {
                batchnorm: mode,
                ..small_config()
            };
            let model = LosTransformer::seeded(config, dims(), 6).unwrap();
            let (x, d, f) = inputs(1, 12);
            let a = model.forward(&x, &d, &f).unwrap();
            let b = model.forward(&perturb_last_step(&x), &d, &f).unwrap();
            for k in 0..6 {
                assert!((a[[0, k]] - b[[0, k]]).abs() < 1e-12, "{mode} leaked at {k}");
            }
        }
    }

    #[test]
    fn test_batch_statistics_couple_timesteps() {
        // Point-stage moments pool all rows, so a later step shifts earlier predictions.
        let model = LosTransformer::seeded(ModelConfig::default(), dims(), 6).unwrap();
        let (x, d, f) = (
            Array3::from_shape_fn((1, 8, 12), |(_, c, k)| ((c * 2 + k) as f64 * 0.21).sin()),
            Array2::from_shape_fn((1, 5), |(_, j)| (j % 2) as f64),
            Array2::from_shape_fn((1, 4), |(_, j)| j as f64 * 0.25),
        );
        assert_eq!(model.config.batchnorm, BatchNormMode::MyBatchNorm);
        let a = model.forward(&x, &d, &f).unwrap();
        let b = model.forward(&perturb_last_step(&x), &d, &f).unwrap();
        let shift = (0..6).map(|k| (a[[0, k]] - b[[0, k]]).abs()).fold(0.0, f64::max);
        assert!(shift > 1e-9, "earlier predictions unchanged: {shift}");
    }

    #[test]
    fn test_sequence_too_long() {
        let config = ModelConfig {
            max_len: 10,
            ..small_config()
        };
        let model = LosTransformer::seeded(config, dims(), 0).unwrap();
        let (x, d, f) = inputs(1, 11);
        assert!(matches!(
            model.forward(&x, &d, &f),
            Err(LosError::SequenceTooLong { len: 11, max_len: 10 })
        ));
    }

    #[test]
    fn test_sequence_too_short() {
        let model = LosTransformer::seeded(small_config(), dims(), 0).unwrap();
        let (x, d, f) = inputs(2, 5);
        assert!(matches!(
            model.forward(&x, &d, &f),
            Err(LosError::SequenceTooShort { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ModelConfig {
            d_model: 9,
            n_heads: 2,
            ..small_config()
        };
        assert!(LosTransformer::seeded(config, dims(), 0).is_err());
    }

    #[test]
    fn test_forward_batch_rejects_feature_count() {
        let model = LosTransformer::seeded(small_config(), dims(), 7).unwrap();
        let (_, d, f) = inputs(2, 9);
        let batch = Batch {
            timeseries: Array3::zeros((2, 10, 9)),
            diagnoses: d,
            flat: f,
            labels: Array2::ones((2, 9)),
            mask: Array2::from_elem((2, 9), true),
            seq_lengths: vec![9, 9],
        };
        assert!(matches!(
            model.forward_batch(&batch),
            Err(LosError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_configured_loss_on_batch() {
        let model = LosTransformer::seeded(small_config(), dims(), 7).unwrap();
        let (x, d, f) = inputs(2, 9);
        let mut mask = Array2::from_elem((2, 9), true);
        mask[[1, 8]] = false;
        let batch = Batch {
            timeseries: x,
            diagnoses: d,
            flat: f,
            labels: Array2::from_shape_fn((2, 9), |(_, j)| (9 - j) as f64 / 24.0 + 0.5),
            mask,
            seq_lengths: vec![9, 8],
        };
        let preds = model.forward_batch(&batch).unwrap();
        assert_eq!(preds.dim(), (2, 4));
        let loss = model.configured_loss(preds.view(), &batch).unwrap();
        assert!(loss.is_finite() && loss >= 0.0);
    }
}
