// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Property-Based Tests (proptest) for los-types
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for los-types using proptest.
//!
//! Covers: configuration validation and serialization roundtrip,
//! batch alignment helpers.

use los_types::batch::Batch;
use los_types::config::{BatchNormMode, InputDims, LossKind, ModelConfig};
use los_types::constants::VALIDITY_WINDOW;
use ndarray::{Array2, Array3};
use proptest::prelude::*;

fn batchnorm_mode() -> impl Strategy<Value = BatchNormMode> {
    prop_oneof![
        Just(BatchNormMode::None),
        Just(BatchNormMode::MyBatchNorm),
        Just(BatchNormMode::Default),
        Just(BatchNormMode::PointOnly),
        Just(BatchNormMode::LowMomentum),
    ]
}

// ── Configuration ────────────────────────────────────────────────────

proptest! {
    /// Any config with d_model a multiple of n_heads validates and survives JSON.
    #[test]
    fn config_roundtrip(
        n_heads in 1usize..8,
        head_width in 1usize..8,
        n_layers in 1usize..6,
        dropout in 0.0f64..0.95,
        mode in batchnorm_mode(),
        no_exp in any::<bool>(),
        mse in any::<bool>(),
    ) {
        let cfg = ModelConfig {
            d_model: n_heads * head_width,
            n_heads,
            n_layers,
            trans_dropout_rate: dropout,
            main_dropout_rate: dropout,
            batchnorm: mode,
            no_exp,
            loss: if mse { LossKind::Mse } else { LossKind::Msle },
            ..ModelConfig::default()
        };
        prop_assert!(cfg.validate().is_ok());

        let json = serde_json::to_string(&cfg).unwrap();
        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, cfg);
    }

    /// Selector strings parse back to the mode that printed them.
    #[test]
    fn batchnorm_display_parses(mode in batchnorm_mode()) {
        let parsed: BatchNormMode = mode.to_string().parse().unwrap();
        prop_assert_eq!(parsed, mode);
    }

    /// Channel count is always 2F + 2.
    #[test]
    fn input_channels_formula(f in 0usize..200) {
        let dims = InputDims { features: f, diagnoses: 1, flat: 1 };
        prop_assert_eq!(dims.channels(), 2 * f + 2);
    }
}

// ── Batch Alignment ──────────────────────────────────────────────────

proptest! {
    /// Trimmed targets/mask drop exactly the validity window.
    #[test]
    fn prediction_views_drop_window(
        b in 1usize..6,
        t in 6usize..40,
        f in 1usize..5,
    ) {
        let batch = Batch {
            timeseries: Array3::zeros((b, 2 * f + 2, t)),
            diagnoses: Array2::zeros((b, 3)),
            flat: Array2::zeros((b, 2)),
            labels: Array2::from_shape_fn((b, t), |(i, j)| (i * t + j) as f64),
            mask: Array2::from_elem((b, t), true),
            seq_lengths: (0..b).map(|i| t - (i % t)).collect(),
        };
        prop_assert!(batch.validate().is_ok());

        let targets = batch.prediction_targets();
        prop_assert_eq!(targets.dim(), (b, t - VALIDITY_WINDOW));
        for i in 0..b {
            prop_assert_eq!(targets[[i, 0]], (i * t + VALIDITY_WINDOW) as f64);
        }
        prop_assert_eq!(batch.prediction_mask().dim(), (b, t - VALIDITY_WINDOW));

        for (len, trimmed) in batch.seq_lengths.iter().zip(batch.prediction_lengths()) {
            prop_assert_eq!(trimmed, len.saturating_sub(VALIDITY_WINDOW));
        }
    }
}
