// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Leading timesteps of every sequence that carry no prediction.
/// The model only has enough context from the 6th timestep onward.
pub const VALIDITY_WINDOW: usize = 5;

/// Lower prediction bound in days (half an hour).
pub const MIN_LOS_DAYS: f64 = 1.0 / 48.0;

/// Upper prediction bound in days.
pub const MAX_LOS_DAYS: f64 = 100.0;

/// Default positional table length: 14 days of hourly samples.
pub const DEFAULT_MAX_LEN: usize = 14 * 24;

/// Running-statistics momentum for batch normalisation.
pub const BN_MOMENTUM: f64 = 0.1;

/// Momentum used by the `low_momentum` batch-norm selector.
pub const BN_LOW_MOMENTUM: f64 = 0.01;

/// Variance epsilon shared by batch and layer normalisation.
pub const NORM_EPS: f64 = 1e-5;

/// Base of the sinusoidal positional frequencies.
pub const POSITIONAL_BASE: f64 = 10_000.0;

/// Non-feature channels appended to the time series (sequence index, hour of day).
pub const EXTRA_TIME_CHANNELS: usize = 2;
