// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — LOS ML
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Length-of-stay transformer.
//!
//! Causal attention encoder over the admission time series, per-timestep
//! fusion head, bounded output transform and masked sequence loss.

pub mod attention;
pub mod batchnorm;
pub mod encoder;
pub mod fusion_head;
pub mod layers;
pub mod loss;
pub mod model;
pub mod output;
pub mod positional;
