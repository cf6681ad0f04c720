// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — Output Transform
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Maps raw scores to a remaining length of stay in [1/48, 100] days.

use los_math::activation::hard_clamp;
use los_types::constants::{MAX_LOS_DAYS, MIN_LOS_DAYS};
use ndarray::{Array, Dimension};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLink {
    /// clamp(exp(raw))
    Exponential,
    /// clamp(raw)
    Identity,
}

#[derive(Debug, Clone, Copy)]
pub struct OutputTransform {
    link: OutputLink,
}

impl OutputTransform {
    pub fn new(no_exp: bool) -> Self {
        let link = if no_exp {
            OutputLink::Identity
        } else {
            OutputLink::Exponential
        };
        OutputTransform { link }
    }

    #[cfg(test)]
    pub(crate) fn link(&self) -> OutputLink {
        self.link
    }

    pub fn apply(&self, raw: f64) -> f64 {
        let linked = match self.link {
            OutputLink::Exponential => raw.exp(),
            OutputLink::Identity => raw,
        };
        hard_clamp(linked, MIN_LOS_DAYS, MAX_LOS_DAYS)
    }

    pub fn transform<D: Dimension>(&self, raw: Array<f64, D>) -> Array<f64, D> {
        raw.mapv_into(|v| self.apply(v))
    }
}
