// ─────────────────────────────────────────────────────────────────────
// SCPN LOS Transformer — LOS Math
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Numeric primitives shared by the LOS model layers.

pub mod activation;
pub mod concat;
pub mod norm;
pub mod softmax;
