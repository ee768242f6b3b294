// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet scanning stages — edge extraction, boundary search, perspective
// rectification and ink-mask binarization.

pub mod binarize;
pub mod clahe;
pub mod edges;
pub mod quad;
pub mod rectify;

pub use binarize::Binarizer;
pub use edges::EdgeExtractor;
pub use quad::{QuadCandidate, QuadFinder};
pub use rectify::{Rectifier, order_corners};
