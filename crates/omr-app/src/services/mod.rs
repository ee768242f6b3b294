// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer — bridges the command line to the omr backend crates.
//
// Each service wraps backend APIs in a form the CLI can call directly and
// returns data the renderers can print as-is.

pub mod answer_key;
pub mod app_services;
pub mod batch;
