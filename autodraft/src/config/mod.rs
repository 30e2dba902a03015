// Copyright 2026 The AutoDraft Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads autodraft.yaml, validates structure, resolves `${VAR}` interpolation
// for secrets, fills provider defaults, and computes a config hash that is
// logged at startup.

mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::{compute_hash, load_config};
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::*;
