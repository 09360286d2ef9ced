// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Known flake patterns and matching failure output against them.
//!
//! A [`FlakePatterns`] set is loaded once from a directory of JSON files and is then read-only.
//! [`classify`] checks a text for every pattern in a single pass and reports which ones are
//! present, along with whether a retry is recommended.

mod matcher;
mod patterns;

pub use matcher::*;
pub use patterns::*;
