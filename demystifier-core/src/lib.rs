// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core functionality for demystifier, a tool that makes sense of Ginkgo end-to-end test logs
//! produced by CI.
//!
//! The basic flow is:
//!
//! 1. [`reconstruct`](reconstruct::reconstruct) a raw log into a [`TestRun`](model::TestRun): the
//!    tests that ran, every attempt of each test, and the events within each attempt.
//! 2. Load known [flake patterns](flake::FlakePatterns) and [`classify`](flake::classify) the
//!    output of failed attempts against them.
//! 3. [`summarize`](summary::summarize) the run, or [export](export) each attempt's logs.

#![warn(missing_docs)]

pub mod config;
pub mod errors;
pub mod export;
pub mod flake;
pub mod helpers;
pub mod model;
pub mod reconstruct;
pub mod summary;
