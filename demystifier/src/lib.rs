// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `demystifier` command-line tool.
//!
//! `demystifier analyze` reconstructs the Ginkgo test run in a CI build log, logs each failed
//! attempt, classifies failures against known flake patterns, and prints a summary table. With
//! `--dump-logs` it writes every attempt's log lines to their own file instead.
//!
//! `demystifier log-url` maps a Prow job page to the URL of its build log.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod log_url;
mod output;
mod reporter;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
