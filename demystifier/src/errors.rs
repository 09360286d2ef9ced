// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use demystifier_core::errors::{ConfigParseError, LogParseError, PatternLoadError};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Documented exit codes for `demystifier` failures.
///
/// Unknown or unexpected failures always result in exit code 1.
pub enum DemystifierExitCode {}

impl DemystifierExitCode {
    /// No errors occurred and demystifier exited normally.
    pub const OK: i32 = 0;

    /// A log, pattern set or config could not be read or understood, or writing output failed.
    pub const ERROR: i32 = 1;

    /// The command line could not be parsed.
    pub const USAGE_ERROR: i32 = 2;

    /// A remote log was requested, but only local logs can be analyzed.
    pub const REMOTE_LOG_UNSUPPORTED: i32 = 3;
}

// The #[error()] strings are placeholders: the expected way to print errors is with
// display_to_stderr, which colorizes them.

/// An expected error: bad input or an environment problem, rather than a bug.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("failed to read log")]
    LogReadError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to reconstruct log")]
    LogParseError {
        path: Utf8PathBuf,
        #[source]
        err: LogParseError,
    },
    #[error("failed to load flake patterns")]
    PatternLoadError {
        #[from]
        err: PatternLoadError,
    },
    #[error("failed to export attempt logs")]
    ExportFailed { failed: usize, total: usize },
    #[error("remote logs are not supported")]
    RemoteLogUnsupported { url: String, log_url: String },
    #[error("failed to write output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
    #[error("failed to serialize output")]
    SerializeError {
        #[source]
        err: serde_json::Error,
    },
}

impl ExpectedError {
    pub(crate) fn log_read_error(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self::LogReadError {
            path: path.into(),
            err,
        }
    }

    pub(crate) fn log_parse_error(path: impl Into<Utf8PathBuf>, err: LogParseError) -> Self {
        Self::LogParseError {
            path: path.into(),
            err,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigParseError { .. }
            | Self::LogReadError { .. }
            | Self::LogParseError { .. }
            | Self::PatternLoadError { .. }
            | Self::ExportFailed { .. }
            | Self::WriteOutputError { .. }
            | Self::SerializeError { .. } => DemystifierExitCode::ERROR,
            Self::RemoteLogUnsupported { .. } => DemystifierExitCode::REMOTE_LOG_UNSUPPORTED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::ConfigParseError { err } => {
                tracing::error!(
                    "failed to parse config file `{}`",
                    err.config_file().style(styles.bold)
                );
                err.source()
            }
            Self::LogReadError { path, err } => {
                tracing::error!("failed to read log `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::LogParseError { path, err } => {
                tracing::error!("failed to reconstruct log `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::PatternLoadError { err } => {
                tracing::error!("{err}");
                err.source()
            }
            Self::ExportFailed { failed, total } => {
                tracing::error!(
                    "failed to export logs for {} of {total} attempts",
                    failed.style(styles.bold)
                );
                None
            }
            Self::RemoteLogUnsupported { url, log_url } => {
                tracing::error!(
                    "`{}` is a remote job, but only local logs can be analyzed",
                    url.style(styles.bold)
                );
                tracing::info!(
                    target: NO_HEADING_TARGET,
                    "(hint: download {} and pass its local path)",
                    log_url.style(styles.warning_text)
                );
                None
            }
            Self::WriteOutputError { err } => {
                tracing::error!("failed to write output");
                Some(err as &dyn Error)
            }
            Self::SerializeError { err } => {
                tracing::error!("failed to serialize output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            tracing::error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
