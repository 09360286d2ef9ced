// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by demystifier.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error::Error, fmt};
use thiserror::Error;

/// An error that occurred while reconstructing a test run from a log.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum LogParseError {
    /// The log has content, but no line introduces a test.
    #[error("no test markers (`[{spec_token}] ...`) found in non-empty log")]
    NoTestMarkers {
        /// The spec token that was searched for.
        spec_token: String,
    },
}

/// An error that occurred while loading flake patterns.
///
/// Loading is all-or-nothing: any one of these errors means no patterns were loaded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PatternLoadError {
    /// The patterns directory could not be listed.
    #[error("failed to read flake patterns directory `{dir}`")]
    ReadDir {
        /// The directory that was being read.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A pattern file could not be read.
    #[error("failed to read flake pattern file `{path}`")]
    ReadFile {
        /// The file that was being read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// A pattern file is not a valid list of pattern records.
    #[error("failed to parse flake pattern file `{path}`")]
    Deserialize {
        /// The file that failed to parse.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// The search automaton could not be built from the loaded patterns.
    #[error("failed to build flake pattern matcher")]
    BuildMatcher {
        /// The underlying error.
        #[source]
        error: aho_corasick::BuildError,
    },
}

/// An error that occurred while writing an attempt's logs to a file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    /// The destination directory could not be created.
    #[error("failed to create log directory `{dir}`")]
    CreateDir {
        /// The directory that was being created.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The log file could not be created or written to.
    #[error("failed to write attempt log `{path}`")]
    Write {
        /// The file that was being written.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },
}

impl ExportError {
    /// Returns the path the error is about.
    pub fn path(&self) -> &camino::Utf8Path {
        match self {
            Self::CreateDir { dir, .. } => dir,
            Self::Write { path, .. } => path,
        }
    }
}

/// An error that occurred while parsing the demystifier config.
#[derive(Debug, Error)]
#[error("failed to parse demystifier config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file that failed to parse.
    pub fn config_file(&self) -> &camino::Utf8Path {
        &self.config_file
    }
}

/// Displays an error along with all of its sources, one per line.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut next_error = self.error.source();
        while let Some(err) = next_error {
            write!(f, "\n  caused by: {err}")?;
            next_error = err.source();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_chain_lists_sources() {
        let error = ExportError::Write {
            path: "out/a_b_1.log".into(),
            error: std::io::Error::other("disk full"),
        };
        assert_eq!(
            DisplayErrorChain::new(&error).to_string(),
            "failed to write attempt log `out/a_b_1.log`\n  caused by: disk full"
        );
        assert_eq!(error.path().as_str(), "out/a_b_1.log");
    }
}
