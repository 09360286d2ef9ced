// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::PatternLoadError;
use aho_corasick::AhoCorasick;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A known, previously catalogued failure signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlakePattern {
    /// A reference to the issue tracking this flake, usually a link.
    pub issue: String,

    /// A human-readable description.
    pub description: String,

    /// The literal, case-sensitive substring that identifies this flake.
    pub string_search_pattern: String,

    /// If true, this flake is recognized but must not lead to a retry recommendation.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_retry: bool,
}

/// Decodes the contents of one pattern definition file: a JSON array of pattern records.
pub fn decode_patterns(input: &str) -> Result<Vec<FlakePattern>, serde_json::Error> {
    serde_json::from_str(input)
}

/// Encodes a list of patterns in the format read by [`decode_patterns`].
pub fn encode_patterns(patterns: &[FlakePattern]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(patterns)
}

/// An ordered, immutable set of flake patterns.
///
/// Patterns keep the order they were loaded in: files in lexicographic order of their names, and
/// records in file order within each file.
#[derive(Clone, Debug, Default)]
pub struct FlakePatterns {
    patterns: Vec<FlakePattern>,
    // None if and only if there are no patterns.
    matcher: Option<AhoCorasick>,
}

impl FlakePatterns {
    /// The extension of pattern definition files.
    pub const FILE_EXTENSION: &'static str = "json";

    /// Returns an empty pattern set, which never matches anything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads patterns from `dir`, or returns an empty set if `dir` is `None`.
    pub fn load(dir: Option<&Utf8Path>) -> Result<Self, PatternLoadError> {
        match dir {
            Some(dir) => Self::load_dir(dir),
            None => Ok(Self::empty()),
        }
    }

    /// Loads every `*.json` file directly inside `dir`.
    ///
    /// Subdirectories are not searched. If any file fails to read or decode, the whole load
    /// fails.
    pub fn load_dir(dir: &Utf8Path) -> Result<Self, PatternLoadError> {
        let read_dir_err = |error: std::io::Error| PatternLoadError::ReadDir {
            dir: dir.to_owned(),
            error,
        };

        let mut files: Vec<Utf8PathBuf> = Vec::new();
        for entry in dir.read_dir_utf8().map_err(read_dir_err)? {
            let entry = entry.map_err(read_dir_err)?;
            let path = entry.path();
            if path.extension() == Some(Self::FILE_EXTENSION) && path.is_file() {
                files.push(path.to_owned());
            }
        }
        files.sort_unstable();

        let mut patterns = Vec::new();
        for path in files {
            let contents =
                std::fs::read_to_string(&path).map_err(|error| PatternLoadError::ReadFile {
                    path: path.clone(),
                    error,
                })?;
            let file_patterns = decode_patterns(&contents)
                .map_err(|error| PatternLoadError::Deserialize {
                    path: path.clone(),
                    error,
                })?;
            debug!("loaded {} flake patterns from {path}", file_patterns.len());
            patterns.extend(file_patterns);
        }

        Self::new(patterns)
    }

    /// Creates a pattern set from patterns in memory.
    pub fn new(patterns: Vec<FlakePattern>) -> Result<Self, PatternLoadError> {
        if patterns.is_empty() {
            return Ok(Self::empty());
        }
        let matcher = AhoCorasick::new(patterns.iter().map(|p| &p.string_search_pattern))
            .map_err(|error| PatternLoadError::BuildMatcher { error })?;
        Ok(Self {
            patterns,
            matcher: Some(matcher),
        })
    }

    /// Returns the patterns in load order.
    pub fn patterns(&self) -> &[FlakePattern] {
        &self.patterns
    }

    /// Returns the number of patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns true if there are no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub(super) fn matcher(&self) -> Option<&AhoCorasick> {
        self.matcher.as_ref()
    }
}
