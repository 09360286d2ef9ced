// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::patterns::{FlakePattern, FlakePatterns};
use crate::model::Attempt;

/// The outcome of matching a text against a set of flake patterns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchResult<'p> {
    /// Patterns whose search string occurs in the text, in store order. Each pattern appears at
    /// most once.
    pub matched: Vec<&'p FlakePattern>,

    /// True if at least one matched pattern permits a retry.
    pub retry_recommended: bool,
}

impl MatchResult<'_> {
    /// Returns true if the text matched any known flake.
    pub fn is_known_flake(&self) -> bool {
        !self.matched.is_empty()
    }
}

/// Classifies `text` against `patterns` using case-sensitive substring containment.
pub fn classify<'p>(text: &str, patterns: &'p FlakePatterns) -> MatchResult<'p> {
    let Some(matcher) = patterns.matcher() else {
        return MatchResult {
            matched: Vec::new(),
            retry_recommended: false,
        };
    };

    let all = patterns.patterns();
    let mut seen = vec![false; all.len()];
    let mut remaining = all.len();

    // Empty needles are contained in every text.
    for (ix, pattern) in all.iter().enumerate() {
        if pattern.string_search_pattern.is_empty() {
            seen[ix] = true;
            remaining -= 1;
        }
    }

    for found in matcher.find_overlapping_iter(text) {
        if remaining == 0 {
            break;
        }
        let ix = found.pattern().as_usize();
        if !seen[ix] {
            seen[ix] = true;
            remaining -= 1;
        }
    }

    let matched: Vec<_> = all
        .iter()
        .zip(&seen)
        .filter_map(|(pattern, &seen)| seen.then_some(pattern))
        .collect();
    let retry_recommended = matched.iter().any(|pattern| !pattern.skip_retry);

    MatchResult {
        matched,
        retry_recommended,
    }
}

/// Classifies the log lines captured for `attempt`.
pub fn classify_attempt<'p>(attempt: &Attempt, patterns: &'p FlakePatterns) -> MatchResult<'p> {
    classify(&attempt.log_text(), patterns)
}
