// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recognition of structural markers in individual log lines.
//!
//! Everything in this module looks at exactly one line at a time and has no notion of parser
//! state. The state machine in the parent module decides what a recognized marker means.

use crate::model::RunStatus;
use chrono::NaiveDateTime;
use regex::Regex;
use std::{sync::LazyLock, time::Duration};

/// The bullet Ginkgo prints in front of a spec's terminal status.
const STATUS_BULLET: char = '•';

/// Prefix of a `By(...)` step.
const STEP_PREFIX: &str = "STEP: ";

/// Prefix of a node exit line, for example `< Exit [It] foo - /path:12 @ 02/14/24 ...`.
const NODE_EXIT_PREFIX: &str = "< Exit [";

/// Prefix of a node enter line.
const NODE_ENTER_PREFIX: &str = "> Enter [";

/// Prefix of a failure location line, for example `In [It] at: /path:12 @ 02/14/24 ...`.
const FAILURE_LOCATION_PREFIX: &str = "In [";

/// Status tags Ginkgo prints at the start of report and timeline lines.
const GINKGO_TAGS: &[&str] = &[
    "FAILED",
    "FAIL",
    "PANICKED",
    "TIMEDOUT",
    "INTERRUPTED",
    "ABORTED",
    "SKIPPED",
    "PENDING",
    "PASSED",
];

const MIN_SEPARATOR_LEN: usize = 3;

/// Separator between a step's text and its timestamp.
const TIMESTAMP_SEPARATOR: &str = " @ ";

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^•\s*(?:\[(?P<tag>[^\]]+)\]|(?P<word>Failure|Panic|Timeout|Success))?\s*\[(?P<secs>\d+(?:\.\d+)?) seconds\]",
    )
    .expect("status regex is valid")
});

static GINKGO_TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r" @ (?P<ts>\d{2}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}(?:\.\d+)?)")
        .expect("ginkgo timestamp regex is valid")
});

static GO_LOG_TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<ts>\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2})")
        .expect("go log timestamp regex is valid")
});

/// What a single line means structurally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LineKind<'a> {
    /// A spec header carrying the full test name.
    TestStart {
        /// The full name: the trimmed line.
        name: &'a str,
        /// The leaf name after the spec token.
        short_name: &'a str,
    },

    /// The spec's terminal status, for example `• [FAILED] [188.943 seconds]`.
    Terminal {
        status: RunStatus,
        duration: Duration,
    },

    /// A `STEP: ...` line opening a sub-event.
    EventStart { name: &'a str },

    /// A node exit line closing the current sub-event.
    EventEnd,

    /// A `------------------------------` line between spec reports.
    Separator,

    /// A `[FAILED] ...`-style line inside a spec's timeline.
    FailureNote { status: RunStatus },

    /// A line with no structural meaning.
    Other,
}

/// Classifies lines according to a spec-introduction token, typically `It`.
#[derive(Clone, Debug)]
pub(crate) struct LineClassifier {
    // "[It] ", including the trailing space.
    token_marker: String,
}

impl LineClassifier {
    pub(crate) fn new(spec_token: &str) -> Self {
        Self {
            token_marker: format!("[{spec_token}] "),
        }
    }

    pub(crate) fn classify<'a>(&self, line: &'a str) -> LineKind<'a> {
        let trimmed = line.trim();

        if trimmed.starts_with(STATUS_BULLET) {
            if let Some((status, duration)) = parse_terminal(trimmed) {
                return LineKind::Terminal { status, duration };
            }
            return LineKind::Other;
        }

        if let Some(rest) = trimmed.strip_prefix(STEP_PREFIX) {
            let name = match rest.find(TIMESTAMP_SEPARATOR) {
                Some(idx) => &rest[..idx],
                None => rest,
            };
            return LineKind::EventStart { name: name.trim() };
        }

        if trimmed.starts_with(NODE_EXIT_PREFIX) {
            return LineKind::EventEnd;
        }

        if is_separator(trimmed) {
            return LineKind::Separator;
        }

        if let Some(tag) = leading_ginkgo_tag(trimmed) {
            return match tag {
                "FAILED" | "PANICKED" => LineKind::FailureNote {
                    status: RunStatus::Failed,
                },
                "TIMEDOUT" => LineKind::FailureNote {
                    status: RunStatus::Timeout,
                },
                _ => LineKind::Other,
            };
        }

        if trimmed.starts_with(NODE_ENTER_PREFIX) || trimmed.starts_with(FAILURE_LOCATION_PREFIX) {
            return LineKind::Other;
        }

        if let Some(idx) = trimmed.rfind(&self.token_marker) {
            let short_name = trimmed[idx + self.token_marker.len()..].trim();
            if !short_name.is_empty() {
                return LineKind::TestStart {
                    name: trimmed,
                    short_name,
                };
            }
        }

        LineKind::Other
    }

    /// Derives the short name of a full test name: the text after the last spec token.
    pub(crate) fn short_name<'a>(&self, full_name: &'a str) -> &'a str {
        match full_name.rfind(&self.token_marker) {
            Some(idx) => full_name[idx + self.token_marker.len()..].trim(),
            None => full_name.trim(),
        }
    }
}

/// If the line starts with one of Ginkgo's bracketed status tags (for example `[FAILED]`),
/// returns the tag. Other bracketed prefixes such as `[CSI]` can be part of a spec name.
fn leading_ginkgo_tag(trimmed: &str) -> Option<&str> {
    let rest = trimmed.strip_prefix('[')?;
    let end = rest.find(']')?;
    let tag = &rest[..end];
    GINKGO_TAGS.contains(&tag).then_some(tag)
}

/// A `----...` line Ginkgo prints between spec reports.
fn is_separator(trimmed: &str) -> bool {
    trimmed.len() >= MIN_SEPARATOR_LEN && trimmed.bytes().all(|b| b == b'-')
}

fn parse_terminal(trimmed: &str) -> Option<(RunStatus, Duration)> {
    let captures = STATUS_RE.captures(trimmed)?;
    let duration = parse_seconds(captures.name("secs")?.as_str())?;
    let status = match (captures.name("tag"), captures.name("word")) {
        (Some(tag), _) => status_for_tag(tag.as_str()),
        (None, Some(word)) => match word.as_str() {
            "Failure" | "Panic" => RunStatus::Failed,
            "Timeout" => RunStatus::Timeout,
            _ => RunStatus::Passed,
        },
        (None, None) => RunStatus::Passed,
    };
    Some((status, duration))
}

fn status_for_tag(tag: &str) -> RunStatus {
    let tag = tag.trim();
    if tag == "PASSED" || tag.starts_with("FLAKEY") {
        RunStatus::Passed
    } else if matches!(tag, "FAILED" | "FAIL" | "PANICKED") {
        RunStatus::Failed
    } else if matches!(tag, "TIMEDOUT" | "INTERRUPTED" | "ABORTED") {
        RunStatus::Timeout
    } else {
        RunStatus::Unknown
    }
}

/// Parses a decimal number of seconds such as `188.943` exactly, without going through floating
/// point.
pub(crate) fn parse_seconds(input: &str) -> Option<Duration> {
    let (whole, frac) = match input.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (input, ""),
    };
    let secs: u64 = whole.parse().ok()?;
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // Nanosecond precision: anything past 9 digits is dropped.
    let mut nanos: u32 = 0;
    for (idx, c) in frac.chars().chain(std::iter::repeat('0')).take(9).enumerate() {
        let digit = c.to_digit(10)?;
        nanos += digit * 10u32.pow(8 - idx as u32);
    }
    Some(Duration::new(secs, nanos))
}

/// Extracts a timestamp from a line, if it carries one.
///
/// Two forms are recognized: Ginkgo's ` @ 02/14/24 20:09:38.123` suffix and Go's standard logger
/// prefix `2024/02/14 20:09:38`.
pub(crate) fn extract_timestamp(line: &str) -> Option<NaiveDateTime> {
    if let Some(captures) = GINKGO_TIMESTAMP_RE.captures(line) {
        let ts = captures.name("ts")?.as_str();
        if let Ok(parsed) = NaiveDateTime::parse_from_str(ts, "%m/%d/%y %H:%M:%S%.f") {
            return Some(parsed);
        }
    }
    let captures = GO_LOG_TIMESTAMP_RE.captures(line.trim_start())?;
    NaiveDateTime::parse_from_str(captures.name("ts")?.as_str(), "%Y/%m/%d %H:%M:%S").ok()
}
