// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The reconstructed model of a CI test run.
//!
//! A [`TestRun`] owns its [`Test`]s, each test owns its [`Attempt`]s, and each attempt owns its
//! [`Event`]s and captured log lines. There are no back-references: traversal is always top-down.
//!
//! Values of these types are produced by [`reconstruct`](crate::reconstruct::reconstruct) and are
//! never mutated afterwards, so they can be shared freely across threads for read-only traversal.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::{fmt, time::Duration};

/// The outcome of an attempt or an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    /// The attempt passed.
    Passed,

    /// The attempt failed or panicked.
    Failed,

    /// The attempt timed out or was interrupted.
    Timeout,

    /// No terminal status was recorded, for example because the log was truncated.
    #[default]
    Unknown,
}

impl RunStatus {
    /// Returns true if this status counts as a failure: either `Failed` or `Timeout`.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Timeout)
    }

    /// Returns the upper-case label used in Ginkgo output.
    pub fn label(self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Timeout => "TIMEOUT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named, timestamped sub-phase within an attempt, such as a backup or a restore step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Event {
    /// The name of the event.
    pub name: String,

    /// When the event started, if the log carried a timestamp for it.
    pub start_time: Option<NaiveDateTime>,

    /// When the event ended, if known.
    pub end_time: Option<NaiveDateTime>,

    /// How long the event took.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// The outcome of the event.
    pub status: RunStatus,

    /// Log lines captured while the event was open.
    pub logs: Vec<String>,
}

/// A single execution of a test.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Attempt {
    /// The 1-based attempt number within the owning test.
    pub attempt_no: usize,

    /// The name of the attempt: always the full name of the owning test.
    pub name: String,

    /// When the attempt started, if any timestamp was seen inside it.
    pub start_time: Option<NaiveDateTime>,

    /// When the attempt ended, if known.
    pub end_time: Option<NaiveDateTime>,

    /// How long the attempt took.
    #[serde(with = "humantime_serde")]
    pub duration: Duration,

    /// The outcome of the attempt.
    pub status: RunStatus,

    /// Every log line between the attempt's start marker and its terminal marker.
    pub logs: Vec<String>,

    /// Sub-phases within this attempt, in log order.
    pub events: Vec<Event>,
}

impl Attempt {
    /// Returns the captured log lines joined by newlines.
    pub fn log_text(&self) -> String {
        self.logs.join("\n")
    }

    /// Returns events whose interval does not lie within this attempt's interval.
    ///
    /// Events and attempts without timestamps are never reported.
    pub fn out_of_bounds_events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter().filter(move |event| {
            let starts_early = matches!(
                (self.start_time, event.start_time),
                (Some(attempt_start), Some(event_start)) if event_start < attempt_start
            );
            let ends_late = matches!(
                (self.end_time, event.end_time),
                (Some(attempt_end), Some(event_end)) if event_end > attempt_end
            );
            starts_early || ends_late
        })
    }
}

/// One logical test case, with all of its attempts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Test {
    /// The fully-qualified name of the test. This is the test's identity.
    pub name: String,

    /// A display-oriented name derived from the full name.
    pub short_name: String,

    /// Attempts in the order they were encountered. Never empty.
    pub attempts: Vec<Attempt>,
}

impl Test {
    /// Returns the attempts that failed or timed out.
    pub fn failed_attempts(&self) -> impl Iterator<Item = &Attempt> + '_ {
        self.attempts
            .iter()
            .filter(|attempt| attempt.status.is_failure())
    }

    /// Returns true if the test eventually passed after at least one failure.
    pub fn is_flaky(&self) -> bool {
        let last_passed = self
            .attempts
            .last()
            .is_some_and(|attempt| attempt.status == RunStatus::Passed);
        last_passed && self.failed_attempts().next().is_some()
    }
}

/// A complete reconstructed log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TestRun {
    /// The raw text the run was reconstructed from.
    #[serde(skip)]
    pub full_logs: String,

    /// Tests in the order they were first encountered.
    pub tests: Vec<Test>,
}

impl TestRun {
    /// Returns an iterator over every attempt in the run, alongside its owning test.
    pub fn attempts(&self) -> impl Iterator<Item = (&Test, &Attempt)> + '_ {
        self.tests
            .iter()
            .flat_map(|test| test.attempts.iter().map(move |attempt| (test, attempt)))
    }

    /// Returns every failed or timed-out attempt, alongside its owning test.
    pub fn failed_attempts(&self) -> impl Iterator<Item = (&Test, &Attempt)> + '_ {
        self.attempts()
            .filter(|(_, attempt)| attempt.status.is_failure())
    }

    /// Looks up a test by its full name.
    pub fn test(&self, name: &str) -> Option<&Test> {
        self.tests.iter().find(|test| test.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn event(name: &str, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Event {
        Event {
            name: name.to_owned(),
            start_time: start,
            end_time: end,
            duration: Duration::ZERO,
            status: RunStatus::Passed,
            logs: Vec::new(),
        }
    }

    fn attempt(attempt_no: usize, status: RunStatus, events: Vec<Event>) -> Attempt {
        Attempt {
            attempt_no,
            name: "suite [It] test".to_owned(),
            start_time: Some(at(10, 0, 0)),
            end_time: Some(at(10, 5, 0)),
            duration: Duration::from_secs(300),
            status,
            logs: Vec::new(),
            events,
        }
    }

    #[test]
    fn out_of_bounds_events() {
        let attempt = attempt(
            1,
            RunStatus::Passed,
            vec![
                event("inside", Some(at(10, 1, 0)), Some(at(10, 2, 0))),
                event("early", Some(at(9, 59, 0)), Some(at(10, 2, 0))),
                event("late", Some(at(10, 4, 0)), Some(at(10, 6, 0))),
                event("untimed", None, None),
            ],
        );
        let names: Vec<_> = attempt
            .out_of_bounds_events()
            .map(|event| event.name.as_str())
            .collect();
        assert_eq!(names, ["early", "late"]);
    }

    #[test]
    fn flaky_and_failed_attempts() {
        let test = Test {
            name: "suite [It] test".to_owned(),
            short_name: "test".to_owned(),
            attempts: vec![
                attempt(1, RunStatus::Failed, Vec::new()),
                attempt(2, RunStatus::Timeout, Vec::new()),
                attempt(3, RunStatus::Passed, Vec::new()),
            ],
        };
        assert_eq!(test.failed_attempts().count(), 2);
        assert!(test.is_flaky());

        let run = TestRun {
            full_logs: String::new(),
            tests: vec![test],
        };
        let failed: Vec<_> = run
            .failed_attempts()
            .map(|(_, attempt)| attempt.attempt_no)
            .collect();
        assert_eq!(failed, [1, 2]);
        assert!(run.test("suite [It] test").is_some());
        assert!(run.test("test").is_none());
    }

    #[test]
    fn model_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TestRun>();
    }
}
