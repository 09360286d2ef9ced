// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-test statistics over a reconstructed run.

use crate::model::{Test, TestRun};
use serde::Serialize;
use std::time::Duration;

/// Attempts that take longer than this are considered slow by [`summarize`].
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(1);

/// Statistics for a single test.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TestSummary {
    /// The full name of the test.
    pub name: String,

    /// The short name of the test.
    pub short_name: String,

    /// The number of attempts.
    pub attempts: usize,

    /// The number of attempts that failed or timed out.
    pub failed: usize,

    /// The sum of all attempt durations.
    #[serde(with = "humantime_serde")]
    pub total_duration: Duration,

    /// The number of attempts that took strictly longer than the slow threshold.
    pub slow_attempts: usize,

    /// The mean duration of slow attempts, or zero if there were none.
    #[serde(with = "humantime_serde")]
    pub average_duration: Duration,
}

impl TestSummary {
    fn new(test: &Test, slow_threshold: Duration) -> Self {
        let mut total_duration = Duration::ZERO;
        let mut slow_duration = Duration::ZERO;
        let mut slow_attempts = 0;
        for attempt in &test.attempts {
            total_duration = total_duration.saturating_add(attempt.duration);
            if attempt.duration > slow_threshold {
                slow_duration = slow_duration.saturating_add(attempt.duration);
                slow_attempts += 1;
            }
        }

        let average_duration = match u32::try_from(slow_attempts) {
            Ok(0) => Duration::ZERO,
            Ok(count) => slow_duration / count,
            Err(_) => Duration::from_secs_f64(slow_duration.as_secs_f64() / slow_attempts as f64),
        };

        Self {
            name: test.name.clone(),
            short_name: test.short_name.clone(),
            attempts: test.attempts.len(),
            failed: test.failed_attempts().count(),
            total_duration,
            slow_attempts,
            average_duration,
        }
    }
}

/// Summarizes every test in `run`, using [`DEFAULT_SLOW_THRESHOLD`].
pub fn summarize(run: &TestRun) -> Vec<TestSummary> {
    summarize_with_threshold(run, DEFAULT_SLOW_THRESHOLD)
}

/// Summarizes every test in `run`.
///
/// The result is sorted by ascending average duration. Tests with equal averages keep the order in
/// which they first appeared in the log.
pub fn summarize_with_threshold(run: &TestRun, slow_threshold: Duration) -> Vec<TestSummary> {
    let mut summaries: Vec<_> = run
        .tests
        .iter()
        .map(|test| TestSummary::new(test, slow_threshold))
        .collect();
    // sort_by_key is stable.
    summaries.sort_by_key(|summary| summary.average_duration);
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attempt, RunStatus};
    use pretty_assertions::assert_eq;

    fn test(name: &str, attempts: &[(RunStatus, u64)]) -> Test {
        Test {
            name: format!("suite [It] {name}"),
            short_name: name.to_owned(),
            attempts: attempts
                .iter()
                .enumerate()
                .map(|(ix, &(status, millis))| Attempt {
                    attempt_no: ix + 1,
                    name: format!("suite [It] {name}"),
                    start_time: None,
                    end_time: None,
                    duration: Duration::from_millis(millis),
                    status,
                    logs: Vec::new(),
                    events: Vec::new(),
                })
                .collect(),
        }
    }

    fn run(tests: Vec<Test>) -> TestRun {
        TestRun {
            full_logs: String::new(),
            tests,
        }
    }

    #[test]
    fn counts_attempts_and_failures() {
        let run = run(vec![test(
            "flaky",
            &[
                (RunStatus::Failed, 4_000),
                (RunStatus::Timeout, 6_000),
                (RunStatus::Passed, 2_000),
            ],
        )]);
        let summaries = summarize(&run);
        assert_eq!(
            summaries,
            [TestSummary {
                name: "suite [It] flaky".to_owned(),
                short_name: "flaky".to_owned(),
                attempts: 3,
                failed: 2,
                total_duration: Duration::from_secs(12),
                slow_attempts: 3,
                average_duration: Duration::from_secs(4),
            }]
        );
    }

    #[test]
    fn average_covers_slow_attempts_only() {
        let run = run(vec![test(
            "mixed",
            &[
                (RunStatus::Passed, 500),
                (RunStatus::Passed, 1_000),
                (RunStatus::Passed, 3_000),
            ],
        )]);
        let summary = &summarize(&run)[0];
        assert_eq!(summary.slow_attempts, 1, "exactly the threshold is not slow");
        assert_eq!(summary.total_duration, Duration::from_millis(4_500));
        assert_eq!(summary.average_duration, Duration::from_secs(3));
    }

    #[test]
    fn single_fast_attempt() {
        let run = run(vec![test("fast", &[(RunStatus::Passed, 200)])]);
        let summary = &summarize(&run)[0];
        assert_eq!(summary.attempts, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.average_duration, Duration::ZERO);
    }

    #[test]
    fn sorted_by_average_with_stable_ties() {
        let run = run(vec![
            test("slow", &[(RunStatus::Passed, 10_000)]),
            test("fast-a", &[(RunStatus::Passed, 100)]),
            test("medium", &[(RunStatus::Passed, 5_000)]),
            test("fast-b", &[(RunStatus::Failed, 900)]),
        ]);
        let names: Vec<_> = summarize(&run)
            .into_iter()
            .map(|summary| summary.short_name)
            .collect();
        assert_eq!(names, ["fast-a", "fast-b", "medium", "slow"]);
    }

    #[test]
    fn custom_threshold() {
        let run = run(vec![test("t", &[(RunStatus::Passed, 500)])]);
        let summary = &summarize_with_threshold(&run, Duration::from_millis(100))[0];
        assert_eq!(summary.slow_attempts, 1);
        assert_eq!(summary.average_duration, Duration::from_millis(500));
    }
}
