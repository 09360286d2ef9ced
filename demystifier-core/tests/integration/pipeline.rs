// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use chrono::NaiveDate;
use color_eyre::eyre::{Result, ensure};
use demystifier_core::{
    flake::{FlakePatterns, classify_attempt},
    model::RunStatus,
    reconstruct::{Reconstructor, reconstruct},
    summary::summarize,
};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[test]
fn build_log_reconstructs() -> Result<()> {
    let run = build_log_run();

    let names: Vec<_> = run.tests.iter().map(|test| test.name.as_str()).collect();
    assert_eq!(names, [MYSQL_TEST, MONGO_TEST, HOOKS_TEST]);

    let mysql = run.test(MYSQL_TEST).expect("MySQL test is present");
    assert_eq!(mysql.short_name, "MySQL application two Vol CSI");
    let statuses: Vec<_> = mysql
        .attempts
        .iter()
        .map(|attempt| (attempt.attempt_no, attempt.status))
        .collect();
    assert_eq!(
        statuses,
        [
            (1, RunStatus::Failed),
            (2, RunStatus::Failed),
            (3, RunStatus::Passed),
        ]
    );
    ensure!(mysql.is_flaky(), "MySQL test passed after failing");

    let first = &mysql.attempts[0];
    let day = NaiveDate::from_ymd_opt(2024, 2, 14).expect("valid date");
    assert_eq!(first.start_time, day.and_hms_opt(20, 0, 0));
    assert_eq!(first.end_time, day.and_hms_milli_opt(20, 3, 8, 943));
    assert_eq!(first.duration, Duration::from_millis(188_943));
    assert_eq!(first.logs.len(), 12);

    let events: Vec<_> = first
        .events
        .iter()
        .map(|event| (event.name.as_str(), event.status))
        .collect();
    assert_eq!(
        events,
        [
            ("Create DPA CR", RunStatus::Passed),
            ("Prepare backup resources", RunStatus::Passed),
            ("Creating backup mysql-two-vol-1", RunStatus::Failed),
        ]
    );
    for (_, attempt) in run.attempts() {
        assert_eq!(
            attempt.out_of_bounds_events().count(),
            0,
            "events of attempt {} of {} lie within it",
            attempt.attempt_no,
            attempt.name
        );
    }

    let hooks = run.test(HOOKS_TEST).expect("hooks test is present");
    assert_eq!(hooks.attempts[0].status, RunStatus::Passed);
    assert_eq!(hooks.attempts[0].start_time, None);
    assert_eq!(hooks.attempts[0].duration, Duration::from_millis(412));

    // Setup output and the report trailer belong to no attempt.
    ensure!(
        run.attempts()
            .all(|(_, attempt)| !attempt.log_text().contains("Random Seed")),
        "suite header is not attributed to an attempt"
    );
    Ok(())
}

#[test]
fn flaky_failures_recommend_retry() -> Result<()> {
    let run = build_log_run();
    let patterns = FlakePatterns::load(Some(patterns_dir("retry").as_path()))?;
    assert_eq!(patterns.len(), 3);

    let failed: Vec<_> = run.failed_attempts().collect();
    assert_eq!(failed.len(), 2);
    for (test, attempt) in failed {
        assert_eq!(test.name, MYSQL_TEST);
        let result = classify_attempt(attempt, &patterns);
        let issues: Vec<_> = result.matched.iter().map(|p| p.issue.as_str()).collect();
        assert_eq!(issues, ["https://issues.redhat.com/browse/OADP-1057"]);
        ensure!(
            result.retry_recommended,
            "attempt {} should recommend a retry",
            attempt.attempt_no
        );
    }

    let summaries = summarize(&run);
    let mysql = summaries
        .iter()
        .find(|summary| summary.name == MYSQL_TEST)
        .expect("MySQL test is summarized");
    assert_eq!((mysql.attempts, mysql.failed), (3, 2));
    Ok(())
}

#[test]
fn summary_is_sorted_by_average() {
    let run = build_log_run();
    let rows: Vec<_> = summarize(&run)
        .into_iter()
        .map(|summary| (summary.short_name, summary.attempts, summary.failed, summary.average_duration))
        .collect();
    assert_eq!(
        rows,
        [
            ("Verify hooks are skipped".to_owned(), 1, 0, Duration::ZERO),
            (
                "MongoDB app with Kopia/restic".to_owned(),
                1,
                0,
                Duration::from_millis(95_100)
            ),
            (
                "MySQL application two Vol CSI".to_owned(),
                3,
                2,
                Duration::from_nanos(176_564_333_333)
            ),
        ]
    );
}

#[test]
fn reconstruction_is_repeatable() {
    let log = build_log();
    assert_eq!(reconstruct(&log), reconstruct(&log));
}

#[test]
fn unknown_spec_token_finds_nothing() {
    let err = Reconstructor::new("Specify")
        .reconstruct(&build_log())
        .expect_err("no `[Specify]` markers in the fixture");
    assert_eq!(
        err.to_string(),
        "no test markers (`[Specify] ...`) found in non-empty log"
    );
}
