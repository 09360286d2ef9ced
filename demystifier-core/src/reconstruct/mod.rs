// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconstruction of a [`TestRun`] from raw Ginkgo log text.
//!
//! Reconstruction is a single pass over the log's lines, driven by an explicit state machine.
//! Each line is first classified on its own (see the `line` module) and the
//! resulting marker is then fed to the transition function together with the current state.
//!
//! Repeated occurrences of a test's full name are retries: each one opens a new [`Attempt`]
//! under the existing [`Test`], numbered from 1 in encounter order.
//!
//! Truncated logs are expected. An attempt that is still open when the input ends (or when the
//! next test starts) is closed with [`RunStatus::Unknown`] instead of failing reconstruction.

mod line;

use crate::{
    errors::LogParseError,
    model::{Attempt, Event, RunStatus, Test, TestRun},
};
use chrono::NaiveDateTime;
use indexmap::IndexMap;
use line::{LineClassifier, LineKind, extract_timestamp};
use std::time::Duration;
use tracing::debug;

/// The spec-introduction token used when none is configured.
pub const DEFAULT_SPEC_TOKEN: &str = "It";

/// Reconstructs a test run from raw log text, using the default spec token.
pub fn reconstruct(raw: &str) -> Result<TestRun, LogParseError> {
    Reconstructor::new(DEFAULT_SPEC_TOKEN).reconstruct(raw)
}

/// Reconstructs test runs from raw log text.
#[derive(Clone, Debug)]
pub struct Reconstructor {
    spec_token: String,
    classifier: LineClassifier,
}

impl Reconstructor {
    /// Creates a new reconstructor that recognizes tests by `[<spec_token>] ` in their header
    /// line, for example `[It] `.
    pub fn new(spec_token: impl Into<String>) -> Self {
        let spec_token = spec_token.into();
        let classifier = LineClassifier::new(&spec_token);
        Self {
            spec_token,
            classifier,
        }
    }

    /// Returns the spec token this reconstructor looks for.
    pub fn spec_token(&self) -> &str {
        &self.spec_token
    }

    /// Returns the short (display) name for a full test name.
    pub fn short_name<'a>(&self, full_name: &'a str) -> &'a str {
        self.classifier.short_name(full_name)
    }

    /// Reconstructs a test run from `raw`.
    ///
    /// Returns an error if `raw` contains text but not a single test marker.
    pub fn reconstruct(&self, raw: &str) -> Result<TestRun, LogParseError> {
        let mut machine = StateMachine::new();
        for line in raw.lines() {
            let kind = self.classifier.classify(line);
            machine.step(line, kind);
        }
        let tests = machine.finish();

        if tests.is_empty() && !raw.trim().is_empty() {
            return Err(LogParseError::NoTestMarkers {
                spec_token: self.spec_token.clone(),
            });
        }

        Ok(TestRun {
            full_logs: raw.to_owned(),
            tests,
        })
    }
}

/// The state of reconstruction between two lines.
#[derive(Debug)]
enum ParseState {
    /// No test has been seen yet.
    Idle,

    /// A test is known, but no attempt is open.
    InTest {
        /// Index of the test whose attempt was closed last.
        test: usize,
        /// True directly after a terminal marker, when Ginkgo may repeat the spec's name as a
        /// report trailer.
        trailer_pending: bool,
    },

    /// The closed test's name was repeated right after its terminal marker. This is either
    /// Ginkgo's report trailer, or a retry printed without a separator in between.
    ///
    /// The lines are held in `attempt` until a terminal or step marker shows it is a retry.
    TrailerCandidate { test: usize, attempt: OpenAttempt },

    /// A terminal marker was seen outside an attempt. Ginkgo's succinct layout prints it in
    /// front of the spec's name, so it belongs to the next test start.
    PendingTerminal { status: RunStatus, duration: Duration },

    /// An attempt is open.
    InAttempt { test: usize, attempt: OpenAttempt },

    /// An attempt is open, and so is an event within it.
    InEvent {
        test: usize,
        attempt: OpenAttempt,
        event: OpenEvent,
    },
}

struct StateMachine {
    state: ParseState,
    tests: IndexMap<String, Test>,
}

impl StateMachine {
    fn new() -> Self {
        Self {
            state: ParseState::Idle,
            tests: IndexMap::new(),
        }
    }

    fn step(&mut self, line: &str, kind: LineKind<'_>) {
        let state = std::mem::replace(&mut self.state, ParseState::Idle);
        self.state = self.transition(state, line, kind);
    }

    fn transition(&mut self, state: ParseState, line: &str, kind: LineKind<'_>) -> ParseState {
        match (state, kind) {
            (
                ParseState::InTest {
                    test,
                    trailer_pending: true,
                },
                LineKind::TestStart { name, .. },
            ) if self.tests[test].name == name => {
                let attempt_no = self.tests[test].attempts.len() + 1;
                ParseState::TrailerCandidate {
                    test,
                    attempt: OpenAttempt::new(attempt_no, name),
                }
            }

            // A terminal or a step can't be part of a trailer: the candidate was a retry.
            (
                ParseState::TrailerCandidate { test, attempt },
                LineKind::Terminal { status, duration },
            ) => {
                self.finish_attempt(test, attempt, None, status, duration);
                ParseState::InTest {
                    test,
                    trailer_pending: true,
                }
            }
            (ParseState::TrailerCandidate { test, mut attempt }, LineKind::EventStart { name }) => {
                let timestamp = attempt.push_line(line);
                ParseState::InEvent {
                    test,
                    attempt,
                    event: OpenEvent::new(name, timestamp),
                }
            }
            (ParseState::TrailerCandidate { test, .. }, LineKind::Separator) => {
                ParseState::InTest {
                    test,
                    trailer_pending: false,
                }
            }
            (ParseState::TrailerCandidate { test, mut attempt }, kind) => {
                if let LineKind::TestStart { name, short_name } = kind {
                    return self.open_attempt(name, short_name);
                }
                attempt.push_line(line);
                ParseState::TrailerCandidate { test, attempt }
            }

            (
                ParseState::PendingTerminal { status, duration },
                LineKind::TestStart { name, short_name },
            ) => {
                let mut state = self.open_attempt(name, short_name);
                if let ParseState::InAttempt { attempt, .. } = &mut state {
                    attempt.reported = Some((status, duration));
                }
                state
            }
            (ParseState::PendingTerminal { status, .. }, LineKind::Separator) => {
                debug!(
                    status = status.label(),
                    "discarding terminal status that is not followed by a test",
                );
                ParseState::Idle
            }
            (
                ParseState::PendingTerminal { status, .. },
                LineKind::Terminal {
                    status: next,
                    duration,
                },
            ) => {
                debug!(
                    status = status.label(),
                    "discarding terminal status replaced by another before any test",
                );
                ParseState::PendingTerminal {
                    status: next,
                    duration,
                }
            }
            (state @ ParseState::PendingTerminal { .. }, _) => state,

            (state, LineKind::TestStart { name, short_name }) => {
                self.close_implicitly(state);
                self.open_attempt(name, short_name)
            }

            (ParseState::InAttempt { test, attempt }, LineKind::Terminal { status, duration }) => {
                self.close_with_terminal(test, attempt, None, status, duration)
            }
            (
                ParseState::InEvent {
                    test,
                    attempt,
                    event,
                },
                LineKind::Terminal { status, duration },
            ) => self.close_with_terminal(test, attempt, Some(event), status, duration),

            // An attempt whose status was printed up front ends at the next separator.
            (ParseState::InAttempt { test, attempt }, LineKind::Separator)
                if attempt.reported.is_some() =>
            {
                self.close_implicitly(ParseState::InAttempt { test, attempt });
                ParseState::InTest {
                    test,
                    trailer_pending: false,
                }
            }
            (
                ParseState::InEvent {
                    test,
                    attempt,
                    event,
                },
                LineKind::Separator,
            ) if attempt.reported.is_some() => {
                self.close_implicitly(ParseState::InEvent {
                    test,
                    attempt,
                    event,
                });
                ParseState::InTest {
                    test,
                    trailer_pending: false,
                }
            }

            (ParseState::InAttempt { test, mut attempt }, LineKind::EventStart { name }) => {
                let timestamp = attempt.push_line(line);
                ParseState::InEvent {
                    test,
                    attempt,
                    event: OpenEvent::new(name, timestamp),
                }
            }
            (
                ParseState::InEvent {
                    test,
                    mut attempt,
                    event,
                },
                LineKind::EventStart { name },
            ) => {
                let fallback_end = attempt.last_seen;
                let timestamp = attempt.push_line(line);
                attempt.close_event(event, timestamp.or(fallback_end), RunStatus::Passed);
                ParseState::InEvent {
                    test,
                    attempt,
                    event: OpenEvent::new(name, timestamp),
                }
            }
            (
                ParseState::InEvent {
                    test,
                    mut attempt,
                    event,
                },
                LineKind::EventEnd,
            ) => {
                let fallback_end = attempt.last_seen;
                let timestamp = attempt.push_line(line);
                attempt.close_event(event, timestamp.or(fallback_end), RunStatus::Passed);
                ParseState::InAttempt { test, attempt }
            }
            (
                ParseState::InEvent {
                    test,
                    mut attempt,
                    mut event,
                },
                kind,
            ) => {
                if let LineKind::FailureNote { status } = kind {
                    event.set_status(status);
                }
                attempt.push_line(line);
                event.logs.push(line.to_owned());
                ParseState::InEvent {
                    test,
                    attempt,
                    event,
                }
            }
            (ParseState::InAttempt { test, mut attempt }, _) => {
                attempt.push_line(line);
                ParseState::InAttempt { test, attempt }
            }

            (
                ParseState::Idle | ParseState::InTest { .. },
                LineKind::Terminal { status, duration },
            ) => {
                debug!(
                    status = status.label(),
                    "terminal status outside an attempt, holding it for the next test",
                );
                ParseState::PendingTerminal { status, duration }
            }

            // Outside an attempt, lines are only part of the full log.
            (
                ParseState::InTest {
                    test,
                    trailer_pending,
                },
                _,
            ) => ParseState::InTest {
                test,
                trailer_pending: trailer_pending && line.trim().is_empty(),
            },
            (ParseState::Idle, _) => ParseState::Idle,
        }
    }

    fn open_attempt(&mut self, name: &str, short_name: &str) -> ParseState {
        let entry = self.tests.entry(name.to_owned());
        let test = entry.index();
        let test_data = entry.or_insert_with(|| Test {
            name: name.to_owned(),
            short_name: short_name.to_owned(),
            attempts: Vec::new(),
        });
        let attempt_no = test_data.attempts.len() + 1;
        ParseState::InAttempt {
            test,
            attempt: OpenAttempt::new(attempt_no, name),
        }
    }

    /// Handles a terminal marker inside an open attempt.
    fn close_with_terminal(
        &mut self,
        test: usize,
        attempt: OpenAttempt,
        event: Option<OpenEvent>,
        status: RunStatus,
        duration: Duration,
    ) -> ParseState {
        if let Some((reported, reported_duration)) = attempt.reported {
            // The open attempt already has its status, so this marker precedes the next test.
            self.finish_attempt(test, attempt, event, reported, reported_duration);
            return ParseState::PendingTerminal { status, duration };
        }
        self.finish_attempt(test, attempt, event, status, duration);
        ParseState::InTest {
            test,
            trailer_pending: true,
        }
    }

    fn finish_attempt(
        &mut self,
        test: usize,
        mut attempt: OpenAttempt,
        event: Option<OpenEvent>,
        status: RunStatus,
        duration: Duration,
    ) {
        let end_time = match attempt.attempt.start_time {
            Some(start) => chrono::TimeDelta::from_std(duration)
                .ok()
                .and_then(|delta| start.checked_add_signed(delta)),
            None => attempt.last_seen,
        };
        if let Some(event) = event {
            attempt.close_event(event, end_time, status);
        }
        attempt.attempt.status = status;
        attempt.attempt.duration = duration;
        attempt.attempt.end_time = end_time;
        self.tests[test].attempts.push(attempt.attempt);
    }

    /// Closes whatever is open without a terminal marker.
    ///
    /// An attempt whose status was printed before its name keeps that status. Anything else is
    /// closed as unknown.
    fn close_implicitly(&mut self, state: ParseState) {
        let (test, mut attempt, event) = match state {
            ParseState::Idle | ParseState::InTest { .. } | ParseState::TrailerCandidate { .. } => {
                return;
            }
            ParseState::PendingTerminal { status, .. } => {
                debug!(
                    status = status.label(),
                    "discarding terminal status that is not followed by a test",
                );
                return;
            }
            ParseState::InAttempt { test, attempt } => (test, attempt, None),
            ParseState::InEvent {
                test,
                attempt,
                event,
            } => (test, attempt, Some(event)),
        };

        if let Some((status, duration)) = attempt.reported {
            self.finish_attempt(test, attempt, event, status, duration);
            return;
        }

        debug!(
            name = %attempt.attempt.name,
            attempt_no = attempt.attempt.attempt_no,
            "attempt has no terminal status, closing it as unknown",
        );

        let end_time = attempt.last_seen;
        if let Some(event) = event {
            attempt.close_event(event, end_time, RunStatus::Unknown);
        }
        attempt.attempt.status = RunStatus::Unknown;
        attempt.attempt.end_time = end_time;
        attempt.attempt.duration = elapsed(attempt.attempt.start_time, end_time);
        self.tests[test].attempts.push(attempt.attempt);
    }

    fn finish(mut self) -> Vec<Test> {
        let state = std::mem::replace(&mut self.state, ParseState::Idle);
        self.close_implicitly(state);
        self.tests.into_values().collect()
    }
}

/// An attempt that has not seen its terminal marker yet.
#[derive(Debug)]
struct OpenAttempt {
    attempt: Attempt,
    last_seen: Option<NaiveDateTime>,
    // The status and duration printed before the test's name, in Ginkgo's succinct layout.
    reported: Option<(RunStatus, Duration)>,
}

impl OpenAttempt {
    fn new(attempt_no: usize, name: &str) -> Self {
        Self {
            attempt: Attempt {
                attempt_no,
                name: name.to_owned(),
                start_time: None,
                end_time: None,
                duration: Duration::ZERO,
                status: RunStatus::Unknown,
                logs: Vec::new(),
                events: Vec::new(),
            },
            last_seen: None,
            reported: None,
        }
    }

    /// Captures a line and tracks its timestamp, returning the timestamp if there was one.
    fn push_line(&mut self, line: &str) -> Option<NaiveDateTime> {
        let timestamp = extract_timestamp(line);
        if let Some(timestamp) = timestamp {
            self.attempt.start_time.get_or_insert(timestamp);
            self.last_seen = Some(timestamp);
        }
        self.attempt.logs.push(line.to_owned());
        timestamp
    }

    fn close_event(
        &mut self,
        event: OpenEvent,
        end_time: Option<NaiveDateTime>,
        fallback_status: RunStatus,
    ) {
        let OpenEvent {
            name,
            start_time,
            status,
            logs,
        } = event;
        self.attempt.events.push(Event {
            duration: elapsed(start_time, end_time),
            name,
            start_time,
            end_time,
            status: status.unwrap_or(fallback_status),
            logs,
        });
    }
}

#[derive(Debug)]
struct OpenEvent {
    name: String,
    start_time: Option<NaiveDateTime>,
    // Set at most once: the first failure note wins.
    status: Option<RunStatus>,
    logs: Vec<String>,
}

impl OpenEvent {
    fn new(name: &str, start_time: Option<NaiveDateTime>) -> Self {
        Self {
            name: name.to_owned(),
            start_time,
            status: None,
            logs: Vec::new(),
        }
    }

    fn set_status(&mut self, status: RunStatus) {
        self.status.get_or_insert(status);
    }
}

/// The non-negative time between two optional timestamps.
fn elapsed(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Duration {
    match (start, end) {
        (Some(start), Some(end)) => (end - start).to_std().unwrap_or_default(),
        _ => Duration::ZERO,
    }
}
