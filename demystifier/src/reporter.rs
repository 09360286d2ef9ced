// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering analysis results to stdout.

use crate::output::ReportStyles;
use demystifier_core::{
    flake::{FlakePattern, MatchResult},
    helpers::DisplayCompactDuration,
    model::{Attempt, RunStatus, Test},
    summary::TestSummary,
};
use owo_colors::{OwoColorize, Style};
use serde::Serialize;
use std::io::{self, Write};
use swrite::{SWrite, swrite};
use unicode_width::UnicodeWidthStr;

const HEADERS: [&str; 4] = [
    "TEST NAME",
    "NUM ATTEMPTS",
    "NUM FAILED",
    "AVERAGE RUN TIME",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

const ALIGNMENTS: [Align; 4] = [Align::Left, Align::Right, Align::Right, Align::Right];

/// A bordered table with one row per test summary.
pub(crate) struct SummaryTable<'a> {
    rows: Vec<[String; 4]>,
    failed: Vec<bool>,
    styles: &'a ReportStyles,
}

impl<'a> SummaryTable<'a> {
    pub(crate) fn new(summaries: &[TestSummary], styles: &'a ReportStyles) -> Self {
        let rows = summaries
            .iter()
            .map(|summary| {
                [
                    summary.short_name.clone(),
                    summary.attempts.to_string(),
                    summary.failed.to_string(),
                    DisplayCompactDuration(summary.average_duration).to_string(),
                ]
            })
            .collect();
        let failed = summaries.iter().map(|summary| summary.failed > 0).collect();
        Self {
            rows,
            failed,
            styles,
        }
    }

    fn column_widths(&self) -> [usize; 4] {
        let mut widths = HEADERS.map(UnicodeWidthStr::width);
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.width());
            }
        }
        widths
    }

    pub(crate) fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
        let widths = self.column_widths();

        let mut border = String::from("+");
        for width in widths {
            swrite!(border, "{}+", "-".repeat(width + 2));
        }

        writeln!(writer, "Test Summary Table:")?;
        writeln!(writer, "{}", border.style(self.styles.border))?;
        self.write_row(writer, &widths, &HEADERS, |_| self.styles.header)?;
        writeln!(writer, "{}", border.style(self.styles.border))?;
        for (row, &failed) in self.rows.iter().zip(&self.failed) {
            self.write_row(writer, &widths, row, |ix| {
                if ix == 2 && failed {
                    self.styles.failed
                } else {
                    Style::new()
                }
            })?;
        }
        writeln!(writer, "{}", border.style(self.styles.border))
    }

    fn write_row<S: AsRef<str>>(
        &self,
        writer: &mut dyn Write,
        widths: &[usize; 4],
        cells: &[S; 4],
        cell_style: impl Fn(usize) -> Style,
    ) -> io::Result<()> {
        let separator = "|".style(self.styles.border);
        write!(writer, "{separator}")?;
        for (ix, cell) in cells.iter().enumerate() {
            let cell = cell.as_ref();
            // Pad by display width, since multi-byte names are common in test titles.
            let padding = " ".repeat(widths[ix].saturating_sub(cell.width()));
            let padded = match ALIGNMENTS[ix] {
                Align::Left => format!("{cell}{padding}"),
                Align::Right => format!("{padding}{cell}"),
            };
            write!(writer, " {} {separator}", padded.style(cell_style(ix)))?;
        }
        writeln!(writer)
    }
}

/// The classification of one failed attempt.
#[derive(Debug)]
pub(crate) struct AttemptClassification<'run, 'p> {
    pub(crate) test: &'run Test,
    pub(crate) attempt: &'run Attempt,
    pub(crate) result: MatchResult<'p>,
}

/// The machine-readable form of an analysis.
#[derive(Debug, Serialize)]
pub(crate) struct JsonReport<'a> {
    summary: &'a [TestSummary],
    failed_attempts: Vec<JsonFailedAttempt<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonFailedAttempt<'a> {
    name: &'a str,
    short_name: &'a str,
    attempt_no: usize,
    status: RunStatus,
    duration_secs: f64,
    known_flakes: &'a [&'a FlakePattern],
    retry_recommended: bool,
}

impl<'a> JsonReport<'a> {
    pub(crate) fn new(
        summary: &'a [TestSummary],
        classifications: &'a [AttemptClassification<'a, 'a>],
    ) -> Self {
        let failed_attempts = classifications
            .iter()
            .map(|classification| JsonFailedAttempt {
                name: &classification.test.name,
                short_name: &classification.test.short_name,
                attempt_no: classification.attempt.attempt_no,
                status: classification.attempt.status,
                duration_secs: classification.attempt.duration.as_secs_f64(),
                known_flakes: &classification.result.matched,
                retry_recommended: classification.result.retry_recommended,
            })
            .collect();
        Self {
            summary,
            failed_attempts,
        }
    }

    pub(crate) fn write_to(&self, writer: &mut dyn Write) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer).map_err(serde_json::Error::io)
    }
}
