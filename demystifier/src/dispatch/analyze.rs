// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::ConfigOpts;
use crate::{
    ExpectedError, Result, log_url,
    output::{OutputContext, OutputWriter},
    reporter::{AttemptClassification, JsonReport, SummaryTable},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use demystifier_core::{
    errors::DisplayErrorChain,
    export::dump_run,
    flake::{FlakePatterns, classify_attempt},
    helpers::{DisplayCompactDuration, plural},
    model::{RunStatus, TestRun},
    reconstruct::Reconstructor,
    summary::summarize_with_threshold,
};
use std::io::{Read, Write};
use tracing::{debug, error, info, warn};

const STDIN_PATH: &str = "-";

#[derive(Debug, Args)]
pub(super) struct AnalyzeOpts {
    /// Path to a build log, or `-` to read it from standard input
    #[arg(value_name = "LOG")]
    log: String,

    /// Also log attempts that passed
    #[arg(long, short = 's')]
    show_passing: bool,

    /// Directory of flake pattern files, overriding the config
    #[arg(long, value_name = "DIR", env = "DEMYSTIFIER_PATTERNS_DIR")]
    patterns_dir: Option<Utf8PathBuf>,

    /// Write each attempt's log lines to a file in DIR instead of printing the summary
    #[arg(long, short = 'f', value_name = "DIR")]
    dump_logs: Option<Utf8PathBuf>,

    /// Output format for the summary
    #[arg(long, value_enum, default_value_t, value_name = "FORMAT")]
    message_format: MessageFormat,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum MessageFormat {
    /// A table for humans
    #[default]
    Human,
    /// JSON, including the flake classification of each failed attempt
    Json,
}

impl AnalyzeOpts {
    pub(super) fn exec(
        self,
        config_opts: &ConfigOpts,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        if log_url::is_prow_url(&self.log) {
            return Err(ExpectedError::RemoteLogUnsupported {
                log_url: log_url::resolve(&self.log),
                url: self.log,
            });
        }

        let mut config = config_opts.make_config()?;
        if let Some(patterns_dir) = &self.patterns_dir {
            config.set_patterns_dir(patterns_dir.clone());
        }

        let (path, raw) = self.read_log()?;
        debug!("read {} bytes from `{path}`", raw.len());

        let run = Reconstructor::new(config.spec_token())
            .reconstruct(&raw)
            .map_err(|err| ExpectedError::log_parse_error(path.clone(), err))?;
        self.log_attempts(&run);

        let patterns = FlakePatterns::load(config.patterns_dir())?;
        let classifications = classify_failures(&run, &patterns);

        if let Some(folder) = &self.dump_logs {
            return dump_logs(&run, folder);
        }

        let summaries = summarize_with_threshold(&run, config.slow_threshold());
        let mut writer = output_writer.stdout_writer();
        match self.message_format {
            MessageFormat::Human => {
                let styles = output.stdout_styles();
                SummaryTable::new(&summaries, &styles)
                    .write_to(&mut writer)
                    .map_err(|err| ExpectedError::WriteOutputError { err })?;
            }
            MessageFormat::Json => {
                JsonReport::new(&summaries, &classifications)
                    .write_to(&mut writer)
                    .map_err(|err| ExpectedError::SerializeError { err })?;
            }
        }
        writer
            .flush()
            .map_err(|err| ExpectedError::WriteOutputError { err })?;

        Ok(0)
    }

    fn read_log(&self) -> Result<(Utf8PathBuf, String)> {
        let path = Utf8PathBuf::from(&self.log);
        let raw = if self.log == STDIN_PATH {
            let mut raw = String::new();
            std::io::stdin()
                .lock()
                .read_to_string(&mut raw)
                .map(|_| raw)
        } else {
            std::fs::read_to_string(&path)
        };
        match raw {
            Ok(raw) => Ok((path, raw)),
            Err(err) => Err(ExpectedError::log_read_error(path, err)),
        }
    }

    fn log_attempts(&self, run: &TestRun) {
        info!(
            "reconstructed {} {} from the log",
            run.tests.len(),
            plural::tests_str(run.tests.len()),
        );

        for test in &run.tests {
            for attempt in &test.attempts {
                let time = DisplayCompactDuration(attempt.duration);
                if attempt.status.is_failure() {
                    error!(
                        name = %test.short_name,
                        no = attempt.attempt_no,
                        time = %time,
                        "{} attempt run",
                        attempt.status.label(),
                    );
                } else if attempt.status == RunStatus::Unknown {
                    warn!(
                        name = %test.short_name,
                        no = attempt.attempt_no,
                        "attempt has no final status, the log may be truncated",
                    );
                } else if self.show_passing {
                    info!(
                        name = %test.short_name,
                        no = attempt.attempt_no,
                        time = %time,
                        "{} attempt run",
                        attempt.status.label(),
                    );
                }
            }

            let failed = test.failed_attempts().count();
            if failed > 0 {
                info!(
                    name = %test.name,
                    failed,
                    flaky = test.is_flaky(),
                    "test summary: {failed} of {} {} failed",
                    test.attempts.len(),
                    plural::attempts_str(test.attempts.len()),
                );
            }
        }
    }
}

/// Classifies every failed attempt in `run`, logging what was found.
///
/// With no patterns configured, every attempt is returned unmatched and nothing is logged.
fn classify_failures<'a>(
    run: &'a TestRun,
    patterns: &'a FlakePatterns,
) -> Vec<AttemptClassification<'a, 'a>> {
    let classifications: Vec<_> = run
        .failed_attempts()
        .map(|(test, attempt)| AttemptClassification {
            test,
            attempt,
            result: classify_attempt(attempt, patterns),
        })
        .collect();

    if patterns.is_empty() {
        debug!("no flake patterns configured, skipping classification");
        return classifications;
    }

    for classification in &classifications {
        let AttemptClassification {
            test,
            attempt,
            result,
        } = classification;
        if !result.is_known_flake() {
            warn!(
                name = %test.short_name,
                no = attempt.attempt_no,
                "failure does not match any known flake",
            );
            continue;
        }
        for pattern in &result.matched {
            info!(
                name = %test.short_name,
                no = attempt.attempt_no,
                issue = %pattern.issue,
                "known flake: {}",
                pattern.description,
            );
        }
        if result.retry_recommended {
            info!(name = %test.short_name, no = attempt.attempt_no, "retry recommended");
        } else {
            warn!(
                name = %test.short_name,
                no = attempt.attempt_no,
                "known flake, but all matching patterns ask not to retry",
            );
        }
    }

    let known = classifications
        .iter()
        .filter(|classification| classification.result.is_known_flake())
        .count();
    info!(
        "{known} of {} failed {} matched known flakes ({} {} loaded)",
        classifications.len(),
        plural::attempts_str(classifications.len()),
        patterns.len(),
        plural::patterns_str(patterns.len()),
    );

    classifications
}

fn dump_logs(run: &TestRun, folder: &Utf8Path) -> Result<i32> {
    let exports = dump_run(run, folder);
    let total = exports.len();
    let mut failed = 0;
    for export in &exports {
        if let Err(err) = &export.result {
            warn!("{}", DisplayErrorChain::new(err));
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(ExpectedError::ExportFailed { failed, total });
    }

    info!(
        "wrote {total} attempt log {} to `{folder}`",
        plural::files_str(total),
    );
    Ok(0)
}
