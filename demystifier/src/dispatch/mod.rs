// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level application and command routing.

mod analyze;

use crate::{
    Result, log_url,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use analyze::AnalyzeOpts;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Subcommand};
use demystifier_core::config::DemystifierConfig;
use std::{collections::BTreeSet, io::Write};
use tracing::warn;

/// Reconstructs Ginkgo test runs from CI build logs, and explains their failures.
#[derive(Debug, clap::Parser)]
#[command(
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct DemystifierApp {
    #[clap(flatten)]
    output: OutputOpts,

    #[clap(flatten)]
    config_opts: ConfigOpts,

    #[clap(subcommand)]
    command: Command,
}

impl DemystifierApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Analyze(opts) => opts.exec(&self.config_opts, output, output_writer),
            Command::LogUrl { url } => {
                let mut writer = output_writer.stdout_writer();
                writeln!(writer, "{}", log_url::resolve(&url))
                    .and_then(|()| writer.flush())
                    .map_err(|err| crate::ExpectedError::WriteOutputError { err })?;
                Ok(0)
            }
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Reconstruct a build log, then summarize it or export its attempt logs.
    Analyze(AnalyzeOpts),

    /// Print the build log URL for a Prow job page.
    ///
    /// Anything that is not a Prow job page is printed unchanged.
    LogUrl {
        /// The Prow job page, for example https://prow.ci.openshift.org/view/gs/...
        #[arg(value_name = "URL")]
        url: String,
    },
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Config options")]
struct ConfigOpts {
    /// Config file [default: .config/demystifier.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    /// Loads the config relative to the current directory.
    fn make_config(&self) -> Result<DemystifierConfig> {
        let config = DemystifierConfig::from_sources(
            Utf8Path::new("."),
            self.config_file.as_deref(),
            warn_unknown_config_keys,
        )?;
        Ok(config)
    }
}

fn warn_unknown_config_keys(config_file: &Utf8Path, unknown: &BTreeSet<String>) {
    let mut unknown_str = String::new();
    if let [key] = unknown.iter().collect::<Vec<_>>().as_slice() {
        unknown_str.push_str("key: ");
        unknown_str.push_str(key);
    } else {
        unknown_str.push_str("keys:\n");
        for key in unknown {
            unknown_str.push_str("\n  - ");
            unknown_str.push_str(key);
        }
    }

    warn!("in config file {config_file}, ignoring unknown configuration {unknown_str}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DemystifierExitCode, ExpectedError};
    use camino_tempfile::Utf8TempDir;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn fixtures_dir() -> Utf8PathBuf {
        Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .expect("the CLI crate is inside the workspace")
            .join("fixtures")
    }

    fn build_log() -> String {
        fixtures_dir().join("buildlog/build-log.txt").into_string()
    }

    fn run(args: &[&str]) -> (Result<i32>, String) {
        let app = DemystifierApp::try_parse_from(
            ["demystifier", "--color", "never"].iter().chain(args).copied(),
        )
        .unwrap();
        let output = app.init_output();
        let mut writer = OutputWriter::Test { stdout: Vec::new() };
        let result = app.exec(output, &mut writer);
        let OutputWriter::Test { stdout } = writer else {
            unreachable!("writer was constructed as a test writer");
        };
        (result, String::from_utf8(stdout).unwrap())
    }

    #[test]
    fn analyze_prints_summary_table() {
        let (result, stdout) = run(&["analyze", &build_log()]);
        assert_eq!(result.unwrap(), DemystifierExitCode::OK);

        let lines: Vec<_> = stdout.lines().collect();
        assert_eq!(lines[0], "Test Summary Table:");
        assert!(lines[2].contains("TEST NAME"));
        // Rows are sorted by average duration, so the hooks test comes first.
        assert!(lines[4].contains("Verify hooks are skipped"), "{stdout}");
        assert!(lines[6].contains("MySQL application two Vol CSI"), "{stdout}");
        assert!(lines[6].contains("|            3 |          2 |"), "{stdout}");
    }

    #[test]
    fn analyze_json_reports_classifications() {
        let patterns = fixtures_dir().join("patterns/retry");
        let (result, stdout) = run(&[
            "analyze",
            &build_log(),
            "--patterns-dir",
            patterns.as_str(),
            "--message-format",
            "json",
        ]);
        assert_eq!(result.unwrap(), DemystifierExitCode::OK);

        let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        assert_eq!(report["summary"].as_array().unwrap().len(), 3);
        let failed = report["failed_attempts"].as_array().unwrap();
        assert_eq!(failed.len(), 2);
        for attempt in failed {
            assert_eq!(attempt["status"], "failed");
            assert_eq!(attempt["retry_recommended"], true);
            assert_eq!(attempt["known_flakes"].as_array().unwrap().len(), 1);
        }
    }

    #[test]
    fn analyze_json_skip_retry_patterns() {
        let patterns = fixtures_dir().join("patterns/skipretry");
        let (result, stdout) = run(&[
            "analyze",
            &build_log(),
            "--patterns-dir",
            patterns.as_str(),
            "--message-format",
            "json",
        ]);
        assert_eq!(result.unwrap(), DemystifierExitCode::OK);

        let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
        let failed = report["failed_attempts"].as_array().unwrap();
        assert_eq!(failed.len(), 2);
        for attempt in failed {
            assert_eq!(attempt["known_flakes"].as_array().unwrap().len(), 1);
            assert_eq!(attempt["retry_recommended"], false);
        }
    }

    #[test]
    fn analyze_dumps_logs_instead_of_summary() {
        let dir = Utf8TempDir::new().unwrap();
        let out = dir.path().join("logs");
        let (result, stdout) = run(&["analyze", &build_log(), "--dump-logs", out.as_str()]);
        assert_eq!(result.unwrap(), DemystifierExitCode::OK);
        assert_eq!(stdout, "");
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 5);
    }

    #[test]
    fn analyze_rejects_remote_logs() {
        let url = "https://prow.ci.openshift.org/view/gs/test-platform-results/logs/\
                   periodic-ci-openshift-oadp-operator-oadp-1.4-4.16-e2e-test-aws/1";
        let (result, stdout) = run(&["analyze", url]);
        let err = result.unwrap_err();
        assert_eq!(
            err.process_exit_code(),
            DemystifierExitCode::REMOTE_LOG_UNSUPPORTED
        );
        match err {
            ExpectedError::RemoteLogUnsupported { log_url, .. } => {
                assert!(log_url.ends_with("/artifacts/4.16-e2e-test-aws/e2e/build-log.txt"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stdout, "");
    }

    #[test]
    fn analyze_missing_log_is_an_error() {
        let dir = Utf8TempDir::new().unwrap();
        let missing = dir.path().join("missing.txt");
        let (result, _) = run(&["analyze", missing.as_str()]);
        assert!(matches!(
            result,
            Err(ExpectedError::LogReadError { ref path, .. }) if *path == missing
        ));
    }

    #[test]
    fn analyze_log_without_tests_is_an_error() {
        let dir = Utf8TempDir::new().unwrap();
        let log = dir.path().join("build-log.txt");
        std::fs::write(&log, "go: downloading modules\nmake: *** [test-e2e] Error 1\n").unwrap();
        let (result, _) = run(&["analyze", log.as_str()]);
        assert!(matches!(result, Err(ExpectedError::LogParseError { .. })));
    }

    #[test]
    fn log_url_prints_resolved_url() {
        let (result, stdout) = run(&["log-url", "build-log.txt"]);
        assert_eq!(result.unwrap(), DemystifierExitCode::OK);
        assert_eq!(stdout, "build-log.txt\n");
    }
}
