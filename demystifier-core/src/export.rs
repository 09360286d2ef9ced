// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Writing the logs captured for each attempt to their own files.

use crate::{
    errors::ExportError,
    model::{Attempt, TestRun},
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    fs::File,
    io::{BufWriter, Write},
};
use tracing::debug;

/// Returns the file name an attempt's logs are written to: the attempt name with every `/`
/// replaced by `_`, followed by `_<attempt no>.log`.
pub fn attempt_log_file_name(attempt: &Attempt) -> String {
    format!("{}_{}.log", attempt.name.replace('/', "_"), attempt.attempt_no)
}

/// Writes the log lines of `attempt` to a file inside `folder`, creating `folder` if necessary.
///
/// Each line is written as the concatenation of `prefixes`, then the line, then a newline. An
/// existing file at the destination is overwritten.
///
/// Returns the path of the written file.
pub fn dump_attempt_logs(
    attempt: &Attempt,
    folder: &Utf8Path,
    prefixes: &[&str],
) -> Result<Utf8PathBuf, ExportError> {
    std::fs::create_dir_all(folder).map_err(|error| ExportError::CreateDir {
        dir: folder.to_owned(),
        error,
    })?;

    let path = folder.join(attempt_log_file_name(attempt));
    let write_err = |error: std::io::Error| ExportError::Write {
        path: path.clone(),
        error,
    };

    let file = File::create(&path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    for line in &attempt.logs {
        for prefix in prefixes {
            writer.write_all(prefix.as_bytes()).map_err(write_err)?;
        }
        writer.write_all(line.as_bytes()).map_err(write_err)?;
        writer.write_all(b"\n").map_err(write_err)?;
    }
    writer.flush().map_err(write_err)?;

    debug!(
        "wrote {} log lines for attempt {} of `{}` to {path}",
        attempt.logs.len(),
        attempt.attempt_no,
        attempt.name,
    );
    Ok(path)
}

/// The outcome of exporting one attempt as part of [`dump_run`].
#[derive(Debug)]
pub struct AttemptExport<'a> {
    /// The attempt that was exported.
    pub attempt: &'a Attempt,

    /// The written path, or the error that prevented writing it.
    pub result: Result<Utf8PathBuf, ExportError>,
}

/// Writes the logs of every attempt in `run` to `folder`.
///
/// Each attempt's lines are prefixed with the attempt name followed by `": "`. A failure on one
/// attempt does not stop the others from being written; every outcome is returned in run order.
pub fn dump_run<'a>(run: &'a TestRun, folder: &Utf8Path) -> Vec<AttemptExport<'a>> {
    run.attempts()
        .map(|(_, attempt)| AttemptExport {
            attempt,
            result: dump_attempt_logs(attempt, folder, &[attempt.name.as_str(), ": "]),
        })
        .collect()
}
