// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Result;
use demystifier_core::export::{dump_attempt_logs, dump_run};
use pretty_assertions::assert_eq;

#[test]
fn slashes_in_names_are_flattened() -> Result<()> {
    let run = build_log_run();
    let mongo = run.test(MONGO_TEST).expect("Mongo test is present");
    let dir = Utf8TempDir::new()?;

    let path = dump_attempt_logs(&mongo.attempts[0], dir.path(), &["> "])?;
    assert_eq!(
        path,
        dir.path()
            .join("Backup restore DataMover [It] MongoDB app with Kopia_restic_1.log")
    );

    let contents = std::fs::read_to_string(&path)?;
    let expected: String = mongo.attempts[0]
        .logs
        .iter()
        .map(|line| format!("> {line}\n"))
        .collect();
    assert_eq!(contents, expected);
    assert_eq!(
        contents.lines().next(),
        Some("> /alabama/cspi/e2e/datamover_suite_test.go:88")
    );
    Ok(())
}

#[test]
fn whole_run_is_exported() -> Result<()> {
    let run = build_log_run();
    let dir = Utf8TempDir::new()?;

    let exports = dump_run(&run, dir.path());
    assert_eq!(exports.len(), 5);

    let mut file_names = Vec::new();
    for export in &exports {
        let path = export.result.as_ref().expect("every attempt is written");
        file_names.push(path.file_name().expect("has a file name").to_owned());
    }
    assert_eq!(
        file_names,
        [
            format!("{MYSQL_TEST}_1.log"),
            format!("{MYSQL_TEST}_2.log"),
            format!("{MYSQL_TEST}_3.log"),
            "Backup restore DataMover [It] MongoDB app with Kopia_restic_1.log".to_owned(),
            format!("{HOOKS_TEST}_1.log"),
        ]
    );

    let hooks = std::fs::read_to_string(dir.path().join(format!("{HOOKS_TEST}_1.log")))?;
    assert_eq!(
        hooks,
        format!("{HOOKS_TEST}: /alabama/cspi/e2e/hooks_suite_test.go:40\n")
    );
    Ok(())
}
