// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use demystifier_core::{model::TestRun, reconstruct::reconstruct};
use std::sync::LazyLock;

pub(crate) const MYSQL_TEST: &str =
    "Backup and restore tests Backup and restore applications [It] MySQL application two Vol CSI";
pub(crate) const MONGO_TEST: &str = "Backup restore DataMover [It] MongoDB app with Kopia/restic";
pub(crate) const HOOKS_TEST: &str = "Backup hooks tests [It] Verify hooks are skipped";

pub(crate) static FIXTURES_DIR: LazyLock<Utf8PathBuf> = LazyLock::new(|| {
    Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("the core crate lives inside the workspace")
        .join("fixtures")
});

pub(crate) fn build_log() -> String {
    let path = FIXTURES_DIR.join("buildlog/build-log.txt");
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("failed to read {path}: {err}"))
}

pub(crate) fn build_log_run() -> TestRun {
    reconstruct(&build_log()).expect("the fixture build log has test markers")
}

pub(crate) fn patterns_dir(name: &str) -> Utf8PathBuf {
    FIXTURES_DIR.join("patterns").join(name)
}
