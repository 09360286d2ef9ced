// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping Prow job pages to their build log artifacts.

use regex::Regex;
use std::sync::LazyLock;

const PROW_VIEW_PREFIX: &str = "https://prow.ci.openshift.org/view/gs/";
const GCSWEB_PREFIX: &str = "https://gcsweb-ci.apps.ci.l2s4.p1.openshiftapps.com/gcs/";

// The job's release component, for example `-4.14-` in
// `pull-ci-openshift-oadp-operator-master-4.14-e2e-test-aws`.
static RELEASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d+\.\d+-").expect("release regex is valid"));

/// Returns true if `input` looks like a Prow job page rather than a local path.
pub(crate) fn is_prow_url(input: &str) -> bool {
    input.starts_with(PROW_VIEW_PREFIX)
}

/// Returns the URL of the `build-log.txt` artifact for a Prow job page.
///
/// Returns `None` if `url` is not a Prow job page, or if the job name has no release component to
/// derive the artifact directory from.
pub(crate) fn build_log_url(url: &str) -> Option<String> {
    let path = url.strip_prefix(PROW_VIEW_PREFIX)?.trim_end_matches('/');

    // The path ends with `<job name>/<build id>`.
    let mut segments = path.rsplit('/');
    let _build_id = segments.next()?;
    let job_name = segments.next()?;

    let release = RELEASE_RE.find(job_name)?;
    let target = &job_name[release.end()..];
    if target.is_empty() {
        return None;
    }

    Some(format!(
        "{GCSWEB_PREFIX}{path}/artifacts/{target}/e2e/build-log.txt"
    ))
}

/// Resolves a user-supplied log location: Prow job pages map to their build log artifact, and
/// anything else is returned unchanged.
pub(crate) fn resolve(input: &str) -> String {
    build_log_url(input).unwrap_or_else(|| input.to_owned())
}
