// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use demystifier_core::flake::{FlakePatterns, classify, decode_patterns, encode_patterns};
use pretty_assertions::assert_eq;

#[test]
fn whole_log_matches_retry_patterns() -> Result<()> {
    let patterns = FlakePatterns::load(Some(patterns_dir("retry").as_path()))?;
    let result = classify(&build_log(), &patterns);

    let searches: Vec<_> = result
        .matched
        .iter()
        .map(|p| p.string_search_pattern.as_str())
        .collect();
    assert_eq!(
        searches,
        [
            "Failed to check and update snapshot content: failed to remove VolumeSnapshotBeingCreated annotation on the content snapcontent-",
            MYSQL_TEST,
        ]
    );
    ensure!(result.retry_recommended, "retry is recommended");
    Ok(())
}

#[test]
fn skip_retry_patterns_never_recommend_retry() -> Result<()> {
    let patterns = FlakePatterns::load(Some(patterns_dir("skipretry").as_path()))?;
    assert_eq!(patterns.len(), 3);

    let result = classify(&build_log(), &patterns);
    assert_eq!(result.matched.len(), 2);
    ensure!(result.is_known_flake(), "known flakes are still reported");
    ensure!(!result.retry_recommended, "no retry for skip_retry patterns");
    Ok(())
}

#[test]
fn load_is_flat_and_ordered() -> Result<()> {
    let patterns = FlakePatterns::load(Some(patterns_dir("multi").as_path()))?;
    let issues: Vec<_> = patterns.patterns().iter().map(|p| p.issue.as_str()).collect();
    assert_eq!(
        issues,
        [
            "https://issues.redhat.com/browse/OADP-1057",
            "https://issues.redhat.com/browse/OADP-1201",
            "https://issues.redhat.com/browse/OADP-2417",
            "https://issues.redhat.com/browse/OADP-2420",
        ]
    );
    ensure!(
        patterns.patterns().iter().all(|p| !p.skip_retry),
        "skip_retry defaults to false"
    );

    let result = classify(&build_log(), &patterns);
    assert_eq!(result.matched.len(), 1);
    Ok(())
}

#[test]
fn fixture_patterns_round_trip() -> Result<()> {
    for name in ["retry", "skipretry"] {
        let path = patterns_dir(name).join("flakes.json");
        let decoded = decode_patterns(&std::fs::read_to_string(&path)?)?;
        let reencoded = encode_patterns(&decoded)?;
        assert_eq!(decode_patterns(&reencoded)?, decoded, "{path} round-trips");
    }
    Ok(())
}
