// Copyright (c) The demystifier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for demystifier.
//!
//! Configuration is layered: the embedded [default config](DemystifierConfig::DEFAULT_CONFIG) is
//! read first, and a user config file is layered on top of it.

use crate::{errors::ConfigParseError, reconstruct::DEFAULT_SPEC_TOKEN, summary};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{collections::BTreeSet, time::Duration};

/// Overall configuration for demystifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DemystifierConfig {
    spec_token: String,
    patterns_dir: Option<Utf8PathBuf>,
    slow_threshold: Duration,
}

impl DemystifierConfig {
    /// The default location of the config within a directory: `.config/demystifier.toml`.
    pub const CONFIG_PATH: &'static str = ".config/demystifier.toml";

    /// Contains the default config as a TOML file.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from `config_file`, or if not specified from `.config/demystifier.toml`
    /// within `dir`, if it exists.
    ///
    /// `unknown_callback` is called with the config file and the set of keys that were not
    /// recognized, if there were any.
    pub fn from_sources(
        dir: &Utf8Path,
        config_file: Option<&Utf8Path>,
        mut unknown_callback: impl FnMut(&Utf8Path, &BTreeSet<String>),
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = dir.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (config, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|err| ConfigParseError::new(&config_file, err))?;
        if !unknown.is_empty() {
            unknown_callback(&config_file, &unknown);
        }

        // The default config does not set a patterns directory, so any value came from the file.
        let config_dir = config_file.parent().unwrap_or(dir);
        Ok(Self {
            spec_token: config.parser.spec_token,
            patterns_dir: config
                .flakes
                .patterns_dir
                .map(|patterns_dir| config_dir.join(patterns_dir)),
            slow_threshold: config.summary.slow_threshold,
        })
    }

    /// Returns the config with all defaults, ignoring any files.
    pub fn default_config() -> Self {
        Self {
            spec_token: DEFAULT_SPEC_TOKEN.to_owned(),
            patterns_dir: None,
            slow_threshold: summary::DEFAULT_SLOW_THRESHOLD,
        }
    }

    /// Returns the Ginkgo node type that introduces a spec.
    pub fn spec_token(&self) -> &str {
        &self.spec_token
    }

    /// Returns the directory flake patterns are loaded from, if configured.
    pub fn patterns_dir(&self) -> Option<&Utf8Path> {
        self.patterns_dir.as_deref()
    }

    /// Returns the threshold above which attempts count as slow in the summary.
    pub fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }

    /// Overrides the patterns directory, for example from the command line.
    pub fn set_patterns_dir(&mut self, patterns_dir: impl Into<Utf8PathBuf>) {
        self.patterns_dir = Some(patterns_dir.into());
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(DemystifierConfigDeserialize, BTreeSet<String>), ConfigError> {
        let config = builder.build_cloned()?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config = DemystifierConfigDeserialize::deserialize(ignored_de)?;

        Ok((config, ignored))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DemystifierConfigDeserialize {
    parser: ParserConfig,
    flakes: FlakesConfig,
    summary: SummaryConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ParserConfig {
    spec_token: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct FlakesConfig {
    #[serde(default)]
    patterns_dir: Option<Utf8PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SummaryConfig {
    #[serde(with = "humantime_serde")]
    slow_threshold: Duration,
}
