//! Configuration.
//!
//! This module contains the (optional) configuration read from a YAML file.

use crate::vars::VarExpander;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Name of the default configuration file.
pub(crate) const CONFIG_FILENAME: &str = "pystand-init.yml";

/// User agent sent with every request.
pub(crate) const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_12_6) AppleWebKit/603.3.8 (KHTML, like Gecko) Version/10.1.2 Safari/603.3.8";

/// The struct that holds the configuration loaded from a YAML file.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub(crate) struct Config {
    /// The cache directory for downloaded archives.
    pub(crate) download_dir: String,
    /// The scratch directory for extracted archives.
    pub(crate) build_dir: String,
    /// The directory that receives the bundles.
    pub(crate) publish_dir: String,
    /// The URL template for the launcher archive (`${version}` and `${filename}` are available).
    pub(crate) launcher_url: String,
    /// The page that lists the embeddable Python packages.
    pub(crate) python_index_url: String,
    /// The URL of the pip bootstrap script.
    pub(crate) get_pip_url: String,
    /// The user agent sent with every request.
    #[serde(deserialize_with = "non_empty_deser")]
    pub(crate) user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: "download".to_string(),
            build_dir: "build".to_string(),
            publish_dir: "publish".to_string(),
            launcher_url: "https://github.com/skywind3000/PyStand/releases/download/${version}/${filename}".to_string(),
            python_index_url: "https://www.python.org/downloads/windows/".to_string(),
            get_pip_url: "https://bootstrap.pypa.io/get-pip.py".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration from the given filename.
    #[instrument(err, level = "trace")]
    pub(crate) fn load_from_file<P>(filename: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path> + std::fmt::Debug,
    {
        let content = fs::read_to_string(filename)?;
        // an empty file is a valid (default) configuration
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content)?;

        Ok(config)
    }

    /// Loads the configuration from the given filename or falls back to the defaults.
    ///
    /// The fallback only applies if the file was not requested explicitly.
    pub(crate) fn load_or_default(filename: &Path, explicit: bool) -> anyhow::Result<Self> {
        if !explicit && !filename.exists() {
            return Ok(Self::default());
        }

        Self::load_from_file(filename)
    }

    /// Resolves the configured directories against the given base directory.
    pub(crate) fn layout(&self, basedir: &Path) -> anyhow::Result<Layout> {
        let expander = VarExpander::env_only();
        let resolve = |dir: &str| -> anyhow::Result<PathBuf> { Ok(basedir.join(&*expander.expand(dir)?)) };

        Ok(Layout {
            download_dir: resolve(&self.download_dir)?,
            build_dir: resolve(&self.build_dir)?,
            publish_dir: resolve(&self.publish_dir)?,
        })
    }
}

// Rejects blank strings.
#[doc(hidden)]
fn non_empty_deser<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value.trim().is_empty() {
        return Err(serde::de::Error::custom("must not be empty"));
    }

    Ok(value)
}

/// The directories used during a run.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Layout {
    /// The cache directory for downloaded archives.
    pub(crate) download_dir: PathBuf,
    /// The scratch directory for extracted archives.
    pub(crate) build_dir: PathBuf,
    /// The directory that receives the bundles.
    pub(crate) publish_dir: PathBuf,
}
