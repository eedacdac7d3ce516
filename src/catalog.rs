//! Catalog.
//!
//! This module contains the catalog of embeddable Python packages scraped from the download page.

use crate::http::Fetch;
use crate::links::find_urls;
use reqwest::Url;
use std::fmt;
use tracing::{instrument, trace};

/// The architecture of an embeddable Python package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Arch {
    /// 32-bit x86
    Win32,
    /// 64-bit x86
    Amd64,
    /// 64-bit ARM
    Arm64,
    /// Anything else (the filename is kept)
    Other(String),
}

impl Arch {
    /// Derives the architecture from the filename of a package.
    pub(crate) fn from_filename(filename: &str) -> Self {
        let lower = filename.to_lowercase();
        if lower.contains("amd64") {
            Self::Amd64
        } else if lower.contains("win32") {
            Self::Win32
        } else if lower.contains("arm64") {
            Self::Arm64
        } else {
            Self::Other(filename.to_string())
        }
    }

    /// Returns the token used in filenames.
    pub(crate) fn token(&self) -> &str {
        match self {
            Self::Win32 => "win32",
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
            Self::Other(filename) => filename,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// One downloadable embeddable Python package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EmbedPython {
    /// The (absolute) download URL.
    pub(crate) url: String,
    /// The filename part of the URL.
    pub(crate) filename: String,
    /// The architecture derived from the filename.
    pub(crate) arch: Arch,
}

/// Ordered mapping from version to the packages available for that version.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Catalog {
    entries: Vec<(String, Vec<EmbedPython>)>,
}

impl Catalog {
    /// Fetches the given page and builds the catalog from its links.
    #[instrument(level = "trace", skip(fetcher))]
    pub(crate) fn fetch(fetcher: &dyn Fetch, page_url: &str) -> anyhow::Result<Self> {
        let page = fetcher.fetch_text(page_url)?;
        let base = Url::parse(page_url)?;

        Ok(Self::from_html(&base, &page))
    }

    /// Builds the catalog from the links of the given page.
    ///
    /// Relative links are resolved against `base`.
    pub(crate) fn from_html(base: &Url, html: &str) -> Self {
        let mut catalog = Self::default();
        for href in find_urls(html) {
            let Ok(url) = base.join(href) else {
                trace!(href, "skipping unparsable link");
                continue;
            };
            if let Some((version, embed_python)) = Self::parse_link(&url) {
                catalog.insert(version, embed_python);
            }
        }

        catalog
    }

    // Returns the version and the package if the link points to an embeddable Python package.
    #[doc(hidden)]
    fn parse_link(url: &Url) -> Option<(String, EmbedPython)> {
        let path = url.path();
        let filename = path.rsplit('/').next()?;
        if !(filename.contains("embed") && filename.ends_with(".zip")) {
            return None;
        }

        // e.g. /ftp/python/3.8.10/python-3.8.10-embed-amd64.zip
        let version = path.split('-').nth(1)?;
        let embed_python = EmbedPython {
            url: url.to_string(),
            filename: filename.to_string(),
            arch: Arch::from_filename(filename),
        };

        Some((version.to_string(), embed_python))
    }

    // Appends the package to the given version (keeps first-seen order).
    #[doc(hidden)]
    fn insert(&mut self, version: String, embed_python: EmbedPython) {
        match self.entries.iter_mut().find(|(v, _)| *v == version) {
            Some((_, list)) => list.push(embed_python),
            None => self.entries.push((version, vec![embed_python])),
        }
    }

    /// Returns the packages for the given version.
    pub(crate) fn get(&self, version: &str) -> Option<&[EmbedPython]> {
        self.entries.iter().find(|(v, _)| v == version).map(|(_, list)| list.as_slice())
    }

    /// Returns the first package for the given version and architecture.
    pub(crate) fn select(&self, version: &str, arch: &Arch) -> Option<&EmbedPython> {
        self.get(version)?.iter().find(|embed_python| embed_python.arch == *arch)
    }

    /// Returns all versions in first-seen order.
    pub(crate) fn versions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(v, _)| v.as_str())
    }
}
