//! Download.
//!
//! This module contains the code to download PyStand, the embeddable Python and `get-pip.py`
//! into the download cache. Files already present in the cache are never downloaded again.

use crate::bundle::Bitness;
use crate::catalog::{Arch, Catalog};
use crate::colors::*;
use crate::error::BootstrapError;
use crate::http::Fetch;
use crate::vars::{SimpleVarResolver, VarExpander, VarResolver};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Filename of the pip bootstrap script.
pub(crate) const GET_PIP_FILENAME: &str = "get-pip.py";

/// Strips a leading `v` or `V` from the given version.
pub(crate) fn strip_v(version: &str) -> &str {
    version.strip_prefix(['v', 'V']).unwrap_or(version)
}

/// Returns the filename of the PyStand archive.
pub(crate) fn launcher_filename(version: &str) -> String {
    format!("PyStand-v{}-exe.zip", strip_v(version))
}

/// Returns the filename of the embeddable Python archive.
pub(crate) fn runtime_filename(version: &str, arch: &Arch) -> String {
    format!("python-{version}-embed-{arch}.zip")
}

/// The URLs the downloader retrieves files from.
#[derive(Clone, Debug)]
pub(crate) struct Endpoints {
    /// The URL template for the PyStand archive.
    pub(crate) launcher_url: String,
    /// The page that lists the embeddable Python packages.
    pub(crate) python_index_url: String,
    /// The URL of `get-pip.py`.
    pub(crate) get_pip_url: String,
}

/// The downloader fills the download cache.
pub(crate) struct Downloader<'a> {
    fetcher: &'a dyn Fetch,
    endpoints: Endpoints,
    target_dir: PathBuf,
}

impl<'a> Downloader<'a> {
    /// Creates a new `Downloader` for the given cache directory.
    pub(crate) fn new(fetcher: &'a dyn Fetch, endpoints: Endpoints, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            endpoints,
            target_dir: target_dir.into(),
        }
    }

    /// Downloads the PyStand archive (if not cached yet) and returns its path.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn launcher(&self, version: &str) -> anyhow::Result<PathBuf> {
        let version = strip_v(version);
        let filename = launcher_filename(version);
        let path = self.target_dir.join(&filename);
        if path.is_file() {
            debug!(path = %path.display(), "using cached launcher");
            return Ok(path);
        }

        self.ensure_target_dir()?;
        let mut resolver = SimpleVarResolver::default();
        resolver.insert("version", version).insert("filename", &filename);
        let resolvers: Vec<Box<dyn VarResolver>> = vec![Box::new(resolver)];
        let expander = VarExpander::new(resolvers);
        // the version is user input and may contain `$`
        let url = expander.expand_once(&self.endpoints.launcher_url)?;
        self.download(&url, &filename, &path)?;

        Ok(path)
    }

    /// Downloads the embeddable Python archive (if not cached yet) and returns its path.
    ///
    /// Fails with [BootstrapError::VersionNotFound] if the version is not listed and with
    /// [BootstrapError::ArchitectureUnavailable] if it is not listed for the bitness.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn runtime(&self, version: &str, bitness: Bitness) -> anyhow::Result<PathBuf> {
        let arch = bitness.python_arch();
        let filename = runtime_filename(version, &arch);
        let path = self.target_dir.join(&filename);
        if path.is_file() {
            debug!(path = %path.display(), "using cached runtime");
            return Ok(path);
        }

        println!("{} doesn't exist, will download it first.", PATH_COLOR.paint(&filename));
        println!("Get available Windows embeddable Python packages...");
        let catalog = Catalog::fetch(self.fetcher, &self.endpoints.python_index_url)?;
        if catalog.get(version).is_none() {
            let available: Vec<String> = catalog.versions().map(ToString::to_string).collect();
            println!("Couldn't find embeddable Python package of version {}.", ATTENTION_COLOR.paint(version));
            println!("Available versions:");
            println!("{available:#?}");
            return Err(BootstrapError::VersionNotFound {
                version: version.to_string(),
                available,
            }
            .into());
        }

        self.ensure_target_dir()?;
        if let Some(embed_python) = catalog.select(version, &arch) {
            // always store under the expected name so the cache lookup above hits next time
            self.download(&embed_python.url, &embed_python.filename, &path)?;
        }

        if !path.is_file() {
            println!("{}", ATTENTION_COLOR.paint("Couldn't find a suitable version of embeddable Python."));
            return Err(BootstrapError::ArchitectureUnavailable {
                version: version.to_string(),
                arch: arch.to_string(),
            }
            .into());
        }

        Ok(path)
    }

    /// Downloads `get-pip.py` (if not cached yet) and returns its path.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn get_pip(&self) -> anyhow::Result<PathBuf> {
        let path = self.target_dir.join(GET_PIP_FILENAME);
        if path.is_file() {
            debug!(path = %path.display(), "using cached get-pip.py");
            return Ok(path);
        }

        self.ensure_target_dir()?;
        self.download(&self.endpoints.get_pip_url, GET_PIP_FILENAME, &path)?;

        Ok(path)
    }

    // Creates the cache directory if necessary.
    #[doc(hidden)]
    fn ensure_target_dir(&self) -> anyhow::Result<()> {
        if !self.target_dir.is_dir() {
            println!("Create directory {}...", PATH_COLOR.paint(self.target_dir.to_string_lossy()));
            fs::create_dir_all(&self.target_dir)?;
        }

        Ok(())
    }

    // Downloads a single file.
    #[doc(hidden)]
    fn download(&self, url: &str, filename: &str, path: &Path) -> anyhow::Result<()> {
        println!("Download {} -> {}...", URL_COLOR.paint(url), PATH_COLOR.paint(filename));
        let bytes_written = self.fetcher.download(url, path)?;
        debug!(url, path = %path.display(), bytes_written, "downloaded");

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {

    use super::*;
    use crate::catalog::tests::{PAGE, PAGE_URL};
    use crate::error::{EXIT_ARCH_UNAVAILABLE, EXIT_VERSION_NOT_FOUND, exit_code};
    use std::cell::RefCell;
    use tempfile::tempdir;
    use test_log::test;

    /// [`Fetch`] implementation that serves a fixed page and records every request.
    #[derive(Default)]
    pub(crate) struct FakeFetcher {
        pub(crate) page: String,
        pub(crate) pages: RefCell<Vec<String>>,
        pub(crate) downloads: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        pub(crate) fn with_page(page: &str) -> Self {
            Self {
                page: page.to_string(),
                ..Default::default()
            }
        }
    }

    impl Fetch for FakeFetcher {
        fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
            self.pages.borrow_mut().push(url.to_string());
            Ok(self.page.clone())
        }

        fn download(&self, url: &str, dest: &Path) -> anyhow::Result<u64> {
            self.downloads.borrow_mut().push(url.to_string());
            fs::write(dest, url)?;
            Ok(url.len() as u64)
        }
    }

    pub(crate) fn endpoints() -> Endpoints {
        Endpoints {
            launcher_url: "https://github.com/skywind3000/PyStand/releases/download/${version}/${filename}".to_string(),
            python_index_url: PAGE_URL.to_string(),
            get_pip_url: "https://bootstrap.pypa.io/get-pip.py".to_string(),
        }
    }

    #[test]
    fn strip_leading_v() {
        assert_eq!(strip_v("v1.0.11"), "1.0.11");
        assert_eq!(strip_v("V1.0.11"), "1.0.11");
        assert_eq!(strip_v("1.0.11"), "1.0.11");
    }

    #[test]
    fn launcher_is_downloaded_once() {
        let tempdir = tempdir().unwrap();
        let download_dir = tempdir.path().join("download");
        let fetcher = FakeFetcher::default();
        let downloader = Downloader::new(&fetcher, endpoints(), &download_dir);

        let first = downloader.launcher("v1.0.11").unwrap();
        let second = downloader.launcher("1.0.11").unwrap();

        assert_eq!(first, download_dir.join("PyStand-v1.0.11-exe.zip"));
        assert_eq!(first, second);
        assert_eq!(
            *fetcher.downloads.borrow(),
            ["https://github.com/skywind3000/PyStand/releases/download/1.0.11/PyStand-v1.0.11-exe.zip"]
        );
    }

    #[test]
    fn launcher_version_with_dollar() {
        let tempdir = tempdir().unwrap();
        let fetcher = FakeFetcher::default();
        let downloader = Downloader::new(&fetcher, endpoints(), tempdir.path());

        let path = downloader.launcher("1.0$rc").unwrap();

        assert_eq!(path, tempdir.path().join("PyStand-v1.0$rc-exe.zip"));
        assert_eq!(
            *fetcher.downloads.borrow(),
            ["https://github.com/skywind3000/PyStand/releases/download/1.0$rc/PyStand-v1.0$rc-exe.zip"]
        );
    }

    #[test]
    fn runtime_is_downloaded_once() {
        let tempdir = tempdir().unwrap();
        let fetcher = FakeFetcher::with_page(PAGE);
        let downloader = Downloader::new(&fetcher, endpoints(), tempdir.path());

        let first = downloader.runtime("3.8.10", Bitness::X64).unwrap();
        let second = downloader.runtime("3.8.10", Bitness::X64).unwrap();

        assert_eq!(first, tempdir.path().join("python-3.8.10-embed-amd64.zip"));
        assert_eq!(first, second);
        assert_eq!(fetcher.pages.borrow().len(), 1);
        assert_eq!(
            *fetcher.downloads.borrow(),
            ["https://www.python.org/ftp/python/3.8.10/python-3.8.10-embed-amd64.zip"]
        );
    }

    #[test]
    fn runtime_unknown_version() {
        let tempdir = tempdir().unwrap();
        let fetcher = FakeFetcher::with_page(PAGE);
        let downloader = Downloader::new(&fetcher, endpoints(), tempdir.path());

        let err = downloader.runtime("9.9.9", Bitness::X86).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_VERSION_NOT_FOUND);
        let Some(BootstrapError::VersionNotFound { available, .. }) = err.downcast_ref::<BootstrapError>() else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(available, &["3.9.13", "3.8.10", "3.11.9"]);
        assert!(fetcher.downloads.borrow().is_empty());
    }

    #[test]
    fn runtime_unavailable_architecture() {
        let tempdir = tempdir().unwrap();
        let fetcher = FakeFetcher::with_page(PAGE);
        let downloader = Downloader::new(&fetcher, endpoints(), tempdir.path());

        // 3.9.13 is only listed for amd64
        let err = downloader.runtime("3.9.13", Bitness::X86).unwrap_err();
        assert_eq!(exit_code(&err), EXIT_ARCH_UNAVAILABLE);
        assert!(fetcher.downloads.borrow().is_empty());
    }

    #[test]
    fn get_pip_is_downloaded_once() {
        let tempdir = tempdir().unwrap();
        let fetcher = FakeFetcher::default();
        let downloader = Downloader::new(&fetcher, endpoints(), tempdir.path());

        downloader.get_pip().unwrap();
        let path = downloader.get_pip().unwrap();

        assert_eq!(path, tempdir.path().join(GET_PIP_FILENAME));
        assert_eq!(fetcher.downloads.borrow().len(), 1);
    }
}
