//! Bootstrap.
//!
//! This module contains the pipeline that turns the parsed arguments into a bundle: download,
//! extract, assemble and (optionally) install packages.

use crate::args::Args;
use crate::archive;
use crate::bundle::{Assembler, Variant};
use crate::colors::*;
use crate::config::{Config, Layout};
use crate::download::{Downloader, Endpoints};
use crate::fsutil;
use crate::http::Fetch;
use crate::installer::{CommandRunner, Installer};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

/// What to bundle.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Request {
    /// The version of PyStand.
    pub(crate) pystand_version: String,
    /// The version of the embeddable Python.
    pub(crate) python_version: String,
    /// The PyStand variant.
    pub(crate) variant: Variant,
    /// The packages (or requirements files) to install.
    pub(crate) packages: Vec<String>,
}

impl From<&Args> for Request {
    fn from(args: &Args) -> Self {
        Self {
            pystand_version: args.pystand_version.clone(),
            python_version: args.python_version.clone(),
            variant: Variant {
                compiler: args.compiler,
                bitness: args.bitness,
                console: args.console,
            },
            packages: args.package.clone(),
        }
    }
}

/// The bootstrap contains everything to materialise a bundle to disc.
pub(crate) struct Bootstrap<'a> {
    fetcher: &'a dyn Fetch,
    runner: &'a dyn CommandRunner,
    endpoints: Endpoints,
    layout: Layout,
    request: Request,
}

impl<'a> Bootstrap<'a> {
    /// Creates a new `Bootstrap` out of the given [Config].
    pub(crate) fn from_config(
        basedir: &Path,
        config: &Config,
        request: Request,
        fetcher: &'a dyn Fetch,
        runner: &'a dyn CommandRunner,
    ) -> anyhow::Result<Self> {
        let endpoints = Endpoints {
            launcher_url: config.launcher_url.clone(),
            python_index_url: config.python_index_url.clone(),
            get_pip_url: config.get_pip_url.clone(),
        };

        Ok(Self {
            fetcher,
            runner,
            endpoints,
            layout: config.layout(basedir)?,
            request,
        })
    }

    /// Returns the publish directory for the requested variant.
    pub(crate) fn publish_dir(&self) -> PathBuf {
        let subdir = self.request.variant.publish_subdir(&self.request.pystand_version);
        self.layout.publish_dir.join(subdir)
    }

    /// Runs the pipeline and returns the publish directory.
    ///
    /// If anything fails after the publish directory was recreated, the half-populated publish
    /// directory is removed again. The build tree is kept for inspection.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn run(&self) -> anyhow::Result<PathBuf> {
        let request = &self.request;
        println!(
            "Bundling PyStand {} ({}) with Python {}",
            INFO_COLOR.paint(&request.pystand_version),
            INFO_COLOR.paint(request.variant.to_string()),
            INFO_COLOR.paint(&request.python_version)
        );

        let downloader = Downloader::new(self.fetcher, self.endpoints.clone(), &self.layout.download_dir);
        let launcher_dir = self.provide(&downloader.launcher(&request.pystand_version)?)?;
        let runtime_dir = self.provide(&downloader.runtime(&request.python_version, request.variant.bitness)?)?;

        let publish_dir = self.publish_dir();
        if let Err(err) = self.publish(&downloader, &launcher_dir, &runtime_dir, &publish_dir) {
            if let Err(cleanup_err) = fsutil::remove_path(&publish_dir) {
                warn!(?cleanup_err, "failed to remove publish directory");
            }
            return Err(err);
        }

        Ok(publish_dir)
    }

    // Extracts the archive into the build directory (removing leftovers first).
    #[instrument(level = "trace", skip(self))]
    fn provide(&self, pkg: &Path) -> anyhow::Result<PathBuf> {
        let stem = pkg.file_stem().unwrap_or(pkg.as_os_str());
        let target_dir = self.layout.build_dir.join(stem);
        let name = pkg.file_name().unwrap_or(pkg.as_os_str()).to_string_lossy();
        println!("Extract {} -> {}...", PATH_COLOR.paint(name), PATH_COLOR.paint(stem.to_string_lossy()));
        fsutil::remove_path(&target_dir)?;
        archive::extract(pkg, &target_dir)?;

        Ok(target_dir)
    }

    // Assembles the bundle and installs the packages.
    #[doc(hidden)]
    fn publish(&self, downloader: &Downloader<'_>, launcher_dir: &Path, runtime_dir: &Path, publish_dir: &Path) -> anyhow::Result<()> {
        let assembler = Assembler {
            launcher_dir,
            runtime_dir,
            publish_dir: publish_dir.to_path_buf(),
        };
        assembler.assemble(&self.request.variant)?;

        if self.request.packages.is_empty() {
            debug!("no packages requested");
            return Ok(());
        }

        let get_pip = downloader.get_pip()?;
        let installer = Installer::new(self.runner, runtime_dir);
        installer.install(&get_pip, &self.request.packages, publish_dir)
    }
}
