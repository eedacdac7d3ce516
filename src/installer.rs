//! Installer.
//!
//! This module contains the code to install 3rd-party packages into the embeddable Python with a
//! temporary pip, which is removed again before the packages are copied into the bundle.

use crate::bundle::SITE_PACKAGES_DIR;
use crate::colors::*;
use crate::download::GET_PIP_FILENAME;
use crate::error::BootstrapError;
use crate::fsutil;
use anyhow::Context;
use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, instrument, trace};

/// Filename of the interpreter within the embeddable Python.
pub(crate) const PYTHON_EXE: &str = "python.exe";

/// The commented directive in the `._pth` file that keeps `site` (and thus site-packages) disabled.
const DISABLED_IMPORT_SITE: &str = "#import site";

/// The enabled directive.
const IMPORT_SITE: &str = "import site";

/// A single invocation of an external program.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Invocation {
    /// The program to execute.
    pub(crate) program: PathBuf,
    /// The arguments for the program.
    pub(crate) args: Vec<OsString>,
    /// Environment variables set (in addition to the inherited ones) for the program.
    pub(crate) env: Vec<(String, OsString)>,
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }

        Ok(())
    }
}

/// Trait for everything that executes an [Invocation] to completion.
pub(crate) trait CommandRunner {
    /// Executes the invocation; a non-zero exit status is a [BootstrapError::CommandFailed].
    fn run(&self, invocation: &Invocation) -> anyhow::Result<()>;
}

/// [`CommandRunner`] implementation that executes the program via the shell (`cmd /C` on Windows).
#[derive(Debug)]
pub(crate) struct ShellRunner;

impl CommandRunner for ShellRunner {
    #[instrument(level = "trace", skip(self), fields(command = %invocation))]
    fn run(&self, invocation: &Invocation) -> anyhow::Result<()> {
        let mut cmd = shell_command(&invocation.program);
        cmd.args(&invocation.args);
        for (key, val) in &invocation.env {
            cmd.env(key, val);
        }

        let status = cmd.status().with_context(|| format!("failed to execute '{invocation}'"))?;
        trace!(?status);
        if !status.success() {
            return Err(BootstrapError::CommandFailed {
                command: invocation.to_string(),
                code: status.code(),
            }
            .into());
        }

        Ok(())
    }
}

// Creates the command that runs `program` via the shell.
#[cfg(windows)]
#[doc(hidden)]
fn shell_command(program: &Path) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(program);
    cmd
}

// Creates the command that runs `program` directly.
#[cfg(not(windows))]
#[doc(hidden)]
fn shell_command(program: &Path) -> Command {
    Command::new(program)
}

/// Returns whether the given entry names a requirements file instead of a package.
pub(crate) fn is_requirements_file(entry: &str) -> bool {
    Path::new(entry) //
        .file_name()
        .is_some_and(|name| name.to_string_lossy().contains("requirements.txt"))
}

/// Enables `import site` in the single `._pth` file of the runtime.
///
/// Nothing happens if there is no `._pth` file, more than one is an error.
#[instrument(level = "trace")]
pub(crate) fn enable_site(runtime_dir: &Path) -> anyhow::Result<()> {
    let mut pth_files = Vec::new();
    for entry in fs::read_dir(runtime_dir)? {
        let path = entry?.path();
        if path.is_file() && path.file_name().is_some_and(|name| name.to_string_lossy().ends_with("._pth")) {
            pth_files.push(path);
        }
    }
    pth_files.sort();

    if pth_files.len() > 1 {
        println!("{}", ATTENTION_COLOR.paint("There are more than one ._pth files:"));
        println!("{pth_files:#?}");
        return Err(BootstrapError::AmbiguousPthFiles(pth_files).into());
    }
    let Some(pth_file) = pth_files.first() else {
        return Ok(());
    };

    println!("Uncomment import site...");
    let content = fs::read_to_string(pth_file)?;
    let content = content.replace(DISABLED_IMPORT_SITE, IMPORT_SITE);
    fs::write(pth_file, content)?;

    Ok(())
}

/// The installer for 3rd-party packages into an extracted embeddable Python.
pub(crate) struct Installer<'a> {
    runner: &'a dyn CommandRunner,
    runtime_dir: PathBuf,
}

impl<'a> Installer<'a> {
    /// Creates a new `Installer` for the given (extracted) runtime directory.
    pub(crate) fn new(runner: &'a dyn CommandRunner, runtime_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            runtime_dir: runtime_dir.into(),
        }
    }

    /// Returns the site-packages directory of the runtime.
    pub(crate) fn site_packages_dir(&self) -> PathBuf {
        self.runtime_dir.join("Lib").join("site-packages")
    }

    /// Returns the scripts directory of the runtime.
    pub(crate) fn scripts_dir(&self) -> PathBuf {
        self.runtime_dir.join("Scripts")
    }

    /// Installs the given packages and copies them into `publish_dir`.
    ///
    /// `get_pip` is the (cached) pip bootstrap script. pip itself doesn't end up in the bundle and
    /// the runtime directory is removed at the end.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn install(&self, get_pip: &Path, packages: &[String], publish_dir: &Path) -> anyhow::Result<()> {
        // install pip
        let target_get_pip = self.runtime_dir.join(GET_PIP_FILENAME);
        fs::copy(get_pip, &target_get_pip)?;
        enable_site(&self.runtime_dir)?;
        println!("Install pip...");
        self.python([target_get_pip.as_os_str()])?;

        // memorize files and directories created by installing pip (and its companions)
        let mut pip_facilities = vec![target_get_pip];
        pip_facilities.extend(list_dir(&self.site_packages_dir())?);
        pip_facilities.extend(list_dir(&self.scripts_dir())?);
        debug!(?pip_facilities);

        println!("Install packages...");
        for package in packages {
            println!("Install {}...", INFO_COLOR.paint(package));
            if is_requirements_file(package) {
                self.python(["-m", "pip", "install", "-r", package.as_str()])?;
            } else {
                self.python(["-m", "pip", "install", package.as_str()])?;
            }
        }

        println!("Remove pip and setuptools...");
        for facility in &pip_facilities {
            remove_verbose(facility)?;
        }

        let site_packages_dir = self.site_packages_dir();
        if site_packages_dir.is_dir() {
            for dist_info in dist_info_dirs(&site_packages_dir)? {
                remove_verbose(&dist_info)?;
            }

            println!("Copy installed packages...");
            fsutil::copy_tree(&site_packages_dir, &publish_dir.join(SITE_PACKAGES_DIR))?;
        }

        println!("Remove build tree...");
        fsutil::remove_path(&self.runtime_dir)?;

        Ok(())
    }

    // Runs the interpreter of the runtime with the given arguments.
    #[doc(hidden)]
    fn python<I, S>(&self, args: I) -> anyhow::Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let invocation = Invocation {
            program: self.runtime_dir.join(PYTHON_EXE),
            args: args.into_iter().map(|arg| arg.as_ref().to_owned()).collect(),
            env: vec![("PATH".to_string(), self.path_env()?)],
        };

        self.runner.run(&invocation)
    }

    // Returns the inherited `PATH` with the scripts directory of the runtime in front.
    #[doc(hidden)]
    fn path_env(&self) -> anyhow::Result<OsString> {
        let inherited = env::var_os("PATH").unwrap_or_default();
        let paths = std::iter::once(self.scripts_dir()).chain(env::split_paths(&inherited));

        Ok(env::join_paths(paths)?)
    }
}

// Returns the entries of the given directory (nothing if the directory doesn't exist).
#[doc(hidden)]
fn list_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        entries.push(entry?.path());
    }
    entries.sort();

    Ok(entries)
}

// Returns the `*.dist-info` directories within the given directory.
#[doc(hidden)]
fn dist_info_dirs(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = list_dir(dir)?;

    Ok(entries //
        .into_iter()
        .filter(|path| path.is_dir() && path.extension().is_some_and(|ext| ext == "dist-info"))
        .collect())
}

// Removes the given file or directory and reports it.
#[doc(hidden)]
fn remove_verbose(path: &Path) -> anyhow::Result<()> {
    let name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
    if path.is_dir() {
        println!("Remove directory {}...", PATH_COLOR.paint(name));
    } else if path.exists() {
        println!("Remove file {}...", PATH_COLOR.paint(name));
    } else {
        return Ok(());
    }

    fsutil::remove_path(path)
}
