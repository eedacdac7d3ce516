//! Bundle.
//!
//! This module contains the variant selection and the assembly of the publish directory.

use crate::catalog::Arch;
use crate::colors::*;
use crate::download::strip_v;
use crate::fsutil;
use anyhow::anyhow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Filename of the PyStand executable.
pub(crate) const LAUNCHER_EXE: &str = "PyStand.exe";

/// Name of the runtime directory within the bundle.
pub(crate) const RUNTIME_DIR: &str = "runtime";

/// Name of the directory for 3rd-party packages within the bundle.
pub(crate) const SITE_PACKAGES_DIR: &str = "site-packages";

/// The bitness of the bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Bitness {
    /// 32-bit
    #[value(name = "32")]
    X86,
    /// 64-bit
    #[value(name = "64")]
    X64,
}

impl Bitness {
    /// Returns the architecture of the matching embeddable Python.
    pub(crate) fn python_arch(self) -> Arch {
        match self {
            Self::X86 => Arch::Win32,
            Self::X64 => Arch::Amd64,
        }
    }
}

/// The compiler PyStand was built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Compiler {
    /// Microsoft Visual C++
    #[value(name = "MSVC")]
    Msvc,
    /// MinGW GCC
    #[value(name = "GCC")]
    Gcc,
}

/// The PyStand variant to bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Variant {
    pub(crate) compiler: Compiler,
    pub(crate) bitness: Bitness,
    pub(crate) console: bool,
}

impl Variant {
    /// Returns the name of the subdirectory within the PyStand archive, e.g. `PyStand-x64-GUI`.
    pub(crate) fn launcher_subdir(&self) -> String {
        let subsystem = if self.console { "CLI" } else { "GUI" };
        let arch = match (self.compiler, self.bitness) {
            (Compiler::Msvc, Bitness::X86) => "Win32",
            (Compiler::Msvc, Bitness::X64) => "x64",
            (Compiler::Gcc, Bitness::X86) => "mingw32",
            (Compiler::Gcc, Bitness::X64) => "mingw64",
        };

        format!("PyStand-{arch}-{subsystem}")
    }

    /// Returns the name of the publish subdirectory, e.g. `PyStand-v1.0.11-x64-GUI`.
    pub(crate) fn publish_subdir(&self, version: &str) -> String {
        let subdir = self.launcher_subdir();
        let rest = subdir.strip_prefix("PyStand").unwrap_or(&subdir);

        format!("PyStand-v{}{rest}", strip_v(version))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.launcher_subdir())
    }
}

/// Puts the extracted PyStand and Python together in the publish directory.
#[derive(Debug)]
pub(crate) struct Assembler<'a> {
    /// The directory with the extracted PyStand archive.
    pub(crate) launcher_dir: &'a Path,
    /// The directory with the extracted embeddable Python.
    pub(crate) runtime_dir: &'a Path,
    /// The directory that receives the bundle.
    pub(crate) publish_dir: PathBuf,
}

impl Assembler<'_> {
    /// Recreates the publish directory and copies PyStand and Python into it.
    #[instrument(level = "trace")]
    pub(crate) fn assemble(&self, variant: &Variant) -> anyhow::Result<()> {
        let publish_dir = &self.publish_dir;
        let path = PATH_COLOR.paint(publish_dir.to_string_lossy());
        if publish_dir.exists() {
            println!("Clear publish directory {path}...");
            fsutil::remove_path(publish_dir)?;
        }
        println!("Create directory {path}...");
        fs::create_dir_all(publish_dir)?;

        println!("Copy PyStand ({})...", INFO_COLOR.paint(variant.launcher_subdir()));
        let launcher_src = self.launcher_dir.join(variant.launcher_subdir()).join(LAUNCHER_EXE);
        if !launcher_src.is_file() {
            return Err(anyhow!("variant {variant} not found in {}", self.launcher_dir.display()));
        }
        fs::copy(&launcher_src, publish_dir.join(LAUNCHER_EXE))?;

        println!("Copy Python...");
        fsutil::copy_tree(self.runtime_dir, &publish_dir.join(RUNTIME_DIR))?;

        Ok(())
    }
}
