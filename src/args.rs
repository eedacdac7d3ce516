//! Arguments.
//!
//! This module contains the definition for the available command-line parameter
//! and the expansion of response files.

use crate::bundle::{Bitness, Compiler};
use crate::colors::ATTENTION_COLOR;
use crate::error::EXIT_NOK;
use anyhow::Context;
use clap::Parser;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

/// The flag that names a response file.
const RESPONSE_FILE_FLAG: &str = "--response-file";

/// Assembles a standalone PyStand bundle with an embeddable Python.
///
/// Downloads PyStand and the embeddable Python, puts them together in the publish directory and
/// optionally installs 3rd-party packages into the bundle.
///
/// Do not run several instances against the same directories at the same time.
#[derive(Debug, Parser)]
#[clap(author, args_override_self = true)]
pub(crate) struct Args {
    /// PyStand version
    #[clap(long, value_name = "version", default_value = "1.0.11")]
    pub(crate) pystand_version: String,
    /// Bitness
    #[clap(long, value_enum, default_value_t = Bitness::X86)]
    pub(crate) bitness: Bitness,
    /// Compiler
    #[clap(long, value_enum, ignore_case = true, default_value_t = Compiler::Msvc)]
    pub(crate) compiler: Compiler,
    /// Use PyStand CLI instead of GUI
    #[clap(long, action)]
    pub(crate) console: bool,
    /// Python version
    #[clap(long, value_name = "version", default_value = "3.8.10")]
    pub(crate) python_version: String,
    /// A list of 3rd-party packages (or requirements files) to be installed
    #[clap(long, value_name = "package", num_args = 1..)]
    pub(crate) package: Vec<String>,
    /// Read options stored in a response file
    // `expand_response_files` consumes it before parsing
    #[clap(long, value_name = "file")]
    pub(crate) response_file: Option<PathBuf>,
    /// Sets a custom config file
    #[clap(short, long, value_name = "file")]
    pub(crate) config: Option<String>,
    /// Suppress unnecessary information
    #[clap(short = 'q', long, action)]
    pub(crate) quiet: bool,
    /// Change level of verbosity (apply multiple times to increase level)
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub(crate) verbose: u8,
    /// Print version information
    #[clap(short = 'V', long, action)]
    pub(crate) version: bool,
}

impl Args {
    /// Parses the arguments of the current process (response files included).
    pub(crate) fn parse_with_response_files() -> anyhow::Result<Self> {
        let args = expand_response_files(std::env::args_os())?;

        // keep the exit codes of clap's usage errors apart from ours
        let args = Self::try_parse_from(args).unwrap_or_else(|err| {
            if !err.use_stderr() {
                err.exit();
            }
            let _ = err.print();
            std::process::exit(EXIT_NOK);
        });
        args.ensure_expanded()?;

        Ok(args)
    }

    // Fails if a response file survived the expansion.
    #[doc(hidden)]
    fn ensure_expanded(&self) -> anyhow::Result<()> {
        if let Some(path) = &self.response_file {
            anyhow::bail!("response file {} was not expanded", path.display());
        }

        Ok(())
    }
}

/// Replaces each `--response-file <file>` with the whitespace-separated tokens of the file.
///
/// The tokens of a response file are not expanded again; a nested response file is dropped.
pub(crate) fn expand_response_files<I, T>(args: I) -> anyhow::Result<Vec<OsString>>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut expanded = Vec::new();
    let mut args = args.into_iter().map(Into::into);
    while let Some(arg) = args.next() {
        let Some(path) = response_file_path(&arg, &mut args) else {
            expanded.push(arg);
            continue;
        };

        let content = fs::read_to_string(&path).with_context(|| format!("failed to read response file {}", path.display()))?;
        let mut tokens = content.split_whitespace().map(OsString::from);
        while let Some(token) = tokens.next() {
            if let Some(nested) = response_file_path(&token, &mut tokens) {
                // tracing isn't initialised yet
                let nested = ATTENTION_COLOR.paint(nested.to_string_lossy());
                eprintln!("Ignoring nested response file {nested} in {}.", path.display());
                continue;
            }
            expanded.push(token);
        }
    }

    Ok(expanded)
}

// Returns the path of the response file if `arg` names one (consumes the value from `rest` if necessary).
#[doc(hidden)]
fn response_file_path(arg: &OsString, rest: &mut impl Iterator<Item = OsString>) -> Option<PathBuf> {
    let arg = arg.to_str()?;
    if arg == RESPONSE_FILE_FLAG {
        return rest.next().map(PathBuf::from);
    }

    arg.strip_prefix(RESPONSE_FILE_FLAG)?.strip_prefix('=').map(PathBuf::from)
}

#[cfg(test)]
mod tests {

    use super::*;
    use tempfile::tempdir;
    use test_log::test;

    #[test]
    fn no_args() {
        let args = Args::try_parse_from(["program"]).unwrap();
        assert_eq!(args.pystand_version, "1.0.11");
        assert_eq!(args.bitness, Bitness::X86);
        assert_eq!(args.compiler, Compiler::Msvc);
        assert!(!args.console);
        assert_eq!(args.python_version, "3.8.10");
        assert!(args.package.is_empty());
        assert_eq!(args.config, None);
    }

    #[test]
    fn bitness_and_compiler() {
        let args = Args::try_parse_from(["program", "--bitness", "64", "--compiler", "gcc", "--console"]).unwrap();
        assert_eq!(args.bitness, Bitness::X64);
        assert_eq!(args.compiler, Compiler::Gcc);
        assert!(args.console);
    }

    #[test]
    fn invalid_bitness() {
        let args = Args::try_parse_from(["program", "--bitness", "16"]);
        assert!(args.is_err());
    }

    #[test]
    fn packages_accumulate() {
        let args = Args::try_parse_from(["program", "--package", "numpy", "requests", "--console", "--package", "requirements.txt"]).unwrap();
        assert_eq!(args.package, ["numpy", "requests", "requirements.txt"]);
    }

    #[test]
    fn package_without_value() {
        let args = Args::try_parse_from(["program", "--package"]);
        assert!(args.is_err());
    }

    #[test]
    fn response_file_is_spliced_in_place() {
        let tempdir = tempdir().unwrap();
        let rsp = tempdir.path().join("PyStandInit.rsp");
        fs::write(&rsp, "--bitness 64\n--python-version 3.9.13 --package numpy\n").unwrap();

        let argv = ["program", "--python-version", "3.8.10", "--response-file", rsp.to_str().unwrap(), "--bitness", "32"];
        let expanded = expand_response_files(argv).unwrap();
        let args = Args::try_parse_from(expanded).unwrap();

        // later tokens win
        assert_eq!(args.python_version, "3.9.13");
        assert_eq!(args.bitness, Bitness::X86);
        assert_eq!(args.package, ["numpy"]);
        assert!(args.ensure_expanded().is_ok());
    }

    #[test]
    fn unexpanded_response_file() {
        let args = Args::try_parse_from(["program", "--response-file", "a.rsp"]).unwrap();
        assert!(args.ensure_expanded().is_err());
    }

    #[test]
    fn response_file_with_equals() {
        let tempdir = tempdir().unwrap();
        let rsp = tempdir.path().join("a.rsp");
        fs::write(&rsp, "--console").unwrap();

        let flag = format!("--response-file={}", rsp.display());
        let expanded = expand_response_files(["program", flag.as_str()]).unwrap();
        assert_eq!(expanded, [OsString::from("program"), OsString::from("--console")]);
    }

    #[test]
    fn nested_response_file_is_dropped() {
        let tempdir = tempdir().unwrap();
        let rsp = tempdir.path().join("outer.rsp");
        fs::write(&rsp, "--console --response-file inner.rsp --bitness 64").unwrap();

        let expanded = expand_response_files(["program", "--response-file", rsp.to_str().unwrap()]).unwrap();
        let expected: Vec<OsString> = ["program", "--console", "--bitness", "64"].into_iter().map(OsString::from).collect();
        assert_eq!(expanded, expected);
    }

    #[test]
    fn missing_response_file() {
        let tempdir = tempdir().unwrap();
        let rsp = tempdir.path().join("missing.rsp");
        let expanded = expand_response_files(["program", "--response-file", rsp.to_str().unwrap()]);
        assert!(expanded.is_err());
    }
}
