//! Version.
//!
//! This module contains the version information shown in the banner.

use std::fmt;

/// Structure to hold the version information.
#[derive(Debug)]
pub(crate) struct Version {
    /// The name of the package.
    pub(crate) pkg_name: &'static str,
    /// The version of the package.
    pub(crate) pkg_version: &'static str,
    /// The value that `git describe` returned.
    pub(crate) git_describe: &'static str,
    /// The version of the rust compiler.
    pub(crate) rustc_semver: &'static str,
}

impl Default for Version {
    fn default() -> Self {
        Self {
            pkg_name: env!("CARGO_PKG_NAME"),
            pkg_version: env!("CARGO_PKG_VERSION"),
            git_describe: env!("VERGEN_GIT_DESCRIBE"),
            rustc_semver: env!("VERGEN_RUSTC_SEMVER"),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            pkg_name,
            pkg_version,
            git_describe,
            rustc_semver,
        } = self;
        write!(f, "{pkg_name} {pkg_version} (git/{git_describe}) (rustc/{rustc_semver})")
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use test_log::test;

    #[test]
    fn display() {
        let version = Version {
            pkg_name: "pystand-init",
            pkg_version: "0.1.0",
            git_describe: "v0.1.0-3-gabcdef",
            rustc_semver: "1.90.0",
        };
        assert_eq!(version.to_string(), "pystand-init 0.1.0 (git/v0.1.0-3-gabcdef) (rustc/1.90.0)");
    }
}
