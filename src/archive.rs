//! Archive.
//!
//! This module contains the code to unpack a zip archive.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{instrument, trace, warn};

/// Unpacks the zip archive at `pkg` into `target_dir` (existing files are overwritten).
#[instrument(level = "trace")]
pub(crate) fn extract(pkg: &Path, target_dir: &Path) -> anyhow::Result<()> {
    let pkg_file = File::open(pkg)?;
    let mut zip = zip::ZipArchive::new(pkg_file)?;
    fs::create_dir_all(target_dir)?;
    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        let Some(name) = file.enclosed_name() else {
            warn!(name = file.name(), "skipping dangerous name");
            continue;
        };

        let name = target_dir.join(name);
        trace!("unpacking {name:?}");

        if file.is_dir() {
            fs::create_dir_all(name)?;
        } else {
            if let Some(p) = name.parent() {
                if !p.exists() {
                    fs::create_dir_all(p)?;
                }
            }
            let mut outfile = File::create(name)?;
            io::copy(&mut file, &mut outfile)?;
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {

    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use test_log::test;
    use zip::write::SimpleFileOptions;

    /// Writes a zip archive with the given (name, content) entries; names ending with `/` are directories.
    pub(crate) fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, content) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                zip.start_file(*name, SimpleFileOptions::default()).unwrap();
                zip.write_all(content.as_bytes()).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    #[test]
    fn extract_nested() {
        let tempdir = tempdir().unwrap();
        let pkg = tempdir.path().join("PyStand-v1.0.11-exe.zip");
        write_zip(&pkg, &[("PyStand-x64-GUI/", ""), ("PyStand-x64-GUI/PyStand.exe", "exe"), ("readme.txt", "hello")]);

        let target = tempdir.path().join("build").join("PyStand-v1.0.11-exe");
        extract(&pkg, &target).unwrap();

        assert_eq!(fs::read_to_string(target.join("PyStand-x64-GUI").join("PyStand.exe")).unwrap(), "exe");
        assert_eq!(fs::read_to_string(target.join("readme.txt")).unwrap(), "hello");
    }

    #[test]
    fn extract_overwrites() {
        let tempdir = tempdir().unwrap();
        let pkg = tempdir.path().join("a.zip");
        write_zip(&pkg, &[("python38._pth", "new")]);
        let target = tempdir.path().join("out");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("python38._pth"), "old").unwrap();

        extract(&pkg, &target).unwrap();

        assert_eq!(fs::read_to_string(target.join("python38._pth")).unwrap(), "new");
    }

    #[test]
    fn extract_skips_dangerous_names() {
        let tempdir = tempdir().unwrap();
        let pkg = tempdir.path().join("evil.zip");
        write_zip(&pkg, &[("../escape.txt", "x"), ("ok.txt", "y")]);
        let target = tempdir.path().join("out");

        extract(&pkg, &target).unwrap();

        assert!(!tempdir.path().join("escape.txt").exists());
        assert!(target.join("ok.txt").exists());
    }

    #[test]
    fn extract_not_a_zip() {
        let tempdir = tempdir().unwrap();
        let pkg = tempdir.path().join("broken.zip");
        fs::write(&pkg, "this is not a zip").unwrap();

        assert!(extract(&pkg, &tempdir.path().join("out")).is_err());
    }
}
