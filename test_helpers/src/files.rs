//! Scratch configuration directories.

use std::{
    fs::{self, File},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

/// A temporary directory removed on drop.
///
/// # Examples
///
/// ```
/// use test_helpers::files::TempConfigDir;
///
/// let dir = TempConfigDir::new().expect("create dir");
/// let path = dir.write("config.yaml", "main: {}\n").expect("write");
/// assert!(path.ends_with("config.yaml"));
/// ```
#[derive(Debug)]
pub struct TempConfigDir {
    dir: TempDir,
    root: Utf8PathBuf,
}

impl TempConfigDir {
    /// Create an empty directory.
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be created or its path is not UTF-8.
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temporary directory")?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|path| anyhow!("temporary directory is not UTF-8: {}", path.display()))?;
        Ok(Self { dir, root })
    }

    /// Directory root.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Absolute path of `name` inside the directory.
    #[must_use]
    pub fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    /// Create or replace `name` with `contents`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be written.
    pub fn write(&self, name: &str, contents: &str) -> Result<Utf8PathBuf> {
        let path = self.path(name);
        fs::write(&path, contents).with_context(|| format!("write {path}"))?;
        Ok(path)
    }

    /// Set the modification time of `name`.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened or its time cannot be changed.
    pub fn set_modified(&self, name: &str, modified: SystemTime) -> Result<()> {
        let path = self.path(name);
        File::options()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(modified))
            .with_context(|| format!("set modification time of {path}"))
    }

    /// Replace `name` and move its modification time `by` into the future,
    /// so coarse filesystem clocks still observe the change.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be written or its time cannot be changed.
    pub fn rewrite_later(&self, name: &str, contents: &str, by: Duration) -> Result<Utf8PathBuf> {
        let path = self.write(name, contents)?;
        self.set_modified(name, SystemTime::now() + by)?;
        Ok(path)
    }

    /// Keep the directory on disk after drop, returning its path.
    #[must_use]
    pub fn keep(self) -> Utf8PathBuf {
        let _kept = self.dir.keep();
        self.root
    }
}
