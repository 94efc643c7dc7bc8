//! Byte-source services used to read and stat configuration files.
//!
//! [`OsFileSystem`] goes through `cap-std` ambient directories, while
//! [`MemoryFileSystem`] serves embedded or generated files and gives tests
//! full control over modification times.

use std::{
    collections::HashMap,
    io,
    time::{Duration, SystemTime},
};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use parking_lot::RwLock;

/// Metadata the session needs from a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Last modification time.
    pub modified: SystemTime,
    /// Whether the path names a regular file.
    pub is_file: bool,
}

/// Read-only access to configuration files.
pub trait FileSystem: Send + Sync {
    /// Read the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while reading.
    fn read_file(&self, path: &Utf8Path) -> io::Result<Vec<u8>>;

    /// Stat `path`.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::NotFound`] when nothing exists at `path`.
    fn stat(&self, path: &Utf8Path) -> io::Result<FileStat>;
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

/// Return the parent directory of `path`, falling back to `"."` when the path
/// has no parent or the parent is empty.
fn parent_or_dot(path: &Utf8Path) -> &Utf8Path {
    path.parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."))
}

/// Open the parent directory of `path` via `cap-std` and extract the file name.
fn open_parent(path: &Utf8Path) -> io::Result<(Dir, &str)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::other(format!("cannot determine file name of {path}")))?;
    let dir = Dir::open_ambient_dir(parent_or_dot(path), ambient_authority())?;
    Ok((dir, file_name))
}

impl FileSystem for OsFileSystem {
    fn read_file(&self, path: &Utf8Path) -> io::Result<Vec<u8>> {
        let (dir, name) = open_parent(path)?;
        dir.read(name)
    }

    fn stat(&self, path: &Utf8Path) -> io::Result<FileStat> {
        let (dir, name) = open_parent(path)?;
        let metadata = dir.metadata(name)?;
        Ok(FileStat {
            modified: metadata.modified()?.into_std(),
            is_file: metadata.is_file(),
        })
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    contents: Vec<u8>,
    modified: SystemTime,
}

#[derive(Debug)]
struct MemoryState {
    files: HashMap<Utf8PathBuf, MemoryFile>,
    clock: SystemTime,
}

/// Thread-safe in-memory filesystem with a logical clock.
///
/// Every write advances the clock by one second, so a rewritten file always
/// reports a later modification time.
#[derive(Debug)]
pub struct MemoryFileSystem {
    state: RwLock<MemoryState>,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                files: HashMap::new(),
                clock: SystemTime::UNIX_EPOCH,
            }),
        }
    }
}

impl MemoryFileSystem {
    /// Create an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace the file at `path`.
    pub fn insert(&self, path: impl Into<Utf8PathBuf>, contents: impl Into<Vec<u8>>) {
        let mut state = self.state.write();
        state.clock += Duration::from_secs(1);
        let modified = state.clock;
        state.files.insert(
            path.into(),
            MemoryFile {
                contents: contents.into(),
                modified,
            },
        );
    }

    /// Advance the modification time of `path` without changing it.
    /// Returns `false` when no such file exists.
    #[must_use = "touching a missing file does nothing"]
    pub fn touch(&self, path: &Utf8Path) -> bool {
        let mut state = self.state.write();
        state.clock += Duration::from_secs(1);
        let now = state.clock;
        state
            .files
            .get_mut(path)
            .map(|file| file.modified = now)
            .is_some()
    }

    /// Delete the file at `path`, returning whether it existed.
    #[must_use = "removing a missing file does nothing"]
    pub fn remove(&self, path: &Utf8Path) -> bool {
        self.state.write().files.remove(path).is_some()
    }
}

fn not_found(path: &Utf8Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{path} does not exist"))
}

impl FileSystem for MemoryFileSystem {
    fn read_file(&self, path: &Utf8Path) -> io::Result<Vec<u8>> {
        self.state
            .read()
            .files
            .get(path)
            .map(|file| file.contents.clone())
            .ok_or_else(|| not_found(path))
    }

    fn stat(&self, path: &Utf8Path) -> io::Result<FileStat> {
        self.state
            .read()
            .files
            .get(path)
            .map(|file| FileStat {
                modified: file.modified,
                is_file: true,
            })
            .ok_or_else(|| not_found(path))
    }
}

impl<T: FileSystem + ?Sized> FileSystem for std::sync::Arc<T> {
    fn read_file(&self, path: &Utf8Path) -> io::Result<Vec<u8>> {
        (**self).read_file(path)
    }

    fn stat(&self, path: &Utf8Path) -> io::Result<FileStat> {
        (**self).stat(path)
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "clippy::expect_used is denied globally; tests may not hit those branches"
)]
mod tests {
    use std::io::ErrorKind;

    use anyhow::{Result, ensure};
    use camino::{Utf8Path, Utf8PathBuf};
    use rstest::rstest;
    use tempfile::TempDir;

    use super::{FileSystem, MemoryFileSystem, OsFileSystem};

    #[rstest]
    fn memory_writes_advance_modification_time() -> Result<()> {
        let fs = MemoryFileSystem::new();
        let path = Utf8Path::new("app.yaml");
        fs.insert(path, "a: 1");
        let first = fs.stat(path)?.modified;
        fs.insert(path, "a: 2");
        let second = fs.stat(path)?.modified;
        ensure!(second > first, "rewrite should advance the clock");
        ensure!(fs.touch(path));
        ensure!(fs.stat(path)?.modified > second);
        ensure!(fs.read_file(path)? == b"a: 2");
        Ok(())
    }

    #[rstest]
    fn memory_missing_files_are_not_found() {
        let fs = MemoryFileSystem::new();
        let err = fs
            .stat(Utf8Path::new("nope.yaml"))
            .expect_err("expected missing file");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!fs.remove(Utf8Path::new("nope.yaml")));
    }

    #[rstest]
    fn os_filesystem_reads_through_cap_std() -> Result<()> {
        let dir = TempDir::new()?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .map_err(|p| anyhow::anyhow!("non UTF-8 temp dir {}", p.display()))?;
        let path = root.join("app.yaml");
        std::fs::write(&path, "a: 1\n")?;
        let stat = OsFileSystem.stat(&path)?;
        ensure!(stat.is_file);
        ensure!(OsFileSystem.read_file(&path)? == b"a: 1\n");
        ensure!(!OsFileSystem.stat(&root)?.is_file, "directories are not regular files");
        Ok(())
    }
}
