//! End-to-end resolution: discover files, merge, expand, extract and bind.

mod discover;

use std::{collections::BTreeMap, sync::Arc, time::SystemTime};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    Bindable, Binder, ConfigError, ConfigResult, Node, Path,
    codec::Codecs,
    env::{EnvLookup, OsEnv},
    expand::expand_node,
    fs::{FileSystem, OsFileSystem},
    merge::{DocumentMerger, Source},
    options::Settings,
};

/// File to modification-time map captured after a successful load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot(BTreeMap<Utf8PathBuf, SystemTime>);

impl Snapshot {
    /// Returns `true` when this snapshot lists exactly the files of
    /// `previous` and none of them was modified since.
    #[must_use]
    pub fn is_unchanged_from(&self, previous: &Self) -> bool {
        self.0.len() == previous.0.len()
            && self
                .0
                .iter()
                .all(|(path, modified)| previous.0.get(path).is_some_and(|seen| modified <= seen))
    }

    /// Number of files recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when no file was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Files found for one resolution, in merge order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    files: Vec<Utf8PathBuf>,
    snapshot: Snapshot,
}

impl Discovery {
    /// Files to merge, lowest precedence first.
    #[must_use]
    pub fn files(&self) -> &[Utf8PathBuf] {
        &self.files
    }

    /// Modification times of the discovered files.
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Take the snapshot, dropping the file list.
    #[must_use]
    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }
}

/// Orchestrates resolution against pluggable filesystem, environment and
/// codec services. Owns the snapshot used for change detection.
pub struct ResolutionSession {
    settings: Settings,
    fs: Arc<dyn FileSystem>,
    env: Arc<dyn EnvLookup>,
    codecs: Codecs,
    snapshot: Mutex<Option<Snapshot>>,
}

impl std::fmt::Debug for ResolutionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionSession")
            .field("settings", &self.settings)
            .field("codecs", &self.codecs)
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}

impl ResolutionSession {
    /// Session over the host filesystem and process environment.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            fs: Arc::new(OsFileSystem),
            env: Arc::new(OsEnv),
            codecs: Codecs::default(),
            snapshot: Mutex::new(None),
        }
    }

    /// Replace the filesystem service.
    #[must_use]
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Replace the environment service.
    #[must_use]
    pub fn with_env(mut self, env: Arc<dyn EnvLookup>) -> Self {
        self.env = env;
        self
    }

    /// Replace the codec registry.
    #[must_use]
    pub fn with_codecs(mut self, codecs: Codecs) -> Self {
        self.codecs = codecs;
        self
    }

    /// A fresh session over the same services with different settings.
    #[must_use]
    pub fn with_settings(&self, settings: Settings) -> Self {
        Self {
            settings,
            fs: Arc::clone(&self.fs),
            env: Arc::clone(&self.env),
            codecs: self.codecs.clone(),
            snapshot: Mutex::new(None),
        }
    }

    /// Resolved settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Environment service.
    #[must_use]
    pub fn env(&self) -> &dyn EnvLookup {
        self.env.as_ref()
    }

    /// Resolve `key` from `files` into `target`.
    ///
    /// In `watch_mode` the call returns `Ok(false)` without reading or
    /// binding anything when no file appeared, disappeared or was modified
    /// since the last successful resolution.
    ///
    /// # Errors
    ///
    /// Returns the first read, decode, merge, expansion or binding error.
    /// Missing files are logged and skipped.
    pub fn resolve<T: Bindable>(
        &self,
        key: &str,
        target: &mut T,
        files: &[Utf8PathBuf],
        watch_mode: bool,
    ) -> ConfigResult<bool> {
        let discovery = self.discover(files, watch_mode);
        if watch_mode && self.is_unchanged(discovery.snapshot()) {
            return Ok(false);
        }
        let document = self.load_document(&discovery)?;
        self.bind_key(key, target, document.as_ref())?;
        self.commit(discovery.snapshot);
        Ok(true)
    }

    /// Compare `snapshot` with the last committed one.
    #[must_use]
    pub fn is_unchanged(&self, snapshot: &Snapshot) -> bool {
        self.snapshot
            .lock()
            .as_ref()
            .is_some_and(|previous| snapshot.is_unchanged_from(previous))
    }

    /// Returns `true` once a resolution has been committed.
    #[must_use]
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.lock().is_some()
    }

    /// Record `snapshot` as the state of the last successful resolution.
    pub fn commit(&self, snapshot: Snapshot) {
        *self.snapshot.lock() = Some(snapshot);
    }

    /// Read, decode, merge and expand the discovered files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::File`] when a discovered file cannot be read,
    /// and decode, merge or expansion errors.
    pub fn load_document(&self, discovery: &Discovery) -> ConfigResult<Option<Node>> {
        let sources = discovery
            .files()
            .iter()
            .map(|path| self.load_source(path))
            .collect::<ConfigResult<Vec<_>>>()?;
        let merged = DocumentMerger::new(self.settings.strict).merge(&sources)?;
        match merged {
            Some(node) if self.settings.expand_variables => {
                let env = self.env.as_ref();
                expand_node(&|name: &str| env.lookup(name), node).map(Some)
            }
            other => Ok(other),
        }
    }

    fn load_source(&self, path: &Utf8Path) -> ConfigResult<Source> {
        if self.settings.debug || self.settings.verbose {
            debug!(path = %path, "loading configuration file");
        }
        let bytes = self
            .fs
            .read_file(path)
            .map_err(|e| ConfigError::file(path, e))?;
        let document = self.codecs.decode_path(path, &bytes)?;
        Ok(Source::new(path.as_str(), document))
    }

    /// Bind the part of `document` addressed by `key` into `target`.
    ///
    /// # Errors
    ///
    /// Propagates binding errors.
    pub fn bind_key<T: Bindable>(
        &self,
        key: &str,
        target: &mut T,
        document: Option<&Node>,
    ) -> ConfigResult<Node> {
        let path = Path::parse(key);
        let subtree = document.and_then(|document| path.resolve(document));
        let binder = Binder::for_key(self.env(), self.settings.env_prefix.as_deref(), &path)
            .debug(self.settings.debug)
            .verbose(self.settings.verbose);
        let result = binder.bind(target, subtree);
        if self.settings.debug || self.settings.verbose {
            match &result {
                Ok(node) => debug!(key, configuration = %node, "bound configuration"),
                Err(err) => warn!(key, error = %err, "failed to bind configuration"),
            }
        }
        result
    }
}
