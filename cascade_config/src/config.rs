//! The `Config` facade: registration, live values and reloading.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::{
    Bindable, ConfigError, ConfigResult, Node, ROOT,
    codec::Codecs,
    env::{EnvLookup, OsEnv},
    fs::{FileSystem, OsFileSystem},
    options::Options,
    provider::DocumentProvider,
    reload::{ReloadHandle, ReloadState, StateCell},
    session::ResolutionSession,
};

type ReloadListener = Arc<dyn Fn(&str, &Node) + Send + Sync>;
type Subscriber<T> = Arc<dyn Fn(&str, &T) + Send + Sync>;

/// A registered key that can be re-resolved against a new document.
trait Rebind: Send + Sync {
    fn key(&self) -> &str;

    /// Re-bind from the baseline; `Some` carries the new document form when
    /// it differs from the previous one.
    fn rebind(&self, session: &ResolutionSession, document: Option<&Node>) -> ConfigResult<Option<Node>>;
}

struct Entry<T> {
    key: String,
    baseline: T,
    last: Mutex<Node>,
    value: Arc<ArcSwap<T>>,
    subscribers: Arc<Mutex<Vec<Subscriber<T>>>>,
}

impl<T: Bindable + Clone + Send + Sync + 'static> Rebind for Entry<T> {
    fn key(&self) -> &str {
        &self.key
    }

    fn rebind(&self, session: &ResolutionSession, document: Option<&Node>) -> ConfigResult<Option<Node>> {
        let mut fresh = self.baseline.clone();
        let node = session.bind_key(&self.key, &mut fresh, document)?;
        {
            let mut last = self.last.lock();
            if *last == node {
                return Ok(None);
            }
            *last = node.clone();
        }
        let shared = Arc::new(fresh);
        self.value.store(Arc::clone(&shared));
        let subscribers = self.subscribers.lock().clone();
        for subscriber in subscribers {
            subscriber(&self.key, &shared);
        }
        Ok(Some(node))
    }
}

/// Handle on a registered configuration value that the reload loop keeps
/// current.
pub struct Live<T> {
    key: String,
    value: Arc<ArcSwap<T>>,
    subscribers: Arc<Mutex<Vec<Subscriber<T>>>>,
}

impl<T> Clone for Live<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            value: Arc::clone(&self.value),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Live<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Live")
            .field("key", &self.key)
            .field("value", &*self.value.load_full())
            .finish_non_exhaustive()
    }
}

impl<T> Live<T> {
    /// The current value. Replaced wholesale on reload, never mutated.
    #[must_use]
    pub fn get(&self) -> Arc<T> {
        self.value.load_full()
    }

    /// Key this value was registered under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Call `callback` with the key and new value after every change.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&str, &T) + Send + Sync + 'static,
    {
        self.subscribers.lock().push(Arc::new(callback));
    }
}

struct Inner {
    session: RwLock<Arc<ResolutionSession>>,
    registry: Mutex<Vec<Arc<dyn Rebind>>>,
    listeners: Mutex<Vec<ReloadListener>>,
    loaded: AtomicBool,
    reload_started: AtomicBool,
    reload: Mutex<Option<ReloadHandle>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(mut handle) = self.reload.get_mut().take() {
            handle.stop();
        }
    }
}

/// Resolves configuration for registered keys and keeps it current.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use cascade_config::{Bindable, Config, MapEnv, MemoryFileSystem, Options};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Default, Serialize, Deserialize, Bindable)]
/// struct Server {
///     #[bind(default = "80")]
///     port: u16,
///     host: String,
/// }
///
/// let fs = Arc::new(MemoryFileSystem::new());
/// fs.insert("config.yaml", "server:\n  host: example.org\n");
/// let config = Config::builder()
///     .options(Options::new().file("config.yaml"))
///     .fs(fs)
///     .env(MapEnv::new().with("CONFIG_SERVER_PORT", "8080"))
///     .build();
/// let server = config.load_with_key("server", Server::default()).expect("loads");
/// assert_eq!((server.get().host.as_str(), server.get().port), ("example.org", 8080));
/// ```
#[derive(Clone)]
pub struct Config {
    inner: Arc<Inner>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<String> = self
            .inner
            .registry
            .lock()
            .iter()
            .map(|entry| entry.key().to_owned())
            .collect();
        f.debug_struct("Config")
            .field("session", &self.session())
            .field("keys", &keys)
            .field("reload", &self.reload_state())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builds a [`Config`] with custom services.
pub struct ConfigBuilder {
    options: Options,
    fs: Arc<dyn FileSystem>,
    env: Arc<dyn EnvLookup>,
    codecs: Codecs,
    listeners: Vec<ReloadListener>,
}

impl fmt::Debug for ConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigBuilder")
            .field("options", &self.options)
            .field("codecs", &self.codecs)
            .finish_non_exhaustive()
    }
}

impl ConfigBuilder {
    /// Engine options.
    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Filesystem used for discovery and reads.
    #[must_use]
    pub fn fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Environment used for overrides, expansion and option fallbacks.
    #[must_use]
    pub fn env(mut self, env: impl EnvLookup + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Codec registry.
    #[must_use]
    pub fn codecs(mut self, codecs: Codecs) -> Self {
        self.codecs = codecs;
        self
    }

    /// Call `listener` with the key and document form of every value that
    /// changes on reload.
    #[must_use]
    pub fn on_reload<F>(mut self, listener: F) -> Self
    where
        F: Fn(&str, &Node) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Finish the builder.
    #[must_use]
    pub fn build(self) -> Config {
        let settings = self.options.resolve(self.env.as_ref());
        let session = ResolutionSession::new(settings)
            .with_fs(self.fs)
            .with_env(self.env)
            .with_codecs(self.codecs);
        Config {
            inner: Arc::new(Inner {
                session: RwLock::new(Arc::new(session)),
                registry: Mutex::new(Vec::new()),
                listeners: Mutex::new(self.listeners),
                loaded: AtomicBool::new(false),
                reload_started: AtomicBool::new(false),
                reload: Mutex::new(None),
            }),
        }
    }
}

impl Config {
    /// A config over the host filesystem and process environment.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self::builder().options(options).build()
    }

    /// Start building a config.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            options: Options::default(),
            fs: Arc::new(OsFileSystem),
            env: Arc::new(OsEnv),
            codecs: Codecs::default(),
            listeners: Vec::new(),
        }
    }

    fn session(&self) -> Arc<ResolutionSession> {
        Arc::clone(&self.inner.session.read())
    }

    /// Replace the options.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlreadyLoaded`] once anything has been loaded.
    pub fn set_options(&self, options: Options) -> ConfigResult<()> {
        let mut session = self.inner.session.write();
        if self.inner.loaded.load(Ordering::Acquire) {
            return Err(Arc::new(ConfigError::AlreadyLoaded));
        }
        let settings = options.resolve(session.env());
        *session = Arc::new(session.with_settings(settings));
        Ok(())
    }

    /// Active environment name.
    #[must_use]
    pub fn environment(&self) -> String {
        self.session().settings().environment.clone()
    }

    /// Active environment variable prefix, `None` when disabled.
    #[must_use]
    pub fn env_prefix(&self) -> Option<String> {
        self.session().settings().env_prefix.clone()
    }

    /// Current phase of the background reload loop.
    #[must_use]
    pub fn reload_state(&self) -> ReloadState {
        self.inner
            .reload
            .lock()
            .as_ref()
            .map_or_else(|| self.idle_or_stopped(), ReloadHandle::state)
    }

    fn idle_or_stopped(&self) -> ReloadState {
        if self.inner.reload_started.load(Ordering::Acquire) {
            ReloadState::Stopped
        } else {
            ReloadState::Idle
        }
    }

    /// Add a listener called with the key and document form of every value
    /// that changes on reload.
    pub fn on_reload<F>(&self, listener: F)
    where
        F: Fn(&str, &Node) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().push(Arc::new(listener));
    }

    /// Resolve the whole document into `target` once.
    ///
    /// # Errors
    ///
    /// Returns any read, decode, merge, expansion or binding error.
    pub fn load<T: Bindable>(&self, target: &mut T) -> ConfigResult<()> {
        self.bind(ROOT, target)
    }

    /// Resolve `key` into `target` once, without registering it for reload.
    ///
    /// # Errors
    ///
    /// Returns any read, decode, merge, expansion or binding error.
    pub fn bind<T: Bindable>(&self, key: &str, target: &mut T) -> ConfigResult<()> {
        self.resolve_initial(key, target).map(drop)
    }

    fn resolve_initial<T: Bindable>(&self, key: &str, target: &mut T) -> ConfigResult<Node> {
        let session = self.session();
        let discovery = session.discover(&session.settings().files, false);
        let document = session.load_document(&discovery)?;
        let node = session.bind_key(key, target, document.as_ref())?;
        if !session.has_snapshot() {
            session.commit(discovery.into_snapshot());
        }
        self.inner.loaded.store(true, Ordering::Release);
        Ok(node)
    }

    /// Resolve `key` starting from `baseline` and keep the result current.
    ///
    /// Every reload re-binds from a fresh clone of `baseline`, so removed
    /// file or environment values fall back to the baseline rather than
    /// lingering. Starts the reload loop on first use when auto-reload is
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns any resolution error, or [`ConfigError::ReloadSpawn`] when the
    /// reload thread cannot be started.
    pub fn load_with_key<T>(&self, key: &str, baseline: T) -> ConfigResult<Live<T>>
    where
        T: Bindable + Clone + Send + Sync + 'static,
    {
        let mut value = baseline.clone();
        let node = self.resolve_initial(key, &mut value)?;
        let live = Live {
            key: key.to_owned(),
            value: Arc::new(ArcSwap::from_pointee(value)),
            subscribers: Arc::new(Mutex::new(Vec::new())),
        };
        let entry = Entry {
            key: key.to_owned(),
            baseline,
            last: Mutex::new(node),
            value: Arc::clone(&live.value),
            subscribers: Arc::clone(&live.subscribers),
        };
        self.inner.registry.lock().push(Arc::new(entry));
        self.start_reload()?;
        Ok(live)
    }

    /// A provider over the merged, expanded document of the configured files.
    ///
    /// # Errors
    ///
    /// Returns any read, decode, merge or expansion error.
    pub fn provider(&self) -> ConfigResult<DocumentProvider> {
        let session = self.session();
        let discovery = session.discover(&session.settings().files, false);
        let document = session.load_document(&discovery)?;
        Ok(DocumentProvider::new("config", document))
    }

    /// Run one reload tick now. Returns whether any registered value changed.
    ///
    /// # Errors
    ///
    /// Returns the tick's error; failures of several keys are aggregated.
    /// The previous values stay live.
    pub fn reload_now(&self) -> ConfigResult<bool> {
        tick(&self.inner, None)
    }

    /// Stop the reload loop. It is not restarted by later registrations.
    pub fn stop(&self) {
        self.inner.reload_started.store(true, Ordering::Release);
        let handle = self.inner.reload.lock().take();
        if let Some(mut handle) = handle {
            handle.stop();
        }
    }

    fn start_reload(&self) -> ConfigResult<()> {
        let session = self.session();
        let settings = session.settings();
        if !settings.auto_reload || self.inner.reload_started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let weak = Arc::downgrade(&self.inner);
        let handle = ReloadHandle::spawn(settings.reload_interval, move |state| {
            let Some(inner) = weak.upgrade() else {
                return false;
            };
            match tick(&inner, Some(state)) {
                Ok(true) => info!("configuration reloaded"),
                Ok(false) => {}
                Err(err) => warn!(error = %err, "configuration reload failed"),
            }
            true
        })?;
        *self.inner.reload.lock() = Some(handle);
        Ok(())
    }
}

/// Re-resolve every registered key when the discovered files changed.
///
/// The snapshot is committed only when every key re-bound, so a failed tick
/// is retried on the next one.
fn tick(inner: &Inner, state: Option<&StateCell>) -> ConfigResult<bool> {
    let session = Arc::clone(&inner.session.read());
    let discovery = session.discover(&session.settings().files, true);
    if session.is_unchanged(discovery.snapshot()) {
        return Ok(false);
    }
    if let Some(state) = state {
        state.set(ReloadState::Resolving);
    }
    let document = session.load_document(&discovery)?;
    let entries = inner.registry.lock().clone();
    let listeners = inner.listeners.lock().clone();
    let mut errors = Vec::new();
    let mut changed = false;
    for entry in entries {
        match entry.rebind(&session, document.as_ref()) {
            Ok(Some(node)) => {
                changed = true;
                for listener in &listeners {
                    listener(entry.key(), &node);
                }
            }
            Ok(None) => {}
            Err(err) => errors.push(err),
        }
    }
    if let Some(err) = ConfigError::try_aggregate(errors) {
        return Err(Arc::new(err));
    }
    session.commit(discovery.into_snapshot());
    Ok(changed)
}
