//! Serialised mutation of process environment variables.
//!
//! Every change holds a global re-entrant lock and returns a guard that
//! restores the prior value when dropped. Guards for the same key restore in
//! LIFO order. Hold [`lock`] when a test needs several changes to appear
//! atomically to other tests.
//!
//! # Examples
//!
//! ```
//! use test_helpers::env;
//!
//! let _guard = env::set_var("CASCADE_DOC_KEY", "value");
//! assert_eq!(std::env::var("CASCADE_DOC_KEY").as_deref(), Ok("value"));
//! ```

use std::{
    env,
    ffi::{OsStr, OsString},
    fmt,
    sync::LazyLock,
};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

static ENV_LOCK: LazyLock<ReentrantMutex<()>> = LazyLock::new(ReentrantMutex::default);

enum Change<'a> {
    Set(&'a OsStr),
    Remove,
}

fn apply(key: &str, change: Change<'_>) {
    let _held = ENV_LOCK.lock();
    match change {
        // SAFETY: all mutation in the test suite goes through `ENV_LOCK`.
        Change::Set(value) => unsafe { env::set_var(key, value) },
        // SAFETY: as above.
        Change::Remove => unsafe { env::remove_var(key) },
    }
}

fn guarded(key: String, change: Change<'_>) -> EnvVarGuard {
    let _held = ENV_LOCK.lock();
    let original = env::var_os(&key);
    apply(&key, change);
    EnvVarGuard { key, original }
}

/// Restores one variable to its prior value on drop.
#[must_use = "dropping restores the prior value"]
pub struct EnvVarGuard {
    key: String,
    original: Option<OsString>,
}

impl fmt::Debug for EnvVarGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvVarGuard")
            .field("key", &self.key)
            .field("had_original", &self.original.is_some())
            .finish()
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        if let Some(value) = self.original.take() {
            apply(&self.key, Change::Set(&value));
        } else {
            apply(&self.key, Change::Remove);
        }
    }
}

/// Holds the environment lock for its lifetime.
#[must_use = "dropping releases the environment lock"]
pub struct EnvLock {
    _held: ReentrantMutexGuard<'static, ()>,
}

impl fmt::Debug for EnvLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EnvLock")
    }
}

/// Set `key` to `value` until the guard drops.
pub fn set_var<K, V>(key: K, value: V) -> EnvVarGuard
where
    K: Into<String>,
    V: AsRef<OsStr>,
{
    guarded(key.into(), Change::Set(value.as_ref()))
}

/// Unset `key` until the guard drops.
pub fn remove_var<K: Into<String>>(key: K) -> EnvVarGuard {
    guarded(key.into(), Change::Remove)
}

/// Acquire the environment lock.
pub fn lock() -> EnvLock {
    EnvLock {
        _held: ENV_LOCK.lock(),
    }
}

/// Set several variables at once while holding the lock. The returned
/// guards restore them in reverse order.
pub fn set_vars<I, K, V>(pairs: I) -> Vec<EnvVarGuard>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: AsRef<OsStr>,
{
    let _lock = lock();
    pairs.into_iter().map(|(key, value)| set_var(key, value)).collect()
}

#[cfg(test)]
mod tests {
    use std::env;

    use rstest::rstest;

    use super::{lock, remove_var, set_var, set_vars};

    #[rstest]
    fn restores_absent_variables() {
        let _lock = lock();
        let key = "CASCADE_HELPERS_ABSENT";
        let _clear = remove_var(key);
        {
            let _guard = set_var(key, "temporary");
            assert_eq!(env::var(key).as_deref(), Ok("temporary"));
        }
        assert!(env::var_os(key).is_none());
    }

    #[rstest]
    fn stacked_guards_restore_in_reverse_order() {
        let _lock = lock();
        let key = "CASCADE_HELPERS_STACKED";
        let outer = set_var(key, "outer");
        let inner = set_var(key, "inner");
        drop(inner);
        assert_eq!(env::var(key).as_deref(), Ok("outer"));
        drop(outer);
        assert!(env::var_os(key).is_none());
    }

    #[rstest]
    fn set_vars_applies_every_pair() {
        let guards = set_vars([("CASCADE_HELPERS_A", "1"), ("CASCADE_HELPERS_B", "2")]);
        assert_eq!(env::var("CASCADE_HELPERS_A").as_deref(), Ok("1"));
        assert_eq!(env::var("CASCADE_HELPERS_B").as_deref(), Ok("2"));
        drop(guards);
        assert!(env::var_os("CASCADE_HELPERS_A").is_none());
    }
}
