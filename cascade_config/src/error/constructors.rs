//! Constructors and aggregation helpers for `ConfigError`.

use std::sync::Arc;

use camino::Utf8Path;

use super::{AggregatedErrors, ConfigError};

impl ConfigError {
    /// Tries to build a [`ConfigError`] from an iterator of errors.
    ///
    /// Returns `None` for an empty iterator, the error itself when a single
    /// uniquely owned error is supplied, and [`Self::Aggregate`] otherwise.
    #[must_use]
    pub fn try_aggregate<I, E>(errors: I) -> Option<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Arc<Self>>,
    {
        let mut arcs: Vec<Arc<Self>> = errors.into_iter().map(Into::into).collect();
        if arcs.len() > 1 {
            return Some(Self::Aggregate(Box::new(AggregatedErrors::new(arcs))));
        }
        let last = arcs.pop()?;
        Some(match Arc::try_unwrap(last) {
            Ok(err) => err,
            Err(shared) => Self::Aggregate(Box::new(AggregatedErrors::new(vec![shared]))),
        })
    }

    /// Build a [`ConfigError`] from at least one error.
    ///
    /// # Panics
    ///
    /// Panics if `errors` is empty. Use [`ConfigError::try_aggregate`] when the
    /// list may be empty.
    #[must_use]
    #[track_caller]
    pub fn aggregate<I, E>(errors: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Arc<Self>>,
    {
        Self::try_aggregate(errors).map_or_else(
            || panic!("aggregate requires at least one error"),
            |err| err,
        )
    }

    /// Construct a decode failure for `origin`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cascade_config::ConfigError;
    /// let e = ConfigError::decode("config.yaml", "unexpected end of input");
    /// assert!(matches!(e, ConfigError::Decode { .. }));
    /// ```
    #[must_use]
    pub fn decode(origin: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            origin: origin.into(),
            message: message.to_string(),
        }
    }

    /// Construct a shared file read failure for `path`.
    #[must_use]
    pub fn file(path: &Utf8Path, source: std::io::Error) -> Arc<Self> {
        Arc::new(Self::File {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Construct a shared duplicate-key error for `path`.
    #[must_use]
    pub fn duplicate_key(path: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::DuplicateKey { path: path.into() })
    }

    /// Construct a shared invalid-target error.
    #[must_use]
    pub fn invalid_target(message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::InvalidTarget {
            message: message.into(),
        })
    }

    /// Returns `true` for errors a session recovers from locally.
    #[must_use]
    pub const fn is_soft(&self) -> bool {
        matches!(self, Self::FileDiscovery { .. })
    }
}
