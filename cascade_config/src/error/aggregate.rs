//! Several errors raised by one operation.

use std::{error::Error, fmt, slice, sync::Arc};

use super::ConfigError;

/// Errors gathered while re-binding every registered key, or while building
/// a provider from several sources.
///
/// # Examples
///
/// ```
/// use cascade_config::ConfigError;
/// let e = ConfigError::aggregate(vec![
///     ConfigError::UndefinedVariable { name: "HOST".into() },
///     ConfigError::AlreadyLoaded,
/// ]);
/// if let ConfigError::Aggregate(all) = e {
///     assert_eq!(all.len(), 2);
///     assert!(all.to_string().starts_with("- variable 'HOST'"));
/// }
/// ```
#[derive(Debug, Default)]
pub struct AggregatedErrors(Vec<Arc<ConfigError>>);

impl AggregatedErrors {
    /// Wrap `errors` in the order they were raised.
    #[must_use]
    pub const fn new(errors: Vec<Arc<ConfigError>>) -> Self {
        Self(errors)
    }

    /// Borrow each error.
    #[must_use = "iterators should be consumed to inspect errors"]
    pub fn iter(&self) -> impl Iterator<Item = &ConfigError> {
        self.0.iter().map(Arc::as_ref)
    }

    /// Shared handles to the errors.
    #[must_use]
    pub fn as_slice(&self) -> &[Arc<ConfigError>] {
        &self.0
    }

    /// Number of errors held.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was gathered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AggregatedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = self.0.iter();
        if let Some(first) = lines.next() {
            write!(f, "- {first}")?;
        }
        for err in lines {
            write!(f, "\n- {err}")?;
        }
        Ok(())
    }
}

impl Error for AggregatedErrors {}

impl<'a> IntoIterator for &'a AggregatedErrors {
    type Item = &'a Arc<ConfigError>;
    type IntoIter = slice::Iter<'a, Arc<ConfigError>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for AggregatedErrors {
    type Item = Arc<ConfigError>;
    type IntoIter = std::vec::IntoIter<Arc<ConfigError>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
