//! Extensions for mapping errors to `ConfigResult` concisely.
//!
//! These helpers reduce repetitive `.map_err(|e| Arc::new(ConfigError::…))`
//! patterns when converting external error types into the crate's
//! `ConfigResult<T>` alias (`Result<T, Arc<ConfigError>>`).
//!
//! # Examples
//!
//! ```
//! use cascade_config::{ConfigResult, ConfigResultExt};
//!
//! fn parse(text: &str) -> ConfigResult<serde_json::Value> {
//!     serde_json::from_str(text).into_decode("inline")
//! }
//! assert!(parse("{").is_err());
//! ```

use std::sync::Arc;

use crate::{ConfigError, ConfigResult};

/// Generic extension for mapping any `Result<T, E>` with `E: Into<ConfigError>`
/// into a `ConfigResult<T>`.
pub trait ConfigResultExt<T, E> {
    /// Convert `Result<T, E>` into `ConfigResult<T>` using `Into<ConfigError>`.
    ///
    /// # Errors
    ///
    /// Propagates the original error after conversion into `Arc<ConfigError>`.
    fn into_config(self) -> ConfigResult<T>
    where
        E: Into<ConfigError>;

    /// Convert any displayable error into a [`ConfigError::Decode`] tagged
    /// with `origin`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Decode` wrapped in `Arc` when the input is `Err`.
    fn into_decode(self, origin: &str) -> ConfigResult<T>
    where
        E: std::fmt::Display;
}

impl<T, E> ConfigResultExt<T, E> for Result<T, E> {
    fn into_config(self) -> ConfigResult<T>
    where
        E: Into<ConfigError>,
    {
        self.map_err(|e| Arc::new(e.into()))
    }

    fn into_decode(self, origin: &str) -> ConfigResult<T>
    where
        E: std::fmt::Display,
    {
        self.map_err(|e| Arc::new(ConfigError::decode(origin, e)))
    }
}

