//! Layered configuration resolution.
//!
//! Files, in-memory defaults and environment variables are folded into one
//! document, the sub-tree for a key is extracted and bound onto a typed
//! struct described by [`Bindable`]. A [`Config`] keeps registered values
//! current by re-resolving them when their files change.
//!
//! Binding order for a field is: `#[bind(default = "...")]`, then the merged
//! file value, then the environment. Environment names derive from the
//! prefix, the registered key and the field path, for example
//! `CONFIG_SERVER_PORT` for `port` under the key `server`.
//!
//! The companion `cascade_config_macros` crate implements
//! `#[derive(Bindable)]`.

extern crate self as cascade_config;

pub use cascade_config_macros::Bindable;

mod bind;
mod codec;
mod config;
mod document;
mod env;
mod error;
mod expand;
mod fs;
mod merge;
mod options;
mod path;
mod provider;
mod reload;
mod result_ext;
mod schema;
mod session;

use std::sync::Arc;

pub use bind::Binder;
#[cfg(feature = "toml")]
pub use codec::TomlCodec;
pub use codec::{Codec, CodecError, Codecs, JsonCodec, YamlCodec};
pub use config::{Config, ConfigBuilder, Live};
pub use document::{DecodeError, Mapping, Node, Shape, from_node, to_node};
pub use env::{EnvLookup, MapEnv, OsEnv, env_bool};
pub use error::{AggregatedErrors, ConfigError};
pub use expand::{escape, expand, expand_node};
pub use fs::{FileStat, FileSystem, MemoryFileSystem, OsFileSystem};
pub use merge::{DocumentMerger, Source, merge};
pub use options::{
    DEFAULT_ENV_PREFIX, DEFAULT_ENVIRONMENT, DEFAULT_RELOAD_INTERVAL, NO_PREFIX, Options, Settings,
};
pub use path::{Path, ROOT};
pub use provider::{
    AsProvider, DEFAULT_PROVIDER_NAME, DocumentProvider, DocumentProviderBuilder, Lookup,
    NopProvider, Provider, ScopedProvider, Value, provider_group,
};
pub use reload::ReloadState;
pub use result_ext::ConfigResultExt;
pub use schema::{Bindable, Describe, FieldKind, FieldSpec, Schema};
pub use session::{Discovery, ResolutionSession, Snapshot};

/// Result type used across the crate. Errors are shared so aggregated reload
/// failures can hold the same error as the tick that raised it.
pub type ConfigResult<T> = Result<T, Arc<ConfigError>>;
