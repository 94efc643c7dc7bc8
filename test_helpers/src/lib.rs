//! Test helpers shared across the workspace.
//!
//! - [`env`] serialises process-environment mutation behind RAII guards.
//! - [`files`] provides a scratch configuration directory whose file
//!   modification times can be set explicitly.
//! - [`jail`] runs closures inside a `figment::Jail`.

pub mod env;
pub mod files;
pub mod jail;
