//! `figment::Jail` wrapper returning `anyhow` results.

use anyhow::{Result, anyhow};

/// Run `f` inside a fresh jail: a scratch working directory with the
/// process environment restored afterwards.
///
/// # Errors
///
/// Returns the closure's error, or an error when the jail cannot be set up.
pub fn with_jail<F, T>(f: F) -> Result<T>
where
    F: FnOnce(&mut figment::Jail) -> Result<T>,
{
    let mut output = None;
    figment::Jail::try_with(|jail| {
        output = Some(f(jail).map_err(|err| figment::Error::from(err.to_string()))?);
        Ok(())
    })
    .map_err(|err| anyhow!(err.to_string()))?;
    output.ok_or_else(|| anyhow!("jail closure did not return a value"))
}
