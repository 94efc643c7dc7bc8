//! Candidate file discovery.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};

use super::{Discovery, ResolutionSession};
use crate::ConfigError;

const EXAMPLE_ENVIRONMENT: &str = "example";

/// `config.yaml` becomes `config.<environment>.yaml`; a name without an
/// extension gains `.<environment>`.
pub(crate) fn variant(path: &Utf8Path, environment: &str) -> Utf8PathBuf {
    path.extension().map_or_else(
        || path.with_extension(environment),
        |extension| path.with_extension(format!("{environment}.{extension}")),
    )
}

impl ResolutionSession {
    fn is_regular_file(&self, path: &Utf8Path) -> Option<std::time::SystemTime> {
        self.fs
            .stat(path)
            .ok()
            .filter(|stat| stat.is_file)
            .map(|stat| stat.modified)
    }

    /// Find the files to merge for `files`.
    ///
    /// Names are walked from lowest to highest precedence. Each contributes
    /// its bare file followed by its environment variant, so the variant
    /// overrides the bare file and earlier names override later ones. When
    /// neither exists the `example` variant is used instead, and when that is
    /// missing too the name is skipped.
    #[must_use]
    pub fn discover(&self, files: &[Utf8PathBuf], watch_mode: bool) -> Discovery {
        let settings = &self.settings;
        if !watch_mode && (settings.debug || settings.verbose) {
            info!(environment = %settings.environment, "current environment");
        }
        let mut discovery = Discovery::default();
        let mut record = |path: Utf8PathBuf, modified| {
            discovery.snapshot.0.insert(path.clone(), modified);
            discovery.files.push(path);
        };
        for file in files.iter().rev() {
            let mut found = false;
            if let Some(modified) = self.is_regular_file(file) {
                found = true;
                record(file.clone(), modified);
            }
            let with_env = variant(file, &settings.environment);
            if let Some(modified) = self.is_regular_file(&with_env) {
                found = true;
                record(with_env.clone(), modified);
            }
            if found {
                continue;
            }
            let example = variant(file, EXAMPLE_ENVIRONMENT);
            if let Some(modified) = self.is_regular_file(&example) {
                if !watch_mode && !settings.silent {
                    warn!(file = %file, example = %example, "failed to find configuration, using example file");
                }
                record(example, modified);
            } else if !settings.silent {
                let err = ConfigError::FileDiscovery {
                    path: file.clone(),
                    message: format!("neither {with_env} nor {example} exists"),
                };
                if watch_mode {
                    debug!(error = %err, "skipping configuration file");
                } else {
                    warn!(error = %err, "skipping configuration file");
                }
            }
        }
        discovery
    }
}
