//! Atomic publication of the working files.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::Result;
use crate::config::UpdateConfig;
use crate::utils::fs::replace_file;

/// Working and final locations of the run outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub working_result: PathBuf,
    pub final_result: PathBuf,
    pub working_log: PathBuf,
    pub final_log: PathBuf,
}

impl RunPaths {
    /// Paths relative to the current directory, as named by `config`.
    pub fn from_config(config: &UpdateConfig) -> Self {
        Self {
            working_result: config.working_result_file(),
            final_result: config.final_file.clone(),
            working_log: config.working_log_file(),
            final_log: config.final_log_file(),
        }
    }

    /// Same as [`RunPaths::from_config`], resolved against `dir`.
    pub fn in_dir(dir: &Path, config: &UpdateConfig) -> Self {
        let paths = Self::from_config(config);
        Self {
            working_result: dir.join(paths.working_result),
            final_result: dir.join(paths.final_result),
            working_log: dir.join(paths.working_log),
            final_log: dir.join(paths.final_log),
        }
    }
}

/// Moves the working result and log over their final names.
#[derive(Debug, Clone)]
pub struct Publisher {
    paths: RunPaths,
}

impl Publisher {
    pub fn new(paths: RunPaths) -> Self {
        Self { paths }
    }

    /// Replace the final files. Missing working files are skipped.
    ///
    /// Returns the final paths that were replaced.
    pub async fn publish(&self) -> Result<Vec<PathBuf>> {
        let pairs = [
            (&self.paths.working_result, &self.paths.final_result),
            (&self.paths.working_log, &self.paths.final_log),
        ];

        let mut published = Vec::with_capacity(pairs.len());
        for (source, target) in pairs {
            if replace_file(source, target).await? {
                info!(
                    from = %source.display(),
                    to = %target.display(),
                    "Published file"
                );
                published.push(target.clone());
            } else {
                debug!(path = %source.display(), "Nothing to publish");
            }
        }
        Ok(published)
    }
}
