//! Site configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::PlanError;

/// File names searched, in order, when the config path is a directory.
pub const CONFIG_FILE_NAMES: [&str; 2] = [".s3_website.yaml", ".s3_website.yml"];

/// Contents of `.s3_website.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteConfig {
    /// Bucket the site is synced to.
    pub s3_bucket: String,

    /// Site directory, relative to the config file.
    #[serde(default = "default_site")]
    pub site: String,

    /// CDN distribution to invalidate, if any.
    #[serde(default)]
    pub cloudfront_distribution_id: Option<String>,

    /// Document served for directory requests, e.g. `index.html`.
    #[serde(default)]
    pub index_document: Option<String>,
}

fn default_site() -> String {
    ".".to_string()
}

impl SiteConfig {
    /// Parse config from YAML. `path` is only used in errors.
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, PlanError> {
        serde_yaml::from_str(content).map_err(|source| PlanError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load config from a file.
    pub fn load_file(path: &Path) -> Result<Self, PlanError> {
        let content = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content, path)
    }

    /// Load config from a file or from a directory holding one of
    /// [`CONFIG_FILE_NAMES`].
    ///
    /// Returns the config and the base path the `site` directory is relative
    /// to: the directory itself, or the file's parent.
    pub fn load(path: &Path) -> Result<(Self, PathBuf), PlanError> {
        if !path.is_dir() {
            let config = Self::load_file(path)?;
            let base_path = path.parent().map(Path::to_path_buf).unwrap_or_default();
            return Ok((config, base_path));
        }

        for name in CONFIG_FILE_NAMES {
            let candidate = path.join(name);
            match Self::load_file(&candidate) {
                Ok(config) => return Ok((config, path.to_path_buf())),
                Err(err) => {
                    debug!(path = %candidate.display(), error = %err, "unable to load config");
                }
            }
        }

        Err(PlanError::ConfigNotFound {
            dir: path.to_path_buf(),
        })
    }

    /// Resolve the site directory against `base_path`.
    pub fn site_dir(&self, base_path: &Path) -> PathBuf {
        base_path.join(&self.site)
    }
}
