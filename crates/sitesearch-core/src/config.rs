//! Configuration management.
//!
//! Settings come from an optional TOML file layered with environment variables.
//! The conventional `ALGOLIA_*` variables override everything else so the
//! tool can run in CI with no file at all.

use std::{collections::HashMap, fmt, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Prefix for structured environment overrides (`SITESEARCH__INDEX__APP_ID`).
pub const ENV_PREFIX: &str = "SITESEARCH";

/// Environment variable holding the application identifier.
pub const ENV_APP_ID: &str = "ALGOLIA_APP_ID";

/// Environment variable holding the write API key.
pub const ENV_API_KEY: &str = "ALGOLIA_API_KEY";

/// Legacy name for [`ENV_API_KEY`].
pub const ENV_ADMIN_KEY: &str = "ALGOLIA_ADMIN_KEY";

/// Environment variable holding the index name.
pub const ENV_INDEX_NAME: &str = "ALGOLIA_INDEX_NAME";

/// Environment variable toggling per-document error tolerance.
pub const ENV_SKIP_ON_ERROR: &str = "SITESEARCH_SKIP_ON_ERROR";

/// Largest batch accepted by the remote batch endpoint.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Site layout settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// Remote index settings.
    #[serde(default)]
    pub index: IndexConfig,

    /// Record extraction settings.
    #[serde(default)]
    pub records: RecordsConfig,

    /// Synchronization policy.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Site layout configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Base URL prepended to record URLs (e.g., "https://docs.example.com").
    /// Empty means records carry site-relative URLs.
    #[serde(default)]
    pub base_url: String,

    /// Directory holding the content sources with frontmatter.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Directory holding the pre-rendered HTML pages, keyed by slug.
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,
}

/// Remote index configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Application identifier.
    #[serde(default)]
    pub app_id: String,

    /// API key with write access.
    #[serde(default)]
    pub api_key: String,

    /// Target index name.
    #[serde(default)]
    pub index_name: String,

    /// Records per batch request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Host override (e.g., a local proxy). Used for both reads and writes.
    #[serde(default)]
    pub host: Option<String>,
}

/// Record extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsConfig {
    /// Elements tried in order as the content root.
    #[serde(default = "default_content_tags")]
    pub content_tags: Vec<String>,

    /// Elements skipped together with their content.
    #[serde(default = "default_ignore_tags")]
    pub ignore_tags: Vec<String>,

    /// Text blocks shorter than this (in characters) are dropped.
    #[serde(default = "default_min_content_len")]
    pub min_content_len: usize,

    /// Text blocks are truncated to this many characters.
    #[serde(default = "default_max_content_len")]
    pub max_content_len: usize,

    /// Derive object IDs from slug and position instead of letting the
    /// remote assign them.
    #[serde(default = "default_true")]
    pub stable_ids: bool,
}

/// Synchronization policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Log and skip documents that fail instead of aborting the run.
    #[serde(default)]
    pub skip_on_error: bool,
}

fn default_content_dir() -> String {
    "content".to_string()
}

fn default_pages_dir() -> String {
    "out".to_string()
}

fn default_batch_size() -> usize {
    1000
}

fn default_content_tags() -> Vec<String> {
    vec!["main".to_string(), "article".to_string()]
}

fn default_ignore_tags() -> Vec<String> {
    ["nav", "header", "footer", "aside"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_min_content_len() -> usize {
    3
}

fn default_max_content_len() -> usize {
    2000
}

fn default_true() -> bool {
    true
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            content_dir: default_content_dir(),
            pages_dir: default_pages_dir(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            api_key: String::new(),
            index_name: String::new(),
            batch_size: default_batch_size(),
            host: None,
        }
    }
}

impl fmt::Debug for IndexConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.api_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("IndexConfig")
            .field("app_id", &self.app_id)
            .field("api_key", &key)
            .field("index_name", &self.index_name)
            .field("batch_size", &self.batch_size)
            .field("host", &self.host)
            .finish()
    }
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            content_tags: default_content_tags(),
            ignore_tags: default_ignore_tags(),
            min_content_len: default_min_content_len(),
            max_content_len: default_max_content_len(),
            stable_ids: true,
        }
    }
}

impl Config {
    /// Load configuration from an optional file and the process environment.
    ///
    /// A missing file is not an error: every setting can come from the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], without validation.
    pub fn read(path: &Path) -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let path = path.exists().then_some(path);
        if path.is_none() {
            tracing::debug!("no configuration file, using environment only");
        }
        Self::read_from(path, &env)
    }

    /// Load configuration from an optional file and an explicit environment map.
    pub fn load_from(path: Option<&Path>, env: &HashMap<String, String>) -> Result<Self> {
        let config = Self::read_from(path, env)?;
        config.validate()?;
        Ok(config)
    }

    /// Layer the file and environment sources without validating the result.
    pub fn read_from(path: Option<&Path>, env: &HashMap<String, String>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(CoreError::config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );

        let api_key = env
            .get(ENV_API_KEY)
            .or_else(|| env.get(ENV_ADMIN_KEY))
            .cloned();

        builder = builder
            .set_override_option("index.app_id", env.get(ENV_APP_ID).cloned())?
            .set_override_option("index.api_key", api_key)?
            .set_override_option("index.index_name", env.get(ENV_INDEX_NAME).cloned())?;

        if let Some(raw) = env.get(ENV_SKIP_ON_ERROR) {
            let flag = parse_flag(raw).ok_or_else(|| {
                CoreError::config(format!(
                    "{ENV_SKIP_ON_ERROR} must be a boolean, got {raw:?}"
                ))
            })?;
            builder = builder.set_override("sync.skip_on_error", flag)?;
        }

        let config: Config = builder.build()?.try_deserialize().map_err(|e| {
            CoreError::config_with_source("Failed to parse configuration", e)
        })?;

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Missing credentials are reported together so a CI run fails once with
    /// everything that needs to be set.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.index.app_id.trim().is_empty() {
            missing.push(format!("index.app_id ({ENV_APP_ID})"));
        }
        if self.index.api_key.trim().is_empty() {
            missing.push(format!("index.api_key ({ENV_API_KEY})"));
        }
        if self.index.index_name.trim().is_empty() {
            missing.push(format!("index.index_name ({ENV_INDEX_NAME})"));
        }
        if !missing.is_empty() {
            return Err(CoreError::config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        if self.index.batch_size == 0 || self.index.batch_size > MAX_BATCH_SIZE {
            return Err(CoreError::config(format!(
                "index.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.index.batch_size
            )));
        }

        if self.records.min_content_len > self.records.max_content_len {
            return Err(CoreError::config(
                "records.min_content_len cannot exceed records.max_content_len",
            ));
        }

        if self.site.base_url.ends_with('/') {
            tracing::warn!("site.base_url should not have a trailing slash");
        }

        Ok(())
    }
}

/// Join a base URL, a slug and an optional fragment.
pub fn build_url(base_url: &str, slug: &str, anchor: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    let path = slug.trim_matches('/');
    let mut url = format!("{base}/{path}");
    if let Some(anchor) = anchor.filter(|a| !a.is_empty()) {
        url.push('#');
        url.push_str(anchor);
    }
    url
}

/// Parse a boolean flag from its common textual forms.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
