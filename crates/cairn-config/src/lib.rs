//! Configuration management for cairn.
//!
//! Parses `cairn.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Command-line values can be applied during load via [`Overrides`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `site.src`
//! - `site.dest`
//! - `site.location`
//!
//! ## Root Data
//!
//! The `[data]` table becomes the root directory's own data and cascades to
//! every page. It goes through the same validation as any loaded data file,
//! so an unknown `mergedKeys` strategy fails at load time.

mod expand;

use std::path::{Path, PathBuf};

use cairn_tree::{Data, DataError, TreeOptions, UrlStyle};
use serde::Deserialize;

/// Command-line values that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct Overrides {
    /// Override source directory.
    pub src: Option<PathBuf>,
    /// Override output directory.
    pub dest: Option<PathBuf>,
    /// Override public site location.
    pub location: Option<String>,
    /// Override URL style.
    pub url_style: Option<UrlStyle>,
}

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "cairn.toml";

const DEFAULT_DEST: &str = "_site";
const DEFAULT_LOCATION: &str = "http://localhost/";

/// Site configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site paths and location (paths are relative strings from TOML).
    site: SiteConfigRaw,
    /// URL derivation settings.
    pub urls: UrlsConfig,
    /// Root directory data, as written.
    data: toml::Table,

    /// Resolved site configuration (set after loading).
    #[serde(skip)]
    pub site_resolved: SiteConfig,
    /// Root directory data, validated (set after loading).
    #[serde(skip)]
    pub root_data: Data,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw site configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SiteConfigRaw {
    src: Option<String>,
    dest: Option<String>,
    location: Option<String>,
}

/// Resolved site configuration with absolute paths.
#[derive(Debug, Default)]
pub struct SiteConfig {
    /// Directory the walker reads from.
    pub src: PathBuf,
    /// Directory the writer materializes into.
    pub dest: PathBuf,
    /// Public base URL of the site.
    pub location: String,
}

/// URL derivation settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UrlsConfig {
    /// How page URLs are derived from destinations.
    pub style: UrlStyle,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Root data rejected by the loader.
    #[error("Invalid [data] section: {0}")]
    Data(#[from] DataError),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`site.location`").
        field: String,
        /// Error message (e.g., "${`SITE_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional overrides.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `cairn.toml` in current directory and parents.
    ///
    /// Overrides are applied after loading and path resolution, so
    /// command-line values take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// validation fails.
    pub fn load(
        config_path: Option<&Path>,
        overrides: Option<&Overrides>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(overrides) = overrides {
            config.apply_overrides(overrides);
            config.validate()?;
        }

        Ok(config)
    }

    /// Options for the content tree built from this configuration.
    #[must_use]
    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            url_style: self.urls.style,
            root_data: self.root_data.clone(),
        }
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let site = &self.site_resolved;
        require_non_empty(&site.location, "site.location")?;
        require_http_url(&site.location, "site.location")?;

        if site.dest.as_os_str().is_empty() {
            return Err(ConfigError::Validation("site.dest cannot be empty".to_owned()));
        }
        if site.dest == site.src {
            return Err(ConfigError::Validation(
                "site.dest cannot be the same directory as site.src".to_owned(),
            ));
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(src) = &overrides.src {
            self.site_resolved.src.clone_from(src);
        }
        if let Some(dest) = &overrides.dest {
            self.site_resolved.dest.clone_from(dest);
        }
        if let Some(location) = &overrides.location {
            self.site_resolved.location.clone_from(location);
        }
        if let Some(style) = overrides.url_style {
            self.urls.style = style;
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            site: SiteConfigRaw::default(),
            urls: UrlsConfig::default(),
            data: toml::Table::new(),
            site_resolved: SiteConfig {
                src: base.to_path_buf(),
                dest: base.join(DEFAULT_DEST),
                location: DEFAULT_LOCATION.to_owned(),
            },
            root_data: Data::new(),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");

        Ok(config)
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let site = &mut self.site;
        for (value, field) in [
            (&mut site.src, "site.src"),
            (&mut site.dest, "site.dest"),
            (&mut site.location, "site.location"),
        ] {
            if let Some(raw) = value {
                *raw = expand::expand_env(raw, field)?;
            }
        }
        Ok(())
    }

    /// Resolve relative paths against the config directory and validate the
    /// root data.
    fn resolve(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.site_resolved = SiteConfig {
            src: resolve(self.site.src.as_deref(), "."),
            dest: resolve(self.site.dest.as_deref(), DEFAULT_DEST),
            location: self
                .site
                .location
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCATION.to_owned()),
        };

        let data = serde_json::Value::Object(
            self.data
                .iter()
                .map(|(key, value)| (key.clone(), toml_to_json(value)))
                .collect(),
        );
        self.root_data = Data::from_json(data)?;

        Ok(())
    }
}

/// Search for the config file in `start` and its parents.
#[must_use]
pub fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Convert a TOML value to the JSON shape data loaders produce.
///
/// Datetimes become RFC 3339 strings; non-finite floats become null.
fn toml_to_json(value: &toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s.clone()),
        toml::Value::Integer(i) => serde_json::Value::from(*i),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        toml::Value::Boolean(b) => serde_json::Value::Bool(*b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .iter()
                .map(|(key, value)| (key.clone(), toml_to_json(value)))
                .collect(),
        ),
    }
}
