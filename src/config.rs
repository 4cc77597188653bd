//! Configuration management for the storage bundle
//!
//! Storages are declared in a TOML file (one table per storage) and may be
//! overridden from the environment. Validation happens here, before anything
//! is registered.

use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use config::builder::DefaultState;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::adapter::AdapterOptions;
use crate::storage::{FilesystemOptions, Visibility};

/// Adapter kind of storages that defer to another storage
pub const LAZY_ADAPTER: &str = "lazy";

/// Option naming the storage a lazy storage defers to
pub const LAZY_SOURCE_OPTION: &str = "source";

const ENV_PREFIX: &str = "STORAGE_BUNDLE";
const ENV_SEPARATOR: &str = "__";

/// Complete bundle configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BundleConfig {
    #[serde(default)]
    pub storages: BTreeMap<String, StorageConfig>,
}

/// Configuration of a single storage
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Built-in adapter kind, `lazy`, or the name of a custom adapter
    pub adapter: String,

    #[serde(default)]
    pub options: AdapterOptions,

    /// Visibility applied to newly written files (`public` or `private`)
    #[serde(default)]
    pub visibility: Option<String>,

    #[serde(default = "default_case_sensitive")]
    pub case_sensitive: bool,

    #[serde(default)]
    pub disable_asserts: bool,

    /// Prefix under which the storage is mounted in the mount manager
    #[serde(default)]
    pub mount_prefix: Option<String>,
}

fn default_case_sensitive() -> bool {
    true
}

impl BundleConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        // Try the packaged path first, then the working directory
        let config_paths = ["storage-bundle/config", "config"];

        for config_path in &config_paths {
            if !Path::new(&format!("{}.toml", config_path)).exists() {
                continue;
            }
            let builder = Config::builder()
                .add_source(File::with_name(config_path))
                .add_source(Self::environment());
            return Self::from_builder(builder);
        }

        Err(ConfigError::NotFound(format!(
            "config.toml (tried {:?})",
            config_paths
        )))
    }

    /// Load configuration from an explicit file with environment overrides
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path))
            .add_source(Self::environment());
        Self::from_builder(builder)
    }

    /// Parse configuration from TOML text, without environment overrides
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        Self::from_builder(builder)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: BundleConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut prefixes = HashSet::new();

        for (name, storage) in &self.storages {
            if name.trim().is_empty() {
                return Err(ConfigError::Message("storage name cannot be empty".into()));
            }

            storage.validate(name)?;

            if let Some(prefix) = &storage.mount_prefix {
                if !prefixes.insert(prefix.as_str()) {
                    return Err(ConfigError::Message(format!(
                        "storage '{}': mount_prefix '{}' is used by another storage",
                        name, prefix
                    )));
                }
            }
        }

        Ok(())
    }
}

impl StorageConfig {
    /// A storage bound to `adapter` with default settings
    pub fn new(adapter: impl Into<String>, options: AdapterOptions) -> Self {
        Self {
            adapter: adapter.into(),
            options,
            visibility: None,
            case_sensitive: default_case_sensitive(),
            disable_asserts: false,
            mount_prefix: None,
        }
    }

    pub fn is_lazy(&self) -> bool {
        self.adapter == LAZY_ADAPTER
    }

    /// The storage a lazy storage defers to
    pub fn lazy_source(&self) -> Option<&str> {
        if !self.is_lazy() {
            return None;
        }
        self.options
            .get(LAZY_SOURCE_OPTION)
            .and_then(|value| value.as_str())
    }

    pub fn visibility(&self) -> Result<Option<Visibility>, ConfigError> {
        self.visibility
            .as_deref()
            .map(|v| v.parse::<Visibility>().map_err(ConfigError::Message))
            .transpose()
    }

    pub fn filesystem_options(&self) -> Result<FilesystemOptions, ConfigError> {
        Ok(FilesystemOptions {
            visibility: self.visibility()?,
            case_sensitive: self.case_sensitive,
            disable_asserts: self.disable_asserts,
        })
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.adapter.trim().is_empty() {
            return Err(ConfigError::Message(format!(
                "storage '{}': adapter cannot be empty",
                name
            )));
        }

        if self.is_lazy() {
            match self.options.get(LAZY_SOURCE_OPTION) {
                None => {
                    return Err(ConfigError::Message(format!(
                        "storage '{}': lazy adapter requires the '{}' option",
                        name, LAZY_SOURCE_OPTION
                    )));
                }
                Some(serde_json::Value::String(source)) if source.trim().is_empty() => {
                    return Err(ConfigError::Message(format!(
                        "storage '{}': '{}' cannot be empty",
                        name, LAZY_SOURCE_OPTION
                    )));
                }
                Some(serde_json::Value::String(_)) => {}
                Some(other) => {
                    return Err(ConfigError::Message(format!(
                        "storage '{}': '{}' must be a string, got {}",
                        name, LAZY_SOURCE_OPTION, other
                    )));
                }
            }
        }

        self.visibility()
            .map_err(|e| ConfigError::Message(format!("storage '{}': {}", name, e)))?;

        if let Some(prefix) = &self.mount_prefix {
            if prefix.trim().is_empty() || prefix.contains("://") {
                return Err(ConfigError::Message(format!(
                    "storage '{}': invalid mount_prefix '{}'",
                    name, prefix
                )));
            }
        }

        Ok(())
    }
}
