//! Adapter definition factory
//!
//! Maps adapter kind names to constructors. Options are validated when the
//! definition is created; the adapter itself is built later, on first use.

use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::AdapterError;
use crate::storage::{LocalAdapter, MemoryAdapter, Storage};

/// Free-form adapter options as declared in configuration
pub type AdapterOptions = serde_json::Map<String, serde_json::Value>;

/// Validates options for one adapter kind and returns its definition
pub type AdapterConstructor = fn(&AdapterOptions) -> Result<AdapterDefinition, AdapterError>;

type AdapterBuild = Box<dyn Fn() -> Result<Arc<dyn Storage>, AdapterError> + Send + Sync>;

/// A validated, not yet built adapter
pub struct AdapterDefinition {
    kind: String,
    build: AdapterBuild,
}

impl AdapterDefinition {
    pub fn new(
        kind: impl Into<String>,
        build: impl Fn() -> Result<Arc<dyn Storage>, AdapterError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: kind.into(),
            build: Box::new(build),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Builds a new adapter instance.
    pub fn build(&self) -> Result<Arc<dyn Storage>, AdapterError> {
        debug!("Building '{}' adapter", self.kind);
        (self.build)()
    }
}

impl fmt::Debug for AdapterDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterDefinition")
            .field("kind", &self.kind)
            .finish()
    }
}

/// Deserializes adapter options into their typed form.
pub fn parse_options<T: DeserializeOwned>(
    kind: &str,
    options: &AdapterOptions,
) -> Result<T, AdapterError> {
    serde_json::from_value(serde_json::Value::Object(options.clone())).map_err(|e| {
        AdapterError::InvalidOptions {
            kind: kind.to_string(),
            reason: e.to_string(),
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MemoryOptions {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LocalOptions {
    directory: PathBuf,
    #[serde(default = "default_create_root")]
    create_root: bool,
}

fn default_create_root() -> bool {
    true
}

fn memory_definition(options: &AdapterOptions) -> Result<AdapterDefinition, AdapterError> {
    let _: MemoryOptions = parse_options("memory", options)?;
    Ok(AdapterDefinition::new("memory", || {
        Ok(Arc::new(MemoryAdapter::new()) as Arc<dyn Storage>)
    }))
}

fn local_definition(options: &AdapterOptions) -> Result<AdapterDefinition, AdapterError> {
    let options: LocalOptions = parse_options("local", options)?;
    if options.directory.as_os_str().is_empty() {
        return Err(AdapterError::InvalidOptions {
            kind: "local".into(),
            reason: "directory cannot be empty".into(),
        });
    }

    Ok(AdapterDefinition::new("local", move || {
        LocalAdapter::new(options.directory.clone(), options.create_root)
            .map(|adapter| Arc::new(adapter) as Arc<dyn Storage>)
            .map_err(|e| AdapterError::Construction {
                kind: "local".into(),
                reason: e.to_string(),
            })
    }))
}

/// Registration table of adapter kinds
pub struct AdapterDefinitionFactory {
    constructors: HashMap<String, AdapterConstructor>,
}

impl AdapterDefinitionFactory {
    /// A factory knowing the built-in `memory` and `local` kinds.
    pub fn new() -> Self {
        let mut factory = Self {
            constructors: HashMap::new(),
        };
        factory.register("memory", memory_definition);
        factory.register("local", local_definition);
        factory
    }

    /// Adds or replaces the constructor for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, constructor: AdapterConstructor) {
        self.constructors.insert(kind.into(), constructor);
    }

    pub fn supports(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Creates the definition for `kind`, or `None` when the kind is not
    /// known to this factory (a custom adapter supplied by the host).
    pub fn create_definition(
        &self,
        kind: &str,
        options: &AdapterOptions,
    ) -> Result<Option<AdapterDefinition>, AdapterError> {
        match self.constructors.get(kind) {
            Some(constructor) => constructor(options).map(Some),
            None => Ok(None),
        }
    }
}

impl Default for AdapterDefinitionFactory {
    fn default() -> Self {
        Self::new()
    }
}
