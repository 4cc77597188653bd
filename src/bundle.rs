//! Storage bundle
//!
//! Turns a validated `BundleConfig` into a populated registry and mount
//! manager. Lazy storages become lazy handles; every other storage becomes a
//! `Filesystem` around its adapter, built the first time it is used.

use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

use crate::adapter::AdapterDefinitionFactory;
use crate::config::{BundleConfig, LAZY_SOURCE_OPTION, StorageConfig};
use crate::error::{AdapterError, BundleError};
use crate::lazy::StorageConstructor;
use crate::mount::MountManager;
use crate::registry::StorageRegistry;
use crate::storage::{Filesystem, Storage};

/// Builder collecting the adapters available to a bundle
pub struct BundleBuilder {
    factory: AdapterDefinitionFactory,
    custom_adapters: HashMap<String, Arc<dyn Storage>>,
}

impl Default for BundleBuilder {
    fn default() -> Self {
        Self {
            factory: AdapterDefinitionFactory::new(),
            custom_adapters: HashMap::new(),
        }
    }
}

impl BundleBuilder {
    /// Replaces the adapter definition factory.
    pub fn adapter_factory(mut self, factory: AdapterDefinitionFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Makes a host-built adapter available under `name`. Storages whose
    /// `adapter` is not a built-in kind refer to these by name.
    pub fn custom_adapter(mut self, name: impl Into<String>, adapter: Arc<dyn Storage>) -> Self {
        self.custom_adapters.insert(name.into(), adapter);
        self
    }

    pub fn build(self, config: &BundleConfig) -> Result<StorageBundle, BundleError> {
        config.validate()?;

        let registry = Arc::new(StorageRegistry::new());
        let mut mount_manager = MountManager::new(Arc::clone(&registry));

        for (name, storage) in &config.storages {
            if storage.is_lazy() {
                let source = storage.lazy_source().ok_or_else(|| {
                    config::ConfigError::Message(format!(
                        "storage '{}': lazy adapter requires the '{}' option",
                        name, LAZY_SOURCE_OPTION
                    ))
                })?;
                registry.create_lazy(name.as_str(), source)?;
                info!("Registered lazy storage '{}' (source: '{}')", name, source);
            } else {
                let constructor = self.constructor_for(name, storage)?;
                registry.register_deferred(name.as_str(), constructor)?;
                info!(
                    "Registered storage '{}' (adapter: '{}')",
                    name, storage.adapter
                );
            }

            if let Some(prefix) = &storage.mount_prefix {
                mount_manager.mount(prefix.as_str(), name.as_str())?;
            }
        }

        info!("Storage bundle ready with {} storage(s)", registry.len());
        Ok(StorageBundle {
            registry,
            mount_manager,
        })
    }

    fn constructor_for(
        &self,
        name: &str,
        storage: &StorageConfig,
    ) -> Result<StorageConstructor, BundleError> {
        let options = storage.filesystem_options()?;

        if let Some(definition) = self
            .factory
            .create_definition(&storage.adapter, &storage.options)?
        {
            return Ok(Box::new(
                move || -> Result<Arc<dyn Storage>, AdapterError> {
                    let adapter = definition.build()?;
                    Ok(Arc::new(Filesystem::new(adapter, options.clone())))
                },
            ));
        }

        // Not a built-in kind: the adapter names a host-supplied instance.
        let adapter = self
            .custom_adapters
            .get(&storage.adapter)
            .cloned()
            .ok_or_else(|| BundleError::UnknownAdapter {
                storage: name.to_string(),
                adapter: storage.adapter.clone(),
            })?;
        debug!(
            "Storage '{}' uses custom adapter '{}'",
            name, storage.adapter
        );

        Ok(Box::new(
            move || -> Result<Arc<dyn Storage>, AdapterError> {
                Ok(Arc::new(Filesystem::new(
                    Arc::clone(&adapter),
                    options.clone(),
                )))
            },
        ))
    }
}

/// Registry and mount manager built from configuration
pub struct StorageBundle {
    registry: Arc<StorageRegistry>,
    mount_manager: MountManager,
}

impl StorageBundle {
    pub fn builder() -> BundleBuilder {
        BundleBuilder::default()
    }

    /// Builds a bundle with only the built-in adapters.
    pub fn from_config(config: &BundleConfig) -> Result<Self, BundleError> {
        Self::builder().build(config)
    }

    /// Looks up a storage by name, resolving it on first use.
    pub fn storage(&self, name: &str) -> Result<Arc<dyn Storage>, BundleError> {
        Ok(self.registry.get_storage(name)?)
    }

    /// Resolves every registered storage, failing on the first error.
    pub fn warm_up(&self) -> Result<(), BundleError> {
        for name in self.registry.names() {
            self.registry.get_storage(&name)?;
            debug!("Storage '{}' is ready", name);
        }
        Ok(())
    }

    pub fn registry(&self) -> &Arc<StorageRegistry> {
        &self.registry
    }

    pub fn mount_manager(&self) -> &MountManager {
        &self.mount_manager
    }

    pub fn storage_names(&self) -> Vec<String> {
        self.registry.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ResolveError, StorageError};
    use crate::storage::{MemoryAdapter, Visibility};
    use tempfile::tempdir;

    fn bundle(toml: &str) -> StorageBundle {
        StorageBundle::from_config(&BundleConfig::from_toml_str(toml).unwrap()).unwrap()
    }

    #[test]
    fn test_lazy_chain_resolves_to_concrete_storage() {
        let bundle = bundle(
            r#"
[storages.memory]
adapter = "memory"

[storages.alias1]
adapter = "lazy"
options = { source = "memory" }

[storages.alias2]
adapter = "lazy"
options = { source = "alias1" }
"#,
        );

        let memory = bundle.storage("memory").unwrap();
        let alias2 = bundle.storage("alias2").unwrap();
        assert!(Arc::ptr_eq(&memory, &alias2));

        alias2.write("shared.txt", b"hi").unwrap();
        assert_eq!(bundle.storage("alias1").unwrap().read("shared.txt").unwrap(), b"hi");
    }

    #[test]
    fn test_local_adapter_is_built_on_first_use() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("files");
        let toml = format!(
            "[storages.local]\nadapter = \"local\"\n[storages.local.options]\ndirectory = '{}'\n",
            root.display()
        );
        let bundle = bundle(&toml);

        assert!(!root.exists());
        bundle.storage("local").unwrap().write("a.txt", b"1").unwrap();
        assert!(root.join("a.txt").is_file());
    }

    #[test]
    fn test_filesystem_options_are_applied() {
        let bundle = bundle(
            r#"
[storages.private]
adapter = "memory"
visibility = "private"
case_sensitive = false
"#,
        );

        let storage = bundle.storage("private").unwrap();
        storage.write("Report.TXT", b"x").unwrap();
        assert_eq!(storage.visibility("report.txt").unwrap(), Visibility::Private);
        assert!(matches!(
            storage.write("REPORT.txt", b"y"),
            Err(StorageError::FileAlreadyExists(_))
        ));
    }

    #[test]
    fn test_custom_adapter() {
        let adapter: Arc<dyn Storage> = Arc::new(MemoryAdapter::new());
        adapter.write("seed.txt", b"seeded").unwrap();

        let config = BundleConfig::from_toml_str(
            "[storages.custom]\nadapter = \"acme.adapter\"\nmount_prefix = \"acme\"\n",
        )
        .unwrap();
        let bundle = StorageBundle::builder()
            .custom_adapter("acme.adapter", adapter)
            .build(&config)
            .unwrap();

        assert_eq!(
            bundle.mount_manager().read("acme://seed.txt").unwrap(),
            b"seeded"
        );
    }

    #[test]
    fn test_unknown_adapter() {
        let config =
            BundleConfig::from_toml_str("[storages.x]\nadapter = \"nope\"\n").unwrap();
        match StorageBundle::from_config(&config) {
            Err(BundleError::UnknownAdapter { storage, adapter }) => {
                assert_eq!(storage, "x");
                assert_eq!(adapter, "nope");
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn test_invalid_adapter_options_fail_at_build() {
        let config = BundleConfig::from_toml_str(
            "[storages.x]\nadapter = \"local\"\n[storages.x.options]\nunknown = 1\n",
        )
        .unwrap();
        assert!(matches!(
            StorageBundle::from_config(&config),
            Err(BundleError::Adapter(AdapterError::InvalidOptions { .. }))
        ));
    }

    #[test]
    fn test_warm_up_reports_misconfigured_lazy_storage() {
        let bundle = bundle(
            r#"
[storages.a]
adapter = "lazy"
options = { source = "ghost" }
"#,
        );

        assert!(matches!(
            bundle.warm_up(),
            Err(BundleError::Resolve(ResolveError::UnknownSource { .. }))
        ));
    }

    #[test]
    fn test_warm_up_reports_cycles() {
        let bundle = bundle(
            r#"
[storages.a]
adapter = "lazy"
options = { source = "b" }

[storages.b]
adapter = "lazy"
options = { source = "a" }
"#,
        );

        match bundle.storage("a") {
            Err(BundleError::Resolve(ResolveError::CyclicResolution { chain })) => {
                assert!(chain.contains(&"a".to_string()));
                assert!(chain.contains(&"b".to_string()));
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected a cycle"),
        }
        assert!(bundle.warm_up().is_err());
    }

    #[test]
    fn test_mounted_lazy_storage() {
        let bundle = bundle(
            r#"
[storages.memory]
adapter = "memory"
mount_prefix = "mem"

[storages.uploads]
adapter = "lazy"
mount_prefix = "uploads"
options = { source = "memory" }
"#,
        );

        let mounts = bundle.mount_manager();
        mounts.write("uploads://photo.jpg", b"jpeg").unwrap();
        assert_eq!(mounts.read("mem://photo.jpg").unwrap(), b"jpeg");
        assert_eq!(bundle.storage_names(), vec!["memory", "uploads"]);
    }
}
