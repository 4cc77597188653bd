//! Lazy storage resolution
//!
//! Follows the "defers to" edges of lazy handles until a concrete storage is
//! reached, then binds every handle on the walked chain to it.
//!
//! The walk is iterative and its visited set is local to a single call, so
//! independent chains can be resolved in parallel and a cycle is reported
//! instead of recursing forever. A handle holds its own resolution guard for
//! the duration of the walk; no other lazy guard is taken while it is held.

use log::{debug, info};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ResolveError;
use crate::lazy::handle::{LazyStorageHandle, StorageCell};
use crate::registry::{StorageEntry, StorageRegistry};
use crate::storage::Storage;

/// Longest chain of lazy storages a single resolution will follow.
///
/// The bound is checked before the walk closes a loop, so a cycle with more
/// members than this is reported as `ResolutionDepthExceeded`, not as
/// `CyclicResolution`.
pub const MAX_RESOLUTION_DEPTH: usize = 4096;

enum Terminal {
    Cell(Arc<StorageCell>),
    Bound(Arc<dyn Storage>),
}

/// Resolves `handle` to its concrete storage.
///
/// The first successful call walks the chain and caches the result on every
/// handle it passed through; later calls return the identical `Arc`.
pub fn resolve(
    handle: &LazyStorageHandle,
    registry: &StorageRegistry,
) -> Result<Arc<dyn Storage>, ResolveError> {
    if let Some(storage) = handle.resolved() {
        return Ok(storage);
    }

    let _guard = handle.lock_resolution();
    if let Some(storage) = handle.resolved() {
        return Ok(storage);
    }

    let (chain, terminal) = walk(handle, registry)?;
    let storage = match terminal {
        Terminal::Cell(cell) => cell.get()?,
        Terminal::Bound(storage) => storage,
    };

    for intermediate in chain.iter().rev() {
        intermediate.bind(&storage);
    }
    let bound = handle.bind(&storage);

    info!(
        "Lazy storage '{}' resolved through {} hop(s)",
        handle.name(),
        chain.len() + 1
    );
    Ok(bound)
}

/// Walks from `handle` to the first concrete (or already bound) entry.
///
/// Returns the unresolved lazy handles passed on the way, head excluded.
fn walk(
    handle: &LazyStorageHandle,
    registry: &StorageRegistry,
) -> Result<(Vec<Arc<LazyStorageHandle>>, Terminal), ResolveError> {
    let mut visited = vec![handle.name().to_string()];
    let mut seen: HashSet<String> = HashSet::from([handle.name().to_string()]);
    let mut chain: Vec<Arc<LazyStorageHandle>> = Vec::new();
    let mut current = handle.name().to_string();
    let mut source = handle.source_name().to_string();

    loop {
        if seen.contains(&source) {
            visited.push(source);
            return Err(ResolveError::CyclicResolution { chain: visited });
        }
        if visited.len() > MAX_RESOLUTION_DEPTH {
            return Err(ResolveError::ResolutionDepthExceeded {
                storage: handle.name().to_string(),
                limit: MAX_RESOLUTION_DEPTH,
            });
        }

        match registry.entry(&source) {
            None => {
                return Err(ResolveError::UnknownSource {
                    storage: current,
                    source_name: source,
                });
            }
            Some(StorageEntry::Concrete(cell)) => {
                debug!("'{}' reached concrete storage '{}'", handle.name(), source);
                return Ok((chain, Terminal::Cell(cell)));
            }
            Some(StorageEntry::Lazy(next)) => {
                if let Some(storage) = next.resolved() {
                    debug!("'{}' reached resolved lazy storage '{}'", handle.name(), source);
                    return Ok((chain, Terminal::Bound(storage)));
                }

                visited.push(source.clone());
                seen.insert(source.clone());
                current = source;
                source = next.source_name().to_string();
                chain.push(next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryAdapter;

    fn registry_with_local() -> (StorageRegistry, Arc<dyn Storage>) {
        let registry = StorageRegistry::new();
        let local: Arc<dyn Storage> = Arc::new(MemoryAdapter::new());
        registry
            .register_concrete("local", Arc::clone(&local))
            .unwrap();
        (registry, local)
    }

    #[test]
    fn test_resolves_direct_source() {
        let (registry, local) = registry_with_local();
        let handle = registry.create_lazy("alias", "local").unwrap();

        let resolved = resolve(&handle, &registry).unwrap();
        assert!(Arc::ptr_eq(&resolved, &local));
        assert!(handle.is_resolved());
    }

    #[test]
    fn test_chain_binds_every_hop() {
        let (registry, local) = registry_with_local();
        let a = registry.create_lazy("a", "b").unwrap();
        let b = registry.create_lazy("b", "c").unwrap();
        let c = registry.create_lazy("c", "local").unwrap();

        let resolved = resolve(&a, &registry).unwrap();
        assert!(Arc::ptr_eq(&resolved, &local));
        assert!(Arc::ptr_eq(&b.resolved().unwrap(), &local));
        assert!(Arc::ptr_eq(&c.resolved().unwrap(), &local));
    }

    #[test]
    fn test_unknown_source() {
        let registry = StorageRegistry::new();
        let handle = registry.create_lazy("a", "ghost").unwrap();

        match resolve(&handle, &registry) {
            Err(ResolveError::UnknownSource {
                storage,
                source_name,
            }) => {
                assert_eq!(storage, "a");
                assert_eq!(source_name, "ghost");
            }
            other => panic!("expected UnknownSource, got {:?}", other.map(|_| ())),
        }
        assert!(!handle.is_resolved());
    }

    #[test]
    fn test_unknown_source_deep_in_chain_names_last_hop() {
        let registry = StorageRegistry::new();
        let a = registry.create_lazy("a", "b").unwrap();
        registry.create_lazy("b", "ghost").unwrap();

        match resolve(&a, &registry) {
            Err(ResolveError::UnknownSource {
                storage,
                source_name,
            }) => {
                assert_eq!(storage, "b");
                assert_eq!(source_name, "ghost");
            }
            other => panic!("expected UnknownSource, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_two_node_cycle() {
        let registry = StorageRegistry::new();
        let a = registry.create_lazy("a", "b").unwrap();
        let b = registry.create_lazy("b", "a").unwrap();

        match resolve(&a, &registry) {
            Err(ResolveError::CyclicResolution { chain }) => {
                assert_eq!(chain, vec!["a", "b", "a"]);
            }
            other => panic!("expected CyclicResolution, got {:?}", other.map(|_| ())),
        }
        match resolve(&b, &registry) {
            Err(ResolveError::CyclicResolution { chain }) => {
                assert_eq!(chain, vec!["b", "a", "b"]);
            }
            other => panic!("expected CyclicResolution, got {:?}", other.map(|_| ())),
        }
        assert!(!a.is_resolved());
        assert!(!b.is_resolved());
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let registry = StorageRegistry::new();
        let a = registry.create_lazy("a", "a").unwrap();
        assert!(matches!(
            resolve(&a, &registry),
            Err(ResolveError::CyclicResolution { .. })
        ));
    }

    #[test]
    fn test_cycle_behind_prefix_reports_repeated_name() {
        let registry = StorageRegistry::new();
        let head = registry.create_lazy("head", "x").unwrap();
        registry.create_lazy("x", "y").unwrap();
        registry.create_lazy("y", "x").unwrap();

        match resolve(&head, &registry) {
            Err(ResolveError::CyclicResolution { chain }) => {
                assert_eq!(chain, vec!["head", "x", "y", "x"]);
            }
            other => panic!("expected CyclicResolution, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_long_cycle_does_not_overflow() {
        let registry = StorageRegistry::new();
        let length = 1000;
        for i in 0..length {
            registry
                .create_lazy(format!("s{}", i), format!("s{}", (i + 1) % length))
                .unwrap();
        }
        let head = registry.lazy_handle("s0").unwrap();

        match resolve(&head, &registry) {
            Err(ResolveError::CyclicResolution { chain }) => {
                assert_eq!(chain.len(), length + 1);
                assert_eq!(chain.first().unwrap(), "s0");
                assert_eq!(chain.last().unwrap(), "s0");
            }
            other => panic!("expected CyclicResolution, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_depth_limit() {
        let (registry, _) = registry_with_local();
        let length = MAX_RESOLUTION_DEPTH + 1;
        for i in 0..length {
            registry
                .create_lazy(format!("s{}", i), format!("s{}", i + 1))
                .unwrap();
        }
        registry
            .create_lazy(format!("s{}", length), "local")
            .unwrap();
        let head = registry.lazy_handle("s0").unwrap();

        assert!(matches!(
            resolve(&head, &registry),
            Err(ResolveError::ResolutionDepthExceeded { .. })
        ));
    }

    #[test]
    fn test_cycle_longer_than_depth_limit_reports_depth() {
        let registry = StorageRegistry::new();
        let length = MAX_RESOLUTION_DEPTH + 10;
        for i in 0..length {
            registry
                .create_lazy(format!("s{}", i), format!("s{}", (i + 1) % length))
                .unwrap();
        }
        let head = registry.lazy_handle("s0").unwrap();

        match resolve(&head, &registry) {
            Err(ResolveError::ResolutionDepthExceeded { storage, limit }) => {
                assert_eq!(storage, "s0");
                assert_eq!(limit, MAX_RESOLUTION_DEPTH);
            }
            other => panic!("expected ResolutionDepthExceeded, got {:?}", other.map(|_| ())),
        }
        assert!(!head.is_resolved());
    }

    #[test]
    fn test_stops_at_already_resolved_handle() {
        let (registry, local) = registry_with_local();
        let middle = registry.create_lazy("middle", "local").unwrap();
        resolve(&middle, &registry).unwrap();

        let head = registry.create_lazy("head", "middle").unwrap();
        assert!(Arc::ptr_eq(&resolve(&head, &registry).unwrap(), &local));
    }
}
