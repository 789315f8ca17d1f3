//! Narrow lookup surface of the daemon's relational catalog.
//!
//! The catalog itself (schema, persistence, clustering) is an external
//! collaborator. This module defines only the three lookups the storage
//! core needs, plus an in-memory implementation for embedders that have no
//! relational store and for tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a [`Catalog`] implementation.
///
/// `NoSuchObject` is the distinguishable lookup miss; callers translate it
/// into a descriptive storage error. Everything else passes through.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The requested record does not exist.
    #[error("no such object")]
    NoSuchObject,

    /// Any other catalog failure.
    #[error("database: {0}")]
    Database(String),
}

/// Persisted description of a storage pool.
///
/// This is the API-facing record the daemon stores for each pool: the
/// driver technology tag, the pool name, and the driver configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PoolDescriptor {
    /// Pool name.
    pub name: String,

    /// Driver technology tag (e.g. "zfs", "btrfs", "lvm", "dir").
    pub driver: String,

    /// Driver configuration. Absent in older records; resolution treats
    /// `None` as an empty map so driver config lookups are total.
    #[serde(default)]
    pub config: Option<HashMap<String, String>>,
}

/// The catalog lookups consumed by the storage core.
pub trait Catalog: Send + Sync {
    /// Look up a pool record by name, returning its catalog ID and
    /// persisted descriptor.
    fn pool_by_name(&self, name: &str) -> Result<(i64, PoolDescriptor), CatalogError>;

    /// Look up a volume's catalog ID by project, name, volume-type code and
    /// owning pool ID.
    fn volume_id(
        &self,
        project: &str,
        volume: &str,
        vol_type_code: i64,
        pool_id: i64,
    ) -> Result<i64, CatalogError>;

    /// Look up the name of the pool backing an instance's root volume.
    fn instance_pool_name(&self, project: &str, instance: &str) -> Result<String, CatalogError>;
}

// ============================================================================
// In-memory catalog
// ============================================================================

#[derive(Debug, Default)]
struct MemoryCatalogInner {
    pools: HashMap<String, (i64, PoolDescriptor)>,
    volumes: HashMap<(String, String, i64, i64), i64>,
    instances: HashMap<(String, String), String>,
}

/// In-memory [`Catalog`] implementation.
///
/// Suitable for embedders that do not run a relational store, and for
/// tests. All lookups are served from `RwLock`-protected maps; registration
/// helpers populate them.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    inner: RwLock<MemoryCatalogInner>,
}

impl MemoryCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a pool record.
    pub fn add_pool(&self, id: i64, descriptor: PoolDescriptor) {
        let mut inner = self.inner.write();
        inner.pools.insert(descriptor.name.clone(), (id, descriptor));
    }

    /// Register a volume record.
    pub fn add_volume(
        &self,
        project: &str,
        volume: &str,
        vol_type_code: i64,
        pool_id: i64,
        volume_id: i64,
    ) {
        let mut inner = self.inner.write();
        inner.volumes.insert(
            (project.to_string(), volume.to_string(), vol_type_code, pool_id),
            volume_id,
        );
    }

    /// Register an instance's owning pool.
    pub fn add_instance(&self, project: &str, instance: &str, pool_name: &str) {
        let mut inner = self.inner.write();
        inner
            .instances
            .insert((project.to_string(), instance.to_string()), pool_name.to_string());
    }
}

impl Catalog for MemoryCatalog {
    fn pool_by_name(&self, name: &str) -> Result<(i64, PoolDescriptor), CatalogError> {
        let inner = self.inner.read();
        inner
            .pools
            .get(name)
            .cloned()
            .ok_or(CatalogError::NoSuchObject)
    }

    fn volume_id(
        &self,
        project: &str,
        volume: &str,
        vol_type_code: i64,
        pool_id: i64,
    ) -> Result<i64, CatalogError> {
        let inner = self.inner.read();
        inner
            .volumes
            .get(&(project.to_string(), volume.to_string(), vol_type_code, pool_id))
            .copied()
            .ok_or(CatalogError::NoSuchObject)
    }

    fn instance_pool_name(&self, project: &str, instance: &str) -> Result<String, CatalogError> {
        let inner = self.inner.read();
        inner
            .instances
            .get(&(project.to_string(), instance.to_string()))
            .cloned()
            .ok_or(CatalogError::NoSuchObject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_lookup() {
        let catalog = MemoryCatalog::new();
        catalog.add_pool(
            7,
            PoolDescriptor {
                name: "local".to_string(),
                driver: "dir".to_string(),
                config: None,
            },
        );

        let (id, descriptor) = catalog.pool_by_name("local").unwrap();
        assert_eq!(id, 7);
        assert_eq!(descriptor.driver, "dir");

        assert!(matches!(
            catalog.pool_by_name("other"),
            Err(CatalogError::NoSuchObject)
        ));
    }

    #[test]
    fn test_volume_lookup_keyed_on_all_fields() {
        let catalog = MemoryCatalog::new();
        catalog.add_volume("default", "vol1", 2, 1, 42);

        assert_eq!(catalog.volume_id("default", "vol1", 2, 1).unwrap(), 42);
        // Same name under a different pool or type is a different row.
        assert!(catalog.volume_id("default", "vol1", 2, 9).is_err());
        assert!(catalog.volume_id("default", "vol1", 0, 1).is_err());
        assert!(catalog.volume_id("proj", "vol1", 2, 1).is_err());
    }

    #[test]
    fn test_instance_pool_lookup() {
        let catalog = MemoryCatalog::new();
        catalog.add_instance("default", "c1", "local");

        assert_eq!(catalog.instance_pool_name("default", "c1").unwrap(), "local");
        assert!(matches!(
            catalog.instance_pool_name("default", "c2"),
            Err(CatalogError::NoSuchObject)
        ));
    }

    #[test]
    fn test_descriptor_config_defaults_to_none() {
        let descriptor: PoolDescriptor =
            serde_json::from_str(r#"{"name": "local", "driver": "zfs"}"#).unwrap();
        assert_eq!(descriptor.name, "local");
        assert!(descriptor.config.is_none());

        let descriptor: PoolDescriptor = serde_json::from_str(
            r#"{"name": "local", "driver": "zfs", "config": {"size": "10GiB"}}"#,
        )
        .unwrap();
        assert_eq!(
            descriptor.config.unwrap().get("size").map(String::as_str),
            Some("10GiB")
        );
    }
}
