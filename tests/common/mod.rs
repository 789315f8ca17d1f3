#![allow(dead_code)]

//! Shared test driver and fixtures.
//!
//! `EchoDriver` registers itself under the "echofs" tag and records every
//! physical mount transition in process-global state, so that separately
//! resolved driver instances share mount state the way instances of a
//! real technology share machine state.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock};

use poolkit::drivers::{DriverRegistration, DriverSetup};
use poolkit::{
    Catalog, DaemonState, Driver, MemoryCatalog, PoolDescriptor, ProgressToken, StorageResult,
    Volume, VolumeType,
};
use tempfile::TempDir;

static EVENTS: OnceLock<Mutex<Vec<String>>> = OnceLock::new();
static MOUNTED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();

fn events() -> &'static Mutex<Vec<String>> {
    EVENTS.get_or_init(|| Mutex::new(Vec::new()))
}

fn mounted() -> &'static Mutex<HashSet<String>> {
    MOUNTED.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Events whose payload contains `needle`. Tests use unique volume names
/// to keep their slices of the global log disjoint.
pub fn events_containing(needle: &str) -> Vec<String> {
    events()
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.contains(needle))
        .cloned()
        .collect()
}

pub fn is_mounted(key: &str) -> bool {
    mounted().lock().unwrap().contains(key)
}

/// Recording driver registered under the "echofs" technology tag.
pub struct EchoDriver {
    pool: String,
    config: HashMap<String, String>,
}

impl EchoDriver {
    fn key(&self, vol_type: VolumeType, name: &str) -> String {
        format!("{}/{}/{}", self.pool, vol_type, name)
    }

    fn mount(&self, key: String) -> StorageResult<bool> {
        let mut mounted = mounted().lock().unwrap();
        if mounted.insert(key.clone()) {
            events().lock().unwrap().push(format!("mount {key}"));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn unmount(&self, key: String) -> StorageResult<bool> {
        let mut mounted = mounted().lock().unwrap();
        if mounted.remove(&key) {
            events().lock().unwrap().push(format!("umount {key}"));
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

impl Driver for EchoDriver {
    fn name(&self) -> &str {
        "echofs"
    }

    fn create(&self, _op: Option<&ProgressToken>) -> StorageResult<()> {
        events()
            .lock()
            .unwrap()
            .push(format!("create-pool {}", self.pool));
        Ok(())
    }

    fn create_volume(&self, vol: &Volume, _op: Option<&ProgressToken>) -> StorageResult<()> {
        events()
            .lock()
            .unwrap()
            .push(format!("create-volume {}", self.key(vol.vol_type(), vol.name())));
        Ok(())
    }

    fn delete_volume(
        &self,
        vol_type: VolumeType,
        vol_name: &str,
        _op: Option<&ProgressToken>,
    ) -> StorageResult<()> {
        events()
            .lock()
            .unwrap()
            .push(format!("delete-volume {}", self.key(vol_type, vol_name)));
        Ok(())
    }

    fn mount_volume(
        &self,
        vol_type: VolumeType,
        vol_name: &str,
        _op: Option<&ProgressToken>,
    ) -> StorageResult<bool> {
        self.mount(self.key(vol_type, vol_name))
    }

    fn unmount_volume(
        &self,
        vol_type: VolumeType,
        vol_name: &str,
        _op: Option<&ProgressToken>,
    ) -> StorageResult<bool> {
        self.unmount(self.key(vol_type, vol_name))
    }

    fn mount_volume_snapshot(
        &self,
        vol_type: VolumeType,
        parent_name: &str,
        snapshot_name: &str,
        _op: Option<&ProgressToken>,
    ) -> StorageResult<bool> {
        self.mount(self.key(vol_type, &format!("{parent_name}/{snapshot_name}")))
    }

    fn unmount_volume_snapshot(
        &self,
        vol_type: VolumeType,
        parent_name: &str,
        snapshot_name: &str,
        _op: Option<&ProgressToken>,
    ) -> StorageResult<bool> {
        self.unmount(self.key(vol_type, &format!("{parent_name}/{snapshot_name}")))
    }

    fn volume_snapshots(
        &self,
        _vol_type: VolumeType,
        _vol_name: &str,
        _op: Option<&ProgressToken>,
    ) -> StorageResult<Vec<String>> {
        // Driver-defined ordering comes straight out of the pool config.
        Ok(self
            .config
            .get("snapshots")
            .map(|list| list.split(',').map(str::to_string).collect())
            .unwrap_or_default())
    }
}

fn echo_factory(setup: DriverSetup) -> StorageResult<Box<dyn Driver>> {
    Ok(Box::new(EchoDriver {
        pool: setup.pool_name,
        config: setup.config,
    }))
}

inventory::submit! {
    DriverRegistration {
        tag: "echofs",
        factory: echo_factory,
    }
}

/// Daemon state over a fresh temp storage root and an empty catalog.
pub fn test_state() -> (Arc<DaemonState>, Arc<MemoryCatalog>, TempDir) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let catalog = MemoryCatalog::new();
    let state = Arc::new(DaemonState::new(
        Arc::clone(&catalog) as Arc<dyn Catalog>,
        temp.path(),
    ));
    (state, catalog, temp)
}

/// Register an "echofs" pool named `pool` in the catalog with the given
/// config, returning its pool ID.
pub fn register_echo_pool(
    catalog: &MemoryCatalog,
    pool: &str,
    id: i64,
    config: Option<HashMap<String, String>>,
) {
    catalog.add_pool(
        id,
        PoolDescriptor {
            name: pool.to_string(),
            driver: "echofs".to_string(),
            config,
        },
    );
}
