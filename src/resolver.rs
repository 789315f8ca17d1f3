//! Pool resolution: binding catalog pool records to live driver instances.
//!
//! The resolver is the only place that touches the catalog on behalf of
//! drivers. It loads a driver for a pool's persisted configuration, wires
//! up the volume-ID resolution callback (so drivers never see the catalog
//! or their own pool ID), and returns a ready-to-use [`Pool`].

use std::sync::Arc;

use crate::catalog::{CatalogError, PoolDescriptor};
use crate::drivers::{self, ValidationRules, VolumeIdResolver, VolumeType};
use crate::errors::{StorageError, StorageResult};
use crate::operation::ProgressToken;
use crate::pool::{MockPool, Pool, StoragePool};
use crate::state::DaemonState;

/// Resolver configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResolverOptions {
    /// When set, every resolution returns an in-memory substitute pool
    /// that performs no driver load and no disk I/O. For test isolation.
    pub mock_mode: bool,
}

/// Factory for resolved [`Pool`] handles.
///
/// Cheap to construct and to copy; each resolution call re-resolves from
/// the catalog and loads its own driver instance. Callers do not share
/// pool handles across calls.
#[derive(Clone, Copy, Debug, Default)]
pub struct PoolResolver {
    mock_mode: bool,
}

impl PoolResolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self {
            mock_mode: options.mock_mode,
        }
    }

    /// Resolve a pool by name from its catalog record.
    pub fn pool_by_name(
        &self,
        state: &Arc<DaemonState>,
        name: &str,
    ) -> StorageResult<Box<dyn Pool>> {
        if self.mock_mode {
            return Ok(Box::new(MockPool::new(Arc::clone(state), name)));
        }

        let (pool_id, descriptor) = state.catalog().pool_by_name(name).map_err(|err| match err {
            CatalogError::NoSuchObject => {
                StorageError::PoolLoad(format!("storage pool '{name}' doesn't exist"))
            }
            other => StorageError::PoolLoad(format!("fetching record for pool '{name}': {other}")),
        })?;

        let pool = self.load_pool(state, pool_id, descriptor)?;
        tracing::debug!(pool = %name, pool_id, "Resolved storage pool");
        Ok(Box::new(pool))
    }

    /// Resolve the pool backing an instance's root volume.
    pub fn pool_by_instance_name(
        &self,
        state: &Arc<DaemonState>,
        project: &str,
        instance: &str,
    ) -> StorageResult<Box<dyn Pool>> {
        let pool_name = state
            .catalog()
            .instance_pool_name(project, instance)
            .map_err(|err| match err {
                CatalogError::NoSuchObject => StorageError::InstanceNotFound {
                    project: project.to_string(),
                    instance: instance.to_string(),
                },
                other => other.into(),
            })?;

        self.pool_by_name(state, &pool_name)
    }

    /// Load a driver for a not-yet-materialized pool and create it on
    /// disk.
    ///
    /// On failure the driver's creation routine leaves no partial state
    /// behind; no rollback happens here.
    pub fn create_pool(
        &self,
        state: &Arc<DaemonState>,
        pool_id: i64,
        descriptor: Option<&PoolDescriptor>,
        op: Option<&ProgressToken>,
    ) -> StorageResult<Box<dyn Pool>> {
        let descriptor = descriptor.ok_or_else(|| {
            StorageError::InvalidArgument("pool descriptor is required".to_string())
        })?;

        if self.mock_mode {
            return Ok(Box::new(MockPool::new(Arc::clone(state), &descriptor.name)));
        }

        let pool = self.load_pool(state, pool_id, descriptor.clone())?;
        pool.create(op)?;
        Ok(Box::new(pool))
    }

    fn load_pool(
        &self,
        state: &Arc<DaemonState>,
        pool_id: i64,
        descriptor: PoolDescriptor,
    ) -> StorageResult<StoragePool> {
        // Older pool records may carry no config at all; treat that as an
        // empty map so driver config lookups are total.
        let config = descriptor.config.unwrap_or_default();
        let span = tracing::info_span!("storage", driver = %descriptor.driver, pool = %descriptor.name);

        let driver = drivers::load(
            Arc::clone(state),
            &descriptor.driver,
            &descriptor.name,
            config,
            span.clone(),
            vol_id_resolver(state, pool_id),
            common_volume_rules(),
        )?;

        Ok(StoragePool::new(
            pool_id,
            descriptor.name,
            Arc::from(driver),
            Arc::clone(state),
            span,
        ))
    }
}

/// Build the volume-ID resolution callback for one pool.
///
/// The returned closure captures the pool's catalog identifier by value,
/// so the driver holding it needs neither catalog access nor knowledge of
/// which pool it belongs to. For container and virtual-machine volumes the
/// project name may be encoded into the volume name as
/// `<project>_<volume>`; names without an underscore belong to the default
/// project. Other volume types are never split.
pub fn vol_id_resolver(state: &Arc<DaemonState>, pool_id: i64) -> VolumeIdResolver {
    let state = Arc::clone(state);
    Arc::new(move |vol_type: VolumeType, vol_name: &str| {
        let mut project = "default";
        let mut name = vol_name;
        if vol_type.uses_project_encoding() {
            if let Some((encoded_project, encoded_name)) = vol_name.split_once('_') {
                project = encoded_project;
                name = encoded_name;
            }
        }

        match state
            .catalog()
            .volume_id(project, name, vol_type.catalog_code(), pool_id)
        {
            Ok(id) => Ok(id),
            Err(CatalogError::NoSuchObject) => Err(StorageError::VolumeNotFound {
                project: project.to_string(),
                volume: name.to_string(),
                vol_type,
            }),
            Err(other) => Err(other.into()),
        }
    })
}

/// Volume config validation rules shared by all drivers.
pub fn common_volume_rules() -> ValidationRules {
    ValidationRules::new()
        .with_rule("size", validate_size)
        .with_rule("security.shifted", validate_bool)
        .with_rule("security.unmapped", validate_bool)
}

fn validate_size(value: &str) -> StorageResult<()> {
    if value.is_empty() {
        return Ok(());
    }

    let digits_end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    if digits_end == 0 {
        return Err(StorageError::InvalidArgument(format!(
            "invalid size '{value}'"
        )));
    }

    const SUFFIXES: &[&str] = &[
        "", "B", "kB", "MB", "GB", "TB", "PB", "KiB", "MiB", "GiB", "TiB", "PiB",
    ];
    let suffix = &value[digits_end..];
    if SUFFIXES.contains(&suffix) {
        Ok(())
    } else {
        Err(StorageError::InvalidArgument(format!(
            "invalid size suffix '{suffix}'"
        )))
    }
}

fn validate_bool(value: &str) -> StorageResult<()> {
    match value {
        "" | "true" | "false" | "yes" | "no" | "1" | "0" | "on" | "off" => Ok(()),
        _ => Err(StorageError::InvalidArgument(format!(
            "invalid boolean '{value}'"
        ))),
    }
}
