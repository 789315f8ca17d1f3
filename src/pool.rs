//! Storage pool handles.
//!
//! A pool binds a loaded driver instance to a catalog identity and is the
//! unit callers obtain to act on volumes. Pools are created per resolution
//! call and discarded when the caller is done; they hold no cross-call
//! state beyond the driver and identifiers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::drivers::{ContentType, Driver, MockDriver, Volume, VolumeType};
use crate::errors::StorageResult;
use crate::operation::ProgressToken;
use crate::state::DaemonState;

/// Caller-facing surface of a resolved storage pool.
pub trait Pool: Send + Sync + fmt::Debug {
    /// Catalog identifier of the pool. `-1` for pools that are not
    /// catalog-backed (mock mode).
    fn id(&self) -> i64;

    /// Pool name.
    fn name(&self) -> &str;

    /// Technology tag of the loaded driver.
    fn driver_name(&self) -> &str;

    /// Obtain a volume descriptor for a given type and name within this
    /// pool. No side effects; the volume is a value.
    fn volume(
        &self,
        vol_type: VolumeType,
        content_type: ContentType,
        name: &str,
        config: HashMap<String, String>,
    ) -> Volume;

    /// Convenience for filesystem-backed custom volumes.
    fn custom_volume(&self, name: &str, config: HashMap<String, String>) -> Volume {
        self.volume(VolumeType::Custom, ContentType::Fs, name, config)
    }
}

/// Pool backed by a real driver instance and a catalog row.
pub struct StoragePool {
    id: i64,
    name: String,
    driver: Arc<dyn Driver>,
    state: Arc<DaemonState>,
    span: tracing::Span,
}

impl StoragePool {
    pub(crate) fn new(
        id: i64,
        name: String,
        driver: Arc<dyn Driver>,
        state: Arc<DaemonState>,
        span: tracing::Span,
    ) -> Self {
        Self {
            id,
            name,
            driver,
            state,
            span,
        }
    }

    /// Materialize the pool on disk via its driver.
    ///
    /// Driver creation is crash-only: a failure leaves no partial state,
    /// so no rollback is attempted here.
    pub(crate) fn create(&self, op: Option<&ProgressToken>) -> StorageResult<()> {
        let _entered = self.span.enter();
        tracing::info!("Creating storage pool");
        self.driver.create(op)
    }
}

impl fmt::Debug for StoragePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoragePool")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("driver", &self.driver.name())
            .finish()
    }
}

impl Pool for StoragePool {
    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn driver_name(&self) -> &str {
        self.driver.name()
    }

    fn volume(
        &self,
        vol_type: VolumeType,
        content_type: ContentType,
        name: &str,
        config: HashMap<String, String>,
    ) -> Volume {
        Volume::new(
            Arc::clone(&self.driver),
            &self.name,
            vol_type,
            content_type,
            name,
            config,
            self.state.storage_root(),
        )
    }
}

/// In-memory pool substitute returned in mock mode.
///
/// Shares the real pool's volume surface but is backed by [`MockDriver`],
/// so no subsequent volume operation performs driver or disk I/O.
pub struct MockPool {
    name: String,
    driver: Arc<dyn Driver>,
    state: Arc<DaemonState>,
}

impl MockPool {
    pub(crate) fn new(state: Arc<DaemonState>, name: &str) -> Self {
        Self {
            name: name.to_string(),
            driver: Arc::new(MockDriver),
            state,
        }
    }
}

impl fmt::Debug for MockPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockPool").field("name", &self.name).finish()
    }
}

impl Pool for MockPool {
    fn id(&self) -> i64 {
        -1
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn driver_name(&self) -> &str {
        self.driver.name()
    }

    fn volume(
        &self,
        vol_type: VolumeType,
        content_type: ContentType,
        name: &str,
        config: HashMap<String, String>,
    ) -> Volume {
        Volume::new(
            Arc::clone(&self.driver),
            &self.name,
            vol_type,
            content_type,
            name,
            config,
            self.state.storage_root(),
        )
    }
}
