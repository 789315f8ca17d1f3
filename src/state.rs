//! Shared daemon context handed to the resolver and drivers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::Catalog;

/// Daemon-wide context: the catalog handle and the storage root directory
/// under which volume mount paths live.
///
/// Shared via `Arc` between the resolver, pools and drivers. Holds no
/// mutable state of its own.
pub struct DaemonState {
    catalog: Arc<dyn Catalog>,
    storage_root: PathBuf,
}

impl DaemonState {
    pub fn new(catalog: Arc<dyn Catalog>, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            storage_root: storage_root.into(),
        }
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    /// Root directory for all storage-pool mount paths.
    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }
}

impl fmt::Debug for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaemonState")
            .field("storage_root", &self.storage_root)
            .finish()
    }
}
