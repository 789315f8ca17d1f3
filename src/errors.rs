//! Error types for the storage core.
//!
//! Every failure reported by this crate is one of the [`StorageError`]
//! kinds below. Driver implementations report their own failures through
//! [`StorageError::Driver`]; this layer never inspects or retries them.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::drivers::VolumeType;

/// Convenience alias used by every fallible operation in this crate.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage pool and volume operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A required argument was missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The pool could not be loaded: unknown driver technology, a failed
    /// catalog lookup, or a load-time driver failure.
    #[error("failed to load storage pool: {0}")]
    PoolLoad(String),

    /// No catalog record for the requested instance.
    #[error("instance '{instance}' in project '{project}' not found")]
    InstanceNotFound { project: String, instance: String },

    /// No catalog record for the requested volume.
    #[error(
        "failed to get volume ID for project '{project}', volume '{volume}', type '{vol_type}': volume doesn't exist"
    )]
    VolumeNotFound {
        project: String,
        volume: String,
        vol_type: VolumeType,
    },

    /// The call is structurally disallowed (e.g. snapshot of a snapshot).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A mount-path directory or permission operation failed.
    #[error("filesystem operation on '{path}' failed: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Opaque failure reported by a storage driver, passed through unchanged.
    #[error("driver: {0}")]
    Driver(String),

    /// Catalog failure other than a lookup miss, passed through unchanged.
    #[error("catalog: {0}")]
    Catalog(String),
}

impl From<CatalogError> for StorageError {
    fn from(err: CatalogError) -> Self {
        StorageError::Catalog(err.to_string())
    }
}
