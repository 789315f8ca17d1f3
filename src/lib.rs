//! poolkit - storage pool and volume core for virtualization daemons.
//!
//! Manages storage pools (backing stores provided by pluggable drivers)
//! and the volumes layered on top of them. Callers resolve a pool by name
//! or owning instance, obtain [`Volume`] descriptors from it, and run
//! mount-scoped tasks without knowing which technology backs the pool.
//! Exactly-once physical mount/unmount semantics are guaranteed under
//! concurrent callers by combining per-volume named locks with the
//! drivers' mount reference counting.
//!
//! Out of scope, consumed through narrow traits: the concrete drivers
//! ([`drivers::Driver`]), the relational catalog ([`catalog::Catalog`]),
//! and the management API layer ([`operation::ProgressToken`] is the only
//! thing passed through from it).

pub mod catalog;
pub mod drivers;
pub mod errors;
pub mod locking;
pub mod operation;
pub mod pool;
pub mod resolver;
pub mod state;

pub use catalog::{Catalog, CatalogError, MemoryCatalog, PoolDescriptor};
pub use drivers::{ContentType, Driver, DriverRegistration, DriverSetup, Volume, VolumeType};
pub use errors::{StorageError, StorageResult};
pub use operation::ProgressToken;
pub use pool::Pool;
pub use resolver::{PoolResolver, ResolverOptions};
pub use state::DaemonState;

/// Initialize tracing output for binaries embedding this crate.
///
/// Respects `RUST_LOG`; defaults to `info`. Safe to call more than once,
/// later calls are no-ops.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
