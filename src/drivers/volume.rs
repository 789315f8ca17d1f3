//! Volume descriptor and the mount-scoped task protocol.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::drivers::interface::Driver;
use crate::errors::{StorageError, StorageResult};
use crate::locking;
use crate::operation::ProgressToken;

/// Separator between a parent volume name and its snapshot suffix.
pub const SNAPSHOT_DELIMITER: &str = "/";

// ============================================================================
// Volume and content types
// ============================================================================

/// Kind of workload a volume backs. Determines default mount permissions
/// and whether project-name encoding applies to the volume name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VolumeType {
    /// Image storage volume.
    Image,
    /// Custom user data volume.
    Custom,
    /// Container root disk.
    Container,
    /// Virtual-machine root disk.
    VirtualMachine,
}

impl VolumeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeType::Image => "images",
            VolumeType::Custom => "custom",
            VolumeType::Container => "containers",
            VolumeType::VirtualMachine => "virtual-machines",
        }
    }

    /// Numeric code the catalog stores for this volume type.
    pub fn catalog_code(&self) -> i64 {
        match self {
            VolumeType::Container => 0,
            VolumeType::Image => 1,
            VolumeType::Custom => 2,
            VolumeType::VirtualMachine => 3,
        }
    }

    /// Whether volume names of this type may carry a `<project>_<volume>`
    /// prefix encoding.
    pub fn uses_project_encoding(&self) -> bool {
        matches!(self, VolumeType::Container | VolumeType::VirtualMachine)
    }
}

impl fmt::Display for VolumeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the volume's contents should be treated by callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// The mount path contains a filesystem tree.
    Fs,
    /// The volume is a raw block device; the mount path holds its node.
    Block,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Fs => "fs",
            ContentType::Block => "block",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Snapshot naming and mount-path layout
// ============================================================================

/// Whether `name` follows the `<parent>/<suffix>` snapshot convention.
pub fn is_snapshot(name: &str) -> bool {
    name.contains(SNAPSHOT_DELIMITER)
}

/// Join a parent volume name and snapshot suffix into a snapshot name.
pub fn snapshot_volume_name(parent: &str, suffix: &str) -> String {
    format!("{parent}{SNAPSHOT_DELIMITER}{suffix}")
}

/// Split a volume name into its parent and optional snapshot suffix.
pub fn parent_and_snapshot(name: &str) -> (&str, Option<&str>) {
    match name.split_once(SNAPSHOT_DELIMITER) {
        Some((parent, suffix)) => (parent, Some(suffix)),
        None => (name, None),
    }
}

/// Compute the mount path for a volume. Pure function of its arguments.
///
/// Regular volumes live at `<root>/storage-pools/<pool>/<type>/<name>`;
/// snapshots at `<root>/storage-pools/<pool>/<type>-snapshots/<parent>/<suffix>`.
pub fn volume_mount_path(root: &Path, pool: &str, vol_type: VolumeType, name: &str) -> PathBuf {
    let pools = root.join("storage-pools").join(pool);
    match name.split_once(SNAPSHOT_DELIMITER) {
        Some((parent, suffix)) => pools
            .join(format!("{}-snapshots", vol_type.as_str()))
            .join(parent)
            .join(suffix),
        None => pools.join(vol_type.as_str()).join(name),
    }
}

// ============================================================================
// Volume
// ============================================================================

/// Descriptor of one storage volume (or a snapshot of one) within a pool.
///
/// A `Volume` is a value, created ad hoc per operation and discarded after
/// use. Construction has no side effects; two volumes with the same pool,
/// type and name are interchangeable. The driver is shared, never owned:
/// its lifetime belongs to the pool it was loaded for.
#[derive(Clone)]
pub struct Volume {
    name: String,
    pool: String,
    vol_type: VolumeType,
    content_type: ContentType,
    config: HashMap<String, String>,
    driver: Arc<dyn Driver>,
    mount_root: PathBuf,
}

impl fmt::Debug for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Volume")
            .field("name", &self.name)
            .field("pool", &self.pool)
            .field("vol_type", &self.vol_type)
            .field("content_type", &self.content_type)
            .finish()
    }
}

impl Volume {
    pub fn new(
        driver: Arc<dyn Driver>,
        pool_name: &str,
        vol_type: VolumeType,
        content_type: ContentType,
        vol_name: &str,
        config: HashMap<String, String>,
        mount_root: &Path,
    ) -> Self {
        Self {
            name: vol_name.to_string(),
            pool: pool_name.to_string(),
            vol_type,
            content_type,
            config,
            driver,
            mount_root: mount_root.to_path_buf(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pool(&self) -> &str {
        &self.pool
    }

    pub fn vol_type(&self) -> VolumeType {
        self.vol_type
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn config(&self) -> &HashMap<String, String> {
        &self.config
    }

    /// Whether this volume is a snapshot of another volume.
    pub fn is_snapshot(&self) -> bool {
        is_snapshot(&self.name)
    }

    /// Derive the snapshot volume named `suffix` from this volume.
    ///
    /// Snapshots of snapshots are structurally disallowed.
    pub fn new_snapshot(&self, suffix: &str) -> StorageResult<Volume> {
        if self.is_snapshot() {
            return Err(StorageError::InvalidOperation(
                "cannot create a snapshot volume from a snapshot".to_string(),
            ));
        }

        Ok(Volume::new(
            Arc::clone(&self.driver),
            &self.pool,
            self.vol_type,
            self.content_type,
            &snapshot_volume_name(&self.name, suffix),
            self.config.clone(),
            &self.mount_root,
        ))
    }

    /// Path where the volume is (or would be) mounted. No I/O.
    pub fn mount_path(&self) -> PathBuf {
        volume_mount_path(&self.mount_root, &self.pool, self.vol_type, &self.name)
    }

    /// Create the volume's mount path with the correct permissions for its
    /// type.
    ///
    /// Created ancestors get mode 0711. The leaf is then locked down to
    /// owner-only traversal (0100) for every type except custom and image.
    pub fn create_mount_path(&self) -> StorageResult<()> {
        let vol_path = self.mount_path();

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;

            std::fs::DirBuilder::new()
                .recursive(true)
                .mode(0o711)
                .create(&vol_path)
                .map_err(|source| StorageError::Filesystem {
                    path: vol_path.clone(),
                    source,
                })?;

            if self.vol_type != VolumeType::Custom && self.vol_type != VolumeType::Image {
                use std::os::unix::fs::PermissionsExt;

                std::fs::set_permissions(&vol_path, std::fs::Permissions::from_mode(0o100))
                    .map_err(|source| StorageError::Filesystem {
                        path: vol_path.clone(),
                        source,
                    })?;
            }
        }

        #[cfg(not(unix))]
        {
            std::fs::create_dir_all(&vol_path).map_err(|source| StorageError::Filesystem {
                path: vol_path.clone(),
                source,
            })?;
        }

        Ok(())
    }

    /// Run `task` with the volume mounted, unmounting afterwards if this
    /// call performed the physical mount.
    ///
    /// The named lock brackets only the mount (and later unmount) decision,
    /// not the task itself: the driver's reference count is what keeps
    /// overlapping tasks on the same volume safe, while the lock prevents
    /// two callers racing on the check-and-increment.
    ///
    /// The compensating unmount runs on every exit path once the driver
    /// reported a physical mount, including task failure and panics. A
    /// task error always wins as the return value; an unmount failure
    /// after a failed task is logged, after a successful task it is
    /// returned.
    pub fn mount_task<F>(&self, task: F, op: Option<&ProgressToken>) -> StorageResult<()>
    where
        F: FnOnce(&Path, Option<&ProgressToken>) -> StorageResult<()>,
    {
        let mount_lock_id = format!("mount/{}/{}", self.vol_type, self.name);
        let umount_lock_id = format!("umount/{}/{}", self.vol_type, self.name);

        // Snapshots are mounted through the snapshot-specific driver calls
        // as these typically mount read-only.
        let (parent_name, snap_name) = parent_and_snapshot(&self.name);

        let our_mount = {
            let _lock = locking::lock(&mount_lock_id);
            match snap_name {
                Some(snap) => {
                    self.driver
                        .mount_volume_snapshot(self.vol_type, parent_name, snap, op)?
                }
                None => self.driver.mount_volume(self.vol_type, &self.name, op)?,
            }
        };

        let guard = our_mount.then(|| UnmountGuard {
            volume: self,
            lock_id: umount_lock_id,
            op,
            armed: true,
        });

        let task_result = task(&self.mount_path(), op);

        let unmount_result = match guard {
            Some(guard) => guard.release(),
            None => Ok(()),
        };

        match task_result {
            Err(task_err) => {
                if let Err(umount_err) = unmount_result {
                    tracing::warn!(
                        volume = %self.name,
                        pool = %self.pool,
                        error = %umount_err,
                        "Failed to unmount volume after task error"
                    );
                }
                Err(task_err)
            }
            Ok(()) => unmount_result,
        }
    }

    /// List this volume's snapshots, in the driver's order.
    pub fn snapshots(&self, op: Option<&ProgressToken>) -> StorageResult<Vec<Volume>> {
        if self.is_snapshot() {
            return Err(StorageError::InvalidOperation(
                "volume is a snapshot".to_string(),
            ));
        }

        let suffixes = self.driver.volume_snapshots(self.vol_type, &self.name, op)?;
        suffixes
            .into_iter()
            .map(|suffix| self.new_snapshot(&suffix))
            .collect()
    }
}

/// Compensating unmount for a physical mount performed by `mount_task`.
///
/// `release` performs the unmount inline and reports its result; `Drop`
/// covers panic and early-exit paths, where the result can only be logged.
struct UnmountGuard<'a> {
    volume: &'a Volume,
    lock_id: String,
    op: Option<&'a ProgressToken>,
    armed: bool,
}

impl UnmountGuard<'_> {
    fn release(mut self) -> StorageResult<()> {
        self.armed = false;
        self.unmount()
    }

    fn unmount(&self) -> StorageResult<()> {
        let _lock = locking::lock(&self.lock_id);
        let (parent_name, snap_name) = parent_and_snapshot(&self.volume.name);
        match snap_name {
            Some(snap) => self
                .volume
                .driver
                .unmount_volume_snapshot(self.volume.vol_type, parent_name, snap, self.op)
                .map(|_| ()),
            None => self
                .volume
                .driver
                .unmount_volume(self.volume.vol_type, &self.volume.name, self.op)
                .map(|_| ()),
        }
    }
}

impl Drop for UnmountGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.unmount() {
            tracing::warn!(
                volume = %self.volume.name,
                pool = %self.volume.pool,
                error = %err,
                "Failed to unmount volume during cleanup"
            );
        }
    }
}
