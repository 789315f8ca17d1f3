//! The capability contract every storage technology implements.

use crate::drivers::volume::{Volume, VolumeType};
use crate::errors::StorageResult;
use crate::operation::ProgressToken;

/// Polymorphic contract between the storage core and a concrete storage
/// technology (ZFS, LVM, btrfs, plain directories, ...).
///
/// A driver instance is bound at load time to a single pool's name and
/// config and to a volume-ID resolution callback closed over that pool's
/// catalog identifier. It is never rebound.
///
/// # Mount reference counting
///
/// `mount_volume` and `unmount_volume` (and their snapshot variants) are
/// reference-counted by the driver per `(volume type, volume name)`. A
/// return of `true` means this call performed the physical transition
/// (unmounted → mounted, or the reverse) and, for mounts, that the caller
/// now owes a matching unmount. `false` means another holder already had
/// the volume mounted and no physical action was taken.
pub trait Driver: Send + Sync {
    /// Technology tag this instance was loaded for (e.g. "zfs").
    fn name(&self) -> &str;

    /// Materialize the pool on disk. Crash-only: on failure the driver
    /// must leave no partial state behind; callers do not roll back.
    fn create(&self, op: Option<&ProgressToken>) -> StorageResult<()>;

    /// Materialize a volume on disk.
    fn create_volume(&self, vol: &Volume, op: Option<&ProgressToken>) -> StorageResult<()>;

    /// Remove a volume and everything under it.
    fn delete_volume(
        &self,
        vol_type: VolumeType,
        vol_name: &str,
        op: Option<&ProgressToken>,
    ) -> StorageResult<()>;

    /// Mount a volume. Returns whether this call performed the physical
    /// mount.
    fn mount_volume(
        &self,
        vol_type: VolumeType,
        vol_name: &str,
        op: Option<&ProgressToken>,
    ) -> StorageResult<bool>;

    /// Unmount a volume. Returns whether this call performed the physical
    /// unmount.
    fn unmount_volume(
        &self,
        vol_type: VolumeType,
        vol_name: &str,
        op: Option<&ProgressToken>,
    ) -> StorageResult<bool>;

    /// Mount a snapshot of a volume (read-only in most technologies).
    fn mount_volume_snapshot(
        &self,
        vol_type: VolumeType,
        parent_name: &str,
        snapshot_name: &str,
        op: Option<&ProgressToken>,
    ) -> StorageResult<bool>;

    /// Unmount a snapshot of a volume.
    fn unmount_volume_snapshot(
        &self,
        vol_type: VolumeType,
        parent_name: &str,
        snapshot_name: &str,
        op: Option<&ProgressToken>,
    ) -> StorageResult<bool>;

    /// List a volume's snapshot name suffixes. Ordering is driver-defined
    /// (typically creation order) and preserved by callers.
    fn volume_snapshots(
        &self,
        vol_type: VolumeType,
        vol_name: &str,
        op: Option<&ProgressToken>,
    ) -> StorageResult<Vec<String>>;
}
