//! In-memory no-op driver backing mock-mode pools.

use crate::drivers::interface::Driver;
use crate::drivers::volume::{Volume, VolumeType};
use crate::errors::StorageResult;
use crate::operation::ProgressToken;

/// Driver that performs no disk I/O whatsoever.
///
/// Mount calls report that no physical action was taken, so volumes backed
/// by this driver never register a compensating unmount either. Used by the
/// resolver's mock mode for test isolation.
#[derive(Debug, Default)]
pub struct MockDriver;

impl Driver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    fn create(&self, _op: Option<&ProgressToken>) -> StorageResult<()> {
        Ok(())
    }

    fn create_volume(&self, _vol: &Volume, _op: Option<&ProgressToken>) -> StorageResult<()> {
        Ok(())
    }

    fn delete_volume(
        &self,
        _vol_type: VolumeType,
        _vol_name: &str,
        _op: Option<&ProgressToken>,
    ) -> StorageResult<()> {
        Ok(())
    }

    fn mount_volume(
        &self,
        _vol_type: VolumeType,
        _vol_name: &str,
        _op: Option<&ProgressToken>,
    ) -> StorageResult<bool> {
        Ok(false)
    }

    fn unmount_volume(
        &self,
        _vol_type: VolumeType,
        _vol_name: &str,
        _op: Option<&ProgressToken>,
    ) -> StorageResult<bool> {
        Ok(false)
    }

    fn mount_volume_snapshot(
        &self,
        _vol_type: VolumeType,
        _parent_name: &str,
        _snapshot_name: &str,
        _op: Option<&ProgressToken>,
    ) -> StorageResult<bool> {
        Ok(false)
    }

    fn unmount_volume_snapshot(
        &self,
        _vol_type: VolumeType,
        _parent_name: &str,
        _snapshot_name: &str,
        _op: Option<&ProgressToken>,
    ) -> StorageResult<bool> {
        Ok(false)
    }

    fn volume_snapshots(
        &self,
        _vol_type: VolumeType,
        _vol_name: &str,
        _op: Option<&ProgressToken>,
    ) -> StorageResult<Vec<String>> {
        Ok(Vec::new())
    }
}
