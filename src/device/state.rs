// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{
    control_block::ScsiError,
    device::{DeviceError, storage::Storage},
    models::sense_data::SenseCode,
};

/// Attributes every logical unit carries, whatever its type.
#[derive(Debug)]
pub struct DiskState {
    storage: Option<Box<dyn Storage>>,
    path: Option<PathBuf>,
    block_count: u64,
    sector_size: u32,
    sector_sizes: &'static [u32],
    ready: bool,
    removable: bool,
    locked: bool,
    stopped: bool,
    read_only: bool,
    protectable: bool,
    protected: bool,
    attention: Option<SenseCode>,
    sense: SenseCode,
}

impl DiskState {
    /// Not-ready unit without a medium.
    ///
    /// `sector_sizes` must contain `default_size`.
    pub fn new(sector_sizes: &'static [u32], default_size: u32) -> Self {
        Self {
            storage: None,
            path: None,
            block_count: 0,
            sector_size: default_size,
            sector_sizes,
            ready: false,
            removable: false,
            locked: false,
            stopped: false,
            read_only: false,
            protectable: false,
            protected: false,
            attention: None,
            sense: SenseCode::NoSense,
        }
    }

    pub fn removable(mut self, removable: bool) -> Self {
        self.removable = removable;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn protectable(mut self, protectable: bool) -> Self {
        self.protectable = protectable;
        self
    }

    /// Attaches a medium and derives the block count from its size.
    pub fn open(
        &mut self,
        storage: Box<dyn Storage>,
        path: Option<PathBuf>,
    ) -> Result<(), DeviceError> {
        let size = storage.size()?;
        if !storage.is_writable() && !self.read_only {
            self.protected = true;
        }
        self.block_count = size / self.sector_size as u64;
        self.storage = Some(storage);
        self.path = path;
        self.ready = true;
        self.stopped = false;
        Ok(())
    }

    /// Like [`DiskState::open`] for removable media; the next command
    /// reports a medium change.
    pub fn insert(
        &mut self,
        storage: Box<dyn Storage>,
        path: Option<PathBuf>,
    ) -> Result<(), DeviceError> {
        if !self.removable {
            return Err(DeviceError::NotRemovable);
        }
        if self.ready {
            return Err(DeviceError::MediumPresent);
        }
        self.open(storage, path)?;
        self.attention = Some(SenseCode::MediumChanged);
        Ok(())
    }

    /// Removes the medium. Refused unless the unit is removable and ready,
    /// and, without `force`, unlocked.
    pub fn eject(&mut self, force: bool) -> bool {
        if !self.removable || !self.ready {
            return false;
        }
        if self.locked && !force {
            return false;
        }
        self.flush_cache();
        debug!(path = ?self.path, "medium ejected");
        self.storage = None;
        self.path = None;
        self.ready = false;
        self.locked = false;
        self.stopped = true;
        self.block_count = 0;
        true
    }

    /// Flushes the backing store. Failures are logged only.
    pub fn flush_cache(&mut self) {
        if let Some(storage) = self.storage.as_mut()
            && let Err(e) = storage.flush()
        {
            warn!(path = ?self.path, "cache flush failed: {e}");
        }
    }

    pub fn read_block(&mut self, lba: u64) -> Result<Vec<u8>, ScsiError> {
        let size = self.sector_size as usize;
        let offset = lba * self.sector_size as u64;
        let storage = self
            .storage
            .as_mut()
            .ok_or(ScsiError(SenseCode::MediumNotPresent))?;
        let mut buf = vec![0u8; size];
        storage.read_at(offset, &mut buf).map_err(|e| {
            warn!(lba, "read failed: {e}");
            ScsiError(SenseCode::UnrecoveredReadError)
        })?;
        Ok(buf)
    }

    pub fn write_block(&mut self, lba: u64, data: &[u8]) -> Result<(), ScsiError> {
        let offset = lba * self.sector_size as u64;
        let storage = self
            .storage
            .as_mut()
            .ok_or(ScsiError(SenseCode::MediumNotPresent))?;
        storage.write_at(offset, data).map_err(|e| {
            warn!(lba, "write failed: {e}");
            ScsiError(SenseCode::WriteFault)
        })
    }

    /// Fails with NOT READY unless a medium is present.
    #[inline]
    pub fn check_ready(&self) -> Result<(), ScsiError> {
        if self.ready {
            Ok(())
        } else {
            Err(ScsiError(SenseCode::MediumNotPresent))
        }
    }

    /// Fails with DATA PROTECT when writes are not allowed.
    #[inline]
    pub fn check_writable(&self) -> Result<(), ScsiError> {
        if self.is_write_protected() {
            Err(ScsiError(SenseCode::WriteProtected))
        } else {
            Ok(())
        }
    }

    pub fn block_count(&self) -> u64 {
        self.block_count
    }

    pub fn set_block_count(&mut self, blocks: u64) {
        self.block_count = blocks;
    }

    pub fn sector_size(&self) -> u32 {
        self.sector_size
    }

    pub fn sector_sizes(&self) -> &'static [u32] {
        self.sector_sizes
    }

    /// Changes the logical block size; the block count follows the image.
    pub fn set_sector_size(&mut self, size: u32) -> Result<(), DeviceError> {
        if !self.sector_sizes.contains(&size) {
            return Err(DeviceError::UnsupportedSectorSize {
                size,
                allowed: self.sector_sizes,
            });
        }
        let bytes = self.block_count * self.sector_size as u64;
        self.sector_size = size;
        self.block_count = match self.storage.as_ref() {
            Some(storage) => storage.size()? / size as u64,
            None => bytes / size as u64,
        };
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn is_removable(&self) -> bool {
        self.removable
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_protectable(&self) -> bool {
        self.protectable
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Sets the write-protect switch. Returns false for units that cannot be
    /// protected.
    pub fn set_protected(&mut self, protected: bool) -> bool {
        if !self.protectable {
            return false;
        }
        self.protected = protected;
        true
    }

    /// Writable media currently switched to write-protect.
    #[inline]
    pub fn is_protected_writable(&self) -> bool {
        !self.read_only && self.protectable && self.protected
    }

    #[inline]
    pub fn is_write_protected(&self) -> bool {
        self.read_only || self.protected
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn sense(&self) -> SenseCode {
        self.sense
    }

    pub fn set_sense(&mut self, sense: SenseCode) {
        self.sense = sense;
    }

    /// Returns the pending sense and clears it.
    pub fn take_sense(&mut self) -> SenseCode {
        std::mem::take(&mut self.sense)
    }

    /// Queues a UNIT ATTENTION for the next command.
    pub fn queue_attention(&mut self, code: SenseCode) {
        self.attention = Some(code);
    }

    pub fn take_attention(&mut self) -> Option<SenseCode> {
        self.attention.take()
    }
}
