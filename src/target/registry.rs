// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use core::fmt;
use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::info;

use crate::{
    cfg::{
        config::{TARGET_MAX, UNIT_MAX},
        enums::DeviceKind,
    },
    device::{Device, LogicalUnit, factory},
    state_machine::{Controller, ControllerMode},
    target::RegistryError,
};

/// Controller slots indexed by target id.
#[derive(Debug)]
pub struct TargetTable {
    controllers: [Option<Controller>; TARGET_MAX],
}

impl TargetTable {
    fn new() -> Self {
        Self {
            controllers: std::array::from_fn(|_| None),
        }
    }

    pub fn controller(&self, id: usize) -> Option<&Controller> {
        self.controllers.get(id)?.as_ref()
    }

    pub fn controller_mut(&mut self, id: usize) -> Option<&mut Controller> {
        self.controllers.get_mut(id)?.as_mut()
    }

    pub fn controllers(&self) -> impl Iterator<Item = &Controller> {
        self.controllers.iter().flatten()
    }

    pub fn controllers_mut(&mut self) -> impl Iterator<Item = &mut Controller> {
        self.controllers.iter_mut().flatten()
    }
}

/// Owner of every controller and unit.
///
/// A single lock guards the whole table. The arbiter holds it for the
/// length of a transaction, so administrative calls never observe a
/// controller mid-command.
#[derive(Debug)]
pub struct Registry {
    table: Mutex<TargetTable>,
}

fn check_address(id: u8, unit: u8) -> Result<(), RegistryError> {
    if id as usize >= TARGET_MAX {
        return Err(RegistryError::InvalidTarget(id));
    }
    if unit as usize >= UNIT_MAX {
        return Err(RegistryError::InvalidUnit(unit));
    }
    Ok(())
}

impl Registry {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(TargetTable::new()),
        }
    }

    /// Locks the table. A poisoned lock is recovered: the table holds no
    /// invariant a panicking command could break halfway.
    pub fn lock(&self) -> MutexGuard<'_, TargetTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attaches `device` at `id:unit`, creating the controller on first
    /// use. An existing unit at the same address is replaced.
    pub fn attach(&self, id: u8, unit: u8, device: Device) -> Result<(), RegistryError> {
        check_address(id, unit)?;
        let requested = ControllerMode::for_unit(&device);
        let kind = device.kind();
        let mut table = self.lock();
        let slot = &mut table.controllers[id as usize];

        if let Some(controller) = slot.as_ref()
            && controller.mode() != requested
        {
            return Err(RegistryError::MixedProtocol {
                id,
                existing: controller.mode(),
                requested,
            });
        }

        let controller = slot.get_or_insert_with(|| Controller::new(id, requested));
        controller.set_unit(unit as usize, device);
        info!(id, unit, %kind, mode = %requested, "unit attached");
        Ok(())
    }

    /// Removes the unit at `id:unit`; the controller goes with its last
    /// unit.
    pub fn detach(&self, id: u8, unit: u8) -> Result<Device, RegistryError> {
        check_address(id, unit)?;
        let mut table = self.lock();
        let slot = &mut table.controllers[id as usize];
        let mut device = slot
            .as_mut()
            .and_then(|c| c.take_unit(unit as usize))
            .ok_or(RegistryError::NotAttached { id, unit })?;
        if slot.as_ref().is_some_and(|c| !c.has_units()) {
            *slot = None;
        }
        device.flush_cache();
        info!(id, unit, kind = %device.kind(), "unit detached");
        Ok(device)
    }

    /// Runs `f` on the unit at `id:unit`.
    pub fn with_unit<T>(
        &self,
        id: u8,
        unit: u8,
        f: impl FnOnce(&mut Device) -> T,
    ) -> Result<T, RegistryError> {
        check_address(id, unit)?;
        let mut table = self.lock();
        let device = table
            .controller_mut(id as usize)
            .and_then(|c| c.unit_mut(unit as usize))
            .ok_or(RegistryError::NotAttached { id, unit })?;
        Ok(f(device))
    }

    /// Inserts the image at `path` into a removable unit.
    pub fn insert(&self, id: u8, unit: u8, path: &Path) -> Result<(), RegistryError> {
        self.with_unit(id, unit, |device| {
            let kind = device.kind();
            if !device.state().is_removable() {
                return Err(RegistryError::NotRemovable { id, unit });
            }
            let storage = factory::open_image(kind, path)?;
            device
                .state_mut()
                .insert(storage, Some(path.to_path_buf()))?;
            info!(id, unit, path = %path.display(), "medium inserted");
            Ok(())
        })?
    }

    /// Ejects the medium of `id:unit`; `force` overrides PREVENT MEDIUM
    /// REMOVAL.
    pub fn eject(&self, id: u8, unit: u8, force: bool) -> Result<(), RegistryError> {
        self.with_unit(id, unit, |device| {
            if !device.state().is_removable() {
                return Err(RegistryError::NotRemovable { id, unit });
            }
            if !device.eject(force) {
                return Err(RegistryError::EjectRefused { id, unit });
            }
            info!(id, unit, force, "medium ejected");
            Ok(())
        })?
    }

    /// Flips the write-protect switch of a protectable unit.
    pub fn protect(&self, id: u8, unit: u8, protected: bool) -> Result<(), RegistryError> {
        self.with_unit(id, unit, |device| {
            if !device.state_mut().set_protected(protected) {
                return Err(RegistryError::NotProtectable { id, unit });
            }
            info!(id, unit, protected, "write protect changed");
            Ok(())
        })?
    }

    pub fn controller_mode(&self, id: u8) -> Option<ControllerMode> {
        self.lock().controller(id as usize).map(Controller::mode)
    }

    /// Resets every controller as a bus reset would.
    pub fn reset_all(&self) {
        for controller in self.lock().controllers_mut() {
            controller.reset();
        }
    }

    /// Flushes every unit's backing store.
    pub fn flush_all(&self) {
        for controller in self.lock().controllers_mut() {
            for device in controller.units_mut() {
                device.flush_cache();
            }
        }
    }

    /// Snapshot of all attached units.
    pub fn list(&self) -> Listing {
        let table = self.lock();
        let entries = table
            .controllers()
            .flat_map(|c| {
                c.units().map(move |(unit, device)| ListingEntry {
                    id: c.id(),
                    unit: unit as u8,
                    kind: device.kind(),
                    path: device.state().path().map(Path::to_path_buf),
                    ready: device.state().is_ready(),
                    removable: device.state().is_removable(),
                    write_protected: device.state().is_write_protected(),
                })
            })
            .collect();
        Listing { entries }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub id: u8,
    pub unit: u8,
    pub kind: DeviceKind,
    pub path: Option<PathBuf>,
    pub ready: bool,
    pub removable: bool,
    /// Read-only media count as write protected.
    pub write_protected: bool,
}

impl ListingEntry {
    fn status(&self) -> String {
        let mut status = match (&self.path, self.kind) {
            (_, DeviceKind::HostBridge) => "HOST BRIDGE".to_string(),
            (_, _) if !self.ready => "NO MEDIA".to_string(),
            (Some(path), _) => path.display().to_string(),
            (None, _) => "MEMORY".to_string(),
        };
        if self.removable && self.ready && self.write_protected {
            status.push_str("(WRITEPROTECT)");
        }
        status
    }
}

/// Attached units, rendered as the device table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub entries: Vec<ListingEntry>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return writeln!(f, "No device is installed.");
        }
        let rule = "+----+----+------+-------------------------------------";
        writeln!(f, "{rule}")?;
        writeln!(f, "| ID | UN | TYPE | DEVICE STATUS")?;
        writeln!(f, "{rule}")?;
        for entry in &self.entries {
            writeln!(
                f,
                "|  {} |  {} | {} | {}",
                entry.id,
                entry.unit,
                entry.kind.tag(),
                entry.status()
            )?;
        }
        writeln!(f, "{rule}")
    }
}
