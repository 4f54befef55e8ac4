// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::path::Path;

use tracing::info;

use crate::{
    cfg::{config::DeviceConfig, enums::DeviceKind},
    device::{
        Device, DeviceError, HdFlavor, HostBridge, LogicalUnit, SasiHd, ScsiCd, ScsiHd,
        ScsiMo,
        storage::{FileStorage, Storage},
    },
};

/// Fresh unit of `kind` without a medium.
pub fn create(kind: DeviceKind) -> Device {
    match kind {
        DeviceKind::SasiHd => SasiHd::new().into(),
        DeviceKind::ScsiHd => ScsiHd::new(HdFlavor::Generic).into(),
        DeviceKind::ScsiHdNec => ScsiHd::new(HdFlavor::Nec).into(),
        DeviceKind::ScsiHdApple => ScsiHd::new(HdFlavor::Apple).into(),
        DeviceKind::ScsiMo => ScsiMo::new().into(),
        DeviceKind::ScsiCd => ScsiCd::new().into(),
        DeviceKind::HostBridge => HostBridge::new().into(),
    }
}

/// Opens the image for `kind`; CD images are never opened for writing.
pub fn open_image(kind: DeviceKind, path: &Path) -> Result<Box<dyn Storage>, DeviceError> {
    let storage = if kind == DeviceKind::ScsiCd {
        FileStorage::open_read_only(path)?
    } else {
        FileStorage::open(path)?
    };
    Ok(Box::new(storage))
}

/// Builds and opens the unit described by `cfg`.
pub fn build(cfg: &DeviceConfig) -> Result<Device, DeviceError> {
    let kind = cfg.resolved_kind().ok_or(DeviceError::UnknownKind)?;
    let mut device = create(kind);

    if let Some(size) = cfg.sector_size {
        device.state_mut().set_sector_size(size)?;
    }

    if kind.needs_image() {
        let path = cfg.path.as_ref().ok_or(DeviceError::MissingImage(kind))?;
        let storage = open_image(kind, path)?;
        device.state_mut().open(storage, Some(path.clone()))?;
    }

    if cfg.protected.as_bool() {
        device.state_mut().set_protected(true);
    }

    info!(
        id = cfg.id,
        unit = cfg.unit,
        kind = %kind,
        path = ?cfg.path,
        blocks = device.state().block_count(),
        sector_size = device.state().sector_size(),
        "device created"
    );
    Ok(device)
}
