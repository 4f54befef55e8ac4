// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use scsi_target_rs::{
    cfg::enums::DeviceKind,
    device::factory,
    target::{Registry, RegistryError, service},
};
use serial_test::serial;

#[test]
#[serial]
fn test_service_initialised_once() -> Result<()> {
    let registry = Arc::new(Registry::new());
    registry.attach(6, 0, factory::create(DeviceKind::HostBridge))?;

    assert!(!service::is_initialized());
    assert!(service::instance().is_none());
    service::init(Arc::clone(&registry))?;
    assert!(service::is_initialized());

    let second = service::init(Arc::new(Registry::new()));
    assert!(matches!(second, Err(RegistryError::AlreadyInitialized)));

    let instance = service::instance().context("instance missing")?;
    assert!(Arc::ptr_eq(&instance, &registry));
    assert!(!instance.list().is_empty());
    Ok(())
}
