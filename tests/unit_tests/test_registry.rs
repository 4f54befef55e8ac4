use std::{fs, path::PathBuf};

use anyhow::Result;
use scsi_target_rs::{
    cfg::enums::DeviceKind,
    control_block::{CommandContext, ScsiError, dispatch},
    device::{LogicalUnit, factory},
    models::sense_data::SenseCode,
    state_machine::ControllerMode,
    target::{Registry, RegistryError},
};

use super::common::{scsi_hd, unit_with_medium};

fn temp_image(name: &str, len: usize) -> Result<PathBuf> {
    let path = std::env::temp_dir().join(format!("scsi-target-{}-{name}", std::process::id()));
    fs::write(&path, vec![0u8; len])?;
    Ok(path)
}

#[test]
fn test_attach_creates_controller_in_unit_mode() -> Result<()> {
    let registry = Registry::new();
    let (hd, _) = scsi_hd(8)?;
    registry.attach(3, 0, hd)?;
    assert_eq!(registry.controller_mode(3), Some(ControllerMode::Scsi));

    let (sasi, _) = unit_with_medium(DeviceKind::SasiHd, 8)?;
    registry.attach(4, 0, sasi)?;
    assert_eq!(registry.controller_mode(4), Some(ControllerMode::Sasi));
    assert_eq!(registry.controller_mode(5), None);
    Ok(())
}

#[test]
fn test_attach_rejects_mixed_protocols() -> Result<()> {
    let registry = Registry::new();
    let (hd, _) = scsi_hd(8)?;
    registry.attach(3, 0, hd)?;

    let (sasi, _) = unit_with_medium(DeviceKind::SasiHd, 8)?;
    let err = registry.attach(3, 1, sasi).unwrap_err();
    assert!(matches!(
        err,
        RegistryError::MixedProtocol {
            id: 3,
            existing: ControllerMode::Scsi,
            requested: ControllerMode::Sasi,
        }
    ));
    // the SCSI unit is untouched
    assert_eq!(registry.list().entries.len(), 1);
    Ok(())
}

#[test]
fn test_attach_address_checks() -> Result<()> {
    let registry = Registry::new();
    let (hd, _) = scsi_hd(8)?;
    assert!(matches!(
        registry.attach(8, 0, hd),
        Err(RegistryError::InvalidTarget(8))
    ));
    let (hd, _) = scsi_hd(8)?;
    assert!(matches!(
        registry.attach(0, 2, hd),
        Err(RegistryError::InvalidUnit(2))
    ));
    Ok(())
}

#[test]
fn test_detach_removes_empty_controller() -> Result<()> {
    let registry = Registry::new();
    let (hd, storage) = scsi_hd(8)?;
    registry.attach(1, 0, hd)?;
    registry.attach(1, 1, factory::create(DeviceKind::ScsiMo))?;

    let device = registry.detach(1, 0)?;
    assert_eq!(device.kind(), DeviceKind::ScsiHd);
    assert_eq!(storage.flush_count(), 1);
    assert_eq!(registry.controller_mode(1), Some(ControllerMode::Scsi));

    registry.detach(1, 1)?;
    assert_eq!(registry.controller_mode(1), None);
    assert!(matches!(
        registry.detach(1, 1),
        Err(RegistryError::NotAttached { id: 1, unit: 1 })
    ));

    // an emptied id accepts the other protocol
    let (sasi, _) = unit_with_medium(DeviceKind::SasiHd, 8)?;
    registry.attach(1, 0, sasi)?;
    assert_eq!(registry.controller_mode(1), Some(ControllerMode::Sasi));
    Ok(())
}

#[test]
fn test_listing() -> Result<()> {
    let registry = Registry::new();
    assert!(registry.list().is_empty());
    assert_eq!(registry.list().to_string(), "No device is installed.\n");

    let (hd, _) = scsi_hd(8)?;
    registry.attach(0, 0, hd)?;
    registry.attach(2, 0, factory::create(DeviceKind::ScsiMo))?;
    registry.attach(6, 0, factory::create(DeviceKind::HostBridge))?;
    let (mo, _) = unit_with_medium(DeviceKind::ScsiMo, 8)?;
    registry.attach(2, 1, mo)?;
    registry.protect(2, 1, true)?;

    let text = registry.list().to_string();
    assert!(text.contains("| ID | UN | TYPE | DEVICE STATUS"));
    assert!(text.contains("|  0 |  0 | SCHD | MEMORY"));
    assert!(text.contains("|  2 |  0 | SCMO | NO MEDIA"));
    assert!(text.contains("|  2 |  1 | SCMO | MEMORY(WRITEPROTECT)"));
    assert!(text.contains("|  6 |  0 | SCBR | HOST BRIDGE"));
    Ok(())
}

#[test]
fn test_listing_write_protect_needs_removable_medium() -> Result<()> {
    let registry = Registry::new();
    let (hd, _) = scsi_hd(8)?;
    registry.attach(0, 0, hd)?;
    registry.protect(0, 0, true)?;
    let (cd, _) = unit_with_medium(DeviceKind::ScsiCd, 8)?;
    registry.attach(3, 0, cd)?;
    registry.attach(4, 0, factory::create(DeviceKind::ScsiCd))?;

    let text = registry.list().to_string();
    assert!(text.contains("|  0 |  0 | SCHD | MEMORY\n"));
    assert!(text.contains("|  3 |  0 | SCCD | MEMORY(WRITEPROTECT)"));
    assert!(text.contains("|  4 |  0 | SCCD | NO MEDIA\n"));
    Ok(())
}

#[test]
fn test_eject_insert_protect() -> Result<()> {
    let registry = Registry::new();
    let (hd, _) = scsi_hd(8)?;
    registry.attach(0, 0, hd)?;
    let (mo, _) = unit_with_medium(DeviceKind::ScsiMo, 8)?;
    registry.attach(1, 0, mo)?;
    let (cd, _) = unit_with_medium(DeviceKind::ScsiCd, 8)?;
    registry.attach(2, 0, cd)?;

    assert!(matches!(
        registry.eject(0, 0, false),
        Err(RegistryError::NotRemovable { id: 0, unit: 0 })
    ));
    assert!(matches!(
        registry.protect(2, 0, true),
        Err(RegistryError::NotProtectable { id: 2, unit: 0 })
    ));

    registry.with_unit(1, 0, |mo| mo.state_mut().set_locked(true))?;
    assert!(matches!(
        registry.eject(1, 0, false),
        Err(RegistryError::EjectRefused { id: 1, unit: 0 })
    ));
    registry.eject(1, 0, true)?;
    assert!(!registry.with_unit(1, 0, |mo| mo.state().is_ready())?);

    let image = temp_image("insert.mos", 32 * 512)?;
    registry.insert(1, 0, &image)?;
    let (ready, blocks) =
        registry.with_unit(1, 0, |mo| (mo.state().is_ready(), mo.state().block_count()))?;
    assert!(ready);
    assert_eq!(blocks, 32);
    assert!(registry.list().to_string().contains("insert.mos"));

    assert!(matches!(
        registry.insert(1, 0, &image),
        Err(RegistryError::Device(_))
    ));
    assert!(matches!(
        registry.insert(0, 0, &image),
        Err(RegistryError::NotRemovable { .. })
    ));
    fs::remove_file(&image)?;
    Ok(())
}

#[test]
fn test_reset_all_queues_unit_attention() -> Result<()> {
    let registry = Registry::new();
    let (hd, _) = scsi_hd(8)?;
    registry.attach(5, 0, hd)?;
    registry.reset_all();

    let tur = CommandContext::new(&[0; 6]);
    let first = registry.with_unit(5, 0, |unit| dispatch(unit, &tur))?;
    assert_eq!(first, Err(ScsiError(SenseCode::PowerOnReset)));
    let second = registry.with_unit(5, 0, |unit| dispatch(unit, &tur))?;
    assert!(second.is_ok());
    Ok(())
}

#[test]
fn test_controller_bookkeeping() -> Result<()> {
    let registry = Registry::new();
    let (hd, _) = scsi_hd(8)?;
    registry.attach(3, 1, hd)?;
    let table = registry.lock();
    let controller = table.controller(3).expect("controller 3");
    assert_eq!(controller.lun_map(), 0b10);
    assert!(controller.unit(0).is_none());
    assert!(controller.unit(1).is_some());
    assert_eq!(controller.stats().selections, 0);
    Ok(())
}
