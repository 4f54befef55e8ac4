// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use anyhow::{Context, Result};
use hex_literal::hex;
use scsi_target_rs::{
    bus::{Phase, virtual_bus::Initiator},
    cfg::enums::DeviceKind,
    device::{Device, factory},
    target::{Registry, StepOutcome},
};

use super::common::{
    CHECK_CONDITION, GOOD, arbiter, attach_with, disk_target, patterned_image, read10,
    request_sense, transact, write10,
};

const INQUIRY: [u8; 6] = hex!("12 00 00 00 24 00");
const IDENTIFY_LUN0: u8 = 0x80;
const IDENTIFY_LUN1: u8 = 0x81;

#[test]
fn test_inquiry() -> Result<()> {
    let (registry, _) = disk_target(1, 8)?;
    let mut arbiter = arbiter(&registry)?;

    let (outcome, initiator) = transact(&mut arbiter, Initiator::select_id(1).command(&INQUIRY))?;
    assert!(matches!(outcome, StepOutcome::Completed { target: 1, .. }));
    assert_eq!(initiator.data_in.len(), 36);
    assert_eq!(&initiator.data_in[8..16], b"RSSCSI  ");
    assert_eq!(initiator.status_byte(), Some(GOOD));
    assert_eq!(initiator.message_in, vec![0x00]);
    assert_eq!(
        initiator.phases,
        vec![Phase::Command, Phase::DataIn, Phase::Status, Phase::MsgIn]
    );
    Ok(())
}

#[test]
fn test_read10_streams_blocks() -> Result<()> {
    let (registry, storage) = disk_target(0, 8)?;
    let mut arbiter = arbiter(&registry)?;

    let (outcome, initiator) = transact(&mut arbiter, Initiator::select_id(0).command(&read10(1, 3)))?;
    assert_eq!(initiator.status_byte(), Some(GOOD));
    assert_eq!(initiator.data_in, storage.snapshot()[512..2048]);
    // one phase step per block
    assert!(matches!(outcome, StepOutcome::Completed { steps, .. } if steps == 5 + 3));
    Ok(())
}

#[test]
fn test_write_then_read_back() -> Result<()> {
    let (registry, storage) = disk_target(0, 8)?;
    let mut arbiter = arbiter(&registry)?;
    let payload: Vec<u8> = (0..1024).map(|i| (i % 251) as u8).collect();

    let (_, initiator) = transact(
        &mut arbiter,
        Initiator::select_id(0)
            .command(&write10(4, 2))
            .data_out(&payload),
    )?;
    assert_eq!(initiator.status_byte(), Some(GOOD));
    assert_eq!(
        initiator.phases,
        vec![Phase::Command, Phase::DataOut, Phase::Status, Phase::MsgIn]
    );
    assert_eq!(storage.snapshot()[2048..3072], payload[..]);

    let (_, initiator) = transact(&mut arbiter, Initiator::select_id(0).command(&read10(4, 2)))?;
    assert_eq!(initiator.data_in, payload);
    Ok(())
}

#[test]
fn test_identify_selects_lun() -> Result<()> {
    let (registry, _) = disk_target(3, 8)?;
    attach_with(&registry, 3, 1, DeviceKind::ScsiMo, &patterned_image(8, 512))?;
    let mut arbiter = arbiter(&registry)?;

    let (_, initiator) = transact(
        &mut arbiter,
        Initiator::select_id(3)
            .with_messages(&[IDENTIFY_LUN1])
            .command(&INQUIRY),
    )?;
    assert_eq!(initiator.phases[0], Phase::MsgOut);
    assert_eq!(&initiator.data_in[..2], &hex!("07 80"));
    assert_eq!(initiator.status_byte(), Some(GOOD));

    // REPORT LUNS lists both units
    let (_, initiator) = transact(
        &mut arbiter,
        Initiator::select_id(3)
            .with_messages(&[IDENTIFY_LUN0])
            .command(&hex!("a0 00 00 00 00 00 00000020 00 00")),
    )?;
    assert_eq!(
        initiator.data_in,
        hex!("00000010 00000000 0000000000000000 0001000000000000")
    );
    Ok(())
}

#[test]
fn test_missing_lun() -> Result<()> {
    let (registry, _) = disk_target(3, 8)?;
    let mut arbiter = arbiter(&registry)?;

    let (_, initiator) = transact(
        &mut arbiter,
        Initiator::select_id(3)
            .with_messages(&[IDENTIFY_LUN1])
            .command(&INQUIRY),
    )?;
    assert_eq!(initiator.status_byte(), Some(GOOD));
    assert_eq!(initiator.data_in[0], 0x7F);

    // LUN taken from the CDB without IDENTIFY
    let (_, initiator) = transact(
        &mut arbiter,
        Initiator::select_id(3).command(&hex!("00 20 00 00 00 00")),
    )?;
    assert_eq!(initiator.status_byte(), Some(CHECK_CONDITION));

    let (_, initiator) = transact(
        &mut arbiter,
        Initiator::select_id(3).command(&hex!("03 20 00 00 12 00")),
    )?;
    assert_eq!(initiator.status_byte(), Some(GOOD));
    assert_eq!((initiator.data_in[2], initiator.data_in[12]), (0x05, 0x25));
    Ok(())
}

#[test]
fn test_mode_select_parameter_list() -> Result<()> {
    let (registry, _) = disk_target(0, 8)?;
    let mut arbiter = arbiter(&registry)?;

    let (_, initiator) = transact(
        &mut arbiter,
        Initiator::select_id(0)
            .command(&hex!("15 10 00 00 0c 00"))
            .data_out(&hex!("00 00 00 08 00000000 00 000200")),
    )?;
    assert_eq!(initiator.status_byte(), Some(GOOD));
    assert!(initiator.phases.contains(&Phase::DataOut));

    let (_, initiator) = transact(
        &mut arbiter,
        Initiator::select_id(0)
            .command(&hex!("15 10 00 00 0c 00"))
            .data_out(&hex!("00 00 00 08 00000000 00 000800")),
    )?;
    assert_eq!(initiator.status_byte(), Some(CHECK_CONDITION));
    let sense = request_sense(&mut arbiter, 0)?;
    assert_eq!((sense[2], sense[12]), (0x05, 0x26));
    Ok(())
}

#[test]
fn test_verify_compares_medium() -> Result<()> {
    let (registry, _) = disk_target(0, 8)?;
    let mut arbiter = arbiter(&registry)?;
    let verify = hex!("2f 02 00000001 00 0001 00");

    let (_, initiator) = transact(
        &mut arbiter,
        Initiator::select_id(0).command(&verify).data_out(&[0x01; 512]),
    )?;
    assert_eq!(initiator.status_byte(), Some(GOOD));

    let (_, initiator) = transact(
        &mut arbiter,
        Initiator::select_id(0).command(&verify).data_out(&[0x02; 512]),
    )?;
    assert_eq!(initiator.status_byte(), Some(CHECK_CONDITION));
    let sense = request_sense(&mut arbiter, 0)?;
    assert_eq!((sense[2], sense[12]), (0x0E, 0x1D));
    Ok(())
}

#[test]
fn test_host_bridge_loopback() -> Result<()> {
    let registry = Arc::new(Registry::new());
    registry.attach(6, 0, factory::create(DeviceKind::HostBridge))?;
    let mut arbiter = arbiter(&registry)?;

    let (_, initiator) = transact(
        &mut arbiter,
        Initiator::select_id(6)
            .command(&hex!("2a 00 00 00 00 00 000004 00"))
            .data_out(b"ping"),
    )?;
    assert_eq!(initiator.status_byte(), Some(GOOD));
    let pending = registry.with_unit(6, 0, |unit| match unit {
        Device::HostBridge(bridge) => bridge.pending(),
        _ => 0,
    })?;
    assert_eq!(pending, 1);

    let (_, initiator) = transact(
        &mut arbiter,
        Initiator::select_id(6).command(&hex!("28 00 00 00 00 00 000100 00")),
    )?;
    assert_eq!(initiator.data_in, b"ping");
    Ok(())
}

#[test]
fn test_message_after_status() -> Result<()> {
    let (registry, _) = disk_target(0, 8)?;
    let mut arbiter = arbiter(&registry)?;

    let (outcome, initiator) = transact(
        &mut arbiter,
        Initiator::select_id(0)
            .command(&[0; 6])
            .messages_after_status(&[0x08]),
    )?;
    assert!(matches!(outcome, StepOutcome::Completed { .. }));
    assert_eq!(
        initiator.phases,
        vec![Phase::Command, Phase::Status, Phase::MsgIn, Phase::MsgOut]
    );
    assert_eq!(initiator.message_in, vec![0x00]);
    Ok(())
}

#[test]
fn test_controller_counters() -> Result<()> {
    let (registry, _) = disk_target(0, 8)?;
    let mut arbiter = arbiter(&registry)?;

    transact(&mut arbiter, Initiator::select_id(0).command(&INQUIRY))?;
    transact(&mut arbiter, Initiator::select_id(0).command(&read10(100, 1)))?;
    transact(&mut arbiter, Initiator::select_id(0).command(&[0; 6]))?;

    let stats = registry
        .lock()
        .controller(0)
        .context("controller 0")?
        .stats();
    assert_eq!(stats.selections, 3);
    assert_eq!(stats.commands, 3);
    assert_eq!(stats.check_conditions, 1);
    assert_eq!(stats.resets, 0);
    Ok(())
}
