// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use scsi_target_rs::{
    bus::virtual_bus::{Initiator, VirtualBus},
    cfg::{config::Config, enums::DeviceKind},
    device::{LogicalUnit, factory, storage::MemoryStorage},
    target::{Arbiter, Registry, StepOutcome},
};
use tokio_util::sync::CancellationToken;

pub const GOOD: u8 = 0x00;
pub const CHECK_CONDITION: u8 = 0x02;

pub fn test_path() -> String {
    std::env::var("TEST_CONFIG").unwrap_or_else(|_| "tests/config.yaml".into())
}

pub fn load_config() -> Result<Config> {
    let path = test_path();
    let pb = PathBuf::from(path);
    let cfg = Config::load_from_file(&pb).with_context(|| format!("failed to load {:?}", pb))?;
    Ok(cfg)
}

/// Image of `blocks` blocks of `size` bytes; block `n` is filled with `n`.
pub fn patterned_image(blocks: usize, size: usize) -> MemoryStorage {
    let bytes = (0..blocks)
        .flat_map(|n| std::iter::repeat_n(n as u8, size))
        .collect();
    MemoryStorage::new(bytes)
}

/// Attaches a unit of `kind` over `storage` at `id:unit`.
pub fn attach_with(
    registry: &Registry,
    id: u8,
    unit: u8,
    kind: DeviceKind,
    storage: &MemoryStorage,
) -> Result<()> {
    let mut device = factory::create(kind);
    device.state_mut().open(Box::new(storage.clone()), None)?;
    registry.attach(id, unit, device)?;
    Ok(())
}

/// Registry holding one patterned SCSI disk at `id:0`.
pub fn disk_target(id: u8, blocks: usize) -> Result<(Arc<Registry>, MemoryStorage)> {
    let registry = Arc::new(Registry::new());
    let storage = patterned_image(blocks, 512);
    attach_with(&registry, id, 0, DeviceKind::ScsiHd, &storage)?;
    Ok((registry, storage))
}

/// Arbiter over a manual-clock virtual bus, using the shipped bus timings.
pub fn arbiter(registry: &Arc<Registry>) -> Result<Arbiter<VirtualBus>> {
    let cfg = load_config()?;
    let bus = VirtualBus::manual().with_timeout(cfg.bus.handshake_timeout);
    Ok(Arbiter::new(bus, Arc::clone(registry), &cfg.bus))
}

/// Runs one arbitration cycle for `initiator` and hands back what it saw.
pub fn transact(
    arbiter: &mut Arbiter<VirtualBus>,
    initiator: Initiator,
) -> Result<(StepOutcome, Initiator)> {
    arbiter.bus_mut().attach_initiator(initiator);
    let outcome = arbiter.step(&CancellationToken::new())?;
    let initiator = arbiter
        .bus_mut()
        .take_initiator()
        .context("initiator script vanished")?;
    Ok((outcome, initiator))
}

/// Fixed-format sense of the last command on `id` (unit 0).
pub fn request_sense(arbiter: &mut Arbiter<VirtualBus>, id: u8) -> Result<Vec<u8>> {
    let (_, initiator) = transact(
        arbiter,
        Initiator::select_id(id).command(&[0x03, 0, 0, 0, 18, 0]),
    )?;
    Ok(initiator.data_in)
}

pub fn read10(lba: u32, blocks: u16) -> [u8; 10] {
    let mut cdb = [0u8; 10];
    cdb[0] = 0x28;
    cdb[2..6].copy_from_slice(&lba.to_be_bytes());
    cdb[7..9].copy_from_slice(&blocks.to_be_bytes());
    cdb
}

pub fn write10(lba: u32, blocks: u16) -> [u8; 10] {
    let mut cdb = read10(lba, blocks);
    cdb[0] = 0x2A;
    cdb
}
