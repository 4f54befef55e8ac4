use std::fs;

use anyhow::{Result, bail};
use hex::FromHex;
use scsi_target_rs::{
    cfg::enums::DeviceKind,
    control_block::{CommandContext, Outcome, ScsiError, dispatch},
    device::{Device, LogicalUnit, factory, storage::MemoryStorage},
};

pub fn load_fixture(path: &str) -> Result<Vec<u8>> {
    let s = fs::read_to_string(path)?;
    let cleaned = s.trim().replace(|c: char| c.is_whitespace(), "");
    Ok(Vec::from_hex(&cleaned)?)
}

/// Unit of `kind` backed by `blocks` zeroed blocks of its default size.
pub fn unit_with_medium(kind: DeviceKind, blocks: u64) -> Result<(Device, MemoryStorage)> {
    let mut device = factory::create(kind);
    let size = device.state().sector_size() as u64;
    let storage = MemoryStorage::zeroed((blocks * size) as usize);
    device.state_mut().open(Box::new(storage.clone()), None)?;
    Ok((device, storage))
}

pub fn scsi_hd(blocks: u64) -> Result<(Device, MemoryStorage)> {
    unit_with_medium(DeviceKind::ScsiHd, blocks)
}

/// Ready SCSI disk reporting `blocks` blocks without storage of that size.
pub fn sized_hd(blocks: u64) -> Result<Device> {
    let (mut device, _) = scsi_hd(1)?;
    device.state_mut().set_block_count(blocks);
    Ok(device)
}

pub fn run(device: &mut Device, cdb: &[u8]) -> Result<Outcome, ScsiError> {
    dispatch(device, &CommandContext::new(cdb))
}

pub fn data_in(result: Result<Outcome, ScsiError>) -> Result<Vec<u8>> {
    match result {
        Ok(Outcome::DataIn(data)) => Ok(data),
        other => bail!("expected Data-In, got {other:?}"),
    }
}
