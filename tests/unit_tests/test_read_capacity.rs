use anyhow::Result;
use hex_literal::hex;
use scsi_target_rs::{
    cfg::enums::DeviceKind,
    control_block::{
        ScsiError,
        read_capacity::{RC16_LEN, Rc10Data},
    },
    device::{LogicalUnit, factory},
    models::sense_data::SenseCode,
};
use zerocopy::IntoBytes;

use super::common::{data_in, run, scsi_hd, sized_hd};

const READ_CAPACITY10: [u8; 10] = hex!("25 00 00000000 0000 00 00");

fn read_capacity16(alloc: u32) -> [u8; 16] {
    let mut cdb = [0u8; 16];
    cdb[0] = 0x9E;
    cdb[1] = 0x10;
    cdb[10..14].copy_from_slice(&alloc.to_be_bytes());
    cdb
}

#[test]
fn test_read_capacity10_reports_last_lba() -> Result<()> {
    let mut hd = sized_hd(0x1234_5678)?;

    let data = data_in(run(&mut hd, &READ_CAPACITY10))?;
    assert_eq!(data, hex!("12345677 00000200"));
    Ok(())
}

#[test]
fn test_read_capacity10_saturates_large_medium() -> Result<()> {
    let mut hd = sized_hd(0x1234_5678_8765_4321)?;

    let data = data_in(run(&mut hd, &READ_CAPACITY10))?;
    assert_eq!(data, hex!("ffffffff 00000200"));

    // the exact count is still available through the 16-byte form
    let data = data_in(run(&mut hd, &read_capacity16(RC16_LEN as u32)))?;
    assert_eq!(&data[..12], &hex!("1234567887654321 00000200"));
    Ok(())
}

#[test]
fn test_read_capacity16_reports_full_count() -> Result<()> {
    let (mut hd, _) = scsi_hd(4)?;
    hd.state_mut().set_sector_size(1024)?;
    hd.state_mut().set_block_count(0x1234_5678_8765_4321);

    let data = data_in(run(&mut hd, &read_capacity16(RC16_LEN as u32)))?;
    assert_eq!(data.len(), RC16_LEN);
    assert_eq!(&data[..12], &hex!("1234567887654321 00000400"));
    assert!(data[12..].iter().all(|b| *b == 0));
    Ok(())
}

#[test]
fn test_read_capacity16_allocation_length() -> Result<()> {
    let mut hd = sized_hd(64)?;

    let short = data_in(run(&mut hd, &read_capacity16(12)))?;
    assert_eq!(short, hex!("0000000000000040 00000200"));

    // zero means "everything"
    let full = data_in(run(&mut hd, &read_capacity16(0)))?;
    assert_eq!(full.len(), RC16_LEN);
    Ok(())
}

#[test]
fn test_read_capacity_needs_medium() -> Result<()> {
    let mut empty = factory::create(DeviceKind::ScsiHd);
    assert_eq!(
        run(&mut empty, &READ_CAPACITY10),
        Err(ScsiError(SenseCode::MediumNotPresent))
    );

    let (mut zero, _) = scsi_hd(0)?;
    assert!(zero.state().is_ready());
    assert_eq!(
        run(&mut zero, &READ_CAPACITY10),
        Err(ScsiError(SenseCode::MediumNotPresent))
    );
    assert_eq!(
        run(&mut zero, &read_capacity16(32)),
        Err(ScsiError(SenseCode::MediumNotPresent))
    );
    Ok(())
}

#[test]
fn test_service_action_in_unknown_action() -> Result<()> {
    let mut hd = sized_hd(8)?;
    let mut cdb = read_capacity16(32);
    cdb[1] = 0x12;
    assert_eq!(
        run(&mut hd, &cdb),
        Err(ScsiError(SenseCode::InvalidFieldInCdb))
    );
    Ok(())
}

#[test]
fn test_rc10_data_new() {
    assert_eq!(Rc10Data::new(1, 512).max_lba.get(), 0);
    assert_eq!(Rc10Data::new(0x1_0000_0000, 512).max_lba.get(), 0xFFFF_FFFF);
    assert_eq!(Rc10Data::new(0x1_0000_0001, 512).max_lba.get(), 0xFFFF_FFFF);
    assert_eq!(Rc10Data::new(0, 2048).as_bytes(), &hex!("00000000 00000800"));
}
