use anyhow::Result;
use hex_literal::hex;
use scsi_target_rs::{
    cfg::enums::DeviceKind,
    control_block::{Outcome, ScsiError},
    device::{LogicalUnit, factory},
    models::sense_data::SenseCode,
};

use super::common::{data_in, run, scsi_hd, sized_hd, unit_with_medium};

fn read10(lba: u32, blocks: u16) -> [u8; 10] {
    let mut cdb = [0u8; 10];
    cdb[0] = 0x28;
    cdb[2..6].copy_from_slice(&lba.to_be_bytes());
    cdb[7..9].copy_from_slice(&blocks.to_be_bytes());
    cdb
}

fn with_opcode(mut cdb: [u8; 10], opcode: u8) -> [u8; 10] {
    cdb[0] = opcode;
    cdb
}

fn check(code: SenseCode) -> Result<Outcome, ScsiError> {
    Err(ScsiError(code))
}

#[test]
fn test_read10_in_range() -> Result<()> {
    let (mut hd, _) = scsi_hd(16)?;
    assert_eq!(
        run(&mut hd, &read10(2, 3)),
        Ok(Outcome::ReadBlocks { lba: 2, blocks: 3 })
    );
    // last block exactly
    assert_eq!(
        run(&mut hd, &read10(15, 1)),
        Ok(Outcome::ReadBlocks { lba: 15, blocks: 1 })
    );
    Ok(())
}

#[test]
fn test_read10_out_of_range() -> Result<()> {
    let (mut hd, _) = scsi_hd(16)?;
    assert_eq!(run(&mut hd, &read10(15, 2)), check(SenseCode::LbaOutOfRange));
    assert_eq!(run(&mut hd, &read10(16, 1)), check(SenseCode::LbaOutOfRange));
    Ok(())
}

#[test]
fn test_zero_length_transfer_goes_to_status() -> Result<()> {
    let (mut hd, _) = scsi_hd(16)?;
    assert_eq!(run(&mut hd, &read10(0, 0)), Ok(Outcome::Status));
    assert_eq!(
        run(&mut hd, &with_opcode(read10(0, 0), 0x2A)),
        Ok(Outcome::Status)
    );
    Ok(())
}

#[test]
fn test_zero_capacity_fails_before_readiness() -> Result<()> {
    let mut empty = factory::create(DeviceKind::ScsiHd);
    assert!(!empty.state().is_ready());
    assert_eq!(run(&mut empty, &read10(0, 0)), check(SenseCode::LbaOutOfRange));
    assert_eq!(
        run(&mut empty, &hex!("0b 00 00 00 00 00")),
        check(SenseCode::LbaOutOfRange)
    );
    Ok(())
}

#[test]
fn test_not_ready_with_capacity() -> Result<()> {
    let mut hd = sized_hd(16)?;
    hd.state_mut().set_ready(false);
    assert_eq!(run(&mut hd, &read10(0, 1)), check(SenseCode::MediumNotPresent));
    assert_eq!(
        run(&mut hd, &hex!("00 00 00 00 00 00")),
        check(SenseCode::MediumNotPresent)
    );
    assert_eq!(
        run(&mut hd, &hex!("01 00 00 00 00 00")),
        check(SenseCode::MediumNotPresent)
    );
    Ok(())
}

#[test]
fn test_read6_decoding() -> Result<()> {
    let (mut hd, _) = scsi_hd(300)?;
    // transfer length 0 means 256 blocks
    assert_eq!(
        run(&mut hd, &hex!("08 00 00 00 00 00")),
        Ok(Outcome::ReadBlocks { lba: 0, blocks: 256 })
    );

    let mut big = sized_hd(0x20000)?;
    // LUN bits of byte 1 are not part of the address
    assert_eq!(
        run(&mut big, &hex!("08 e1 00 05 01 00")),
        Ok(Outcome::ReadBlocks {
            lba: 0x10005,
            blocks: 1
        })
    );
    Ok(())
}

#[test]
fn test_read16_and_write16() -> Result<()> {
    let mut hd = sized_hd(0x1_0000_0010)?;
    let read16 = hex!("88 00 0000000100000000 00000004 00 00");
    assert_eq!(
        run(&mut hd, &read16),
        Ok(Outcome::ReadBlocks {
            lba: 0x1_0000_0000,
            blocks: 4
        })
    );
    let write16 = hex!("8a 00 0000000100000008 00000008 00 00");
    assert_eq!(
        run(&mut hd, &write16),
        Ok(Outcome::WriteBlocks {
            lba: 0x1_0000_0008,
            blocks: 8
        })
    );
    let past_end = hex!("8a 00 0000000100000008 00000009 00 00");
    assert_eq!(run(&mut hd, &past_end), check(SenseCode::LbaOutOfRange));
    Ok(())
}

#[test]
fn test_write_protected() -> Result<()> {
    let (mut hd, _) = scsi_hd(16)?;
    assert!(hd.state_mut().set_protected(true));
    assert_eq!(
        run(&mut hd, &with_opcode(read10(0, 1), 0x2A)),
        check(SenseCode::WriteProtected)
    );
    // reads are unaffected
    assert_eq!(
        run(&mut hd, &read10(0, 1)),
        Ok(Outcome::ReadBlocks { lba: 0, blocks: 1 })
    );

    let (mut cd, _) = unit_with_medium(DeviceKind::ScsiCd, 4)?;
    assert!(cd.state().is_write_protected());
    assert_eq!(
        run(&mut cd, &with_opcode(read10(0, 1), 0x2A)),
        check(SenseCode::WriteProtected)
    );
    Ok(())
}

#[test]
fn test_verify_byte_check() -> Result<()> {
    let (mut hd, _) = scsi_hd(16)?;
    assert_eq!(
        run(&mut hd, &with_opcode(read10(4, 2), 0x2F)),
        Ok(Outcome::Status)
    );
    let mut bytchk = with_opcode(read10(4, 2), 0x2F);
    bytchk[1] = 0x02;
    assert_eq!(
        run(&mut hd, &bytchk),
        Ok(Outcome::VerifyBlocks { lba: 4, blocks: 2 })
    );
    Ok(())
}

#[test]
fn test_seek() -> Result<()> {
    let (mut hd, _) = scsi_hd(16)?;
    assert_eq!(run(&mut hd, &hex!("0b 00 00 05 00 00")), Ok(Outcome::Status));
    assert_eq!(
        run(&mut hd, &hex!("2b 00 0000000f 00 0000 00")),
        Ok(Outcome::Status)
    );
    assert_eq!(
        run(&mut hd, &hex!("2b 00 00000010 00 0000 00")),
        check(SenseCode::LbaOutOfRange)
    );
    assert_eq!(run(&mut hd, &hex!("01 00 00 00 00 00")), Ok(Outcome::Status));
    Ok(())
}

#[test]
fn test_read_long() -> Result<()> {
    let (mut hd, _) = scsi_hd(16)?;
    assert_eq!(
        run(&mut hd, &hex!("3e 00 00000003 00 0000 00")),
        Ok(Outcome::Status)
    );
    assert_eq!(
        run(&mut hd, &hex!("3e 00 00000003 00 0200 00")),
        check(SenseCode::InvalidFieldInCdb)
    );
    assert_eq!(
        run(&mut hd, &hex!("3f 00 00000010 00 0000 00")),
        check(SenseCode::LbaOutOfRange)
    );

    let read_long16 = hex!("9e 11 0000000000000003 0000 0000 00 00");
    assert_eq!(run(&mut hd, &read_long16), Ok(Outcome::Status));
    let read_long16_len = hex!("9e 11 0000000000000003 0000 0001 00 00");
    assert_eq!(
        run(&mut hd, &read_long16_len),
        check(SenseCode::InvalidFieldInCdb)
    );
    let write_long16 = hex!("9f 11 0000000000000010 0000 0000 00 00");
    assert_eq!(run(&mut hd, &write_long16), check(SenseCode::LbaOutOfRange));
    Ok(())
}

#[test]
fn test_format_unit() -> Result<()> {
    let (mut hd, _) = scsi_hd(16)?;
    assert_eq!(run(&mut hd, &hex!("04 00 00 00 00 00")), Ok(Outcome::Status));
    assert_eq!(
        run(&mut hd, &hex!("04 10 00 00 01 00")),
        check(SenseCode::InvalidFieldInCdb)
    );
    // FMTDATA with a zero-length list is fine
    assert_eq!(run(&mut hd, &hex!("04 10 00 00 00 00")), Ok(Outcome::Status));

    let mut empty = factory::create(DeviceKind::ScsiHd);
    assert_eq!(
        run(&mut empty, &hex!("04 00 00 00 00 00")),
        check(SenseCode::MediumNotPresent)
    );
    Ok(())
}

#[test]
fn test_read_defect_data() -> Result<()> {
    let (mut hd, _) = scsi_hd(16)?;
    let data = data_in(run(&mut hd, &hex!("37 00 05 00 00 00 00 0004 00")))?;
    assert_eq!(data, hex!("00 05 00 00"));
    let data = data_in(run(&mut hd, &hex!("37 00 05 00 00 00 00 0002 00")))?;
    assert_eq!(data, hex!("00 05"));
    Ok(())
}

#[test]
fn test_synchronize_cache_flushes() -> Result<()> {
    let (mut hd, storage) = scsi_hd(16)?;
    assert_eq!(
        run(&mut hd, &hex!("35 00 00000000 00 0000 00")),
        Ok(Outcome::Status)
    );
    assert_eq!(storage.flush_count(), 1);
    Ok(())
}

#[test]
fn test_unsupported_opcodes() -> Result<()> {
    let (mut hd, _) = scsi_hd(16)?;
    assert_eq!(
        run(&mut hd, &hex!("ff 00 00 00 00 00")),
        check(SenseCode::InvalidCommandOperationCode)
    );
    // READ TOC belongs to the CD-ROM
    assert_eq!(
        run(&mut hd, &hex!("43 00 00 00 00 00 00 0064 00")),
        check(SenseCode::InvalidCommandOperationCode)
    );

    let (mut sasi, _) = unit_with_medium(DeviceKind::SasiHd, 8)?;
    assert_eq!(
        run(&mut sasi, &hex!("12 00 00 00 24 00")),
        check(SenseCode::InvalidCommandOperationCode)
    );
    assert_eq!(
        run(&mut sasi, &hex!("08 00 00 01 02 00")),
        Ok(Outcome::ReadBlocks { lba: 1, blocks: 2 })
    );
    Ok(())
}

#[test]
fn test_sasi_parameter_commands() -> Result<()> {
    let (mut sasi, _) = unit_with_medium(DeviceKind::SasiHd, 8)?;
    assert!(matches!(
        run(&mut sasi, &hex!("c2 00 00 00 00 00")),
        Ok(Outcome::DataOut { length: 10, .. })
    ));
    assert!(matches!(
        run(&mut sasi, &hex!("0e 00 00 00 00 00")),
        Ok(Outcome::DataOut { length: 4, .. })
    ));
    Ok(())
}
