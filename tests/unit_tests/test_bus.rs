use std::time::Duration;

use anyhow::{Context, Result};
use hex_literal::hex;
use scsi_target_rs::{
    bus::{
        self, Bus, BusSignals, Phase,
        virtual_bus::{Initiator, VirtualBus},
    },
    cfg::config::BusConfig,
    models::opcode::CDB_MAX,
};

/// Bus whose initiator already saw BSY and is waiting for REQ.
fn connected(initiator: Initiator) -> Result<VirtualBus> {
    let mut bus = VirtualBus::manual();
    bus.attach_initiator(initiator);
    assert!(bus.wait_select_event(Duration::from_millis(10))?);
    bus.set_signal(BusSignals::BSY, true);
    assert!(bus.wait_signal(BusSignals::SEL, false));
    Ok(bus)
}

#[test]
fn test_phase_lines() {
    let phases = [
        Phase::DataOut,
        Phase::DataIn,
        Phase::Command,
        Phase::Status,
        Phase::MsgOut,
        Phase::MsgIn,
    ];
    for phase in phases {
        assert_eq!(Phase::from_lines(phase.lines() | BusSignals::BSY), Some(phase));
    }
    assert_eq!(Phase::from_lines(BusSignals::MSG), None);
    assert!(Phase::Status.is_target_to_initiator());
    assert!(!Phase::MsgOut.is_target_to_initiator());
}

#[test]
fn test_selection_and_handshakes() -> Result<()> {
    let mut bus = VirtualBus::manual();
    bus.attach_initiator(Initiator::select_id(1).command(&hex!("12 00 00 00 24 00")));
    assert!(bus.wait_select_event(Duration::from_millis(10))?);
    assert_eq!(bus.dat(), 0x02);

    bus.set_signal(BusSignals::BSY, true);
    assert!(bus.wait_signal(BusSignals::SEL, false));

    bus.set_phase(Phase::Command);
    let mut cdb = [0u8; CDB_MAX];
    assert_eq!(bus.command_handshake(&mut cdb), 6);
    assert_eq!(&cdb[..6], &hex!("12 00 00 00 24 00"));

    bus.set_phase(Phase::DataIn);
    assert_eq!(bus.send_handshake(&[1, 2, 3]), 3);
    bus.set_phase(Phase::Status);
    assert_eq!(bus.send_handshake(&[0]), 1);

    let initiator = bus.take_initiator().context("initiator missing")?;
    assert_eq!(initiator.data_in, vec![1, 2, 3]);
    assert_eq!(initiator.status_byte(), Some(0));
    assert_eq!(
        initiator.phases,
        vec![Phase::Command, Phase::DataIn, Phase::Status]
    );
    Ok(())
}

#[test]
fn test_ten_byte_command_length() -> Result<()> {
    let cdb = hex!("28 00 00000001 00 0002 00");
    let mut bus = connected(Initiator::select_id(0).command(&cdb))?;
    bus.set_phase(Phase::Command);
    let mut buf = [0u8; CDB_MAX];
    assert_eq!(bus.command_handshake(&mut buf), 10);
    assert_eq!(&buf[..10], &cdb);
    Ok(())
}

#[test]
fn test_receive_times_out() -> Result<()> {
    let mut bus = connected(Initiator::select_id(0).data_out(&[9, 8]))?;
    bus.set_phase(Phase::DataOut);
    let start = bus.now();
    let mut buf = [0u8; 4];
    assert_eq!(bus.receive_handshake(&mut buf), 2);
    assert_eq!(&buf[..2], &[9, 8]);
    assert!(bus.now() - start >= bus.handshake_timeout());
    Ok(())
}

#[test]
fn test_reset_aborts_handshake() -> Result<()> {
    let mut bus = connected(Initiator::select_id(0).reset_after(0))?;
    bus.set_phase(Phase::DataIn);
    assert_eq!(bus.send_handshake(&[0xAA]), 0);
    assert!(bus.acquire().contains(BusSignals::RST));

    bus.reset();
    assert!(!bus.acquire().contains(BusSignals::RST));
    assert!(bus.target_lines().is_empty());
    assert!(bus.initiator().is_some_and(Initiator::is_finished));
    Ok(())
}

#[test]
fn test_idle_bus() -> Result<()> {
    let mut boxed: Box<dyn Bus> = Box::new(VirtualBus::manual());
    let start = boxed.now();
    assert!(!boxed.wait_select_event(Duration::from_millis(10))?);
    assert!(boxed.now() - start >= Duration::from_millis(10));

    let mut opened = bus::open(&BusConfig::default())?;
    assert!(!opened.acquire().contains(BusSignals::SEL));
    Ok(())
}
