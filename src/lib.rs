//! Target-side SCSI/SASI emulation: the bus arbiter, the per-target phase
//! state machine, the command dispatcher and the emulated logical units.
// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Bus signal lines, phases, handshakes and the in-memory bus.
pub mod bus;
/// Handles configuration, command-line parsing, and logging.
pub mod cfg;
/// Implements the SCSI commands (control blocks) and their dispatcher.
pub mod control_block;
/// Emulated logical units and their backing storage.
pub mod device;
/// Defines opcodes, status and message bytes, and sense data.
pub mod models;
/// Contains the controller phase state machine.
pub mod state_machine;
/// Registry of controllers, the arbiter loop and the shared instance.
pub mod target;
/// Provides utility functions used throughout the crate.
pub mod utils;
