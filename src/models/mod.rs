//! This module defines the wire-level values of the target protocol: CDB
//! opcodes, status bytes, messages and sense data.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Defines the SCSI opcode enumeration and CDB length groups.
pub mod opcode;
/// Defines the sense key / ASC table and fixed-format sense data.
pub mod sense_data;
/// Defines the status byte and Message-In / Message-Out codes.
pub mod status;
