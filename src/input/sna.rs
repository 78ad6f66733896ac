// Zdisasm - A static Z80 disassembler reconstructing control flow of binaries
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! ZX Spectrum snapshots.
//!
//! A `.sna` file is a 27 byte register header followed by the RAM from
//! 0x4000 on. The program counter was pushed to the stack when the snapshot
//! was taken, so the start address is the word at SP.

use crate::disasm::Disassembler;
use crate::error::{DisasmError, ErrorCode, Result};

/// Size of the register header.
pub const SNA_HEADER_SIZE: usize = 27;

/// Address the RAM image is loaded to.
pub const SNA_LOAD_ADDRESS: u16 = 0x4000;

/// Offset of the stack pointer inside the header (little endian).
const SP_OFFSET: usize = 23;

/// Load a snapshot and return its start address.
pub fn load_sna(disasm: &mut Disassembler, data: &[u8]) -> Result<u16> {
    if data.len() < SNA_HEADER_SIZE {
        return Err(DisasmError::new(
            ErrorCode::SnapshotTooShort,
            format!(
                "Snapshot has {} bytes but the header alone needs {}",
                data.len(),
                SNA_HEADER_SIZE
            ),
        ));
    }

    let sp = u16::from_le_bytes([data[SP_OFFSET], data[SP_OFFSET + 1]]);
    disasm.set_memory(SNA_LOAD_ADDRESS, &data[SNA_HEADER_SIZE..]);
    let start = disasm.memory.word_at(sp);
    disasm.set_sna_start(start);

    log::debug!("Snapshot SP={:04X}h, start={:04X}h", sp, start);
    Ok(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(sp: u16, ram: &[u8]) -> Vec<u8> {
        let mut data = vec![0; SNA_HEADER_SIZE];
        data[SP_OFFSET..SP_OFFSET + 2].copy_from_slice(&sp.to_le_bytes());
        data.extend_from_slice(ram);
        data
    }

    #[test]
    fn test_start_address_from_stack() {
        let mut ram = vec![0; 0x20];
        ram[0x10] = 0x34;
        ram[0x11] = 0x12;

        let mut disasm = Disassembler::new();
        let start = load_sna(&mut disasm, &snapshot(0x4010, &ram)).unwrap();

        assert_eq!(start, 0x1234);
        assert_eq!(disasm.sna_start(), Some(0x1234));
        assert!(disasm.config.no_warning_unassigned_memory);
        assert!(disasm.memory.is_assigned(0x4000));
        assert!(!disasm.memory.is_assigned(0x3fff));
    }

    #[test]
    fn test_too_short() {
        let mut disasm = Disassembler::new();
        let error = load_sna(&mut disasm, &[0; 10]).unwrap_err();
        assert_eq!(error.code, ErrorCode::SnapshotTooShort);
    }
}
