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


//! Decoder tests over the public [`Decoder`] interface.
//!
//! Each case decodes one instruction at 8000h.

use test_case::test_case;
use zdisasm::{Decoder, Instruction, Memory, NumberType, OpcodeFlags, Z80Decoder};

fn decode(bytes: &[u8]) -> Instruction {
    let mut memory = Memory::new();
    memory.set_memory(0x8000, bytes);
    Z80Decoder::new().decode(&memory, 0x8000)
}

// ============================================================================
// Mnemonics
// ============================================================================

#[test_case(&[0x00], 1, "NOP"; "nop")]
#[test_case(&[0x3e, 0x01], 2, "LD A,01h"; "load_byte")]
#[test_case(&[0x21, 0x34, 0x12], 3, "LD HL,1234h"; "load_word")]
#[test_case(&[0x3a, 0x00, 0x90], 3, "LD A,(9000h)"; "load_indirect")]
#[test_case(&[0xc3, 0x00, 0x80], 3, "JP 8000h"; "jump")]
#[test_case(&[0xd3, 0xfe], 2, "OUT (FEh),A"; "port_out")]
#[test_case(&[0xff], 1, "RST 38h"; "restart")]
#[test_case(&[0xcb, 0x47], 2, "BIT 0,A"; "bit_test")]
#[test_case(&[0xed, 0xb0], 2, "LDIR"; "block_copy")]
#[test_case(&[0xed, 0x4d], 2, "RETI"; "return_from_interrupt")]
#[test_case(&[0xdd, 0x21, 0x00, 0x40], 4, "LD IX,4000h"; "index_load_word")]
#[test_case(&[0xdd, 0x7e, 0x05], 3, "LD A,(IX+5)"; "index_displacement")]
#[test_case(&[0xfd, 0x75, 0xfe], 3, "LD (IY-2),L"; "index_negative_displacement")]
#[test_case(&[0xfd, 0xe9], 2, "JP (IY)"; "index_jump")]
fn test_mnemonic(bytes: &[u8], length: u8, mnemonic: &str) {
    let instruction = decode(bytes);
    assert_eq!(instruction.length, length);
    assert_eq!(instruction.mnemonic(), mnemonic);
}

// ============================================================================
// Control Flow Flags
// ============================================================================

#[test_case(&[0xc9], OpcodeFlags::RET | OpcodeFlags::STOP; "ret")]
#[test_case(&[0xc8], OpcodeFlags::RET | OpcodeFlags::CONDITIONAL; "ret_z")]
#[test_case(&[0xc3, 0x00, 0x80], OpcodeFlags::BRANCH_ADDRESS | OpcodeFlags::STOP; "jp")]
#[test_case(&[0xc2, 0x00, 0x80], OpcodeFlags::BRANCH_ADDRESS | OpcodeFlags::CONDITIONAL; "jp_nz")]
#[test_case(&[0x18, 0x00], OpcodeFlags::BRANCH_ADDRESS | OpcodeFlags::STOP; "jr")]
#[test_case(&[0x10, 0x00], OpcodeFlags::BRANCH_ADDRESS | OpcodeFlags::CONDITIONAL; "djnz")]
#[test_case(&[0xcd, 0x00, 0x80], OpcodeFlags::BRANCH_ADDRESS | OpcodeFlags::CALL; "call")]
#[test_case(&[0xdc, 0x00, 0x80], OpcodeFlags::BRANCH_ADDRESS | OpcodeFlags::CALL | OpcodeFlags::CONDITIONAL; "call_c")]
#[test_case(&[0xe9], OpcodeFlags::STOP; "jp_hl")]
#[test_case(&[0x31, 0x00, 0x00], OpcodeFlags::LOAD_STACK_TOP; "ld_sp")]
#[test_case(&[0x00], OpcodeFlags::empty(); "nop")]
fn test_flags(bytes: &[u8], flags: OpcodeFlags) {
    assert_eq!(decode(bytes).flags, flags);
}

// ============================================================================
// Operand Kinds
// ============================================================================

#[test_case(&[0xcd, 0x00, 0x90], NumberType::CodeSub, 0x9000; "call_target")]
#[test_case(&[0xc3, 0x00, 0x90], NumberType::CodeLbl, 0x9000; "jump_target")]
#[test_case(&[0x18, 0x10], NumberType::CodeLocalLbl, 0x8012; "relative_forward")]
#[test_case(&[0x10, 0xfe], NumberType::CodeLocalLbl, 0x8000; "relative_backward")]
#[test_case(&[0x32, 0x00, 0x40], NumberType::DataLbl, 0x4000; "store_indirect")]
#[test_case(&[0xdb, 0x1f], NumberType::PortLbl, 0x1f; "port_in")]
#[test_case(&[0x11, 0x00, 0x40], NumberType::NumberWord, 0x4000; "immediate_word")]
#[test_case(&[0xef], NumberType::CodeRst, 0x28; "restart_target")]
fn test_operand(bytes: &[u8], kind: NumberType, value: u16) {
    let instruction = decode(bytes);
    assert_eq!(instruction.value_kind, kind);
    assert_eq!(instruction.value, Some(value));
}

#[test]
fn test_stack_load_comment() {
    assert_eq!(decode(&[0x31, 0x00, 0x00]).comment, Some("top of stack"));
}

#[test]
fn test_undocumented_ed_mirror() {
    assert_eq!(decode(&[0xed, 0x4c]).mnemonic(), "NEG");
    assert_eq!(decode(&[0xed, 0x4c]).length, 2);
}
