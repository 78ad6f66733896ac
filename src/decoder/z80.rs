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

//! Z80 instruction decoding.
//!
//! Opcode pages are built once from text descriptions:
//! - `#nn` marks a word operand, `#n` a byte operand
//! - `@` marks the displacement of an `(IX+d)` / `(IY+d)` operand
//!
//! The kind of the operand and the control flow flags are derived from the
//! text, e.g. `CALL NZ,#nn` becomes a conditional call of a subroutine.
//! The `DD` and `FD` pages are derived from the main page, the `DDCB` and
//! `FDCB` pages from the `CB` page.

use super::{Decoder, Instruction, OpcodeFlags, OPERAND_PLACEHOLDER};
use crate::memory::Memory;
use crate::numbertype::NumberType;

/// Marker for an index displacement inside a page template.
const INDEX_PLACEHOLDER: char = '@';

/// Main opcode page. Empty entries are prefixes.
#[rustfmt::skip]
const MAIN_OPCODES: [&str; 256] = [
    // 00
    "NOP", "LD BC,#nn", "LD (BC),A", "INC BC", "INC B", "DEC B", "LD B,#n", "RLCA",
    // 08
    "EX AF,AF'", "ADD HL,BC", "LD A,(BC)", "DEC BC", "INC C", "DEC C", "LD C,#n", "RRCA",
    // 10
    "DJNZ #n", "LD DE,#nn", "LD (DE),A", "INC DE", "INC D", "DEC D", "LD D,#n", "RLA",
    // 18
    "JR #n", "ADD HL,DE", "LD A,(DE)", "DEC DE", "INC E", "DEC E", "LD E,#n", "RRA",
    // 20
    "JR NZ,#n", "LD HL,#nn", "LD (#nn),HL", "INC HL", "INC H", "DEC H", "LD H,#n", "DAA",
    // 28
    "JR Z,#n", "ADD HL,HL", "LD HL,(#nn)", "DEC HL", "INC L", "DEC L", "LD L,#n", "CPL",
    // 30
    "JR NC,#n", "LD SP,#nn", "LD (#nn),A", "INC SP", "INC (HL)", "DEC (HL)", "LD (HL),#n", "SCF",
    // 38
    "JR C,#n", "ADD HL,SP", "LD A,(#nn)", "DEC SP", "INC A", "DEC A", "LD A,#n", "CCF",
    // 40
    "LD B,B", "LD B,C", "LD B,D", "LD B,E", "LD B,H", "LD B,L", "LD B,(HL)", "LD B,A",
    // 48
    "LD C,B", "LD C,C", "LD C,D", "LD C,E", "LD C,H", "LD C,L", "LD C,(HL)", "LD C,A",
    // 50
    "LD D,B", "LD D,C", "LD D,D", "LD D,E", "LD D,H", "LD D,L", "LD D,(HL)", "LD D,A",
    // 58
    "LD E,B", "LD E,C", "LD E,D", "LD E,E", "LD E,H", "LD E,L", "LD E,(HL)", "LD E,A",
    // 60
    "LD H,B", "LD H,C", "LD H,D", "LD H,E", "LD H,H", "LD H,L", "LD H,(HL)", "LD H,A",
    // 68
    "LD L,B", "LD L,C", "LD L,D", "LD L,E", "LD L,H", "LD L,L", "LD L,(HL)", "LD L,A",
    // 70
    "LD (HL),B", "LD (HL),C", "LD (HL),D", "LD (HL),E", "LD (HL),H", "LD (HL),L", "HALT", "LD (HL),A",
    // 78
    "LD A,B", "LD A,C", "LD A,D", "LD A,E", "LD A,H", "LD A,L", "LD A,(HL)", "LD A,A",
    // 80
    "ADD A,B", "ADD A,C", "ADD A,D", "ADD A,E", "ADD A,H", "ADD A,L", "ADD A,(HL)", "ADD A,A",
    // 88
    "ADC A,B", "ADC A,C", "ADC A,D", "ADC A,E", "ADC A,H", "ADC A,L", "ADC A,(HL)", "ADC A,A",
    // 90
    "SUB B", "SUB C", "SUB D", "SUB E", "SUB H", "SUB L", "SUB (HL)", "SUB A",
    // 98
    "SBC A,B", "SBC A,C", "SBC A,D", "SBC A,E", "SBC A,H", "SBC A,L", "SBC A,(HL)", "SBC A,A",
    // A0
    "AND B", "AND C", "AND D", "AND E", "AND H", "AND L", "AND (HL)", "AND A",
    // A8
    "XOR B", "XOR C", "XOR D", "XOR E", "XOR H", "XOR L", "XOR (HL)", "XOR A",
    // B0
    "OR B", "OR C", "OR D", "OR E", "OR H", "OR L", "OR (HL)", "OR A",
    // B8
    "CP B", "CP C", "CP D", "CP E", "CP H", "CP L", "CP (HL)", "CP A",
    // C0
    "RET NZ", "POP BC", "JP NZ,#nn", "JP #nn", "CALL NZ,#nn", "PUSH BC", "ADD A,#n", "RST #",
    // C8
    "RET Z", "RET", "JP Z,#nn", "", "CALL Z,#nn", "CALL #nn", "ADC A,#n", "RST #",
    // D0
    "RET NC", "POP DE", "JP NC,#nn", "OUT (#n),A", "CALL NC,#nn", "PUSH DE", "SUB #n", "RST #",
    // D8
    "RET C", "EXX", "JP C,#nn", "IN A,(#n)", "CALL C,#nn", "", "SBC A,#n", "RST #",
    // E0
    "RET PO", "POP HL", "JP PO,#nn", "EX (SP),HL", "CALL PO,#nn", "PUSH HL", "AND #n", "RST #",
    // E8
    "RET PE", "JP (HL)", "JP PE,#nn", "EX DE,HL", "CALL PE,#nn", "", "XOR #n", "RST #",
    // F0
    "RET P", "POP AF", "JP P,#nn", "DI", "CALL P,#nn", "PUSH AF", "OR #n", "RST #",
    // F8
    "RET M", "LD SP,HL", "JP M,#nn", "EI", "CALL M,#nn", "", "CP #n", "RST #",
];

const ROTATIONS: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "SLL", "SRL"];
const REGISTERS: [&str; 8] = ["B", "C", "D", "E", "H", "L", "(HL)", "A"];

/// Text of an `ED` opcode. Undocumented mirrors decode as their documented twin.
fn ed_text(code: u8) -> Option<&'static str> {
    let text = match code {
        0x40 => "IN B,(C)",
        0x41 => "OUT (C),B",
        0x42 => "SBC HL,BC",
        0x43 => "LD (#nn),BC",
        0x44 | 0x4C | 0x54 | 0x5C | 0x64 | 0x6C | 0x74 | 0x7C => "NEG",
        0x45 | 0x55 | 0x5D | 0x65 | 0x6D | 0x75 | 0x7D => "RETN",
        0x46 | 0x4E | 0x66 | 0x6E => "IM 0",
        0x47 => "LD I,A",
        0x48 => "IN C,(C)",
        0x49 => "OUT (C),C",
        0x4A => "ADC HL,BC",
        0x4B => "LD BC,(#nn)",
        0x4D => "RETI",
        0x4F => "LD R,A",
        0x50 => "IN D,(C)",
        0x51 => "OUT (C),D",
        0x52 => "SBC HL,DE",
        0x53 => "LD (#nn),DE",
        0x56 | 0x76 => "IM 1",
        0x57 => "LD A,I",
        0x58 => "IN E,(C)",
        0x59 => "OUT (C),E",
        0x5A => "ADC HL,DE",
        0x5B => "LD DE,(#nn)",
        0x5E | 0x7E => "IM 2",
        0x5F => "LD A,R",
        0x60 => "IN H,(C)",
        0x61 => "OUT (C),H",
        0x62 => "SBC HL,HL",
        0x63 => "LD (#nn),HL",
        0x67 => "RRD",
        0x68 => "IN L,(C)",
        0x69 => "OUT (C),L",
        0x6A => "ADC HL,HL",
        0x6B => "LD HL,(#nn)",
        0x6F => "RLD",
        0x70 => "IN F,(C)",
        0x71 => "OUT (C),0",
        0x72 => "SBC HL,SP",
        0x73 => "LD (#nn),SP",
        0x78 => "IN A,(C)",
        0x79 => "OUT (C),A",
        0x7A => "ADC HL,SP",
        0x7B => "LD SP,(#nn)",
        0xA0 => "LDI",
        0xA1 => "CPI",
        0xA2 => "INI",
        0xA3 => "OUTI",
        0xA8 => "LDD",
        0xA9 => "CPD",
        0xAA => "IND",
        0xAB => "OUTD",
        0xB0 => "LDIR",
        0xB1 => "CPIR",
        0xB2 => "INIR",
        0xB3 => "OTIR",
        0xB8 => "LDDR",
        0xB9 => "CPDR",
        0xBA => "INDR",
        0xBB => "OTDR",
        _ => return None,
    };
    Some(text)
}

/// Text of a `CB` opcode.
fn cb_text(code: u8) -> String {
    let register = REGISTERS[(code & 0x07) as usize];
    let y = (code >> 3) & 0x07;
    match code >> 6 {
        0 => format!("{} {}", ROTATIONS[y as usize], register),
        1 => format!("BIT {},{}", y, register),
        2 => format!("RES {},{}", y, register),
        _ => format!("SET {},{}", y, register),
    }
}

/// Replace `HL`, `H`, `L` and `(HL)` by their index register counterparts.
fn index_text(text: &str, register: &str) -> String {
    let Some((mnemonic, operands)) = text.split_once(' ') else {
        return text.to_string();
    };
    let operands: Vec<&str> = operands.split(',').collect();
    if mnemonic == "EX" && operands[0] == "DE" {
        return text.to_string();
    }

    let is_jump = mnemonic == "JP";
    let has_memory = !is_jump && operands.contains(&"(HL)");
    let mapped: Vec<String> = operands
        .iter()
        .map(|operand| match *operand {
            "(HL)" if is_jump => format!("({})", register),
            "(HL)" => format!("({}{})", register, INDEX_PLACEHOLDER),
            "HL" => register.to_string(),
            "H" if !has_memory => format!("{}H", register),
            "L" if !has_memory => format!("{}L", register),
            other => other.to_string(),
        })
        .collect();
    format!("{} {}", mnemonic, mapped.join(","))
}

/// Turn a `CB` text into its `DDCB` / `FDCB` form.
///
/// `RLC (HL)` becomes `RLC (IX+d)`, `RLC B` becomes `RLC (IX+d),B`.
fn index_bit_text(text: &str, register: &str) -> String {
    let Some((mnemonic, operands)) = text.split_once(' ') else {
        return text.to_string();
    };
    let indexed = format!("({}{})", register, INDEX_PLACEHOLDER);
    let mut operands: Vec<String> = operands.split(',').map(str::to_string).collect();
    let last = operands.pop().unwrap_or_default();
    operands.push(indexed);
    if last != "(HL)" && mnemonic != "BIT" {
        operands.push(last);
    }
    format!("{} {}", mnemonic, operands.join(","))
}

/// Where the operand of an opcode is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand {
    None,
    /// Little endian word at the offset.
    Word(u8),
    /// Byte at the offset.
    Byte(u8),
    /// Relative jump distance at the offset.
    Relative(u8),
    /// Value encoded in the opcode itself (`RST`).
    Fixed(u16),
}

/// A decoding rule for one opcode.
#[derive(Debug, Clone)]
struct OpcodeEntry {
    template: String,
    length: u8,
    operand: Operand,
    /// Offset of the index displacement byte.
    index: Option<u8>,
    value_kind: NumberType,
    flags: OpcodeFlags,
    comment: Option<&'static str>,
}

impl OpcodeEntry {
    /// Build an entry from its text. `opcode_len` is the number of bytes in
    /// front of the operand (prefixes, opcode and index displacement).
    fn parse(code: u8, text: &str, opcode_len: u8) -> Self {
        let mut entry = Self {
            template: text.to_string(),
            length: opcode_len,
            operand: Operand::None,
            index: None,
            value_kind: NumberType::None,
            flags: OpcodeFlags::empty(),
            comment: None,
        };

        let conditional = |text: &str| {
            if text.contains(',') {
                OpcodeFlags::CONDITIONAL
            } else {
                OpcodeFlags::STOP
            }
        };

        if let Some(k) = text.find("#nn") {
            entry.length += 2;
            entry.operand = Operand::Word(opcode_len);
            entry.template = text.replacen("#nn", "#", 1);
            let indirect = k > 0 && text.as_bytes()[k - 1] == b'(';
            if indirect {
                entry.value_kind = NumberType::DataLbl;
            } else if text.starts_with("CALL") {
                entry.value_kind = NumberType::CodeSub;
                entry.flags |= OpcodeFlags::CALL | OpcodeFlags::BRANCH_ADDRESS;
                if text.contains(',') {
                    entry.flags |= OpcodeFlags::CONDITIONAL;
                }
            } else if text.starts_with("JP") {
                entry.value_kind = NumberType::CodeLbl;
                entry.flags |= OpcodeFlags::BRANCH_ADDRESS | conditional(text);
            } else if text.starts_with("LD SP,") {
                entry.value_kind = NumberType::DataLbl;
                entry.flags |= OpcodeFlags::LOAD_STACK_TOP;
                entry.comment = Some("top of stack");
            } else {
                entry.value_kind = NumberType::NumberWord;
            }
        } else if text.contains("#n") {
            entry.length += 1;
            entry.operand = Operand::Byte(opcode_len);
            entry.template = text.replacen("#n", "#", 1);
            entry.value_kind = NumberType::NumberByte;
            if text.starts_with("DJNZ") {
                entry.operand = Operand::Relative(opcode_len);
                entry.value_kind = NumberType::CodeLocalLbl;
                entry.flags |= OpcodeFlags::BRANCH_ADDRESS | OpcodeFlags::CONDITIONAL;
            } else if text.starts_with("JR") {
                entry.operand = Operand::Relative(opcode_len);
                entry.value_kind = NumberType::CodeLocalLbl;
                entry.flags |= OpcodeFlags::BRANCH_ADDRESS | conditional(text);
            } else if text.starts_with("IN") || text.starts_with("OUT") {
                entry.value_kind = NumberType::PortLbl;
            }
        } else if text.starts_with("RET") {
            entry.flags |= OpcodeFlags::RET;
            entry.flags |= if text.contains(' ') {
                OpcodeFlags::CONDITIONAL
            } else {
                OpcodeFlags::STOP
            };
        } else if text.starts_with("RST") {
            entry.operand = Operand::Fixed((code & 0x38) as u16);
            entry.value_kind = NumberType::CodeRst;
            entry.flags |= OpcodeFlags::BRANCH_ADDRESS | OpcodeFlags::CALL;
        } else if text.starts_with("JP") {
            // JP (HL), JP (IX), JP (IY): target unknown
            entry.flags |= OpcodeFlags::STOP;
        }

        if entry.template.contains(INDEX_PLACEHOLDER) {
            entry.index = Some(2);
        }
        entry
    }

    /// Fixed text without operand.
    fn fixed(length: u8, text: &str, comment: &'static str) -> Self {
        Self {
            template: text.to_string(),
            length,
            operand: Operand::None,
            index: None,
            value_kind: NumberType::None,
            flags: OpcodeFlags::empty(),
            comment: Some(comment),
        }
    }

    /// Read the operand bytes at `address` and produce the instruction.
    fn instantiate(&self, memory: &Memory, address: u16) -> Instruction {
        let at = |offset: u8| memory.value_at(address.wrapping_add(offset as u16));

        let mut value = match self.operand {
            Operand::None => None,
            Operand::Word(offset) => Some(memory.word_at(address.wrapping_add(offset as u16))),
            Operand::Byte(offset) => Some(at(offset) as u16),
            Operand::Relative(offset) => {
                let distance = at(offset) as i8 as i16 as u16;
                Some(
                    address
                        .wrapping_add(offset as u16 + 1)
                        .wrapping_add(distance),
                )
            }
            Operand::Fixed(value) => Some(value),
        };
        let mut value_kind = self.value_kind;
        let mut template = self.template.clone();

        if let Some(offset) = self.index {
            let displacement = at(offset) as i8;
            if value.is_some() {
                // LD (IX+d),n: the displacement is part of the text
                template = template.replacen(
                    INDEX_PLACEHOLDER,
                    &displacement_text(displacement),
                    1,
                );
            } else {
                template = template.replacen(INDEX_PLACEHOLDER, &OPERAND_PLACEHOLDER.to_string(), 1);
                value = Some(displacement as i16 as u16);
                value_kind = NumberType::RelativeIndex;
            }
        }

        Instruction {
            length: self.length,
            template,
            value,
            value_kind,
            flags: self.flags,
            comment: self.comment,
        }
    }
}

fn displacement_text(displacement: i8) -> String {
    if displacement >= 0 {
        format!("+{}", displacement)
    } else {
        displacement.to_string()
    }
}

/// Opcode pages of one index register.
#[derive(Debug, Clone)]
struct IndexPages {
    main: Vec<OpcodeEntry>,
    bit: Vec<OpcodeEntry>,
}

impl IndexPages {
    fn new(register: &str) -> Self {
        let main = (0..=255u8)
            .map(|code| {
                let text = index_text(MAIN_OPCODES[code as usize], register);
                let opcode_len = if text.contains(INDEX_PLACEHOLDER) { 3 } else { 2 };
                OpcodeEntry::parse(code, &text, opcode_len)
            })
            .collect();
        let bit = (0..=255u8)
            .map(|code| OpcodeEntry::parse(code, &index_bit_text(&cb_text(code), register), 4))
            .collect();
        Self { main, bit }
    }
}

/// Decoder for the documented and the common undocumented Z80 instructions.
#[derive(Debug, Clone)]
pub struct Z80Decoder {
    main: Vec<OpcodeEntry>,
    cb: Vec<OpcodeEntry>,
    ed: Vec<OpcodeEntry>,
    ix: IndexPages,
    iy: IndexPages,
}

impl Default for Z80Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Z80Decoder {
    /// Build all opcode pages.
    pub fn new() -> Self {
        let main = (0..=255u8)
            .map(|code| OpcodeEntry::parse(code, MAIN_OPCODES[code as usize], 1))
            .collect();
        let cb = (0..=255u8)
            .map(|code| OpcodeEntry::parse(code, &cb_text(code), 2))
            .collect();
        let ed = (0..=255u8)
            .map(|code| match ed_text(code) {
                Some(text) => OpcodeEntry::parse(code, text, 2),
                None => OpcodeEntry::fixed(2, "INVALID INSTRUCTION", "mostly equivalent to NOP."),
            })
            .collect();

        Self {
            main,
            cb,
            ed,
            ix: IndexPages::new("IX"),
            iy: IndexPages::new("IY"),
        }
    }

    /// An index prefix followed by another prefix acts like a `NOP`.
    fn prefix_nop(next: u8) -> Instruction {
        let comment = match next {
            0xDD => "because of following 0xDD",
            0xED => "because of following 0xED",
            _ => "because of following 0xFD",
        };
        Instruction {
            comment: Some(comment),
            ..Instruction::simple(1, "[NOP]")
        }
    }
}

impl Decoder for Z80Decoder {
    fn decode(&self, memory: &Memory, address: u16) -> Instruction {
        let byte = |offset: u16| memory.value_at(address.wrapping_add(offset)) as usize;

        let entry = match byte(0) {
            0xCB => &self.cb[byte(1)],
            0xED => &self.ed[byte(1)],
            prefix @ (0xDD | 0xFD) => {
                let pages = if prefix == 0xDD { &self.ix } else { &self.iy };
                match byte(1) {
                    0xCB => &pages.bit[byte(3)],
                    next @ (0xDD | 0xED | 0xFD) => return Self::prefix_nop(next as u8),
                    next => &pages.main[next],
                }
            }
            opcode => &self.main[opcode],
        };
        entry.instantiate(memory, address)
    }
}
