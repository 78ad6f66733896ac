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

//! Instruction decoding.
//!
//! The classification engine never looks at opcode bytes itself. It asks a
//! [`Decoder`] for one [`Instruction`] at a time and only uses:
//! - the length
//! - the operand value and its [`NumberType`]
//! - the [`OpcodeFlags`]
//!
//! The text of an instruction is a template with at most one `#` standing
//! for the operand, so the renderer can put a label name in its place.

pub mod z80;

pub use z80::Z80Decoder;

use crate::format::{hex2, hex4};
use crate::memory::Memory;
use crate::numbertype::NumberType;
use bitflags::bitflags;

/// Placeholder for the operand inside an instruction template.
pub const OPERAND_PLACEHOLDER: char = '#';

bitflags! {
    /// Control flow facts about an instruction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpcodeFlags: u8 {
        /// The value is a branch target (`JP`, `JR`, `CALL`, `DJNZ`, `RST`).
        const BRANCH_ADDRESS = 0x01;
        /// A subroutine call (`CALL`, `RST`).
        const CALL = 0x02;
        /// Execution does not continue with the next instruction.
        const STOP = 0x04;
        /// A return from a subroutine.
        const RET = 0x08;
        /// Depends on a condition (`JP NZ`, `RET Z`, `DJNZ` ...).
        const CONDITIONAL = 0x10;
        /// The value is loaded into the stack pointer.
        const LOAD_STACK_TOP = 0x20;
    }
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Number of bytes including prefixes and operands.
    pub length: u8,
    /// Upper case text with [`OPERAND_PLACEHOLDER`] for the operand.
    pub template: String,
    /// The operand. Relative jumps are already absolute, index
    /// displacements are stored sign extended.
    pub value: Option<u16>,
    pub value_kind: NumberType,
    pub flags: OpcodeFlags,
    /// Fixed remark, e.g. `top of stack`.
    pub comment: Option<&'static str>,
}

impl Instruction {
    /// An instruction without operand.
    pub fn simple(length: u8, template: impl Into<String>) -> Self {
        Self {
            length,
            template: template.into(),
            value: None,
            value_kind: NumberType::None,
            flags: OpcodeFlags::empty(),
            comment: None,
        }
    }

    /// Check a flag.
    pub fn has(&self, flag: OpcodeFlags) -> bool {
        self.flags.contains(flag)
    }

    /// The branch target, if this instruction has one.
    pub fn branch_target(&self) -> Option<u16> {
        if self.has(OpcodeFlags::BRANCH_ADDRESS) {
            self.value
        } else {
            None
        }
    }

    /// Text of the operand as plain number.
    pub fn raw_operand(&self) -> String {
        let Some(value) = self.value else {
            return String::new();
        };
        match self.value_kind {
            NumberType::RelativeIndex => {
                let displacement = value as i16;
                if displacement >= 0 {
                    format!("+{}", displacement)
                } else {
                    displacement.to_string()
                }
            }
            NumberType::CodeRst | NumberType::NumberByte | NumberType::PortLbl => {
                format!("{}h", hex2(value as u8))
            }
            _ => format!("{}h", hex4(value)),
        }
    }

    /// Render the template with `operand` in place of the placeholder.
    pub fn render(&self, lower_case: bool, operand: &str) -> String {
        let text = if lower_case {
            self.template.to_lowercase()
        } else {
            self.template.clone()
        };
        text.replacen(OPERAND_PLACEHOLDER, operand, 1)
    }

    /// Upper case mnemonic with plain hex operand, e.g. `LD A,(8000h)`.
    pub fn mnemonic(&self) -> String {
        self.render(false, &self.raw_operand())
    }
}

/// Decodes the instruction at an address.
pub trait Decoder {
    /// Decode one instruction. Never fails: unknown byte sequences decode
    /// to a placeholder instruction.
    fn decode(&self, memory: &Memory, address: u16) -> Instruction;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_value(template: &str, value: u16, kind: NumberType) -> Instruction {
        Instruction {
            value: Some(value),
            value_kind: kind,
            ..Instruction::simple(3, template)
        }
    }

    #[test]
    fn test_mnemonic() {
        let instruction = with_value("LD A,(#)", 0x8000, NumberType::DataLbl);
        assert_eq!(instruction.mnemonic(), "LD A,(8000h)");
    }

    #[test]
    fn test_render_lower_case_keeps_operand() {
        let instruction = with_value("CALL #", 0x8000, NumberType::CodeSub);
        assert_eq!(instruction.render(true, "PRINT_TEXT"), "call PRINT_TEXT");
    }

    #[test]
    fn test_relative_index() {
        let instruction = with_value("LD A,(IX#)", (-3i16) as u16, NumberType::RelativeIndex);
        assert_eq!(instruction.mnemonic(), "LD A,(IX-3)");
        let instruction = with_value("LD A,(IX#)", 5, NumberType::RelativeIndex);
        assert_eq!(instruction.mnemonic(), "LD A,(IX+5)");
    }

    #[test]
    fn test_branch_target() {
        let mut instruction = with_value("JP #", 0x1234, NumberType::CodeLbl);
        assert_eq!(instruction.branch_target(), None);
        instruction.flags = OpcodeFlags::BRANCH_ADDRESS | OpcodeFlags::STOP;
        assert_eq!(instruction.branch_target(), Some(0x1234));
    }
}
