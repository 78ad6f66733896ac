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

//! Rendering of the assembler listing.
//!
//! The listing consists of:
//! - An `EQU` block for labels outside of the memory image
//! - One `ORG` block per coherent area of assigned memory
//! - Label lines with their comments, then one line per instruction or
//!   `DEFB` byte

use super::comments::{is_main_label, LabelComments};
use super::Disassembler;
use crate::comment::Comment;
use crate::decoder::Instruction;
use crate::format::{
    add_spaces, address_conversion, byte_conversions, fill_digits, format_disassembly, hex2,
    hex4, word_conversions,
};
use crate::memory::MemAttribute;
use crate::numbertype::NumberType;

/// Marker written after a block that is followed by unassigned memory.
const GAP_MARKER: &str = "; ...";

/// Extension trait for the listing.
pub trait ListingRenderer {
    /// Render all non-EQU labels and the memory behind them.
    fn disassemble_memory(&self) -> Vec<String>;

    /// Render the `EQU` block.
    fn equ_labels_disassembly(&self) -> Vec<String>;

    /// All main labels with their comments, one per line.
    fn main_labels(&self) -> String;

    /// Instruction text with label names for the operand, and the comment
    /// for it.
    ///
    /// With `check_memory` the comment warns about operands that branch
    /// into the middle of an instruction or access code as data.
    fn instruction_text(&self, instruction: &Instruction, check_memory: bool) -> (String, String);
}

impl ListingRenderer for Disassembler {
    fn disassemble_memory(&self) -> Vec<String> {
        let disable = self.config.disable_comments;
        let columns = self.config.columns;
        let mut lines = Vec::new();
        let mut spacer = BlockSpacer::new(self.config.lines_between_blocks);
        let mut current: Option<u32> = None;

        for label in self.labels.iter() {
            if label.is_equ {
                continue;
            }
            let start = label.address as u32;
            if current.is_some_and(|address| start < address) {
                // already part of a rendered block
                continue;
            }

            spacer.add(&mut lines);
            let mut org = format!(
                "{}{}{}h",
                " ".repeat(columns.bytes),
                self.right_case("ORG "),
                hex4(label.address)
            );
            if !disable {
                org.push_str(&format!("; {}", address_conversion(label.address)));
            }
            lines.push(org);

            let mut address = start;
            let mut prev_attr = MemAttribute::DATA;
            let mut prev_parent = None;
            while address < 0x10000 {
                let addr = address as u16;
                let mut attr = self.attribute_at(addr);
                if !attr.contains(MemAttribute::ASSIGNED) {
                    break;
                }

                spacer.reset();
                let parent = self.address_parents[addr as usize];
                if parent != prev_parent {
                    spacer.add(&mut lines);
                    prev_parent = parent;
                }

                let addr_label = self.labels.at(addr);
                let comment = self.comments.get(&addr);
                if let Some(addr_label) = addr_label {
                    if is_main_label(addr_label.label_type) {
                        spacer.add(&mut lines);
                    }
                    let mut statement = format!("{}:", addr_label.name_or_empty());
                    if columns.address > 0 {
                        statement = format!("{}{}", add_spaces(&hex4(addr), columns.address), statement);
                    }
                    lines.extend(Comment::lines(comment, &statement, disable));
                }

                let (mut line, comment_text, size) = if attr.contains(MemAttribute::CODE) {
                    let instruction = self.decode(addr);
                    let (text, comment_text) = self.instruction_text(&instruction, true);
                    let size = instruction.length.max(1) as usize;
                    (self.listing_line(addr, size, &text), comment_text, size)
                } else {
                    if !prev_attr.contains(MemAttribute::DATA) {
                        spacer.add(&mut lines);
                    }
                    attr |= MemAttribute::DATA;
                    let value = self.memory.value_at(addr);
                    let text = format!("{}{}h", self.right_case("DEFB "), hex2(value));
                    (self.listing_line(addr, 1, &text), byte_conversions(value), 1)
                };

                if comment.is_none() || addr_label.is_some() {
                    if !disable && !comment_text.is_empty() {
                        line.push_str("\t; ");
                        line.push_str(&comment_text);
                    }
                    lines.push(line);
                } else {
                    lines.extend(Comment::lines(comment, &line, disable));
                }

                address += size as u32;
                if address < 0x10000 && !disable && !self.memory.is_assigned(address as u16) {
                    lines.extend(std::iter::repeat(GAP_MARKER.to_string()).take(3));
                }
                prev_attr = attr;
            }
            current = Some(address);
        }

        lines
    }

    fn equ_labels_disassembly(&self) -> Vec<String> {
        let disable = self.config.disable_comments;
        let mut lines = Vec::new();
        let mut first = true;

        for label in self.labels.iter().filter(|label| label.is_equ) {
            if first {
                if !disable {
                    lines.push("; EQU:".to_string());
                    lines.push(
                        "; Data addresses used by the opcodes that point to uninitialized memory areas."
                            .to_string(),
                    );
                }
                first = false;
            }

            let statement = format!(
                "{} {}{}h",
                add_spaces(
                    &format!("{}:", label.name_or_empty()),
                    self.config.columns.bytes.saturating_sub(1)
                ),
                self.right_case("EQU "),
                fill_digits(&hex4(label.address), ' ', 5)
            );
            lines.extend(Comment::lines(self.comments.get(&label.address), &statement, disable));
        }

        lines
    }

    fn main_labels(&self) -> String {
        let mut text = String::new();
        for label in self.labels.iter().filter(|label| is_main_label(label.label_type)) {
            let statement = format!("{}\t{}", hex4(label.address), label.name_or_empty());
            let comment = self.address_comment(label.address);
            let lines = Comment::lines(comment.as_ref(), &statement, self.config.disable_comments);
            text.push_str(&lines.join("\n"));
            text.push_str("\n\n");
        }
        text
    }

    fn instruction_text(&self, instruction: &Instruction, check_memory: bool) -> (String, String) {
        let lower = self.config.opcodes_lower_case;
        let Some(value) = instruction.value else {
            let comment = instruction.comment.unwrap_or_default().to_string();
            return (instruction.render(lower, ""), comment);
        };

        let (operand, mut comment) = match instruction.value_kind {
            NumberType::CodeLbl
            | NumberType::CodeLocalLbl
            | NumberType::CodeLocalLoop
            | NumberType::CodeSub => {
                let mut comment = address_conversion(value);
                if check_memory {
                    let attr = self.attribute_at(value);
                    if attr.contains(MemAttribute::ASSIGNED) && !attr.contains(MemAttribute::CODE_FIRST) {
                        comment.push_str(", WARNING: Branches into the middle of an opcode!");
                    }
                }
                (self.operand_label(value), comment)
            }
            NumberType::DataLbl => {
                let mut comment = address_conversion(value);
                if check_memory {
                    let attr = self.attribute_at(value);
                    if attr.contains(MemAttribute::ASSIGNED) && attr.contains(MemAttribute::CODE) {
                        comment.push_str(", WARNING: Instruction accesses code!");
                    }
                }
                (self.operand_label(value), comment)
            }
            NumberType::RelativeIndex | NumberType::CodeRst => (instruction.raw_operand(), String::new()),
            NumberType::NumberByte | NumberType::PortLbl => {
                (instruction.raw_operand(), byte_conversions(value as u8))
            }
            _ => (instruction.raw_operand(), word_conversions(value)),
        };

        if let Some(fixed) = instruction.comment {
            if !comment.is_empty() {
                comment.push_str(", ");
            }
            comment.push_str(fixed);
        }

        (instruction.render(lower, &operand), comment)
    }
}

impl Disassembler {
    /// Name for an address operand, a neighbour label plus displacement or
    /// plain hex.
    fn operand_label(&self, value: u16) -> String {
        if let Some(name) = self.labels.at(value).and_then(|label| label.name.as_ref()) {
            return name.clone();
        }

        let offset = self.offset_labels.get(&value).copied().unwrap_or(0);
        if offset != 0 {
            let base = (value as i32 + offset) as u16;
            if let Some(name) = self.labels.at(base).and_then(|label| label.name.as_ref()) {
                let displacement = if offset < 0 {
                    format!("+{}", -offset)
                } else {
                    format!("-{}", offset)
                };
                return format!("{}{}", name, displacement);
            }
        }

        format!("{}h", hex4(value))
    }

    fn listing_line(&self, address: u16, size: usize, text: &str) -> String {
        let memory = self.config.add_opcode_bytes.then_some(&self.memory);
        format_disassembly(memory, &self.config.columns, address, size, text)
    }

    fn right_case(&self, text: &str) -> String {
        if self.config.opcodes_lower_case {
            text.to_lowercase()
        } else {
            text.to_string()
        }
    }
}

/// Writes the empty lines between blocks at most once until reset.
struct BlockSpacer {
    count: usize,
    written: bool,
}

impl BlockSpacer {
    fn new(count: usize) -> Self {
        Self {
            count,
            written: false,
        }
    }

    fn add(&mut self, lines: &mut Vec<String>) {
        if self.written {
            return;
        }
        lines.extend(std::iter::repeat(String::new()).take(self.count));
        self.written = true;
    }

    fn reset(&mut self) {
        self.written = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disasm::FlowAnalyzer;
    use crate::disasm::{LabelCollector, LabelNamer};
    use pretty_assertions::assert_eq;

    fn disassembled(bytes: &[u8], disable_comments: bool) -> Disassembler {
        let mut disasm = Disassembler::new();
        disasm.config.disable_comments = disable_comments;
        disasm.set_memory(0x8000, bytes);
        disasm.set_label(0x8000, Some("MAIN"), NumberType::CodeSub);
        disasm.disassemble();
        disasm
    }

    #[test]
    fn test_plain_listing() {
        // LD A,01h / RET
        let mut disasm = disassembled(&[0x3e, 0x01, 0xc9], true);

        assert_eq!(
            disasm.disassembly_lines(),
            vec![
                "             org 8000h",
                "",
                "",
                "8000 MAIN:",
                "8000 3E 01        ld   a,01h  ",
                "8002 C9           ret         ",
            ]
        );
    }

    #[test]
    fn test_call_operand_uses_label_name() {
        // CALL 8004h / RET / RET
        let mut disasm = disassembled(&[0xcd, 0x04, 0x80, 0xc9, 0xc9], false);
        let lines = disasm.disassembly_lines();

        assert!(lines
            .iter()
            .any(|line| line.starts_with("8000 CD 04 80     call SUB1") && line.ends_with("\t; 8004h")));
        assert!(lines.contains(&"8004 SUB1:".to_string()));
        assert_eq!(&lines[lines.len() - 3..], [GAP_MARKER, GAP_MARKER, GAP_MARKER]);
    }

    #[test]
    fn test_equ_block() {
        // LD A,(9000h) / RET
        let mut disasm = disassembled(&[0x3a, 0x00, 0x90, 0xc9], false);
        let lines = disasm.disassembly_lines();

        assert_eq!(lines[0], "; EQU:");
        assert!(lines[2].starts_with("DATA1:       equ  9000h"));
        assert!(lines[2].ends_with("; 36864. Data accessed by: 8000h(in MAIN)"));
    }

    #[test]
    fn test_data_bytes_after_code() {
        // RET / then bytes never reached
        let mut disasm = disassembled(&[0xc9, 0x41], false);
        let lines = disasm.disassembly_lines();

        assert!(lines
            .iter()
            .any(|line| line.starts_with("8001 41           defb 41h") && line.ends_with("\t; 65, 'A'")));
    }

    #[test]
    fn test_operand_next_to_moved_label() {
        // 8000: LD A,(8004h) / 8003: LD B,00h / 8005: RET
        let mut disasm = Disassembler::new();
        disasm.set_memory(0x8000, &[0x3a, 0x04, 0x80, 0x06, 0x00, 0xc9]);
        disasm.set_label(0x8000, None, NumberType::CodeLbl);
        disasm.collect_labels();
        disasm.adjust_code_pointing_labels();
        disasm.assign_label_names();

        let instruction = disasm.decode(0x8000);
        let (text, comment) = disasm.instruction_text(&instruction, true);
        assert_eq!(text, "ld a,(SELF_MOD1+1)");
        assert_eq!(comment, "8004h, WARNING: Instruction accesses code!");
    }

    #[test]
    fn test_upper_case_listing() {
        let mut disasm = Disassembler::new();
        disasm.config.opcodes_lower_case = false;
        disasm.config.disable_comments = true;
        disasm.set_memory(0x8000, &[0xc9]);
        disasm.set_label(0x8000, Some("MAIN"), NumberType::CodeSub);
        disasm.disassemble();

        let lines = disasm.disassembly_lines();
        assert_eq!(lines[0], "             ORG 8000h");
        assert_eq!(lines.last().map(String::as_str), Some("8000 C9           RET         "));
    }

    #[test]
    fn test_main_labels() {
        let disasm = disassembled(&[0xcd, 0x04, 0x80, 0xc9, 0xc9], true);
        assert_eq!(disasm.main_labels(), "8000\tMAIN\n\n8004\tSUB1\n\n");
    }
}
