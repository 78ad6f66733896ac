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

//! Label collection.
//!
//! This module walks the decoder over memory starting at the queued
//! addresses:
//! - Marks decoded bytes as `CODE` / `CODE_FIRST`
//! - Creates or promotes labels at branch and data targets
//! - Queues branch targets that were not decoded yet
//! - Adds the labels that only follow from the memory layout
//!   (address 0, snapshot start, interrupts, `BIN_START_...`)

use super::{next_address, Disassembler};
use crate::comment::Comment;
use crate::decoder::{Instruction, OpcodeFlags};
use crate::error::WarningKind;
use crate::format::hex4;
use crate::memory::MemAttribute;
use crate::numbertype::NumberType;

/// Extension trait for collecting labels.
pub trait LabelCollector {
    /// Queue address 0 (or the snapshot start) if enabled.
    fn add_automatic_addresses(&mut self);

    /// Drain the address queue, decoding every reachable instruction.
    fn collect_labels(&mut self);

    /// Create labels for the branch or data target of one instruction.
    fn disassemble_for_label(&mut self, address: u16, instruction: &Instruction);

    /// Create a label or promote an existing one and add references.
    fn set_found_label(&mut self, address: u16, references: &[u16], label_type: NumberType);

    /// Name code entries that nothing jumps to, e.g. interrupt routines.
    fn find_interrupt_labels(&mut self);

    /// Add the snapshot start label and `BIN_START_...` labels.
    fn set_special_labels(&mut self);
}

impl LabelCollector for Disassembler {
    fn add_automatic_addresses(&mut self) {
        if !self.config.automatic_addresses {
            return;
        }

        if let Some(start) = self.sna_start {
            self.address_queue.push_back(start);
            return;
        }

        if !self.memory.is_assigned(0) {
            return;
        }
        match self.labels.at_mut(0) {
            Some(label) => label.label_type = NumberType::CodeLbl,
            None => self.set_fixed_code_label(0, Some("ORG_0000")),
        }
        self.address_queue.push_back(0);
    }

    fn collect_labels(&mut self) {
        while let Some(start) = self.address_queue.pop_front() {
            let mut address = start;
            loop {
                let attr = self.attribute_at(address);
                if attr.contains(MemAttribute::CODE) {
                    break;
                }
                if !attr.contains(MemAttribute::ASSIGNED) {
                    self.warn_unassigned(address);
                    break;
                }

                let instruction = self.decode(address);
                log::trace!("{}\t{}", hex4(address), instruction.mnemonic());

                let length = instruction.length.max(1);
                // operand bytes cut off by the end of the image
                let missing = (1..length as u16)
                    .map(|offset| address.wrapping_add(offset))
                    .find(|addr| !self.memory.is_assigned(*addr));
                if let Some(missing_address) = missing {
                    self.warn_unassigned(missing_address);
                    break;
                }

                let overlap = (1..length as u16)
                    .map(|offset| address.wrapping_add(offset))
                    .find(|addr| self.attribute_at(*addr).contains(MemAttribute::CODE));
                if let Some(other_address) = overlap {
                    let other = self.decode(other_address);
                    self.warn(
                        WarningKind::AmbiguousDisassembly,
                        Some(address),
                        format!(
                            "Aborting disassembly: Ambiguous disassembly: Trying to disassemble opcode \"{}\" at address 0x{:x} but address 0x{:x} already contains opcode \"{}\".",
                            instruction.mnemonic(),
                            address,
                            other_address,
                            other.mnemonic()
                        ),
                    );
                    break;
                }

                self.memory
                    .add_attribute_at(address, 1, MemAttribute::CODE_FIRST);
                self.memory
                    .add_attribute_at(address, length as usize, MemAttribute::CODE);

                self.disassemble_for_label(address, &instruction);

                if instruction.has(OpcodeFlags::STOP) {
                    break;
                }
                match next_address(address, length) {
                    Some(next) => address = next,
                    None => break,
                }
            }
        }
    }

    fn disassemble_for_label(&mut self, address: u16, instruction: &Instruction) {
        if let Some(target) = instruction.branch_target() {
            let attr = self.attribute_at(target);

            let label_type = match instruction.value_kind {
                // a relative jump backwards is a loop
                NumberType::CodeLocalLbl if target <= address => NumberType::CodeLocalLoop,
                // a jump out of the image is treated like a call
                NumberType::CodeLbl if !attr.contains(MemAttribute::ASSIGNED) => {
                    NumberType::CodeSub
                }
                other => other,
            };

            self.set_found_label(target, &[address], label_type);

            let follow = label_type != NumberType::CodeRst || !self.config.is_rst_denied(target);
            if !attr.contains(MemAttribute::CODE) && attr.contains(MemAttribute::ASSIGNED) && follow
            {
                self.address_queue.push_back(target);
            }
        } else if instruction.value_kind == NumberType::DataLbl {
            let Some(mut target) = instruction.value else {
                return;
            };

            if instruction.has(OpcodeFlags::LOAD_STACK_TOP) {
                // show the last element pushed instead of the stack top
                let offset = -2;
                self.offset_labels.insert(target, offset);
                target = target.wrapping_sub(2);
                self.comments.entry(target).or_insert_with(|| {
                    let mut comment = Comment::new();
                    comment.add_before("; Last element of stack:");
                    comment
                });
            }

            self.set_found_label(target, &[address], NumberType::DataLbl);
        }
    }

    fn set_found_label(&mut self, address: u16, references: &[u16], label_type: NumberType) {
        let id = match self.labels.id_at(address) {
            Some(id) => {
                let label = &mut self.labels[id];
                if label.label_type < label_type {
                    log::trace!(
                        "Promoting {}h from {} to {}",
                        hex4(address),
                        label.label_type,
                        label_type
                    );
                    label.label_type = label_type;
                }
                id
            }
            None => {
                let id = self.labels.insert(address, label_type);
                if !self.memory.is_assigned(address) {
                    self.labels[id].is_equ = true;
                }
                id
            }
        };

        let label = &mut self.labels[id];
        label.references.extend(
            references
                .iter()
                .copied()
                .filter(|reference| *reference != address),
        );
    }

    fn find_interrupt_labels(&mut self) {
        let mut found = Vec::new();
        let mut prev_attr = MemAttribute::UNUSED;
        let mut prev_code_address: Option<u16> = None;

        for address in 0..=u16::MAX {
            let attr = self.attribute_at(address);

            let is_entry = Some(address) != self.sna_start
                && attr.contains(MemAttribute::CODE_FIRST | MemAttribute::ASSIGNED)
                && self.labels.at(address).is_none();
            if is_entry {
                let after_non_code = !prev_attr.contains(MemAttribute::ASSIGNED)
                    || !prev_attr.contains(MemAttribute::CODE);
                let after_stop = prev_code_address
                    .is_some_and(|prev| self.decode(prev).has(OpcodeFlags::STOP));
                if after_non_code || after_stop {
                    let prefix = self.config.prefixes.interrupt.clone();
                    self.set_fixed_code_label(address, Some(&prefix));
                    found.push(address);
                }
            }

            prev_attr = attr;
            if !attr.contains(MemAttribute::CODE) {
                prev_code_address = None;
            }
            if attr.contains(MemAttribute::CODE_FIRST) {
                prev_code_address = Some(address);
            }
        }

        if found.len() > 1 {
            for (index, address) in found.iter().enumerate() {
                if let Some(label) = self.labels.at_mut(*address) {
                    if let Some(name) = label.name.as_mut() {
                        name.push_str(&(index + 1).to_string());
                    }
                }
            }
        }
        log::debug!("Found {} interrupt entries", found.len());
    }

    fn set_special_labels(&mut self) {
        if self.config.automatic_addresses {
            if let Some(start) = self.sna_start {
                if self.labels.at(start).is_none() {
                    let name = format!("SNA_LBL_MAIN_START_{:X}", start);
                    self.set_label(start, Some(&name), NumberType::CodeLbl);
                }
            }
        }

        let mut prev_attr = MemAttribute::UNUSED;
        for address in 0..=u16::MAX {
            let attr = self.attribute_at(address);
            let became_assigned = !prev_attr.contains(MemAttribute::ASSIGNED)
                && attr.contains(MemAttribute::ASSIGNED);
            if became_assigned && self.labels.at(address).is_none() {
                let name = format!("BIN_START_{}", hex4(address));
                self.set_label(address, Some(&name), NumberType::DataLbl);
            }
            prev_attr = attr;
        }
    }
}

impl Disassembler {
    fn warn_unassigned(&mut self, address: u16) {
        if !self.config.no_warning_unassigned_memory {
            self.warn(
                WarningKind::UnassignedMemory,
                Some(address),
                format!(
                    "Trying to disassemble unassigned memory area at 0x{:x}.",
                    address
                ),
            );
        }
    }
}
