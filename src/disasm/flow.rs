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

//! Passes that refine labels after collection:
//! - Labels pointing into an instruction move to its first byte
//! - Code falling into a label counts as a reference
//! - Jump labels that reach a return become subroutines

use super::collect::LabelCollector;
use super::{next_address, Disassembler};
use crate::decoder::OpcodeFlags;
use crate::format::hex4;
use crate::label::LabelId;
use crate::memory::MemAttribute;
use crate::numbertype::NumberType;
use std::collections::HashSet;

/// Longest Z80 instruction minus one.
const MAX_INSTRUCTION_OFFSET: u16 = 4;

/// Extension trait for flow refinement passes.
pub trait FlowAnalyzer {
    /// Move labels that point into the middle of an instruction.
    fn adjust_code_pointing_labels(&mut self);

    /// Add references for code that flows into the next label.
    fn add_flow_through_references(&mut self);

    /// Walk straight on from `address` until a `LBL`/`SUB` label.
    ///
    /// Returns the label and the address of the instruction in front of it.
    fn find_next_flow_through_label(&self, address: u16) -> Option<(LabelId, u16)>;

    /// Promote `LBL` labels to `SUB` if a return is reachable.
    fn turn_lbl_into_sub(&mut self);

    /// Check if a return (or a subroutine) is reachable without calls.
    fn find_ret(&self, address: u16) -> bool;
}

impl FlowAnalyzer for Disassembler {
    fn adjust_code_pointing_labels(&mut self) {
        let to_move: Vec<LabelId> = self
            .labels
            .iter()
            .filter(|label| {
                matches!(
                    label.label_type,
                    NumberType::CodeLbl
                        | NumberType::CodeLocalLbl
                        | NumberType::CodeLocalLoop
                        | NumberType::CodeRst
                        | NumberType::CodeSub
                        | NumberType::DataLbl
                )
            })
            .filter(|label| {
                let attr = self.attribute_at(label.address);
                attr.contains(MemAttribute::CODE) && !attr.contains(MemAttribute::CODE_FIRST)
            })
            .map(|label| label.id)
            .collect();

        for id in to_move {
            let address = self.labels[id].address;
            let start = (1..=MAX_INSTRUCTION_OFFSET)
                .map(|offset| address.wrapping_sub(offset))
                .find(|addr| self.attribute_at(*addr).contains(MemAttribute::CODE_FIRST));
            let Some(start) = start else {
                continue;
            };

            let references: Vec<u16> = self.labels[id].references.iter().copied().collect();
            let label_type = self.labels[id].label_type;
            self.set_found_label(start, &references, label_type);
            self.labels.remove(address);
            self.offset_labels
                .insert(address, start as i32 - address as i32);
            log::debug!("Moved label {}h to {}h", hex4(address), hex4(start));
        }
    }

    fn add_flow_through_references(&mut self) {
        for id in self.labels.ids() {
            let label = &self.labels[id];
            if !label.label_type.is_top_level() {
                continue;
            }
            if let Some((found, reference)) = self.find_next_flow_through_label(label.address) {
                if found != id {
                    self.labels[found].references.insert(reference);
                }
            }
        }
    }

    fn find_next_flow_through_label(&self, address: u16) -> Option<(LabelId, u16)> {
        if !self.memory.is_assigned(address) {
            return None;
        }

        let mut address = address;
        let mut instruction = self.decode(address);
        while !instruction.has(OpcodeFlags::STOP) {
            let prev = address;
            address = next_address(address, instruction.length)?;

            if let Some(label) = self.labels.at(address) {
                if matches!(label.label_type, NumberType::CodeLbl | NumberType::CodeSub) {
                    return Some((label.id, prev));
                }
            }

            if !self.memory.is_assigned(address) {
                return None;
            }
            instruction = self.decode(address);
        }
        None
    }

    fn turn_lbl_into_sub(&mut self) {
        for id in self.labels.ids() {
            let label = &self.labels[id];
            if label.label_type != NumberType::CodeLbl {
                continue;
            }
            if self.find_ret(label.address) {
                log::debug!("Turned {}h into a subroutine", hex4(label.address));
                self.labels[id].label_type = NumberType::CodeSub;
            }
        }
    }

    fn find_ret(&self, address: u16) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![address];

        while let Some(start) = stack.pop() {
            let mut address = start;
            loop {
                if !self.memory.is_assigned(address) || visited.contains(&address) {
                    break;
                }
                if self
                    .labels
                    .type_at(address)
                    .is_some_and(NumberType::is_subroutine)
                {
                    return true;
                }

                let instruction = self.decode(address);
                if instruction.has(OpcodeFlags::RET) {
                    return true;
                }
                visited.insert(address);

                if !instruction.has(OpcodeFlags::CALL) {
                    if let Some(target) = instruction.branch_target() {
                        stack.push(target);
                    }
                }

                if instruction.has(OpcodeFlags::STOP) {
                    break;
                }
                match next_address(address, instruction.length) {
                    Some(next) => address = next,
                    None => break,
                }
            }
        }
        false
    }
}
