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

//! Subroutine structure: local labels, parents and call lists.

use super::{next_address, Disassembler, DOT_WARNING_MARK};
use crate::decoder::OpcodeFlags;
use crate::error::WarningKind;
use crate::format::hex4;
use crate::label::LabelId;
use crate::numbertype::NumberType;
use std::collections::{BTreeSet, HashSet};

/// Distance up to which a label referenced from behind counts as a loop.
const LOOP_DISTANCE: u16 = 128;

/// Extension trait for subroutine analysis.
pub trait SubroutineAnalyzer {
    /// Demote labels only referenced from inside a subroutine to local
    /// labels or loops.
    fn find_local_labels_in_subroutines(&mut self);

    /// The coherent block of addresses of the subroutine at `address`.
    ///
    /// All instruction addresses reachable without calls are collected, then
    /// only the gap-free run starting at `address` is kept.
    fn subroutine_addresses(&self, address: u16) -> Vec<u16>;

    /// Assign every address to its owning top-level label and drop
    /// references a label gets from its own body.
    fn add_parent_references(&mut self);

    /// Mark everything reachable from `address` as owned by `parent`.
    fn set_subroutine_parent(&mut self, address: u16, parent: LabelId);

    /// Fill the `calls` list of every label that references a subroutine.
    fn add_calls_list_to_labels(&mut self);
}

impl SubroutineAnalyzer for Disassembler {
    fn find_local_labels_in_subroutines(&mut self) {
        for id in self.labels.ids() {
            let start = self.labels[id].address;
            if !self.labels[id].label_type.is_top_level() {
                continue;
            }

            let block = self.subroutine_addresses(start);
            let members: HashSet<u16> = block.iter().copied().collect();

            for address in block.iter().copied().filter(|addr| *addr != start) {
                let Some(label) = self.labels.at_mut(address) else {
                    continue;
                };
                if !matches!(label.label_type, NumberType::CodeLbl | NumberType::CodeSub) {
                    continue;
                }
                if label.is_fixed {
                    continue;
                }
                if label.references.iter().any(|r| !members.contains(r)) {
                    continue;
                }

                let is_loop = label
                    .references
                    .iter()
                    .any(|r| r.checked_sub(address).is_some_and(|d| d <= LOOP_DISTANCE));
                label.label_type = if is_loop {
                    NumberType::CodeLocalLoop
                } else {
                    NumberType::CodeLocalLbl
                };
                log::trace!("{}h is local to {}h", hex4(address), hex4(start));
            }
        }
    }

    fn subroutine_addresses(&self, address: u16) -> Vec<u16> {
        let mut found = BTreeSet::new();
        let mut stack = vec![address];

        while let Some(branch) = stack.pop() {
            let mut addr = branch;
            loop {
                if !self.memory.is_assigned(addr) || found.contains(&addr) {
                    break;
                }
                let instruction = self.decode(addr);
                found.insert(addr);

                if !instruction.has(OpcodeFlags::CALL) {
                    if let Some(target) = instruction.branch_target() {
                        stack.push(target);
                    }
                }

                if instruction.has(OpcodeFlags::STOP) {
                    break;
                }
                match next_address(addr, instruction.length) {
                    Some(next) => addr = next,
                    None => break,
                }
            }
        }

        let mut block = Vec::new();
        let mut expected = Some(address);
        for addr in found.range(address..) {
            if expected != Some(*addr) {
                break;
            }
            block.push(*addr);
            expected = next_address(*addr, self.decode(*addr).length);
        }
        block
    }

    fn add_parent_references(&mut self) {
        for id in self.labels.ids() {
            let label = &self.labels[id];
            if label.label_type.is_top_level() {
                let address = label.address;
                self.set_subroutine_parent(address, id);
            }
        }

        for id in self.labels.ids() {
            let mut any_outside = false;
            let mut internal = Vec::new();
            for reference in self.labels[id].references.iter().copied() {
                if self.address_parents[reference as usize] == Some(id) {
                    if !self.decode(reference).has(OpcodeFlags::CALL) {
                        internal.push(reference);
                    }
                } else {
                    any_outside = true;
                }
            }

            let label = &mut self.labels[id];
            for reference in internal {
                label.references.remove(&reference);
            }

            let only_self_called = !any_outside
                && label.label_type.is_subroutine()
                && !label.references.is_empty();
            if only_self_called {
                let address = label.address;
                self.warn(
                    WarningKind::SelfRecursiveSubroutine,
                    Some(address),
                    format!(
                        "Address: {}h. A subroutine was found that calls itself recursively but is not called from any other location.",
                        hex4(address)
                    ),
                );
                self.set_dot_highlight(address, DOT_WARNING_MARK);
            }
        }
    }

    fn set_subroutine_parent(&mut self, address: u16, parent: LabelId) {
        let mut stack = vec![address];

        while let Some(branch) = stack.pop() {
            let mut addr = branch;
            loop {
                if !self.memory.is_assigned(addr) || self.address_parents[addr as usize].is_some() {
                    break;
                }
                if let Some(label) = self.labels.at(addr) {
                    if label.id != parent && label.label_type.is_top_level() {
                        break;
                    }
                }

                let instruction = self.decode(addr);
                self.address_parents[addr as usize] = Some(parent);

                // calls are followed too, the callee label ends the walk
                if let Some(target) = instruction.branch_target() {
                    stack.push(target);
                }

                if instruction.has(OpcodeFlags::STOP) {
                    break;
                }
                match next_address(addr, instruction.length) {
                    Some(next) => addr = next,
                    None => break,
                }
            }
        }
    }

    fn add_calls_list_to_labels(&mut self) {
        for id in self.labels.ids() {
            if !self.labels[id].label_type.is_top_level() {
                continue;
            }
            let callers: Vec<LabelId> = self.labels[id]
                .references
                .iter()
                .filter_map(|reference| self.address_parents[*reference as usize])
                .collect();
            for caller in callers {
                self.labels[caller].calls.push(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disasm::{FlowAnalyzer, GraphTarget, LabelCollector};

    fn analyzed(origin: u16, bytes: &[u8], entry: u16) -> Disassembler {
        let mut disasm = Disassembler::new();
        disasm.set_memory(origin, bytes);
        disasm.set_label(entry, None, NumberType::CodeLbl);
        disasm.collect_labels();
        disasm.adjust_code_pointing_labels();
        disasm.add_flow_through_references();
        disasm.turn_lbl_into_sub();
        disasm
    }

    #[test]
    fn test_subroutine_addresses_stop_at_gap() {
        // 8000: JR 8003h / 8002: NOP (never reached) / 8003: RET
        let disasm = analyzed(0x8000, &[0x18, 0x01, 0x00, 0xc9], 0x8000);

        assert_eq!(disasm.subroutine_addresses(0x8000), vec![0x8000]);
        assert_eq!(disasm.subroutine_addresses(0x8003), vec![0x8003]);
    }

    #[test]
    fn test_subroutine_addresses_coherent_block() {
        // 8000: JR Z,8003h / 8002: NOP / 8003: RET
        let disasm = analyzed(0x8000, &[0x28, 0x01, 0x00, 0xc9], 0x8000);
        assert_eq!(disasm.subroutine_addresses(0x8000), vec![0x8000, 0x8002, 0x8003]);
    }

    #[test]
    fn test_internal_jump_label_becomes_local() {
        // 8000: JP Z,8005h / 8003: NOP / 8004: NOP / 8005: RET
        let mut disasm = analyzed(0x8000, &[0xca, 0x05, 0x80, 0x00, 0x00, 0xc9], 0x8000);
        assert_eq!(disasm.labels.type_at(0x8005), Some(NumberType::CodeSub));

        disasm.find_local_labels_in_subroutines();

        assert_eq!(disasm.labels.type_at(0x8005), Some(NumberType::CodeLocalLbl));
    }

    #[test]
    fn test_backward_jump_label_becomes_loop() {
        // 8000: NOP / 8001: NOP / 8002: JP NZ,8001h / 8005: RET
        let mut disasm = analyzed(0x8000, &[0x00, 0x00, 0xc2, 0x01, 0x80, 0xc9], 0x8000);
        disasm.find_local_labels_in_subroutines();

        assert_eq!(disasm.labels.type_at(0x8001), Some(NumberType::CodeLocalLoop));
    }

    #[test]
    fn test_fixed_label_is_not_demoted() {
        let mut disasm = Disassembler::new();
        disasm.set_memory(0x8000, &[0xca, 0x05, 0x80, 0x00, 0x00, 0xc9]);
        disasm.set_label(0x8000, None, NumberType::CodeLbl);
        disasm.set_fixed_code_label(0x8005, Some("KEEP"));
        disasm.collect_labels();
        disasm.find_local_labels_in_subroutines();

        assert_eq!(disasm.labels.type_at(0x8005), Some(NumberType::CodeLbl));
    }

    #[test]
    fn test_parents_and_calls() {
        // 8000: CALL 8004h / 8003: RET / 8004: RET
        let mut disasm = analyzed(0x8000, &[0xcd, 0x04, 0x80, 0xc9, 0xc9], 0x8000);
        disasm.find_local_labels_in_subroutines();
        disasm.add_parent_references();
        disasm.add_calls_list_to_labels();

        let main = disasm.labels.id_at(0x8000).unwrap();
        let sub = disasm.labels.id_at(0x8004).unwrap();
        assert_eq!(disasm.address_parent(0x8000), Some(main));
        assert_eq!(disasm.address_parent(0x8003), Some(main));
        assert_eq!(disasm.address_parent(0x8004), Some(sub));
        assert_eq!(disasm.labels[main].calls, vec![sub]);
    }

    #[test]
    fn test_self_call_is_not_a_reference() {
        // 8000: CALL 8004h / 8003: RET / 8004: CALL 8004h / 8007: RET
        let mut disasm = analyzed(
            0x8000,
            &[0xcd, 0x04, 0x80, 0xc9, 0xcd, 0x04, 0x80, 0xc9],
            0x8000,
        );
        disasm.find_local_labels_in_subroutines();
        disasm.add_parent_references();

        // called from 8000h as well, so no warning
        assert!(disasm.warnings().is_empty());
        assert_eq!(disasm.labels.at(0x8004).unwrap().references.len(), 1);
    }

    #[test]
    fn test_only_self_called_subroutine_warns() {
        // 8000: NOP / 8001: RET, and a subroutine at 8002h only called
        // from its own body: 8002: NOP / 8003: CALL 8002h / 8006: RET
        let mut disasm = Disassembler::new();
        disasm.set_memory(0x8000, &[0x00, 0xc9, 0x00, 0xcd, 0x02, 0x80, 0xc9]);
        disasm.set_label(0x8000, None, NumberType::CodeLbl);
        disasm.set_label(0x8002, None, NumberType::CodeSub);
        disasm.collect_labels();
        disasm.add_parent_references();

        let warnings = disasm.warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::SelfRecursiveSubroutine);
        assert_eq!(warnings[0].address, Some(0x8002));
        assert_eq!(
            disasm
                .dot_highlights
                .get(&GraphTarget::Address(0x8002))
                .map(String::as_str),
            Some(DOT_WARNING_MARK)
        );
        // the call keeps its reference
        assert!(disasm.labels.at(0x8002).unwrap().references.contains(&0x8003));
    }
}
