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


//! Property-based tests for the disassembler.
//!
//! These tests verify invariants that should hold for any memory image,
//! using proptest for random input generation.

use proptest::prelude::*;
use std::collections::HashMap;
use zdisasm::disasm::{FlowAnalyzer, LabelCollector};
use zdisasm::input::parse_address;
use zdisasm::{Disassembler, MemAttribute, NumberType};

const ORIGIN: u16 = 0x8000;

fn program() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..96)
}

fn collected(bytes: &[u8]) -> Disassembler {
    let mut disasm = Disassembler::new();
    disasm.set_memory(ORIGIN, bytes);
    disasm.set_label(ORIGIN, Some("MAIN"), NumberType::CodeSub);
    disasm.collect_labels();
    disasm
}

fn disassembled(bytes: &[u8]) -> Disassembler {
    let mut disasm = Disassembler::new();
    disasm.set_memory(ORIGIN, bytes);
    disasm.set_label(ORIGIN, Some("MAIN"), NumberType::CodeSub);
    disasm.disassemble();
    disasm
}

// ============================================================================
// Memory Attribute Properties
// ============================================================================

proptest! {
    /// Property: Only supplied bytes are ever marked as code.
    #[test]
    fn prop_code_is_assigned(bytes in program()) {
        let disasm = collected(&bytes);
        for address in 0..=u16::MAX {
            let attr = disasm.memory.attribute_at(address);
            if attr.contains(MemAttribute::CODE) {
                prop_assert!(
                    attr.contains(MemAttribute::ASSIGNED),
                    "Code at unassigned address {:04X}h", address
                );
            }
        }
    }

    /// Property: Every first byte of an instruction is code.
    #[test]
    fn prop_code_first_is_code(bytes in program()) {
        let disasm = collected(&bytes);
        for address in 0..=u16::MAX {
            let attr = disasm.memory.attribute_at(address);
            if attr.contains(MemAttribute::CODE_FIRST) {
                prop_assert!(attr.contains(MemAttribute::CODE));
            }
        }
    }
}

// ============================================================================
// Label Classification Properties
// ============================================================================

proptest! {
    /// Property: Flow-through linking and subroutine promotion never lower
    /// the type of a label.
    ///
    /// `find_local_labels_in_subroutines` is left out on purpose: it demotes
    /// labels inside a subroutine to local labels, so the property does not
    /// hold for the whole pipeline.
    #[test]
    fn prop_promotion_is_monotonic(bytes in program()) {
        let mut disasm = collected(&bytes);
        let before: HashMap<u16, NumberType> = disasm
            .labels
            .iter()
            .map(|label| (label.address, label.label_type))
            .collect();

        disasm.add_flow_through_references();
        disasm.turn_lbl_into_sub();

        for label in disasm.labels.iter() {
            if let Some(old) = before.get(&label.address) {
                prop_assert!(
                    label.label_type >= *old,
                    "{:04X}h went from {} to {}", label.address, old, label.label_type
                );
            }
        }
    }

    /// Property: Labels never reference themselves after collecting.
    #[test]
    fn prop_no_self_references(bytes in program()) {
        let disasm = collected(&bytes);
        for label in disasm.labels.iter() {
            prop_assert!(!label.references.contains(&label.address));
        }
    }

    /// Property: Every label has a name after the full pipeline.
    #[test]
    fn prop_all_main_labels_named(bytes in program()) {
        let disasm = disassembled(&bytes);
        for label in disasm.labels.iter() {
            if label.label_type.is_top_level() || label.label_type == NumberType::DataLbl {
                prop_assert!(
                    label.name.as_deref().is_some_and(|name| !name.is_empty()),
                    "Unnamed label at {:04X}h", label.address
                );
            }
        }
    }
}

// ============================================================================
// Statistics Properties
// ============================================================================

proptest! {
    /// Property: Every subroutine lies within the program wide bounds.
    #[test]
    fn prop_statistics_within_bounds(bytes in program()) {
        let disasm = disassembled(&bytes);
        let min = disasm.statistics_min();
        let max = disasm.statistics_max();

        for label in disasm.labels.iter() {
            let Some(statistics) = disasm.statistics(label.id) else {
                continue;
            };
            prop_assert!(min.size_in_bytes <= statistics.size_in_bytes);
            prop_assert!(statistics.size_in_bytes <= max.size_in_bytes);
            prop_assert!(min.count_of_instructions <= statistics.count_of_instructions);
            prop_assert!(statistics.count_of_instructions <= max.count_of_instructions);
            prop_assert!(min.cyclomatic_complexity <= statistics.cyclomatic_complexity);
            prop_assert!(statistics.cyclomatic_complexity <= max.cyclomatic_complexity);
            prop_assert!(statistics.cyclomatic_complexity >= 1);
        }
    }
}

// ============================================================================
// Determinism Properties
// ============================================================================

proptest! {
    /// Property: Two fresh runs on the same image render the same listing.
    #[test]
    fn prop_disassembly_deterministic(bytes in program()) {
        let first = disassembled(&bytes).disassembly_text();
        let second = disassembled(&bytes).disassembly_text();
        prop_assert_eq!(first, second);
    }

    /// Property: Hex addresses parse back to their value.
    #[test]
    fn prop_parse_hex_address(address in any::<u16>()) {
        prop_assert_eq!(parse_address(&format!("0x{:04X}", address)).ok(), Some(address));
        prop_assert_eq!(parse_address(&format!("{:x}h", address)).ok(), Some(address));
        prop_assert_eq!(parse_address(&address.to_string()).ok(), Some(address));
    }
}
