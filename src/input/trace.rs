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

//! MAME traces.
//!
//! Every line of a trace starts with the executed address, e.g.
//! `8000: ld   a,$01`. The traced addresses are known to be code. A
//! `jp (hl)` line also tells where the indirect jump went: the address of
//! the next line.

use crate::disasm::{Disassembler, LabelCollector};
use crate::numbertype::NumberType;
use std::collections::BTreeSet;

/// Instruction text of an indirect jump as MAME writes it.
const JP_HL: &str = " jp   (hl)";

/// Queue all traced addresses in ascending order and label the targets of
/// `jp (hl)`.
pub fn use_mame_trace(disasm: &mut Disassembler, trace: &str) {
    let mut traced = BTreeSet::new();
    let mut jp_hl_ref: Option<u16> = None;

    for line in trace.lines() {
        let Some(address) = trace_address(line) else {
            continue;
        };
        traced.insert(address);

        if let Some(reference) = jp_hl_ref.take() {
            disasm.set_found_label(address, &[reference], NumberType::CodeLbl);
        }
        if disasm.memory.is_assigned(address) && line[5..].starts_with(JP_HL) {
            jp_hl_ref = Some(address);
        }
    }

    log::debug!("Trace contains {} addresses", traced.len());
    for address in traced {
        disasm.push_address(address);
    }
}

/// The `XXXX:` address at the start of a line.
fn trace_address(line: &str) -> Option<u16> {
    let hex = line.get(..5)?.strip_suffix(':')?;
    u16::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemAttribute;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trace_address() {
        assert_eq!(trace_address("8000: nop"), Some(0x8000));
        assert_eq!(trace_address("abcd:"), Some(0xabcd));
        assert_eq!(trace_address("8000 nop"), None);
        assert_eq!(trace_address("xyzw: nop"), None);
        assert_eq!(trace_address("80:"), None);
    }

    #[test]
    fn test_addresses_are_queued_sorted() {
        let mut disasm = Disassembler::new();
        disasm.set_memory(0x8000, &[0x00, 0x00, 0xc9, 0x00, 0xc9]);
        use_mame_trace(&mut disasm, "8003: nop\n8000: nop\n8001: nop\n8003: nop\n");
        disasm.collect_labels();

        assert!(disasm.memory.attribute_at(0x8000).contains(MemAttribute::CODE));
        assert!(disasm.memory.attribute_at(0x8003).contains(MemAttribute::CODE));
    }

    #[test]
    fn test_jp_hl_target_gets_label() {
        let mut disasm = Disassembler::new();
        // 8000: JP (HL) / 8001: NOP / 8002: RET
        disasm.set_memory(0x8000, &[0xe9, 0x00, 0xc9]);
        use_mame_trace(&mut disasm, "8000: jp   (hl)\n8002: ret\n");

        let label = disasm.labels.at(0x8002).unwrap();
        assert_eq!(label.label_type, NumberType::CodeLbl);
        assert_eq!(label.references.iter().copied().collect::<Vec<_>>(), vec![0x8000]);
    }
}
