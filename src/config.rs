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

//! Tunables of a disassembly run.

use std::collections::BTreeSet;

/// Prefixes used by the naming pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPrefixes {
    pub sub: String,
    pub lbl: String,
    pub rst: String,
    pub data: String,
    pub self_modifying: String,
    /// Appended to the parent name of a local label.
    pub local_lbl: String,
    /// Appended to the parent name of a local loop.
    pub local_loop: String,
    pub interrupt: String,
}

impl Default for LabelPrefixes {
    fn default() -> Self {
        Self {
            sub: "SUB".to_string(),
            lbl: "LBL".to_string(),
            rst: "RST".to_string(),
            data: "DATA".to_string(),
            self_modifying: "SELF_MOD".to_string(),
            local_lbl: "_l".to_string(),
            local_loop: "_loop".to_string(),
            interrupt: "INTRPT".to_string(),
        }
    }
}

/// Column layout of the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnWidths {
    /// Address column. 0 hides addresses.
    pub address: usize,
    /// Opcode bytes column.
    pub bytes: usize,
    /// Mnemonic part of an instruction, e.g. `LD`.
    pub opcode_first_part: usize,
    /// Whole instruction text.
    pub opcode_total: usize,
}

impl Default for ColumnWidths {
    fn default() -> Self {
        Self {
            address: 5,
            bytes: 13,
            opcode_first_part: 5,
            opcode_total: 12,
        }
    }
}

/// Configuration of the [`Disassembler`](crate::disasm::Disassembler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisasmConfig {
    pub prefixes: LabelPrefixes,
    pub opcodes_lower_case: bool,
    /// Empty lines between blocks of the listing.
    pub lines_between_blocks: usize,
    /// Print the opcode bytes next to each instruction.
    pub add_opcode_bytes: bool,
    pub columns: ColumnWidths,
    /// Seed address 0 (or the snapshot start) and create the special labels.
    pub automatic_addresses: bool,
    pub disable_comments: bool,
    pub no_warning_unassigned_memory: bool,
    /// Restart addresses that are not followed (e.g. `RST 08h` with inline data).
    pub rst_dont_follow: BTreeSet<u16>,
    /// Extra attributes written at the top of the call graph.
    pub dot_format: String,
    /// Node label template of the call graph.
    pub node_format: String,
}

impl Default for DisasmConfig {
    fn default() -> Self {
        Self {
            prefixes: LabelPrefixes::default(),
            opcodes_lower_case: true,
            lines_between_blocks: 2,
            add_opcode_bytes: true,
            columns: ColumnWidths::default(),
            automatic_addresses: true,
            disable_comments: false,
            no_warning_unassigned_memory: false,
            rst_dont_follow: BTreeSet::new(),
            dot_format: "rankdir=TB;".to_string(),
            node_format: "${label}\\n0x${address}\\nSize=${size}\\n".to_string(),
        }
    }
}

impl DisasmConfig {
    /// Check if a restart address is on the deny list.
    pub fn is_rst_denied(&self, address: u16) -> bool {
        self.rst_dont_follow.contains(&address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DisasmConfig::default();
        assert!(config.opcodes_lower_case);
        assert_eq!(config.lines_between_blocks, 2);
        assert_eq!(config.columns.bytes, 13);
        assert_eq!(config.prefixes.sub, "SUB");
        assert_eq!(config.node_format, "${label}\\n0x${address}\\nSize=${size}\\n");
    }

    #[test]
    fn test_rst_deny_list() {
        let mut config = DisasmConfig::default();
        config.rst_dont_follow.insert(0x08);
        assert!(config.is_rst_denied(0x08));
        assert!(!config.is_rst_denied(0x10));
    }
}
