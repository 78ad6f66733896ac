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

//! Size and cyclomatic complexity of subroutines.

use super::{next_address, Disassembler};
use crate::decoder::OpcodeFlags;
use crate::numbertype::NumberType;
use std::collections::HashSet;

/// Statistics of one subroutine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubroutineStatistics {
    pub size_in_bytes: usize,
    pub count_of_instructions: usize,
    pub cyclomatic_complexity: usize,
}

impl SubroutineStatistics {
    /// Start value for minimum searches.
    pub const MAX: SubroutineStatistics = SubroutineStatistics {
        size_in_bytes: usize::MAX,
        count_of_instructions: usize::MAX,
        cyclomatic_complexity: usize::MAX,
    };

    fn min(&self, other: &Self) -> Self {
        Self {
            size_in_bytes: self.size_in_bytes.min(other.size_in_bytes),
            count_of_instructions: self.count_of_instructions.min(other.count_of_instructions),
            cyclomatic_complexity: self.cyclomatic_complexity.min(other.cyclomatic_complexity),
        }
    }

    fn max(&self, other: &Self) -> Self {
        Self {
            size_in_bytes: self.size_in_bytes.max(other.size_in_bytes),
            count_of_instructions: self.count_of_instructions.max(other.count_of_instructions),
            cyclomatic_complexity: self.cyclomatic_complexity.max(other.cyclomatic_complexity),
        }
    }
}

/// Extension trait for statistics.
pub trait StatisticsCounter {
    /// Count the statistics of every subroutine, restart and jump label.
    fn count_statistics(&mut self);

    /// Walk the code of one subroutine. Branches into other subroutines
    /// are not followed, falling into one ends the walk.
    fn count_address_statistic(&self, address: u16) -> SubroutineStatistics;
}

impl StatisticsCounter for Disassembler {
    fn count_statistics(&mut self) {
        for id in self.labels.ids() {
            let label = &self.labels[id];
            if label.is_equ || !label.label_type.is_top_level() {
                continue;
            }

            let address = label.address;
            if label.label_type == NumberType::CodeRst && self.config.is_rst_denied(address) {
                self.statistics.insert(id, SubroutineStatistics::default());
                continue;
            }

            let mut statistics = self.count_address_statistic(address);
            statistics.cyclomatic_complexity += 1;

            self.statistics_max = self.statistics_max.max(&statistics);
            self.statistics_min = self.statistics_min.min(&statistics);
            self.statistics.insert(id, statistics);
        }
    }

    fn count_address_statistic(&self, address: u16) -> SubroutineStatistics {
        let mut statistics = SubroutineStatistics::default();
        let mut visited = HashSet::new();
        let mut stack = vec![address];

        while let Some(branch) = stack.pop() {
            let mut addr = branch;
            loop {
                if !self.memory.is_assigned(addr) || !visited.insert(addr) {
                    break;
                }

                let instruction = self.decode(addr);
                statistics.size_in_bytes += instruction.length as usize;
                statistics.count_of_instructions += 1;

                let conditional = instruction.has(OpcodeFlags::CONDITIONAL);
                let is_branch = instruction.has(OpcodeFlags::BRANCH_ADDRESS);
                // JP cc / JR cc / CALL cc carry a condition operand, DJNZ does not
                let has_condition = instruction.template.contains(',');
                let is_return = instruction.has(OpcodeFlags::RET);
                if conditional && ((is_branch && has_condition) || is_return) {
                    statistics.cyclomatic_complexity += 1;
                }

                if is_branch && !instruction.has(OpcodeFlags::CALL) {
                    if let Some(target) = instruction.branch_target() {
                        let into_subroutine = self
                            .labels
                            .type_at(target)
                            .is_some_and(NumberType::is_subroutine);
                        if !into_subroutine {
                            stack.push(target);
                        }
                    }
                }

                let Some(next) = next_address(addr, instruction.length) else {
                    break;
                };
                addr = next;

                if self.labels.type_at(addr).is_some_and(NumberType::is_subroutine) {
                    break;
                }
                if instruction.has(OpcodeFlags::STOP) {
                    break;
                }
            }
        }

        statistics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disasm::LabelCollector;

    fn collected(bytes: &[u8]) -> Disassembler {
        let mut disasm = Disassembler::new();
        disasm.set_memory(0x8000, bytes);
        disasm.set_label(0x8000, None, NumberType::CodeSub);
        disasm.collect_labels();
        disasm
    }

    #[test]
    fn test_straight_subroutine() {
        // LD A,01h / RET
        let disasm = collected(&[0x3e, 0x01, 0xc9]);
        let statistics = disasm.count_address_statistic(0x8000);

        assert_eq!(statistics.size_in_bytes, 3);
        assert_eq!(statistics.count_of_instructions, 2);
        assert_eq!(statistics.cyclomatic_complexity, 0);
    }

    #[test]
    fn test_conditional_return_and_loop() {
        // 8000: RET Z / 8001: DJNZ 8000h / 8003: RET
        let mut disasm = collected(&[0xc8, 0x10, 0xfd, 0xc9]);
        disasm.count_statistics();

        let id = disasm.labels.id_at(0x8000).unwrap();
        let statistics = disasm.statistics(id).unwrap();
        assert_eq!(statistics.size_in_bytes, 4);
        assert_eq!(statistics.count_of_instructions, 3);
        assert_eq!(statistics.cyclomatic_complexity, 2);
    }

    #[test]
    fn test_djnz_is_not_a_decision() {
        // 8000: NOP / 8001: DJNZ 8000h / 8003: RET
        let mut disasm = collected(&[0x00, 0x10, 0xfd, 0xc9]);
        disasm.count_statistics();

        let id = disasm.labels.id_at(0x8000).unwrap();
        let statistics = disasm.statistics(id).unwrap();
        assert_eq!(statistics.count_of_instructions, 3);
        assert_eq!(statistics.cyclomatic_complexity, 1);
    }

    #[test]
    fn test_conditional_jump_and_call() {
        // 8000: JR NZ,8004h / 8002: NOP / 8003: RET / 8004: CALL Z,8000h / 8007: RET
        let disasm = collected(&[0x20, 0x02, 0x00, 0xc9, 0xcc, 0x00, 0x80, 0xc9]);
        let statistics = disasm.count_address_statistic(0x8000);

        assert_eq!(statistics.count_of_instructions, 5);
        assert_eq!(statistics.cyclomatic_complexity, 2);
    }

    #[test]
    fn test_called_subroutine_not_counted() {
        // 8000: CALL 8004h / 8003: RET / 8004: NOP / 8005: RET
        let mut disasm = collected(&[0xcd, 0x04, 0x80, 0xc9, 0x00, 0xc9]);
        disasm.count_statistics();

        let main = disasm.statistics(disasm.labels.id_at(0x8000).unwrap()).unwrap();
        assert_eq!(main.size_in_bytes, 4);
        assert_eq!(main.cyclomatic_complexity, 1);

        assert_eq!(disasm.statistics_min().size_in_bytes, 2);
        assert_eq!(disasm.statistics_max().size_in_bytes, 4);
    }

    #[test]
    fn test_denied_rst_has_zero_statistics() {
        let mut disasm = Disassembler::new();
        disasm.set_memory(0x0000, &[0xcf, 0xc9, 0, 0, 0, 0, 0, 0, 0xc9]);
        disasm.config.rst_dont_follow.insert(0x08);
        disasm.set_label(0x0000, None, NumberType::CodeLbl);
        disasm.collect_labels();
        disasm.count_statistics();

        let id = disasm.labels.id_at(0x0008).unwrap();
        assert_eq!(disasm.statistics(id), Some(&SubroutineStatistics::default()));
    }
}
