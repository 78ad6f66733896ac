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

//! Flow chart of subroutines in DOT syntax.
//!
//! A block is a run of instructions ending at a branch, a return, a stop or
//! right before a label. Blocks are emitted depth first: the branch target
//! first, then the fall-through successor.

use super::listing::ListingRenderer;
use super::subroutines::SubroutineAnalyzer;
use super::{next_address, Disassembler};
use crate::decoder::OpcodeFlags;
use crate::format::{escape_dot, hex4};
use std::collections::HashSet;

/// Extension trait for flow charts.
pub trait FlowChartRenderer {
    /// Render the flow chart of the subroutines starting at `starts`.
    fn flow_chart(&self, starts: &[u16]) -> String;
}

enum Step {
    Emit(String),
    Visit(u16),
}

impl FlowChartRenderer for Disassembler {
    fn flow_chart(&self, starts: &[u16]) -> String {
        let mut text = String::from("digraph FlowChart {\n\nnode [shape=box];\n");

        for start in starts.iter().copied() {
            let block_name = format!("b{}", hex4(start));
            let name = self
                .labels
                .at(start)
                .and_then(|label| label.name.clone())
                .unwrap_or_else(|| format!("0x{}", hex4(start)));
            text.push_str(&format!(
                "{}start [label=\"{}\", fillcolor=lightgray, style=filled, shape=tab];\n",
                block_name,
                escape_dot(&name)
            ));
            text.push_str(&format!("{}start -> {};\n", block_name, block_name));
            text.push_str(&format!("{}end [label=\"end\", shape=doublecircle];\n", block_name));

            let members: HashSet<u16> = self.subroutine_addresses(start).into_iter().collect();
            let mut processed = HashSet::new();
            let mut steps = vec![Step::Visit(start)];

            while let Some(step) = steps.pop() {
                match step {
                    Step::Emit(line) => text.push_str(&line),
                    Step::Visit(address) => {
                        if processed.contains(&address) {
                            continue;
                        }
                        let (block, following) = self.flow_block(address, start, &members, &mut processed);
                        text.push_str(&block);
                        // reversed, the stack pops them in order
                        steps.extend(following.into_iter().rev());
                    }
                }
            }
        }

        text.push_str("\n}\n");
        text
    }
}

impl Disassembler {
    /// Render one block and return the steps that follow it.
    fn flow_block(
        &self,
        address: u16,
        start: u16,
        members: &HashSet<u16>,
        processed: &mut HashSet<u16>,
    ) -> (String, Vec<Step>) {
        let branch = format!("b{}", hex4(address));
        let mut texts = Vec::new();
        let mut addr = address;

        let (instruction, next) = loop {
            processed.insert(addr);
            let instruction = self.decode(addr);
            texts.push(escape_dot(&self.instruction_text(&instruction, false).0));

            let Some(next) = next_address(addr, instruction.length) else {
                break (instruction, None);
            };
            addr = next;

            if self.labels.at(addr).is_some() || !self.memory.is_assigned(addr) {
                break (instruction, Some(next));
            }
            if instruction.has(OpcodeFlags::BRANCH_ADDRESS)
                || instruction.has(OpcodeFlags::RET)
                || instruction.has(OpcodeFlags::STOP)
            {
                break (instruction, Some(next));
            }
        };

        let block = format!("{} [label=\"{}\\l\"];\n", branch, texts.join("\\l"));
        let mut steps = Vec::new();

        if let Some(target) = instruction.branch_target() {
            if members.contains(&target) {
                steps.push(Step::Emit(format!(
                    "{} -> b{} [headport=\"n\", tailport=\"e\"];\n",
                    branch,
                    hex4(target)
                )));
                steps.push(Step::Visit(target));
            }
        }

        if !instruction.has(OpcodeFlags::STOP) {
            if let Some(next) = next.filter(|next| members.contains(next)) {
                steps.push(Step::Emit(format!("{} -> b{};\n", branch, hex4(next))));
                steps.push(Step::Visit(next));
            }
        }

        if instruction.has(OpcodeFlags::STOP) || instruction.has(OpcodeFlags::RET) {
            steps.push(Step::Emit(format!("{} -> b{}end;\n", branch, hex4(start))));
        }

        (block, steps)
    }
}
