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

//! Call graph in DOT syntax.
//!
//! Every subroutine, restart and jump label becomes a node, an edge goes
//! from a caller to each of its callees. The font size grows with the
//! cyclomatic complexity.

use super::comments::unique_callees;
use super::{Disassembler, GraphTarget, SubroutineStatistics};
use crate::error::{DisasmError, ErrorCode, Result};
use crate::format::{escape_dot, hex4};
use crate::label::{Label, LabelId};
use crate::numbertype::NumberType;
use std::collections::HashSet;

const FONT_SIZE_MIN: usize = 13;
const FONT_SIZE_MAX: usize = 40;
/// Smallest complexity range the font sizes are spread over.
const MIN_COMPLEXITY_RANGE: usize = 8;

/// Extension trait for the call graph.
pub trait CallGraphRenderer {
    /// The label of `target` and everything it calls, directly or not,
    /// in depth first order.
    ///
    /// Names are resolved through the map built by
    /// [`create_reverted_label_map`](Disassembler::create_reverted_label_map).
    fn graph_labels(&self, target: impl Into<GraphTarget>) -> Result<Vec<LabelId>>;

    /// Render the call graph of `labels`.
    fn call_graph(&self, labels: &[LabelId]) -> String;
}

impl CallGraphRenderer for Disassembler {
    fn graph_labels(&self, target: impl Into<GraphTarget>) -> Result<Vec<LabelId>> {
        let start = self.resolve_graph_target(&target.into())?;

        let mut chosen = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            chosen.push(id);
            for callee in self.labels[id].calls.iter().rev() {
                if !seen.contains(callee) {
                    stack.push(*callee);
                }
            }
        }
        Ok(chosen)
    }

    fn call_graph(&self, labels: &[LabelId]) -> String {
        let mut text = format!("digraph Callgraph {{\n\n{}\n", self.config.dot_format);
        let mut rank_uncalled = Vec::new();
        let mut rank_jumps = Vec::new();

        let min = self.statistics_min.cyclomatic_complexity;
        let range = self
            .statistics_max
            .cyclomatic_complexity
            .saturating_sub(min)
            .max(MIN_COMPLEXITY_RANGE);
        let factor = (FONT_SIZE_MAX - FONT_SIZE_MIN) as f64 / range as f64;

        for id in labels {
            let label = &self.labels[*id];
            if !label.label_type.is_top_level() {
                continue;
            }
            let name = escape_dot(label.name_or_empty());

            let mut color = self
                .dot_highlights
                .get(&GraphTarget::Address(label.address))
                .or_else(|| {
                    self.dot_highlights
                        .get(&GraphTarget::Name(label.name_or_empty().to_string()))
                })
                .cloned();

            if label.is_equ {
                color.get_or_insert_with(|| "lightgray".to_string());
                text.push_str(&format!("{} [fontsize=\"{}\"];\n", name, FONT_SIZE_MIN));
                text.push_str(&format!(
                    "{} [label=\"{}\"];\n",
                    name,
                    self.node_label(label, None)
                ));
            } else {
                let statistics = self.statistics.get(id).copied().unwrap_or_default();
                let font_size = FONT_SIZE_MIN as f64
                    + factor * (statistics.cyclomatic_complexity as f64 - min as f64);

                text.push_str(&format!(
                    "\"{}\" [fontsize=\"{}\"];\n",
                    name,
                    font_size.round() as i64
                ));
                text.push_str(&format!(
                    "\"{}\" [label=\"{}\"];\n",
                    name,
                    self.node_label(label, Some(&statistics))
                ));

                if label.references.is_empty() || label.label_type == NumberType::CodeLbl {
                    color.get_or_insert_with(|| "lightyellow".to_string());
                    if label.references.is_empty() {
                        rank_uncalled.push(name.clone());
                    } else {
                        rank_jumps.push(name.clone());
                    }
                }

                let callees: Vec<String> = unique_callees(&label.calls)
                    .iter()
                    .map(|callee| format!("\"{}\"", escape_dot(self.labels[*callee].name_or_empty())))
                    .collect();
                if !callees.is_empty() {
                    text.push_str(&format!("\"{}\" -> {{ {} }};\n", name, callees.join(" ")));
                }
            }

            if let Some(color) = color {
                text.push_str(&format!("\"{}\" [fillcolor={}, style=filled];\n", name, color));
            }
        }

        for rank in [&rank_uncalled, &rank_jumps] {
            if !rank.is_empty() {
                text.push_str(&format!("\n{{ rank=same; \"{}\" }};\n\n", rank.join("\", \"")));
            }
        }

        text.push_str("}\n");
        text
    }
}

impl Disassembler {
    fn resolve_graph_target(&self, target: &GraphTarget) -> Result<LabelId> {
        let address = match target {
            GraphTarget::Address(address) => *address,
            GraphTarget::Name(name) => *self.reverted_label_map.get(name).ok_or_else(|| {
                DisasmError::new(
                    ErrorCode::UnknownGraphLabel,
                    format!("Could not find \"{}\" while creating graph.", name),
                )
            })?,
        };

        self.labels.id_at(address).ok_or_else(|| {
            let shown = match target {
                GraphTarget::Address(address) => format!("0x{}", hex4(*address)),
                GraphTarget::Name(name) => name.clone(),
            };
            DisasmError::new(
                ErrorCode::UnknownGraphLabel,
                format!("Could not find address for \"{}\" while creating graph.", shown),
            )
        })
    }

    /// Fill the placeholders of the node format. Unknown or zero values
    /// show as `?`.
    fn node_label(&self, label: &Label, statistics: Option<&SubroutineStatistics>) -> String {
        let value = |pick: fn(&SubroutineStatistics) -> usize| match statistics.map(pick) {
            Some(value) if value > 0 => value.to_string(),
            _ => "?".to_string(),
        };

        self.config
            .node_format
            .replace("${label}", &escape_dot(label.name_or_empty()))
            .replace("${id}", &label.id.index().to_string())
            .replace("${address}", &hex4(label.address))
            .replace("${CC}", &value(|s| s.cyclomatic_complexity))
            .replace("${size}", &value(|s| s.size_in_bytes))
            .replace("${instructions}", &value(|s| s.count_of_instructions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn disassembled(bytes: &[u8]) -> Disassembler {
        let mut disasm = Disassembler::new();
        disasm.set_memory(0x8000, bytes);
        disasm.set_label(0x8000, Some("MAIN"), NumberType::CodeSub);
        disasm.disassemble();
        disasm
    }

    #[test]
    fn test_graph_labels_follow_calls() {
        // 8000: CALL 8004h / 8003: RET / 8004: RET
        let disasm = disassembled(&[0xcd, 0x04, 0x80, 0xc9, 0xc9]);
        let labels = disasm.graph_labels("MAIN").unwrap();

        let names: Vec<&str> = labels
            .iter()
            .map(|id| disasm.labels[*id].name_or_empty())
            .collect();
        assert_eq!(names, vec!["MAIN", "SUB1"]);
        assert_eq!(disasm.graph_labels(0x8004u16).unwrap().len(), 1);
    }

    #[test]
    fn test_graph_labels_unknown_target() {
        let disasm = disassembled(&[0xc9]);

        let error = disasm.graph_labels("NOPE").unwrap_err();
        assert_eq!(error.code, ErrorCode::UnknownGraphLabel);
        assert_eq!(error.message, "Could not find \"NOPE\" while creating graph.");

        let error = disasm.graph_labels(0x9000u16).unwrap_err();
        assert_eq!(
            error.message,
            "Could not find address for \"0x9000\" while creating graph."
        );
    }

    #[test]
    fn test_call_graph() {
        let disasm = disassembled(&[0xcd, 0x04, 0x80, 0xc9, 0xc9]);
        let labels = disasm.graph_labels(0x8000u16).unwrap();

        assert_eq!(
            disasm.call_graph(&labels),
            concat!(
                "digraph Callgraph {\n\n",
                "rankdir=TB;\n",
                "\"MAIN\" [fontsize=\"13\"];\n",
                "\"MAIN\" [label=\"MAIN\\n0x8000\\nSize=4\\n\"];\n",
                "\"MAIN\" -> { \"SUB1\" };\n",
                "\"MAIN\" [fillcolor=lightyellow, style=filled];\n",
                "\"SUB1\" [fontsize=\"13\"];\n",
                "\"SUB1\" [label=\"SUB1\\n0x8004\\nSize=1\\n\"];\n",
                "\n{ rank=same; \"MAIN\" };\n\n",
                "}\n",
            )
        );
    }

    #[test]
    fn test_highlight_by_name() {
        let mut disasm = disassembled(&[0xcd, 0x04, 0x80, 0xc9, 0xc9]);
        disasm.set_dot_highlight("SUB1", "red");
        let labels = disasm.graph_labels(0x8000u16).unwrap();

        assert!(disasm
            .call_graph(&labels)
            .contains("\"SUB1\" [fillcolor=red, style=filled];\n"));
    }

    #[test]
    fn test_node_format_placeholders() {
        let mut disasm = disassembled(&[0x3e, 0x01, 0xc9]);
        disasm.config.node_format = "${label}|${CC}|${instructions}|${size}".to_string();
        let id = disasm.labels.id_at(0x8000).unwrap();
        let statistics = *disasm.statistics(id).unwrap();

        assert_eq!(
            disasm.node_label(&disasm.labels[id], Some(&statistics)),
            "MAIN|1|2|3"
        );
        assert_eq!(disasm.node_label(&disasm.labels[id], None), "MAIN|?|?|?");
    }
}
