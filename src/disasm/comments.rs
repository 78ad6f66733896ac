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

//! Generated comments describing callers, callees and statistics of labels.

use super::Disassembler;
use crate::comment::Comment;
use crate::format::address_conversion;
use crate::label::LabelId;
use crate::numbertype::NumberType;

/// Extension trait for label comments.
pub trait LabelComments {
    /// Store the generated comment of every main label without comment.
    fn add_label_comments(&mut self);

    /// The stored comment, else the generated one. `None` if comments are
    /// disabled.
    fn address_comment(&self, address: u16) -> Option<Comment>;

    /// Generate the comment of the label at `address`.
    fn label_comments(&self, address: u16) -> Option<Comment>;
}

impl LabelComments for Disassembler {
    fn add_label_comments(&mut self) {
        for id in self.labels.ids() {
            let address = self.labels[id].address;
            if !is_main_label(self.labels[id].label_type) || self.comments.contains_key(&address) {
                continue;
            }
            if let Some(comment) = self.address_comment(address) {
                self.comments.insert(address, comment);
            }
        }
    }

    fn address_comment(&self, address: u16) -> Option<Comment> {
        if self.config.disable_comments {
            return None;
        }
        match self.comments.get(&address) {
            Some(comment) => Some(comment.clone()),
            None => self.label_comments(address),
        }
    }

    fn label_comments(&self, address: u16) -> Option<Comment> {
        let label = self.labels.at(address)?;

        let kind = match label.label_type {
            NumberType::CodeSub => "Subroutine",
            NumberType::CodeRst => "Restart",
            NumberType::DataLbl => "Data",
            _ => "Label",
        };

        let mut lines = Vec::new();
        if label.label_type.is_subroutine() {
            let mut recursive = false;
            let callers: Vec<String> = label
                .references
                .iter()
                .map(|reference| {
                    let text = address_conversion(*reference);
                    match self.address_parents[*reference as usize] {
                        Some(parent) if parent == label.id => {
                            recursive = true;
                            format!("self[{}]", text)
                        }
                        Some(parent) => format!("{}[{}]", self.labels[parent].name_or_empty(), text),
                        None => text,
                    }
                })
                .collect();
            let called_by = format!(
                "Called by: {}{}",
                callers.join(", "),
                if callers.is_empty() { "-" } else { "." }
            );

            let summary = match self.statistics.get(&label.id) {
                Some(statistics) => format!(
                    "{}: {}Size={}, CC={}.",
                    kind,
                    if recursive { "Recursive, " } else { "" },
                    statistics.size_in_bytes,
                    statistics.cyclomatic_complexity
                ),
                None => format!("{}.", kind),
            };

            lines.push(summary);
            lines.push(called_by);

            if !label.is_equ {
                let callees = unique_callees(&label.calls);
                let names: Vec<&str> = callees
                    .iter()
                    .map(|callee| self.labels[*callee].name_or_empty())
                    .collect();
                lines.push(format!(
                    "Calls: {}{}",
                    names.join(", "),
                    if names.is_empty() { "-" } else { "." }
                ));
            }
        } else {
            if label.references.is_empty() {
                lines.push(format!("{} not accessed.", kind));
            } else {
                lines.push(format!("{} accessed by:", kind));
                let accessors: Vec<String> = label
                    .references
                    .iter()
                    .map(|reference| {
                        let mut text = address_conversion(*reference);
                        if let Some(parent) = self.address_parents[*reference as usize] {
                            text.push_str(&format!("(in {})", self.labels[parent].name_or_empty()));
                        }
                        text
                    })
                    .collect();
                lines.push(accessors.join(", "));
            }
        }

        let mut comment = Comment::new();
        if label.is_equ {
            comment.inline = Some(format!("; {}. {}", address, lines.join(" ")));
        } else {
            comment.lines_before = lines.iter().map(|line| format!("; {}", line)).collect();
        }
        Some(comment)
    }
}

/// Labels that get a generated comment and appear in the main label list.
pub(super) fn is_main_label(label_type: NumberType) -> bool {
    label_type.is_top_level() || label_type == NumberType::DataLbl
}

/// Callees in order of their first call.
pub(super) fn unique_callees(calls: &[LabelId]) -> Vec<LabelId> {
    let mut callees: Vec<LabelId> = Vec::new();
    for callee in calls {
        if !callees.contains(callee) {
            callees.push(*callee);
        }
    }
    callees
}
