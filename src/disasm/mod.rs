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

//! The disassembler.
//!
//! [`Disassembler::disassemble`] runs these passes in a fixed order:
//! 1. Collect labels by walking the decoder from the queued addresses
//! 2. Find interrupt entries and special labels (`BIN_START_...`)
//! 3. Move labels that point into the middle of an instruction
//! 4. Add flow-through references
//! 5. Promote jump labels that return to subroutines
//! 6. Demote labels only used inside a subroutine to local labels
//! 7. Assign parents and build the call lists
//! 8. Count statistics and assign names
//! 9. Render the listing
//!
//! Each group of passes lives in its own extension trait implemented on
//! [`Disassembler`].

mod callgraph;
mod collect;
mod comments;
mod flow;
mod flowchart;
mod listing;
mod naming;
mod statistics;
mod subroutines;

pub use callgraph::CallGraphRenderer;
pub use collect::LabelCollector;
pub use comments::LabelComments;
pub use flow::FlowAnalyzer;
pub use flowchart::FlowChartRenderer;
pub use listing::ListingRenderer;
pub use naming::LabelNamer;
pub use statistics::{StatisticsCounter, SubroutineStatistics};
pub use subroutines::SubroutineAnalyzer;

use crate::comment::{Comment, CommentEntry};
use crate::config::DisasmConfig;
use crate::decoder::{Decoder, Instruction, Z80Decoder};
use crate::error::{Warning, WarningKind};
use crate::label::{LabelArena, LabelId};
use crate::memory::{MemAttribute, Memory, MEMORY_SIZE};
use crate::numbertype::NumberType;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// A node of the call graph, given by address or by label name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphTarget {
    Address(u16),
    Name(String),
}

impl From<u16> for GraphTarget {
    fn from(address: u16) -> Self {
        GraphTarget::Address(address)
    }
}

impl From<&str> for GraphTarget {
    fn from(name: &str) -> Self {
        GraphTarget::Name(name.to_string())
    }
}

/// Color used for subroutines that are only called by themselves.
pub const DOT_WARNING_MARK: &str = "lightblue";

type WarningCallback = Box<dyn FnMut(&Warning)>;
type NameFunction = Box<dyn Fn(u16) -> String>;

/// The Z80 disassembler.
///
/// Feed it memory and entry points, call [`disassemble`](Self::disassemble)
/// and read the listing or the graphs afterwards.
pub struct Disassembler {
    /// The memory image.
    pub memory: Memory,
    /// All labels, ordered by address.
    pub labels: LabelArena,
    /// Tunables.
    pub config: DisasmConfig,
    decoder: Box<dyn Decoder>,
    address_queue: VecDeque<u16>,
    /// Display displacement of addresses that point next to a label.
    offset_labels: HashMap<u16, i32>,
    /// Owning top-level label per address.
    address_parents: Vec<Option<LabelId>>,
    comments: BTreeMap<u16, Comment>,
    statistics: HashMap<LabelId, SubroutineStatistics>,
    statistics_min: SubroutineStatistics,
    statistics_max: SubroutineStatistics,
    dot_highlights: HashMap<GraphTarget, String>,
    reverted_label_map: HashMap<String, u16>,
    sna_start: Option<u16>,
    warnings: Vec<Warning>,
    on_warning: Option<WarningCallback>,
    label_name_fn: Option<NameFunction>,
    disassembled_lines: Option<Vec<String>>,
}

impl Disassembler {
    /// Create a disassembler with the default configuration and the
    /// built-in Z80 decoder.
    pub fn new() -> Self {
        Self::with_config(DisasmConfig::default())
    }

    /// Create a disassembler with the built-in Z80 decoder.
    pub fn with_config(config: DisasmConfig) -> Self {
        Self::with_decoder(config, Box::new(Z80Decoder::new()))
    }

    /// Create a disassembler using a custom decoder.
    pub fn with_decoder(config: DisasmConfig, decoder: Box<dyn Decoder>) -> Self {
        Self {
            memory: Memory::new(),
            labels: LabelArena::new(),
            config,
            decoder,
            address_queue: VecDeque::new(),
            offset_labels: HashMap::new(),
            address_parents: vec![None; MEMORY_SIZE],
            comments: BTreeMap::new(),
            statistics: HashMap::new(),
            statistics_min: SubroutineStatistics::MAX,
            statistics_max: SubroutineStatistics::default(),
            dot_highlights: HashMap::new(),
            reverted_label_map: HashMap::new(),
            sna_start: None,
            warnings: Vec::new(),
            on_warning: None,
            label_name_fn: None,
            disassembled_lines: None,
        }
    }

    /// Copy `bytes` into memory starting at `origin`.
    pub fn set_memory(&mut self, origin: u16, bytes: &[u8]) {
        self.memory.set_memory(origin, bytes);
    }

    /// Set a label, e.g. a known entry point.
    ///
    /// An existing label only gets the new name (a fixed label keeps the
    /// name it already has). Code labels inside the memory image are queued
    /// for disassembly, labels outside of it become EQUs.
    pub fn set_label(&mut self, address: u16, name: Option<&str>, label_type: NumberType) {
        if let Some(label) = self.labels.at_mut(address) {
            if label.name.is_none() || !label.is_fixed {
                label.name = name.map(str::to_string);
            }
            return;
        }

        let id = self.labels.insert(address, label_type);
        self.labels[id].name = name.map(str::to_string);
        if self.memory.is_assigned(address) {
            if label_type.is_code() {
                self.address_queue.push_back(address);
            }
        } else {
            self.labels[id].is_equ = true;
        }
    }

    /// Set a code label whose classification the passes never change.
    pub fn set_fixed_code_label(&mut self, address: u16, name: Option<&str>) {
        let id = match self.labels.id_at(address) {
            Some(id) => id,
            None => self.labels.insert(address, NumberType::CodeLbl),
        };

        if let Some(name) = name {
            self.labels[id].name = Some(name.to_string());
        }
        if self.memory.is_assigned(address) {
            self.address_queue.push_back(address);
        } else {
            self.labels[id].is_equ = true;
        }
        self.labels[id].is_fixed = true;
    }

    /// Add the `count` little endian addresses of a jump table as fixed
    /// code labels.
    pub fn set_jmp_table(&mut self, address: u16, count: usize) {
        let mut address = address;
        for _ in 0..count {
            let target = self.memory.word_at(address);
            self.set_fixed_code_label(target, None);
            address = address.wrapping_add(2);
        }
    }

    /// Queue an address for disassembly without creating a label.
    pub fn push_address(&mut self, address: u16) {
        self.address_queue.push_back(address);
    }

    /// Replace the queue of addresses to disassemble.
    pub fn set_address_queue(&mut self, addresses: impl IntoIterator<Item = u16>) {
        self.address_queue = addresses.into_iter().collect();
    }

    /// Remember the start address of a snapshot.
    ///
    /// Snapshots never contain the ROM, so warnings about unassigned memory
    /// are switched off.
    pub fn set_sna_start(&mut self, address: u16) {
        self.sna_start = Some(address);
        self.config.no_warning_unassigned_memory = true;
    }

    /// The snapshot start address, if any.
    pub fn sna_start(&self) -> Option<u16> {
        self.sna_start
    }

    /// Use the entries of a comment file.
    ///
    /// Every entry replaces the comment at its address, a label name sets a
    /// data label (the passes may still turn it into code).
    pub fn set_address_comments(&mut self, entries: Vec<CommentEntry>) {
        for entry in entries {
            self.comments.insert(entry.address, entry.comment);
            if let Some(name) = entry.label {
                self.set_label(entry.address, Some(&name), NumberType::DataLbl);
            }
        }
    }

    /// Set the comment of an address.
    pub fn set_comment(&mut self, address: u16, comment: Comment) {
        self.comments.insert(address, comment);
    }

    /// The stored comment of an address.
    pub fn comment_at(&self, address: u16) -> Option<&Comment> {
        self.comments.get(&address)
    }

    /// Register a callback invoked for every warning.
    pub fn on_warning(&mut self, callback: impl FnMut(&Warning) + 'static) {
        self.on_warning = Some(Box::new(callback));
    }

    /// Name all labels with `function` instead of the built-in scheme.
    pub fn set_label_name_fn(&mut self, function: impl Fn(u16) -> String + 'static) {
        self.label_name_fn = Some(Box::new(function));
    }

    /// All warnings emitted so far.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Statistics of a subroutine label.
    pub fn statistics(&self, id: LabelId) -> Option<&SubroutineStatistics> {
        self.statistics.get(&id)
    }

    /// Smallest values over all subroutines.
    pub fn statistics_min(&self) -> &SubroutineStatistics {
        &self.statistics_min
    }

    /// Largest values over all subroutines.
    pub fn statistics_max(&self) -> &SubroutineStatistics {
        &self.statistics_max
    }

    /// The top-level label an address belongs to.
    pub fn address_parent(&self, address: u16) -> Option<LabelId> {
        self.address_parents[address as usize]
    }

    /// Highlight a node of the call graph.
    pub fn set_dot_highlight(&mut self, target: impl Into<GraphTarget>, color: &str) {
        self.dot_highlights.insert(target.into(), color.to_string());
    }

    /// Forget all labels and queued addresses.
    pub fn clear_labels(&mut self) {
        self.labels.clear();
        self.offset_labels.clear();
        self.address_queue.clear();
        self.address_parents = vec![None; MEMORY_SIZE];
    }

    /// Build the map from label names back to addresses, used to resolve
    /// [`GraphTarget::Name`].
    pub fn create_reverted_label_map(&mut self) {
        self.reverted_label_map = self
            .labels
            .iter()
            .map(|label| (label.name_or_empty().to_string(), label.address))
            .collect();
    }

    /// Run all passes and render the listing.
    pub fn disassemble(&mut self) {
        self.add_automatic_addresses();
        self.collect_labels();
        log::debug!("Collected {} labels", self.labels.len());

        self.find_interrupt_labels();
        self.set_special_labels();
        self.adjust_code_pointing_labels();
        self.add_flow_through_references();
        self.turn_lbl_into_sub();
        self.find_local_labels_in_subroutines();
        self.add_parent_references();
        self.add_calls_list_to_labels();
        self.count_statistics();
        self.assign_label_names();
        if !self.config.disable_comments {
            self.add_label_comments();
        }

        let listing = self.disassemble_memory();
        let mut lines = self.equ_labels_disassembly();
        lines.extend(listing);

        let leading_empty = lines.iter().take_while(|line| line.is_empty()).count();
        lines.drain(..leading_empty);

        self.create_reverted_label_map();
        self.disassembled_lines = Some(lines);
    }

    /// The rendered listing.
    ///
    /// Emits a warning and yields a single empty line if
    /// [`disassemble`](Self::disassemble) was not called.
    pub fn disassembly_lines(&mut self) -> Vec<String> {
        match &self.disassembled_lines {
            Some(lines) => lines.clone(),
            None => {
                self.warn(WarningKind::NoDisassembly, None, "No disassembly was done.");
                vec![String::new()]
            }
        }
    }

    /// The rendered listing as one text.
    pub fn disassembly_text(&mut self) -> String {
        self.disassembly_lines().join("\n")
    }

    /// Record a warning and pass it to the callback.
    fn warn(&mut self, kind: WarningKind, address: Option<u16>, message: impl Into<String>) {
        let warning = Warning::new(kind, address, message);
        log::debug!("warning: {}", warning);
        if let Some(callback) = self.on_warning.as_mut() {
            callback(&warning);
        }
        self.warnings.push(warning);
    }

    fn decode(&self, address: u16) -> Instruction {
        self.decoder.decode(&self.memory, address)
    }

    fn attribute_at(&self, address: u16) -> MemAttribute {
        self.memory.attribute_at(address)
    }
}

impl Default for Disassembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Address of the next instruction, `None` past the end of memory.
fn next_address(address: u16, length: u8) -> Option<u16> {
    address.checked_add(length.max(1) as u16)
}
