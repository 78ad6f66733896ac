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

//! Labels and the arena that owns them.
//!
//! Every other structure (call lists, address parents, statistics) refers to
//! a label through its [`LabelId`], a stable index into [`LabelArena`]. There
//! is at most one live label per address.

use crate::numbertype::NumberType;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Index, IndexMut};

/// Stable handle of a label inside a [`LabelArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(usize);

impl LabelId {
    /// The raw index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A classified address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub id: LabelId,
    pub address: u16,
    pub label_type: NumberType,
    /// Assigned by the naming pass unless given by the user.
    pub name: Option<String>,
    /// Addresses of the instructions that jump to, call or access this label.
    pub references: BTreeSet<u16>,
    /// Labels called from the code block owned by this label.
    pub calls: Vec<LabelId>,
    /// The address lies outside the assigned memory.
    pub is_equ: bool,
    /// Name and classification were given by the user.
    pub is_fixed: bool,
    pub belongs_to_interrupt: bool,
}

impl Label {
    fn new(id: LabelId, address: u16, label_type: NumberType) -> Self {
        Self {
            id,
            address,
            label_type,
            name: None,
            references: BTreeSet::new(),
            calls: Vec::new(),
            is_equ: false,
            is_fixed: false,
            belongs_to_interrupt: false,
        }
    }

    /// The name or an empty string.
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }
}

/// Owner of all labels, indexed by id and by address.
#[derive(Debug, Clone, Default)]
pub struct LabelArena {
    labels: Vec<Label>,
    by_address: BTreeMap<u16, LabelId>,
}

impl LabelArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live labels.
    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    /// Check if there are no live labels.
    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }

    /// Id of the label at `address`.
    pub fn id_at(&self, address: u16) -> Option<LabelId> {
        self.by_address.get(&address).copied()
    }

    /// Label at `address`.
    pub fn at(&self, address: u16) -> Option<&Label> {
        self.id_at(address).map(|id| &self.labels[id.0])
    }

    /// Mutable label at `address`.
    pub fn at_mut(&mut self, address: u16) -> Option<&mut Label> {
        let id = self.id_at(address)?;
        Some(&mut self.labels[id.0])
    }

    /// Type of the label at `address`, if any.
    pub fn type_at(&self, address: u16) -> Option<NumberType> {
        self.at(address).map(|label| label.label_type)
    }

    /// Create a label. An existing label at the same address is replaced.
    pub fn insert(&mut self, address: u16, label_type: NumberType) -> LabelId {
        let id = LabelId(self.labels.len());
        self.labels.push(Label::new(id, address, label_type));
        self.by_address.insert(address, id);
        id
    }

    /// Detach the label at `address` from the address index.
    ///
    /// The label itself stays addressable by id.
    pub fn remove(&mut self, address: u16) -> Option<LabelId> {
        self.by_address.remove(&address)
    }

    /// Live labels in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.by_address.values().map(move |id| &self.labels[id.0])
    }

    /// Snapshot of the live label ids in ascending address order.
    ///
    /// Passes that mutate labels while iterating work on this snapshot.
    pub fn ids(&self) -> Vec<LabelId> {
        self.by_address.values().copied().collect()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.labels.clear();
        self.by_address.clear();
    }
}

impl Index<LabelId> for LabelArena {
    type Output = Label;

    fn index(&self, id: LabelId) -> &Label {
        &self.labels[id.0]
    }
}

impl IndexMut<LabelId> for LabelArena {
    fn index_mut(&mut self, id: LabelId) -> &mut Label {
        &mut self.labels[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut arena = LabelArena::new();
        let id = arena.insert(0x8000, NumberType::CodeSub);

        assert_eq!(arena.len(), 1);
        assert_eq!(arena.id_at(0x8000), Some(id));
        assert_eq!(arena[id].address, 0x8000);
        assert_eq!(arena.type_at(0x8000), Some(NumberType::CodeSub));
        assert!(arena.at(0x8001).is_none());
    }

    #[test]
    fn test_ids_are_stable_and_sorted() {
        let mut arena = LabelArena::new();
        let high = arena.insert(0x9000, NumberType::DataLbl);
        let low = arena.insert(0x1000, NumberType::CodeLbl);

        assert_eq!(arena.ids(), vec![low, high]);
        let addresses: Vec<u16> = arena.iter().map(|label| label.address).collect();
        assert_eq!(addresses, vec![0x1000, 0x9000]);
    }

    #[test]
    fn test_remove_keeps_id_valid() {
        let mut arena = LabelArena::new();
        let id = arena.insert(0x4000, NumberType::DataLbl);
        arena[id].references.insert(0x3000);

        assert_eq!(arena.remove(0x4000), Some(id));
        assert!(arena.is_empty());
        assert!(arena[id].references.contains(&0x3000));
    }
}
