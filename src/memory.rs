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

//! The 64K memory image and its per-address attribute map.
//!
//! Addresses are `u16`, so every access wraps at 0x10000. Reading an address
//! the loader never supplied simply yields 0 with no attribute set; deciding
//! what that means is up to the classification engine.

use bitflags::bitflags;

/// Size of the Z80 address space.
pub const MEMORY_SIZE: usize = 0x10000;

bitflags! {
    /// Classification bits stored for each address.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MemAttribute: u8 {
        /// The byte was supplied by the loader.
        const ASSIGNED = 0x01;
        /// The byte belongs to a decoded instruction.
        const CODE = 0x02;
        /// The byte is the first byte of a decoded instruction.
        const CODE_FIRST = 0x04;
        /// The byte was rendered as data.
        const DATA = 0x10;
    }
}

impl MemAttribute {
    /// No attribute at all (memory never assigned).
    pub const UNUSED: MemAttribute = MemAttribute::empty();
}

/// A memory image plus one attribute byte per address.
#[derive(Clone)]
pub struct Memory {
    values: Vec<u8>,
    attributes: Vec<MemAttribute>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let assigned = self
            .attributes
            .iter()
            .filter(|attr| attr.contains(MemAttribute::ASSIGNED))
            .count();
        f.debug_struct("Memory")
            .field("assigned_bytes", &assigned)
            .finish()
    }
}

impl Memory {
    /// Create an empty (fully unassigned) memory.
    pub fn new() -> Self {
        Self {
            values: vec![0; MEMORY_SIZE],
            attributes: vec![MemAttribute::UNUSED; MEMORY_SIZE],
        }
    }

    /// Copy `bytes` to `origin` and mark them as assigned.
    ///
    /// Data running past 0xFFFF wraps around to 0x0000.
    pub fn set_memory(&mut self, origin: u16, bytes: &[u8]) {
        let mut address = origin;
        for &byte in bytes.iter().take(MEMORY_SIZE) {
            let index = address as usize;
            self.values[index] = byte;
            self.attributes[index] |= MemAttribute::ASSIGNED;
            address = address.wrapping_add(1);
        }
    }

    /// Read a byte.
    pub fn value_at(&self, address: u16) -> u8 {
        self.values[address as usize]
    }

    /// Read a little endian word.
    pub fn word_at(&self, address: u16) -> u16 {
        let lo = self.value_at(address) as u16;
        let hi = self.value_at(address.wrapping_add(1)) as u16;
        lo | (hi << 8)
    }

    /// Read a big endian word.
    pub fn big_endian_word_at(&self, address: u16) -> u16 {
        let hi = self.value_at(address) as u16;
        let lo = self.value_at(address.wrapping_add(1)) as u16;
        lo | (hi << 8)
    }

    /// Get the attribute bits of an address.
    pub fn attribute_at(&self, address: u16) -> MemAttribute {
        self.attributes[address as usize]
    }

    /// Check whether the loader supplied this address.
    pub fn is_assigned(&self, address: u16) -> bool {
        self.attribute_at(address).contains(MemAttribute::ASSIGNED)
    }

    /// Add `attr` to `len` consecutive addresses.
    pub fn add_attribute_at(&mut self, address: u16, len: usize, attr: MemAttribute) {
        let mut address = address;
        for _ in 0..len {
            self.attributes[address as usize] |= attr;
            address = address.wrapping_add(1);
        }
    }

    /// Overwrite the attributes of `len` consecutive addresses.
    pub fn set_attributes_at(&mut self, address: u16, len: usize, attr: MemAttribute) {
        let mut address = address;
        for _ in 0..len {
            self.attributes[address as usize] = attr;
            address = address.wrapping_add(1);
        }
    }

    /// Reset code/data classification of a range back to bare `ASSIGNED`.
    ///
    /// Addresses that were never assigned stay unused.
    pub fn clear_assigned_attributes_at(&mut self, address: u16, len: usize) {
        let mut address = address;
        for _ in 0..len {
            let attr = &mut self.attributes[address as usize];
            if !attr.is_empty() {
                *attr = MemAttribute::ASSIGNED;
            }
            address = address.wrapping_add(1);
        }
    }
}
