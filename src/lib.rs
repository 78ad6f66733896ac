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

//! Zdisasm Library
//!
//! A static disassembler for Z80 binaries that reconstructs the control
//! flow: entry points, subroutines, local labels, loops and data areas.
//!
//! # Modules
//!
//! - [`error`] - Error types, warnings and error reporting
//! - [`memory`] - The 64K memory image and its per-address attributes
//! - [`decoder`] - Instruction decoding, the built-in [`Z80Decoder`]
//! - [`disasm`] - The [`Disassembler`] and its analysis passes
//! - [`input`] - Binaries, snapshots, traces and comment files
//! - [`format`] - Number formatting used by the listing
//!
//! # Example
//!
//! ```no_run
//! use zdisasm::{Disassembler, NumberType};
//!
//! let mut disasm = Disassembler::new();
//! disasm.set_memory(0x8000, &[0xcd, 0x04, 0x80, 0xc9, 0xc9]);
//! disasm.set_label(0x8000, Some("MAIN"), NumberType::CodeSub);
//! disasm.disassemble();
//!
//! println!("{}", disasm.disassembly_text());
//! ```

pub mod comment;
pub mod config;
pub mod decoder;
pub mod disasm;
pub mod error;
pub mod format;
pub mod input;
pub mod label;
pub mod memory;
pub mod numbertype;

// Re-export commonly used types
pub use comment::{Comment, CommentEntry};
pub use config::DisasmConfig;
pub use decoder::{Decoder, Instruction, OpcodeFlags, Z80Decoder};
pub use disasm::{
    CallGraphRenderer, Disassembler, FlowChartRenderer, GraphTarget, LabelComments,
    ListingRenderer, SubroutineStatistics,
};
pub use error::{format_error, format_warning, DisasmError, ErrorCode, Result, Warning, WarningKind};
pub use label::{Label, LabelId};
pub use memory::{MemAttribute, Memory};
pub use numbertype::NumberType;

/// The version of zdisasm.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of the disassembler.
pub const NAME: &str = "zdisasm";

/// Disassemble a binary and return the listing.
///
/// This runs the whole pipeline with the default configuration.
///
/// # Arguments
///
/// * `origin` - Address the first byte is loaded to
/// * `bytes` - The binary
/// * `entries` - Known code entry points
///
/// Warnings are dropped here. Use [`Disassembler`] directly to see them.
pub fn disassemble(origin: u16, bytes: &[u8], entries: &[u16]) -> String {
    let mut disasm = Disassembler::new();
    disasm.set_memory(origin, bytes);
    for entry in entries {
        disasm.set_fixed_code_label(*entry, None);
    }
    disasm.disassemble();
    disasm.disassembly_text()
}
