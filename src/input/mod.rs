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

//! Input files of the disassembler.
//!
//! Supported formats:
//! - Raw binaries, loaded at a caller supplied origin
//! - ZX Spectrum snapshots (`.sna`)
//! - MAME traces (`.tr`), which only seed code addresses
//!
//! Comment files are read here as well.

pub mod sna;
pub mod trace;

pub use sna::load_sna;
pub use trace::use_mame_trace;

use crate::comment::{parse_comment_file, CommentEntry};
use crate::disasm::Disassembler;
use crate::error::{DisasmError, ErrorCode, Result};
use std::path::Path;

/// Kind of an input file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Binary,
    Snapshot,
    MameTrace,
}

impl InputFormat {
    /// Detect the format by extension. Unknown extensions are raw binaries.
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("sna") => InputFormat::Snapshot,
            Some("tr") => InputFormat::MameTrace,
            _ => InputFormat::Binary,
        }
    }
}

/// Parse an address argument: `0x8000`, `$8000`, `8000h` or decimal.
pub fn parse_address(text: &str) -> Result<u16> {
    let text = text.trim();
    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('$'))
    {
        (hex, 16)
    } else if let Some(hex) = text.strip_suffix('h').or_else(|| text.strip_suffix('H')) {
        (hex, 16)
    } else {
        (text, 10)
    };

    u32::from_str_radix(digits, radix)
        .ok()
        .and_then(|value| u16::try_from(value).ok())
        .ok_or_else(|| {
            DisasmError::new(
                ErrorCode::InvalidAddress,
                format!("Invalid address: \"{}\"", text),
            )
            .with_hint("Use 0x8000, $8000, 8000h or 32768")
        })
}

/// Read a whole file.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        DisasmError::new(
            ErrorCode::CannotReadFile,
            format!("Cannot read '{}': {}", path.display(), e),
        )
    })
}

/// Load a memory image into the disassembler.
///
/// Raw binaries go to `origin`, snapshots to their fixed address. A MAME
/// trace is no memory image and is rejected.
pub fn load_file(disasm: &mut Disassembler, path: &Path, origin: u16) -> Result<()> {
    match InputFormat::from_path(path) {
        InputFormat::Binary => {
            let data = read_input(path)?;
            log::debug!("Loaded {} bytes at {:04X}h", data.len(), origin);
            disasm.set_memory(origin, &data);
        }
        InputFormat::Snapshot => {
            let data = read_input(path)?;
            load_sna(disasm, &data)?;
        }
        InputFormat::MameTrace => {
            return Err(DisasmError::new(
                ErrorCode::UnknownInputFormat,
                format!("'{}' is a trace, not a memory image", path.display()),
            )
            .with_hint("Pass traces with --trace next to the binary"));
        }
    }
    Ok(())
}

/// Read a MAME trace and seed its addresses.
pub fn use_mame_trace_file(disasm: &mut Disassembler, path: &Path) -> Result<()> {
    let data = read_input(path)?;
    use_mame_trace(disasm, &String::from_utf8_lossy(&data));
    Ok(())
}

/// Read and parse a comment file.
pub fn read_comment_file(path: &Path) -> Result<Vec<CommentEntry>> {
    let data = read_input(path)?;
    parse_comment_file(&String::from_utf8_lossy(&data), &path.display().to_string())
}
