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

//! Text helpers shared by the listing and the graph renderers.
//!
//! Hex numbers are always upper case and zero padded.

use crate::config::ColumnWidths;
use crate::memory::Memory;

/// Upper case hex string with at least `digits` digits.
pub fn hex(value: u32, digits: usize) -> String {
    format!("{:0width$X}", value, width = digits)
}

/// Four digit hex string of an address.
pub fn hex4(value: u16) -> String {
    hex(value as u32, 4)
}

/// Two digit hex string of a byte.
pub fn hex2(value: u8) -> String {
    hex(value as u32, 2)
}

/// Address conversion used in comments, e.g. `FA20h`.
pub fn address_conversion(value: u16) -> String {
    format!("{}h", hex4(value))
}

/// Left-pad `text` with `fill` up to `width` characters.
pub fn fill_digits(text: &str, fill: char, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let mut result: String = std::iter::repeat(fill).take(width - len).collect();
    result.push_str(text);
    result
}

/// Right-pad `text` with spaces up to `width` characters.
pub fn add_spaces(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}

/// Decimal, signed and ASCII view of a byte, e.g. `32, ' '` or `255,   -1`.
pub fn byte_conversions(value: u8) -> String {
    let mut result = value.to_string();
    if value >= 0x80 {
        let signed = (value as i8).to_string();
        result.push_str(", ");
        result.push_str(&fill_digits(&signed, ' ', 4));
    }
    if (32..=126).contains(&value) {
        result.push_str(&format!(", '{}'", value as char));
    }
    result
}

/// Decimal and signed view of a word, e.g. `62333,  -3203`.
pub fn word_conversions(value: u16) -> String {
    let mut result = value.to_string();
    if value >= 0x8000 {
        let signed = (value as i16).to_string();
        result.push_str(", ");
        result.push_str(&fill_digits(&signed, ' ', 6));
    }
    result
}

/// Lay out one listing line: address, opcode bytes and instruction text.
///
/// The opcode bytes are left out when `memory` is `None`.
pub fn format_disassembly(
    memory: Option<&Memory>,
    columns: &ColumnWidths,
    address: u16,
    size: usize,
    main: &str,
) -> String {
    let mut line = String::new();

    if columns.address > 0 {
        line = add_spaces(&format!("{} ", hex4(address)), columns.address);
    }

    let mut bytes = String::new();
    if let Some(memory) = memory {
        let mut addr = address;
        for _ in 0..size {
            bytes.push_str(&hex2(memory.value_at(addr)));
            bytes.push(' ');
            addr = addr.wrapping_add(1);
        }
    }
    line.push_str(&add_spaces(&bytes, columns.bytes));

    // the joining space counts towards the first column
    let mut parts: Vec<String> = main.split(' ').map(str::to_string).collect();
    if let Some(first) = parts.first_mut() {
        *first = add_spaces(first, columns.opcode_first_part.saturating_sub(1));
    }
    let joined = format!("{} ", parts.join(" "));
    line.push_str(&add_spaces(&joined, columns.opcode_total));

    line
}

/// Escape a string for use inside a quoted DOT label or identifier.
pub fn escape_dot(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
}
