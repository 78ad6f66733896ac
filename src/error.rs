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

//! Error and warning types for the disassembler.
//!
//! Two kinds of diagnostics exist:
//! - [`DisasmError`] is fatal and reserved for malformed *input files*
//!   (comment files, snapshots, command line addresses).
//! - [`Warning`] is advisory. Properties of the analyzed binary (unassigned
//!   memory, ambiguous decoding, odd recursion) never abort a run.

use std::fmt;
use thiserror::Error;

/// Error codes for the disassembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Comment file errors (E001-E003)
    UnexpectedLine,
    ExpectedAddress,
    ExpectedAfterComment,

    // Input errors (E100-E103)
    CannotReadFile,
    UnknownInputFormat,
    SnapshotTooShort,
    InvalidAddress,

    // Graph errors (E200)
    UnknownGraphLabel,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl ErrorCode {
    /// Get the numeric code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::UnexpectedLine => "E001",
            ErrorCode::ExpectedAddress => "E002",
            ErrorCode::ExpectedAfterComment => "E003",

            ErrorCode::CannotReadFile => "E100",
            ErrorCode::UnknownInputFormat => "E101",
            ErrorCode::SnapshotTooShort => "E102",
            ErrorCode::InvalidAddress => "E103",

            ErrorCode::UnknownGraphLabel => "E200",
        }
    }
}

/// Position of an error inside an input text file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLocation {
    /// Name or path of the file.
    pub file: String,
    /// Line number (1-indexed).
    pub line: usize,
    /// The content of the line.
    pub line_content: String,
}

impl FileLocation {
    /// Create a new file location.
    pub fn new(file: impl Into<String>, line: usize, line_content: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            line_content: line_content.into(),
        }
    }
}

/// A fatal disassembler error.
#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct DisasmError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Where in an input file the error was found, if anywhere.
    pub location: Option<FileLocation>,
    /// Optional hint for fixing the error.
    pub hint: Option<String>,
}

impl DisasmError {
    /// Create a new error without file location.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
            hint: None,
        }
    }

    /// Attach a file location.
    pub fn at(mut self, location: FileLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Add a hint to this error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Get the error code string.
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }
}

/// Result type for disassembler operations.
pub type Result<T> = std::result::Result<T, DisasmError>;

/// Format an error with file context.
pub fn format_error(error: &DisasmError) -> String {
    let mut output = String::new();

    output.push_str(&format!("error[{}]: {}\n", error.code_str(), error.message));

    let mut gutter = 0;
    if let Some(loc) = &error.location {
        output.push_str(&format!("  --> {}:{}\n", loc.file, loc.line));

        gutter = loc.line.to_string().len();
        output.push_str(&format!("{:>width$} |\n", "", width = gutter));
        output.push_str(&format!(
            "{:>width$} | {}\n",
            loc.line,
            loc.line_content,
            width = gutter
        ));
    }

    if let Some(hint) = &error.hint {
        output.push_str(&format!("{:>width$} = hint: {}\n", "", hint, width = gutter));
    }

    output
}

/// Category of a non-fatal diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// Decoding was attempted on memory the loader never supplied.
    UnassignedMemory,
    /// Two decode paths disagree on instruction boundaries.
    AmbiguousDisassembly,
    /// A subroutine is only reached from within itself.
    SelfRecursiveSubroutine,
    /// Output was requested before any disassembly ran.
    NoDisassembly,
}

/// A non-fatal diagnostic produced while analyzing a binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    /// The address the warning refers to.
    pub address: Option<u16>,
    pub message: String,
}

impl Warning {
    /// Create a new warning.
    pub fn new(kind: WarningKind, address: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            address,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Format a warning for terminal output.
pub fn format_warning(warning: &Warning) -> String {
    match warning.address {
        Some(address) => format!("warning[{:04X}h]: {}\n", address, warning.message),
        None => format!("warning: {}\n", warning.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(ErrorCode::UnexpectedLine.code(), "E001");
        assert_eq!(ErrorCode::CannotReadFile.code(), "E100");
        assert_eq!(ErrorCode::UnknownGraphLabel.code(), "E200");
    }

    #[test]
    fn test_disasm_error_display() {
        let error = DisasmError::new(ErrorCode::ExpectedAddress, "Expected an address")
            .with_hint("Start the line with a hex address");

        assert_eq!(error.to_string(), "[E002] Expected an address");
        assert_eq!(error.code_str(), "E002");
        assert!(error.hint.is_some());
    }

    #[test]
    fn test_format_error_with_location() {
        let error = DisasmError::new(ErrorCode::UnexpectedLine, "Unexpected line")
            .at(FileLocation::new("labels.txt", 12, "8000 MAIN ; start x"));

        let text = format_error(&error);
        assert!(text.starts_with("error[E001]: Unexpected line\n"));
        assert!(text.contains("  --> labels.txt:12\n"));
        assert!(text.contains("12 | 8000 MAIN ; start x\n"));
    }

    #[test]
    fn test_format_error_without_location() {
        let error = DisasmError::new(ErrorCode::SnapshotTooShort, "Snapshot too short")
            .with_hint("A .sna file has a 27 byte header");

        let text = format_error(&error);
        assert_eq!(
            text,
            "error[E102]: Snapshot too short\n = hint: A .sna file has a 27 byte header\n"
        );
    }

    #[test]
    fn test_format_warning() {
        let warning = Warning::new(WarningKind::UnassignedMemory, Some(0x8000), "unassigned");
        assert_eq!(format_warning(&warning), "warning[8000h]: unassigned\n");

        let warning = Warning::new(WarningKind::NoDisassembly, None, "nothing");
        assert_eq!(format_warning(&warning), "warning: nothing\n");
    }
}
