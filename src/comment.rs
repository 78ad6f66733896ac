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

//! Address comments and the user comment file.
//!
//! A comment file consists of entries separated by blank lines:
//!
//! ```text
//! ; lines before the address line
//! 8000 MAIN ; inline comment
//! ; lines after the address line
//!
//! 0x9000 ; another entry without label
//! ```
//!
//! The address is hexadecimal, optionally prefixed by `0x`. A label name
//! after the address names the label (as data label unless the disassembly
//! finds a stronger classification).

use crate::error::{DisasmError, ErrorCode, FileLocation, Result};

/// Comment lines attached to one address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    /// Full lines in front of the statement, including the `;`.
    pub lines_before: Vec<String>,
    /// Text appended to the statement, including the `;`.
    pub inline: Option<String>,
    /// Full lines after the statement.
    pub lines_after: Vec<String>,
}

impl Comment {
    /// Create an empty comment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line in front of the statement.
    pub fn add_before(&mut self, line: impl Into<String>) {
        self.lines_before.push(line.into());
    }

    /// Add a line after the statement.
    pub fn add_after(&mut self, line: impl Into<String>) {
        self.lines_after.push(line.into());
    }

    /// Put `statement` between the comment lines.
    ///
    /// Yields just the statement when there is no comment or comments are
    /// disabled.
    pub fn lines(comment: Option<&Comment>, statement: &str, disable: bool) -> Vec<String> {
        match comment {
            Some(comment) if !disable => {
                let mut lines = comment.lines_before.clone();
                let mut text = statement.to_string();
                if let Some(inline) = comment.inline.as_deref().filter(|s| !s.is_empty()) {
                    text.push('\t');
                    text.push_str(inline);
                }
                lines.push(text);
                lines.extend(comment.lines_after.iter().cloned());
                lines
            }
            _ => vec![statement.to_string()],
        }
    }
}

/// One entry of a comment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentEntry {
    pub address: u16,
    pub label: Option<String>,
    pub comment: Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    LinesBefore,
    LinesAfter,
}

/// Parse the text of a comment file. `file` is only used for error messages.
pub fn parse_comment_file(text: &str, file: &str) -> Result<Vec<CommentEntry>> {
    let mut entries = Vec::new();
    let mut state = State::LinesBefore;
    let mut comment = Comment::new();
    let mut current: Option<(u16, Option<String>)> = None;

    // a trailing blank line finishes the last entry
    for (index, line) in text.lines().chain(std::iter::once("")).enumerate() {
        let location = || FileLocation::new(file, index + 1, line);

        let trimmed = line.trim_start();
        let (address_part, comment_part) = match trimmed.find(';') {
            Some(pos) => (&trimmed[..pos], Some(&trimmed[pos..])),
            None => (trimmed, None),
        };
        let address_part = Some(address_part).filter(|part| !part.trim().is_empty());

        if address_part.is_none() && comment_part.is_none() {
            if let Some((address, label)) = current.take() {
                entries.push(CommentEntry {
                    address,
                    label,
                    comment: std::mem::take(&mut comment),
                });
            }
            state = State::LinesBefore;
            comment = Comment::new();
            continue;
        }

        match (state, address_part) {
            (State::LinesBefore, None) => {
                comment.add_before(comment_part.unwrap_or_default());
            }
            (State::LinesBefore, Some(part)) => {
                let (address, label) = parse_address_line(part).map_err(|code| {
                    let message = match code {
                        ErrorCode::UnexpectedLine => format!("Unexpected line: \"{}\"", line),
                        _ => format!("Expected an address: \"{}\"", line),
                    };
                    DisasmError::new(code, message).at(location())
                })?;
                comment.inline = comment_part.map(str::to_string);
                current = Some((address, label));
                state = State::LinesAfter;
            }
            (State::LinesAfter, None) => {
                comment.add_after(comment_part.unwrap_or_default());
            }
            (State::LinesAfter, Some(_)) => {
                return Err(DisasmError::new(
                    ErrorCode::ExpectedAfterComment,
                    format!("Expected \"after\"-comment or newline: \"{}\"", line),
                )
                .at(location())
                .with_hint("Separate entries by an empty line"));
            }
        }
    }

    Ok(entries)
}

/// Parse `[0x]hex[:] [label]`.
fn parse_address_line(part: &str) -> std::result::Result<(u16, Option<String>), ErrorCode> {
    let part = part.trim();
    let digits_start = if part.len() >= 2 && part[..2].eq_ignore_ascii_case("0x") {
        2
    } else {
        0
    };
    let rest = &part[digits_start..];
    let digits_len = rest
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(rest.len());
    if digits_len == 0 {
        return Err(ErrorCode::ExpectedAddress);
    }
    let address =
        u16::from_str_radix(&rest[..digits_len], 16).map_err(|_| ErrorCode::ExpectedAddress)?;

    let mut rest = &rest[digits_len..];
    if let Some(stripped) = rest.strip_prefix(':') {
        rest = stripped;
    }
    if rest.is_empty() {
        return Ok((address, None));
    }
    if !rest.starts_with(char::is_whitespace) {
        return Err(ErrorCode::UnexpectedLine);
    }

    let label = rest.trim();
    if label.is_empty() {
        return Ok((address, None));
    }
    let is_label = label
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if !is_label {
        return Err(ErrorCode::UnexpectedLine);
    }
    Ok((address, Some(label.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_without_comment() {
        assert_eq!(Comment::lines(None, "SUB1:", false), vec!["SUB1:"]);
    }

    #[test]
    fn test_lines_with_comment() {
        let mut comment = Comment::new();
        comment.add_before("; before");
        comment.inline = Some("; inline".to_string());
        comment.add_after("; after");

        assert_eq!(
            Comment::lines(Some(&comment), "SUB1:", false),
            vec!["; before", "SUB1:\t; inline", "; after"]
        );
        assert_eq!(Comment::lines(Some(&comment), "SUB1:", true), vec!["SUB1:"]);
    }

    #[test]
    fn test_parse_entry() {
        let text = "; before 1\n; before 2\n8000 MAIN ; inline\n; after\n\n0x9000 ; data\n";
        let entries = parse_comment_file(text, "comments.txt").unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].address, 0x8000);
        assert_eq!(entries[0].label.as_deref(), Some("MAIN"));
        assert_eq!(entries[0].comment.lines_before, vec!["; before 1", "; before 2"]);
        assert_eq!(entries[0].comment.inline.as_deref(), Some("; inline"));
        assert_eq!(entries[0].comment.lines_after, vec!["; after"]);

        assert_eq!(entries[1].address, 0x9000);
        assert_eq!(entries[1].label, None);
    }

    #[test]
    fn test_parse_last_entry_without_blank_line() {
        let entries = parse_comment_file("a000 .loop", "c.txt").unwrap();
        assert_eq!(entries[0].address, 0xA000);
        assert_eq!(entries[0].label.as_deref(), Some(".loop"));
        assert_eq!(entries[0].comment.inline, None);
    }

    #[test]
    fn test_expected_address() {
        let error = parse_comment_file("; x\nhello ; y\n", "c.txt").unwrap_err();
        assert_eq!(error.code, ErrorCode::ExpectedAddress);
        let location = error.location.unwrap();
        assert_eq!(location.line, 2);
        assert_eq!(location.file, "c.txt");
    }

    #[test]
    fn test_expected_after_comment() {
        let error = parse_comment_file("8000 A\n8001 B\n", "c.txt").unwrap_err();
        assert_eq!(error.code, ErrorCode::ExpectedAfterComment);
    }

    #[test]
    fn test_unexpected_line() {
        let error = parse_comment_file("8000 A B\n", "c.txt").unwrap_err();
        assert_eq!(error.code, ErrorCode::UnexpectedLine);
    }
}
