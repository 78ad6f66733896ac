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

//! Classification of addresses and operand values.
//!
//! [`NumberType`] is both a kind tag (what an operand or label *is*) and a
//! priority: when an address is reached in several roles the label keeps the
//! maximum. The order is defined by [`NumberType::priority`], never by the
//! position of a variant in the enum.

use std::cmp::Ordering;
use std::fmt;

/// Kind of an operand value or a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NumberType {
    /// No value at all.
    #[default]
    None,
    /// Address of data (e.g. `LD A,(nn)`).
    DataLbl,
    /// An I/O port.
    PortLbl,
    /// Target of a relative jump.
    CodeLocalLbl,
    /// Target of a relative jump backwards (a loop).
    CodeLocalLoop,
    /// Target of an absolute jump.
    CodeLbl,
    /// Target of a call.
    CodeSub,
    /// Target of a restart.
    CodeRst,
    /// Displacement of `(IX+d)` / `(IY+d)`.
    RelativeIndex,
    /// Immediate byte.
    NumberByte,
    /// Immediate little endian word.
    NumberWord,
    /// Immediate big endian word.
    NumberWordBigEndian,
}

impl NumberType {
    /// Position in the promotion order. Higher wins.
    pub fn priority(self) -> u8 {
        match self {
            NumberType::None => 0,
            NumberType::DataLbl => 1,
            NumberType::PortLbl => 2,
            NumberType::CodeLocalLbl => 3,
            NumberType::CodeLocalLoop => 4,
            NumberType::CodeLbl => 5,
            NumberType::CodeSub => 6,
            NumberType::CodeRst => 7,
            NumberType::RelativeIndex => 8,
            NumberType::NumberByte => 9,
            NumberType::NumberWord => 10,
            NumberType::NumberWordBigEndian => 11,
        }
    }

    /// Labels that stand for a code address (branch targets).
    pub fn is_code(self) -> bool {
        matches!(
            self,
            NumberType::CodeLbl
                | NumberType::CodeLocalLbl
                | NumberType::CodeLocalLoop
                | NumberType::CodeRst
                | NumberType::CodeSub
        )
    }

    /// Labels that own a block of code: subroutines, restarts and jump labels.
    pub fn is_top_level(self) -> bool {
        matches!(
            self,
            NumberType::CodeSub | NumberType::CodeRst | NumberType::CodeLbl
        )
    }

    /// Subroutines and restarts.
    pub fn is_subroutine(self) -> bool {
        matches!(self, NumberType::CodeSub | NumberType::CodeRst)
    }

    /// Local labels and loops.
    pub fn is_local(self) -> bool {
        matches!(self, NumberType::CodeLocalLbl | NumberType::CodeLocalLoop)
    }
}

impl PartialOrd for NumberType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NumberType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority().cmp(&other.priority())
    }
}

impl fmt::Display for NumberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NumberType::None => "NONE",
            NumberType::DataLbl => "DATA_LBL",
            NumberType::PortLbl => "PORT_LBL",
            NumberType::CodeLocalLbl => "CODE_LOCAL_LBL",
            NumberType::CodeLocalLoop => "CODE_LOCAL_LOOP",
            NumberType::CodeLbl => "CODE_LBL",
            NumberType::CodeSub => "CODE_SUB",
            NumberType::CodeRst => "CODE_RST",
            NumberType::RelativeIndex => "RELATIVE_INDEX",
            NumberType::NumberByte => "NUMBER_BYTE",
            NumberType::NumberWord => "NUMBER_WORD",
            NumberType::NumberWordBigEndian => "NUMBER_WORD_BIG_ENDIAN",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_order() {
        assert!(NumberType::DataLbl < NumberType::PortLbl);
        assert!(NumberType::PortLbl < NumberType::CodeLocalLbl);
        assert!(NumberType::CodeLocalLbl < NumberType::CodeLocalLoop);
        assert!(NumberType::CodeLocalLoop < NumberType::CodeLbl);
        assert!(NumberType::CodeLbl < NumberType::CodeSub);
        assert!(NumberType::CodeSub < NumberType::CodeRst);
    }

    #[test]
    fn test_max_promotes() {
        assert_eq!(
            NumberType::CodeLbl.max(NumberType::CodeSub),
            NumberType::CodeSub
        );
        assert_eq!(
            NumberType::CodeRst.max(NumberType::DataLbl),
            NumberType::CodeRst
        );
    }

    #[test]
    fn test_categories() {
        assert!(NumberType::CodeLocalLoop.is_code());
        assert!(!NumberType::DataLbl.is_code());
        assert!(NumberType::CodeLbl.is_top_level());
        assert!(!NumberType::CodeLocalLbl.is_top_level());
        assert!(NumberType::CodeRst.is_subroutine());
        assert!(NumberType::CodeLocalLbl.is_local());
    }

    #[test]
    fn test_display() {
        assert_eq!(NumberType::CodeSub.to_string(), "CODE_SUB");
    }
}
