// Solsema - Solidity Semantic Model
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A source range is a range of characters in a source file.
///
/// The solc schema stores it as a `start:length:file` string; the legacy
/// parser (when asked for ranges) stores an inclusive `[start, end]` pair and
/// knows nothing about files, in which case `file` is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    /// The start index of this source range.
    pub start: usize,
    /// The length of this source range.
    pub length: usize,
    /// The index of the file of this source range.
    pub file: u32,
}

impl SourceRange {
    /// Builds a range from the legacy inclusive `[start, end]` pair.
    ///
    /// Returns `None` if `end` precedes `start` or the length does not fit.
    pub fn from_inclusive(start: usize, end: usize) -> Option<Self> {
        let length = end.checked_sub(start)?.checked_add(1)?;
        Some(Self { start, length, file: 0 })
    }
}

impl FromStr for SourceRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let mut next = |what: &str| {
            parts
                .next()
                .ok_or_else(|| format!("missing {what} in source range `{s}`"))?
                .parse::<i64>()
                .map_err(|e| format!("invalid {what} in source range `{s}`: {e}"))
        };
        let start = next("start")?;
        let length = next("length")?;
        let file = next("file")?;
        if start < 0 || length < 0 || file < 0 {
            return Err(format!("unresolved source range `{s}`"));
        }
        let out_of_range = |what: &str| format!("{what} out of range in source range `{s}`");
        Ok(Self {
            start: usize::try_from(start).map_err(|_| out_of_range("start"))?,
            length: usize::try_from(length).map_err(|_| out_of_range("length"))?,
            file: u32::try_from(file).map_err(|_| out_of_range("file"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compact_src() {
        let src: SourceRange = "12:30:1".parse().unwrap();
        assert_eq!(src, SourceRange { start: 12, length: 30, file: 1 });
    }

    #[test]
    fn test_parse_unresolved_src() {
        assert!("-1:-1:-1".parse::<SourceRange>().is_err());
        assert!("12:30".parse::<SourceRange>().is_err());
        assert!("a:b:c".parse::<SourceRange>().is_err());
        assert!("0:1:4294967296".parse::<SourceRange>().is_err());
    }

    #[test]
    fn test_inclusive_range() {
        assert_eq!(
            SourceRange::from_inclusive(5, 9),
            Some(SourceRange { start: 5, length: 5, file: 0 })
        );
        assert_eq!(SourceRange::from_inclusive(9, 5), None);
        assert_eq!(SourceRange::from_inclusive(0, usize::MAX), None);
        assert_eq!(
            SourceRange::from_inclusive(1, usize::MAX),
            Some(SourceRange { start: 1, length: usize::MAX, file: 0 })
        );
    }
}
