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

use std::fmt;

use serde::{Deserialize, Serialize};

/// Abstracted type-name AST node.
///
/// Both schemas describe a declared type as a small tree (array of mapping of
/// struct, ...). Only the shape and the names survive lowering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeNameNode {
    /// A primitive type such as `uint256`, `address` or `bytes32`.
    Elementary {
        /// The type keyword.
        name: String,
    },
    /// A reference to a struct, enum, contract or user-defined value type.
    UserDefined {
        /// The path as written, e.g. `Lib.Position`.
        path: String,
        /// Whether the schema itself already tells us this is an enum.
        enum_hint: bool,
    },
    /// `mapping(key => value)`.
    Mapping {
        /// The key type.
        key: Box<TypeNameNode>,
        /// The value type.
        value: Box<TypeNameNode>,
    },
    /// One array dimension wrapping `base`. Nested arrays nest inner-to-outer,
    /// i.e. for `uint[2][3]` the outermost node has length 3.
    Array {
        /// The element type.
        base: Box<TypeNameNode>,
        /// `None` for a dynamic dimension.
        length: Option<ArrayLength>,
    },
    /// A function type.
    Function,
    /// A shape the facade does not understand.
    Unknown {
        /// The node's kind tag.
        kind: String,
    },
}

impl TypeNameNode {
    /// Returns the name of this type as written in source, if it has one.
    ///
    /// Mapping and array types have no name of their own.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Elementary { name } => Some(name),
            Self::UserDefined { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for TypeNameNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elementary { name } => write!(f, "{name}"),
            Self::UserDefined { path, .. } => write!(f, "{path}"),
            Self::Mapping { key, value } => write!(f, "mapping({key} => {value})"),
            Self::Array { base, length: Some(length) } => write!(f, "{base}[{length}]"),
            Self::Array { base, length: None } => write!(f, "{base}[]"),
            Self::Function => write!(f, "function"),
            Self::Unknown { kind } => write!(f, "<{kind}>"),
        }
    }
}

/// Length expression of a fixed-size array dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum ArrayLength {
    /// A literal number, e.g. `uint[4]`.
    Literal(String),
    /// A named constant, e.g. `uint[MAX_SLOTS]`.
    Constant(String),
}

/// Returns the last `.`-separated segment of a qualified name.
pub fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("Lib.Inner.Position"), "Position");
        assert_eq!(last_segment("Position"), "Position");
        assert_eq!(last_segment(""), "");
    }

    #[test]
    fn test_type_name() {
        let elementary = TypeNameNode::Elementary { name: "uint256".into() };
        assert_eq!(elementary.name(), Some("uint256"));

        let mapping = TypeNameNode::Mapping {
            key: Box::new(elementary.clone()),
            value: Box::new(elementary),
        };
        assert_eq!(mapping.name(), None);
        assert_eq!(mapping.to_string(), "mapping(uint256 => uint256)");
    }

    #[test]
    fn test_display_nested_array() {
        // uint8[2][] : the outermost node is the dynamic dimension.
        let ty = TypeNameNode::Array {
            base: Box::new(TypeNameNode::Array {
                base: Box::new(TypeNameNode::Elementary { name: "uint8".into() }),
                length: Some(ArrayLength::Literal("2".into())),
            }),
            length: None,
        };
        assert_eq!(ty.to_string(), "uint8[2][]");
    }
}
