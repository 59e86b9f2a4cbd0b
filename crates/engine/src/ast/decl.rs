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

use serde::{Deserialize, Serialize};

use super::{CallableNode, TypeNameNode};

/// Top-level declaration of a source unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitItem {
    /// A pragma directive.
    Pragma(PragmaNode),
    /// A contract, interface or library definition.
    Contract(ContractNode),
    /// A file-level struct.
    Struct(StructNode),
    /// A file-level enum.
    Enum(EnumNode),
    /// Imports, free functions, events, ... Nothing this crate resolves.
    Other {
        /// The node's kind tag.
        kind: String,
    },
}

/// A pragma directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PragmaNode {
    /// Pragma name, e.g. `solidity` or `abicoder`.
    pub name: String,
    /// Everything after the name, e.g. `^0.8.0`.
    pub value: String,
}

/// A contract, interface or library definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractNode {
    /// Contract name.
    pub name: String,
    /// Contract kind.
    pub kind: ContractKind,
    /// Immediate base names in declaration order, as written.
    pub bases: Vec<String>,
    /// Sub-declarations in declaration order.
    pub members: Vec<ContractMember>,
}

/// The keyword a contract is declared with.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    /// `contract`
    #[default]
    #[display("contract")]
    Contract,
    /// `abstract contract`
    #[display("abstract")]
    Abstract,
    /// `interface`
    #[display("interface")]
    Interface,
    /// `library`
    #[display("library")]
    Library,
}

/// A sub-declaration of a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContractMember {
    /// One declared state variable.
    StateVariable(VarDecl),
    /// A struct nested in the contract.
    Struct(StructNode),
    /// An enum nested in the contract.
    Enum(EnumNode),
    /// A function or modifier.
    Callable(CallableNode),
    /// Events, errors, using-for directives and the like.
    Other {
        /// The node's kind tag.
        kind: String,
    },
}

/// A struct definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructNode {
    /// Struct name.
    pub name: String,
    /// Struct members in declaration order.
    pub members: Vec<VarDecl>,
}

/// An enum definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumNode {
    /// Enum name.
    pub name: String,
    /// Enum value names in declaration order.
    pub values: Vec<String>,
}

/// A variable declaration: a state variable or a struct member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    /// Variable name.
    pub name: String,
    /// `None` when the declaration carries no type name we could read.
    pub ty: Option<TypeNameNode>,
    /// The declared type as text (`uint256`, `string`, `IERC20`, ...).
    pub type_string: Option<String>,
    /// Whether it is declared `constant` or `immutable`.
    pub mutability: Mutability,
    /// What the declaration is initialized with.
    pub initializer: Initializer,
}

/// How a state variable may change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
    /// An ordinary variable.
    #[default]
    Mutable,
    /// `constant`
    Constant,
    /// `immutable`
    Immutable,
}

/// The initializer expression of a variable declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Initializer {
    /// No initializer.
    #[default]
    None,
    /// A number or string literal (unicode and hex strings included).
    Literal(String),
    /// Anything else, including bool literals.
    Expression,
}

impl Initializer {
    /// Returns the literal text, if the initializer is a literal.
    pub fn literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }
}
