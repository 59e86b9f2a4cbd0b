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
use serde_json::Value;

use super::{Blk, SourceRange};

/// A function or modifier definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallableNode {
    /// The name, with constructors, fallback and receive functions named
    /// `constructor`, `fallback` and `receive`.
    pub name: String,
    /// Function, modifier, or one of the special functions.
    pub kind: CallableKind,
    /// Location of the definition in the source file.
    pub src: Option<SourceRange>,
    /// The callable body. A function may not have body if it is virtual and not implemented.
    pub body: Option<Blk>,
    /// The untouched definition node, for consumers that need more than this summary.
    pub raw: Value,
}

/// What kind of callable a definition is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum CallableKind {
    /// An ordinary named function.
    #[display("function")]
    Function,
    /// The constructor.
    #[display("constructor")]
    Constructor,
    /// The fallback function.
    #[display("fallback")]
    Fallback,
    /// The receive function.
    #[display("receive")]
    Receive,
    /// A function modifier.
    #[display("modifier")]
    Modifier,
}

impl CallableKind {
    /// Returns whether this callable is a function of any kind (i.e., not a modifier).
    pub fn is_function(&self) -> bool {
        !matches!(self, Self::Modifier)
    }
}
