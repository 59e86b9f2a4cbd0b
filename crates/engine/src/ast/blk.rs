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

use super::Stmt;

/// An AST block: the statements wrapped by `{` and `}`.
///
/// A branch or loop body that is a single statement without braces is
/// lowered into a block holding just that statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blk {
    /// Statements in source order.
    pub body: Vec<Stmt>,
}

impl Blk {
    /// Creates a block from its statements.
    pub fn new(body: Vec<Stmt>) -> Self {
        Self { body }
    }
}
