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

//! This module abstracts the upstream syntax trees to keep only the fields that we care about.
//!
//! Two tree encodings are accepted, the solidity-parser shape ([`Schema::Legacy`])
//! and the solc compact JSON shape ([`Schema::Compact`]). Each has one adapter
//! implementing [`Lowering`]; everything downstream only sees the normalized
//! nodes defined here. The schema is decided per node from its shape, so no
//! mode flag is needed.

mod blk;
pub use blk::*;

mod compact;
pub use compact::*;

mod decl;
pub use decl::*;

mod func;
pub use func::*;

mod legacy;
pub use legacy::*;

mod schema;
pub use schema::*;

mod source;
pub use source::*;

mod stmt;
pub use stmt::*;

mod types;
pub use types::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// The normalized top-level declarations of one source unit, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceUnitNode {
    /// Pragmas, contracts and the top-level types they may reference.
    pub items: Vec<UnitItem>,
}

impl SourceUnitNode {
    /// Lowers a sequence of raw top-level nodes.
    ///
    /// Values that are not nodes (`null`, bare strings) and nodes the adapters
    /// reject are skipped.
    pub fn lower(nodes: &[Value]) -> Self {
        let items = nodes
            .iter()
            .filter_map(|node| {
                let Some(schema) = Schema::detect(node) else {
                    debug!("skipping top-level value that is not a node");
                    return None;
                };
                schema.lowering().lower_item(node)
            })
            .collect();
        Self { items }
    }

    /// Iterates over the contract definitions.
    pub fn contracts(&self) -> impl Iterator<Item = &ContractNode> {
        self.items.iter().filter_map(|item| match item {
            UnitItem::Contract(contract) => Some(contract),
            _ => None,
        })
    }

    /// Returns the version requirement of the first `pragma solidity`, as written.
    pub fn solidity_pragma(&self) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            UnitItem::Pragma(pragma) if pragma.name == "solidity" => Some(pragma.value.as_str()),
            _ => None,
        })
    }
}

/// Finds the top-level declaration list in a parsed tree.
///
/// Accepts a bare array of nodes, a legacy `SourceUnit` (`children`) or a
/// compact `SourceUnit` (`nodes`). A compiler output wrapping the unit in an
/// `ast` field is unwrapped as well.
pub fn source_unit_nodes(tree: &Value) -> Option<&[Value]> {
    match tree {
        Value::Array(nodes) => Some(nodes),
        Value::Object(object) => {
            if let Some(ast) = object.get("ast").filter(|ast| ast.is_object()) {
                return source_unit_nodes(ast);
            }
            object
                .get("children")
                .or_else(|| object.get("nodes"))
                .and_then(Value::as_array)
                .map(Vec::as_slice)
        }
        _ => None,
    }
}
