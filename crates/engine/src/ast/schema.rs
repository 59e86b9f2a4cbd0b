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

use super::{
    Blk, CompactLowering, ContractMember, Expr, LegacyLowering, Stmt, TypeNameNode, UnitItem,
};

/// The upstream tree encoding a node is written in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    /// solidity-parser shape: `type`, `subNodes`, `namePath`, `TrueBody`.
    #[display("legacy")]
    Legacy,
    /// solc shape: `nodeType`, `nodes`, `pathNode`, `typeDescriptions`.
    #[display("compact")]
    Compact,
}

impl Schema {
    /// Decides the schema from the node's own shape.
    ///
    /// Returns `None` for values that are not nodes at all (`null`, `";"`,
    /// objects without a kind tag).
    pub fn detect(node: &Value) -> Option<Self> {
        let object = node.as_object()?;
        if object.get("nodeType").and_then(Value::as_str).is_some() {
            Some(Self::Compact)
        } else if object.get("type").and_then(Value::as_str).is_some() {
            Some(Self::Legacy)
        } else {
            None
        }
    }

    /// The adapter lowering nodes of this schema.
    pub fn lowering(self) -> &'static dyn Lowering {
        match self {
            Self::Legacy => &LegacyLowering,
            Self::Compact => &CompactLowering,
        }
    }
}

/// Converts raw nodes of one schema into the normalized shapes of this module.
///
/// Implementations never fail: anything they cannot read degrades to an empty
/// collection, an `Other`/`Unknown` variant, or `None` for a skipped node.
pub trait Lowering: Send + Sync {
    /// The schema this adapter reads.
    fn schema(&self) -> Schema;

    /// Returns the kind tag of a node (`ContractDefinition`, `Block`, ...).
    fn kind<'a>(&self, node: &'a Value) -> Option<&'a str>;

    /// Lowers a top-level declaration. `None` means the node was skipped.
    fn lower_item(&self, node: &Value) -> Option<UnitItem>;

    /// Lowers the sub-declarations of a contract definition.
    fn lower_members(&self, contract: &Value) -> Vec<ContractMember>;

    /// Lowers a type-name node.
    fn lower_type_name(&self, node: &Value) -> TypeNameNode;

    /// Lowers a statement. `None` means the node was skipped.
    fn lower_statement(&self, node: &Value) -> Option<Stmt>;

    /// Lowers an expression.
    fn lower_expression(&self, node: &Value) -> Expr;

    /// Lowers a block, or a single statement standing in for one.
    fn lower_block(&self, node: &Value) -> Blk {
        match self.kind(node) {
            Some("Block") | Some("UncheckedBlock") => Blk::new(
                items(node, "statements")
                    .iter()
                    .filter_map(|stmt| self.lower_statement(stmt))
                    .collect(),
            ),
            Some(_) => Blk::new(self.lower_statement(node).into_iter().collect()),
            None => Blk::default(),
        }
    }
}

/// Returns the string field `key` of `node`.
pub(crate) fn str_of<'a>(node: &'a Value, key: &str) -> Option<&'a str> {
    node.get(key).and_then(Value::as_str)
}

/// Returns the array field `key` of `node`, or an empty slice.
pub(crate) fn items<'a>(node: &'a Value, key: &str) -> &'a [Value] {
    node.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default()
}

/// Returns the boolean field `key` of `node`, `false` when absent.
pub(crate) fn flag(node: &Value, key: &str) -> bool {
    node.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Returns the field `key` of `node` unless it is absent or `null`.
pub(crate) fn child<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    node.get(key).filter(|value| !value.is_null())
}

/// Renders a scalar JSON value (a number literal may arrive as either) as text.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
