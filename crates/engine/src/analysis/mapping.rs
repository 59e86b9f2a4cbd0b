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

//! Detection of writes to mapping state variables.
//!
//! A write is an assignment whose left-hand side is an index-access chain
//! rooted at an identifier naming a visible mapping, e.g.
//! `allowance[owner][msg.sender] -= amount`. For every such write a
//! [`MappingWriteRecord`] captures the key expressions from the outermost to
//! the innermost index.
//!
//! Only expression statements and the bodies of `if` and `for` statements are
//! visited. Other compound statements are not descended into.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    analysis::{ContractDetail, FunctionRecord},
    ast::{Blk, Expr, Stmt},
    MappingScope,
};

/// A mapping state variable and the display name of its key type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MappingDeclaration {
    /// Variable name.
    pub name: String,
    /// Key type as written, e.g. `address`.
    pub key_type: String,
}

/// Resolves which mapping names are visible to a contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRegistry {
    scope: MappingScope,
    /// Every mapping declared in the source unit.
    all: BTreeSet<String>,
    /// Mappings declared up to and including each contract, in unit order.
    #[serde(skip)]
    declared_so_far: BTreeMap<String, BTreeSet<String>>,
}

impl MappingRegistry {
    /// Builds the registry from fully aggregated contracts.
    ///
    /// `unit_order` lists the contract names in the order they appear in the
    /// source unit; it decides what [`MappingScope::Global`] makes visible.
    pub fn build<'a>(
        unit_order: impl IntoIterator<Item = &'a str>,
        details: &BTreeMap<String, ContractDetail>,
        scope: MappingScope,
    ) -> Self {
        let mut seen = BTreeSet::new();
        let mut declared_so_far = BTreeMap::new();
        for name in unit_order {
            if let Some(detail) = details.get(name) {
                seen.extend(detail.mapping_declarations.iter().map(|m| m.name.clone()));
            }
            declared_so_far.entry(name.to_string()).or_insert_with(|| seen.clone());
        }
        Self { scope, all: seen, declared_so_far }
    }

    /// The configured scope.
    pub fn scope(&self) -> MappingScope {
        self.scope
    }

    /// All mapping names declared in the source unit.
    pub fn names(&self) -> &BTreeSet<String> {
        &self.all
    }

    /// The mapping names a contract's functions may write to.
    pub fn visible_to(
        &self,
        contract: &ContractDetail,
        details: &BTreeMap<String, ContractDetail>,
    ) -> BTreeSet<String> {
        match self.scope {
            MappingScope::Global => {
                self.declared_so_far.get(&contract.name).cloned().unwrap_or_default()
            }
            MappingScope::PerContract => std::iter::once(contract)
                .chain(contract.parents.iter().filter_map(|parent| details.get(parent)))
                .flat_map(|detail| detail.mapping_declarations.iter().map(|m| m.name.clone()))
                .collect(),
        }
    }
}

/// One detected write to a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappingWriteRecord {
    /// Contract owning the writing function.
    pub contract: String,
    /// Writing function or modifier.
    pub function: String,
    /// The mapping written to.
    pub mapping: String,
    /// The function name followed by the rendered index keys, outermost first.
    pub key_path: Vec<String>,
}

/// Outcome of analyzing one callable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallableWrites {
    /// Whether any assignment targets a visible mapping.
    pub writes_mapping: bool,
    /// Writes whose keys could all be rendered.
    pub records: Vec<MappingWriteRecord>,
}

/// Walks callable bodies of one contract looking for mapping writes.
#[derive(Debug, Clone, Copy)]
pub struct MappingWriteAnalyzer<'a> {
    contract: &'a str,
    mappings: &'a BTreeSet<String>,
}

impl<'a> MappingWriteAnalyzer<'a> {
    /// Creates an analyzer for `contract` with the given visible mapping names.
    pub fn new(contract: &'a str, mappings: &'a BTreeSet<String>) -> Self {
        Self { contract, mappings }
    }

    /// Analyzes every callable of a contract, in declaration order.
    pub fn analyze_contract(&self, detail: &ContractDetail) -> Vec<CallableWrites> {
        detail.functions.iter().map(|function| self.analyze_callable(function)).collect()
    }

    /// Analyzes one callable.
    pub fn analyze_callable(&self, function: &FunctionRecord) -> CallableWrites {
        let mut writes = CallableWrites::default();
        if let Some(body) = &function.body {
            self.walk_block(&function.name, body, &mut writes);
        }
        if writes.writes_mapping {
            debug!(
                contract = self.contract,
                function = %function.name,
                records = writes.records.len(),
                "function writes mapping"
            );
        }
        writes
    }

    fn walk_block(&self, function: &str, block: &Blk, writes: &mut CallableWrites) {
        for stmt in &block.body {
            match stmt {
                Stmt::Expression(expr) => self.visit_expression(function, expr, writes),
                Stmt::If(stmt) => {
                    self.walk_block(function, &stmt.true_branch, writes);
                    if let Some(false_branch) = &stmt.false_branch {
                        self.walk_block(function, false_branch, writes);
                    }
                }
                Stmt::For(stmt) => self.walk_block(function, &stmt.body, writes),
                Stmt::Other { kind } => trace!(function, kind, "not descending into statement"),
            }
        }
    }

    fn visit_expression(&self, function: &str, expr: &Expr, writes: &mut CallableWrites) {
        let Expr::Assignment { lhs, .. } = expr else { return };
        if !matches!(lhs.as_ref(), Expr::IndexAccess { .. }) {
            return;
        }

        let mut cursor = lhs.as_ref();
        while let Expr::IndexAccess { base, .. } = cursor {
            cursor = base.as_ref();
        }
        let Expr::Identifier(root) = cursor else {
            trace!(function, "index-access chain not rooted at an identifier");
            return;
        };
        if !self.mappings.contains(root) {
            return;
        }
        writes.writes_mapping = true;

        let mut keys = Vec::new();
        let mut cursor = lhs.as_ref();
        while let Expr::IndexAccess { base, index } = cursor {
            let Some(key) = index.as_deref().and_then(render_key) else {
                debug!(
                    contract = self.contract,
                    function,
                    mapping = %root,
                    "dropping mapping write with an unrenderable key"
                );
                return;
            };
            keys.push(key);
            cursor = base.as_ref();
        }
        // The chain was walked from the last index to the first.
        keys.reverse();

        let mut key_path = Vec::with_capacity(keys.len() + 1);
        key_path.push(function.to_string());
        key_path.extend(keys);
        writes.records.push(MappingWriteRecord {
            contract: self.contract.to_string(),
            function: function.to_string(),
            mapping: root.clone(),
            key_path,
        });
    }
}

/// Renders an index expression as a key: identifiers and member-access chains
/// as dotted paths, literals as written.
pub fn render_key(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Literal(text) => Some(text.clone()),
        expr => expr.dotted_path(),
    }
}
