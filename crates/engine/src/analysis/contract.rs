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

//! Per-contract aggregation of functions, state variables, parents and
//! mapping declarations.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, trace, warn};

use crate::{
    analysis::{
        InheritanceError, Linearization, MappingDeclaration, ResolvedVariable, TypeDescriptor,
        TypeRegistry,
    },
    ast::{
        Blk, CallableKind, CallableNode, ContractKind, ContractMember, ContractNode, Mutability,
        SourceRange, SourceUnitNode, UnitItem, VarDecl,
    },
};

/// Everything known about a single contract after aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDetail {
    /// Contract name.
    pub name: String,
    /// Contract, abstract contract, interface or library.
    pub kind: ContractKind,
    /// Names of own and inherited functions. Modifiers are not included.
    pub function_names: BTreeSet<String>,
    /// Inherited state variables, gathered from the ancestors in linearization
    /// order without duplicates, followed by own state variables in declaration
    /// order.
    pub state_variables: Vec<ResolvedVariable>,
    /// Linearized ancestors, nearest first.
    pub parents: Vec<String>,
    /// Mapping state variables declared by this contract itself.
    pub mapping_declarations: Vec<MappingDeclaration>,
    /// Own functions and modifiers in declaration order.
    pub functions: Vec<FunctionRecord>,
    /// Inheritance errors that prevented resolving `parents`.
    pub errors: Vec<InheritanceError>,
}

impl ContractDetail {
    fn new(contract: &ContractNode) -> Self {
        Self {
            name: contract.name.clone(),
            kind: contract.kind,
            function_names: BTreeSet::new(),
            state_variables: Vec::new(),
            parents: Vec::new(),
            mapping_declarations: Vec::new(),
            functions: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Names of the callables found to write a mapping.
    pub fn mapping_writers(&self) -> BTreeSet<&str> {
        self.functions.iter().filter(|f| f.writes_mapping).map(|f| f.name.as_str()).collect()
    }

    /// Own function definitions by name, modifiers excluded. For overloads the
    /// last declaration wins.
    pub fn function_bodies(&self) -> BTreeMap<&str, &Value> {
        self.functions
            .iter()
            .filter(|f| f.kind.is_function())
            .map(|f| (f.name.as_str(), &f.raw))
            .collect()
    }

    /// Looks up a state variable (own or inherited) by name.
    pub fn state_variable(&self, name: &str) -> Option<&ResolvedVariable> {
        self.state_variables.iter().rev().find(|v| v.name == name)
    }
}

/// A function or modifier owned by a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    /// Callable name (`constructor`, `fallback` and `receive` for the special functions).
    pub name: String,
    /// Function flavor or modifier.
    pub kind: CallableKind,
    /// Location of the definition, if the syntax tree carries one.
    pub src: Option<SourceRange>,
    /// Set by the mapping-write analysis.
    pub writes_mapping: bool,
    /// Normalized body, `None` for unimplemented functions.
    #[serde(skip)]
    pub body: Option<Blk>,
    /// The raw definition node.
    #[serde(skip)]
    pub raw: Value,
}

impl From<&CallableNode> for FunctionRecord {
    fn from(node: &CallableNode) -> Self {
        Self {
            name: node.name.clone(),
            kind: node.kind,
            src: node.src,
            writes_mapping: false,
            body: node.body.clone(),
            raw: node.raw.clone(),
        }
    }
}

/// A `constant` or `immutable` state variable initialized with a literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantVar {
    /// The declaring contract.
    pub contract: String,
    /// Variable name.
    pub name: String,
    /// Declared type as reported by the compiler (e.g. `uint256`), empty when
    /// the syntax tree does not carry it.
    pub declared_type: String,
    /// Literal text of the initializer.
    pub value: String,
}

/// The result of aggregating a whole source unit.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Contract name to its detail. A later contract with the same name
    /// replaces the earlier one.
    pub details: BTreeMap<String, ContractDetail>,
    /// Literal-initialized constants and immutables, in source order.
    pub constants: Vec<ConstantVar>,
    /// User-defined types registered along the way.
    pub registry: TypeRegistry,
}

/// Walks a source unit in order and builds a [`ContractDetail`] per contract.
#[derive(Debug, Default)]
pub struct ContractAggregator {
    aggregation: Aggregation,
}

impl ContractAggregator {
    /// Creates an aggregator with an empty type registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregates all contracts of `unit`.
    ///
    /// Top-level and contract-level structs and enums are registered in the
    /// order they appear, so a type used before its definition resolves with
    /// no members.
    #[instrument(level = "debug", skip_all)]
    pub fn aggregate(mut self, unit: &SourceUnitNode, linearization: &Linearization) -> Aggregation {
        for item in &unit.items {
            match item {
                UnitItem::Contract(contract) => self.visit_contract(contract, linearization),
                UnitItem::Struct(node) => {
                    self.aggregation.registry.unroll_struct(node);
                }
                UnitItem::Enum(node) => self.aggregation.registry.register_enum(node),
                UnitItem::Pragma(_) | UnitItem::Other { .. } => {}
            }
        }
        debug!(
            contracts = self.aggregation.details.len(),
            constants = self.aggregation.constants.len(),
            types = self.aggregation.registry.len(),
            "aggregated source unit"
        );
        self.aggregation
    }

    fn visit_contract(&mut self, contract: &ContractNode, linearization: &Linearization) {
        let mut detail = ContractDetail::new(contract);
        let mut own_variables = Vec::new();

        for member in &contract.members {
            match member {
                ContractMember::StateVariable(decl) => {
                    if let Some(constant) = self.constant_of(&contract.name, decl) {
                        self.aggregation.constants.push(constant);
                        continue;
                    }
                    if let Some(var) = self.aggregation.registry.resolve_variable(decl) {
                        own_variables.push(var);
                    }
                }
                ContractMember::Struct(node) => {
                    self.aggregation.registry.unroll_struct(node);
                }
                ContractMember::Enum(node) => self.aggregation.registry.register_enum(node),
                ContractMember::Callable(node) => detail.functions.push(node.into()),
                ContractMember::Other { kind } => {
                    trace!(contract = %contract.name, kind, "ignoring contract member");
                }
            }
        }

        detail.mapping_declarations = own_variables
            .iter()
            .filter_map(|var| match &var.ty {
                TypeDescriptor::Mapping { key_type, .. } => Some(MappingDeclaration {
                    name: var.name.clone(),
                    key_type: key_type.clone(),
                }),
                _ => None,
            })
            .collect();
        detail.function_names = detail
            .functions
            .iter()
            .filter(|f| f.kind.is_function())
            .map(|f| f.name.clone())
            .collect();

        match linearization.get(&contract.name) {
            Ok(ancestors) => {
                detail.parents = ancestors.to_vec();
                detail.state_variables = self.inherited_variables(ancestors);
                for ancestor in ancestors {
                    match self.aggregation.details.get(ancestor) {
                        Some(base) => detail.function_names.extend(base.function_names.iter().cloned()),
                        None => {
                            debug!(contract = %contract.name, ancestor, "ancestor not defined in this unit")
                        }
                    }
                }
            }
            Err(err) => {
                warn!(contract = %contract.name, error = %err, "inheritance unresolved, no parents recorded");
                detail.errors.push(err.clone());
            }
        }
        detail.state_variables.extend(own_variables);

        debug!(
            contract = %detail.name,
            functions = detail.functions.len(),
            state_variables = detail.state_variables.len(),
            mappings = detail.mapping_declarations.len(),
            "aggregated contract"
        );
        self.aggregation.details.insert(detail.name.clone(), detail);
    }

    /// Splits off literal-initialized constants and immutables.
    fn constant_of(&self, contract: &str, decl: &VarDecl) -> Option<ConstantVar> {
        if decl.mutability == Mutability::Mutable {
            return None;
        }
        let Some(value) = decl.initializer.literal() else {
            trace!(contract, name = %decl.name, "non-literal constant kept as state variable");
            return None;
        };
        Some(ConstantVar {
            contract: contract.to_string(),
            name: decl.name.clone(),
            declared_type: decl.type_string.clone().unwrap_or_default(),
            value: value.to_string(),
        })
    }

    /// Collects ancestor state variables. The first occurrence of a variable wins.
    fn inherited_variables(&self, ancestors: &[String]) -> Vec<ResolvedVariable> {
        let mut inherited: Vec<ResolvedVariable> = Vec::new();
        for ancestor in ancestors {
            let Some(base) = self.aggregation.details.get(ancestor) else { continue };
            for var in &base.state_variables {
                if !inherited.contains(var) {
                    inherited.push(var.clone());
                }
            }
        }
        inherited
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::analysis::InheritanceTree;

    fn aggregate(nodes: Value) -> Aggregation {
        let nodes = nodes.as_array().cloned().unwrap_or_default();
        let unit = SourceUnitNode::lower(&nodes);
        let linearization = InheritanceTree::build(unit.contracts()).linearize();
        ContractAggregator::new().aggregate(&unit, &linearization)
    }

    fn state_var(name: &str, type_name: Value) -> Value {
        json!({
            "nodeType": "VariableDeclaration",
            "name": name,
            "stateVariable": true,
            "constant": false,
            "typeName": type_name,
        })
    }

    fn elementary(name: &str) -> Value {
        json!({ "nodeType": "ElementaryTypeName", "name": name })
    }

    fn function(name: &str) -> Value {
        json!({
            "nodeType": "FunctionDefinition",
            "name": name,
            "kind": "function",
            "src": "0:10:0",
            "body": { "nodeType": "Block", "statements": [] },
        })
    }

    fn contract(name: &str, bases: &[&str], nodes: Vec<Value>) -> Value {
        let bases: Vec<_> = bases
            .iter()
            .map(|b| json!({ "nodeType": "InheritanceSpecifier", "baseName": { "nodeType": "IdentifierPath", "name": b } }))
            .collect();
        json!({
            "nodeType": "ContractDefinition",
            "name": name,
            "contractKind": "contract",
            "baseContracts": bases,
            "nodes": nodes,
        })
    }

    #[test]
    fn test_parent_variables_precede_own() {
        let aggregation = aggregate(json!([
            contract("A", &[], vec![state_var("x", elementary("uint256")), function("f")]),
            contract("B", &["A"], vec![state_var("y", elementary("address")), function("g")]),
        ]));

        let b = &aggregation.details["B"];
        let names: Vec<_> = b.state_variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["x", "y"]);
        assert_eq!(b.parents, ["A"]);
        assert_eq!(b.function_names.iter().map(String::as_str).collect::<Vec<_>>(), ["f", "g"]);
        assert_eq!(b.functions.len(), 1);
        assert!(b.state_variable("x").is_some());
    }

    #[test]
    fn test_mapping_declarations_are_own_only() {
        let mapping = json!({
            "nodeType": "Mapping",
            "keyType": elementary("address"),
            "valueType": elementary("uint256"),
        });
        let aggregation = aggregate(json!([
            contract("A", &[], vec![state_var("balances", mapping)]),
            contract("B", &["A"], vec![]),
        ]));

        assert_eq!(
            aggregation.details["A"].mapping_declarations,
            [MappingDeclaration { name: "balances".into(), key_type: "address".into() }]
        );
        assert!(aggregation.details["B"].mapping_declarations.is_empty());
        assert!(aggregation.details["B"].state_variables[0].ty.is_mapping());
    }

    #[test]
    fn test_literal_constants_are_split_off() {
        let mut max = state_var("MAX", elementary("uint256"));
        max["constant"] = json!(true);
        max["value"] = json!({ "nodeType": "Literal", "kind": "number", "value": "100" });
        max["typeDescriptions"] = json!({ "typeString": "uint256" });

        let mut owner = state_var("OWNER", elementary("address"));
        owner["mutability"] = json!("immutable");
        owner["value"] = json!({ "nodeType": "FunctionCall" });

        let aggregation = aggregate(json!([contract("C", &[], vec![max, owner])]));

        assert_eq!(
            aggregation.constants,
            [ConstantVar {
                contract: "C".into(),
                name: "MAX".into(),
                declared_type: "uint256".into(),
                value: "100".into(),
            }]
        );
        let names: Vec<_> =
            aggregation.details["C"].state_variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["OWNER"]);
    }

    #[test]
    fn test_struct_forward_reference() {
        let user_defined = json!({
            "nodeType": "UserDefinedTypeName",
            "pathNode": { "nodeType": "IdentifierPath", "name": "Pos" },
        });
        let pos = json!({
            "nodeType": "StructDefinition",
            "name": "Pos",
            "members": [{ "nodeType": "VariableDeclaration", "name": "x", "typeName": elementary("uint256") }],
        });
        let aggregation = aggregate(json!([contract(
            "C",
            &[],
            vec![state_var("early", user_defined.clone()), pos, state_var("late", user_defined)],
        )]));

        let vars = &aggregation.details["C"].state_variables;
        assert_eq!(vars[0].ty, TypeDescriptor::UserDefined { name: "Pos".into(), members: vec![] });
        let TypeDescriptor::UserDefined { members, .. } = &vars[1].ty else { panic!() };
        assert_eq!(members.len(), 1);
    }

    #[test]
    fn test_inconsistent_hierarchy_marks_contract() {
        let aggregation = aggregate(json!([
            contract("A", &[], vec![]),
            contract("B", &[], vec![]),
            contract("X", &["A", "B"], vec![]),
            contract("Y", &["B", "A"], vec![]),
            contract("Z", &["X", "Y"], vec![]),
        ]));

        let z = &aggregation.details["Z"];
        assert!(z.parents.is_empty());
        assert!(matches!(z.errors[0], InheritanceError::InconsistentHierarchy { .. }));
        assert!(aggregation.details["X"].errors.is_empty());
    }
}
