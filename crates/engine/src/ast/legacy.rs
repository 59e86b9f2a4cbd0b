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

//! Adapter for the solidity-parser tree shape.
//!
//! Nodes are tagged with `type`; contracts keep their declarations in
//! `subNodes`; state variables are grouped under `StateVariableDeclaration`;
//! user-defined type references use `namePath`; if statements spell their
//! branches `TrueBody`/`FalseBody`.

use serde_json::Value;
use tracing::{debug, warn};

use super::{
    child, flag, items, scalar_text, str_of, ArrayLength, CallableKind, CallableNode,
    ContractKind, ContractMember, ContractNode, EnumNode, Expr, ForStmt, IfStmt, Initializer,
    Lowering, Mutability, PragmaNode, Schema, SourceRange, Stmt, StructNode, TypeNameNode,
    UnitItem, VarDecl, is_assignment_operator,
};

/// Lowering for the solidity-parser schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyLowering;

impl LegacyLowering {
    fn lower_contract(&self, node: &Value) -> Option<ContractNode> {
        let Some(name) = str_of(node, "name") else {
            warn!("skipping contract definition without a name");
            return None;
        };

        let kind = match str_of(node, "kind") {
            Some("interface") => ContractKind::Interface,
            Some("library") => ContractKind::Library,
            Some("abstract") => ContractKind::Abstract,
            _ => ContractKind::Contract,
        };

        let bases = items(node, "baseContracts")
            .iter()
            .filter_map(|base| {
                let base_name = child(base, "baseName").and_then(|n| str_of(n, "namePath"));
                if base_name.is_none() {
                    warn!(contract = name, "skipping unreadable base contract specifier");
                }
                base_name.map(str::to_string)
            })
            .collect();

        Some(ContractNode { name: name.to_string(), kind, bases, members: self.lower_members(node) })
    }

    fn lower_struct(&self, node: &Value) -> Option<StructNode> {
        let name = str_of(node, "name")?;
        let members =
            items(node, "members").iter().filter_map(|m| self.lower_var_decl(m, None)).collect();
        Some(StructNode { name: name.to_string(), members })
    }

    fn lower_enum(&self, node: &Value) -> Option<EnumNode> {
        let name = str_of(node, "name")?;
        let values =
            items(node, "members").iter().filter_map(|m| str_of(m, "name")).map(String::from);
        Some(EnumNode { name: name.to_string(), values: values.collect() })
    }

    /// Lowers one entry of `StateVariableDeclaration.variables` or of a struct's
    /// `members`. The legacy parser repeats the initializer on the enclosing
    /// declaration as `initialValue`, which we fall back to.
    fn lower_var_decl(&self, node: &Value, initial_value: Option<&Value>) -> Option<VarDecl> {
        let Some(name) = str_of(node, "name") else {
            debug!("skipping unnamed variable declaration");
            return None;
        };

        let ty = child(node, "typeName").map(|ty| self.lower_type_name(ty));
        let type_string = ty.as_ref().map(ToString::to_string);

        let mutability = if flag(node, "isDeclaredConst") {
            Mutability::Constant
        } else if flag(node, "isImmutable") || flag(node, "isDeclaredImmutable") {
            Mutability::Immutable
        } else {
            Mutability::Mutable
        };

        let initializer = match child(node, "expression").or(initial_value) {
            None => Initializer::None,
            Some(expr) => match str_of(expr, "type") {
                Some("NumberLiteral") => {
                    expr.get("number").and_then(scalar_text).map_or(Initializer::Expression, Initializer::Literal)
                }
                Some("StringLiteral") => {
                    expr.get("value").and_then(scalar_text).map_or(Initializer::Expression, Initializer::Literal)
                }
                _ => Initializer::Expression,
            },
        };

        Some(VarDecl { name: name.to_string(), ty, type_string, mutability, initializer })
    }

    fn lower_callable(&self, node: &Value, modifier: bool) -> Option<CallableNode> {
        let declared = str_of(node, "name");
        let kind = if modifier {
            CallableKind::Modifier
        } else if flag(node, "isConstructor") || node.get("name").is_some_and(Value::is_null) {
            CallableKind::Constructor
        } else if flag(node, "isReceiveEther") {
            CallableKind::Receive
        } else if flag(node, "isFallback") || declared == Some("") {
            CallableKind::Fallback
        } else {
            CallableKind::Function
        };

        let name = match (kind, declared) {
            (CallableKind::Function | CallableKind::Modifier, Some(name)) if !name.is_empty() => {
                name.to_string()
            }
            (CallableKind::Function | CallableKind::Modifier, _) => {
                warn!("skipping unnamed function definition");
                return None;
            }
            (special, _) => special.to_string(),
        };

        let src = items(node, "range")
            .iter()
            .map(|bound| bound.as_u64().and_then(|bound| usize::try_from(bound).ok()))
            .collect::<Option<Vec<_>>>()
            .and_then(|range| match range.as_slice() {
                [start, end] => SourceRange::from_inclusive(*start, *end),
                _ => None,
            });

        Some(CallableNode {
            name,
            kind,
            src,
            body: child(node, "body").map(|body| self.lower_block(body)),
            raw: node.clone(),
        })
    }

    fn lower_array_length(&self, node: &Value) -> Option<ArrayLength> {
        match str_of(node, "type") {
            Some("NumberLiteral") => node.get("number").and_then(scalar_text).map(ArrayLength::Literal),
            _ => match self.lower_expression(node) {
                expr @ (Expr::Identifier(_) | Expr::MemberAccess { .. }) => {
                    expr.dotted_path().map(ArrayLength::Constant)
                }
                other => {
                    debug!(length = ?other, "array length is neither literal nor constant");
                    None
                }
            },
        }
    }
}

impl Lowering for LegacyLowering {
    fn schema(&self) -> Schema {
        Schema::Legacy
    }

    fn kind<'a>(&self, node: &'a Value) -> Option<&'a str> {
        str_of(node, "type")
    }

    fn lower_item(&self, node: &Value) -> Option<UnitItem> {
        match self.kind(node)? {
            "PragmaDirective" => Some(UnitItem::Pragma(PragmaNode {
                name: str_of(node, "name").unwrap_or_default().to_string(),
                value: str_of(node, "value").unwrap_or_default().to_string(),
            })),
            "ContractDefinition" => self.lower_contract(node).map(UnitItem::Contract),
            "StructDefinition" => self.lower_struct(node).map(UnitItem::Struct),
            "EnumDefinition" => self.lower_enum(node).map(UnitItem::Enum),
            kind => Some(UnitItem::Other { kind: kind.to_string() }),
        }
    }

    fn lower_members(&self, contract: &Value) -> Vec<ContractMember> {
        let mut members = Vec::new();
        for node in items(contract, "subNodes") {
            let Some(kind) = self.kind(node) else {
                debug!("skipping untyped contract sub-node");
                continue;
            };
            match kind {
                "StateVariableDeclaration" => {
                    let initial_value = child(node, "initialValue");
                    members.extend(
                        items(node, "variables")
                            .iter()
                            .filter_map(|var| self.lower_var_decl(var, initial_value))
                            .map(ContractMember::StateVariable),
                    );
                }
                "StructDefinition" => {
                    members.extend(self.lower_struct(node).map(ContractMember::Struct))
                }
                "EnumDefinition" => members.extend(self.lower_enum(node).map(ContractMember::Enum)),
                "FunctionDefinition" => {
                    members.extend(self.lower_callable(node, false).map(ContractMember::Callable))
                }
                "ModifierDefinition" => {
                    members.extend(self.lower_callable(node, true).map(ContractMember::Callable))
                }
                kind => members.push(ContractMember::Other { kind: kind.to_string() }),
            }
        }
        members
    }

    fn lower_type_name(&self, node: &Value) -> TypeNameNode {
        match self.kind(node) {
            Some("ElementaryTypeName") => match str_of(node, "name") {
                Some(name) => TypeNameNode::Elementary { name: name.to_string() },
                None => TypeNameNode::Unknown { kind: "ElementaryTypeName".to_string() },
            },
            Some("UserDefinedTypeName") => match str_of(node, "namePath") {
                Some(path) => TypeNameNode::UserDefined { path: path.to_string(), enum_hint: false },
                None => TypeNameNode::Unknown { kind: "UserDefinedTypeName".to_string() },
            },
            Some("Mapping") => match (child(node, "keyType"), child(node, "valueType")) {
                (Some(key), Some(value)) => TypeNameNode::Mapping {
                    key: Box::new(self.lower_type_name(key)),
                    value: Box::new(self.lower_type_name(value)),
                },
                _ => TypeNameNode::Unknown { kind: "Mapping".to_string() },
            },
            Some("ArrayTypeName") => match child(node, "baseTypeName") {
                Some(base) => TypeNameNode::Array {
                    base: Box::new(self.lower_type_name(base)),
                    length: child(node, "length").and_then(|len| self.lower_array_length(len)),
                },
                None => TypeNameNode::Unknown { kind: "ArrayTypeName".to_string() },
            },
            Some("FunctionTypeName") => TypeNameNode::Function,
            Some(kind) => TypeNameNode::Unknown { kind: kind.to_string() },
            None => TypeNameNode::Unknown { kind: String::new() },
        }
    }

    fn lower_statement(&self, node: &Value) -> Option<Stmt> {
        // The legacy parser leaves `;` and `null` in statement lists.
        let kind = self.kind(node)?;
        Some(match kind {
            "ExpressionStatement" => match child(node, "expression") {
                Some(expr) => Stmt::Expression(self.lower_expression(expr)),
                None => Stmt::Other { kind: kind.to_string() },
            },
            "IfStatement" => Stmt::If(Box::new(IfStmt {
                true_branch: child(node, "TrueBody")
                    .map(|body| self.lower_block(body))
                    .unwrap_or_default(),
                false_branch: child(node, "FalseBody").map(|body| self.lower_block(body)),
            })),
            "ForStatement" => Stmt::For(Box::new(ForStmt {
                body: child(node, "body").map(|body| self.lower_block(body)).unwrap_or_default(),
            })),
            kind => Stmt::Other { kind: kind.to_string() },
        })
    }

    fn lower_expression(&self, node: &Value) -> Expr {
        let Some(kind) = self.kind(node) else {
            return Expr::Other { kind: String::new() };
        };
        match kind {
            "BinaryOperation" => match (str_of(node, "operator"), child(node, "left")) {
                (Some(operator), Some(left)) if is_assignment_operator(operator) => {
                    Expr::Assignment {
                        operator: operator.to_string(),
                        lhs: Box::new(self.lower_expression(left)),
                    }
                }
                _ => Expr::Other { kind: kind.to_string() },
            },
            "IndexAccess" => match child(node, "base") {
                Some(base) => Expr::IndexAccess {
                    base: Box::new(self.lower_expression(base)),
                    index: child(node, "index").map(|index| Box::new(self.lower_expression(index))),
                },
                None => Expr::Other { kind: kind.to_string() },
            },
            "MemberAccess" => match (child(node, "expression"), str_of(node, "memberName")) {
                (Some(object), Some(member)) => Expr::MemberAccess {
                    object: Box::new(self.lower_expression(object)),
                    member: member.to_string(),
                },
                _ => Expr::Other { kind: kind.to_string() },
            },
            "Identifier" => match str_of(node, "name") {
                Some(name) => Expr::Identifier(name.to_string()),
                None => Expr::Other { kind: kind.to_string() },
            },
            "NumberLiteral" => literal(node, "number", kind),
            "StringLiteral" | "HexLiteral" | "BooleanLiteral" => literal(node, "value", kind),
            kind => Expr::Other { kind: kind.to_string() },
        }
    }
}

fn literal(node: &Value, key: &str, kind: &str) -> Expr {
    match node.get(key) {
        Some(Value::Bool(b)) => Expr::Literal(b.to_string()),
        Some(value) => scalar_text(value)
            .map(Expr::Literal)
            .unwrap_or_else(|| Expr::Other { kind: kind.to_string() }),
        None => Expr::Other { kind: kind.to_string() },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_contract_with_bases_and_state_variables() {
        let node = json!({
            "type": "ContractDefinition",
            "name": "Token",
            "kind": "contract",
            "baseContracts": [
                {"type": "InheritanceSpecifier", "baseName": {"type": "UserDefinedTypeName", "namePath": "Ownable"}},
                {"type": "InheritanceSpecifier", "baseName": {"type": "UserDefinedTypeName", "namePath": "Pausable"}}
            ],
            "subNodes": [{
                "type": "StateVariableDeclaration",
                "variables": [{
                    "type": "VariableDeclaration",
                    "name": "balances",
                    "typeName": {
                        "type": "Mapping",
                        "keyType": {"type": "ElementaryTypeName", "name": "address"},
                        "valueType": {"type": "ElementaryTypeName", "name": "uint256"}
                    },
                    "isStateVar": true,
                    "isDeclaredConst": false,
                    "expression": null
                }],
                "initialValue": null
            }]
        });

        let Some(UnitItem::Contract(contract)) = LegacyLowering.lower_item(&node) else {
            panic!("expected a contract");
        };
        assert_eq!(contract.bases, vec!["Ownable", "Pausable"]);
        assert_eq!(contract.members.len(), 1);
        let ContractMember::StateVariable(var) = &contract.members[0] else {
            panic!("expected a state variable");
        };
        assert_eq!(var.name, "balances");
        assert_eq!(var.type_string.as_deref(), Some("mapping(address => uint256)"));
        assert_eq!(var.initializer, Initializer::None);
    }

    #[test]
    fn test_constructor_and_fallback_names() {
        let ctor = json!({"type": "FunctionDefinition", "name": null, "isConstructor": true, "body": null});
        let fallback = json!({"type": "FunctionDefinition", "name": "", "body": null});
        let receive = json!({"type": "FunctionDefinition", "name": "", "isReceiveEther": true});

        let ctor = LegacyLowering.lower_callable(&ctor, false).unwrap();
        assert_eq!((ctor.name.as_str(), ctor.kind), ("constructor", CallableKind::Constructor));
        let fallback = LegacyLowering.lower_callable(&fallback, false).unwrap();
        assert_eq!((fallback.name.as_str(), fallback.kind), ("fallback", CallableKind::Fallback));
        let receive = LegacyLowering.lower_callable(&receive, false).unwrap();
        assert_eq!(receive.kind, CallableKind::Receive);
    }

    #[test]
    fn test_malformed_range_is_dropped() {
        let node = |range: Value| {
            json!({"type": "FunctionDefinition", "name": "f", "range": range, "body": null})
        };

        let ok = LegacyLowering.lower_callable(&node(json!([120, 180])), false).unwrap();
        assert_eq!(ok.src, Some(SourceRange { start: 120, length: 61, file: 0 }));
        for range in [json!([0, u64::MAX]), json!([9, 5]), json!([-1, 4]), json!([3])] {
            let callable = LegacyLowering.lower_callable(&node(range), false).unwrap();
            assert_eq!(callable.name, "f");
            assert_eq!(callable.src, None);
        }
    }

    #[test]
    fn test_constant_initializers() {
        let number = json!({
            "type": "VariableDeclaration", "name": "MAX",
            "typeName": {"type": "ElementaryTypeName", "name": "uint256"},
            "isDeclaredConst": true,
            "expression": {"type": "NumberLiteral", "number": "100", "subdenomination": null}
        });
        let call = json!({
            "type": "VariableDeclaration", "name": "HASH",
            "typeName": {"type": "ElementaryTypeName", "name": "bytes32"},
            "isDeclaredConst": true,
            "expression": {"type": "FunctionCall"}
        });

        let number = LegacyLowering.lower_var_decl(&number, None).unwrap();
        assert_eq!(number.mutability, Mutability::Constant);
        assert_eq!(number.initializer, Initializer::Literal("100".into()));

        let call = LegacyLowering.lower_var_decl(&call, None).unwrap();
        assert_eq!(call.initializer, Initializer::Expression);
    }

    #[test]
    fn test_if_without_braces_and_stray_semicolons() {
        let body = json!({
            "type": "Block",
            "statements": [
                ";",
                null,
                {
                    "type": "IfStatement",
                    "condition": {"type": "Identifier", "name": "ok"},
                    "TrueBody": {
                        "type": "ExpressionStatement",
                        "expression": {
                            "type": "BinaryOperation", "operator": "=",
                            "left": {"type": "Identifier", "name": "x"},
                            "right": {"type": "NumberLiteral", "number": "1"}
                        }
                    },
                    "FalseBody": null
                }
            ]
        });

        let blk = LegacyLowering.lower_block(&body);
        assert_eq!(blk.body.len(), 1);
        let Stmt::If(if_stmt) = &blk.body[0] else { panic!("expected an if statement") };
        assert_eq!(if_stmt.true_branch.body.len(), 1);
        assert!(if_stmt.false_branch.is_none());
    }

    #[test]
    fn test_array_lengths() {
        let ty = json!({
            "type": "ArrayTypeName",
            "baseTypeName": {
                "type": "ArrayTypeName",
                "baseTypeName": {"type": "ElementaryTypeName", "name": "uint8"},
                "length": {"type": "Identifier", "name": "SIZE"}
            },
            "length": null
        });
        assert_eq!(LegacyLowering.lower_type_name(&ty).to_string(), "uint8[SIZE][]");
    }
}
