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

//! Adapter for the solc compact JSON tree shape.
//!
//! Nodes are tagged with `nodeType`; contracts keep their declarations in
//! `nodes`; each state variable is its own `VariableDeclaration`; user-defined
//! type references use `pathNode.name` (or `name` before solc 0.8) and carry
//! resolved `typeDescriptions`.

use serde_json::Value;
use tracing::{debug, warn};

use super::{
    child, flag, items, scalar_text, str_of, ArrayLength, CallableKind, CallableNode,
    ContractKind, ContractMember, ContractNode, EnumNode, Expr, ForStmt, IfStmt, Initializer,
    Lowering, Mutability, PragmaNode, Schema, SourceRange, Stmt, StructNode, TypeNameNode,
    UnitItem, VarDecl, is_assignment_operator,
};

/// Lowering for the solc compact JSON schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactLowering;

/// Reads the name of a type reference across solc versions.
fn reference_name(node: &Value) -> Option<&str> {
    child(node, "pathNode")
        .and_then(|path| str_of(path, "name"))
        .or_else(|| str_of(node, "name"))
        .or_else(|| str_of(node, "namePath"))
}

fn type_identifier(node: &Value) -> Option<&str> {
    child(node, "typeDescriptions").and_then(|t| str_of(t, "typeIdentifier"))
}

fn is_enum_identifier(node: &Value) -> bool {
    type_identifier(node).is_some_and(|id| id.starts_with("t_enum"))
}

fn src_of(node: &Value) -> Option<SourceRange> {
    str_of(node, "src").and_then(|src| src.parse().ok())
}

impl CompactLowering {
    fn lower_contract(&self, node: &Value) -> Option<ContractNode> {
        let Some(name) = str_of(node, "name") else {
            warn!("skipping contract definition without a name");
            return None;
        };

        let kind = match str_of(node, "contractKind") {
            Some("interface") => ContractKind::Interface,
            Some("library") => ContractKind::Library,
            _ if flag(node, "abstract") => ContractKind::Abstract,
            _ => ContractKind::Contract,
        };

        let bases = items(node, "baseContracts")
            .iter()
            .filter_map(|base| {
                let base_name = child(base, "baseName").and_then(reference_name);
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
        let members = items(node, "members").iter().filter_map(|m| self.lower_var_decl(m)).collect();
        Some(StructNode { name: name.to_string(), members })
    }

    fn lower_enum(&self, node: &Value) -> Option<EnumNode> {
        let name = str_of(node, "name")?;
        let values =
            items(node, "members").iter().filter_map(|m| str_of(m, "name")).map(String::from);
        Some(EnumNode { name: name.to_string(), values: values.collect() })
    }

    fn lower_var_decl(&self, node: &Value) -> Option<VarDecl> {
        let Some(name) = str_of(node, "name") else {
            debug!("skipping unnamed variable declaration");
            return None;
        };

        let mut ty = child(node, "typeName").map(|ty| self.lower_type_name(ty));
        // Older solc versions only describe the variable, not its type name.
        if let Some(TypeNameNode::UserDefined { enum_hint, .. }) = ty.as_mut() {
            *enum_hint |= is_enum_identifier(node);
        }

        let type_string = child(node, "typeDescriptions")
            .and_then(|t| str_of(t, "typeString"))
            .map(String::from)
            .or_else(|| ty.as_ref().map(ToString::to_string));

        let mutability = match str_of(node, "mutability") {
            _ if flag(node, "constant") => Mutability::Constant,
            Some("constant") => Mutability::Constant,
            Some("immutable") => Mutability::Immutable,
            _ => Mutability::Mutable,
        };

        let initializer = match child(node, "value") {
            None => Initializer::None,
            Some(value) => match (str_of(value, "nodeType"), str_of(value, "kind")) {
                (Some("Literal"), Some("number" | "string" | "unicodeString" | "hexString")) => {
                    // Non-UTF-8 hex strings carry only `hexValue`.
                    child(value, "value")
                        .or_else(|| child(value, "hexValue"))
                        .and_then(scalar_text)
                        .map_or(Initializer::Expression, Initializer::Literal)
                }
                _ => Initializer::Expression,
            },
        };

        Some(VarDecl { name: name.to_string(), ty, type_string, mutability, initializer })
    }

    fn lower_callable(&self, node: &Value, modifier: bool) -> Option<CallableNode> {
        let declared = str_of(node, "name").unwrap_or_default();
        let kind = if modifier {
            CallableKind::Modifier
        } else {
            match str_of(node, "kind") {
                Some("constructor") => CallableKind::Constructor,
                Some("fallback") => CallableKind::Fallback,
                Some("receive") => CallableKind::Receive,
                Some(_) => CallableKind::Function,
                // solc < 0.5 has no `kind`.
                None if flag(node, "isConstructor") => CallableKind::Constructor,
                None if declared.is_empty() => CallableKind::Fallback,
                None => CallableKind::Function,
            }
        };

        let name = match kind {
            CallableKind::Function | CallableKind::Modifier if declared.is_empty() => {
                warn!("skipping unnamed function definition");
                return None;
            }
            CallableKind::Function | CallableKind::Modifier => declared.to_string(),
            special => special.to_string(),
        };

        Some(CallableNode {
            name,
            kind,
            src: src_of(node),
            body: child(node, "body").map(|body| self.lower_block(body)),
            raw: node.clone(),
        })
    }

    fn lower_array_length(&self, node: &Value) -> Option<ArrayLength> {
        match self.lower_expression(node) {
            Expr::Literal(value) => Some(ArrayLength::Literal(value)),
            expr @ (Expr::Identifier(_) | Expr::MemberAccess { .. }) => {
                expr.dotted_path().map(ArrayLength::Constant)
            }
            other => {
                debug!(length = ?other, "array length is neither literal nor constant");
                None
            }
        }
    }
}

impl Lowering for CompactLowering {
    fn schema(&self) -> Schema {
        Schema::Compact
    }

    fn kind<'a>(&self, node: &'a Value) -> Option<&'a str> {
        str_of(node, "nodeType")
    }

    fn lower_item(&self, node: &Value) -> Option<UnitItem> {
        match self.kind(node)? {
            "PragmaDirective" => {
                let literals: Vec<&str> =
                    items(node, "literals").iter().filter_map(Value::as_str).collect();
                let (name, rest) = literals.split_first().map_or(("", &[][..]), |(n, r)| (*n, r));
                Some(UnitItem::Pragma(PragmaNode { name: name.to_string(), value: rest.concat() }))
            }
            "ContractDefinition" => self.lower_contract(node).map(UnitItem::Contract),
            "StructDefinition" => self.lower_struct(node).map(UnitItem::Struct),
            "EnumDefinition" => self.lower_enum(node).map(UnitItem::Enum),
            kind => Some(UnitItem::Other { kind: kind.to_string() }),
        }
    }

    fn lower_members(&self, contract: &Value) -> Vec<ContractMember> {
        let mut members = Vec::new();
        for node in items(contract, "nodes") {
            let Some(kind) = self.kind(node) else {
                debug!("skipping untyped contract sub-node");
                continue;
            };
            match kind {
                "VariableDeclaration" if flag(node, "stateVariable") => {
                    members.extend(self.lower_var_decl(node).map(ContractMember::StateVariable))
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
            Some("UserDefinedTypeName") => match reference_name(node) {
                Some(path) => TypeNameNode::UserDefined {
                    path: path.to_string(),
                    enum_hint: is_enum_identifier(node),
                },
                None => TypeNameNode::Unknown { kind: "UserDefinedTypeName".to_string() },
            },
            Some("Mapping") => match (child(node, "keyType"), child(node, "valueType")) {
                (Some(key), Some(value)) => TypeNameNode::Mapping {
                    key: Box::new(self.lower_type_name(key)),
                    value: Box::new(self.lower_type_name(value)),
                },
                _ => TypeNameNode::Unknown { kind: "Mapping".to_string() },
            },
            Some("ArrayTypeName") => match child(node, "baseType") {
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
        let kind = self.kind(node)?;
        Some(match kind {
            "ExpressionStatement" => match child(node, "expression") {
                Some(expr) => Stmt::Expression(self.lower_expression(expr)),
                None => Stmt::Other { kind: kind.to_string() },
            },
            "IfStatement" => Stmt::If(Box::new(IfStmt {
                true_branch: child(node, "trueBody")
                    .map(|body| self.lower_block(body))
                    .unwrap_or_default(),
                false_branch: child(node, "falseBody").map(|body| self.lower_block(body)),
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
            "Assignment" => match (str_of(node, "operator"), child(node, "leftHandSide")) {
                (Some(operator), Some(lhs)) if is_assignment_operator(operator) => {
                    Expr::Assignment {
                        operator: operator.to_string(),
                        lhs: Box::new(self.lower_expression(lhs)),
                    }
                }
                _ => Expr::Other { kind: kind.to_string() },
            },
            "IndexAccess" => match child(node, "baseExpression") {
                Some(base) => Expr::IndexAccess {
                    base: Box::new(self.lower_expression(base)),
                    index: child(node, "indexExpression")
                        .map(|index| Box::new(self.lower_expression(index))),
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
            "Literal" => node
                .get("value")
                .and_then(scalar_text)
                .or_else(|| str_of(node, "hexValue").map(|hex| format!("hex\"{hex}\"")))
                .map(Expr::Literal)
                .unwrap_or_else(|| Expr::Other { kind: kind.to_string() }),
            kind => Expr::Other { kind: kind.to_string() },
        }
    }
}
