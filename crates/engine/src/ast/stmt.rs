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

use super::Blk;

/// Abstracted statement AST node.
///
/// Only the statement kinds that the mapping-write survey descends into are
/// kept in full; everything else is remembered by its kind tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// An expression statement.
    Expression(Expr),
    /// An `if` statement.
    If(Box<IfStmt>),
    /// A `for` statement.
    For(Box<ForStmt>),
    /// Any other statement (while, do-while, try, nested block, return, ...).
    Other {
        /// The node's kind tag.
        kind: String,
    },
}

impl Stmt {
    /// The kind tag of this statement, normalized across schemas.
    pub fn kind(&self) -> &str {
        match self {
            Self::Expression(_) => "ExpressionStatement",
            Self::If(_) => "IfStatement",
            Self::For(_) => "ForStatement",
            Self::Other { kind } => kind,
        }
    }
}

/// Abstracted if statement AST node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    /// The body run when the condition holds.
    pub true_branch: Blk,
    /// The `else` body, if any.
    pub false_branch: Option<Blk>,
}

/// Abstracted for statement AST node. Only the loop body is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForStmt {
    /// The loop body.
    pub body: Blk,
}

/// Abstracted expression AST node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// An assignment, compound or plain (`=`, `+=`, `|=`, ...).
    Assignment {
        /// The operator as written.
        operator: String,
        /// The assigned-to expression.
        lhs: Box<Expr>,
    },
    /// `base[index]`. The index is absent for type expressions like `uint[]`.
    IndexAccess {
        /// The indexed expression.
        base: Box<Expr>,
        /// The key expression.
        index: Option<Box<Expr>>,
    },
    /// `object.member`.
    MemberAccess {
        /// The accessed expression.
        object: Box<Expr>,
        /// The member name.
        member: String,
    },
    /// A bare name.
    Identifier(String),
    /// A number, string, bool or hex literal, as written.
    Literal(String),
    /// Calls, operators, tuples and every other expression.
    Other {
        /// The node's kind tag.
        kind: String,
    },
}

impl Expr {
    /// Renders an identifier or a chain of member accesses over an identifier
    /// (`msg.sender`, `order.maker.wallet`) as a dotted path.
    pub fn dotted_path(&self) -> Option<String> {
        match self {
            Self::Identifier(name) => Some(name.clone()),
            Self::MemberAccess { object, member } => {
                object.dotted_path().map(|object| format!("{object}.{member}"))
            }
            _ => None,
        }
    }
}

/// Returns whether a binary operator writes to its left-hand side.
///
/// Comparison operators also contain `=` but never assign.
pub fn is_assignment_operator(operator: &str) -> bool {
    operator.contains('=') && !matches!(operator, "==" | "!=" | "<=" | ">=")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_operators() {
        for op in ["=", "+=", "-=", "*=", "/=", "%=", "|=", "&=", "^=", "<<=", ">>="] {
            assert!(is_assignment_operator(op), "{op} should assign");
        }
        for op in ["==", "!=", "<=", ">=", "+", "&&"] {
            assert!(!is_assignment_operator(op), "{op} should not assign");
        }
    }

    #[test]
    fn test_dotted_path() {
        let expr = Expr::MemberAccess {
            object: Box::new(Expr::MemberAccess {
                object: Box::new(Expr::Identifier("order".into())),
                member: "maker".into(),
            }),
            member: "wallet".into(),
        };
        assert_eq!(expr.dotted_path().as_deref(), Some("order.maker.wallet"));

        let call = Expr::MemberAccess {
            object: Box::new(Expr::Other { kind: "FunctionCall".into() }),
            member: "owner".into(),
        };
        assert_eq!(call.dotted_path(), None);
    }
}
