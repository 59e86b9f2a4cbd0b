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

//! Type resolution for state variables and struct members.
//!
//! The [`TypeRegistry`] accumulates user-defined structs and enums as the
//! source unit is walked in order. Resolution is forward-reference tolerant: a
//! struct referenced before its definition has been registered resolves with
//! an empty member list.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::ast::{last_segment, ArrayLength, EnumNode, StructNode, TypeNameNode, VarDecl};

/// A resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypeDescriptor {
    /// A built-in value type such as `uint256` or `address`.
    Elementary {
        /// Type name as written.
        name: String,
    },
    /// A user-defined enum.
    Enum {
        /// Unqualified enum name.
        name: String,
    },
    /// A user-defined struct (or contract reference), with its members
    /// unrolled from the registry at resolution time.
    UserDefined {
        /// Unqualified type name.
        name: String,
        /// Member variables, empty when the type was not yet registered.
        members: Vec<ResolvedVariable>,
    },
    /// A mapping type.
    Mapping {
        /// Display name of the key type.
        key_type: String,
        /// Resolved value type.
        value: Box<TypeDescriptor>,
    },
    /// A (possibly multi-dimensional) array type.
    Array {
        /// Resolved element type.
        element: Box<TypeDescriptor>,
        /// Dimensions in declared order, outermost first.
        dimensions: Vec<ArrayDimension>,
    },
}

impl TypeDescriptor {
    /// Short tag naming the variant.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Elementary { .. } => "elementary",
            Self::Enum { .. } => "enum",
            Self::UserDefined { .. } => "user_defined",
            Self::Mapping { .. } => "mapping",
            Self::Array { .. } => "array",
        }
    }

    /// Returns `true` if this is a mapping type.
    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping { .. })
    }

    /// Whether the array has a fixed size in every dimension.
    ///
    /// Always `false` for non-array types.
    pub fn is_static(&self) -> bool {
        match self {
            Self::Array { dimensions, .. } => dimensions.iter().all(|d| d.is_static),
            _ => false,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elementary { name } => write!(f, "{name}"),
            Self::Enum { name } => write!(f, "enum {name}"),
            Self::UserDefined { name, .. } => write!(f, "{name}"),
            Self::Mapping { key_type, value } => write!(f, "mapping({key_type} => {value})"),
            Self::Array { element, dimensions } => {
                write!(f, "{element}")?;
                for dim in dimensions {
                    match &dim.length {
                        Some(len) => write!(f, "[{len}]")?,
                        None => write!(f, "[]")?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// One array dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayDimension {
    /// Declared length, `None` for dynamic dimensions.
    pub length: Option<ArrayLength>,
    /// `true` when the length is known at declaration.
    pub is_static: bool,
}

impl ArrayDimension {
    fn new(length: Option<ArrayLength>) -> Self {
        Self { is_static: length.is_some(), length }
    }
}

/// A named variable with its resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedVariable {
    /// Variable name.
    pub name: String,
    /// Resolved type.
    pub ty: TypeDescriptor,
}

/// A user-defined type known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegisteredType {
    /// A struct and its resolved members.
    Struct {
        /// Members in declaration order.
        members: Vec<ResolvedVariable>,
    },
    /// An enum. Enum values carry no type information.
    Enum,
}

/// Registry of user-defined types, keyed by unqualified name.
///
/// A later definition with the same name replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRegistry {
    types: BTreeMap<String, RegisteredType>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a type by name. Qualified names match on their last segment.
    pub fn get(&self, name: &str) -> Option<&RegisteredType> {
        self.types.get(last_segment(name))
    }

    /// Returns `true` if `name` is a registered enum.
    pub fn is_enum(&self, name: &str) -> bool {
        matches!(self.get(name), Some(RegisteredType::Enum))
    }

    /// Iterates over all registered types.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RegisteredType)> {
        self.types.iter()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registers an enum definition.
    pub fn register_enum(&mut self, node: &EnumNode) {
        debug!(name = %node.name, values = node.values.len(), "registering enum");
        self.types.insert(last_segment(&node.name).to_string(), RegisteredType::Enum);
    }

    /// Resolves the members of a struct definition and registers it.
    ///
    /// Members whose type cannot be resolved are skipped. A member referring
    /// to the struct itself resolves with an empty member list.
    pub fn unroll_struct(&mut self, node: &StructNode) -> Vec<ResolvedVariable> {
        let members: Vec<_> = node.members.iter().filter_map(|m| self.resolve_variable(m)).collect();
        debug!(name = %node.name, members = members.len(), "registering struct");
        self.types.insert(
            last_segment(&node.name).to_string(),
            RegisteredType::Struct { members: members.clone() },
        );
        members
    }

    /// Resolves a variable declaration against the current registry state.
    ///
    /// Returns `None` when the declaration has no type or its type is not
    /// supported (function types and unrecognized nodes).
    pub fn resolve_variable(&self, decl: &VarDecl) -> Option<ResolvedVariable> {
        let Some(ty) = decl.ty.as_ref() else {
            trace!(name = %decl.name, "declaration without type name");
            return None;
        };
        let Some(ty) = self.resolve_type(ty) else {
            debug!(name = %decl.name, type_name = %ty, "skipping variable with unsupported type");
            return None;
        };
        Some(ResolvedVariable { name: decl.name.clone(), ty })
    }

    /// Resolves a type name node.
    pub fn resolve_type(&self, ty: &TypeNameNode) -> Option<TypeDescriptor> {
        match ty {
            TypeNameNode::Elementary { name } => {
                Some(TypeDescriptor::Elementary { name: name.clone() })
            }
            TypeNameNode::UserDefined { path, enum_hint } => {
                let name = last_segment(path).to_string();
                if *enum_hint || self.is_enum(&name) {
                    return Some(TypeDescriptor::Enum { name });
                }
                let members = match self.get(&name) {
                    Some(RegisteredType::Struct { members }) => members.clone(),
                    _ => Vec::new(),
                };
                Some(TypeDescriptor::UserDefined { name, members })
            }
            TypeNameNode::Mapping { key, value } => Some(TypeDescriptor::Mapping {
                key_type: key.to_string(),
                value: Box::new(self.resolve_type(value)?),
            }),
            TypeNameNode::Array { .. } => {
                // The outermost node carries the last declared dimension.
                let mut dimensions = Vec::new();
                let mut cursor = ty;
                while let TypeNameNode::Array { base, length } = cursor {
                    dimensions.push(ArrayDimension::new(length.clone()));
                    cursor = base.as_ref();
                }
                dimensions.reverse();
                Some(TypeDescriptor::Array {
                    element: Box::new(self.resolve_type(cursor)?),
                    dimensions,
                })
            }
            TypeNameNode::Function | TypeNameNode::Unknown { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Initializer, Mutability};

    fn elementary(name: &str) -> TypeNameNode {
        TypeNameNode::Elementary { name: name.to_string() }
    }

    fn user_defined(path: &str) -> TypeNameNode {
        TypeNameNode::UserDefined { path: path.to_string(), enum_hint: false }
    }

    fn array(base: TypeNameNode, length: Option<&str>) -> TypeNameNode {
        TypeNameNode::Array {
            base: Box::new(base),
            length: length.map(|l| ArrayLength::Literal(l.to_string())),
        }
    }

    fn var(name: &str, ty: TypeNameNode) -> VarDecl {
        VarDecl {
            name: name.to_string(),
            ty: Some(ty),
            type_string: None,
            mutability: Mutability::Mutable,
            initializer: Initializer::None,
        }
    }

    #[test]
    fn test_elementary() {
        let registry = TypeRegistry::new();
        let resolved = registry.resolve_variable(&var("x", elementary("uint256"))).unwrap();
        assert_eq!(resolved.ty, TypeDescriptor::Elementary { name: "uint256".into() });
    }

    #[test]
    fn test_struct_members_unrolled() {
        let mut registry = TypeRegistry::new();
        let point = StructNode {
            name: "Point".into(),
            members: vec![var("x", elementary("uint256")), var("y", elementary("uint256"))],
        };
        let members = registry.unroll_struct(&point);
        assert_eq!(members.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(), ["x", "y"]);

        let resolved = registry.resolve_variable(&var("p", user_defined("Lib.Point"))).unwrap();
        match resolved.ty {
            TypeDescriptor::UserDefined { name, members } => {
                assert_eq!(name, "Point");
                assert_eq!(members.len(), 2);
                assert_eq!(members[1].name, "y");
            }
            other => panic!("unexpected type {other:?}"),
        }
    }

    #[test]
    fn test_forward_reference_resolves_empty() {
        let registry = TypeRegistry::new();
        let resolved = registry.resolve_variable(&var("p", user_defined("Later"))).unwrap();
        assert_eq!(
            resolved.ty,
            TypeDescriptor::UserDefined { name: "Later".into(), members: vec![] }
        );
    }

    #[test]
    fn test_struct_member_forward_reference() {
        let mut registry = TypeRegistry::new();
        let outer = StructNode { name: "Outer".into(), members: vec![var("inner", user_defined("Inner"))] };
        let members = registry.unroll_struct(&outer);
        assert_eq!(
            members[0].ty,
            TypeDescriptor::UserDefined { name: "Inner".into(), members: vec![] }
        );

        // Registering `Inner` later does not backfill `Outer`.
        registry.unroll_struct(&StructNode {
            name: "Inner".into(),
            members: vec![var("v", elementary("bool"))],
        });
        let Some(RegisteredType::Struct { members }) = registry.get("Outer") else { panic!() };
        assert_eq!(
            members[0].ty,
            TypeDescriptor::UserDefined { name: "Inner".into(), members: vec![] }
        );
    }

    #[test]
    fn test_enum_by_registry_and_hint() {
        let mut registry = TypeRegistry::new();
        registry.register_enum(&EnumNode { name: "Status".into(), values: vec!["On".into()] });

        let by_registry = registry.resolve_type(&user_defined("Status")).unwrap();
        assert_eq!(by_registry, TypeDescriptor::Enum { name: "Status".into() });

        let hinted = TypeNameNode::UserDefined { path: "Other.Mode".into(), enum_hint: true };
        assert_eq!(
            registry.resolve_type(&hinted).unwrap(),
            TypeDescriptor::Enum { name: "Mode".into() }
        );
    }

    #[test]
    fn test_mapping() {
        let registry = TypeRegistry::new();
        let ty = TypeNameNode::Mapping {
            key: Box::new(elementary("address")),
            value: Box::new(TypeNameNode::Mapping {
                key: Box::new(elementary("uint256")),
                value: Box::new(elementary("bool")),
            }),
        };
        let resolved = registry.resolve_type(&ty).unwrap();
        assert!(resolved.is_mapping());
        assert_eq!(resolved.to_string(), "mapping(address => mapping(uint256 => bool))");
    }

    #[test]
    fn test_array_dimensions_outer_first() {
        let registry = TypeRegistry::new();
        // uint8[2][3]
        let ty = array(array(elementary("uint8"), Some("2")), Some("3"));
        let resolved = registry.resolve_type(&ty).unwrap();
        let TypeDescriptor::Array { element, dimensions } = &resolved else {
            panic!("expected array, got {resolved:?}");
        };
        assert_eq!(**element, TypeDescriptor::Elementary { name: "uint8".into() });
        let lengths: Vec<_> = dimensions.iter().map(|d| d.length.as_ref().unwrap().to_string()).collect();
        assert_eq!(lengths, ["2", "3"]);
        assert!(resolved.is_static());
        assert_eq!(resolved.to_string(), "uint8[2][3]");
    }

    #[test]
    fn test_dynamic_array() {
        let registry = TypeRegistry::new();
        let ty = array(array(elementary("address"), Some("4")), None);
        let resolved = registry.resolve_type(&ty).unwrap();
        let TypeDescriptor::Array { dimensions, .. } = &resolved else { panic!() };
        assert!(dimensions[0].is_static);
        assert!(!dimensions[1].is_static);
        assert!(!resolved.is_static());
    }

    #[test]
    fn test_unsupported_types() {
        let registry = TypeRegistry::new();
        assert!(registry.resolve_variable(&var("f", TypeNameNode::Function)).is_none());
        let mut untyped = var("u", elementary("uint"));
        untyped.ty = None;
        assert!(registry.resolve_variable(&untyped).is_none());
    }

    #[test]
    fn test_later_definition_wins() {
        let mut registry = TypeRegistry::new();
        registry.unroll_struct(&StructNode { name: "S".into(), members: vec![] });
        registry.register_enum(&EnumNode { name: "S".into(), values: vec![] });
        assert!(registry.is_enum("S"));
        assert_eq!(registry.len(), 1);
    }
}
