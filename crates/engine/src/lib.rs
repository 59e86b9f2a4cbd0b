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

//! Solsema Engine - semantic resolution for Solidity syntax trees
//!
//! The engine takes the JSON syntax tree of one Solidity source unit, in
//! either the legacy parser schema or the compiler's compact schema, and
//! derives a semantic model of it: inheritance linearizations, resolved state
//! variable types, per-contract details, literal constants and the places
//! where functions write to mapping state variables.
//!
//! [`Analyzer`] is the entry point; [`UnitAnalysis`] is what it produces.

pub mod analysis;
pub use analysis::*;

pub mod ast;
pub use ast::*;

pub mod config;
pub use config::*;
