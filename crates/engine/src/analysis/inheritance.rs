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

//! Inheritance graph construction, C3 linearization and diamond detection.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ast::ContractNode;

/// Errors raised while resolving an inheritance hierarchy.
///
/// They are attached to the affected contract and never abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum InheritanceError {
    /// The C3 merge found no valid next candidate.
    #[error("inconsistent hierarchy for `{contract}`: cannot merge {remaining:?}")]
    InconsistentHierarchy {
        /// The contract whose merge step failed.
        contract: String,
        /// The sequences left unmerged when the merge got stuck.
        remaining: Vec<Vec<String>>,
    },

    /// A contract (transitively) inherits from itself.
    #[error("cyclic inheritance through `{contract}`: {}", path.join(" -> "))]
    CyclicInheritance {
        /// The contract reached twice.
        contract: String,
        /// The inheritance path closing the cycle.
        path: Vec<String>,
    },
}

/// Contract name to its immediate base names, in declaration order.
///
/// Only contracts with a non-empty base list have an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceTree {
    bases: BTreeMap<String, Vec<String>>,
}

impl InheritanceTree {
    /// Builds the tree from contract definitions. A later contract with the
    /// same name replaces an earlier one.
    pub fn build<'a>(contracts: impl IntoIterator<Item = &'a ContractNode>) -> Self {
        let mut bases = BTreeMap::new();
        for contract in contracts {
            if !contract.bases.is_empty() {
                bases.insert(contract.name.clone(), contract.bases.clone());
            }
        }
        Self { bases }
    }

    /// Immediate bases of `contract`, empty if it has none or is unknown.
    pub fn bases_of(&self, contract: &str) -> &[String] {
        self.bases.get(contract).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterates over the contracts that declare bases.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.bases.iter()
    }

    /// Returns `true` if no contract declares a base.
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Computes the linearization of every contract in the tree.
    pub fn linearize(&self) -> Linearization {
        let mut memo = HashMap::new();
        let mut linearization = Linearization::default();
        for contract in self.bases.keys() {
            match self.linearize_contract(contract, &mut memo) {
                Ok(ancestors) => {
                    debug!(contract = %contract, ?ancestors, "linearized contract");
                    linearization.entries.insert(contract.clone(), ancestors);
                }
                Err(err) => {
                    warn!(contract = %contract, error = %err, "failed to linearize contract");
                    linearization.failures.insert(contract.clone(), err);
                }
            }
        }
        linearization
    }

    /// Computes the ancestors of a single contract, nearest first, self excluded.
    pub fn linearize_one(&self, contract: &str) -> Result<Vec<String>, InheritanceError> {
        self.linearize_contract(contract, &mut HashMap::new())
    }

    fn linearize_contract(
        &self,
        contract: &str,
        memo: &mut HashMap<String, Vec<String>>,
    ) -> Result<Vec<String>, InheritanceError> {
        let mut active = Vec::new();
        let mut full = self.c3(contract, memo, &mut active)?;
        // The C3 result starts with the contract itself.
        full.remove(0);
        Ok(full)
    }

    /// `L(C) = C + merge(L(B1), ..., L(Bn), [B1, ..., Bn])`
    fn c3(
        &self,
        contract: &str,
        memo: &mut HashMap<String, Vec<String>>,
        active: &mut Vec<String>,
    ) -> Result<Vec<String>, InheritanceError> {
        if let Some(done) = memo.get(contract) {
            return Ok(done.clone());
        }
        if let Some(pos) = active.iter().position(|c| c == contract) {
            let mut path = active[pos..].to_vec();
            path.push(contract.to_string());
            return Err(InheritanceError::CyclicInheritance { contract: contract.to_string(), path });
        }

        active.push(contract.to_string());
        let bases = self.bases_of(contract);
        let mut sequences = Vec::with_capacity(bases.len() + 1);
        for base in bases {
            sequences.push(self.c3(base, memo, active)?);
        }
        sequences.push(bases.to_vec());
        let merged = merge(contract, sequences)?;
        active.pop();

        let mut result = Vec::with_capacity(merged.len() + 1);
        result.push(contract.to_string());
        result.extend(merged);
        memo.insert(contract.to_string(), result.clone());
        Ok(result)
    }

    /// Counts, for every transitive ancestor of `root`, how many inheritance
    /// paths reach it, and keeps the ones reached more than once.
    pub fn detect_diamonds(&self, root: &str) -> Result<DiamondReport, InheritanceError> {
        let mut counts = BTreeMap::new();
        let mut active = vec![root.to_string()];
        self.count_paths(root, &mut counts, &mut active)?;
        counts.retain(|_, count| *count > 1);

        let report = DiamondReport { root: root.to_string(), counts };
        if report.is_empty() {
            info!(contract = root, "no diamond inheritance detected");
        } else {
            info!(contract = root, diamonds = ?report.counts, "diamond inheritance detected");
        }
        Ok(report)
    }

    fn count_paths(
        &self,
        contract: &str,
        counts: &mut BTreeMap<String, usize>,
        active: &mut Vec<String>,
    ) -> Result<(), InheritanceError> {
        for base in self.bases_of(contract) {
            if let Some(pos) = active.iter().position(|c| c == base) {
                let mut path = active[pos..].to_vec();
                path.push(base.clone());
                return Err(InheritanceError::CyclicInheritance { contract: base.clone(), path });
            }
            *counts.entry(base.clone()).or_default() += 1;
            active.push(base.clone());
            self.count_paths(base, counts, active)?;
            active.pop();
        }
        Ok(())
    }
}

/// The standard C3 merge: repeatedly take the first sequence head that does
/// not appear in the tail of any sequence.
fn merge(contract: &str, sequences: Vec<Vec<String>>) -> Result<Vec<String>, InheritanceError> {
    let mut sequences: Vec<VecDeque<String>> =
        sequences.into_iter().map(VecDeque::from).collect();
    let mut result = Vec::new();

    loop {
        sequences.retain(|seq| !seq.is_empty());
        if sequences.is_empty() {
            return Ok(result);
        }

        let candidate = sequences
            .iter()
            .filter_map(VecDeque::front)
            .find(|head| !sequences.iter().any(|seq| seq.iter().skip(1).any(|c| c == *head)))
            .cloned();

        let Some(candidate) = candidate else {
            return Err(InheritanceError::InconsistentHierarchy {
                contract: contract.to_string(),
                remaining: sequences.into_iter().map(Vec::from).collect(),
            });
        };

        for seq in sequences.iter_mut() {
            if seq.front() == Some(&candidate) {
                seq.pop_front();
            }
        }
        result.push(candidate);
    }
}

/// Contract name to its ancestors, nearest first, self excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Linearization {
    entries: BTreeMap<String, Vec<String>>,
    failures: BTreeMap<String, InheritanceError>,
}

impl Linearization {
    /// Returns the linearization of `contract`.
    ///
    /// A contract without bases linearizes to an empty list.
    pub fn get(&self, contract: &str) -> Result<&[String], &InheritanceError> {
        if let Some(err) = self.failures.get(contract) {
            return Err(err);
        }
        Ok(self.entries.get(contract).map(Vec::as_slice).unwrap_or_default())
    }

    /// Iterates over the successfully linearized contracts.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.entries.iter()
    }

    /// Iterates over the contracts whose linearization failed.
    pub fn failures(&self) -> impl Iterator<Item = (&String, &InheritanceError)> {
        self.failures.iter()
    }
}

/// Ancestors of a root contract reached through more than one inheritance path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiamondReport {
    /// The contract the report was computed for.
    pub root: String,
    /// Ancestor name to the number of distinct paths reaching it (always > 1).
    pub counts: BTreeMap<String, usize>,
}

impl DiamondReport {
    /// Returns `true` if every ancestor is reached through a single path.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
