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

//! The analysis pipeline.
//!
//! Phases run strictly in order over one source unit:
//!
//! 1. lowering through the schema facade,
//! 2. inheritance tree construction and linearization,
//! 3. contract aggregation (which also fills the type registry),
//! 4. mapping-write detection once every table is frozen,
//! 5. diamond detection for the focus contract.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use rayon::prelude::*;
use semver::VersionReq;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    analysis::{
        CallableWrites, ConstantVar, ContractAggregator, ContractDetail, DiamondReport,
        InheritanceError, InheritanceTree, Linearization, MappingRegistry, MappingWriteAnalyzer,
        MappingWriteRecord, TypeRegistry,
    },
    ast::{source_unit_nodes, Schema, SourceUnitNode},
    AnalyzerConfig,
};

/// Errors reported by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AnalysisError {
    /// An inheritance hierarchy could not be resolved.
    #[error(transparent)]
    Inheritance(#[from] InheritanceError),

    /// The input holds no list of top-level nodes.
    #[error("no source unit found in the syntax tree")]
    MissingSourceUnit,

    /// None of the top-level nodes belongs to a known schema.
    #[error("top-level nodes match neither the legacy nor the compact schema")]
    UnknownSchema,

    /// The configuration does not fit the analyzed unit.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Everything derived from one source unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitAnalysis {
    /// Version string of the first `pragma solidity`, as written.
    pub compiler_version: Option<String>,
    /// `compiler_version` parsed as a version requirement, when it parses.
    pub version_req: Option<VersionReq>,
    /// Immediate bases per contract.
    pub inheritance: InheritanceTree,
    /// Linearized ancestors per contract.
    pub linearization: Linearization,
    /// Diamond report for the focus contract.
    pub diamonds: Option<DiamondReport>,
    /// User-defined structs and enums.
    pub types: TypeRegistry,
    /// Per-contract details.
    pub contracts: BTreeMap<String, ContractDetail>,
    /// Literal-initialized constants and immutables.
    pub constants: Vec<ConstantVar>,
    /// The mapping names and scope used for write detection.
    pub mappings: MappingRegistry,
    /// Detected mapping writes, by contract name then declaration order.
    pub mapping_writes: Vec<MappingWriteRecord>,
    /// Unit-level problems that did not stop the analysis.
    pub errors: Vec<AnalysisError>,
}

impl UnitAnalysis {
    /// Looks up a contract by name.
    pub fn contract(&self, name: &str) -> Option<&ContractDetail> {
        self.contracts.get(name)
    }

    /// Raw callable definitions per contract.
    pub fn function_bodies(&self) -> BTreeMap<&str, BTreeMap<&str, &Value>> {
        self.contracts.iter().map(|(name, detail)| (name.as_str(), detail.function_bodies())).collect()
    }

    /// Mapping-writing callables per contract. Contracts without any are omitted.
    pub fn mapping_writers(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        self.contracts
            .iter()
            .map(|(name, detail)| (name.as_str(), detail.mapping_writers()))
            .filter(|(_, writers)| !writers.is_empty())
            .collect()
    }

    /// Renders the analysis as a human-readable report.
    ///
    /// ```text
    /// === Solsema Analysis Report ===
    /// Compiler: ^0.8.0
    ///
    /// === Contracts (2 total) ===
    /// contract Token is Ownable
    ///   Linearization: Ownable
    ///   Functions: owner, transfer
    ///   State variables:
    ///     owner: address
    ///     balances: mapping(address => uint256)
    ///   Mappings: balances (address)
    ///   Mapping writers: transfer
    ///
    /// === Mapping Writes (1 total) ===
    ///   Token.transfer writes balances at [transfer, msg.sender]
    /// === End Report ===
    /// ```
    pub fn pretty_display(&self) -> String {
        let mut output = String::new();

        output.push_str("=== Solsema Analysis Report ===\n");
        if let Some(version) = &self.compiler_version {
            output.push_str(&format!("Compiler: {version}\n"));
        }
        output.push('\n');

        output.push_str(&format!("=== Contracts ({} total) ===\n", self.contracts.len()));
        for detail in self.contracts.values() {
            let bases = self.inheritance.bases_of(&detail.name);
            if bases.is_empty() {
                output.push_str(&format!("{} {}\n", detail.kind, detail.name));
            } else {
                output.push_str(&format!("{} {} is {}\n", detail.kind, detail.name, bases.join(", ")));
            }
            if !detail.parents.is_empty() {
                output.push_str(&format!("  Linearization: {}\n", detail.parents.join(", ")));
            }
            for err in &detail.errors {
                output.push_str(&format!("  Error: {err}\n"));
            }
            if !detail.function_names.is_empty() {
                output.push_str(&format!("  Functions: {}\n", detail.function_names.iter().join(", ")));
            }
            if !detail.state_variables.is_empty() {
                output.push_str("  State variables:\n");
                for var in &detail.state_variables {
                    output.push_str(&format!("    {}: {}\n", var.name, var.ty));
                }
            }
            if !detail.mapping_declarations.is_empty() {
                let mappings = detail
                    .mapping_declarations
                    .iter()
                    .map(|m| format!("{} ({})", m.name, m.key_type))
                    .join(", ");
                output.push_str(&format!("  Mappings: {mappings}\n"));
            }
            let writers = detail.mapping_writers();
            if !writers.is_empty() {
                output.push_str(&format!("  Mapping writers: {}\n", writers.iter().join(", ")));
            }
        }
        output.push('\n');

        if !self.mapping_writes.is_empty() {
            output.push_str(&format!("=== Mapping Writes ({} total) ===\n", self.mapping_writes.len()));
            for record in &self.mapping_writes {
                output.push_str(&format!(
                    "  {}.{} writes {} at [{}]\n",
                    record.contract,
                    record.function,
                    record.mapping,
                    record.key_path.join(", ")
                ));
            }
            output.push('\n');
        }

        if !self.constants.is_empty() {
            output.push_str(&format!("=== Constants ({} total) ===\n", self.constants.len()));
            for constant in &self.constants {
                output.push_str(&format!(
                    "  {}.{}: {} = {}\n",
                    constant.contract, constant.name, constant.declared_type, constant.value
                ));
            }
            output.push('\n');
        }

        if let Some(report) = &self.diamonds {
            output.push_str(&format!("=== Diamonds for {} ===\n", report.root));
            if report.is_empty() {
                output.push_str("  none\n");
            }
            for (ancestor, count) in &report.counts {
                output.push_str(&format!("  {ancestor} reached through {count} paths\n"));
            }
            output.push('\n');
        }

        for err in &self.errors {
            output.push_str(&format!("Error: {err}\n"));
        }

        output.push_str("=== End Report ===\n");
        output
    }
}

/// Runs the analysis pipeline over source units.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Creates an analyzer with the given configuration.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyzes a parsed syntax tree: a node array, a `SourceUnit` in either
    /// schema, or a compiler output wrapping one in `ast`.
    pub fn analyze(&self, tree: &Value) -> Result<UnitAnalysis, AnalysisError> {
        let nodes = source_unit_nodes(tree).ok_or(AnalysisError::MissingSourceUnit)?;
        if !nodes.is_empty() && nodes.iter().all(|node| Schema::detect(node).is_none()) {
            return Err(AnalysisError::UnknownSchema);
        }
        Ok(self.analyze_nodes(nodes))
    }

    /// Analyzes a list of top-level nodes.
    pub fn analyze_nodes(&self, nodes: &[Value]) -> UnitAnalysis {
        self.analyze_unit(&SourceUnitNode::lower(nodes))
    }

    /// Analyzes an already lowered source unit.
    #[instrument(level = "debug", skip_all, fields(items = unit.items.len()))]
    pub fn analyze_unit(&self, unit: &SourceUnitNode) -> UnitAnalysis {
        let mut analysis = UnitAnalysis {
            compiler_version: unit.solidity_pragma().map(String::from),
            ..Default::default()
        };
        analysis.version_req = analysis.compiler_version.as_deref().and_then(parse_version_req);

        analysis.inheritance = InheritanceTree::build(unit.contracts());
        analysis.linearization = analysis.inheritance.linearize();

        let aggregation = ContractAggregator::new().aggregate(unit, &analysis.linearization);
        analysis.contracts = aggregation.details;
        analysis.constants = aggregation.constants;
        analysis.types = aggregation.registry;

        analysis.mappings = MappingRegistry::build(
            unit.contracts().map(|c| c.name.as_str()),
            &analysis.contracts,
            self.config.mapping_scope,
        );
        analysis.mapping_writes = self.detect_mapping_writes(&mut analysis.contracts, &analysis.mappings);

        let focus = self
            .config
            .focus_contract
            .clone()
            .or_else(|| unit.contracts().last().map(|c| c.name.clone()));
        if let Some(focus) = focus {
            if !analysis.contracts.contains_key(&focus) {
                warn!(contract = %focus, "focus contract is not defined in this unit");
                analysis.errors.push(AnalysisError::Config(format!(
                    "focus contract `{focus}` is not defined"
                )));
            } else {
                match analysis.inheritance.detect_diamonds(&focus) {
                    Ok(report) => analysis.diamonds = Some(report),
                    Err(err) => {
                        warn!(contract = %focus, error = %err, "diamond detection failed");
                        analysis.errors.push(err.into());
                    }
                }
            }
        }

        info!(
            contracts = analysis.contracts.len(),
            mapping_writes = analysis.mapping_writes.len(),
            constants = analysis.constants.len(),
            "analysis finished"
        );
        analysis
    }

    /// Marks mapping-writing callables and collects the write records.
    #[instrument(level = "debug", skip_all, fields(scope = %mappings.scope(), parallel = self.config.parallel))]
    fn detect_mapping_writes(
        &self,
        contracts: &mut BTreeMap<String, ContractDetail>,
        mappings: &MappingRegistry,
    ) -> Vec<MappingWriteRecord> {
        let frozen: &BTreeMap<String, ContractDetail> = contracts;
        let analyze = |(name, detail): (&String, &ContractDetail)| -> (String, Vec<CallableWrites>) {
            let visible = mappings.visible_to(detail, frozen);
            (name.clone(), MappingWriteAnalyzer::new(name, &visible).analyze_contract(detail))
        };

        let results: Vec<_> = if self.config.parallel {
            frozen.par_iter().map(analyze).collect()
        } else {
            frozen.iter().map(analyze).collect()
        };

        let mut records = Vec::new();
        for (name, writes) in results {
            let Some(detail) = contracts.get_mut(&name) else { continue };
            for (function, writes) in detail.functions.iter_mut().zip(writes) {
                function.writes_mapping |= writes.writes_mapping;
                records.extend(writes.records);
            }
        }
        debug!(records = records.len(), "mapping-write detection finished");
        records
    }
}

/// Parses a Solidity version pragma into a semver requirement.
///
/// Comparators in a pragma are juxtaposed (`>=0.4.22 <0.9.0`, or with no
/// space at all once concatenated from tokens) and a bare version means an
/// exact match. Alternatives (`||`) are not supported.
pub fn parse_version_req(pragma: &str) -> Option<VersionReq> {
    let mut comparators = Vec::new();
    let mut current = String::new();
    let mut in_version = false;
    for ch in pragma.chars().filter(|c| !c.is_whitespace()) {
        let is_operator = matches!(ch, '<' | '>' | '=' | '^' | '~');
        if is_operator && in_version {
            comparators.push(std::mem::take(&mut current));
            in_version = false;
        }
        if !is_operator {
            in_version = true;
        }
        current.push(ch);
    }
    if !current.is_empty() {
        comparators.push(current);
    }

    let normalized = comparators
        .into_iter()
        .map(|c| if c.starts_with(|ch: char| ch.is_ascii_digit()) { format!("={c}") } else { c })
        .join(", ");
    match VersionReq::parse(&normalized) {
        Ok(req) => Some(req),
        Err(err) => {
            debug!(pragma, error = %err, "unparsable solidity version pragma");
            None
        }
    }
}
