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

//! Analyzer configuration.
//!
//! Configuration is plain TOML; every field is optional:
//!
//! ```toml
//! mapping_scope = "per_contract"
//! parallel = true
//! focus_contract = "Token"
//! ```

use std::{fs, path::Path, str::FromStr};

use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which mapping declarations are visible when looking for mapping writes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum MappingScope {
    /// Every mapping declared in the contract itself or in any contract
    /// written before it in the source unit.
    #[default]
    #[display("global")]
    Global,
    /// The contract's own mappings plus those of its linearized ancestors.
    #[display("per-contract")]
    PerContract,
}

impl FromStr for MappingScope {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "global" => Ok(Self::Global),
            "per-contract" => Ok(Self::PerContract),
            other => Err(eyre::eyre!("unknown mapping scope '{other}'")),
        }
    }
}

/// Settings controlling a single analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Mapping visibility for the write-path analysis.
    pub mapping_scope: MappingScope,
    /// Analyze contracts for mapping writes on the rayon thread pool.
    pub parallel: bool,
    /// Contract to run diamond detection for. Defaults to the last contract
    /// defined in the source unit.
    pub focus_contract: Option<String>,
}

impl AnalyzerConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).wrap_err("Failed to parse analyzer config")
    }

    /// Loads a configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        debug!(?config, "Loaded analyzer config from {}", path.display());
        Ok(config)
    }

    /// Serializes the configuration back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).wrap_err("Failed to serialize analyzer config to TOML")
    }

    /// Sets the mapping scope.
    pub fn with_mapping_scope(mut self, scope: MappingScope) -> Self {
        self.mapping_scope = scope;
        self
    }

    /// Enables or disables parallel mapping-write analysis.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the contract diamond detection runs for.
    pub fn with_focus_contract(mut self, contract: impl Into<String>) -> Self {
        self.focus_contract = Some(contract.into());
        self
    }
}
