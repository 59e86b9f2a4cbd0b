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


//! Solsema - Solidity Semantic Model
//!
//! Reads the JSON syntax tree of one Solidity source unit and prints the
//! derived semantic model.

use std::{fs, path::PathBuf};

use clap::{Parser, ValueEnum};
use eyre::{Result, WrapErr};
use solsema_engine::{Analyzer, AnalyzerConfig, MappingScope};

/// Command-line interface for Solsema
#[derive(Debug, Parser)]
#[command(name = "solsema")]
#[command(about = "Solsema - semantic model extraction for Solidity syntax trees")]
#[command(version)]
pub struct Cli {
    /// Path to the syntax tree JSON (legacy parser output or solc AST)
    pub ast: PathBuf,

    /// Contract to report diamond inheritance for (default: last contract)
    #[arg(long)]
    pub contract: Option<String>,

    /// Analyzer configuration file (TOML)
    #[arg(long, env = "SOLSEMA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Which mappings a function may write to
    #[arg(long, value_enum)]
    pub mapping_scope: Option<ScopeArg>,

    /// Analyze contracts in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Also write logs to a rolling file
    #[arg(long)]
    pub log_file: bool,
}

/// Mapping visibility
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScopeArg {
    /// Mappings declared so far in the source unit
    Global,
    /// Own and inherited mappings only
    PerContract,
}

impl From<ScopeArg> for MappingScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Global => Self::Global,
            ScopeArg::PerContract => Self::PerContract,
        }
    }
}

/// Available output formats
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// The full analysis as JSON
    Json,
    /// Human-readable report
    Pretty,
}

fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    solsema_common::init_logging("solsema", cli.log_file)?;

    let config = build_config(&cli)?;
    tracing::debug!(?config, "Effective analyzer config");

    let content = fs::read_to_string(&cli.ast)
        .with_context(|| format!("Failed to read syntax tree: {}", cli.ast.display()))?;
    let tree: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", cli.ast.display()))?;

    tracing::info!("Analyzing {}", cli.ast.display());
    let analysis = Analyzer::new(config)
        .analyze(&tree)
        .with_context(|| format!("Failed to analyze {}", cli.ast.display()))?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&analysis)?),
        OutputFormat::Pretty => print!("{}", analysis.pretty_display()),
    }

    Ok(())
}

/// Merges the config file (if any) with command-line overrides.
fn build_config(cli: &Cli) -> Result<AnalyzerConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalyzerConfig::from_toml_file(path)?,
        None => AnalyzerConfig::default(),
    };
    if let Some(scope) = cli.mapping_scope {
        config.mapping_scope = scope.into();
    }
    if cli.parallel {
        config.parallel = true;
    }
    if let Some(contract) = &cli.contract {
        config.focus_contract = Some(contract.clone());
    }
    Ok(config)
}
