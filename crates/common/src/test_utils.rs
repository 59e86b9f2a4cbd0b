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

//! Test utilities for loading AST fixtures.
//!
//! Fixtures live in the workspace-level `testdata/` directory and are grouped
//! by schema (`legacy/` for the solidity-parser shape, `compact/` for the
//! solc shape).

use std::{fs, path::PathBuf};

use eyre::{Result, WrapErr};
use serde_json::Value;
use tracing::debug;

/// Get the testdata root directory.
pub fn get_testdata_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|root| root.join("testdata"))
        .unwrap_or_else(|| PathBuf::from("testdata"))
}

/// Returns the path of a fixture relative to the testdata root.
pub fn fixture_path(relative: &str) -> PathBuf {
    get_testdata_root().join(relative)
}

/// Loads and parses a JSON fixture, e.g. `load_fixture("legacy/token.json")`.
pub fn load_fixture(relative: &str) -> Result<Value> {
    let path = fixture_path(relative);
    let content = fs::read_to_string(&path)
        .wrap_err_with(|| format!("Failed to read fixture {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .wrap_err_with(|| format!("Failed to parse fixture {}", path.display()))?;
    debug!(fixture = %path.display(), "Loaded fixture");
    Ok(value)
}
