use std::collections::BTreeMap;

use solsema_common::test_utils::load_fixture;
use solsema_engine::{Analyzer, AnalyzerConfig, InheritanceError};
use tracing::info;

#[test]
fn test_single_inheritance_chain() {
    solsema_common::logging::ensure_test_logging(None);
    info!("Running test");
    let tree = load_fixture("legacy/token.json").unwrap();
    let analysis = Analyzer::default().analyze(&tree).unwrap();

    let token = analysis.contract("Token").unwrap();
    assert_eq!(token.parents, ["Ownable"]);
    assert!(analysis.contract("Ownable").unwrap().parents.is_empty());
}

#[test]
fn test_diamond_linearization_and_report() {
    solsema_common::logging::ensure_test_logging(None);
    info!("Running test");
    let tree = load_fixture("legacy/diamond.json").unwrap();
    let analysis = Analyzer::default().analyze(&tree).unwrap();

    let d = analysis.contract("D").unwrap();
    assert_eq!(d.parents, ["B", "C", "A"]);

    // D is the last contract, so it is the default focus.
    let report = analysis.diamonds.as_ref().unwrap();
    assert_eq!(report.root, "D");
    assert_eq!(report.counts, BTreeMap::from([("A".to_string(), 2)]));

    let names: Vec<_> = d.function_names.iter().map(String::as_str).collect();
    assert_eq!(names, ["base", "left", "right"]);

    // B contributes `a` first; C's copy of `a` is a duplicate.
    let vars: Vec<_> = d.state_variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(vars, ["a", "b", "c", "d"]);
}

#[test]
fn test_diamond_report_for_chosen_contract() {
    solsema_common::logging::ensure_test_logging(None);
    info!("Running test");
    let tree = load_fixture("legacy/diamond.json").unwrap();
    let analysis =
        Analyzer::new(AnalyzerConfig::default().with_focus_contract("B")).analyze(&tree).unwrap();

    let report = analysis.diamonds.unwrap();
    assert_eq!(report.root, "B");
    assert!(report.is_empty());
}

#[test]
fn test_inconsistent_hierarchy_is_isolated() {
    solsema_common::logging::ensure_test_logging(None);
    info!("Running test");
    let tree = load_fixture("legacy/inconsistent.json").unwrap();
    let analysis = Analyzer::default().analyze(&tree).unwrap();

    let z = analysis.contract("Z").unwrap();
    assert!(z.parents.is_empty());
    assert_eq!(z.errors.len(), 1);
    assert!(matches!(
        &z.errors[0],
        InheritanceError::InconsistentHierarchy { contract, .. } if contract == "Z"
    ));
    // Z keeps its own state.
    assert_eq!(z.state_variables[0].name, "z");

    // Siblings are unaffected.
    assert_eq!(analysis.contract("X").unwrap().parents, ["A", "B"]);
    assert_eq!(analysis.contract("Y").unwrap().parents, ["B", "A"]);
    assert!(analysis.contract("X").unwrap().errors.is_empty());

    assert_eq!(analysis.version_req.unwrap().to_string(), "^0.5.0");
}

#[test]
fn test_version_range_pragma() {
    solsema_common::logging::ensure_test_logging(None);
    info!("Running test");
    let tree = load_fixture("legacy/diamond.json").unwrap();
    let analysis = Analyzer::default().analyze(&tree).unwrap();

    assert_eq!(analysis.compiler_version.as_deref(), Some(">=0.4.22 <0.9.0"));
    assert_eq!(analysis.version_req.unwrap().to_string(), ">=0.4.22, <0.9.0");
}
