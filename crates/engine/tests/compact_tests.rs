use solsema_common::test_utils::load_fixture;
use solsema_engine::{
    Analyzer, AnalyzerConfig, ArrayLength, MappingScope, TypeDescriptor, UnitAnalysis,
};
use tracing::info;

fn analyze_vault(config: AnalyzerConfig) -> UnitAnalysis {
    let tree = load_fixture("compact/vault.json").unwrap();
    Analyzer::new(config).analyze(&tree).unwrap()
}

#[test]
fn test_vault_state_variables() {
    solsema_common::logging::ensure_test_logging(None);
    info!("Running test");
    let analysis = analyze_vault(AnalyzerConfig::default());

    assert_eq!(analysis.compiler_version.as_deref(), Some("^0.8.19"));

    let vault = analysis.contract("Vault").unwrap();
    let names: Vec<_> = vault.state_variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(
        names,
        ["pending", "latest", "position", "status", "grid", "history", "admin", "deposits", "claimed"]
    );
}

#[test]
fn test_struct_forward_reference_and_enum_members() {
    solsema_common::logging::ensure_test_logging(None);
    info!("Running test");
    let analysis = analyze_vault(AnalyzerConfig::default());
    let vault = analysis.contract("Vault").unwrap();

    // `pending` is declared before `Order` is defined.
    assert_eq!(
        vault.state_variable("pending").unwrap().ty,
        TypeDescriptor::UserDefined { name: "Order".into(), members: vec![] }
    );

    let TypeDescriptor::UserDefined { members, .. } = &vault.state_variable("latest").unwrap().ty
    else {
        panic!("expected struct");
    };
    assert_eq!(members.len(), 2);
    assert_eq!(members[1].ty, TypeDescriptor::Enum { name: "Status".into() });

    let TypeDescriptor::UserDefined { members, .. } =
        &vault.state_variable("position").unwrap().ty
    else {
        panic!("expected struct");
    };
    let member_names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(member_names, ["amount", "owner"]);

    assert_eq!(
        vault.state_variable("status").unwrap().ty,
        TypeDescriptor::Enum { name: "Status".into() }
    );
    assert!(analysis.types.is_enum("Status"));
}

#[test]
fn test_fixed_array_dimensions() {
    solsema_common::logging::ensure_test_logging(None);
    info!("Running test");
    let analysis = analyze_vault(AnalyzerConfig::default());
    let vault = analysis.contract("Vault").unwrap();

    let grid = &vault.state_variable("grid").unwrap().ty;
    let TypeDescriptor::Array { element, dimensions } = grid else {
        panic!("expected array, got {grid:?}");
    };
    assert_eq!(**element, TypeDescriptor::Elementary { name: "uint8".into() });
    assert_eq!(
        dimensions.iter().map(|d| d.length.clone()).collect::<Vec<_>>(),
        [Some(ArrayLength::Literal("2".into())), Some(ArrayLength::Literal("3".into()))]
    );
    assert!(grid.is_static());
    assert!(!vault.state_variable("history").unwrap().ty.is_static());
}

#[test]
fn test_constants_and_immutables() {
    solsema_common::logging::ensure_test_logging(None);
    info!("Running test");
    let analysis = analyze_vault(AnalyzerConfig::default());

    assert_eq!(analysis.constants.len(), 1);
    assert_eq!(analysis.constants[0].name, "MAX_SUPPLY");
    assert_eq!(analysis.constants[0].declared_type, "uint256");
    assert_eq!(analysis.constants[0].value, "1000");

    // An immutable without a literal initializer stays a state variable.
    assert!(analysis.contract("Vault").unwrap().state_variable("admin").is_some());
}

#[test]
fn test_special_functions_and_modifiers() {
    solsema_common::logging::ensure_test_logging(None);
    info!("Running test");
    let analysis = analyze_vault(AnalyzerConfig::default());
    let vault = analysis.contract("Vault").unwrap();

    let names: Vec<_> = vault.function_names.iter().map(String::as_str).collect();
    assert_eq!(names, ["claimAll", "constructor", "deposit", "drain", "isEmpty", "receive"]);
    assert!(vault.functions.iter().any(|f| f.name == "tracked"));
}

#[test]
fn test_mapping_writes_global_scope() {
    solsema_common::logging::ensure_test_logging(None);
    info!("Running test");
    let analysis = analyze_vault(AnalyzerConfig::default());

    let records: Vec<_> = analysis
        .mapping_writes
        .iter()
        .map(|r| (r.contract.as_str(), r.mapping.as_str(), r.key_path.join(" ")))
        .collect();
    assert_eq!(
        records,
        [
            ("Mirror", "entries", "set key".to_string()),
            ("Mirror", "deposits", "set key".to_string()),
            ("Vault", "deposits", "tracked tx.origin".to_string()),
            ("Vault", "deposits", "deposit msg.sender".to_string()),
            ("Vault", "claimed", "claimAll msg.sender 7".to_string()),
            ("Vault", "claimed", "claimAll owner id".to_string()),
        ]
    );

    let writers = analysis.mapping_writers();
    let vault_writers: Vec<_> = writers["Vault"].iter().copied().collect();
    // `drain` only writes inside a while loop, which is not traversed.
    assert_eq!(vault_writers, ["claimAll", "deposit", "tracked"]);
}

#[test]
fn test_mapping_writes_per_contract_scope() {
    solsema_common::logging::ensure_test_logging(None);
    info!("Running test");
    let analysis =
        analyze_vault(AnalyzerConfig::default().with_mapping_scope(MappingScope::PerContract));

    let mirror: Vec<_> = analysis
        .mapping_writes
        .iter()
        .filter(|r| r.contract == "Mirror")
        .map(|r| r.mapping.as_str())
        .collect();
    assert_eq!(mirror, ["entries"]);
    assert_eq!(analysis.mapping_writes.len(), 5);
}

#[test]
fn test_parallel_run_is_identical() {
    solsema_common::logging::ensure_test_logging(None);
    info!("Running test");
    let sequential = analyze_vault(AnalyzerConfig::default());
    let parallel = analyze_vault(AnalyzerConfig::default().with_parallel(true));

    assert_eq!(sequential, parallel);
    assert_eq!(
        serde_json::to_value(&sequential).unwrap(),
        serde_json::to_value(&parallel).unwrap()
    );
}
