//! End-to-end tests against the fixture registry and widget tree
//!
//! Covers extraction, in-place rewrites through `RegistryFile`, and
//! directory validation with the default include globs.

use std::fs;
use std::path::{Path, PathBuf};

use sensor_registry::mnemonic::DEFAULT_ALARM_BLOCK;
use sensor_registry::validate::report::{render_findings, render_schema_summary};
use sensor_registry::validate::{DynamicKeyReason, DEFAULT_INCLUDE};
use sensor_registry::{
    assign_mnemonics, find_collisions, strip_alarm_mnemonics, MetricKeyValidator, MnemonicTable,
    RegistryFile, SchemaExtractor, ValidationFinding,
};

const REGISTRY: &str = include_str!("fixtures/registry.ts");

fn fixtures_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn temp_registry() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.ts");
    fs::write(&path, REGISTRY).unwrap();
    (dir, path)
}

// =============================================================================
// Schema Extraction
// =============================================================================

#[test]
fn test_extracts_fixture_schema() {
    let schema = SchemaExtractor::new().extract(REGISTRY).unwrap();

    let sensors: Vec<&str> = schema.sensors().map(|s| s.sensor_type.as_str()).collect();
    assert_eq!(sensors, vec!["depth", "engine", "gps"]);

    assert_eq!(
        schema.get("depth").unwrap().field_keys(),
        vec!["depth", "depthSource", "offset"]
    );
    assert_eq!(
        schema.get("engine").unwrap().field_keys(),
        vec!["rpm", "coolantTemp", "oilPressure", "fooBar"]
    );
    assert_eq!(schema.get("gps").unwrap().field_keys(), vec!["latitude", "longitude"]);
    assert_eq!(
        schema.get("depth").unwrap().fields[1].mnemonic.as_deref(),
        Some("SRC")
    );
}

#[test]
fn test_reserved_identifiers_and_fieldless_sensors_excluded() {
    let schema = SchemaExtractor::new().extract(REGISTRY).unwrap();
    assert!(!schema.contains("critical"));
    assert!(!schema.contains("warning"));
    assert!(!schema.contains("wind"));

    let unreserved = SchemaExtractor::new()
        .with_reserved(Vec::<String>::new())
        .extract(REGISTRY)
        .unwrap();
    assert!(unreserved.contains("critical"));
    assert!(unreserved.get("critical").unwrap().fields.is_empty());
}

#[test]
fn test_schema_summary_lines() {
    let schema = SchemaExtractor::new().extract(REGISTRY).unwrap();
    let summary = render_schema_summary(&schema);
    assert!(summary.starts_with("=== SENSOR SCHEMAS ===\n"));
    assert!(summary.contains("engine: rpm, coolantTemp, oilPressure, fooBar\n"));
}

// =============================================================================
// Mnemonic Maintenance
// =============================================================================

#[test]
fn test_assign_fixture() {
    let outcome = assign_mnemonics(REGISTRY, &MnemonicTable::builtin()).unwrap();

    let assigned: Vec<(&str, &str)> = outcome
        .assigned
        .iter()
        .map(|a| (a.key.as_str(), a.mnemonic.as_str()))
        .collect();
    assert_eq!(
        assigned,
        vec![
            ("depth", "DPT"),
            ("offset", "OFS"),
            ("rpm", "RPM"),
            ("coolantTemp", "ECT"),
            ("oilPressure", "EOP"),
            ("fooBar", "FOOBA"),
        ]
    );
    assert_eq!(outcome.already_present, 4);
    assert_eq!(outcome.unmapped(), vec!["fooBar"]);

    // nested option blocks belong to their field
    assert!(!outcome.text.contains("key: 'dbt', label: 'Below transducer', mnemonic"));
    assert!(outcome
        .text
        .contains("        label: 'Keel offset',\n        mnemonic: 'OFS',\n        type: 'number', // metres\n"));
}

#[test]
fn test_sync_in_place() {
    let (_dir, path) = temp_registry();
    let file = RegistryFile::read(&path).unwrap();
    let outcome = file.sync(&MnemonicTable::builtin(), DEFAULT_ALARM_BLOCK).unwrap();

    assert_eq!(outcome.strip.blocks, 2);
    assert_eq!(outcome.strip.removed.len(), 3);
    assert!(file.rewrite(outcome.text()).commit().unwrap());

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("      { key: 'oilPressure', label: 'Oil pressure' },\n"));
    assert_eq!(written.matches("mnemonic:").count(), 7);

    // a second pass re-assigns alarm entries, strips them again and writes nothing
    let again = RegistryFile::read(&path).unwrap();
    let second = again.sync(&MnemonicTable::builtin(), DEFAULT_ALARM_BLOCK).unwrap();
    assert_eq!(second.text(), written);
    assert!(!again.rewrite(second.text()).commit().unwrap());
}

#[test]
fn test_strip_leaves_field_definitions_alone() {
    let stripped = strip_alarm_mnemonics(REGISTRY, DEFAULT_ALARM_BLOCK).unwrap();
    let before = SchemaExtractor::new().extract(REGISTRY).unwrap();
    let after = SchemaExtractor::new().extract(&stripped.text).unwrap();
    assert_eq!(before, after);
    assert!(stripped.text.contains("        mnemonic: 'SRC',\n"));
}

#[test]
fn test_dry_run_diff() {
    let (_dir, path) = temp_registry();
    let file = RegistryFile::read(&path).unwrap();
    let outcome = file.assign(&MnemonicTable::builtin()).unwrap();
    let rewrite = file.rewrite(outcome.text.clone());

    let diff = rewrite.diff();
    assert!(diff.contains("+        mnemonic: 'FOOBA',"));
    assert!(!diff.contains("-        label:"));
    // nothing is written without a commit
    assert_eq!(fs::read_to_string(&path).unwrap(), REGISTRY);
}

#[test]
fn test_table_file_replaces_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let table_path = dir.path().join("mnemonics.toml");
    fs::write(&table_path, "[mnemonics]\nfooBar = \"FB\"\nrpm = \"REV\"\n").unwrap();

    let table = MnemonicTable::load(&table_path).unwrap();
    let outcome = assign_mnemonics(REGISTRY, &table).unwrap();
    let codes: Vec<&str> = outcome.assigned.iter().map(|a| a.mnemonic.as_str()).collect();
    assert!(codes.contains(&"FB"));
    assert!(codes.contains(&"REV"));
    // unmapped under this table
    assert!(codes.contains(&"DEPTH"));
}

#[test]
fn test_fixture_collisions() {
    let schema = SchemaExtractor::new().extract(REGISTRY).unwrap();
    assert!(find_collisions(&schema, &MnemonicTable::builtin()).is_empty());
}

// =============================================================================
// Reference Validation
// =============================================================================

#[test]
fn test_validate_widget_directory() {
    let schema = SchemaExtractor::new().extract(REGISTRY).unwrap();
    let report = MetricKeyValidator::new(&schema)
        .validate_directory(&fixtures_path().join("widgets"), DEFAULT_INCLUDE)
        .unwrap();

    // formatters.ts is outside the include glob
    assert_eq!(report.files_scanned, 5);
    assert_eq!(report.error_count(), 2);
    assert_eq!(report.warning_count(), 2);

    match &report.findings[0] {
        ValidationFinding::UnknownMetricKey {
            file,
            sensor_type,
            metric_key,
            suggestion,
            ..
        } => {
            assert_eq!(file, "EngineWidget.tsx");
            assert_eq!(sensor_type, "engine");
            assert_eq!(metric_key, "coolant");
            assert_eq!(suggestion.as_deref(), Some("coolantTemp"));
        }
        other => panic!("Expected UnknownMetricKey, got {:?}", other),
    }
    assert_eq!(
        report.findings[1].to_string(),
        "❌ gauges/RadarWidget.tsx: Unknown sensor type 'radar'"
    );
    assert!(matches!(
        &report.findings[2],
        ValidationFinding::DynamicKey { file, reason: DynamicKeyReason::ExemptFile } if file == "CustomWidget.tsx"
    ));
    assert!(matches!(
        &report.findings[3],
        ValidationFinding::DynamicKey { reason: DynamicKeyReason::Expression { expression, .. }, .. } if expression == "axis"
    ));
}

#[test]
fn test_validation_text_report() {
    let schema = SchemaExtractor::new().extract(REGISTRY).unwrap();
    let report = MetricKeyValidator::new(&schema)
        .validate_directory(&fixtures_path().join("widgets"), DEFAULT_INCLUDE)
        .unwrap();
    let text = render_findings(&report);

    assert!(text.contains(
        "❌ EngineWidget.tsx: engine.coolant does NOT exist in schema\n   Schema has: rpm, coolantTemp, oilPressure, fooBar\n"
    ));
    assert!(text.contains("⚠️  CustomWidget.tsx uses dynamic metricKey - cannot validate statically"));
    assert!(text.trim_end().ends_with("Total: 2 errors, 2 warnings"));
}

#[test]
fn test_missing_consumer_directory() {
    let schema = SchemaExtractor::new().extract(REGISTRY).unwrap();
    let result = MetricKeyValidator::new(&schema)
        .validate_directory(&fixtures_path().join("no-such-dir"), DEFAULT_INCLUDE);
    assert!(result.is_err());
}
