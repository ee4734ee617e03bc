//! Console and JSON rendering of validation results

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ValidationFinding, ValidationReport};
use crate::error::Result;
use crate::schema::SchemaMap;

/// `=== SENSOR SCHEMAS ===` followed by one `sensor: key, key` line per type
pub fn render_schema_summary(schema: &SchemaMap) -> String {
    let mut out = String::from("=== SENSOR SCHEMAS ===\n");
    for sensor in schema.sensors() {
        let _ = writeln!(out, "{}: {}", sensor.sensor_type, sensor.field_keys().join(", "));
    }
    out
}

/// Findings section with the closing count line
pub fn render_findings(report: &ValidationReport) -> String {
    let mut out = String::from("=== VALIDATION RESULTS ===\n");

    if report.is_clean() {
        out.push_str("✅ ALL METRIC KEYS ARE VALID\n");
        return out;
    }

    for finding in &report.findings {
        let _ = writeln!(out, "{}", finding);
    }
    let _ = writeln!(
        out,
        "\nTotal: {} errors, {} warnings",
        report.error_count(),
        report.warning_count()
    );
    out
}

/// Full console report: schema summary then findings
pub fn render_text(schema: &SchemaMap, report: &ValidationReport) -> String {
    format!("{}\n{}", render_schema_summary(schema), render_findings(report))
}

#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub errors: usize,
    pub warnings: usize,
    pub files_scanned: usize,
    pub references_checked: usize,
}

/// Machine-readable validation report
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub schema: &'a SchemaMap,
    pub findings: &'a [ValidationFinding],
    pub summary: ReportSummary,
}

impl<'a> JsonReport<'a> {
    pub fn new(schema: &'a SchemaMap, report: &'a ValidationReport) -> Self {
        Self {
            generated_at: Utc::now(),
            schema,
            findings: &report.findings,
            summary: ReportSummary {
                errors: report.error_count(),
                warnings: report.warning_count(),
                files_scanned: report.files_scanned,
                references_checked: report.references_checked,
            },
        }
    }
}

pub fn render_json(schema: &SchemaMap, report: &ValidationReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(&JsonReport::new(schema, report))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::MetricKeyValidator;

    fn schema() -> SchemaMap {
        SchemaMap::from_keys([
            ("depth", vec!["depth", "offset"]),
            ("engine", vec!["rpm", "coolantTemp"]),
        ])
    }

    #[test]
    fn test_schema_summary() {
        assert_eq!(
            render_schema_summary(&schema()),
            "=== SENSOR SCHEMAS ===\ndepth: depth, offset\nengine: rpm, coolantTemp\n"
        );
    }

    #[test]
    fn test_clean_report() {
        let text = render_findings(&ValidationReport::default());
        assert_eq!(text, "=== VALIDATION RESULTS ===\n✅ ALL METRIC KEYS ARE VALID\n");
    }

    #[test]
    fn test_report_with_findings() {
        let schema = schema();
        let report = MetricKeyValidator::new(&schema).validate_sources([
            ("CustomWidget.tsx", ""),
            ("RadarWidget.tsx", r#"<Cell sensorType="radar" metricKey="range" />"#),
        ]);
        let text = render_findings(&report);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "❌ RadarWidget.tsx: Unknown sensor type 'radar'");
        assert!(lines[2].starts_with("⚠️  CustomWidget.tsx uses dynamic metricKey"));
        assert_eq!(lines.last(), Some(&"Total: 1 errors, 1 warnings"));
    }

    #[test]
    fn test_json_report() {
        let schema = schema();
        let report = MetricKeyValidator::new(&schema).validate_sources([(
            "EngineWidget.tsx",
            r#"<Cell sensorType="engine" metricKey="oil" />"#,
        )]);
        let json: serde_json::Value = serde_json::from_str(&render_json(&schema, &report).unwrap()).unwrap();

        assert!(json["generated_at"].is_string());
        assert_eq!(json["summary"]["errors"], 1);
        assert_eq!(json["findings"][0]["kind"], "unknown_metric_key");
        assert_eq!(json["findings"][0]["known_keys"][1], "coolantTemp");
        assert_eq!(json["schema"]["engine"]["fields"][0]["key"], "rpm");
    }
}
